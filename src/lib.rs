//! # INSEN Client Library
//!
//! Talk to an INSEN multi-controller peripheral over a serial link.
//!
//! This library provides the text protocol codec, the serial transport and a
//! client that serializes command traffic and polls one controller in the
//! background, handing each decoded state to an observer.

pub mod config;
pub mod error;
pub mod insen;
pub mod client;
pub mod serial;
