//! # INSEN Protocol Module
//!
//! Implementation of the INSEN line-oriented text protocol.
//!
//! This module handles:
//! - Command encoding (CR LF terminated text)
//! - INPUT record decoding into controller snapshots
//! - Parsing of the informational INFO / STATUS / LIST replies
//! - Button and d-pad tables

pub mod protocol;
pub mod encoder;
pub mod decoder;
