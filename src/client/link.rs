//! Shared, mutually exclusive access to the transport
//!
//! Both the foreground caller and the background poller talk to the
//! peripheral through one [`Link`]. The lock is held from the write of a
//! command until its response has been read, so two request/response
//! exchanges can never interleave on the wire.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{InsenError, Result};
use crate::insen::encoder::encode_command;
use crate::serial::port_trait::SerialPortIO;
use crate::serial::RESPONSE_BUFFER_SIZE;

type Port = Box<dyn SerialPortIO>;

#[derive(Clone, Default)]
pub(crate) struct Link {
    port: Arc<Mutex<Option<Port>>>,
}

impl Link {
    /// Install an opened transport, returning the one it replaces
    pub async fn attach(&self, port: Port) -> Option<Port> {
        self.port.lock().await.replace(port)
    }

    pub async fn is_open(&self) -> bool {
        self.port.lock().await.is_some()
    }

    /// Send one command and read its response as a single unit of work
    ///
    /// Returns the trimmed response text, empty if the read timed out.
    pub async fn exchange(&self, command: &str) -> Result<String> {
        self.exchange_with(command, str::to_string).await
    }

    /// Like [`Link::exchange`], but runs `handle` on the response before the
    /// lock is released
    pub async fn exchange_with<T>(&self, command: &str, handle: impl FnOnce(&str) -> T) -> Result<T> {
        let mut guard = self.port.lock().await;
        let port = guard.as_mut().ok_or(InsenError::NotConnected)?;

        let frame = encode_command(command);
        let written = port.write(&frame).await?;
        if written != frame.len() {
            return Err(InsenError::ShortWrite {
                written,
                expected: frame.len(),
            });
        }
        port.flush().await?;

        let mut buffer = vec![0u8; RESPONSE_BUFFER_SIZE];
        let len = port.read(&mut buffer).await?;

        let response = String::from_utf8_lossy(&buffer[..len]);
        let response = response.trim();
        debug!("{} -> {:?}", command, response);

        let handled = handle(response);
        drop(guard);
        Ok(handled)
    }

    /// Close the transport if open; true when a port was actually closed
    pub async fn close(&self) -> bool {
        let Some(mut port) = self.port.lock().await.take() else {
            return false;
        };

        if let Err(e) = port.close().await {
            warn!("Error while closing serial port: {}", e);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::port_trait::mocks::ScriptedPort;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_exchange_without_port() {
        let link = Link::default();
        assert!(!link.is_open().await);
        assert!(matches!(link.exchange("INFO").await, Err(InsenError::NotConnected)));
    }

    #[tokio::test]
    async fn test_exchange_writes_terminated_command() {
        let link = Link::default();
        let port = ScriptedPort::peripheral();
        link.attach(Box::new(port.clone())).await;

        let response = link.exchange("LIST").await.unwrap();
        assert_eq!(response, ">>> CONTROLLERS|0_XBOX_ONE");
        assert_eq!(port.commands(), vec!["LIST"]);
    }

    #[tokio::test]
    async fn test_exchange_timeout_is_empty() {
        let link = Link::default();
        link.attach(Box::new(ScriptedPort::with_responder(|_| None))).await;

        assert_eq!(link.exchange("GET 0").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_exchange_with_runs_under_lock() {
        let link = Link::default();
        link.attach(Box::new(ScriptedPort::peripheral())).await;

        let port = link.port.clone();
        let locked = link
            .exchange_with("LIST", move |response| {
                assert_eq!(response, ">>> CONTROLLERS|0_XBOX_ONE");
                port.try_lock().is_err()
            })
            .await
            .unwrap();
        assert!(locked);
    }

    #[tokio::test]
    async fn test_close_once() {
        let link = Link::default();
        let port = ScriptedPort::peripheral();
        link.attach(Box::new(port.clone())).await;

        assert!(link.close().await);
        assert!(!link.close().await);
        assert_eq!(port.close_count.load(Ordering::SeqCst), 1);
        assert!(!link.is_open().await);
    }
}
