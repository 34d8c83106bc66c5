//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Trait for serial port I/O operations
///
/// `read` is bounded by the timeout the port was opened with; an expired
/// timeout is reported as `Ok(0)` rather than an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write data to the port, returning the number of bytes accepted
    async fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Read whatever arrives before the read timeout
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Shut the port down
    async fn close(&mut self) -> io::Result<()>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
    read_timeout: Duration,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream, read_timeout: Duration) -> Self {
        Self { port, read_timeout }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.port.write(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port.flush().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match tokio::time::timeout(self.read_timeout, self.port.read(buf)).await {
            Ok(result) => result,
            Err(_elapsed) => Ok(0),
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        self.port.shutdown().await
    }
}
