//! # Serial Communication Module
//!
//! Handles the serial link to the INSEN peripheral.
//!
//! This module handles:
//! - Opening the serial port with 8N1 line settings
//! - Timeout-bounded async reads
//! - The `SerialPortIO` seam used to inject mock transports in tests

pub mod port_trait;

use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::config::SerialConfig;
use crate::error::{InsenError, Result};
use port_trait::TokioSerialPort;

/// Default INSEN baud rate
pub const INSEN_BAUD_RATE: u32 = 115_200;

/// Default read timeout; one timed read returns at most one response frame
pub const INSEN_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Size of the buffer a single response is read into
pub const RESPONSE_BUFFER_SIZE: usize = 1024;

/// Open the configured serial port with INSEN line settings
///
/// # Arguments
///
/// * `config` - Port path, baud rate and read timeout
///
/// # Returns
///
/// * `Result<TokioSerialPort>` - Opened port wrapped for `SerialPortIO`
///
/// # Errors
///
/// Returns `Connection` if the device does not exist or cannot be opened
///
/// # Examples
///
/// ```no_run
/// use insen_client::config::SerialConfig;
/// use insen_client::serial::open_port;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let port = open_port(&SerialConfig::default())?;
///     Ok(())
/// }
/// ```
pub fn open_port(config: &SerialConfig) -> Result<TokioSerialPort> {
    let read_timeout = Duration::from_millis(config.timeout_ms);
    debug!(
        "Opening serial port {} at {} baud (timeout {:?})",
        config.port, config.baud_rate, read_timeout
    );

    let stream = tokio_serial::new(&config.port, config.baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(read_timeout)
        .open_native_async()
        .map_err(|e| InsenError::Connection(format!("Failed to open {}: {}", config.port, e)))?;

    info!("Opened INSEN device at {}", config.port);
    Ok(TokioSerialPort::new(stream, read_timeout))
}
