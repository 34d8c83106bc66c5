//! # INSEN Client Module
//!
//! Session orchestration for an INSEN peripheral.
//!
//! This module handles:
//! - Opening and closing the serial transport
//! - Command round trips (INFO, STATUS, LIST, GET)
//! - Tracking the latest state of each controller
//! - Starting and stopping the background poller
//!
//! Every command, from the caller or from the poller, goes through one
//! lock around write-then-read, so responses can never be attributed to the
//! wrong request.

mod link;
pub mod poller;
pub mod registry;

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{InsenError, Result};
use crate::insen::decoder::{
    decode_input, parse_controller_list, parse_firmware_info, parse_system_status,
};
use crate::insen::encoder::get_command;
use crate::insen::protocol::*;
use crate::serial::open_port;
use crate::serial::port_trait::SerialPortIO;
use link::Link;
use poller::{Poller, PollerState};
use registry::Registry;

/// Client for one INSEN peripheral
///
/// # Examples
///
/// ```no_run
/// use insen_client::client::InsenClient;
/// use insen_client::config::SerialConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut client = InsenClient::new(SerialConfig::default());
///     client.connect().await?;
///
///     client.start_monitoring(0, 60, |state| {
///         println!("{:?}", state.pressed_buttons());
///     }).await?;
///
///     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
///     client.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct InsenClient {
    config: SerialConfig,
    link: Link,
    registry: Registry,
    poller: Poller,
}

impl InsenClient {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            link: Link::default(),
            registry: Registry::new(),
            poller: Poller::new(),
        }
    }

    /// Open the configured serial port and greet the device
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the port cannot be found or opened
    pub async fn connect(&mut self) -> Result<()> {
        if self.link.is_open().await {
            warn!("Already connected to {}", self.config.port);
            return Ok(());
        }

        let port = open_port(&self.config)?;
        info!("Connected to INSEN device on {}", self.config.port);
        self.attach(Box::new(port)).await;
        Ok(())
    }

    /// Start a session on an already opened transport
    ///
    /// Performs the best-effort INFO round trip; a failure there is only
    /// logged.
    pub async fn attach(&mut self, port: Box<dyn SerialPortIO>) {
        if let Some(mut previous) = self.link.attach(port).await {
            if let Err(e) = previous.close().await {
                warn!("Error while closing replaced port: {}", e);
            }
        }

        if self.config.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
        }

        match self.get_device_info().await {
            Ok(response) => info!("Device info: {}", response),
            Err(e) => warn!("Failed to query device info: {}", e),
        }
    }

    /// Stop monitoring and close the transport
    ///
    /// Safe to call repeatedly and without a prior successful `connect`.
    pub async fn disconnect(&mut self) {
        self.poller.stop().await;

        if self.link.close().await {
            info!("Disconnected from INSEN device");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.link.is_open().await
    }

    /// Send a raw command and return the trimmed response
    ///
    /// An empty string means the device did not answer within the read
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` outside a session, `ShortWrite` or `Io` on
    /// channel failures
    pub async fn send_command(&self, command: &str) -> Result<String> {
        self.link.exchange(command).await
    }

    pub async fn get_device_info(&self) -> Result<String> {
        self.send_command(CMD_INFO).await
    }

    pub async fn get_status(&self) -> Result<String> {
        self.send_command(CMD_STATUS).await
    }

    pub async fn list_controllers(&self) -> Result<String> {
        self.send_command(CMD_LIST).await
    }

    /// Firmware details parsed from the INFO reply
    pub async fn firmware_info(&self) -> Result<FirmwareInfo> {
        let response = self.get_device_info().await?;
        Ok(parse_firmware_info(&response))
    }

    /// Counters parsed from the STATUS reply
    pub async fn system_status(&self) -> Result<SystemStatus> {
        let response = self.get_status().await?;
        Ok(parse_system_status(&response)?)
    }

    /// Controllers parsed from the LIST reply
    pub async fn controllers(&self) -> Result<Vec<ControllerInfo>> {
        let response = self.list_controllers().await?;
        Ok(parse_controller_list(&response)?)
    }

    /// Request the current input of one controller
    ///
    /// A response that does not decode yields `Ok(None)`; a single lost
    /// frame is expected on a live link. A decoded state is stored in the
    /// registry before the link is released, so registry order follows wire
    /// order even while the poller runs.
    ///
    /// # Errors
    ///
    /// Returns transport errors from `send_command`
    pub async fn get_controller_input(&self, controller_id: u8) -> Result<Option<ControllerState>> {
        fetch_state(&self.link, &self.registry, controller_id).await
    }

    /// Poll one controller in the background and pass each state to `observer`
    ///
    /// Returns `Ok(false)` and changes nothing if monitoring is already active.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPollRate` for a zero rate, `NotConnected` outside a
    /// session
    pub async fn start_monitoring<F>(&mut self, controller_id: u8, rate_hz: u32, observer: F) -> Result<bool>
    where
        F: FnMut(ControllerState) + Send + 'static,
    {
        if self.poller.is_running() {
            info!("Monitoring already active");
            return Ok(false);
        }

        if !self.link.is_open().await {
            return Err(InsenError::NotConnected);
        }

        self.poller.start(
            self.link.clone(),
            self.registry.clone(),
            controller_id,
            rate_hz,
            Box::new(observer),
        )
    }

    /// Stop monitoring; returns once the poller has exited
    pub async fn stop_monitoring(&mut self) {
        self.poller.stop().await;
    }

    pub fn monitor_state(&self) -> PollerState {
        self.poller.state()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// One GET round trip, decode failures downgraded to `None`
async fn fetch_state(link: &Link, registry: &Registry, controller_id: u8) -> Result<Option<ControllerState>> {
    link.exchange_with(&get_command(controller_id), |response| {
        match decode_input(response.as_bytes()) {
            Ok(state) => {
                registry.update(state.clone());
                Some(state)
            }
            Err(e) => {
                debug!("No state for controller {}: {}", controller_id, e);
                None
            }
        }
    })
    .await
}
