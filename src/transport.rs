//! Serial link abstraction and its `serialport` implementation.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use serialport::SerialPort;
use thiserror::Error;

use crate::config::BaudRate;

/// Bounds every blocking write so a stalled device cannot hold up the frame loop
const WRITE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Time the device gets to reset after DTR is asserted
const SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("failed to configure serial port {port}: {source}")]
    Configure {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("serial write failed: {0}")]
    Write(#[source] io::Error),

    #[error("serial flush failed: {0}")]
    Flush(#[source] io::Error),

    #[error("serial port is not open")]
    NotOpen,
}

/// Open/close/write primitives the connection manager drives
pub trait Transport {
    fn open(&mut self, port: &str, baud_rate: BaudRate) -> Result<(), TransportError>;

    fn close(&mut self) -> Result<(), TransportError>;

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;
}

/// Transport backed by a real serial port
#[derive(Default)]
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, port_name: &str, baud_rate: BaudRate) -> Result<(), TransportError> {
        // Never hold two handles to the device
        self.port = None;

        let mut port = serialport::new(port_name, baud_rate.as_u32())
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|source| TransportError::Open { port: port_name.to_string(), source })?;

        port.set_timeout(WRITE_TIMEOUT)
            .map_err(|source| TransportError::Configure { port: port_name.to_string(), source })?;

        // Most Adalight firmware boards reset on DTR, the link still works without it
        if let Err(e) = port.write_data_terminal_ready(true) {
            warn!("Failed to set DTR on {}: {}", port_name, e);
        }

        thread::sleep(SETTLE_DELAY);

        debug!("Opened {} at {} baud", port_name, baud_rate);
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        match self.port.take() {
            Some(port) => {
                debug!("Closing {}", port.name().unwrap_or_default());
                drop(port);
                Ok(())
            }
            None => Err(TransportError::NotOpen),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        write_or_release(&mut self.port, data)
    }
}

/// Write and flush through the handle in `slot`.
///
/// A failed write or flush drops the handle, so a dead link does not keep
/// the device file held until the next open.
fn write_or_release<P>(slot: &mut Option<Box<P>>, data: &[u8]) -> Result<(), TransportError>
where
    P: Write + ?Sized,
{
    let port = slot.as_mut().ok_or(TransportError::NotOpen)?;
    let result = port
        .write_all(data)
        .map_err(TransportError::Write)
        .and_then(|()| port.flush().map_err(TransportError::Flush));

    if result.is_err() {
        *slot = None;
    }
    result
}
