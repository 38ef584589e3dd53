//! Connection manager: owns the device configuration and the serial link,
//! and keeps the per-frame cycle running whatever state the device is in.

use std::time::Instant;

use log::{debug, error, info, log_enabled, warn, Level};

use crate::color::ColorSource;
use crate::config::{DeviceConfig, HostSettings};
use crate::geometry::DeviceVariant;
use crate::protocol::{build_adalight_frame, build_blackout_frame};
use crate::retry::ReconnectBackoff;
use crate::transport::Transport;

/// Whether frame data may be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

/// Transport operation whose result drives a state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Open,
    Close,
    Write,
}

impl ConnectionState {
    /// State after `op` completed with `result`.
    ///
    /// A close always leaves the link closed, even when the close reported an error.
    pub fn after<E>(self, op: TransportOp, result: &Result<(), E>) -> ConnectionState {
        match (op, result) {
            (TransportOp::Open, Ok(())) => ConnectionState::Open,
            (TransportOp::Open, Err(_)) => ConnectionState::Closed,
            (TransportOp::Close, _) => ConnectionState::Closed,
            (TransportOp::Write, Ok(())) => self,
            (TransportOp::Write, Err(_)) => ConnectionState::Closed,
        }
    }

    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }
}

/// What a render call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Frame written to an already open link
    Sent,
    /// Link was closed and frame written after a successful reconnect
    Reconnected,
    /// Link closed, nothing written
    Skipped,
    /// Write failed, link is now closed
    Failed,
}

pub struct ConnectionManager<T: Transport> {
    transport: T,
    variant: DeviceVariant,
    config: DeviceConfig,
    state: ConnectionState,
    backoff: ReconnectBackoff,
    shut_down: bool,
    frames_sent: u64,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T, variant: DeviceVariant) -> Self {
        let config = DeviceConfig::from_settings(&HostSettings::default(), variant.default_led_count);
        ConnectionManager {
            transport,
            variant,
            config,
            state: ConnectionState::Closed,
            backoff: ReconnectBackoff::default(),
            shut_down: false,
            frames_sent: 0,
        }
    }

    pub fn with_backoff(mut self, backoff: ReconnectBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn variant(&self) -> &DeviceVariant {
        &self.variant
    }

    /// Canvas size the color source is sampled on
    pub fn canvas(&self) -> (usize, usize) {
        self.variant.canvas(self.config.led_count)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Read the host settings and try to open the link.
    ///
    /// A failed open is logged and leaves the manager closed but usable.
    pub fn initialize(&mut self, settings: &HostSettings) {
        self.initialize_at(settings, Instant::now())
    }

    /// [`initialize`](Self::initialize) with an explicit clock for the reconnect backoff
    pub fn initialize_at(&mut self, settings: &HostSettings, now: Instant) {
        if self.state.is_open() {
            self.close_logged();
        }
        self.config = DeviceConfig::from_settings(settings, self.variant.default_led_count);
        self.shut_down = false;
        self.backoff.reset();

        info!(
            "Initializing {} on {} at {} baud",
            self.variant.name, self.config.port, self.config.baud_rate
        );
        info!("LED count: {}", self.config.led_count);

        self.open_logged(now);
    }

    /// Reconcile the live configuration with the host settings.
    ///
    /// LED count only changes the payload. A port or baud change reopens an
    /// open link; a port change on a closed link attempts a fresh open.
    /// After [`shutdown`](Self::shutdown) settings are still tracked but the
    /// port stays closed until the next initialize.
    pub fn sync_config(&mut self, settings: &HostSettings) {
        self.sync_config_at(settings, Instant::now())
    }

    /// [`sync_config`](Self::sync_config) with an explicit clock for the reconnect backoff
    pub fn sync_config_at(&mut self, settings: &HostSettings, now: Instant) {
        let led_count = settings.led_count(self.variant.default_led_count);
        if led_count != self.config.led_count {
            self.config.led_count = led_count;
            info!("LED count changed to: {}", led_count);
        }

        let baud_rate = settings.baud_rate();
        let baud_changed = baud_rate != self.config.baud_rate;
        if baud_changed {
            self.config.baud_rate = baud_rate;
            info!("Baud rate changed to: {}", baud_rate);
        }

        let port = settings.port();
        let port_changed = port != self.config.port;
        if port_changed {
            info!("Serial port changed to: {}", port);
            self.config.port = port;
        }

        if !(baud_changed || port_changed) || self.shut_down {
            return;
        }
        self.backoff.reset();

        if self.state.is_open() {
            self.close_logged();
            if self.open_logged(now) {
                info!("Serial port reopened with new settings");
            }
        } else if port_changed {
            self.open_logged(now);
        }
    }

    /// Encode one frame from `source` and write it if the link is open
    pub fn render_frame(&mut self, source: &dyn ColorSource) -> RenderOutcome {
        self.render_frame_at(source, Instant::now())
    }

    /// [`render_frame`](Self::render_frame) with an explicit clock for the reconnect backoff
    pub fn render_frame_at(&mut self, source: &dyn ColorSource, now: Instant) -> RenderOutcome {
        let mut reconnected = false;
        if !self.state.is_open() {
            if !self.try_reconnect(now) {
                return RenderOutcome::Skipped;
            }
            reconnected = true;
        }

        let frame = build_adalight_frame(self.config.led_count, source, &*self.variant.geometry);
        if log_enabled!(Level::Debug) {
            debug!("[{}] Sending frame: {} bytes ({} LEDs)", self.config.port, frame.len(), self.config.led_count);
            debug!("[{}] Complete serial frame: {}", self.config.port, hex_dump(&frame));
        }

        let result = self.transport.write(&frame);
        self.state = self.state.after(TransportOp::Write, &result);
        match result {
            Ok(()) => {
                self.frames_sent += 1;
                if reconnected {
                    RenderOutcome::Reconnected
                } else {
                    RenderOutcome::Sent
                }
            }
            Err(e) => {
                error!("Serial error on {}: {}", self.config.port, e);
                error!("Output {} is now disconnected", self.config.port);
                self.backoff.failed(now);
                RenderOutcome::Failed
            }
        }
    }

    /// Darken the strip and release the port.
    ///
    /// Nothing is written or closed when the link was never opened.
    pub fn shutdown(&mut self) {
        self.shut_down = true;
        if !self.state.is_open() {
            return;
        }

        let blackout = build_blackout_frame(self.config.led_count);
        if let Err(e) = self.transport.write(&blackout) {
            warn!("Error in blackout on {}: {}", self.config.port, e);
        }

        self.close_logged();
        info!("{} on {} stopped", self.variant.name, self.config.port);
    }

    /// Silent best-effort open from the render path, gated by the backoff
    fn try_reconnect(&mut self, now: Instant) -> bool {
        if self.shut_down || !self.backoff.ready(now) {
            return false;
        }

        let result = self.transport.open(&self.config.port, self.config.baud_rate);
        self.state = self.state.after(TransportOp::Open, &result);
        match result {
            Ok(()) => {
                self.backoff.reset();
                info!("Reconnected to {}", self.config.port);
                true
            }
            Err(e) => {
                debug!("Reconnect to {} failed: {}", self.config.port, e);
                self.backoff.failed(now);
                false
            }
        }
    }

    /// Open from initialize or a settings change; a failure starts the backoff
    fn open_logged(&mut self, now: Instant) -> bool {
        let result = self.transport.open(&self.config.port, self.config.baud_rate);
        self.state = self.state.after(TransportOp::Open, &result);
        match result {
            Ok(()) => {
                self.backoff.reset();
                info!("Serial port {} opened successfully", self.config.port);
                true
            }
            Err(e) => {
                warn!("Failed to open serial port: {}", e);
                self.backoff.failed(now);
                false
            }
        }
    }

    fn close_logged(&mut self) {
        let result = self.transport.close();
        self.state = self.state.after(TransportOp::Close, &result);
        if let Err(e) = result {
            warn!("Error closing serial port {}: {}", self.config.port, e);
        }
    }
}

fn hex_dump(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}
