use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::color::ColorSource;
use crate::config::HostSettings;
use crate::connection::ConnectionManager;
use crate::transport::Transport;

const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Host settings backed by a JSON file, reloaded when the file changes
pub struct SettingsFile {
    path: PathBuf,
    modified: Option<SystemTime>,
    settings: HostSettings,
    fallback_port: Option<String>,
}

impl SettingsFile {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let modified = modified_time(&path);
        let settings = read_settings(&path)?;
        Ok(SettingsFile { path, modified, settings, fallback_port: None })
    }

    /// Port used whenever the file does not name one
    pub fn with_fallback_port(mut self, port: impl Into<String>) -> Self {
        self.fallback_port = Some(port.into());
        self
    }

    pub fn settings(&self) -> HostSettings {
        match &self.fallback_port {
            Some(port) => self.settings.clone().or_port(port),
            None => self.settings.clone(),
        }
    }

    /// Re-read the file if its modification time moved.
    ///
    /// Returns true when new settings were loaded. A file that fails to read
    /// or parse keeps the previous settings.
    pub fn refresh(&mut self) -> bool {
        let modified = modified_time(&self.path);
        if modified == self.modified {
            return false;
        }
        self.modified = modified;

        match read_settings(&self.path) {
            Ok(settings) => {
                let changed = settings != self.settings;
                self.settings = settings;
                changed
            }
            Err(e) => {
                warn!("Keeping previous settings: {:#}", e);
                false
            }
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_settings(path: &Path) -> Result<HostSettings> {
    let data = fs::read_to_string(path)
        .context(format!("Failed to read settings file {}", path.display()))?;
    serde_json::from_str(&data).context(format!("Failed to parse settings file {}", path.display()))
}

/// Drives one device at a fixed frame rate until the running flag clears
pub struct FrameLoop<T: Transport> {
    manager: ConnectionManager<T>,
    source: Box<dyn ColorSource>,
    settings: SettingsFile,
    frame_interval: Duration,
    canvas: (usize, usize),
    running: Arc<AtomicBool>,
}

impl<T: Transport> FrameLoop<T> {
    pub fn new(
        manager: ConnectionManager<T>,
        source: Box<dyn ColorSource>,
        settings: SettingsFile,
        fps: u32,
    ) -> Self {
        FrameLoop {
            manager,
            source,
            settings,
            frame_interval: Duration::from_secs(1) / fps.max(1),
            canvas: (0, 0),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get a clone of the running flag for signal handlers
    pub fn get_running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn manager(&self) -> &ConnectionManager<T> {
        &self.manager
    }

    pub fn initialize(&mut self) {
        self.manager.initialize(&self.settings.settings());
        self.update_canvas();
    }

    /// One host frame: reload settings, reconcile, render
    pub fn step(&mut self, elapsed: Duration) {
        if self.settings.refresh() {
            info!("Settings file changed");
        }
        self.manager.sync_config(&self.settings.settings());
        self.update_canvas();

        self.source.tick(elapsed);
        self.manager.render_frame(self.source.as_ref());
    }

    /// Run frames until the running flag is cleared
    pub fn run(&mut self) {
        self.initialize();

        let mut last_frame = Instant::now();
        let mut last_stats = Instant::now();
        let mut last_sent = self.manager.frames_sent();

        while self.running.load(Ordering::Relaxed) {
            let frame_start = Instant::now();
            self.step(frame_start - last_frame);
            last_frame = frame_start;

            if last_stats.elapsed() >= STATS_INTERVAL {
                let sent = self.manager.frames_sent();
                let fps = (sent - last_sent) as f64 / last_stats.elapsed().as_secs_f64();
                info!(
                    "[Stats] {}: {:.1} fps ({:?})",
                    self.manager.config().port,
                    fps,
                    self.manager.state()
                );
                last_sent = sent;
                last_stats = Instant::now();
            }

            if let Some(remaining) = self.frame_interval.checked_sub(frame_start.elapsed()) {
                thread::sleep(remaining);
            }
        }
    }

    /// Blackout and close the device
    pub fn shutdown(&mut self) {
        info!("Turning off LEDs...");
        self.manager.shutdown();
    }

    fn update_canvas(&mut self) {
        let canvas = self.manager.canvas();
        if canvas != self.canvas {
            self.canvas = canvas;
            self.source.set_canvas(canvas.0, canvas.1);
        }
    }
}
