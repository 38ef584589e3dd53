//! Adalight serial LED driver.
//!
//! Encodes frames sampled from a [`color::ColorSource`] into the Adalight
//! wire format and keeps a serial link to the strip alive across
//! configuration changes and disconnects.

pub mod color;
pub mod config;
pub mod connection;
pub mod discovery;
pub mod geometry;
pub mod host;
pub mod protocol;
pub mod retry;
pub mod transport;
