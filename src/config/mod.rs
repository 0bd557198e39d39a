//! Configuration management for httpsweep.
//!
//! Provides XDG-compliant settings storage and the default database location.

mod settings;

pub use settings::{AppSettings, Paths};
