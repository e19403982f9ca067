#![warn(clippy::all, rust_2018_idioms)]

pub mod alerts;
pub mod app;
pub mod error;
pub mod event_log;
pub mod export;
pub mod metrics;
pub mod process;
pub mod settings;

pub use app::Controller;
pub use error::{ConfigError, ControlError, SourceError};
pub use metrics::{Sampler, Snapshot};
pub use settings::Settings;
