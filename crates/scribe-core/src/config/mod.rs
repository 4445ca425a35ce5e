//! Scribe configuration
//!
//! Stored as YAML, by default at `~/.config/scribe/config.yaml`. Every
//! section falls back to its defaults, so a partial file (or no file) is
//! always a valid configuration.
//!
//! # Usage
//!
//! ```ignore
//! use scribe_core::config::{default_config_path, load_config, save_config, ScribeConfig};
//!
//! let path = default_config_path();
//! let config: ScribeConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;
mod settings;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path};
pub use settings::{PlaybackConfig, ScribeConfig, SmoothingConfig};
