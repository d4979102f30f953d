//! Configuration for the session controller
//!
//! - Generic YAML config loading/saving
//! - Default config locations
//! - [`SessionConfig`]: extensions, output names and engine options
//!
//! # Usage
//!
//! ```ignore
//! use synthdesk_core::config::{load_config, save_config, default_config_path, SessionConfig};
//!
//! let path = default_config_path("session.yaml");
//! let config: SessionConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;
mod session;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path};
pub use session::SessionConfig;
