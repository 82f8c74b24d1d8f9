//! Typed, validated server connection profiles for a database administration host.
//!
//! A host application builds a [`Registry`] once at startup, either from an
//! in-memory [`ProfileSource`] with [`Registry::load`] or from disk with
//! [`load_file`]/[`load_dir`], and passes it to whatever needs connection
//! details. The registry is never mutated after it is built.

pub mod config;
pub mod error;

pub use config::components::profile::{AuthType, ConnectionProfile, TlsSettings, Transport};
pub use config::components::source::{AttrValue, Attributes, ProfileKey, ProfileSource};
pub use config::loader::{load_dir, load_file, parse_source, Format};
pub use config::registry::{LoadOptions, Registry, DEFAULT_PORT};
pub use error::ConfigError;
