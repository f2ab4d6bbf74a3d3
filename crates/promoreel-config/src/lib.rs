//! Configuration for the PromoReel job engine.
//!
//! Settings come from, in increasing priority:
//! - built-in defaults
//! - an optional KDL file (`promoreel.kdl`)
//! - environment variables

pub mod error;
pub mod system;

pub use error::{ConfigError, ConfigResult};
pub use system::{EngineConfig, PublisherConfig, RendererConfig, ServerConfig, parse_engine_config};
