//! Video renderer adapters for PromoReel.
//!
//! Provides renderer implementations for producing promotional videos:
//! - External command (production; the encoder runs as a separate program)

pub mod command;

pub use command::CommandRenderer;
pub use promoreel_core::renderer::{RenderError, RenderRequest, Renderer};
