//! Social platform publishers for PromoReel.
//!
//! Provides publisher implementations:
//! - Instagram Graph API (reels, resumable upload)

pub mod graph;

pub use graph::HttpPublisher;
pub use promoreel_core::publisher::{PublishError, Publisher};
