//! HTTP API server for PromoReel.
//!
//! Accepts video jobs over REST and reports their status.

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;
