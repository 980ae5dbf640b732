//! Earlybird API — Axum HTTP surface for the arrival tracker.

pub mod error;
pub mod routes;
pub mod state;
