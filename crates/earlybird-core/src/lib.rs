//! Earlybird Core — shared domain types and abstractions.
//!
//! This crate defines the persisted entities, the domain error type, the
//! clock abstraction, and the storage trait that every other crate depends
//! on. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod model;
pub mod store;
