//! Shared test mocks and utilities for the Earlybird arrival tracker.

mod clock;
mod store;

pub use clock::FixedClock;
pub use store::InMemoryArrivalStore;
