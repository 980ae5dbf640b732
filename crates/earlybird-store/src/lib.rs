//! Earlybird Store — `PostgreSQL` implementation of the arrival store.

pub mod pg_arrival_store;

pub use pg_arrival_store::PgArrivalStore;
