//! Route modules.

pub mod arrivals;
pub mod health;
pub mod users;
