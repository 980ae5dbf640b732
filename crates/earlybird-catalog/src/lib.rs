//! Earlybird Catalog — the static badge registry and the deterministic
//! kiriban milestone generator.
//!
//! The catalog is an explicit immutable object constructed once at startup
//! and passed by reference to the components that need it; there is no
//! ambient global registry.

mod catalog;
mod kiriban;

pub use catalog::{BadgeCatalog, badge_id, badge_type_id};
pub use kiriban::{
    DEFAULT_KIRIBAN_CEILING, KIRIBAN_BADGE_ID_BASE, KIRIBAN_BADGE_ID_MAX, KiribanGenerator,
};
