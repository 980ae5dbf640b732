//! Earlybird Engine — arrival registration and badge evaluation.
//!
//! Two application services over the storage trait: the
//! [`registrar::ArrivalRegistrar`] turns a check-in timestamp into a scored
//! arrival record and an advanced user aggregate, and the
//! [`evaluator::BadgeEvaluator`] awards badges against the committed state.

pub mod evaluator;
pub mod registrar;
pub mod rules;
pub mod scoring;
