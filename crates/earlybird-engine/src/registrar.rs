//! Arrival registration: at most one scored check-in per user per local
//! day.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::info;

use earlybird_core::error::DomainError;
use earlybird_core::store::{ArrivalStore, ArrivalSubmission, RegistrationOutcome};

use crate::scoring;

/// Registers check-ins against the shared store.
pub struct ArrivalRegistrar {
    store: Arc<dyn ArrivalStore>,
    local_offset: FixedOffset,
}

impl ArrivalRegistrar {
    /// Creates a registrar that derives calendar days at `local_offset`.
    #[must_use]
    pub fn new(store: Arc<dyn ArrivalStore>, local_offset: FixedOffset) -> Self {
        Self {
            store,
            local_offset,
        }
    }

    /// Registers a check-in.
    ///
    /// The raw arrival event is always logged. A second registration for
    /// the same user and local day is an expected outcome
    /// ([`RegistrationOutcome::AlreadyRegisteredToday`]) and leaves the
    /// arrival records and the user aggregate untouched. On acceptance the
    /// store atomically assigns the day rank, applies the scoring, and
    /// advances the user aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] when the store fails; the
    /// caller decides whether to retry.
    pub async fn register(
        &self,
        user_id: &str,
        arrived_at: DateTime<Utc>,
    ) -> Result<RegistrationOutcome, DomainError> {
        let time_score = scoring::time_score(scoring::local_time(arrived_at, self.local_offset));
        let submission = ArrivalSubmission {
            user_id: user_id.to_owned(),
            arrived_at,
            arrival_day: scoring::local_day(arrived_at, self.local_offset),
            time_score,
            first_rank_bonus: scoring::first_rank_bonus(time_score),
        };

        info!(
            user_id,
            arrived_at = %submission.arrived_at,
            day = %submission.arrival_day,
            time_score,
            "registering arrival"
        );

        let outcome = self.store.register_arrival(submission).await?;
        match &outcome {
            RegistrationOutcome::Registered { record, user } => {
                info!(
                    user_id,
                    arrival_id = record.id,
                    rank = record.arrival_rank,
                    total_score = record.total_score,
                    current_score = user.current_score,
                    level_uped = user.level_uped,
                    "arrival registered"
                );
            }
            RegistrationOutcome::AlreadyRegisteredToday { day, .. } => {
                info!(user_id, %day, "arrival already registered today");
            }
        }
        Ok(outcome)
    }
}
