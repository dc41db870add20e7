//! Rating service
//!
//! Elo-style rating update applied once per contest after it ends. Each
//! participant's expected rank is derived from the pre-contest ratings of
//! the whole field and compared to the final rank:
//!
//! ```text
//! expected_rank  = 1 + #(R_j > R_i) + 0.5 * #(j != i, R_j == R_i)
//! expected_score = (N - expected_rank + 1) / N
//! actual_score   = (N - rank + 1) / N
//! delta          = round(K * (actual_score - expected_score))
//! ```
//!
//! Deltas sum to zero before rounding.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::RatingConfig,
    db::Store,
    error::{AppError, AppResult},
    events::{EventSink, PipelineEvent},
    models::{ContestStatus, RatingChange, RatingParticipant},
    services::ContestService,
};

/// Compute the rating change of every participant.
///
/// Ratings never drop below zero. Halves round away from zero.
pub fn compute_rating_changes(participants: &[RatingParticipant], k_factor: f64) -> Vec<RatingChange> {
    let n = participants.len() as f64;

    participants
        .iter()
        .map(|p| {
            let stronger = participants.iter().filter(|o| o.rating > p.rating).count() as f64;
            let equal = participants
                .iter()
                .filter(|o| o.user_id != p.user_id && o.rating == p.rating)
                .count() as f64;

            let expected_rank = 1.0 + stronger + 0.5 * equal;
            let expected_score = (n - expected_rank + 1.0) / n;
            let actual_score = (n - p.rank as f64 + 1.0) / n;

            let delta = (k_factor * (actual_score - expected_score)).round() as i32;
            let new_rating = (p.rating + delta).max(0);

            RatingChange {
                user_id: p.user_id,
                old_rating: p.rating,
                new_rating,
                delta: new_rating - p.rating,
                rank: p.rank,
            }
        })
        .collect()
}

/// Rating service for contest finalization
pub struct RatingService {
    store: Arc<dyn Store>,
    events: Arc<dyn EventSink>,
    contests: Arc<ContestService>,
    config: RatingConfig,
}

impl RatingService {
    pub fn new(
        store: Arc<dyn Store>,
        events: Arc<dyn EventSink>,
        contests: Arc<ContestService>,
        config: RatingConfig,
    ) -> Self {
        Self {
            store,
            events,
            contests,
            config,
        }
    }

    /// Apply rating changes for an ended contest. Runs at most once per
    /// contest; a second call fails with `AlreadyFinalized`.
    pub async fn finalize_contest(&self, contest_id: Uuid) -> AppResult<Vec<RatingChange>> {
        // No attempt may be scored between the final ranking and the commit.
        let standings = self.contests.lock_standings(contest_id).await;

        let contest = self
            .store
            .find_contest(contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contest not found".to_string()))?;

        if contest.rating_finalized {
            return Err(AppError::AlreadyFinalized(contest_id));
        }
        if contest.status() != ContestStatus::Ended {
            return Err(AppError::ContestNotEnded(contest_id));
        }

        // Final standings first; ratings are computed from persisted ranks.
        self.contests.refresh_locked(contest_id).await?;

        let participants = self
            .store
            .list_rating_inputs(contest_id, self.config.default_rating)
            .await?;
        let changes = compute_rating_changes(&participants, self.config.k_factor);

        self.store.commit_finalization(contest_id, &changes).await?;
        drop(standings);

        tracing::info!(
            contest_id = %contest_id,
            participants = changes.len(),
            "Contest ratings finalized"
        );

        futures::future::join_all(changes.iter().map(|change| {
            self.events.emit(PipelineEvent::RatingChanged {
                user_id: change.user_id,
                contest_id,
                delta: change.delta,
                new_rating: change.new_rating,
            })
        }))
        .await;

        Ok(changes)
    }

    /// Undo a contest's rating changes and finalize it again.
    ///
    /// Only safe for the most recent contest of its participants: ratings
    /// earned in later contests are overwritten with values derived from
    /// the restored ones.
    pub async fn recalculate_contest(&self, contest_id: Uuid) -> AppResult<Vec<RatingChange>> {
        let restored = self.store.revert_finalization(contest_id).await?;
        tracing::warn!(
            contest_id = %contest_id,
            restored,
            "Reverted contest ratings for recalculation"
        );

        self.finalize_contest(contest_id).await
    }
}
