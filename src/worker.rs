//! Redis queue worker
//!
//! Pops jobs from two Redis lists and dispatches them:
//! - the judge queue carries JSON [`SubmitRequest`]s for the submission pipeline
//! - the finalize queue carries JSON [`FinalizeJob`]s for the rating engine
//!
//! At most `concurrency` jobs run at once. Malformed payloads are logged and
//! dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::{
    config::WorkerConfig,
    constants::QUEUE_POP_TIMEOUT_SECS,
    error::{AppError, AppResult},
    services::{RatingService, SubmissionService, SubmitRequest},
};

/// Request to finalize (or recalculate) a contest's ratings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeJob {
    pub contest_id: Uuid,
    #[serde(default)]
    pub recalculate: bool,
}

/// A decoded queue entry
#[derive(Debug, Clone)]
pub enum Job {
    Submit(SubmitRequest),
    Finalize(FinalizeJob),
}

impl Job {
    /// Decode a payload popped from `queue`
    pub fn parse(config: &WorkerConfig, queue: &str, payload: &str) -> AppResult<Self> {
        if queue == config.judge_queue {
            Ok(Job::Submit(serde_json::from_str(payload)?))
        } else if queue == config.finalize_queue {
            Ok(Job::Finalize(serde_json::from_str(payload)?))
        } else {
            Err(AppError::Validation(format!("Unknown queue: {}", queue)))
        }
    }
}

/// Queue consumer driving the grading pipeline and the rating engine
pub struct Worker {
    redis: ConnectionManager,
    submissions: Arc<SubmissionService>,
    ratings: Arc<RatingService>,
    config: WorkerConfig,
    permits: Arc<Semaphore>,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    pub fn new(
        redis: ConnectionManager,
        submissions: Arc<SubmissionService>,
        ratings: Arc<RatingService>,
        config: WorkerConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.concurrency));
        Self {
            redis,
            submissions,
            ratings,
            config,
            permits,
            shutdown,
        }
    }

    /// Consume both queues until shutdown, then wait for running jobs
    pub async fn run(&mut self) -> AppResult<()> {
        tracing::info!(
            judge_queue = %self.config.judge_queue,
            finalize_queue = %self.config.finalize_queue,
            concurrency = self.config.concurrency,
            "Worker started"
        );

        let queues = [self.config.judge_queue.clone(), self.config.finalize_queue.clone()];

        while !self.shutdown.load(Ordering::SeqCst) {
            // Hold a permit before popping so nothing waits in memory.
            let permit = self
                .permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(e.into()))?;

            let popped: Option<(String, String)> =
                match self.redis.brpop(&queues[..], QUEUE_POP_TIMEOUT_SECS).await {
                    Ok(popped) => popped,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to pop from queue");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                };

            let Some((queue, payload)) = popped else {
                continue;
            };

            let job = match Job::parse(&self.config, &queue, &payload) {
                Ok(job) => job,
                Err(e) => {
                    tracing::error!(queue = %queue, error = %e, "Dropping invalid job payload");
                    continue;
                }
            };

            let submissions = self.submissions.clone();
            let ratings = self.ratings.clone();
            tokio::spawn(async move {
                dispatch(job, &submissions, &ratings).await;
                drop(permit);
            });
        }

        tracing::info!("Worker draining running jobs");
        let _drained = self
            .permits
            .acquire_many(self.config.concurrency as u32)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        tracing::info!("Worker stopped");
        Ok(())
    }
}

async fn dispatch(job: Job, submissions: &SubmissionService, ratings: &RatingService) {
    match job {
        Job::Submit(request) => {
            let user_id = request.user_id;
            let problem_id = request.problem_id;
            if let Err(e) = submissions.submit(request).await {
                tracing::error!(
                    user_id = %user_id,
                    problem_id = %problem_id,
                    code = e.error_code(),
                    error = %e,
                    "Submission rejected"
                );
            }
        }
        Job::Finalize(job) => {
            let result = if job.recalculate {
                ratings.recalculate_contest(job.contest_id).await
            } else {
                ratings.finalize_contest(job.contest_id).await
            };

            if let Err(e) = result {
                tracing::error!(
                    contest_id = %job.contest_id,
                    code = e.error_code(),
                    error = %e,
                    "Contest finalization failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WorkerConfig {
        WorkerConfig {
            concurrency: 2,
            judge_queue: "judge".to_string(),
            finalize_queue: "finalize".to_string(),
        }
    }

    #[test]
    fn test_parse_submit_job() {
        let user = Uuid::new_v4();
        let problem = Uuid::new_v4();
        let payload = serde_json::json!({
            "user_id": user,
            "problem_id": problem,
            "contest_id": null,
            "language": "cpp",
            "source_code": "int main() {}",
        })
        .to_string();

        match Job::parse(&config(), "judge", &payload).unwrap() {
            Job::Submit(req) => {
                assert_eq!(req.user_id, user);
                assert_eq!(req.problem_id, problem);
                assert_eq!(req.language, "cpp");
            }
            other => panic!("unexpected job: {:?}", other),
        }
    }

    #[test]
    fn test_parse_finalize_job_defaults_to_first_run() {
        let contest = Uuid::new_v4();
        let payload = format!(r#"{{"contest_id":"{}"}}"#, contest);

        match Job::parse(&config(), "finalize", &payload).unwrap() {
            Job::Finalize(job) => assert_eq!(
                job,
                FinalizeJob {
                    contest_id: contest,
                    recalculate: false
                }
            ),
            other => panic!("unexpected job: {:?}", other),
        }
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_worker_finalizes_queued_contest() {
        use chrono::{Duration as ChronoDuration, Utc};

        use crate::{
            config::{ContestConfig, RatingConfig},
            db::{MemoryStore, Store},
            events::LogEventSink,
            judge::MockJudgeClient,
            models::ParticipantScore,
            services::ContestService,
        };

        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let contest = store
            .insert_contest("Queued", now - ChronoDuration::hours(2), now - ChronoDuration::hours(1))
            .unwrap();
        for (name, score) in [("first", 200), ("second", 100)] {
            let user = store.insert_user(name, None).unwrap();
            store.register_participant(contest.id, user.id).await.unwrap();
            store
                .update_participant_score(
                    contest.id,
                    user.id,
                    ParticipantScore {
                        score,
                        penalty: 0,
                        finish_time: None,
                    },
                )
                .await
                .unwrap();
        }

        let events = Arc::new(LogEventSink);
        let contests = Arc::new(ContestService::new(store.clone(), events.clone(), ContestConfig::default()));
        let submissions = Arc::new(SubmissionService::new(
            store.clone(),
            Arc::new(MockJudgeClient::new()),
            events.clone(),
            contests.clone(),
        ));
        let ratings = Arc::new(RatingService::new(store.clone(), events, contests, RatingConfig::default()));

        let (_container, url) = crate::test_utils::containers::redis().await;
        let client = redis::Client::open(url.as_str()).unwrap();
        let mut redis = ConnectionManager::new(client).await.unwrap();

        let payload = serde_json::to_string(&FinalizeJob {
            contest_id: contest.id,
            recalculate: false,
        })
        .unwrap();
        let _: () = redis.lpush("finalize", "garbage").await.unwrap();
        let _: () = redis.lpush("finalize", payload).await.unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let mut worker = Worker::new(redis, submissions, ratings, config(), shutdown.clone());
        let handle = tokio::spawn(async move { worker.run().await });

        let mut finalized = false;
        for _ in 0..100 {
            if store.list_rating_history(contest.id).await.unwrap().len() == 2 {
                finalized = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        shutdown.store(true, Ordering::SeqCst);
        handle.await.unwrap().unwrap();

        assert!(finalized);
        assert!(store.find_contest(contest.id).await.unwrap().unwrap().rating_finalized);
    }

    #[test]
    fn test_invalid_payloads_are_rejected() {
        assert!(matches!(
            Job::parse(&config(), "judge", "not json"),
            Err(AppError::Serialization(_))
        ));
        assert!(matches!(
            Job::parse(&config(), "finalize", r#"{"recalculate":true}"#),
            Err(AppError::Serialization(_))
        ));
        assert!(matches!(
            Job::parse(&config(), "elsewhere", "{}"),
            Err(AppError::Validation(_))
        ));
    }
}
