//! Application state management
//!
//! Wires the store, judge client and event sink into the services shared by
//! every worker task.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use crate::{
    config::Config,
    db::{PgStore, Store},
    error::AppResult,
    events::{EventSink, RedisEventSink},
    judge::{Judge0Client, JudgeClient},
    services::{ContestService, RatingService, SubmissionService},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: PgPool,
    redis: ConnectionManager,
    config: Config,
    submissions: Arc<SubmissionService>,
    contests: Arc<ContestService>,
    ratings: Arc<RatingService>,
}

impl AppState {
    /// Build the production service graph on PostgreSQL, Redis and the HTTP judge
    pub fn new(db: PgPool, redis: ConnectionManager, config: Config) -> AppResult<Self> {
        let store: Arc<dyn Store> = Arc::new(PgStore::new(db.clone()));
        let events: Arc<dyn EventSink> =
            Arc::new(RedisEventSink::new(redis.clone(), config.redis.event_channel.clone()));
        let judge: Arc<dyn JudgeClient> = Arc::new(Judge0Client::new(&config.judge)?);

        let contests = Arc::new(ContestService::new(
            store.clone(),
            events.clone(),
            config.contest.clone(),
        ));
        let submissions = Arc::new(SubmissionService::new(
            store.clone(),
            judge,
            events.clone(),
            contests.clone(),
        ));
        let ratings = Arc::new(RatingService::new(
            store,
            events,
            contests.clone(),
            config.rating.clone(),
        ));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db,
                redis,
                config,
                submissions,
                contests,
                ratings,
            }),
        })
    }

    /// Get a reference to the database pool
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get a clone of the Redis connection manager
    pub fn redis(&self) -> ConnectionManager {
        self.inner.redis.clone()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn submissions(&self) -> Arc<SubmissionService> {
        self.inner.submissions.clone()
    }

    pub fn contests(&self) -> Arc<ContestService> {
        self.inner.contests.clone()
    }

    pub fn ratings(&self) -> Arc<RatingService> {
        self.inner.ratings.clone()
    }
}
