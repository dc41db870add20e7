//! Pipeline events
//!
//! Events are fire-and-forget: a sink that fails to deliver logs the failure
//! and the pipeline carries on.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    constants::events,
    error::AppResult,
    models::{LeaderboardEntry, SubmissionStatus},
};

/// Named event with its payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PipelineEvent {
    #[serde(rename_all = "camelCase")]
    SubmissionUpdate {
        submission_id: Uuid,
        status: SubmissionStatus,
        passed_tests: i32,
        total_tests: i32,
        time: Option<f64>,
        memory: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    LeaderboardUpdate {
        contest_id: Uuid,
        leaderboard: Vec<LeaderboardEntry>,
    },
    #[serde(rename_all = "camelCase")]
    RatingChanged {
        user_id: Uuid,
        contest_id: Uuid,
        delta: i32,
        new_rating: i32,
    },
}

impl PipelineEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubmissionUpdate { .. } => events::SUBMISSION_UPDATE,
            Self::LeaderboardUpdate { .. } => events::LEADERBOARD_UPDATE,
            Self::RatingChanged { .. } => events::RATING_CHANGED,
        }
    }

    /// `{"event": name, "payload": {...}}` envelope
    pub fn to_message(&self) -> AppResult<String> {
        Ok(serde_json::to_string(&json!({
            "event": self.name(),
            "payload": self,
        }))?)
    }
}

/// Receives pipeline events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: PipelineEvent);
}

/// Publishes events to a Redis pub/sub channel
#[derive(Clone)]
pub struct RedisEventSink {
    redis: ConnectionManager,
    channel: String,
}

impl RedisEventSink {
    pub fn new(redis: ConnectionManager, channel: impl Into<String>) -> Self {
        Self {
            redis,
            channel: channel.into(),
        }
    }

    async fn publish(&self, event: &PipelineEvent) -> AppResult<()> {
        let message = event.to_message()?;
        let mut redis = self.redis.clone();
        redis.publish::<_, _, ()>(&self.channel, message).await?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for RedisEventSink {
    async fn emit(&self, event: PipelineEvent) {
        if let Err(e) = self.publish(&event).await {
            tracing::warn!(event = event.name(), error = %e, "Failed to publish event");
        }
    }
}

/// Writes events to the log only
#[derive(Debug, Clone, Default)]
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn emit(&self, event: PipelineEvent) {
        match event.to_message() {
            Ok(message) => tracing::info!(event = event.name(), %message, "Pipeline event"),
            Err(e) => tracing::warn!(event = event.name(), error = %e, "Unserializable event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_submission_update_envelope() {
        let id = Uuid::new_v4();
        let event = PipelineEvent::SubmissionUpdate {
            submission_id: id,
            status: SubmissionStatus::WrongAnswer,
            passed_tests: 1,
            total_tests: 3,
            time: Some(0.25),
            memory: None,
        };

        let message: Value = serde_json::from_str(&event.to_message().unwrap()).unwrap();
        assert_eq!(message["event"], "submission:update");
        assert_eq!(message["payload"]["submissionId"], id.to_string());
        assert_eq!(message["payload"]["status"], "WRONG_ANSWER");
        assert_eq!(message["payload"]["passedTests"], 1);
        assert_eq!(message["payload"]["totalTests"], 3);
        assert_eq!(message["payload"]["memory"], Value::Null);
    }

    #[test]
    fn test_rating_changed_envelope() {
        let event = PipelineEvent::RatingChanged {
            user_id: Uuid::nil(),
            contest_id: Uuid::nil(),
            delta: -11,
            new_rating: 1489,
        };

        let message: Value = serde_json::from_str(&event.to_message().unwrap()).unwrap();
        assert_eq!(message["event"], "rating:changed");
        assert_eq!(message["payload"]["delta"], -11);
        assert_eq!(message["payload"]["newRating"], 1489);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_redis_sink_publishes_envelope() {
        use futures::StreamExt;

        let (_container, url) = crate::test_utils::containers::redis().await;
        let client = redis::Client::open(url.as_str()).unwrap();

        let mut pubsub = client.get_async_pubsub().await.unwrap();
        pubsub.subscribe("events").await.unwrap();

        let sink = RedisEventSink::new(ConnectionManager::new(client).await.unwrap(), "events");
        sink.emit(PipelineEvent::RatingChanged {
            user_id: Uuid::nil(),
            contest_id: Uuid::nil(),
            delta: 16,
            new_rating: 1216,
        })
        .await;

        let message = pubsub.on_message().next().await.unwrap();
        let payload: String = message.get_payload().unwrap();
        let payload: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(payload["event"], "rating:changed");
        assert_eq!(payload["payload"]["newRating"], 1216);
    }

    #[tokio::test]
    async fn test_log_sink_accepts_every_event() {
        LogEventSink
            .emit(PipelineEvent::LeaderboardUpdate {
                contest_id: Uuid::nil(),
                leaderboard: Vec::new(),
            })
            .await;
    }
}
