//! PostgreSQL store
//!
//! Thin adapter from [`Store`] to the repositories. Multi-row operations run
//! in one transaction.

use async_trait::async_trait;
use sqlx::{pool::PoolConnection, PgPool, Postgres};
use uuid::Uuid;

use super::{
    repositories::{
        ContestRepository, ProblemRepository, RatingRepository, SubmissionRepository, UserRepository,
    },
    store::Store,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        Contest, ContestParticipant, ContestProblem, ContestSubmission, Difficulty,
        LeaderboardEntry, NewContestSubmission, NewSubmission, ParticipantScore, Problem,
        RatingChange, RatingHistory, RatingParticipant, Submission, TestCase, TestcaseResult, User,
        UserStats,
    },
    scoring,
    verdict::{CaseOutcome, Verdict},
};

/// [`Store`] backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn conn(&self) -> AppResult<PoolConnection<Postgres>> {
        Ok(self.pool.acquire().await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_problem(&self, id: Uuid) -> AppResult<Option<Problem>> {
        let mut conn = self.conn().await?;
        ProblemRepository::find_by_id(&mut conn, &id).await
    }

    async fn get_test_cases(&self, problem_id: Uuid) -> AppResult<Vec<TestCase>> {
        let mut conn = self.conn().await?;
        ProblemRepository::get_test_cases(&mut conn, &problem_id).await
    }

    async fn record_problem_attempt(&self, problem_id: Uuid, accepted: bool) -> AppResult<Problem> {
        let mut conn = self.conn().await?;
        ProblemRepository::record_attempt(&mut conn, &problem_id, accepted).await
    }

    async fn mark_solved(&self, user_id: Uuid, problem_id: Uuid, difficulty: Difficulty) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let first = ProblemRepository::mark_solved(&mut tx, &user_id, &problem_id, difficulty).await?;
        tx.commit().await?;
        Ok(first)
    }

    async fn create_submission(&self, submission: NewSubmission) -> AppResult<Submission> {
        let mut conn = self.conn().await?;
        SubmissionRepository::create(&mut conn, &submission).await
    }

    async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>> {
        let mut conn = self.conn().await?;
        SubmissionRepository::find_by_id(&mut conn, &id).await
    }

    async fn fail_submission(&self, id: Uuid, message: &str) -> AppResult<Submission> {
        let mut conn = self.conn().await?;
        SubmissionRepository::fail(&mut conn, &id, message).await
    }

    async fn save_testcase_results(&self, submission_id: Uuid, cases: &[CaseOutcome]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for case in cases {
            SubmissionRepository::save_testcase_result(&mut tx, &submission_id, case).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_testcase_results(&self, submission_id: Uuid) -> AppResult<Vec<TestcaseResult>> {
        let mut conn = self.conn().await?;
        SubmissionRepository::list_testcase_results(&mut conn, &submission_id).await
    }

    async fn complete_submission(&self, id: Uuid, verdict: &Verdict) -> AppResult<Submission> {
        let mut conn = self.conn().await?;
        SubmissionRepository::complete(&mut conn, &id, verdict).await
    }

    async fn find_contest(&self, id: Uuid) -> AppResult<Option<Contest>> {
        let mut conn = self.conn().await?;
        ContestRepository::find_by_id(&mut conn, &id).await
    }

    async fn find_contest_problem(&self, contest_id: Uuid, problem_id: Uuid) -> AppResult<Option<ContestProblem>> {
        let mut conn = self.conn().await?;
        ContestRepository::find_problem(&mut conn, &contest_id, &problem_id).await
    }

    async fn register_participant(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<ContestParticipant> {
        let mut conn = self.conn().await?;
        ContestRepository::register_participant(&mut conn, &contest_id, &user_id).await
    }

    async fn find_participant(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<Option<ContestParticipant>> {
        let mut conn = self.conn().await?;
        ContestRepository::find_participant(&mut conn, &contest_id, &user_id).await
    }

    async fn list_participants(&self, contest_id: Uuid) -> AppResult<Vec<ContestParticipant>> {
        let mut conn = self.conn().await?;
        ContestRepository::list_participants(&mut conn, &contest_id).await
    }

    async fn create_contest_submission(&self, submission: NewContestSubmission) -> AppResult<ContestSubmission> {
        let mut conn = self.conn().await?;
        ContestRepository::create_submission(&mut conn, &submission).await
    }

    async fn list_contest_submissions(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<Vec<ContestSubmission>> {
        let mut conn = self.conn().await?;
        ContestRepository::list_submissions(&mut conn, &contest_id, &user_id).await
    }

    async fn update_participant_score(
        &self,
        contest_id: Uuid,
        user_id: Uuid,
        score: ParticipantScore,
    ) -> AppResult<()> {
        let mut conn = self.conn().await?;
        ContestRepository::update_participant_score(&mut conn, &contest_id, &user_id, &score).await
    }

    async fn refresh_ranks(&self, contest_id: Uuid) -> AppResult<Vec<LeaderboardEntry>> {
        let mut tx = self.pool.begin().await?;
        ContestRepository::lock_standings(&mut tx, &contest_id).await?;

        let participants = ContestRepository::list_participants(&mut tx, &contest_id).await?;
        let leaderboard = scoring::rank_participants(participants);
        ContestRepository::save_ranks(&mut tx, &contest_id, &leaderboard).await?;

        tx.commit().await?;
        Ok(leaderboard)
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let mut conn = self.conn().await?;
        UserRepository::find_by_id(&mut conn, &id).await
    }

    async fn get_user_stats(&self, user_id: Uuid) -> AppResult<UserStats> {
        let mut conn = self.conn().await?;
        UserRepository::get_stats(&mut conn, &user_id).await
    }

    async fn list_rating_inputs(&self, contest_id: Uuid, default_rating: i32) -> AppResult<Vec<RatingParticipant>> {
        let mut conn = self.conn().await?;
        RatingRepository::list_inputs(&mut conn, &contest_id, default_rating).await
    }

    async fn commit_finalization(&self, contest_id: Uuid, changes: &[RatingChange]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        if !ContestRepository::mark_finalized(&mut tx, &contest_id).await? {
            return Err(AppError::AlreadyFinalized(contest_id));
        }

        for change in changes {
            RatingRepository::insert(&mut tx, &contest_id, change).await?;
            UserRepository::apply_rating(&mut tx, &change.user_id, change.old_rating, change.new_rating).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn revert_finalization(&self, contest_id: Uuid) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;

        let history = RatingRepository::delete_for_contest(&mut tx, &contest_id).await?;
        for entry in &history {
            UserRepository::restore_rating(&mut tx, &entry.user_id, entry.old_rating).await?;
        }
        ContestRepository::unmark_finalized(&mut tx, &contest_id).await?;

        tx.commit().await?;
        Ok(history.len())
    }

    async fn list_rating_history(&self, contest_id: Uuid) -> AppResult<Vec<RatingHistory>> {
        let mut conn = self.conn().await?;
        RatingRepository::list_for_contest(&mut conn, &contest_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::test_utils::containers;

    struct Seeded {
        contest: Contest,
        users: Vec<User>,
    }

    async fn seed_contest(store: &PgStore, players: usize) -> Seeded {
        let mut conn = store.conn().await.unwrap();
        let now = Utc::now();
        let contest = ContestRepository::create(&mut conn, "Round 1", now - Duration::hours(3), now - Duration::hours(1))
            .await
            .unwrap();

        let mut users = Vec::new();
        for i in 0..players {
            let user = UserRepository::create(&mut conn, &format!("player-{}-{}", i, contest.id))
                .await
                .unwrap();
            ContestRepository::register_participant(&mut conn, &contest.id, &user.id)
                .await
                .unwrap();
            users.push(user);
        }

        Seeded { contest, users }
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_problem_counters_and_solves() {
        let (_container, pool) = containers::postgres().await;
        let store = PgStore::new(pool);
        let mut conn = store.conn().await.unwrap();

        let problem = ProblemRepository::create(&mut conn, "Two Sum", Difficulty::Hard).await.unwrap();
        let user = UserRepository::create(&mut conn, "solver").await.unwrap();
        drop(conn);

        store.record_problem_attempt(problem.id, false).await.unwrap();
        let problem = store.record_problem_attempt(problem.id, true).await.unwrap();
        assert_eq!(problem.total_submissions, 2);
        assert_eq!(problem.total_accepted, 1);
        assert!((problem.acceptance_rate - 0.5).abs() < 1e-9);

        assert!(store.mark_solved(user.id, problem.id, Difficulty::Hard).await.unwrap());
        assert!(!store.mark_solved(user.id, problem.id, Difficulty::Hard).await.unwrap());

        let stats = store.get_user_stats(user.id).await.unwrap();
        assert_eq!(stats.hard_solved, 1);
        assert_eq!(stats.total_solved, 1);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_test_cases_and_contest_problems() {
        let (_container, pool) = containers::postgres().await;
        let store = PgStore::new(pool);
        let seeded = seed_contest(&store, 0).await;
        let mut conn = store.conn().await.unwrap();

        let problem = ProblemRepository::create(&mut conn, "Echo", Difficulty::Easy).await.unwrap();
        ProblemRepository::create_test_case(&mut conn, &problem.id, "b", "b", false, 1, 2).await.unwrap();
        ProblemRepository::create_test_case(&mut conn, &problem.id, "a", "a", true, 1, 1).await.unwrap();
        ContestRepository::add_problem(&mut conn, &seeded.contest.id, &problem.id, 1, Some(250))
            .await
            .unwrap();
        drop(conn);

        let cases = store.get_test_cases(problem.id).await.unwrap();
        let inputs: Vec<&str> = cases.iter().map(|c| c.input.as_str()).collect();
        assert_eq!(inputs, vec!["a", "b"]);

        let linked = store.find_contest_problem(seeded.contest.id, problem.id).await.unwrap().unwrap();
        assert_eq!(linked.points, Some(250));
        assert!(store.find_contest_problem(seeded.contest.id, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_refresh_ranks_persists_order() {
        let (_container, pool) = containers::postgres().await;
        let store = PgStore::new(pool);
        let seeded = seed_contest(&store, 3).await;
        let contest_id = seeded.contest.id;

        let finish = Utc::now();
        store
            .update_participant_score(contest_id, seeded.users[2].id, ParticipantScore { score: 200, penalty: 30, finish_time: Some(finish) })
            .await
            .unwrap();
        store
            .update_participant_score(contest_id, seeded.users[0].id, ParticipantScore { score: 100, penalty: 10, finish_time: Some(finish) })
            .await
            .unwrap();

        let board = store.refresh_ranks(contest_id).await.unwrap();
        let order: Vec<Uuid> = board.iter().map(|e| e.user_id).collect();
        assert_eq!(order, vec![seeded.users[2].id, seeded.users[0].id, seeded.users[1].id]);

        let third = store.find_participant(contest_id, seeded.users[1].id).await.unwrap().unwrap();
        assert_eq!(third.rank, Some(3));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_finalization_commit_and_revert() {
        let (_container, pool) = containers::postgres().await;
        let store = PgStore::new(pool);
        let seeded = seed_contest(&store, 2).await;
        let contest_id = seeded.contest.id;
        store.refresh_ranks(contest_id).await.unwrap();

        let changes = vec![
            RatingChange { user_id: seeded.users[0].id, old_rating: 1200, new_rating: 1208, delta: 8, rank: 1 },
            RatingChange { user_id: seeded.users[1].id, old_rating: 1200, new_rating: 1192, delta: -8, rank: 2 },
        ];
        store.commit_finalization(contest_id, &changes).await.unwrap();

        let err = store.commit_finalization(contest_id, &changes).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyFinalized(id) if id == contest_id));

        let winner = store.find_user(seeded.users[0].id).await.unwrap().unwrap();
        assert_eq!(winner.rating, Some(1208));
        assert_eq!(winner.max_rating, Some(1208));
        assert_eq!(winner.contests_participated, 1);
        let loser = store.find_user(seeded.users[1].id).await.unwrap().unwrap();
        assert_eq!(loser.rating, Some(1192));
        assert_eq!(loser.max_rating, Some(1200));
        assert_eq!(store.list_rating_history(contest_id).await.unwrap().len(), 2);

        assert_eq!(store.revert_finalization(contest_id).await.unwrap(), 2);
        let winner = store.find_user(seeded.users[0].id).await.unwrap().unwrap();
        assert_eq!(winner.rating, Some(1200));
        assert_eq!(winner.contests_participated, 0);
        assert!(!store.find_contest(contest_id).await.unwrap().unwrap().rating_finalized);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_failed_finalization_leaves_contest_open() {
        let (_container, pool) = containers::postgres().await;
        let store = PgStore::new(pool);
        let seeded = seed_contest(&store, 1).await;
        let contest_id = seeded.contest.id;

        let changes = vec![
            RatingChange { user_id: seeded.users[0].id, old_rating: 1200, new_rating: 1200, delta: 0, rank: 1 },
            RatingChange { user_id: Uuid::new_v4(), old_rating: 1200, new_rating: 1200, delta: 0, rank: 2 },
        ];
        assert!(store.commit_finalization(contest_id, &changes).await.is_err());

        assert!(!store.find_contest(contest_id).await.unwrap().unwrap().rating_finalized);
        assert!(store.list_rating_history(contest_id).await.unwrap().is_empty());
        let user = store.find_user(seeded.users[0].id).await.unwrap().unwrap();
        assert_eq!(user.rating, None);
    }
}
