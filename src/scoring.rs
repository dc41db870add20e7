//! Contest standings arithmetic
//!
//! Pure functions shared by the contest service and the store
//! implementations, which apply the ranking inside their own transaction.

use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{ContestParticipant, ContestSubmission, LeaderboardEntry, ParticipantScore};

/// Recompute a participant's standing from their full contest history.
///
/// Per problem the accepted attempt with the most points counts, with its
/// own penalty; earlier attempts win ties. A problem without an accepted
/// attempt scores nothing and costs the sum of its wrong-attempt penalties.
/// The finish time is the latest of the counted attempts; redundant
/// re-accepts of a solved problem do not move it.
pub fn score_participant(submissions: &[ContestSubmission]) -> ParticipantScore {
    let mut ordered: Vec<&ContestSubmission> = submissions.iter().collect();
    ordered.sort_by_key(|s| s.submitted_at);

    let mut best: HashMap<Uuid, &ContestSubmission> = HashMap::new();
    let mut wrong: HashMap<Uuid, i64> = HashMap::new();

    for &submission in &ordered {
        if submission.accepted {
            let entry = best.entry(submission.problem_id).or_insert(submission);
            if submission.points > entry.points {
                *entry = submission;
            }
        } else {
            *wrong.entry(submission.problem_id).or_default() += submission.penalty;
        }
    }

    let mut score = 0;
    let mut penalty = 0;
    for counted in best.values() {
        score += counted.points;
        penalty += counted.penalty;
    }
    for (problem_id, wrong_penalty) in &wrong {
        if !best.contains_key(problem_id) {
            penalty += wrong_penalty;
        }
    }

    let finish_time = best.values().map(|s| s.submitted_at).max();

    ParticipantScore {
        score,
        penalty,
        finish_time,
    }
}

/// Leaderboard ordering: score desc, penalty asc, finish time asc with
/// unfinished participants last.
pub fn compare_standings(a: &ContestParticipant, b: &ContestParticipant) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(a.penalty.cmp(&b.penalty))
        .then_with(|| match (a.finish_time, b.finish_time) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Assign ranks 1..N.
///
/// `participants` must be in load order (registration time, then id). The
/// sort is stable, so full ties keep that order and get adjacent ranks.
pub fn rank_participants(mut participants: Vec<ContestParticipant>) -> Vec<LeaderboardEntry> {
    participants.sort_by(compare_standings);

    participants
        .into_iter()
        .enumerate()
        .map(|(i, p)| LeaderboardEntry {
            user_id: p.user_id,
            rank: i as i32 + 1,
            score: p.score,
            penalty: p.penalty,
            finish_time: p.finish_time,
        })
        .collect()
}
