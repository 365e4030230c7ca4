use std::collections::HashMap;

use thiserror::Error;

use crate::model::PlayerId;

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("points per correct answer must be > 0")]
    InvalidPointValue,
}

/// How answers turn into points.
///
/// A correct answer inside the window earns a fixed point value, nothing
/// else. Time-based and first-correct bonuses are intentionally absent;
/// response times are recorded so a future policy can use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringPolicy {
    points_per_correct: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            points_per_correct: 1,
        }
    }
}

impl ScoringPolicy {
    /// Creates a policy with a custom point value.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::InvalidPointValue` if `points_per_correct`
    /// is zero.
    pub fn new(points_per_correct: u32) -> Result<Self, ScoringError> {
        if points_per_correct == 0 {
            return Err(ScoringError::InvalidPointValue);
        }
        Ok(Self { points_per_correct })
    }

    #[must_use]
    pub fn points_per_correct(&self) -> u32 {
        self.points_per_correct
    }

    /// Points awarded for one submission.
    #[must_use]
    pub fn award(&self, correct: bool) -> u32 {
        if correct { self.points_per_correct } else { 0 }
    }
}

//
// ─── RANKING ───────────────────────────────────────────────────────────────────
//

/// One row of a final ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub rank: usize,
    pub player_id: PlayerId,
    pub score: u32,
}

/// Competition ranking over a score map.
///
/// Tied scores share a rank and the following rank is skipped (1, 1, 3).
/// Ties are not broken; entries with equal scores are ordered by player id
/// only to keep the output deterministic.
#[must_use]
pub fn rank(scores: &HashMap<PlayerId, u32>) -> Vec<RankEntry> {
    let mut rows: Vec<(PlayerId, u32)> = scores.iter().map(|(id, s)| (*id, *s)).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut out = Vec::with_capacity(rows.len());
    let mut current_rank = 0;
    let mut previous_score = None;
    for (position, (player_id, score)) in rows.into_iter().enumerate() {
        if previous_score != Some(score) {
            current_rank = position + 1;
            previous_score = Some(score);
        }
        out.push(RankEntry {
            rank: current_rank,
            player_id,
            score,
        });
    }
    out
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
