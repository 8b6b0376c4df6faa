//! Hot/cold vote tallying shared by every votable record.
//!
//! Counts live in two places: on the record itself (the community total) and
//! in a per-user tally (how many times this user voted each way). Both are
//! kept non-negative; a decrement against an empty tally is refused.

use std::cmp::Reverse;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::data::{Comment, User};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Hot,
    Cold,
}

impl VoteKind {
    /// Column holding this side of the pair, also the RPC `vote_type` argument.
    pub fn column(self) -> &'static str {
        match self {
            VoteKind::Hot => "hot_votes",
            VoteKind::Cold => "cold_votes",
        }
    }
}

/// Direction of a single vote action: cast (+1) or retract (-1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteStep {
    Cast,
    Retract,
}

impl VoteStep {
    pub fn delta(self) -> i32 {
        match self {
            VoteStep::Cast => 1,
            VoteStep::Retract => -1,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Votes {
    pub hot_votes: u32,
    pub cold_votes: u32,
}

impl Votes {
    pub fn new(hot_votes: u32, cold_votes: u32) -> Self {
        Self {
            hot_votes,
            cold_votes,
        }
    }

    /// Builds a pair from raw column values, clamping anything below zero.
    pub fn from_raw(hot_votes: Option<i64>, cold_votes: Option<i64>) -> Self {
        Self::new(clamp_count(hot_votes), clamp_count(cold_votes))
    }

    pub fn get(&self, kind: VoteKind) -> u32 {
        match kind {
            VoteKind::Hot => self.hot_votes,
            VoteKind::Cold => self.cold_votes,
        }
    }

    pub fn apply(&mut self, kind: VoteKind, delta: i32) {
        let slot = match kind {
            VoteKind::Hot => &mut self.hot_votes,
            VoteKind::Cold => &mut self.cold_votes,
        };

        *slot = if delta < 0 {
            slot.saturating_sub(delta.unsigned_abs())
        } else {
            slot.saturating_add(delta as u32)
        };
    }

    pub fn temperature(&self) -> i64 {
        i64::from(self.hot_votes) - i64::from(self.cold_votes)
    }
}

fn clamp_count(value: Option<i64>) -> u32 {
    value.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32
}

pub trait Votable {
    fn votes(&self) -> Votes;

    fn votes_mut(&mut self) -> &mut Votes;
}

/// Whether `step` is allowed against the user's current tally for `kind`.
pub fn can_step(tally: Votes, kind: VoteKind, step: VoteStep) -> bool {
    step == VoteStep::Cast || tally.get(kind) > 0
}

/// XP change for the author of a record when someone else votes on it.
pub fn author_xp_change(kind: VoteKind, step: VoteStep) -> i64 {
    let sign = match kind {
        VoteKind::Hot => 1,
        VoteKind::Cold => -1,
    };

    sign * i64::from(step.delta())
}

/// Comments ordered by temperature, hottest first. Ties keep insertion order.
pub fn sorted_comments(comments: &[Comment]) -> Vec<&Comment> {
    let mut sorted = comments.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|comment| Reverse(comment.votes.temperature()));

    sorted
}

/// Builds a new comment authored by `author`. Blank text yields `None`.
pub fn new_comment(author: &User, text: &str) -> Option<Comment> {
    let text = text.trim();

    if text.is_empty() {
        return None;
    }

    let now = Utc::now();

    Some(Comment {
        id: format!("c_{}", now.timestamp_millis()),
        author_id: author.id.clone(),
        author_pseudonym: author.pseudonym.clone(),
        text: text.to_owned(),
        timestamp: now,
        votes: Votes::default(),
    })
}

/// Adds one vote to the comment with `comment_id`. Returns whether it existed.
pub fn vote_comment(comments: &mut [Comment], comment_id: &str, kind: VoteKind) -> bool {
    match comments.iter_mut().find(|comment| comment.id == comment_id) {
        Some(comment) => {
            comment.votes.apply(kind, 1);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UserStats;

    fn user() -> User {
        User {
            id: "u1".to_owned(),
            pseudonym: "ana".to_owned(),
            level: 1,
            xp: 0,
            achievements: vec![],
            stats: UserStats::default(),
        }
    }

    fn comment(id: &str, hot: u32, cold: u32) -> Comment {
        Comment {
            id: id.to_owned(),
            author_id: "u1".to_owned(),
            author_pseudonym: "ana".to_owned(),
            text: "text".to_owned(),
            timestamp: Utc::now(),
            votes: Votes::new(hot, cold),
        }
    }

    #[test]
    fn test_apply_never_goes_negative() {
        let mut votes = Votes::new(1, 0);
        votes.apply(VoteKind::Hot, -1);
        votes.apply(VoteKind::Hot, -1);
        votes.apply(VoteKind::Cold, -3);

        assert_eq!(votes, Votes::new(0, 0));
    }

    #[test]
    fn test_from_raw_clamps() {
        assert_eq!(Votes::from_raw(Some(-4), None), Votes::new(0, 0));
        assert_eq!(Votes::from_raw(Some(3), Some(2)), Votes::new(3, 2));
    }

    #[test]
    fn test_retract_requires_existing_vote() {
        let tally = Votes::new(0, 1);

        assert!(!can_step(tally, VoteKind::Hot, VoteStep::Retract));
        assert!(can_step(tally, VoteKind::Cold, VoteStep::Retract));
        assert!(can_step(tally, VoteKind::Hot, VoteStep::Cast));
    }

    #[test]
    fn test_author_xp_change() {
        assert_eq!(author_xp_change(VoteKind::Hot, VoteStep::Cast), 1);
        assert_eq!(author_xp_change(VoteKind::Hot, VoteStep::Retract), -1);
        assert_eq!(author_xp_change(VoteKind::Cold, VoteStep::Cast), -1);
        assert_eq!(author_xp_change(VoteKind::Cold, VoteStep::Retract), 1);
    }

    #[test]
    fn test_sorted_comments_by_temperature() {
        let comments = vec![comment("a", 1, 3), comment("b", 5, 0), comment("c", 2, 2)];

        let ids = sorted_comments(&comments)
            .into_iter()
            .map(|comment| comment.id.as_str())
            .collect::<Vec<_>>();

        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_new_comment_rejects_blank() {
        assert!(new_comment(&user(), "   ").is_none());

        let comment = new_comment(&user(), "  great summary ").unwrap();
        assert_eq!(comment.text, "great summary");
        assert_eq!(comment.author_pseudonym, "ana");
        assert!(comment.id.starts_with("c_"));
    }

    #[test]
    fn test_vote_comment() {
        let mut comments = vec![comment("a", 0, 0)];

        assert!(vote_comment(&mut comments, "a", VoteKind::Cold));
        assert!(!vote_comment(&mut comments, "missing", VoteKind::Hot));
        assert_eq!(comments[0].votes, Votes::new(0, 1));
    }
}
