use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::derangement::{generate, AssignmentError, Assignments};
use crate::random::RandomSource;
use crate::roster::normalize_title;

/// Draws attempted before a self-assignment is surfaced to the caller.
pub const MAX_GENERATION_ATTEMPTS: usize = 3;

/// A finished gift exchange. Built once by the organizer, then only ever
/// carried around inside an invite token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub title: String,
    pub names: Vec<String>,
    pub assignments: Assignments,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Group {
    pub fn recipient_for(&self, name: &str) -> Option<&str> {
        self.assignments.get(name).map(String::as_str)
    }

    pub fn has_participant(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

pub fn create_group<R>(
    title: &str,
    names: Vec<String>,
    rng: &mut R,
    created_at: i64,
) -> Result<Group, AssignmentError>
where
    R: RandomSource + ?Sized,
{
    create_group_with(title, names, rng, created_at, |roster, rng| generate(roster, rng))
}

/// [`create_group`] over any assignment strategy. A retryable failure is
/// drawn again, up to [`MAX_GENERATION_ATTEMPTS`] calls in total.
pub fn create_group_with<R, G>(
    title: &str,
    names: Vec<String>,
    rng: &mut R,
    created_at: i64,
    mut assign: G,
) -> Result<Group, AssignmentError>
where
    R: RandomSource + ?Sized,
    G: FnMut(&[String], &mut R) -> Result<Assignments, AssignmentError>,
{
    let mut attempt = 1;
    let assignments = loop {
        match assign(&names, rng) {
            Ok(assignments) => break assignments,
            Err(err) if err.is_retryable() && attempt < MAX_GENERATION_ATTEMPTS => attempt += 1,
            Err(err) => return Err(err),
        }
    };

    Ok(Group {
        title: normalize_title(title),
        names,
        assignments,
        created_at,
    })
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
