//! Invite tokens: a group serialized to JSON, then base64url without padding.
//!
//! Decoding is total. Anything that is not base64, UTF-8 and JSON in turn
//! comes back as `None`; [`validate`] then decides whether the payload is a
//! usable group.

use std::collections::{BTreeMap, HashSet};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use crate::group::Group;
use crate::roster::DEFAULT_TITLE;

/// Query parameter that carries the token in an invite link.
pub const TOKEN_PARAM: &str = "g";

// Tokens are mapped back to the standard alphabet before decoding, and
// decoders elsewhere are not strict about the final padding bits.
const TOKEN_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// The structured form as found in a token, before any checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InvitePayload {
    pub title: Option<String>,
    pub names: Option<Vec<String>>,
    pub assignments: Option<BTreeMap<String, String>>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InviteError {
    #[error("invalid or corrupted invite link")]
    Corrupted,
    #[error("this invite link is missing assignments")]
    MissingAssignments,
    #[error("invite link assignments are inconsistent")]
    InconsistentAssignments,
}

pub fn encode(group: &Group) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(group)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

pub fn decode(token: &str) -> Option<InvitePayload> {
    let bytes = token_bytes(token)?;
    let json = String::from_utf8(bytes).ok()?;
    serde_json::from_str(&json).ok()
}

/// The unpadded base64url spelling of `token`.
///
/// Every spelling [`decode`] accepts for one invite maps to the same string,
/// so it is the key to store anything per group under.
pub fn canonical_token(token: &str) -> Option<String> {
    token_bytes(token).map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
}

fn token_bytes(token: &str) -> Option<Vec<u8>> {
    let mut b64: String = token
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while b64.len() % 4 != 0 {
        b64.push('=');
    }

    TOKEN_DECODER.decode(b64).ok()
}

/// Accept a decoded payload as a group, checking in order: it decoded,
/// it has names, it has assignments, every name has a receiver, and the
/// receivers form a derangement over exactly those names.
pub fn validate(payload: Option<InvitePayload>) -> Result<Group, InviteError> {
    let payload = payload.ok_or(InviteError::Corrupted)?;

    let names = match payload.names {
        Some(names) if !names.is_empty() => names,
        _ => return Err(InviteError::MissingAssignments),
    };
    let assignments = payload.assignments.ok_or(InviteError::MissingAssignments)?;
    let covered = names
        .iter()
        .all(|name| assignments.get(name).is_some_and(|r| !r.is_empty()));
    if !covered {
        return Err(InviteError::MissingAssignments);
    }

    check_derangement(&names, &assignments)?;

    let title = payload
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    Ok(Group {
        title,
        names,
        assignments,
        created_at: payload.created_at.unwrap_or(0),
    })
}

/// Decode and validate in one step.
pub fn open_invite(token: &str) -> Result<Group, InviteError> {
    validate(decode(token))
}

// Callers have already ensured every name is a key.
fn check_derangement(
    names: &[String],
    assignments: &BTreeMap<String, String>,
) -> Result<(), InviteError> {
    let roster: HashSet<&str> = names.iter().map(String::as_str).collect();
    if roster.len() != names.len() || assignments.len() != names.len() {
        return Err(InviteError::InconsistentAssignments);
    }

    let mut receivers = HashSet::with_capacity(names.len());
    for (giver, receiver) in assignments {
        if giver == receiver
            || !roster.contains(receiver.as_str())
            || !receivers.insert(receiver.as_str())
        {
            return Err(InviteError::InconsistentAssignments);
        }
    }
    Ok(())
}
