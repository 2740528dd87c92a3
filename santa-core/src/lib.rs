//! Secret Santa assignments that live entirely inside an invite link.

pub mod codec;
pub mod derangement;
pub mod group;
pub mod random;
pub mod roster;

pub use codec::{canonical_token, decode, encode, open_invite, validate, InviteError, InvitePayload, TOKEN_PARAM};
pub use derangement::{generate, AssignmentError, Assignments, MIN_PARTICIPANTS};
pub use group::{create_group, create_group_with, now_millis, Group, MAX_GENERATION_ATTEMPTS};
pub use random::{FnSource, RandomSource, ReplaySource};
pub use roster::{normalize_title, sanitize_names, DEFAULT_TITLE};
