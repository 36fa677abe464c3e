//! crates/diary_core/src/access.rs
//!
//! The access control gate for passcode-protected entries. A pure decision
//! function over an already-fetched entry; it performs no I/O.

use uuid::Uuid;

use crate::domain::Entry;
use crate::ports::PasscodeHasher;

/// The outcome of an access check on a single entry.
///
/// `Forbidden` covers both "not the owner" and "wrong passcode"; the web
/// layer maps it to a plain 404 so neither case is distinguishable from a
/// nonexistent entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    PasscodeRequired,
    Forbidden,
}

/// Decides whether `caller` may read `entry`'s content.
///
/// Ownership is checked first and independently: a non-owner never reaches
/// the passcode comparison. For owned entries, no stored passcode means the
/// entry is freely readable; a stored passcode requires a matching presented
/// value, verified through the hasher port.
pub fn authorize(
    entry: &Entry,
    caller: Uuid,
    presented: Option<&str>,
    hasher: &dyn PasscodeHasher,
) -> AccessDecision {
    if entry.user_id != caller {
        return AccessDecision::Forbidden;
    }

    match entry.passcode_hash.as_deref() {
        None => AccessDecision::Granted,
        Some(stored) => match presented {
            None => AccessDecision::PasscodeRequired,
            Some(candidate) if hasher.verify(candidate, stored) => AccessDecision::Granted,
            Some(_) => AccessDecision::Forbidden,
        },
    }
}
