//! Expiration Policy
//!
//! One rule decides liveness everywhere: an entry is live iff its expiry lies
//! strictly after the instant it is evaluated at.

use chrono::{DateTime, Utc};

/// Returns true when an entry expiring at `expires_at` may be served at `now`.
pub fn is_live(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at > now
}

/// Collects the keys whose expiry has passed at `now`.
pub fn expired_keys<'a, I>(entries: I, now: DateTime<Utc>) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, DateTime<Utc>)>,
{
    entries
        .into_iter()
        .filter(|(_, expires_at)| !is_live(*expires_at, now))
        .map(|(key, _)| key.clone())
        .collect()
}
