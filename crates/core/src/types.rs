//! Identifier and timestamp types shared by every crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};
use svix_ksuid::{Ksuid, KsuidLike};

use crate::error::CoreError;

/// All timestamps are UTC.
pub type Timestamp = DateTime<Utc>;

/// Length of the base62 text form of an [`Id`].
pub const ID_LENGTH: usize = 27;

/// A KSUID: 27 base62 characters over a 20-byte value whose first four bytes
/// are big-endian seconds since the KSUID epoch.
///
/// The text form is stored as-is in the database. Because the base62
/// alphabet is ASCII-ordered and the length is fixed, lexicographic order of
/// the text equals chronological order of the ids; the policy engine relies
/// on this to bound indexed range scans with a synthesized start-of-day id.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Id(String);

impl Id {
    /// Generate a fresh id at the current time with a random payload.
    pub fn generate() -> Self {
        Self(Ksuid::new(None, None).to_string())
    }

    /// The smallest id whose timestamp component equals `seconds` (Unix
    /// seconds): the timestamp prefix with an all-zero payload.
    pub fn from_unix_seconds(seconds: i64) -> Self {
        const ZERO_PAYLOAD: [u8; 16] = [0u8; 16];
        Self(Ksuid::from_seconds(Some(seconds), Some(ZERO_PAYLOAD.as_slice())).to_string())
    }

    /// The smallest id of the local calendar day containing `now`.
    pub fn start_of_local_day(now: DateTime<Local>) -> Self {
        let since_midnight = i64::from(now.time().num_seconds_from_midnight());
        Self::from_unix_seconds(now.timestamp() - since_midnight)
    }

    /// The creation time embedded in the id (second resolution).
    pub fn timestamp(&self) -> Option<Timestamp> {
        let ksuid = Ksuid::from_base62(&self.0).ok()?;
        DateTime::from_timestamp(ksuid.timestamp().unix_timestamp(), 0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Id {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ID_LENGTH {
            return Err(CoreError::Validation(format!("invalid id: {s}")));
        }
        let ksuid = Ksuid::from_base62(s)
            .map_err(|_| CoreError::Validation(format!("invalid id: {s}")))?;
        Ok(Self(ksuid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_has_canonical_length() {
        let id = Id::generate();
        assert_eq!(id.as_str().len(), ID_LENGTH);
    }

    #[test]
    fn text_order_matches_time_order() {
        let early = Id::from_unix_seconds(1_700_000_000);
        let late = Id::from_unix_seconds(1_700_086_400);
        assert!(early < late);
        assert!(early.as_str() < late.as_str());
    }

    #[test]
    fn from_unix_seconds_round_trips_the_timestamp() {
        let id = Id::from_unix_seconds(1_700_000_000);
        assert_eq!(id.timestamp().map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn start_of_day_is_lower_bound_for_fresh_ids() {
        let start = Id::start_of_local_day(Local::now());
        let fresh = Id::generate();
        assert!(start <= fresh);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!("short".parse::<Id>().is_err());
        assert!("".parse::<Id>().is_err());
    }

    #[test]
    fn parse_round_trips_generated_ids() {
        let id = Id::generate();
        let parsed: Id = id.as_str().parse().expect("generated id should parse");
        assert_eq!(parsed, id);
    }
}
