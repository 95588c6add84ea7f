//! Identity and timestamps shared by every persisted entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// `id`, `created_at` and `updated_at` for a persisted entity.
///
/// The id never changes after construction and `updated_at` only moves
/// forward: `touch` ignores timestamps older than the current one, so
/// `updated_at >= created_at` holds for every value of this type, including
/// deserialized ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    try_from = "BaseDetailsRecord<I>",
    bound(deserialize = "I: Deserialize<'de>")
)]
pub struct BaseDetails<I> {
    id: I,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseDetailsRecord<I> {
    id: I,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<I> TryFrom<BaseDetailsRecord<I>> for BaseDetails<I> {
    type Error = DomainError;

    fn try_from(record: BaseDetailsRecord<I>) -> Result<Self, Self::Error> {
        Self::restore(record.id, record.created_at, record.updated_at)
    }
}

impl<I> BaseDetails<I> {
    pub fn new(id: I, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild details loaded from storage.
    pub fn restore(
        id: I,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if updated_at < created_at {
            return Err(DomainError::invalid_timestamp(format!(
                "updated_at {updated_at} precedes created_at {created_at}"
            )));
        }
        Ok(Self {
            id,
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> &I {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Record a modification at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut details = BaseDetails::new(UserId::new(), t0());
        details.touch(t0() + Duration::minutes(5));
        details.touch(t0() - Duration::days(1));
        assert_eq!(details.updated_at(), t0() + Duration::minutes(5));
        assert_eq!(details.created_at(), t0());
    }

    #[test]
    fn restore_rejects_inverted_timestamps() {
        let err = BaseDetails::restore(UserId::new(), t0(), t0() - Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTimestamp(_)));
    }

    #[test]
    fn deserialization_enforces_timestamp_order() {
        let id = UserId::new();
        let json = format!(
            r#"{{"id":"{id}","createdAt":"2024-05-01T12:00:00Z","updatedAt":"2024-04-01T12:00:00Z"}}"#
        );
        assert!(serde_json::from_str::<BaseDetails<UserId>>(&json).is_err());

        let json = format!(
            r#"{{"id":"{id}","createdAt":"2024-05-01T12:00:00Z","updatedAt":"2024-05-02T12:00:00Z"}}"#
        );
        let details: BaseDetails<UserId> = serde_json::from_str(&json).unwrap();
        assert_eq!(*details.id(), id);
    }
}
