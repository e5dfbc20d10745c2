//! Row to canonical user mapping

use crate::models::user::{CanonicalUser, RawUserRecord};
use crate::models::UserBatch;

impl From<RawUserRecord> for CanonicalUser {
    fn from(row: RawUserRecord) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

/// Map rows into a [`UserBatch`], keeping their order
///
/// Accepts anything convertible into a [`CanonicalUser`], so feeding the
/// output back in returns an equal batch.
pub fn map_users<I, R>(rows: I) -> UserBatch
where
    I: IntoIterator<Item = R>,
    R: Into<CanonicalUser>,
{
    rows.into_iter().map(Into::into).collect()
}
