//! User record types
//!
//! [`RawUserRecord`] mirrors a row of the `users` table. [`CanonicalUser`] is
//! the shape the third-party API receives. Column values are kept as the JSON
//! form of whatever the database stored, so no column type is assumed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A row from `SELECT id, name, email, created_at FROM users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUserRecord {
    pub id: Value,
    pub name: Value,
    pub email: Value,
    pub created_at: Value,
}

/// The external representation of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalUser {
    pub id: Value,
    pub name: Value,
    pub email: Value,
    pub created_at: Value,
}

/// Canonical users in query result order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserBatch(Vec<CanonicalUser>);

impl UserBatch {
    pub fn new(users: Vec<CanonicalUser>) -> Self {
        Self(users)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn users(&self) -> &[CanonicalUser] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<CanonicalUser> {
        self.0
    }
}

impl FromIterator<CanonicalUser> for UserBatch {
    fn from_iter<I: IntoIterator<Item = CanonicalUser>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
