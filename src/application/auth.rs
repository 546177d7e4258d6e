//! Authenticated caller identity, as asserted by the identity provider.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: i64,
    pub user_name: String,
}

impl Identity {
    pub fn new(user_id: i64, user_name: impl Into<String>) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
        }
    }
}

/// Identifier of the optional viewer, as used by visibility checks.
pub fn viewer_id(viewer: Option<&Identity>) -> Option<i64> {
    viewer.map(|identity| identity.user_id)
}
