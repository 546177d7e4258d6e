use serde::Serialize;
use time::OffsetDateTime;

use crate::application::repos::ProfileView;
use crate::domain::entities::UserRecord;

/// The caller's own account, including private fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub id: i64,
    pub user_name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserRecord> for AccountView {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            user_name: record.user_name,
            email: record.email,
            picture: record.picture,
            created_at: record.created_at,
        }
    }
}

/// Public profile plus whether the viewer follows it, which is never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileDetail {
    #[serde(flatten)]
    pub profile: ProfileView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}
