use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User row as exposed to clients. The password column is never selected.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime, // set by storage on insert
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime, // maintained by an update trigger
}
