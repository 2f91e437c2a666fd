use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::{Deserialize, Serialize};

use crate::access::AccessList;
use crate::mentions::Mention;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserSummary {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(rename = "_id")]
    pub id: String,
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    pub location: String,
    pub description: String,
    pub occupation: String,
    pub favorites: Vec<String>,
    pub liked: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub login_name: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub occupation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Photo {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub date_time: String,
    pub likes: i64,
    pub access_list: AccessList,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub comment: String,
    pub date_time: String,
    /// Author summary; `None` when the author no longer exists.
    pub user: Option<UserSummary>,
    pub mentions: Vec<Mention>,
}

/// A comment listed under its author, with the photo it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AuthoredComment {
    #[serde(rename = "_id")]
    pub id: String,
    pub comment: String,
    pub date_time: String,
    pub photo_id: String,
    pub file_name: String,
    pub photo_owner_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PhotoUpload,
    CommentAdded,
    UserRegistered,
    UserLogin,
    UserLogout,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::PhotoUpload,
        ActivityKind::CommentAdded,
        ActivityKind::UserRegistered,
        ActivityKind::UserLogin,
        ActivityKind::UserLogout,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::PhotoUpload => "photo_upload",
            ActivityKind::CommentAdded => "comment_added",
            ActivityKind::UserRegistered => "user_registered",
            ActivityKind::UserLogin => "user_login",
            ActivityKind::UserLogout => "user_logout",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "photo_upload" => Some(ActivityKind::PhotoUpload),
            "comment_added" => Some(ActivityKind::CommentAdded),
            "user_registered" => Some(ActivityKind::UserRegistered),
            "user_login" => Some(ActivityKind::UserLogin),
            "user_logout" => Some(ActivityKind::UserLogout),
            _ => None,
        }
    }
}

impl FromSql for ActivityKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        ActivityKind::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown activity kind: {}", text).into()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub comment: String,
}

/// An activity entry hydrated for display.
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    #[serde(rename = "_id")]
    pub id: String,
    pub kind: ActivityKind,
    pub date_time: String,
    pub user_id: String,
    pub user: Option<UserSummary>,
    pub photo: Option<PhotoRef>,
    pub comment: Option<CommentRef>,
}
