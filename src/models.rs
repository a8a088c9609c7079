use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;

pub type Id = i64;

/// Username of the sentinel account that inherits a deleted member's content.
pub const DELETED_MEMBER: &str = "DELETED";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Id,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub role: Role,
    pub created_on: DateTime<Utc>,
    pub blocked_by: Option<Id>,
    pub blocked_on: Option<DateTime<Utc>>,
    pub blocked_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub profile_image: Option<Vec<u8>>,
}

impl Member {
    /// A block applies while `blocked_by` is set and `blocked_end` has not passed.
    pub fn is_blocked(&self, now: DateTime<Utc>) -> bool {
        self.blocked_by.is_some() && self.blocked_end.map_or(true, |end| end > now)
    }

    pub fn effective_role(&self, now: DateTime<Utc>) -> Role {
        if self.is_blocked(now) { Role::Blocked } else { self.role }
    }

    pub fn is_sentinel(&self) -> bool {
        self.username.eq_ignore_ascii_case(DELETED_MEMBER)
    }

    pub fn is_named(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username)
    }
}

#[derive(Debug, Clone)]
pub struct NewMember {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Topic {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub created_by: Id,
    pub created_on: DateTime<Utc>,
    pub edited_by: Option<Id>,
    pub edited_on: Option<DateTime<Utc>>,
    pub locked_by: Option<Id>,
    pub locked_on: Option<DateTime<Utc>>,
    pub removed_by: Option<Id>,
    pub removed_on: Option<DateTime<Utc>>,
}

impl Topic {
    pub fn is_locked(&self) -> bool { self.locked_by.is_some() }
    pub fn is_removed(&self) -> bool { self.removed_by.is_some() }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewTopic {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateTopic {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Thread {
    pub id: Id,
    pub topic_id: Id,
    pub subject: String,
    pub created_by: Id,
    pub created_on: DateTime<Utc>,
    pub edited_by: Option<Id>,
    pub edited_on: Option<DateTime<Utc>>,
    pub locked_by: Option<Id>,
    pub locked_on: Option<DateTime<Utc>>,
    pub removed_by: Option<Id>,
    pub removed_on: Option<DateTime<Utc>>,
}

impl Thread {
    pub fn is_locked(&self) -> bool { self.locked_by.is_some() }
    pub fn is_removed(&self) -> bool { self.removed_by.is_some() }
}

/// Thread subject plus the content of its opening post.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewThread {
    pub subject: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateThread {
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Post {
    pub id: Id,
    pub thread_id: Id,
    pub content: String,
    pub created_by: Id,
    pub created_on: DateTime<Utc>,
    pub edited_by: Option<Id>,
    pub edited_on: Option<DateTime<Utc>>,
    pub locked_by: Option<Id>,
    pub locked_on: Option<DateTime<Utc>>,
}

impl Post {
    pub fn is_locked(&self) -> bool { self.locked_by.is_some() }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPost {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePost {
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct MemberActivity {
    pub threads: i64,
    pub posts: i64,
}
