use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::auth::{Claims, Role};
use crate::error::ApiError;
use crate::models::{Id, Member, NewMember, DELETED_MEMBER};
use crate::repo::{Repo, RepoError};

/// Author reference embedded in view-models.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorRef {
    pub id: Id,
    pub username: String,
}

/// Lookups every feature service needs: who is asking, and who wrote what.
#[derive(Clone)]
pub struct SharedService {
    repo: Arc<dyn Repo>,
}

impl SharedService {
    pub fn new(repo: Arc<dyn Repo>) -> Self { Self { repo } }

    /// Reloads the member behind the token. A token for a deleted member reads as anonymous.
    pub async fn current_member(&self, auth: Option<&Claims>) -> Result<Option<Member>, ApiError> {
        let Some(id) = auth.and_then(Claims::member_id) else { return Ok(None) };
        match self.repo.get_member(id).await {
            Ok(m) if m.is_sentinel() => Ok(None),
            Ok(m) => Ok(Some(m)),
            Err(RepoError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn require_member(&self, auth: Option<&Claims>) -> Result<Member, ApiError> {
        self.current_member(auth).await?.ok_or(ApiError::Unauthorized)
    }

    /// Turns a rule decision into the acting member or the matching error.
    pub fn permit(&self, allowed: bool, actor: Option<Member>, action: &str) -> Result<Member, ApiError> {
        match actor {
            Some(m) if allowed => Ok(m),
            Some(m) => {
                debug!(member = m.id, action, "access denied");
                Err(ApiError::Forbidden)
            }
            None => Err(ApiError::Unauthorized),
        }
    }

    pub async fn author_names(&self) -> Result<HashMap<Id, String>, ApiError> {
        Ok(self.repo.member_names().await?.into_iter().collect())
    }

    pub fn author(names: &HashMap<Id, String>, id: Id) -> AuthorRef {
        AuthorRef {
            id,
            username: names.get(&id).cloned().unwrap_or_else(|| DELETED_MEMBER.to_string()),
        }
    }

    pub async fn sentinel(&self) -> Result<Member, ApiError> {
        Ok(self.repo.find_member(DELETED_MEMBER).await?)
    }

    /// Creates the sentinel account on first start.
    pub async fn ensure_sentinel(&self) -> Result<Member, ApiError> {
        match self.repo.find_member(DELETED_MEMBER).await {
            Ok(m) => Ok(m),
            Err(RepoError::NotFound) => {
                let m = self.repo.create_member(NewMember {
                    username: DELETED_MEMBER.to_string(),
                    // not a PHC string, so no password ever verifies
                    password_hash: "!".to_string(),
                    first_name: String::new(),
                    last_name: String::new(),
                    birth_date: None,
                    role: Role::Blocked,
                }).await?;
                info!(id = m.id, "created sentinel member");
                Ok(m)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Trims `value` and checks it is non-empty and at most `max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, ApiError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    if v.chars().count() > max {
        return Err(ApiError::validation(format!("{field} must be at most {max} characters")));
    }
    Ok(v.to_string())
}

pub fn optional_text(field: &str, value: &str, max: usize) -> Result<String, ApiError> {
    let v = value.trim();
    if v.chars().count() > max {
        return Err(ApiError::validation(format!("{field} must be at most {max} characters")));
    }
    Ok(v.to_string())
}
