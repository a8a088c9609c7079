use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::shared::{optional_text, SharedService};
use crate::auth::{Claims, Role};
use crate::authorization::{rules, AuthorizationService};
use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;

const NAME_MAX: usize = 50;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileView {
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub created_on: DateTime<Utc>,
    pub role: Role,
    pub blocked: bool,
    pub blocked_end: Option<DateTime<Utc>>,
    pub activity: MemberActivity,
    pub has_image: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_block: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct ProfileService {
    repo: Arc<dyn Repo>,
    authz: AuthorizationService,
    shared: SharedService,
}

impl ProfileService {
    pub fn new(repo: Arc<dyn Repo>, authz: AuthorizationService, shared: SharedService) -> Self {
        Self { repo, authz, shared }
    }

    pub async fn get(&self, auth: Option<&Claims>, username: &str) -> Result<ProfileView, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let target = self.repo.find_member(username).await?;
        let activity = self.repo.member_activity(target.id).await?;
        let now = Utc::now();
        let actor = actor.as_ref();
        Ok(ProfileView {
            id: target.id,
            username: target.username.clone(),
            first_name: target.first_name.clone(),
            last_name: target.last_name.clone(),
            birth_date: target.birth_date,
            created_on: target.created_on,
            role: target.role,
            blocked: target.is_blocked(now),
            blocked_end: target.blocked_end,
            activity,
            has_image: target.profile_image.is_some(),
            can_edit: rules::can_edit_profile(actor, &target, now),
            can_delete: rules::can_delete_profile(actor, &target, now),
            can_block: rules::can_block_member(actor, &target, now),
        })
    }

    pub async fn update(&self, auth: Option<&Claims>, username: &str, upd: UpdateProfile) -> Result<ProfileView, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_edit_profile(actor.as_ref(), username).await?;
        let actor = self.shared.permit(allowed, actor, "edit profile")?;
        let mut target = self.repo.find_member(username).await?;
        if let Some(first) = upd.first_name { target.first_name = optional_text("first_name", &first, NAME_MAX)?; }
        if let Some(last) = upd.last_name { target.last_name = optional_text("last_name", &last, NAME_MAX)?; }
        if let Some(born) = upd.birth_date {
            if born > Utc::now().date_naive() {
                return Err(ApiError::validation("birth_date cannot be in the future"));
            }
            target.birth_date = Some(born);
        }
        self.repo.save_member(&target).await?;
        info!(member = target.id, by = actor.id, "profile updated");
        self.get(auth, username).await
    }

    pub async fn set_image(&self, auth: Option<&Claims>, username: &str, bytes: Vec<u8>) -> Result<(), ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_edit_profile(actor.as_ref(), username).await?;
        let actor = self.shared.permit(allowed, actor, "edit profile image")?;
        let mut target = self.repo.find_member(username).await?;
        target.profile_image = if bytes.is_empty() { None } else { Some(bytes) };
        self.repo.save_member(&target).await?;
        info!(member = target.id, by = actor.id, "profile image changed");
        Ok(())
    }

    /// Raw image bytes plus a sniffed content type.
    pub async fn image(&self, username: &str) -> Result<(Vec<u8>, String), ApiError> {
        let target = self.repo.find_member(username).await?;
        let bytes = target.profile_image.ok_or(ApiError::NotFound)?;
        let mime = infer::get(&bytes)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        Ok((bytes, mime))
    }

    /// Hands everything the member touched to the sentinel, then removes the member.
    pub async fn delete(&self, auth: Option<&Claims>, username: &str) -> Result<(), ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_delete_profile(actor.as_ref(), username).await?;
        let actor = self.shared.permit(allowed, actor, "delete profile")?;
        let target = self.repo.find_member(username).await?;
        let sentinel = self.shared.sentinel().await?;
        self.repo.delete_member(target.id, sentinel.id).await?;
        info!(member = target.id, by = actor.id, sentinel = sentinel.id, "member deleted and content reassigned");
        Ok(())
    }
}
