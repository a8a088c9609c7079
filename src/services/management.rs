use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::shared::{AuthorRef, SharedService};
use super::thread::ThreadService;
use crate::auth::{Claims, Role};
use crate::authorization::{rules, AuthorizationService};
use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberSummary {
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub effective_role: Role,
    pub created_on: DateTime<Utc>,
    pub blocked_by: Option<AuthorRef>,
    pub blocked_on: Option<DateTime<Utc>>,
    pub blocked_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BlockRequest {
    /// Omit for an indefinite block.
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleChange {
    pub role: Role,
}

/// Member administration and thread moderation.
#[derive(Clone)]
pub struct ForumManagementService {
    repo: Arc<dyn Repo>,
    authz: AuthorizationService,
    shared: SharedService,
    threads: ThreadService,
}

impl ForumManagementService {
    pub fn new(repo: Arc<dyn Repo>, authz: AuthorizationService, shared: SharedService, threads: ThreadService) -> Self {
        Self { repo, authz, shared, threads }
    }

    pub async fn members(&self, auth: Option<&Claims>) -> Result<Vec<MemberSummary>, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = rules::can_list_members(actor.as_ref(), Utc::now());
        self.shared.permit(allowed, actor, "list members")?;
        let members = self.repo.list_members().await?;
        let names: HashMap<Id, String> = members.iter().map(|m| (m.id, m.username.clone())).collect();
        let now = Utc::now();
        Ok(members.iter()
            .filter(|m| !m.is_sentinel())
            .map(|m| summarize(m, &names, now))
            .collect())
    }

    pub async fn block(&self, auth: Option<&Claims>, member_id: Id, req: BlockRequest) -> Result<MemberSummary, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_block_member(actor.as_ref(), member_id).await?;
        let actor = self.shared.permit(allowed, actor, "block member")?;
        let now = Utc::now();
        if req.until.is_some_and(|until| until <= now) {
            return Err(ApiError::validation("until must be in the future"));
        }
        let mut target = self.repo.get_member(member_id).await?;
        target.blocked_by = Some(actor.id);
        target.blocked_on = Some(now);
        target.blocked_end = req.until;
        self.repo.save_member(&target).await?;
        info!(member = member_id, by = actor.id, until = ?req.until, "member blocked");
        self.summary(&target).await
    }

    pub async fn unblock(&self, auth: Option<&Claims>, member_id: Id) -> Result<MemberSummary, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_unblock_member(actor.as_ref(), member_id).await?;
        let actor = self.shared.permit(allowed, actor, "unblock member")?;
        let mut target = self.repo.get_member(member_id).await?;
        target.blocked_by = None;
        target.blocked_on = None;
        target.blocked_end = None;
        self.repo.save_member(&target).await?;
        info!(member = member_id, by = actor.id, "member unblocked");
        self.summary(&target).await
    }

    pub async fn set_role(&self, auth: Option<&Claims>, member_id: Id, change: RoleChange) -> Result<MemberSummary, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_change_role(actor.as_ref(), member_id).await?;
        let actor = self.shared.permit(allowed, actor, "change role")?;
        let mut target = self.repo.get_member(member_id).await?;
        target.role = change.role;
        self.repo.save_member(&target).await?;
        info!(member = member_id, by = actor.id, role = change.role.as_str(), "role changed");
        self.summary(&target).await
    }

    pub async fn remove_thread(&self, auth: Option<&Claims>, thread_id: Id) -> Result<Thread, ApiError> {
        self.threads.set_removed(auth, thread_id, true).await
    }

    pub async fn restore_thread(&self, auth: Option<&Claims>, thread_id: Id) -> Result<Thread, ApiError> {
        self.threads.set_removed(auth, thread_id, false).await
    }

    async fn summary(&self, member: &Member) -> Result<MemberSummary, ApiError> {
        let names = self.shared.author_names().await?;
        Ok(summarize(member, &names, Utc::now()))
    }
}

fn summarize(m: &Member, names: &HashMap<Id, String>, now: DateTime<Utc>) -> MemberSummary {
    MemberSummary {
        id: m.id,
        username: m.username.clone(),
        first_name: m.first_name.clone(),
        last_name: m.last_name.clone(),
        role: m.role,
        effective_role: m.effective_role(now),
        created_on: m.created_on,
        blocked_by: m.blocked_by.map(|id| SharedService::author(names, id)),
        blocked_on: m.blocked_on,
        blocked_end: m.blocked_end,
    }
}
