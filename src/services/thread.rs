use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use super::shared::{required_text, AuthorRef, SharedService};
use crate::auth::Claims;
use crate::authorization::{rules, AuthorizationService};
use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;

pub(crate) const SUBJECT_MAX: usize = 150;
pub(crate) const CONTENT_MAX: usize = 10_000;

#[derive(Debug, Serialize, ToSchema)]
pub struct PostView {
    pub id: Id,
    pub thread_id: Id,
    pub content: String,
    pub created_by: AuthorRef,
    pub created_on: DateTime<Utc>,
    pub edited_by: Option<AuthorRef>,
    pub edited_on: Option<DateTime<Utc>>,
    pub locked: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_lock: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadView {
    pub id: Id,
    pub topic_id: Id,
    pub topic_title: String,
    pub subject: String,
    pub created_by: AuthorRef,
    pub created_on: DateTime<Utc>,
    pub edited_by: Option<AuthorRef>,
    pub edited_on: Option<DateTime<Utc>>,
    pub locked: bool,
    pub removed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadPage {
    pub thread: ThreadView,
    pub posts: Vec<PostView>,
    pub can_reply: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_lock: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedThread {
    pub thread: Thread,
    pub opening_post: Post,
}

/// Builds the view of one post; `posts` is the whole thread, oldest first.
pub(crate) fn post_view(
    actor: Option<&Member>,
    topic: &Topic,
    thread: &Thread,
    post: &Post,
    posts: &[Post],
    names: &HashMap<Id, String>,
    now: DateTime<Utc>,
) -> PostView {
    PostView {
        id: post.id,
        thread_id: post.thread_id,
        content: post.content.clone(),
        created_by: SharedService::author(names, post.created_by),
        created_on: post.created_on,
        edited_by: post.edited_by.map(|id| SharedService::author(names, id)),
        edited_on: post.edited_on,
        locked: post.is_locked(),
        can_edit: rules::can_edit_post(actor, topic, thread, post, posts, now),
        can_delete: rules::can_delete_post(actor, topic, thread, post, posts, now),
        can_lock: rules::can_lock_post(actor, post, now),
    }
}

#[derive(Clone)]
pub struct ThreadService {
    repo: Arc<dyn Repo>,
    authz: AuthorizationService,
    shared: SharedService,
}

impl ThreadService {
    pub fn new(repo: Arc<dyn Repo>, authz: AuthorizationService, shared: SharedService) -> Self {
        Self { repo, authz, shared }
    }

    pub async fn page(&self, auth: Option<&Claims>, id: Id) -> Result<ThreadPage, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let now = Utc::now();
        let thread = self.repo.get_thread(id).await?;
        let topic = self.repo.get_topic(thread.topic_id).await?;
        if (thread.is_removed() || topic.is_removed()) && !rules::can_view_removed(actor.as_ref(), now) {
            return Err(ApiError::NotFound);
        }
        let posts = self.repo.list_posts(id).await?;
        let names = self.shared.author_names().await?;
        let actor = actor.as_ref();
        Ok(ThreadPage {
            thread: ThreadView {
                id: thread.id,
                topic_id: topic.id,
                topic_title: topic.title.clone(),
                subject: thread.subject.clone(),
                created_by: SharedService::author(&names, thread.created_by),
                created_on: thread.created_on,
                edited_by: thread.edited_by.map(|id| SharedService::author(&names, id)),
                edited_on: thread.edited_on,
                locked: thread.is_locked(),
                removed: thread.is_removed(),
            },
            posts: posts.iter()
                .map(|p| post_view(actor, &topic, &thread, p, &posts, &names, now))
                .collect(),
            can_reply: rules::can_create_post(actor, &topic, &thread, now),
            can_edit: rules::can_edit_thread(actor, &topic, &thread, &posts, now),
            can_delete: rules::can_delete_thread(actor, &topic, &thread, &posts, now),
            can_lock: rules::can_lock_thread(actor, &thread, now),
        })
    }

    pub async fn add(&self, auth: Option<&Claims>, topic_id: Id, new: NewThread) -> Result<CreatedThread, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_create_thread(actor.as_ref(), topic_id).await?;
        let actor = self.shared.permit(allowed, actor, "create thread")?;
        let new = NewThread {
            subject: required_text("subject", &new.subject, SUBJECT_MAX)?,
            content: required_text("content", &new.content, CONTENT_MAX)?,
        };
        let (thread, opening_post) = self.repo.create_thread(topic_id, new, actor.id).await?;
        info!(thread = thread.id, topic = topic_id, by = actor.id, "thread created");
        Ok(CreatedThread { thread, opening_post })
    }

    pub async fn update(&self, auth: Option<&Claims>, id: Id, upd: UpdateThread) -> Result<Thread, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_edit_thread(actor.as_ref(), id).await?;
        let actor = self.shared.permit(allowed, actor, "edit thread")?;
        let mut thread = self.repo.get_thread(id).await?;
        thread.subject = required_text("subject", &upd.subject, SUBJECT_MAX)?;
        thread.edited_by = Some(actor.id);
        thread.edited_on = Some(Utc::now());
        self.repo.save_thread(&thread).await?;
        Ok(thread)
    }

    pub async fn delete(&self, auth: Option<&Claims>, id: Id) -> Result<(), ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_delete_thread(actor.as_ref(), id).await?;
        let actor = self.shared.permit(allowed, actor, "delete thread")?;
        self.repo.delete_thread(id).await?;
        info!(thread = id, by = actor.id, "thread deleted");
        Ok(())
    }

    pub async fn lock(&self, auth: Option<&Claims>, id: Id) -> Result<Thread, ApiError> {
        self.set_locked(auth, id, true).await
    }

    pub async fn unlock(&self, auth: Option<&Claims>, id: Id) -> Result<Thread, ApiError> {
        self.set_locked(auth, id, false).await
    }

    async fn set_locked(&self, auth: Option<&Claims>, id: Id, locked: bool) -> Result<Thread, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_lock_thread(actor.as_ref(), id).await?;
        let actor = self.shared.permit(allowed, actor, "lock thread")?;
        let mut thread = self.repo.get_thread(id).await?;
        if locked {
            thread.locked_by = Some(actor.id);
            thread.locked_on = Some(Utc::now());
        } else {
            thread.locked_by = None;
            thread.locked_on = None;
        }
        self.repo.save_thread(&thread).await?;
        info!(thread = id, by = actor.id, locked, "thread lock changed");
        Ok(thread)
    }

    /// Soft moderation removal; the thread stays in storage and can be restored.
    pub async fn set_removed(&self, auth: Option<&Claims>, id: Id, removed: bool) -> Result<Thread, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_remove_thread(actor.as_ref(), id).await?;
        let actor = self.shared.permit(allowed, actor, "remove thread")?;
        let mut thread = self.repo.get_thread(id).await?;
        if removed {
            if thread.removed_by.is_none() {
                thread.removed_by = Some(actor.id);
                thread.removed_on = Some(Utc::now());
            }
        } else {
            thread.removed_by = None;
            thread.removed_on = None;
        }
        self.repo.save_thread(&thread).await?;
        info!(thread = id, by = actor.id, removed, "thread visibility changed");
        Ok(thread)
    }
}
