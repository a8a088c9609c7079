use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::shared::{required_text, SharedService};
use super::thread::{post_view, PostView, CONTENT_MAX};
use crate::auth::Claims;
use crate::authorization::{rules, AuthorizationService};
use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn Repo>,
    authz: AuthorizationService,
    shared: SharedService,
}

impl PostService {
    pub fn new(repo: Arc<dyn Repo>, authz: AuthorizationService, shared: SharedService) -> Self {
        Self { repo, authz, shared }
    }

    pub async fn get(&self, auth: Option<&Claims>, id: Id) -> Result<PostView, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let now = Utc::now();
        let post = self.repo.get_post(id).await?;
        let thread = self.repo.get_thread(post.thread_id).await?;
        let topic = self.repo.get_topic(thread.topic_id).await?;
        if (thread.is_removed() || topic.is_removed()) && !rules::can_view_removed(actor.as_ref(), now) {
            return Err(ApiError::NotFound);
        }
        let posts = self.repo.list_posts(thread.id).await?;
        let names = self.shared.author_names().await?;
        Ok(post_view(actor.as_ref(), &topic, &thread, &post, &posts, &names, now))
    }

    pub async fn add(&self, auth: Option<&Claims>, thread_id: Id, new: NewPost) -> Result<Post, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_create_post(actor.as_ref(), thread_id).await?;
        let actor = self.shared.permit(allowed, actor, "create post")?;
        let new = NewPost { content: required_text("content", &new.content, CONTENT_MAX)? };
        let post = self.repo.create_post(thread_id, new, actor.id).await?;
        info!(post = post.id, thread = thread_id, by = actor.id, "post created");
        Ok(post)
    }

    pub async fn update(&self, auth: Option<&Claims>, id: Id, upd: UpdatePost) -> Result<Post, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_edit_post(actor.as_ref(), id).await?;
        let actor = self.shared.permit(allowed, actor, "edit post")?;
        let mut post = self.repo.get_post(id).await?;
        post.content = required_text("content", &upd.content, CONTENT_MAX)?;
        post.edited_by = Some(actor.id);
        post.edited_on = Some(Utc::now());
        self.repo.save_post(&post).await?;
        Ok(post)
    }

    pub async fn delete(&self, auth: Option<&Claims>, id: Id) -> Result<(), ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let post = self.repo.get_post(id).await?;
        let posts = self.repo.list_posts(post.thread_id).await?;
        // only those who could otherwise touch the post learn why it stays
        if rules::is_opening_post(&post, &posts) {
            let allowed = self.authz.can_edit_post(actor.as_ref(), id).await?;
            self.shared.permit(allowed, actor, "delete post")?;
            return Err(ApiError::validation("the opening post is removed by deleting its thread"));
        }
        let allowed = self.authz.can_delete_post(actor.as_ref(), id).await?;
        let actor = self.shared.permit(allowed, actor, "delete post")?;
        self.repo.delete_post(id).await?;
        info!(post = id, by = actor.id, "post deleted");
        Ok(())
    }

    pub async fn lock(&self, auth: Option<&Claims>, id: Id) -> Result<Post, ApiError> {
        self.set_locked(auth, id, true).await
    }

    pub async fn unlock(&self, auth: Option<&Claims>, id: Id) -> Result<Post, ApiError> {
        self.set_locked(auth, id, false).await
    }

    async fn set_locked(&self, auth: Option<&Claims>, id: Id, locked: bool) -> Result<Post, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_lock_post(actor.as_ref(), id).await?;
        let actor = self.shared.permit(allowed, actor, "lock post")?;
        let mut post = self.repo.get_post(id).await?;
        if locked {
            post.locked_by = Some(actor.id);
            post.locked_on = Some(Utc::now());
        } else {
            post.locked_by = None;
            post.locked_on = None;
        }
        self.repo.save_post(&post).await?;
        info!(post = id, by = actor.id, locked, "post lock changed");
        Ok(post)
    }
}
