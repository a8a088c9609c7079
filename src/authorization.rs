//! Permission engine.
//!
//! `rules` holds the rule table as pure functions over entity snapshots.
//! `AuthorizationService` loads those snapshots from the repository on every
//! call, so a decision always reflects current state (lock, block, replies).

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::Role;
use crate::models::*;
use crate::repo::{Repo, RepoResult};

pub mod rules {
    use super::*;

    fn role(actor: Option<&Member>, now: DateTime<Utc>) -> Option<Role> {
        actor.map(|m| m.effective_role(now))
    }

    fn is_staff(actor: Option<&Member>, now: DateTime<Utc>) -> bool {
        matches!(role(actor, now), Some(Role::Admin | Role::Moderator))
    }

    fn is_admin(actor: Option<&Member>, now: DateTime<Utc>) -> bool {
        matches!(role(actor, now), Some(Role::Admin))
    }

    /// Any unblocked, authenticated member.
    fn is_active(actor: Option<&Member>, now: DateTime<Utc>) -> bool {
        matches!(role(actor, now), Some(r) if r >= Role::User)
    }

    fn is_author(actor: Option<&Member>, created_by: Id) -> bool {
        actor.is_some_and(|m| m.id == created_by)
    }

    /// True when every post in the thread was written by the thread's creator.
    pub fn sole_author(thread: &Thread, posts: &[Post]) -> bool {
        posts.iter().all(|p| p.created_by == thread.created_by)
    }

    /// True when another member has replied after `post`.
    pub fn replied_to(post: &Post, posts: &[Post]) -> bool {
        posts.iter()
            .filter(|p| (p.created_on, p.id) > (post.created_on, post.id))
            .any(|p| p.created_by != post.created_by)
    }

    pub fn is_opening_post(post: &Post, posts: &[Post]) -> bool {
        posts.first().is_some_and(|first| first.id == post.id)
    }

    // ── topics ──────────────────────────────────────────────────────

    pub fn can_create_topic(actor: Option<&Member>, now: DateTime<Utc>) -> bool {
        is_staff(actor, now)
    }

    pub fn can_edit_topic(actor: Option<&Member>, _topic: &Topic, now: DateTime<Utc>) -> bool {
        is_staff(actor, now)
    }

    pub fn can_lock_topic(actor: Option<&Member>, _topic: &Topic, now: DateTime<Utc>) -> bool {
        is_staff(actor, now)
    }

    pub fn can_remove_topic(actor: Option<&Member>, _topic: &Topic, now: DateTime<Utc>) -> bool {
        is_admin(actor, now)
    }

    /// Removed topics and threads are only visible to staff.
    pub fn can_view_removed(actor: Option<&Member>, now: DateTime<Utc>) -> bool {
        is_staff(actor, now)
    }

    // ── threads ─────────────────────────────────────────────────────

    pub fn can_create_thread(actor: Option<&Member>, topic: &Topic, now: DateTime<Utc>) -> bool {
        if !is_active(actor, now) || topic.is_removed() { return false; }
        is_staff(actor, now) || !topic.is_locked()
    }

    pub fn can_edit_thread(actor: Option<&Member>, topic: &Topic, thread: &Thread, posts: &[Post], now: DateTime<Utc>) -> bool {
        if is_staff(actor, now) { return true; }
        is_active(actor, now)
            && is_author(actor, thread.created_by)
            && !thread.is_locked()
            && !topic.is_locked()
            && sole_author(thread, posts)
    }

    pub fn can_delete_thread(actor: Option<&Member>, topic: &Topic, thread: &Thread, posts: &[Post], now: DateTime<Utc>) -> bool {
        match role(actor, now) {
            Some(Role::Admin) => true,
            Some(Role::Moderator) => sole_author(thread, posts),
            Some(Role::User) => {
                is_author(actor, thread.created_by)
                    && !thread.is_locked()
                    && !topic.is_locked()
                    && sole_author(thread, posts)
            }
            Some(Role::Blocked) | None => false,
        }
    }

    pub fn can_lock_thread(actor: Option<&Member>, _thread: &Thread, now: DateTime<Utc>) -> bool {
        is_staff(actor, now)
    }

    pub fn can_remove_thread(actor: Option<&Member>, _thread: &Thread, now: DateTime<Utc>) -> bool {
        is_staff(actor, now)
    }

    // ── posts ───────────────────────────────────────────────────────

    pub fn can_create_post(actor: Option<&Member>, topic: &Topic, thread: &Thread, now: DateTime<Utc>) -> bool {
        if !is_active(actor, now) || topic.is_removed() || thread.is_removed() { return false; }
        is_staff(actor, now) || (!topic.is_locked() && !thread.is_locked())
    }

    pub fn can_edit_post(actor: Option<&Member>, topic: &Topic, thread: &Thread, post: &Post, posts: &[Post], now: DateTime<Utc>) -> bool {
        if is_staff(actor, now) { return true; }
        is_active(actor, now)
            && is_author(actor, post.created_by)
            && !post.is_locked()
            && !thread.is_locked()
            && !topic.is_locked()
            && !replied_to(post, posts)
    }

    /// The opening post only goes away together with its thread.
    pub fn can_delete_post(actor: Option<&Member>, topic: &Topic, thread: &Thread, post: &Post, posts: &[Post], now: DateTime<Utc>) -> bool {
        if is_opening_post(post, posts) { return false; }
        can_edit_post(actor, topic, thread, post, posts, now)
    }

    pub fn can_lock_post(actor: Option<&Member>, _post: &Post, now: DateTime<Utc>) -> bool {
        is_staff(actor, now)
    }

    // ── members ─────────────────────────────────────────────────────

    /// Owner (case-insensitive) or admin; never the sentinel; blocked owners may not.
    pub fn can_edit_profile(actor: Option<&Member>, target: &Member, now: DateTime<Utc>) -> bool {
        let Some(m) = actor else { return false };
        if target.is_sentinel() { return false; }
        if is_admin(actor, now) { return true; }
        is_active(actor, now) && m.is_named(&target.username)
    }

    pub fn can_delete_profile(actor: Option<&Member>, target: &Member, now: DateTime<Utc>) -> bool {
        can_edit_profile(actor, target, now)
    }

    /// Admins block anyone but other admins; moderators only plain users.
    pub fn can_block_member(actor: Option<&Member>, target: &Member, now: DateTime<Utc>) -> bool {
        let Some(m) = actor else { return false };
        if target.is_sentinel() || m.id == target.id { return false; }
        match m.effective_role(now) {
            Role::Admin => target.role != Role::Admin,
            Role::Moderator => target.role == Role::User,
            Role::User | Role::Blocked => false,
        }
    }

    /// Admins lift any block, including one on a member promoted while blocked.
    pub fn can_unblock_member(actor: Option<&Member>, target: &Member, now: DateTime<Utc>) -> bool {
        let Some(m) = actor else { return false };
        if target.is_sentinel() || m.id == target.id { return false; }
        match m.effective_role(now) {
            Role::Admin => true,
            Role::Moderator => target.role == Role::User,
            Role::User | Role::Blocked => false,
        }
    }

    pub fn can_change_role(actor: Option<&Member>, target: &Member, now: DateTime<Utc>) -> bool {
        let Some(m) = actor else { return false };
        is_admin(actor, now) && !target.is_sentinel() && m.id != target.id
    }

    pub fn can_list_members(actor: Option<&Member>, now: DateTime<Utc>) -> bool {
        is_staff(actor, now)
    }
}

/// Evaluates the rule table against live repository state.
#[derive(Clone)]
pub struct AuthorizationService {
    repo: Arc<dyn Repo>,
}

impl AuthorizationService {
    pub fn new(repo: Arc<dyn Repo>) -> Self { Self { repo } }

    pub fn can_create_topic(&self, actor: Option<&Member>) -> bool {
        rules::can_create_topic(actor, Utc::now())
    }

    pub async fn can_edit_topic(&self, actor: Option<&Member>, topic_id: Id) -> RepoResult<bool> {
        let topic = self.repo.get_topic(topic_id).await?;
        Ok(rules::can_edit_topic(actor, &topic, Utc::now()))
    }

    pub async fn can_lock_topic(&self, actor: Option<&Member>, topic_id: Id) -> RepoResult<bool> {
        let topic = self.repo.get_topic(topic_id).await?;
        Ok(rules::can_lock_topic(actor, &topic, Utc::now()))
    }

    pub async fn can_remove_topic(&self, actor: Option<&Member>, topic_id: Id) -> RepoResult<bool> {
        let topic = self.repo.get_topic(topic_id).await?;
        Ok(rules::can_remove_topic(actor, &topic, Utc::now()))
    }

    pub async fn can_create_thread(&self, actor: Option<&Member>, topic_id: Id) -> RepoResult<bool> {
        let topic = self.repo.get_topic(topic_id).await?;
        Ok(rules::can_create_thread(actor, &topic, Utc::now()))
    }

    pub async fn can_edit_thread(&self, actor: Option<&Member>, thread_id: Id) -> RepoResult<bool> {
        let (topic, thread, posts) = self.thread_context(thread_id).await?;
        Ok(rules::can_edit_thread(actor, &topic, &thread, &posts, Utc::now()))
    }

    pub async fn can_delete_thread(&self, actor: Option<&Member>, thread_id: Id) -> RepoResult<bool> {
        let (topic, thread, posts) = self.thread_context(thread_id).await?;
        Ok(rules::can_delete_thread(actor, &topic, &thread, &posts, Utc::now()))
    }

    pub async fn can_lock_thread(&self, actor: Option<&Member>, thread_id: Id) -> RepoResult<bool> {
        let thread = self.repo.get_thread(thread_id).await?;
        Ok(rules::can_lock_thread(actor, &thread, Utc::now()))
    }

    pub async fn can_remove_thread(&self, actor: Option<&Member>, thread_id: Id) -> RepoResult<bool> {
        let thread = self.repo.get_thread(thread_id).await?;
        Ok(rules::can_remove_thread(actor, &thread, Utc::now()))
    }

    pub async fn can_create_post(&self, actor: Option<&Member>, thread_id: Id) -> RepoResult<bool> {
        let thread = self.repo.get_thread(thread_id).await?;
        let topic = self.repo.get_topic(thread.topic_id).await?;
        Ok(rules::can_create_post(actor, &topic, &thread, Utc::now()))
    }

    pub async fn can_edit_post(&self, actor: Option<&Member>, post_id: Id) -> RepoResult<bool> {
        let post = self.repo.get_post(post_id).await?;
        let (topic, thread, posts) = self.thread_context(post.thread_id).await?;
        Ok(rules::can_edit_post(actor, &topic, &thread, &post, &posts, Utc::now()))
    }

    pub async fn can_delete_post(&self, actor: Option<&Member>, post_id: Id) -> RepoResult<bool> {
        let post = self.repo.get_post(post_id).await?;
        let (topic, thread, posts) = self.thread_context(post.thread_id).await?;
        Ok(rules::can_delete_post(actor, &topic, &thread, &post, &posts, Utc::now()))
    }

    pub async fn can_lock_post(&self, actor: Option<&Member>, post_id: Id) -> RepoResult<bool> {
        let post = self.repo.get_post(post_id).await?;
        Ok(rules::can_lock_post(actor, &post, Utc::now()))
    }

    pub async fn can_edit_profile(&self, actor: Option<&Member>, username: &str) -> RepoResult<bool> {
        let target = self.repo.find_member(username).await?;
        Ok(rules::can_edit_profile(actor, &target, Utc::now()))
    }

    pub async fn can_delete_profile(&self, actor: Option<&Member>, username: &str) -> RepoResult<bool> {
        let target = self.repo.find_member(username).await?;
        Ok(rules::can_delete_profile(actor, &target, Utc::now()))
    }

    pub async fn can_block_member(&self, actor: Option<&Member>, member_id: Id) -> RepoResult<bool> {
        let target = self.repo.get_member(member_id).await?;
        Ok(rules::can_block_member(actor, &target, Utc::now()))
    }

    pub async fn can_unblock_member(&self, actor: Option<&Member>, member_id: Id) -> RepoResult<bool> {
        let target = self.repo.get_member(member_id).await?;
        Ok(rules::can_unblock_member(actor, &target, Utc::now()))
    }

    pub async fn can_change_role(&self, actor: Option<&Member>, member_id: Id) -> RepoResult<bool> {
        let target = self.repo.get_member(member_id).await?;
        Ok(rules::can_change_role(actor, &target, Utc::now()))
    }

    async fn thread_context(&self, thread_id: Id) -> RepoResult<(Topic, Thread, Vec<Post>)> {
        let thread = self.repo.get_thread(thread_id).await?;
        let topic = self.repo.get_topic(thread.topic_id).await?;
        let posts = self.repo.list_posts(thread_id).await?;
        Ok((topic, thread, posts))
    }
}
