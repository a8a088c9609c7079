use async_trait::async_trait;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait MemberRepo: Send + Sync {
    async fn list_members(&self) -> RepoResult<Vec<Member>>;
    /// Id and username of every member, without profile data.
    async fn member_names(&self) -> RepoResult<Vec<(Id, String)>>;
    async fn get_member(&self, id: Id) -> RepoResult<Member>;
    /// Case-insensitive username lookup.
    async fn find_member(&self, username: &str) -> RepoResult<Member>;
    async fn create_member(&self, new: NewMember) -> RepoResult<Member>;
    async fn save_member(&self, member: &Member) -> RepoResult<()>;
    async fn member_activity(&self, id: Id) -> RepoResult<MemberActivity>;
    /// Reassigns every actor reference to `id` onto `sentinel`, then removes the member.
    /// Runs as one unit: either everything moves or nothing does.
    async fn delete_member(&self, id: Id, sentinel: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait TopicRepo: Send + Sync {
    async fn list_topics(&self, include_removed: bool) -> RepoResult<Vec<Topic>>;
    async fn get_topic(&self, id: Id) -> RepoResult<Topic>;
    async fn create_topic(&self, new: NewTopic, actor: Id) -> RepoResult<Topic>;
    async fn save_topic(&self, topic: &Topic) -> RepoResult<()>;
}

#[async_trait]
pub trait ThreadRepo: Send + Sync {
    /// Newest first.
    async fn list_threads(&self, topic_id: Id, include_removed: bool) -> RepoResult<Vec<Thread>>;
    async fn get_thread(&self, id: Id) -> RepoResult<Thread>;
    /// Creates the thread together with its opening post, atomically.
    async fn create_thread(&self, topic_id: Id, new: NewThread, actor: Id) -> RepoResult<(Thread, Post)>;
    async fn save_thread(&self, thread: &Thread) -> RepoResult<()>;
    /// Deletes the thread and all of its posts, atomically.
    async fn delete_thread(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Oldest first; the head of the list is the opening post.
    async fn list_posts(&self, thread_id: Id) -> RepoResult<Vec<Post>>;
    async fn get_post(&self, id: Id) -> RepoResult<Post>;
    async fn create_post(&self, thread_id: Id, new: NewPost, actor: Id) -> RepoResult<Post>;
    async fn save_post(&self, post: &Post) -> RepoResult<()>;
    async fn delete_post(&self, id: Id) -> RepoResult<()>;
}

pub trait Repo: MemberRepo + TopicRepo + ThreadRepo + PostRepo {}

impl<T> Repo for T where T: MemberRepo + TopicRepo + ThreadRepo + PostRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem;

#[cfg(feature = "postgres-store")]
pub mod pg;
