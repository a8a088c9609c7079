use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::*;

#[derive(Default, Serialize, Deserialize)]
struct State {
    members: HashMap<Id, Member>,
    topics:  HashMap<Id, Topic>,
    threads: HashMap<Id, Thread>,
    posts:   HashMap<Id, Post>,
    next_id: Id,
}

impl State {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn username_taken(&self, username: &str) -> bool {
        self.members.values().any(|m| m.is_named(username))
    }
}

/// Process-local repository, optionally mirrored to a JSON snapshot after every write.
#[derive(Clone)]
pub struct InMemRepo {
    state: Arc<RwLock<State>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl InMemRepo {
    /// Loads the snapshot at `path` (if any) and keeps writing to it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = Self::load_state_from(&path);
        Self { state: Arc::new(RwLock::new(state)), snapshot_path: Some(Arc::new(path)) }
    }

    /// Nothing is read from or written to disk.
    pub fn ephemeral() -> Self {
        Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
    }

    fn load_state_from(path: &Path) -> State {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                Ok(s) => {
                    info!(path = %path.display(), "loaded snapshot");
                    s
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse snapshot; starting empty");
                    State::default()
                }
            },
            Err(e) => {
                info!(path = %path.display(), error = %e, "no snapshot; starting empty");
                State::default()
            }
        }
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
    }

    fn persist(&self) -> RepoResult<()> {
        let Some(path) = self.snapshot_path.as_ref() else { return Ok(()) };
        let bytes = serde_json::to_vec(&*self.read()?)
            .map_err(|e| RepoError::Internal(e.to_string()))?;
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = std::fs::write(path.as_path(), bytes) {
            warn!(path = %path.display(), error = %e, "failed to write snapshot");
        }
        Ok(())
    }
}

fn reassign(field: &mut Id, from: Id, to: Id) {
    if *field == from { *field = to; }
}

fn reassign_opt(field: &mut Option<Id>, from: Id, to: Id) {
    if *field == Some(from) { *field = Some(to); }
}

#[async_trait]
impl MemberRepo for InMemRepo {
    async fn list_members(&self) -> RepoResult<Vec<Member>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.members.values().cloned().collect();
        v.sort_by_key(|m| m.id);
        Ok(v)
    }

    async fn member_names(&self) -> RepoResult<Vec<(Id, String)>> {
        let s = self.read()?;
        Ok(s.members.values().map(|m| (m.id, m.username.clone())).collect())
    }

    async fn get_member(&self, id: Id) -> RepoResult<Member> {
        self.read()?.members.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn find_member(&self, username: &str) -> RepoResult<Member> {
        let s = self.read()?;
        s.members.values().find(|m| m.is_named(username)).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_member(&self, new: NewMember) -> RepoResult<Member> {
        let mut s = self.write()?;
        if s.username_taken(&new.username) {
            return Err(RepoError::Conflict);
        }
        let id = s.next_id();
        let member = Member {
            id,
            username: new.username,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            birth_date: new.birth_date,
            role: new.role,
            created_on: Utc::now(),
            blocked_by: None,
            blocked_on: None,
            blocked_end: None,
            profile_image: None,
        };
        s.members.insert(id, member.clone());
        drop(s);
        self.persist()?;
        Ok(member)
    }

    async fn save_member(&self, member: &Member) -> RepoResult<()> {
        let mut s = self.write()?;
        if s.members.values().any(|m| m.id != member.id && m.is_named(&member.username)) {
            return Err(RepoError::Conflict);
        }
        let slot = s.members.get_mut(&member.id).ok_or(RepoError::NotFound)?;
        *slot = member.clone();
        drop(s);
        self.persist()
    }

    async fn member_activity(&self, id: Id) -> RepoResult<MemberActivity> {
        let s = self.read()?;
        if !s.members.contains_key(&id) { return Err(RepoError::NotFound); }
        Ok(MemberActivity {
            threads: s.threads.values().filter(|t| t.created_by == id).count() as i64,
            posts: s.posts.values().filter(|p| p.created_by == id).count() as i64,
        })
    }

    async fn delete_member(&self, id: Id, sentinel: Id) -> RepoResult<()> {
        let mut s = self.write()?;
        if !s.members.contains_key(&id) || !s.members.contains_key(&sentinel) {
            return Err(RepoError::NotFound);
        }
        for t in s.topics.values_mut() {
            reassign(&mut t.created_by, id, sentinel);
            reassign_opt(&mut t.edited_by, id, sentinel);
            reassign_opt(&mut t.locked_by, id, sentinel);
            reassign_opt(&mut t.removed_by, id, sentinel);
        }
        for t in s.threads.values_mut() {
            reassign(&mut t.created_by, id, sentinel);
            reassign_opt(&mut t.edited_by, id, sentinel);
            reassign_opt(&mut t.locked_by, id, sentinel);
            reassign_opt(&mut t.removed_by, id, sentinel);
        }
        for p in s.posts.values_mut() {
            reassign(&mut p.created_by, id, sentinel);
            reassign_opt(&mut p.edited_by, id, sentinel);
            reassign_opt(&mut p.locked_by, id, sentinel);
        }
        for m in s.members.values_mut() {
            reassign_opt(&mut m.blocked_by, id, sentinel);
        }
        s.members.remove(&id);
        drop(s);
        self.persist()
    }
}

#[async_trait]
impl TopicRepo for InMemRepo {
    async fn list_topics(&self, include_removed: bool) -> RepoResult<Vec<Topic>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.topics.values()
            .filter(|t| include_removed || !t.is_removed())
            .cloned()
            .collect();
        v.sort_by_key(|t| t.id);
        Ok(v)
    }

    async fn get_topic(&self, id: Id) -> RepoResult<Topic> {
        self.read()?.topics.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_topic(&self, new: NewTopic, actor: Id) -> RepoResult<Topic> {
        let mut s = self.write()?;
        let id = s.next_id();
        let topic = Topic {
            id,
            title: new.title,
            description: new.description,
            created_by: actor,
            created_on: Utc::now(),
            edited_by: None,
            edited_on: None,
            locked_by: None,
            locked_on: None,
            removed_by: None,
            removed_on: None,
        };
        s.topics.insert(id, topic.clone());
        drop(s);
        self.persist()?;
        Ok(topic)
    }

    async fn save_topic(&self, topic: &Topic) -> RepoResult<()> {
        let mut s = self.write()?;
        let slot = s.topics.get_mut(&topic.id).ok_or(RepoError::NotFound)?;
        *slot = topic.clone();
        drop(s);
        self.persist()
    }
}

#[async_trait]
impl ThreadRepo for InMemRepo {
    async fn list_threads(&self, topic_id: Id, include_removed: bool) -> RepoResult<Vec<Thread>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.threads.values()
            .filter(|t| t.topic_id == topic_id && (include_removed || !t.is_removed()))
            .cloned()
            .collect();
        v.sort_by(|a, b| (b.created_on, b.id).cmp(&(a.created_on, a.id)));
        Ok(v)
    }

    async fn get_thread(&self, id: Id) -> RepoResult<Thread> {
        self.read()?.threads.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_thread(&self, topic_id: Id, new: NewThread, actor: Id) -> RepoResult<(Thread, Post)> {
        let mut s = self.write()?;
        if !s.topics.contains_key(&topic_id) { return Err(RepoError::NotFound); }
        let now = Utc::now();
        let thread_id = s.next_id();
        let post_id = s.next_id();
        let thread = Thread {
            id: thread_id,
            topic_id,
            subject: new.subject,
            created_by: actor,
            created_on: now,
            edited_by: None,
            edited_on: None,
            locked_by: None,
            locked_on: None,
            removed_by: None,
            removed_on: None,
        };
        let post = Post {
            id: post_id,
            thread_id,
            content: new.content,
            created_by: actor,
            created_on: now,
            edited_by: None,
            edited_on: None,
            locked_by: None,
            locked_on: None,
        };
        s.threads.insert(thread_id, thread.clone());
        s.posts.insert(post_id, post.clone());
        drop(s);
        self.persist()?;
        Ok((thread, post))
    }

    async fn save_thread(&self, thread: &Thread) -> RepoResult<()> {
        let mut s = self.write()?;
        let slot = s.threads.get_mut(&thread.id).ok_or(RepoError::NotFound)?;
        *slot = thread.clone();
        drop(s);
        self.persist()
    }

    async fn delete_thread(&self, id: Id) -> RepoResult<()> {
        let mut s = self.write()?;
        if s.threads.remove(&id).is_none() { return Err(RepoError::NotFound); }
        s.posts.retain(|_, p| p.thread_id != id);
        drop(s);
        self.persist()
    }
}

#[async_trait]
impl PostRepo for InMemRepo {
    async fn list_posts(&self, thread_id: Id) -> RepoResult<Vec<Post>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.posts.values()
            .filter(|p| p.thread_id == thread_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| (a.created_on, a.id).cmp(&(b.created_on, b.id)));
        Ok(v)
    }

    async fn get_post(&self, id: Id) -> RepoResult<Post> {
        self.read()?.posts.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_post(&self, thread_id: Id, new: NewPost, actor: Id) -> RepoResult<Post> {
        let mut s = self.write()?;
        if !s.threads.contains_key(&thread_id) { return Err(RepoError::NotFound); }
        let id = s.next_id();
        let post = Post {
            id,
            thread_id,
            content: new.content,
            created_by: actor,
            created_on: Utc::now(),
            edited_by: None,
            edited_on: None,
            locked_by: None,
            locked_on: None,
        };
        s.posts.insert(id, post.clone());
        drop(s);
        self.persist()?;
        Ok(post)
    }

    async fn save_post(&self, post: &Post) -> RepoResult<()> {
        let mut s = self.write()?;
        let slot = s.posts.get_mut(&post.id).ok_or(RepoError::NotFound)?;
        *slot = post.clone();
        drop(s);
        self.persist()
    }

    async fn delete_post(&self, id: Id) -> RepoResult<()> {
        let mut s = self.write()?;
        if s.posts.remove(&id).is_none() { return Err(RepoError::NotFound); }
        drop(s);
        self.persist()
    }
}
