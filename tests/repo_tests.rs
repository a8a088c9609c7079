#![cfg(feature = "inmem-store")]

use agora::{
    auth::Role,
    models::{NewMember, NewPost, NewThread, NewTopic},
    repo::{inmem::InMemRepo, RepoError},
};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use agora::repo::{MemberRepo, PostRepo, ThreadRepo, TopicRepo};

fn new_member(name: &str) -> NewMember {
    NewMember {
        username: name.into(),
        password_hash: "!".into(),
        first_name: String::new(),
        last_name: String::new(),
        birth_date: None,
        role: Role::User,
    }
}

fn new_thread(subject: &str) -> NewThread {
    NewThread { subject: subject.into(), content: format!("{subject} body") }
}

#[tokio::test]
async fn usernames_unique_ignoring_case() {
    let r = InMemRepo::ephemeral();
    let alice = r.create_member(new_member("Alice")).await.unwrap();
    assert!(matches!(r.create_member(new_member("ALICE")).await, Err(RepoError::Conflict)));
    assert_eq!(r.find_member("alice").await.unwrap().id, alice.id);
    assert!(matches!(r.find_member("bob").await, Err(RepoError::NotFound)));
    assert_eq!(r.member_names().await.unwrap(), vec![(alice.id, "Alice".to_string())]);

    // renaming onto a taken name is refused too
    let mut bob = r.create_member(new_member("bob")).await.unwrap();
    bob.username = "alice".into();
    assert!(matches!(r.save_member(&bob).await, Err(RepoError::Conflict)));
}

#[tokio::test]
async fn thread_creation_includes_opening_post() {
    let r = InMemRepo::ephemeral();
    let m = r.create_member(new_member("alice")).await.unwrap();
    let topic = r.create_topic(NewTopic { title: "General".into(), description: String::new() }, m.id).await.unwrap();

    let (thread, opening) = r.create_thread(topic.id, new_thread("first"), m.id).await.unwrap();
    assert_eq!(opening.thread_id, thread.id);
    assert_eq!(opening.created_on, thread.created_on);
    let reply = r.create_post(thread.id, NewPost { content: "reply".into() }, m.id).await.unwrap();

    let posts = r.list_posts(thread.id).await.unwrap();
    assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![opening.id, reply.id]);

    let (second, _) = r.create_thread(topic.id, new_thread("second"), m.id).await.unwrap();
    let listed = r.list_threads(topic.id, false).await.unwrap();
    assert_eq!(listed[0].id, second.id, "newest first");

    assert!(matches!(r.create_thread(999, new_thread("orphan"), m.id).await, Err(RepoError::NotFound)));
    assert!(matches!(r.create_post(999, NewPost { content: "x".into() }, m.id).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn deleting_thread_removes_its_posts() {
    let r = InMemRepo::ephemeral();
    let m = r.create_member(new_member("alice")).await.unwrap();
    let topic = r.create_topic(NewTopic { title: "General".into(), description: String::new() }, m.id).await.unwrap();
    let (doomed, op) = r.create_thread(topic.id, new_thread("doomed"), m.id).await.unwrap();
    let (kept, kept_op) = r.create_thread(topic.id, new_thread("kept"), m.id).await.unwrap();
    r.create_post(doomed.id, NewPost { content: "reply".into() }, m.id).await.unwrap();

    r.delete_thread(doomed.id).await.unwrap();
    assert!(matches!(r.get_thread(doomed.id).await, Err(RepoError::NotFound)));
    assert!(matches!(r.get_post(op.id).await, Err(RepoError::NotFound)));
    assert!(r.list_posts(doomed.id).await.unwrap().is_empty());
    assert_eq!(r.list_posts(kept.id).await.unwrap()[0].id, kept_op.id);
    assert!(matches!(r.delete_thread(doomed.id).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn removed_topics_filtered_unless_requested() {
    let r = InMemRepo::ephemeral();
    let m = r.create_member(new_member("admin")).await.unwrap();
    let mut topic = r.create_topic(NewTopic { title: "Old".into(), description: String::new() }, m.id).await.unwrap();
    topic.removed_by = Some(m.id);
    topic.removed_on = Some(chrono::Utc::now());
    r.save_topic(&topic).await.unwrap();

    assert!(r.list_topics(false).await.unwrap().is_empty());
    assert_eq!(r.list_topics(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_member_reassigns_every_reference() {
    let r = InMemRepo::ephemeral();
    let sentinel = r.create_member(new_member("DELETED")).await.unwrap();
    let gone = r.create_member(new_member("gone")).await.unwrap();
    let other = r.create_member(new_member("other")).await.unwrap();

    let mut topic = r.create_topic(NewTopic { title: "T".into(), description: String::new() }, gone.id).await.unwrap();
    topic.locked_by = Some(gone.id);
    topic.locked_on = Some(chrono::Utc::now());
    r.save_topic(&topic).await.unwrap();
    let (mut thread, _) = r.create_thread(topic.id, new_thread("mine"), gone.id).await.unwrap();
    thread.edited_by = Some(gone.id);
    r.save_thread(&thread).await.unwrap();
    let mut post = r.create_post(thread.id, NewPost { content: "theirs".into() }, other.id).await.unwrap();
    post.locked_by = Some(gone.id);
    r.save_post(&post).await.unwrap();
    let mut blocked = other.clone();
    blocked.blocked_by = Some(gone.id);
    r.save_member(&blocked).await.unwrap();

    r.delete_member(gone.id, sentinel.id).await.unwrap();

    assert!(matches!(r.get_member(gone.id).await, Err(RepoError::NotFound)));
    let topic = r.get_topic(topic.id).await.unwrap();
    assert_eq!((topic.created_by, topic.locked_by), (sentinel.id, Some(sentinel.id)));
    let thread = r.get_thread(thread.id).await.unwrap();
    assert_eq!((thread.created_by, thread.edited_by), (sentinel.id, Some(sentinel.id)));
    let posts = r.list_posts(thread.id).await.unwrap();
    assert_eq!(posts.len(), 2, "content is kept");
    assert_eq!(posts[0].created_by, sentinel.id);
    assert_eq!(posts[1].created_by, other.id);
    assert_eq!(posts[1].locked_by, Some(sentinel.id));
    assert_eq!(r.get_member(other.id).await.unwrap().blocked_by, Some(sentinel.id));

    let activity = r.member_activity(sentinel.id).await.unwrap();
    assert_eq!((activity.threads, activity.posts), (1, 1));
}

#[tokio::test]
async fn snapshot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let (member_id, thread_id) = {
        let r = InMemRepo::open(&path);
        let m = r.create_member(new_member("alice")).await.unwrap();
        let topic = r.create_topic(NewTopic { title: "General".into(), description: "d".into() }, m.id).await.unwrap();
        let (thread, _) = r.create_thread(topic.id, new_thread("persisted"), m.id).await.unwrap();
        (m.id, thread.id)
    };
    assert!(path.exists());

    let r = InMemRepo::open(&path);
    assert_eq!(r.find_member("ALICE").await.unwrap().id, member_id);
    assert_eq!(r.get_thread(thread_id).await.unwrap().subject, "persisted");
    assert_eq!(r.list_posts(thread_id).await.unwrap().len(), 1);

    // ids keep counting up after a reload
    let fresh = r.create_member(new_member("bob")).await.unwrap();
    assert!(fresh.id > thread_id);
}

#[tokio::test]
async fn corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, b"{not json").unwrap();
    let r = InMemRepo::open(&path);
    assert!(r.list_members().await.unwrap().is_empty());
}
