#![cfg(feature = "inmem-store")]

mod common;

use actix_web::test;
use agora::auth::Role;
use agora::repo::MemberRepo;
use chrono::{Duration, Utc};
use common::Forum;
use serde_json::{json, Value};

/// admin, a moderator and two members, plus one open topic.
struct Cast {
    forum: Forum,
    admin: String,
    moderator: String,
    alice: (i64, String),
    bob: (i64, String),
    topic_id: i64,
}

async fn cast() -> Cast {
    let forum = Forum::new().await;
    let (_, admin) = forum.member("admin").await;
    let (mod_id, moderator) = forum.member("mod").await;
    forum.promote(mod_id, Role::Moderator).await;
    let alice = forum.member("alice").await;
    let bob = forum.member("bob").await;
    let app = app!(forum);
    let req = test::TestRequest::post()
        .uri("/api/v1/topics")
        .insert_header(("Authorization", admin.clone()))
        .set_json(json!({"title": "General"}))
        .to_request();
    let topic: Value = test::call_and_read_body_json(&app, req).await;
    let topic_id = topic["id"].as_i64().unwrap();
    Cast { forum, admin, moderator, alice, bob, topic_id }
}

#[actix_web::test]
async fn locked_topic_stops_members_but_not_staff() {
    let c = cast().await;
    let app = app!(c.forum);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/lock", c.topic_id))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    let topic: Value = test::call_and_read_body_json(&app, req).await;
    assert!(topic["locked_on"].is_string());

    let new_thread = json!({"subject": "Hi", "content": "there"});
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/threads", c.topic_id))
        .insert_header(("Authorization", c.alice.1.clone()))
        .set_json(&new_thread)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/threads", c.topic_id))
        .insert_header(("Authorization", c.moderator.clone()))
        .set_json(&new_thread)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/unlock", c.topic_id))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/threads", c.topic_id))
        .insert_header(("Authorization", c.alice.1.clone()))
        .set_json(&new_thread)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);
}

#[actix_web::test]
async fn locked_thread_stops_replies() {
    let c = cast().await;
    let app = app!(c.forum);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/threads", c.topic_id))
        .insert_header(("Authorization", c.alice.1.clone()))
        .set_json(json!({"subject": "Hot take", "content": "..."}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let thread_id = created["thread"]["id"].as_i64().unwrap();

    // members cannot lock
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/threads/{thread_id}/lock"))
        .insert_header(("Authorization", c.alice.1.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/threads/{thread_id}/lock"))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/threads/{thread_id}/posts"))
        .insert_header(("Authorization", c.bob.1.clone()))
        .set_json(json!({"content": "late"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/threads/{thread_id}"))
        .insert_header(("Authorization", c.bob.1.clone()))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["can_reply"], false);
    assert_eq!(page["thread"]["locked"], true);
}

#[actix_web::test]
async fn blocked_member_cannot_post_until_block_ends() {
    let c = cast().await;
    let app = app!(c.forum);
    let (alice_id, alice) = c.alice.clone();

    // end dates must lie ahead
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{alice_id}/block"))
        .insert_header(("Authorization", c.moderator.clone()))
        .set_json(json!({"until": Utc::now() - Duration::hours(1)}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{alice_id}/block"))
        .insert_header(("Authorization", c.moderator.clone()))
        .set_json(json!({"until": Utc::now() + Duration::days(3)}))
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["effective_role"], "blocked");
    assert_eq!(summary["role"], "user");
    assert_eq!(summary["blocked_by"]["username"], "mod");

    let new_thread = json!({"subject": "Let me in", "content": "please"});
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/threads", c.topic_id))
        .insert_header(("Authorization", alice.clone()))
        .set_json(&new_thread)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // a lapsed block no longer applies
    let mut m = c.forum.repo.get_member(alice_id).await.unwrap();
    m.blocked_end = Some(Utc::now() - Duration::minutes(1));
    c.forum.repo.save_member(&m).await.unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/threads", c.topic_id))
        .insert_header(("Authorization", alice.clone()))
        .set_json(&new_thread)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);
}

#[actix_web::test]
async fn malformed_block_request_is_rejected() {
    let c = cast().await;
    let app = app!(c.forum);
    let (alice_id, _) = c.alice.clone();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{alice_id}/block"))
        .insert_header(("Authorization", c.admin.clone()))
        .set_json(json!({"until": "next tuesday"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
    let m = c.forum.repo.get_member(alice_id).await.unwrap();
    assert!(m.blocked_by.is_none(), "a rejected request blocks nobody");

    // no body at all is an indefinite block
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{alice_id}/block"))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["effective_role"], "blocked");
    assert!(summary["blocked_end"].is_null());
}

#[actix_web::test]
async fn admin_lifts_block_after_promoting_blocked_member() {
    let c = cast().await;
    let app = app!(c.forum);
    let bob_id = c.bob.0;

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{bob_id}/block"))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{bob_id}/role"))
        .insert_header(("Authorization", c.admin.clone()))
        .set_json(json!({"role": "admin"}))
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!((summary["role"].as_str(), summary["effective_role"].as_str()), (Some("admin"), Some("blocked")));

    // moderators still cannot touch an admin
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{bob_id}/unblock"))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{bob_id}/unblock"))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let summary: Value = test::read_body_json(resp).await;
    assert_eq!(summary["effective_role"], "admin");
}

#[actix_web::test]
async fn block_permissions_follow_rank() {
    let c = cast().await;
    let app = app!(c.forum);
    let mod_id = c.forum.repo.find_member("mod").await.unwrap().id;
    let admin_id = c.forum.repo.find_member("admin").await.unwrap().id;

    // moderators cannot block moderators, members cannot block anyone
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{mod_id}/block"))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{}/block", c.bob.0))
        .insert_header(("Authorization", c.alice.1.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // admin blocks the moderator indefinitely, then lifts it
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{mod_id}/block"))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert!(summary["blocked_end"].is_null());
    assert_eq!(summary["effective_role"], "blocked");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{admin_id}/block"))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{mod_id}/unblock"))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["effective_role"], "moderator");
}

#[actix_web::test]
async fn moderator_delete_depends_on_third_party_replies() {
    let c = cast().await;
    let app = app!(c.forum);

    let mut threads = Vec::new();
    for subject in ["quiet", "busy"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/topics/{}/threads", c.topic_id))
            .insert_header(("Authorization", c.alice.1.clone()))
            .set_json(json!({"subject": subject, "content": "op"}))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        threads.push(created["thread"]["id"].as_i64().unwrap());
    }
    let (quiet, busy) = (threads[0], threads[1]);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/threads/{busy}/posts"))
        .insert_header(("Authorization", c.bob.1.clone()))
        .set_json(json!({"content": "me too"}))
        .to_request();
    let reply: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/threads/{quiet}"))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/threads/{busy}"))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/threads/{busy}"))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let req = test::TestRequest::get().uri(&format!("/api/v1/posts/{}", reply["id"])).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn removed_threads_hidden_from_members() {
    let c = cast().await;
    let app = app!(c.forum);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/threads", c.topic_id))
        .insert_header(("Authorization", c.alice.1.clone()))
        .set_json(json!({"subject": "spam", "content": "buy now"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let thread_id = created["thread"]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/threads/{thread_id}/remove"))
        .insert_header(("Authorization", c.alice.1.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/threads/{thread_id}/remove"))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    let removed: Value = test::call_and_read_body_json(&app, req).await;
    let stamp = removed["removed_on"].clone();
    assert!(stamp.is_string());

    // removing again keeps the first stamp
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/threads/{thread_id}/remove"))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    let again: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(again["removed_on"], stamp);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/threads/{thread_id}"))
        .insert_header(("Authorization", c.bob.1.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/topics/{}", c.topic_id))
        .insert_header(("Authorization", c.bob.1.clone()))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert!(page["threads"].as_array().unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/threads/{thread_id}"))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/threads/{thread_id}/restore"))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/threads/{thread_id}"))
        .insert_header(("Authorization", c.bob.1.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_web::test]
async fn topic_removal_is_admin_only() {
    let c = cast().await;
    let app = app!(c.forum);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/topics/{}", c.topic_id))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/topics/{}", c.topic_id))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get().uri("/api/v1/topics").to_request();
    let topics: Value = test::call_and_read_body_json(&app, req).await;
    assert!(topics.as_array().unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri("/api/v1/topics")
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    let topics: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(topics[0]["removed"], true);
    assert_eq!(topics[0]["can_remove"], false);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/restore", c.topic_id))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get().uri("/api/v1/topics").to_request();
    let topics: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(topics.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn member_list_and_role_changes() {
    let c = cast().await;
    let app = app!(c.forum);

    let req = test::TestRequest::get()
        .uri("/api/v1/manage/members")
        .insert_header(("Authorization", c.alice.1.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri("/api/v1/manage/members")
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    let members: Value = test::call_and_read_body_json(&app, req).await;
    let names: Vec<_> = members.as_array().unwrap().iter()
        .map(|m| m["username"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["admin", "mod", "alice", "bob"]);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{}/role", c.bob.0))
        .insert_header(("Authorization", c.moderator.clone()))
        .set_json(json!({"role": "moderator"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/manage/members/{}/role", c.bob.0))
        .insert_header(("Authorization", c.admin.clone()))
        .set_json(json!({"role": "moderator"}))
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["role"], "moderator");

    // bob's existing token picks up the new role
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/lock", c.topic_id))
        .insert_header(("Authorization", c.bob.1.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_web::test]
async fn post_lock_and_delete_over_http() {
    let c = cast().await;
    let app = app!(c.forum);
    let (_, alice) = c.alice.clone();
    let (_, bob) = c.bob.clone();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/{}/threads", c.topic_id))
        .insert_header(("Authorization", alice.clone()))
        .set_json(json!({"subject": "Plans", "content": "opening"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let thread_id = created["thread"]["id"].as_i64().unwrap();
    let opening_id = created["opening_post"]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/threads/{thread_id}/posts"))
        .insert_header(("Authorization", bob.clone()))
        .set_json(json!({"content": "reply"}))
        .to_request();
    let reply: Value = test::call_and_read_body_json(&app, req).await;
    let reply_id = reply["id"].as_i64().unwrap();

    // members cannot lock posts
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{reply_id}/lock"))
        .insert_header(("Authorization", bob.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{reply_id}/lock"))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    let locked: Value = test::call_and_read_body_json(&app, req).await;
    assert!(locked["locked_on"].is_string());

    let edit = json!({"content": "edited reply"});
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/posts/{reply_id}"))
        .insert_header(("Authorization", bob.clone()))
        .set_json(&edit)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{reply_id}/unlock"))
        .insert_header(("Authorization", c.moderator.clone()))
        .to_request();
    let unlocked: Value = test::call_and_read_body_json(&app, req).await;
    assert!(unlocked["locked_on"].is_null());

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/posts/{reply_id}"))
        .insert_header(("Authorization", bob.clone()))
        .set_json(&edit)
        .to_request();
    let edited: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(edited["content"], "edited reply");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/posts/{reply_id}"))
        .insert_header(("Authorization", bob.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);
    let req = test::TestRequest::get().uri(&format!("/api/v1/posts/{reply_id}")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    // outsiders are refused before the opening-post check, the author is told why
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/posts/{opening_id}"))
        .insert_header(("Authorization", bob.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/posts/{opening_id}"))
        .insert_header(("Authorization", alice.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/posts/{opening_id}"))
        .insert_header(("Authorization", c.admin.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}
