use crate::auth::Role;
use crate::models::{MemberActivity, NewPost, NewThread, NewTopic, Post, Thread, Topic, UpdatePost, UpdateThread, UpdateTopic};
use crate::services::account::{AccountView, ChangePassword, Login, Registration, TokenResponse};
use crate::services::management::{BlockRequest, MemberSummary, RoleChange};
use crate::services::profile::{ProfileView, UpdateProfile};
use crate::services::shared::AuthorRef;
use crate::services::thread::{CreatedThread, PostView, ThreadPage, ThreadView};
use crate::services::topic::{ThreadSummary, TopicPage, TopicSummary};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::register,
        crate::routes::login,
        crate::routes::me,
        crate::routes::change_password,
        crate::routes::list_topics,
        crate::routes::create_topic,
        crate::routes::get_topic,
        crate::routes::update_topic,
        crate::routes::remove_topic,
        crate::routes::restore_topic,
        crate::routes::lock_topic,
        crate::routes::unlock_topic,
        crate::routes::create_thread,
        crate::routes::get_thread,
        crate::routes::update_thread,
        crate::routes::delete_thread,
        crate::routes::lock_thread,
        crate::routes::unlock_thread,
        crate::routes::create_post,
        crate::routes::get_post,
        crate::routes::update_post,
        crate::routes::delete_post,
        crate::routes::lock_post,
        crate::routes::unlock_post,
        crate::routes::get_profile,
        crate::routes::update_profile,
        crate::routes::delete_profile,
        crate::routes::upload_profile_image,
        crate::routes::get_profile_image,
        crate::routes::list_members,
        crate::routes::block_member,
        crate::routes::unblock_member,
        crate::routes::change_role,
        crate::routes::remove_thread,
        crate::routes::restore_thread,
    ),
    components(schemas(
        Role, Topic, NewTopic, UpdateTopic, Thread, NewThread, UpdateThread, Post, NewPost, UpdatePost,
        MemberActivity, AuthorRef,
        Registration, Login, ChangePassword, AccountView, TokenResponse,
        TopicSummary, ThreadSummary, TopicPage,
        ThreadView, ThreadPage, PostView, CreatedThread,
        ProfileView, UpdateProfile,
        MemberSummary, BlockRequest, RoleChange,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "account", description = "Registration and sign-in"),
        (name = "forum", description = "Topics, threads and posts"),
        (name = "manage", description = "Member administration and moderation"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}
