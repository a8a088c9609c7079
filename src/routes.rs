use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpResponse};
use futures_util::TryStreamExt as _;

use crate::auth::{Auth, Claims, TokenIssuer};
use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;
use crate::services::account::{AccountView, ChangePassword, Login, Registration, TokenResponse};
use crate::services::management::{BlockRequest, MemberSummary, RoleChange};
use crate::services::profile::{ProfileView, UpdateProfile};
use crate::services::thread::{CreatedThread, PostView, ThreadPage};
use crate::services::topic::{TopicPage, TopicSummary};
use crate::services::Services;

pub const IMAGE_SIZE_LIMIT: usize = 2 * 1024 * 1024;
const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/account/register").route(web::post().to(register)))
            .service(web::resource("/account/login").route(web::post().to(login)))
            .service(web::resource("/account/me").route(web::get().to(me)))
            .service(web::resource("/account/password").route(web::post().to(change_password)))
            .service(
                web::resource("/topics")
                    .route(web::get().to(list_topics))
                    .route(web::post().to(create_topic)),
            )
            .service(
                web::resource("/topics/{id}")
                    .route(web::get().to(get_topic))
                    .route(web::patch().to(update_topic))
                    .route(web::delete().to(remove_topic)),
            )
            .service(web::resource("/topics/{id}/restore").route(web::post().to(restore_topic)))
            .service(web::resource("/topics/{id}/lock").route(web::post().to(lock_topic)))
            .service(web::resource("/topics/{id}/unlock").route(web::post().to(unlock_topic)))
            .service(web::resource("/topics/{id}/threads").route(web::post().to(create_thread)))
            .service(
                web::resource("/threads/{id}")
                    .route(web::get().to(get_thread))
                    .route(web::patch().to(update_thread))
                    .route(web::delete().to(delete_thread)),
            )
            .service(web::resource("/threads/{id}/lock").route(web::post().to(lock_thread)))
            .service(web::resource("/threads/{id}/unlock").route(web::post().to(unlock_thread)))
            .service(web::resource("/threads/{id}/posts").route(web::post().to(create_post)))
            .service(
                web::resource("/posts/{id}")
                    .route(web::get().to(get_post))
                    .route(web::patch().to(update_post))
                    .route(web::delete().to(delete_post)),
            )
            .service(web::resource("/posts/{id}/lock").route(web::post().to(lock_post)))
            .service(web::resource("/posts/{id}/unlock").route(web::post().to(unlock_post)))
            .service(
                web::resource("/profiles/{username}")
                    .route(web::get().to(get_profile))
                    .route(web::patch().to(update_profile))
                    .route(web::delete().to(delete_profile)),
            )
            .service(
                web::resource("/profiles/{username}/image")
                    .route(web::get().to(get_profile_image))
                    .route(web::put().to(upload_profile_image)),
            )
            // Forum management
            .service(web::resource("/manage/members").route(web::get().to(list_members)))
            .service(web::resource("/manage/members/{id}/block").route(web::post().to(block_member)))
            .service(web::resource("/manage/members/{id}/unblock").route(web::post().to(unblock_member)))
            .service(web::resource("/manage/members/{id}/role").route(web::post().to(change_role)))
            .service(web::resource("/manage/threads/{id}/remove").route(web::post().to(remove_thread)))
            .service(web::resource("/manage/threads/{id}/restore").route(web::post().to(restore_thread))),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repo>, tokens: TokenIssuer, bootstrap_admins: Vec<String>) -> Self {
        Self { services: Services::new(repo, tokens.clone(), bootstrap_admins), tokens }
    }
}

fn claims(auth: &Option<Auth>) -> Option<&Claims> {
    auth.as_ref().map(|a| &a.0)
}

// ── account ─────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/account/register",
    request_body = Registration,
    responses(
        (status = 201, description = "Account created", body = AccountView),
        (status = 400, description = "Invalid username or password"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn register(data: web::Data<AppState>, payload: web::Json<Registration>) -> Result<HttpResponse, ApiError> {
    let account = data.services.account.register(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(account))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/login",
    request_body = Login,
    responses(
        (status = 200, description = "Signed session token", body = TokenResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(data: web::Data<AppState>, payload: web::Json<Login>) -> Result<HttpResponse, ApiError> {
    let token = data.services.account.login(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(token))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/me",
    responses(
        (status = 200, description = "Current account", body = AccountView),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let account = data.services.account.me(Some(&auth.0)).await?;
    Ok(HttpResponse::Ok().json(account))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/password",
    request_body = ChangePassword,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Wrong current password or weak new one"),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<ChangePassword>,
) -> Result<HttpResponse, ApiError> {
    data.services.account.change_password(Some(&auth.0), payload.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ── topics ──────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/topics",
    responses((status = 200, description = "Visible topics", body = [TopicSummary]))
)]
pub async fn list_topics(auth: Option<Auth>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let topics = data.services.topics.list(claims(&auth)).await?;
    Ok(HttpResponse::Ok().json(topics))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics",
    request_body = NewTopic,
    responses(
        (status = 201, description = "Topic created", body = Topic),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_topic(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    payload: web::Json<NewTopic>,
) -> Result<HttpResponse, ApiError> {
    let topic = data.services.topics.add(claims(&auth), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(topic))
}

#[utoipa::path(
    get,
    path = "/api/v1/topics/{id}",
    params(("id" = Id, Path, description = "Topic id")),
    responses(
        (status = 200, description = "Topic with its threads", body = TopicPage),
        (status = 404, description = "Topic not found")
    )
)]
pub async fn get_topic(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let page = data.services.topics.page(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    patch,
    path = "/api/v1/topics/{id}",
    params(("id" = Id, Path, description = "Topic id")),
    request_body = UpdateTopic,
    responses(
        (status = 200, description = "Topic updated", body = Topic),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Topic not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_topic(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateTopic>,
) -> Result<HttpResponse, ApiError> {
    let topic = data.services.topics.update(claims(&auth), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(topic))
}

#[utoipa::path(
    delete,
    path = "/api/v1/topics/{id}",
    params(("id" = Id, Path, description = "Topic id")),
    responses(
        (status = 200, description = "Topic hidden", body = Topic),
        (status = 403, description = "Admins only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_topic(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let topic = data.services.topics.remove(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(topic))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{id}/restore",
    params(("id" = Id, Path, description = "Topic id")),
    responses(
        (status = 200, description = "Topic restored", body = Topic),
        (status = 403, description = "Admins only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn restore_topic(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let topic = data.services.topics.restore(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(topic))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{id}/lock",
    params(("id" = Id, Path, description = "Topic id")),
    responses((status = 200, description = "Topic locked", body = Topic), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn lock_topic(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let topic = data.services.topics.lock(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(topic))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{id}/unlock",
    params(("id" = Id, Path, description = "Topic id")),
    responses((status = 200, description = "Topic unlocked", body = Topic), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn unlock_topic(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let topic = data.services.topics.unlock(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(topic))
}

// ── threads ─────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/topics/{id}/threads",
    params(("id" = Id, Path, description = "Topic id")),
    request_body = NewThread,
    responses(
        (status = 201, description = "Thread and opening post created", body = CreatedThread),
        (status = 403, description = "Topic locked or member blocked"),
        (status = 404, description = "Topic not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_thread(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewThread>,
) -> Result<HttpResponse, ApiError> {
    let created = data.services.threads.add(claims(&auth), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/threads/{id}",
    params(("id" = Id, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Thread with its posts", body = ThreadPage),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn get_thread(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let page = data.services.threads.page(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    patch,
    path = "/api/v1/threads/{id}",
    params(("id" = Id, Path, description = "Thread id")),
    request_body = UpdateThread,
    responses((status = 200, description = "Thread updated", body = Thread), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn update_thread(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateThread>,
) -> Result<HttpResponse, ApiError> {
    let thread = data.services.threads.update(claims(&auth), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(thread))
}

#[utoipa::path(
    delete,
    path = "/api/v1/threads/{id}",
    params(("id" = Id, Path, description = "Thread id")),
    responses((status = 204, description = "Thread and its posts deleted"), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn delete_thread(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    data.services.threads.delete(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/threads/{id}/lock",
    params(("id" = Id, Path, description = "Thread id")),
    responses((status = 200, description = "Thread locked", body = Thread), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn lock_thread(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let thread = data.services.threads.lock(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(thread))
}

#[utoipa::path(
    post,
    path = "/api/v1/threads/{id}/unlock",
    params(("id" = Id, Path, description = "Thread id")),
    responses((status = 200, description = "Thread unlocked", body = Thread), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn unlock_thread(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let thread = data.services.threads.unlock(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(thread))
}

// ── posts ───────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/threads/{id}/posts",
    params(("id" = Id, Path, description = "Thread id")),
    request_body = NewPost,
    responses(
        (status = 201, description = "Reply created", body = Post),
        (status = 403, description = "Thread locked or member blocked"),
        (status = 404, description = "Thread not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_post(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewPost>,
) -> Result<HttpResponse, ApiError> {
    let post = data.services.posts.add(claims(&auth), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    params(("id" = Id, Path, description = "Post id")),
    responses((status = 200, description = "Post", body = PostView), (status = 404, description = "Post not found"))
)]
pub async fn get_post(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = data.services.posts.get(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    patch,
    path = "/api/v1/posts/{id}",
    params(("id" = Id, Path, description = "Post id")),
    request_body = UpdatePost,
    responses((status = 200, description = "Post updated", body = Post), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn update_post(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdatePost>,
) -> Result<HttpResponse, ApiError> {
    let post = data.services.posts.update(claims(&auth), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 400, description = "Opening post"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_post(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    data.services.posts.delete(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/lock",
    params(("id" = Id, Path, description = "Post id")),
    responses((status = 200, description = "Post locked", body = Post), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn lock_post(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = data.services.posts.lock(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/unlock",
    params(("id" = Id, Path, description = "Post id")),
    responses((status = 200, description = "Post unlocked", body = Post), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn unlock_post(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = data.services.posts.unlock(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

// ── profiles ────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{username}",
    params(("username" = String, Path, description = "Member name, case-insensitive")),
    responses((status = 200, description = "Profile", body = ProfileView), (status = 404, description = "No such member"))
)]
pub async fn get_profile(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let profile = data.services.profiles.get(claims(&auth), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    patch,
    path = "/api/v1/profiles/{username}",
    params(("username" = String, Path, description = "Member name, case-insensitive")),
    request_body = UpdateProfile,
    responses((status = 200, description = "Profile updated", body = ProfileView), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateProfile>,
) -> Result<HttpResponse, ApiError> {
    let profile = data.services.profiles.update(claims(&auth), &path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    delete,
    path = "/api/v1/profiles/{username}",
    params(("username" = String, Path, description = "Member name, case-insensitive")),
    responses((status = 204, description = "Member deleted, content reassigned"), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn delete_profile(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    data.services.profiles.delete(claims(&auth), &path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    put,
    path = "/api/v1/profiles/{username}/image",
    params(("username" = String, Path, description = "Member name, case-insensitive")),
    request_body(content = String, description = "Multipart form with a `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 204, description = "Image stored"),
        (status = 400, description = "Missing file field"),
        (status = 413, description = "Image too large"),
        (status = 415, description = "Unsupported image type")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_profile_image(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<String>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::validation("malformed multipart body")
    })? {
        if field.content_disposition().get_name() != Some("file") {
            continue;
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            log::error!("stream read error: {e}");
            ApiError::Internal
        })? {
            if bytes.len() + chunk.len() > IMAGE_SIZE_LIMIT {
                return Ok(HttpResponse::PayloadTooLarge().finish());
            }
            bytes.extend_from_slice(&chunk);
        }
        file = Some(bytes);
    }
    let bytes = file.ok_or_else(|| ApiError::validation("file field is required"))?;
    if !bytes.is_empty() {
        let mime = infer::get(&bytes).map(|t| t.mime_type()).unwrap_or("application/octet-stream");
        if !ALLOWED_MIME.contains(&mime) {
            return Ok(HttpResponse::UnsupportedMediaType().finish());
        }
    }
    data.services.profiles.set_image(claims(&auth), &path.into_inner(), bytes).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{username}/image",
    params(("username" = String, Path, description = "Member name, case-insensitive")),
    responses((status = 200, description = "Image bytes"), (status = 404, description = "No image"))
)]
pub async fn get_profile_image(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let (bytes, mime) = data.services.profiles.image(&path.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .content_type(mime)
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .body(bytes))
}

// ── forum management ────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/manage/members",
    responses((status = 200, description = "All members", body = [MemberSummary]), (status = 403, description = "Staff only")),
    security(("bearer_auth" = []))
)]
pub async fn list_members(auth: Option<Auth>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let members = data.services.management.members(claims(&auth)).await?;
    Ok(HttpResponse::Ok().json(members))
}

#[utoipa::path(
    post,
    path = "/api/v1/manage/members/{id}/block",
    params(("id" = Id, Path, description = "Member id")),
    request_body = BlockRequest,
    responses(
        (status = 200, description = "Member blocked", body = MemberSummary),
        (status = 400, description = "End date not in the future"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []))
)]
pub async fn block_member(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let req = block_request(&body)?;
    let member = data.services.management.block(claims(&auth), path.into_inner(), req).await?;
    Ok(HttpResponse::Ok().json(member))
}

/// An empty body means an indefinite block; anything else must parse.
fn block_request(body: &[u8]) -> Result<BlockRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BlockRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::validation(format!("invalid block request: {e}")))
}

#[utoipa::path(
    post,
    path = "/api/v1/manage/members/{id}/unblock",
    params(("id" = Id, Path, description = "Member id")),
    responses((status = 200, description = "Member unblocked", body = MemberSummary), (status = 403, description = "Forbidden")),
    security(("bearer_auth" = []))
)]
pub async fn unblock_member(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let member = data.services.management.unblock(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[utoipa::path(
    post,
    path = "/api/v1/manage/members/{id}/role",
    params(("id" = Id, Path, description = "Member id")),
    request_body = RoleChange,
    responses((status = 200, description = "Role changed", body = MemberSummary), (status = 403, description = "Admins only")),
    security(("bearer_auth" = []))
)]
pub async fn change_role(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<RoleChange>,
) -> Result<HttpResponse, ApiError> {
    let member = data.services.management.set_role(claims(&auth), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[utoipa::path(
    post,
    path = "/api/v1/manage/threads/{id}/remove",
    params(("id" = Id, Path, description = "Thread id")),
    responses((status = 200, description = "Thread hidden", body = Thread), (status = 403, description = "Staff only")),
    security(("bearer_auth" = []))
)]
pub async fn remove_thread(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let thread = data.services.management.remove_thread(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(thread))
}

#[utoipa::path(
    post,
    path = "/api/v1/manage/threads/{id}/restore",
    params(("id" = Id, Path, description = "Thread id")),
    responses((status = 200, description = "Thread restored", body = Thread), (status = 403, description = "Staff only")),
    security(("bearer_auth" = []))
)]
pub async fn restore_thread(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let thread = data.services.management.restore_thread(claims(&auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(thread))
}
