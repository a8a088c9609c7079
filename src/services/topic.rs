use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use super::shared::{optional_text, required_text, AuthorRef, SharedService};
use crate::auth::Claims;
use crate::authorization::{rules, AuthorizationService};
use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;

const TITLE_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 1000;

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicSummary {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub created_by: AuthorRef,
    pub created_on: DateTime<Utc>,
    pub locked: bool,
    pub removed: bool,
    pub thread_count: usize,
    pub can_edit: bool,
    pub can_lock: bool,
    pub can_remove: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadSummary {
    pub id: Id,
    pub subject: String,
    pub created_by: AuthorRef,
    pub created_on: DateTime<Utc>,
    pub locked: bool,
    pub removed: bool,
    pub post_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicPage {
    pub topic: TopicSummary,
    pub threads: Vec<ThreadSummary>,
    pub can_create_thread: bool,
}

#[derive(Clone)]
pub struct TopicService {
    repo: Arc<dyn Repo>,
    authz: AuthorizationService,
    shared: SharedService,
}

impl TopicService {
    pub fn new(repo: Arc<dyn Repo>, authz: AuthorizationService, shared: SharedService) -> Self {
        Self { repo, authz, shared }
    }

    pub async fn list(&self, auth: Option<&Claims>) -> Result<Vec<TopicSummary>, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let now = Utc::now();
        let staff = rules::can_view_removed(actor.as_ref(), now);
        let names = self.shared.author_names().await?;
        let mut out = Vec::new();
        for topic in self.repo.list_topics(staff).await? {
            let thread_count = self.repo.list_threads(topic.id, staff).await?.len();
            out.push(summarize(&topic, actor.as_ref(), &names, thread_count, now));
        }
        Ok(out)
    }

    pub async fn page(&self, auth: Option<&Claims>, id: Id) -> Result<TopicPage, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let now = Utc::now();
        let staff = rules::can_view_removed(actor.as_ref(), now);
        let topic = self.repo.get_topic(id).await?;
        if topic.is_removed() && !staff {
            return Err(ApiError::NotFound);
        }
        let names = self.shared.author_names().await?;
        let mut threads = Vec::new();
        for t in self.repo.list_threads(id, staff).await? {
            let post_count = self.repo.list_posts(t.id).await?.len();
            threads.push(ThreadSummary {
                id: t.id,
                subject: t.subject.clone(),
                created_by: SharedService::author(&names, t.created_by),
                created_on: t.created_on,
                locked: t.is_locked(),
                removed: t.is_removed(),
                post_count,
            });
        }
        Ok(TopicPage {
            can_create_thread: rules::can_create_thread(actor.as_ref(), &topic, now),
            topic: summarize(&topic, actor.as_ref(), &names, threads.len(), now),
            threads,
        })
    }

    pub async fn add(&self, auth: Option<&Claims>, new: NewTopic) -> Result<Topic, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_create_topic(actor.as_ref());
        let actor = self.shared.permit(allowed, actor, "create topic")?;
        let new = NewTopic {
            title: required_text("title", &new.title, TITLE_MAX)?,
            description: optional_text("description", &new.description, DESCRIPTION_MAX)?,
        };
        let topic = self.repo.create_topic(new, actor.id).await?;
        info!(topic = topic.id, by = actor.id, "topic created");
        Ok(topic)
    }

    pub async fn update(&self, auth: Option<&Claims>, id: Id, upd: UpdateTopic) -> Result<Topic, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_edit_topic(actor.as_ref(), id).await?;
        let actor = self.shared.permit(allowed, actor, "edit topic")?;
        let mut topic = self.repo.get_topic(id).await?;
        if let Some(title) = upd.title { topic.title = required_text("title", &title, TITLE_MAX)?; }
        if let Some(desc) = upd.description { topic.description = optional_text("description", &desc, DESCRIPTION_MAX)?; }
        topic.edited_by = Some(actor.id);
        topic.edited_on = Some(Utc::now());
        self.repo.save_topic(&topic).await?;
        Ok(topic)
    }

    pub async fn lock(&self, auth: Option<&Claims>, id: Id) -> Result<Topic, ApiError> {
        self.set_locked(auth, id, true).await
    }

    pub async fn unlock(&self, auth: Option<&Claims>, id: Id) -> Result<Topic, ApiError> {
        self.set_locked(auth, id, false).await
    }

    async fn set_locked(&self, auth: Option<&Claims>, id: Id, locked: bool) -> Result<Topic, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_lock_topic(actor.as_ref(), id).await?;
        let actor = self.shared.permit(allowed, actor, "lock topic")?;
        let mut topic = self.repo.get_topic(id).await?;
        if locked {
            topic.locked_by = Some(actor.id);
            topic.locked_on = Some(Utc::now());
        } else {
            topic.locked_by = None;
            topic.locked_on = None;
        }
        self.repo.save_topic(&topic).await?;
        info!(topic = id, by = actor.id, locked, "topic lock changed");
        Ok(topic)
    }

    pub async fn remove(&self, auth: Option<&Claims>, id: Id) -> Result<Topic, ApiError> {
        self.set_removed(auth, id, true).await
    }

    pub async fn restore(&self, auth: Option<&Claims>, id: Id) -> Result<Topic, ApiError> {
        self.set_removed(auth, id, false).await
    }

    async fn set_removed(&self, auth: Option<&Claims>, id: Id, removed: bool) -> Result<Topic, ApiError> {
        let actor = self.shared.current_member(auth).await?;
        let allowed = self.authz.can_remove_topic(actor.as_ref(), id).await?;
        let actor = self.shared.permit(allowed, actor, "remove topic")?;
        let mut topic = self.repo.get_topic(id).await?;
        if removed {
            // removing twice keeps the original stamp
            if topic.removed_by.is_none() {
                topic.removed_by = Some(actor.id);
                topic.removed_on = Some(Utc::now());
            }
        } else {
            topic.removed_by = None;
            topic.removed_on = None;
        }
        self.repo.save_topic(&topic).await?;
        info!(topic = id, by = actor.id, removed, "topic visibility changed");
        Ok(topic)
    }
}

fn summarize(
    topic: &Topic,
    actor: Option<&Member>,
    names: &HashMap<Id, String>,
    thread_count: usize,
    now: DateTime<Utc>,
) -> TopicSummary {
    TopicSummary {
        id: topic.id,
        title: topic.title.clone(),
        description: topic.description.clone(),
        created_by: SharedService::author(names, topic.created_by),
        created_on: topic.created_on,
        locked: topic.is_locked(),
        removed: topic.is_removed(),
        thread_count,
        can_edit: rules::can_edit_topic(actor, topic, now),
        can_lock: rules::can_lock_topic(actor, topic, now),
        can_remove: rules::can_remove_topic(actor, topic, now),
    }
}
