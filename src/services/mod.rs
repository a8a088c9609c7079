//! Feature services. Each one validates input, asks the authorization
//! service, persists through the repository and returns view-models.

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::authorization::AuthorizationService;
use crate::repo::Repo;

pub mod account;
pub mod management;
pub mod post;
pub mod profile;
pub mod shared;
pub mod thread;
pub mod topic;

pub use account::AccountService;
pub use management::ForumManagementService;
pub use post::PostService;
pub use profile::ProfileService;
pub use shared::SharedService;
pub use thread::ThreadService;
pub use topic::TopicService;

#[derive(Clone)]
pub struct Services {
    pub shared: SharedService,
    pub account: AccountService,
    pub topics: TopicService,
    pub threads: ThreadService,
    pub posts: PostService,
    pub profiles: ProfileService,
    pub management: ForumManagementService,
}

impl Services {
    pub fn new(repo: Arc<dyn Repo>, tokens: TokenIssuer, bootstrap_admins: Vec<String>) -> Self {
        let authz = AuthorizationService::new(repo.clone());
        let shared = SharedService::new(repo.clone());
        let threads = ThreadService::new(repo.clone(), authz.clone(), shared.clone());
        Self {
            account: AccountService::new(repo.clone(), shared.clone(), tokens, bootstrap_admins),
            topics: TopicService::new(repo.clone(), authz.clone(), shared.clone()),
            posts: PostService::new(repo.clone(), authz.clone(), shared.clone()),
            profiles: ProfileService::new(repo.clone(), authz.clone(), shared.clone()),
            management: ForumManagementService::new(repo, authz, shared.clone(), threads.clone()),
            threads,
            shared,
        }
    }
}
