#![allow(dead_code)]

use std::sync::Arc;

use agora::auth::{Role, TokenIssuer};
use agora::models::Id;
use agora::repo::inmem::InMemRepo;
use agora::repo::MemberRepo;
use agora::services::account::{Login, Registration};
use agora::AppState;

pub const SECRET: &str = "test-secret-must-be-32-bytes-long!!";
pub const PASSWORD: &str = "correct horse battery";

/// Shared state over an ephemeral repository. `admin` registers as Admin.
pub struct Forum {
    pub state: AppState,
    pub repo: Arc<InMemRepo>,
}

impl Forum {
    pub async fn new() -> Self {
        let repo = Arc::new(InMemRepo::ephemeral());
        let state = AppState::new(repo.clone(), TokenIssuer::new(SECRET, 1), vec!["admin".into()]);
        state.services.shared.ensure_sentinel().await.unwrap();
        Self { state, repo }
    }

    /// Registers `name` and returns its id and a bearer header value.
    pub async fn member(&self, name: &str) -> (Id, String) {
        let account = self.state.services.account.register(Registration {
            username: name.into(),
            password: PASSWORD.into(),
            first_name: String::new(),
            last_name: String::new(),
            birth_date: None,
        }).await.unwrap();
        let token = self.state.services.account
            .login(Login { username: name.into(), password: PASSWORD.into() })
            .await
            .unwrap()
            .token;
        (account.id, format!("Bearer {token}"))
    }

    /// Changes the stored role directly; tokens already issued stay valid.
    pub async fn promote(&self, id: Id, role: Role) {
        let mut m = self.repo.get_member(id).await.unwrap();
        m.role = role;
        self.repo.save_member(&m).await.unwrap();
    }
}

#[macro_export]
macro_rules! app {
    ($forum:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($forum.state.clone()))
                .configure(agora::config),
        )
        .await
    };
}
