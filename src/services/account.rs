use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use super::shared::{optional_text, SharedService};
use crate::auth::{hash_password, verify_password, Claims, Role, TokenIssuer};
use crate::error::ApiError;
use crate::models::*;
use crate::repo::{Repo, RepoError};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Login {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountView {
    pub id: Id,
    pub username: String,
    pub role: Role,
    pub blocked: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub account: AccountView,
}

impl From<&Member> for AccountView {
    fn from(m: &Member) -> Self {
        AccountView {
            id: m.id,
            username: m.username.clone(),
            role: m.role,
            blocked: m.is_blocked(Utc::now()),
        }
    }
}

#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn Repo>,
    shared: SharedService,
    tokens: TokenIssuer,
    bootstrap_admins: Arc<Vec<String>>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn Repo>, shared: SharedService, tokens: TokenIssuer, bootstrap_admins: Vec<String>) -> Self {
        Self { repo, shared, tokens, bootstrap_admins: Arc::new(bootstrap_admins) }
    }

    pub async fn register(&self, reg: Registration) -> Result<AccountView, ApiError> {
        let username = validate_username(&reg.username)?;
        validate_password(&reg.password)?;
        if reg.birth_date.is_some_and(|d| d > Utc::now().date_naive()) {
            return Err(ApiError::validation("birth_date cannot be in the future"));
        }
        let role = if self.bootstrap_admins.iter().any(|a| a.eq_ignore_ascii_case(&username)) {
            Role::Admin
        } else {
            Role::User
        };
        let password_hash = hash_password(&reg.password).map_err(|e| {
            error!(error = %e, "password hashing failed");
            ApiError::Internal
        })?;
        let member = self.repo.create_member(NewMember {
            username,
            password_hash,
            first_name: optional_text("first_name", &reg.first_name, 50)?,
            last_name: optional_text("last_name", &reg.last_name, 50)?,
            birth_date: reg.birth_date,
            role,
        }).await?;
        info!(member = member.id, role = role.as_str(), "account registered");
        Ok(AccountView::from(&member))
    }

    /// Unknown user and wrong password are indistinguishable to the caller.
    pub async fn login(&self, login: Login) -> Result<TokenResponse, ApiError> {
        let member = match self.repo.find_member(login.username.trim()).await {
            Ok(m) => m,
            Err(RepoError::NotFound) => return Err(ApiError::Unauthorized),
            Err(e) => return Err(e.into()),
        };
        if member.is_sentinel() || !verify_password(&login.password, &member.password_hash) {
            return Err(ApiError::Unauthorized);
        }
        let token = self.tokens.issue(&member).map_err(|e| {
            error!(error = %e, "token signing failed");
            ApiError::Internal
        })?;
        Ok(TokenResponse { token, account: AccountView::from(&member) })
    }

    pub async fn me(&self, auth: Option<&Claims>) -> Result<AccountView, ApiError> {
        let member = self.shared.require_member(auth).await?;
        Ok(AccountView::from(&member))
    }

    pub async fn change_password(&self, auth: Option<&Claims>, req: ChangePassword) -> Result<(), ApiError> {
        let mut member = self.shared.require_member(auth).await?;
        if !verify_password(&req.current_password, &member.password_hash) {
            return Err(ApiError::validation("current password is incorrect"));
        }
        validate_password(&req.new_password)?;
        member.password_hash = hash_password(&req.new_password).map_err(|e| {
            error!(error = %e, "password hashing failed");
            ApiError::Internal
        })?;
        self.repo.save_member(&member).await?;
        info!(member = member.id, "password changed");
        Ok(())
    }
}

fn validate_username(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ApiError::validation(format!(
            "username must be {USERNAME_MIN} to {USERNAME_MAX} characters"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        return Err(ApiError::validation("username may contain letters, digits, '_', '-' and '.'"));
    }
    if name.eq_ignore_ascii_case(DELETED_MEMBER) {
        return Err(ApiError::validation("username is reserved"));
    }
    Ok(name.to_string())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(ApiError::validation(format!("password must be at least {PASSWORD_MIN} characters")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_checked() {
        assert_eq!(validate_username("  alice ").unwrap(), "alice");
        assert!(validate_username("al").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("deleted").is_err());
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
