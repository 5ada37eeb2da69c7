//! Mock sign-in backed by the persisted session store.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    db::Database,
    forms::{non_blank, FieldErrors, SubmitError},
    navigation::{Navigator, Route},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const TOKEN_KEY: &str = "token";
pub const USER_EMAIL_KEY: &str = "userEmail";
pub const LOGGED_IN_KEY: &str = "isLoggedIn";

/// String key/value flags that survive restarts.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set_flag(&self, key: &str, value: &str) -> Result<()>;
    async fn get_flag(&self, key: &str) -> Result<Option<String>>;
    async fn remove_flag(&self, key: &str) -> Result<bool>;
}

#[async_trait]
impl SessionStore for Database {
    async fn set_flag(&self, key: &str, value: &str) -> Result<()> {
        Database::set_flag(self, key, value).await
    }

    async fn get_flag(&self, key: &str) -> Result<Option<String>> {
        Database::get_flag(self, key).await
    }

    async fn remove_flag(&self, key: &str) -> Result<bool> {
        Database::remove_flag(self, key).await
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// `local@domain.tld` with no whitespace anywhere.
fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

impl Credentials {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        match non_blank(&self.email) {
            None => errors.add("email", "Email is required"),
            Some(email) if !looks_like_email(email) => errors.add("email", "Invalid email format"),
            Some(_) => {}
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub token: String,
    pub email: String,
}

/// Validate credentials, write the mock token and open the dashboard.
pub async fn sign_in(
    store: &dyn SessionStore,
    navigator: &dyn Navigator,
    credentials: &Credentials,
) -> Result<UserSession, SubmitError> {
    credentials.validate()?;

    let email = credentials.email.trim().to_string();
    let token = format!("mock_jwt_token_{}", Utc::now().timestamp_millis());
    persist_session(store, &token, &email)
        .await
        .map_err(|source| SubmitError::Store {
            message: "Failed to sign in. Please try again.",
            source,
        })?;

    log_info!("Signed in as {}", email);
    navigator.push(Route::Dashboard);
    Ok(UserSession { token, email })
}

async fn persist_session(store: &dyn SessionStore, token: &str, email: &str) -> Result<()> {
    store.set_flag(TOKEN_KEY, token).await?;
    store.set_flag(USER_EMAIL_KEY, email).await?;
    store.set_flag(LOGGED_IN_KEY, "true").await?;
    Ok(())
}

/// Clear every session flag. Missing keys are not an error.
pub async fn logout(store: &dyn SessionStore) -> Result<()> {
    for key in [TOKEN_KEY, USER_EMAIL_KEY, LOGGED_IN_KEY] {
        if !store.remove_flag(key).await? {
            log_warn!("Session flag {} was not set", key);
        }
    }
    log_info!("Signed out");
    Ok(())
}

pub async fn is_logged_in(store: &dyn SessionStore) -> Result<bool> {
    Ok(store.get_flag(LOGGED_IN_KEY).await?.as_deref() == Some("true"))
}

pub async fn current_session(store: &dyn SessionStore) -> Result<Option<UserSession>> {
    if !is_logged_in(store).await? {
        return Ok(None);
    }
    let token = store.get_flag(TOKEN_KEY).await?;
    let email = store.get_flag(USER_EMAIL_KEY).await?;
    Ok(token.zip(email).map(|(token, email)| UserSession { token, email }))
}
