use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Error;
use crate::targets;

pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub email: String,
}

/// Authentication collaborator. `verify_identity` is the throwaway check
/// used by elevated deletion: it validates credentials and returns the
/// verified email without touching the caller's existing session.
pub trait AuthClient: Send + Sync {
    fn sign_in(&self, email: String, password: String) -> AuthFuture<'_, AuthSession>;
    fn verify_identity(&self, email: String, password: String) -> AuthFuture<'_, String>;
    fn sign_out(&self, access_token: String) -> AuthFuture<'_, ()>;
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl AuthConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Password-grant client for the hosted auth service.
#[derive(Debug)]
pub struct RestAuthClient {
    config: AuthConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    email: String,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
}

impl RestAuthClient {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/auth/v1/{path}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn password_grant(&self, email: String, password: String) -> Result<AuthSession, Error> {
        debug!(target: targets::AUTH, email = %email, "Password grant");
        let body = HashMap::from([("email", email), ("password", password)]);
        let response = self
            .http
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.api_key)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|error| Error::AuthFailure {
                details: error.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let details = serde_json::from_str::<AuthErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.error_description.or(parsed.msg))
                .unwrap_or_else(|| format!("HTTP {status}"));
            warn!(target: targets::AUTH, status = %status, details = %details, "Sign-in rejected");
            return Err(Error::AuthFailure { details });
        }

        let token: TokenResponse = response.json().await.map_err(|error| Error::AuthFailure {
            details: error.to_string(),
        })?;
        Ok(AuthSession {
            access_token: token.access_token,
            email: token.user.email,
        })
    }

    async fn logout(&self, access_token: String) -> Result<(), Error> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(access_token)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|error| Error::AuthFailure {
                details: error.to_string(),
            })?;

        if !response.status().is_success() {
            // Ending the session server-side is best effort; the client
            // forgets the token either way.
            warn!(target: targets::AUTH, status = %response.status(), "Logout rejected");
        }
        Ok(())
    }
}

impl AuthClient for RestAuthClient {
    fn sign_in(&self, email: String, password: String) -> AuthFuture<'_, AuthSession> {
        Box::pin(self.password_grant(email, password))
    }

    fn verify_identity(&self, email: String, password: String) -> AuthFuture<'_, String> {
        // Same grant, but the token is discarded: the caller's session must
        // survive unchanged.
        Box::pin(async move {
            let session = self.password_grant(email, password).await?;
            Ok(session.email)
        })
    }

    fn sign_out(&self, access_token: String) -> AuthFuture<'_, ()> {
        Box::pin(self.logout(access_token))
    }
}

/// Test double with a fixed set of accounts.
#[derive(Debug, Clone, Default)]
pub struct MockAuthClient {
    accounts: Arc<Mutex<HashMap<String, String>>>,
}

impl MockAuthClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, email: &str, password: &str) -> Self {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(email.to_lowercase(), password.to_string());
        }
        self
    }

    fn check(&self, email: &str, password: &str) -> Result<String, Error> {
        let accounts = self.accounts.lock().map_err(|_| Error::AuthFailure {
            details: "Mock auth lock poisoned.".to_string(),
        })?;
        let normalized = email.to_lowercase();
        match accounts.get(&normalized) {
            Some(expected) if expected == password => Ok(normalized),
            _ => Err(Error::AuthFailure {
                details: "Invalid login credentials".to_string(),
            }),
        }
    }
}

impl AuthClient for MockAuthClient {
    fn sign_in(&self, email: String, password: String) -> AuthFuture<'_, AuthSession> {
        Box::pin(async move {
            let email = self.check(&email, &password)?;
            Ok(AuthSession {
                access_token: format!("mock-token-{email}"),
                email,
            })
        })
    }

    fn verify_identity(&self, email: String, password: String) -> AuthFuture<'_, String> {
        Box::pin(async move { self.check(&email, &password) })
    }

    fn sign_out(&self, _access_token: String) -> AuthFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_future<T>(future: impl Future<Output = T>) -> T {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("tokio runtime");
        runtime.block_on(future)
    }

    #[test]
    fn mock_sign_in_accepts_known_account() {
        let auth = MockAuthClient::new().with_account("agent@example.org", "secret");
        let session =
            run_future(auth.sign_in("Agent@Example.org".to_string(), "secret".to_string()))
                .expect("session");
        assert_eq!(session.email, "agent@example.org");
    }

    #[test]
    fn mock_sign_in_rejects_bad_password() {
        let auth = MockAuthClient::new().with_account("agent@example.org", "secret");
        let error = run_future(auth.sign_in("agent@example.org".to_string(), "wrong".to_string()))
            .expect_err("rejected");
        assert!(matches!(error, Error::AuthFailure { .. }));
    }

    #[test]
    fn mock_verify_identity_returns_email_only() {
        let auth = MockAuthClient::new().with_account("chief@example.org", "pw");
        let email =
            run_future(auth.verify_identity("chief@example.org".to_string(), "pw".to_string()))
                .expect("verified");
        assert_eq!(email, "chief@example.org");
    }
}
