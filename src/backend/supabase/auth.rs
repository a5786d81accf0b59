use super::{SupabaseClient, check};
use crate::backend::{AuthBackend, AuthSession, AuthUser};
use crate::error::PortalError;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// GoTrue (`/auth/v1`) adapter.
pub struct SupabaseAuth {
    client: SupabaseClient,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[async_trait]
impl AuthBackend for SupabaseAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, PortalError> {
        let mut url = self.client.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let resp = self
            .client
            .as_user(Method::POST, url, None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if matches!(resp.status(), StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
            debug!("password grant rejected");
            return Err(PortalError::InvalidCredentials);
        }
        let token: TokenResponse = check(resp, "auth.sign_in").await?.json().await?;
        info!(user_id = %token.user.id, "signed in");
        Ok(AuthSession {
            access_token: token.access_token,
            user: token.user,
        })
    }

    async fn current_user(&self, access_token: &str) -> Result<Option<AuthUser>, PortalError> {
        let url = self.client.endpoint("auth/v1/user")?;
        let resp = self
            .client
            .as_user(Method::GET, url, Some(access_token))
            .send()
            .await?;
        if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(None);
        }
        let user: AuthUser = check(resp, "auth.current_user").await?.json().await?;
        Ok(Some(user))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), PortalError> {
        let url = self.client.endpoint("auth/v1/logout")?;
        let resp = self
            .client
            .as_user(Method::POST, url, Some(access_token))
            .send()
            .await?;
        // An already-expired token is as signed out as it gets.
        if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(());
        }
        check(resp, "auth.sign_out").await?;
        Ok(())
    }
}
