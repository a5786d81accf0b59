use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::middleware::auth::{clear_session_cookie, session_cookie, session_token};
use crate::service::session::lookup_role;
use crate::{PortalError, router::PortalState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login -> password sign-in; sets the session cookie and points
/// the client at the dashboard for the user's role.
pub async fn login(
    State(state): State<PortalState>,
    jar: PrivateCookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<Response, PortalError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(PortalError::validation("Please enter your email and password"));
    }

    let session = state
        .backend
        .auth
        .sign_in_with_password(req.email.trim(), &req.password)
        .await?;

    let role = match lookup_role(&state.backend, &session.user).await {
        Ok(Some(role)) => role,
        _ => {
            warn!(user_id = %session.user.id, "signed-in user has no usable role; signing out");
            if let Err(e) = state.backend.auth.sign_out(&session.access_token).await {
                warn!(error = %e, "sign-out after failed role lookup failed");
            }
            return Err(PortalError::Forbidden {
                required: "student or admin",
            });
        }
    };

    info!(user_id = %session.user.id, role = role.as_str(), "login");
    let jar = jar.add(session_cookie(
        session.access_token.clone(),
        state.insecure_cookie,
    ));
    let body = json!({
        "user": session.user,
        "role": role,
        "access_token": session.access_token,
        "redirect": role.dashboard_path(),
    });
    Ok((jar, Json(body)).into_response())
}

/// POST /auth/logout -> ends the backend session and drops the cookie.
pub async fn logout(
    State(state): State<PortalState>,
    headers: HeaderMap,
    jar: PrivateCookieJar,
) -> Response {
    if let Some(token) = session_token(&headers, &jar)
        && let Err(e) = state.backend.auth.sign_out(&token).await
    {
        warn!(error = %e, "backend sign-out failed");
    }
    let jar = jar.remove(clear_session_cookie());
    (jar, Json(json!({ "message": "Signed out", "redirect": "/" }))).into_response()
}
