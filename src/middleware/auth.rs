use axum::extract::{FromRef, FromRequestParts};
use axum::http::{HeaderMap, request::Parts};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use headers::{Authorization, HeaderMapExt, authorization::Bearer};
use std::marker::PhantomData;
use time::Duration;

use crate::backend::AuthUser;
use crate::db::models::Role;
use crate::router::PortalState;
use crate::service::session::authorize;

pub const SESSION_COOKIE: &str = "portal_session";
pub const LOGIN_PATH: &str = "/login";

/// Access token of the caller, from:
/// - Header: `Authorization: Bearer <token>`
/// - Private cookie `portal_session` set at login
pub fn session_token(headers: &HeaderMap, jar: &PrivateCookieJar) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }
    jar.get(SESSION_COOKIE).map(|c| c.value().to_owned())
}

pub fn session_cookie(token: String, insecure: bool) -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(!insecure)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(1))
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Drop the session cookie and send the browser to the login page.
pub fn redirect_to_login(jar: PrivateCookieJar) -> Response {
    (jar.remove(clear_session_cookie()), Redirect::to(LOGIN_PATH)).into_response()
}

pub trait RequiredRole: Send + Sync + 'static {
    const ROLE: Role;
}

#[derive(Debug, Clone, Copy)]
pub struct Admin;

impl RequiredRole for Admin {
    const ROLE: Role = Role::Admin;
}

#[derive(Debug, Clone, Copy)]
pub struct Student;

impl RequiredRole for Student {
    const ROLE: Role = Role::Student;
}

/// Proof that the caller holds role `R`. Handlers that read protected data
/// take this as an argument, so the gate always resolves before any fetch.
#[derive(Debug, Clone)]
pub struct Capability<R: RequiredRole> {
    pub user: AuthUser,
    _role: PhantomData<fn() -> R>,
}

impl<R: RequiredRole> Capability<R> {
    pub fn email(&self) -> &str {
        self.user.email.as_deref().unwrap_or_default()
    }
}

impl<R, S> FromRequestParts<S> for Capability<R>
where
    R: RequiredRole,
    S: Send + Sync,
    PortalState: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };
        let token = session_token(&parts.headers, &jar);
        let state = PortalState::from_ref(state);

        match authorize(&state.backend, token.as_deref(), R::ROLE).await {
            Ok(user) => Ok(Self {
                user,
                _role: PhantomData,
            }),
            Err(_) => Err(redirect_to_login(jar)),
        }
    }
}
