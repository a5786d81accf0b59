use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::{delete, get, patch, post, put},
};
use axum_extra::extract::cookie::Key;

use crate::backend::Backend;
use crate::config::{Config, DisplayConfig};
use crate::db::models::{Banner, Facility, Service};
use crate::handlers::{admin, auth, public, student};
use crate::service::publish::Publisher;

#[derive(Clone)]
pub struct PortalState {
    pub backend: Backend,
    pub publisher: Publisher,
    pub display: DisplayConfig,
    pub cookie_key: Key,
    pub insecure_cookie: bool,
    pub max_body_bytes: usize,
}

impl PortalState {
    pub fn new(backend: Backend, cfg: &Config, cookie_key: Key) -> Self {
        Self::with_publisher(Publisher::new(backend), cfg, cookie_key)
    }

    pub fn with_publisher(publisher: Publisher, cfg: &Config, cookie_key: Key) -> Self {
        Self {
            backend: publisher.backend().clone(),
            publisher,
            display: cfg.display.clone(),
            cookie_key,
            insecure_cookie: cfg.basic.insecure_cookie,
            max_body_bytes: cfg.upload.max_body_bytes,
        }
    }
}

impl FromRef<PortalState> for Key {
    fn from_ref(state: &PortalState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn portal_router(state: PortalState) -> Router {
    let max_body = state.max_body_bytes;

    let public = Router::new()
        .route("/health", get(public::health))
        .route("/api/banners/active", get(public::active_banners))
        .route("/api/banners/rotation", get(public::banner_rotation))
        .route("/api/facilities", get(public::facilities))
        .route("/api/services", get(public::services))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout));

    let student = Router::new().route("/api/student/modules", get(student::modules));

    let admin = Router::new()
        .route("/api/admin/students", get(admin::students))
        .route(
            "/api/admin/banners",
            get(admin::banners).post(admin::create::<Banner>),
        )
        .route("/api/admin/banners/{id}", delete(admin::delete::<Banner>))
        .route("/api/admin/banners/{id}/active", patch(admin::toggle_banner))
        .route(
            "/api/admin/facilities",
            get(admin::list::<Facility>).post(admin::create::<Facility>),
        )
        .route(
            "/api/admin/facilities/{id}",
            put(admin::update::<Facility>).delete(admin::delete::<Facility>),
        )
        .route(
            "/api/admin/services",
            get(admin::list::<Service>).post(admin::create::<Service>),
        )
        .route(
            "/api/admin/services/{id}",
            put(admin::update::<Service>).delete(admin::delete::<Service>),
        );

    Router::new()
        .merge(public)
        .merge(student)
        .merge(admin)
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(state)
}
