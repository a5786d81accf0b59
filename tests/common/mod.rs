#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use axum_extra::extract::cookie::Key;
use kara_portal::{
    Config,
    backend::memory::MemoryBackend,
    router::{PortalState, portal_router},
    service::publish::{Clock, Publisher},
};
use serde_json::Value;
use std::sync::Arc;

pub const FIXED_MILLIS: i64 = 1_700_000_000_000;
pub const BOUNDARY: &str = "portal-test-boundary";

pub struct FixedClock;

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        FIXED_MILLIS
    }
}

pub struct Harness {
    pub mem: MemoryBackend,
    pub app: Router,
    pub admin_token: String,
    pub student_token: String,
}

pub fn harness_with(cfg: Config) -> Harness {
    let mem = MemoryBackend::default();
    mem.add_user("admin-1", "admin@kara.test", "admin-pass", "admin");
    mem.add_user("student-1", "student@kara.test", "student-pass", "student");
    let admin_token = mem.auth.issue_token("admin-1");
    let student_token = mem.auth.issue_token("student-1");

    let publisher = Publisher::with_clock(mem.backend(), Arc::new(FixedClock));
    let state = PortalState::with_publisher(publisher, &cfg, Key::generate());
    Harness {
        mem,
        app: portal_router(state),
        admin_token,
        student_token,
    }
}

pub fn harness() -> Harness {
    harness_with(Config::default())
}

pub struct Image<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_body(fields: &[(&str, &str)], image: Option<Image<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(image) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n\
                 Content-Type: {}\r\n\r\n",
                image.file_name, image.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(image.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn form_request(method: &str, uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn anonymous(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
