mod common;

use axum::{
    body::BodyDataStream,
    http::{StatusCode, header},
};
use common::{anonymous, harness};
use futures::StreamExt;
use kara_portal::backend::{Record, Table};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

fn banner(id: i64, kind: &str, active: bool, created_at: &str) -> Record {
    json!({
        "id": id,
        "title": format!("banner {id}"),
        "image_url": format!("http://objects.test/public/banners/banner-{kind}-{id}.png"),
        "active": active,
        "type": kind,
        "created_at": created_at,
    })
    .as_object()
    .cloned()
    .unwrap()
}

/// Read SSE frames until the next event carrying `data:`; keep-alives are skipped.
async fn next_slide(stream: &mut BodyDataStream) -> Value {
    let mut buf = String::new();
    loop {
        while let Some(end) = buf.find("\n\n") {
            let event: String = buf.drain(..end + 2).collect();
            let data = event
                .lines()
                .find_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start);
            if let Some(data) = data {
                return serde_json::from_str(data).unwrap();
            }
        }
        let chunk = stream.next().await.expect("stream ended").unwrap();
        buf.push_str(std::str::from_utf8(&chunk).unwrap());
    }
}

async fn open(app: &axum::Router, uri: &str) -> BodyDataStream {
    let resp = app.clone().oneshot(anonymous("GET", uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    resp.into_body().into_data_stream()
}

fn seed(h: &common::Harness) {
    h.mem.tables.seed(Table::Banners, banner(1, "mobile", true, "2026-01-01T00:00:00Z"));
    h.mem.tables.seed(Table::Banners, banner(2, "desktop", true, "2026-01-02T00:00:00Z"));
    h.mem.tables.seed(Table::Banners, banner(3, "desktop", true, "2026-01-03T00:00:00Z"));
    h.mem.tables.seed(Table::Banners, banner(4, "desktop", false, "2026-01-04T00:00:00Z"));
}

#[tokio::test(start_paused = true)]
async fn each_viewport_starts_at_the_first_slide_of_its_own_set() {
    let h = harness();
    seed(&h);

    let mut narrow = open(&h.app, "/api/banners/rotation?width=375").await;
    let first = next_slide(&mut narrow).await;
    assert_eq!(first["index"], 0);
    assert_eq!(first["total"], 1);
    assert_eq!(first["banner"]["type"], "mobile");
    drop(narrow);

    let mut wide = open(&h.app, "/api/banners/rotation?width=1280").await;
    let first = next_slide(&mut wide).await;
    assert_eq!(first["index"], 0);
    assert_eq!(first["total"], 2);
    assert_eq!(first["banner"]["id"], 2);

    let started = tokio::time::Instant::now();
    let second = next_slide(&mut wide).await;
    assert_eq!(second["index"], 1);
    assert_eq!(second["banner"]["id"], 3);
    assert_eq!(started.elapsed(), Duration::from_secs(5));

    let third = next_slide(&mut wide).await;
    assert_eq!(third["index"], 0);
}

#[tokio::test(start_paused = true)]
async fn slide_parameter_resumes_from_the_chosen_banner() {
    let h = harness();
    seed(&h);

    let mut wide = open(&h.app, "/api/banners/rotation?width=1280&slide=1").await;
    assert_eq!(next_slide(&mut wide).await["index"], 1);
    assert_eq!(next_slide(&mut wide).await["index"], 0);

    let mut out_of_range = open(&h.app, "/api/banners/rotation?width=1280&slide=9").await;
    assert_eq!(next_slide(&mut out_of_range).await["index"], 0);
}

#[tokio::test(start_paused = true)]
async fn empty_set_emits_a_single_blank_slide() {
    let h = harness();
    let mut narrow = open(&h.app, "/api/banners/rotation?width=320").await;
    let slide = next_slide(&mut narrow).await;
    assert_eq!(slide["total"], 0);
    assert_eq!(slide["banner"], Value::Null);
}
