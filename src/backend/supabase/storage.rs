use super::{SupabaseClient, check};
use crate::backend::{Bucket, ObjectStore};
use crate::error::PortalError;
use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use url::Url;

/// Storage (`/storage/v1`) adapter. Buckets are expected to be public.
pub struct SupabaseStorage {
    client: SupabaseClient,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn upload(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), PortalError> {
        let url = self
            .client
            .endpoint(&format!("storage/v1/object/{}/{key}", bucket.name()))?;
        let size = bytes.len();
        let resp = self
            .client
            .privileged(Method::POST, url)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check(resp, "storage.upload").await?;
        debug!(bucket = bucket.name(), key, size, "object stored");
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> Result<Url, PortalError> {
        self.client
            .endpoint(&format!("storage/v1/object/public/{}/{key}", bucket.name()))
    }

    async fn remove(&self, bucket: Bucket, keys: &[String]) -> Result<(), PortalError> {
        let url = self
            .client
            .endpoint(&format!("storage/v1/object/{}", bucket.name()))?;
        let resp = self
            .client
            .privileged(Method::DELETE, url)
            .json(&json!({ "prefixes": keys }))
            .send()
            .await?;
        check(resp, "storage.remove").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_points_at_public_object_path() {
        let client = SupabaseClient::with_http(
            reqwest::Client::new(),
            Url::parse("https://proj.supabase.co").unwrap(),
            "anon",
            "anon",
        );
        let storage = SupabaseStorage::new(client);
        let url = storage
            .public_url(Bucket::Facilities, "facility-1699999999999.jpg")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://proj.supabase.co/storage/v1/object/public/facilities/\
             facility-1699999999999.jpg"
        );
    }
}
