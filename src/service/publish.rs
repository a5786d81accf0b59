//! Upload-and-publish: an image goes to object storage under a generated
//! key, its public URL goes into a table row next to the metadata.
//!
//! Storage and table writes are two separate systems with no shared
//! transaction, so each operation orders its steps to leave at worst a
//! detectable inconsistency, and compensates where it can:
//! - create removes the fresh object if the insert fails
//! - update stores the new object and repoints the row before removing the
//!   old object
//! - delete removes the object first; any storage error aborts before the
//!   row is touched

use crate::backend::{Backend, Bucket, Order, Record, Select, Table};
use crate::db::models::{Banner, BannerType, Facility, Service, from_record};
use crate::error::PortalError;
use axum::body::Bytes;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

/// Millisecond timestamp source for storage keys.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A user-selected image file.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// `{prefix}-{timestamp}.{extension}`; the extension is whatever follows the
/// last `.` of the original file name.
pub fn storage_key(prefix: &str, millis: i64, file_name: &str) -> String {
    let ext = file_name.rsplit('.').next().unwrap_or(file_name);
    format!("{prefix}-{millis}.{ext}")
}

/// Recover the object key from a stored public URL (its trailing path segment).
pub fn object_key_from_url(image_url: &str) -> Result<String, PortalError> {
    let from_url = Url::parse(image_url).ok().and_then(|url| {
        url.path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
    });
    from_url
        .or_else(|| image_url.rsplit('/').next().map(str::to_string))
        .filter(|key| !key.is_empty())
        .ok_or_else(|| PortalError::InvalidStorageUrl(image_url.to_string()))
}

/// An entity managed through the upload-and-publish workflow.
pub trait Publishable: DeserializeOwned + Send {
    /// Editable metadata; every field is required on create and update.
    type Fields: Send + Sync;

    const ENTITY: &'static str;
    const TABLE: Table;
    const BUCKET: Bucket;
    const LIST_ORDER: Order;

    fn key_prefix(fields: &Self::Fields) -> String;

    fn validate(fields: &Self::Fields) -> Result<(), PortalError>;

    /// Metadata columns, without `image_url`.
    fn to_record(fields: &Self::Fields) -> Record;

    /// Columns only set when a row is first created.
    fn on_create(_record: &mut Record) {}

    fn id(&self) -> i64;

    fn image_url(&self) -> &str;
}

fn require(value: &str, message: &str) -> Result<(), PortalError> {
    if value.trim().is_empty() {
        return Err(PortalError::validation(message));
    }
    Ok(())
}

const FILL_ALL_FIELDS: &str = "Please fill in all fields and select an image";

/// Name and description shared by facilities and services.
#[derive(Debug, Clone, Default)]
pub struct CatalogFields {
    pub name: String,
    pub description: String,
}

fn catalog_record(fields: &CatalogFields) -> Record {
    let mut record = Record::new();
    record.insert("name".into(), fields.name.trim().into());
    record.insert("description".into(), fields.description.trim().into());
    record
}

fn validate_catalog(fields: &CatalogFields) -> Result<(), PortalError> {
    require(&fields.name, FILL_ALL_FIELDS)?;
    require(&fields.description, FILL_ALL_FIELDS)
}

impl Publishable for Facility {
    type Fields = CatalogFields;

    const ENTITY: &'static str = "facility";
    const TABLE: Table = Table::Facilities;
    const BUCKET: Bucket = Bucket::Facilities;
    const LIST_ORDER: Order = Order::asc("id");

    fn key_prefix(_fields: &CatalogFields) -> String {
        "facility".to_string()
    }

    fn validate(fields: &CatalogFields) -> Result<(), PortalError> {
        validate_catalog(fields)
    }

    fn to_record(fields: &CatalogFields) -> Record {
        catalog_record(fields)
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn image_url(&self) -> &str {
        &self.image_url
    }
}

impl Publishable for Service {
    type Fields = CatalogFields;

    const ENTITY: &'static str = "service";
    const TABLE: Table = Table::Services;
    const BUCKET: Bucket = Bucket::Services;
    const LIST_ORDER: Order = Order::asc("id");

    fn key_prefix(_fields: &CatalogFields) -> String {
        "service".to_string()
    }

    fn validate(fields: &CatalogFields) -> Result<(), PortalError> {
        validate_catalog(fields)
    }

    fn to_record(fields: &CatalogFields) -> Record {
        catalog_record(fields)
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn image_url(&self) -> &str {
        &self.image_url
    }
}

#[derive(Debug, Clone, Default)]
pub struct BannerFields {
    pub title: String,
    pub kind: BannerType,
}

impl Publishable for Banner {
    type Fields = BannerFields;

    const ENTITY: &'static str = "banner";
    const TABLE: Table = Table::Banners;
    const BUCKET: Bucket = Bucket::Banners;
    const LIST_ORDER: Order = Order::desc("created_at");

    fn key_prefix(fields: &BannerFields) -> String {
        format!("banner-{}", fields.kind)
    }

    fn validate(fields: &BannerFields) -> Result<(), PortalError> {
        require(&fields.title, "Please enter a banner title and select an image")
    }

    fn to_record(fields: &BannerFields) -> Record {
        let mut record = Record::new();
        record.insert("title".into(), fields.title.trim().into());
        record.insert("type".into(), fields.kind.as_str().into());
        record
    }

    fn on_create(record: &mut Record) {
        record.insert("active".into(), Value::Bool(true));
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn image_url(&self) -> &str {
        &self.image_url
    }
}

/// Runs the workflow against an injected backend.
#[derive(Clone)]
pub struct Publisher {
    backend: Backend,
    clock: Arc<dyn Clock>,
}

impl Publisher {
    pub fn new(backend: Backend) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: Backend, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub async fn list<P: Publishable>(&self) -> Result<Vec<P>, PortalError> {
        let rows = self
            .backend
            .tables
            .select(Select::from(P::TABLE).order(Some(P::LIST_ORDER)))
            .await
            .inspect_err(|e| error!(table = P::TABLE.name(), error = %e, "list failed"))?;
        rows.into_iter().map(from_record).collect()
    }

    pub async fn find<P: Publishable>(&self, id: i64) -> Result<P, PortalError> {
        let rows = self
            .backend
            .tables
            .select(Select::from(P::TABLE).eq("id", id))
            .await?;
        match rows.into_iter().next() {
            Some(row) => from_record(row),
            None => Err(PortalError::NotFound {
                entity: P::ENTITY,
                id,
            }),
        }
    }

    /// Store the image, then insert one row referencing its public URL.
    pub async fn create<P: Publishable>(
        &self,
        fields: P::Fields,
        image: Option<ImageUpload>,
    ) -> Result<P, PortalError> {
        P::validate(&fields)?;
        let image = require_image(image)?;

        let key = storage_key(&P::key_prefix(&fields), self.clock.now_millis(), &image.file_name);
        let image_url = self.store::<P>(&key, image).await?;

        let mut record = P::to_record(&fields);
        record.insert("image_url".into(), image_url.into());
        P::on_create(&mut record);

        let row = match self.backend.tables.insert(P::TABLE, record).await {
            Ok(row) => row,
            Err(e) => {
                error!(entity = P::ENTITY, key = %key, error = %e, "insert failed after upload");
                self.discard::<P>(&key).await;
                return Err(e);
            }
        };
        let created: P = from_record(row)?;
        info!(entity = P::ENTITY, id = created.id(), key = %key, "published");
        Ok(created)
    }

    /// Update metadata; with a new image, also swap the stored object.
    pub async fn update<P: Publishable>(
        &self,
        id: i64,
        fields: P::Fields,
        image: Option<ImageUpload>,
    ) -> Result<P, PortalError> {
        P::validate(&fields)?;
        let mut patch = P::to_record(&fields);

        let Some(image) = image.filter(|i| !i.bytes.is_empty()) else {
            let row = self.backend.tables.update_by_id(P::TABLE, id, patch).await?;
            info!(entity = P::ENTITY, id, "metadata updated");
            return from_record(row);
        };
        let image = require_image(Some(image))?;

        let existing: P = self.find(id).await?;
        let key = storage_key(&P::key_prefix(&fields), self.clock.now_millis(), &image.file_name);
        let image_url = self.store::<P>(&key, image).await?;
        patch.insert("image_url".into(), image_url.into());

        let row = match self.backend.tables.update_by_id(P::TABLE, id, patch).await {
            Ok(row) => row,
            Err(e) => {
                error!(
                    entity = P::ENTITY, id, key = %key, error = %e,
                    "update failed after upload"
                );
                self.discard::<P>(&key).await;
                return Err(e);
            }
        };

        match object_key_from_url(existing.image_url()) {
            Ok(old_key) => self.discard::<P>(&old_key).await,
            Err(e) => warn!(entity = P::ENTITY, id, error = %e, "previous image left in place"),
        }
        info!(entity = P::ENTITY, id, key = %key, "image replaced");
        from_record(row)
    }

    /// Remove the stored object, then the row. Requires explicit confirmation.
    pub async fn delete<P: Publishable>(
        &self,
        id: i64,
        confirmed: bool,
    ) -> Result<(), PortalError> {
        if !confirmed {
            return Err(PortalError::ConfirmationRequired(P::ENTITY));
        }
        let existing: P = self.find(id).await?;
        let key = object_key_from_url(existing.image_url())?;

        self.backend
            .objects
            .remove(P::BUCKET, std::slice::from_ref(&key))
            .await
            .inspect_err(|e| {
                error!(entity = P::ENTITY, id, key = %key, error = %e, "object removal failed")
            })?;
        self.backend
            .tables
            .delete_by_id(P::TABLE, id)
            .await
            .inspect_err(|e| {
                error!(
                    entity = P::ENTITY, id, error = %e,
                    "row delete failed; image already removed"
                )
            })?;
        info!(entity = P::ENTITY, id, key = %key, "deleted");
        Ok(())
    }

    async fn store<P: Publishable>(
        &self,
        key: &str,
        image: ImageUpload,
    ) -> Result<String, PortalError> {
        self.backend
            .objects
            .upload(P::BUCKET, key, image.bytes, &image.content_type)
            .await
            .inspect_err(|e| error!(bucket = P::BUCKET.name(), key, error = %e, "upload failed"))?;
        match self.backend.objects.public_url(P::BUCKET, key) {
            Ok(url) => Ok(url.to_string()),
            Err(e) => {
                self.discard::<P>(key).await;
                Err(e)
            }
        }
    }

    /// Best-effort removal; failures are logged and leave an orphan behind.
    async fn discard<P: Publishable>(&self, key: &str) {
        if let Err(e) = self
            .backend
            .objects
            .remove(P::BUCKET, &[key.to_string()])
            .await
        {
            warn!(bucket = P::BUCKET.name(), key, error = %e, "orphaned object left in storage");
        }
    }
}

fn require_image(image: Option<ImageUpload>) -> Result<ImageUpload, PortalError> {
    match image {
        Some(image) if !image.bytes.is_empty() && !image.file_name.is_empty() => Ok(image),
        _ => Err(PortalError::validation(FILL_ALL_FIELDS)),
    }
}
