//! Ports onto the hosted backend: authentication, relational tables and
//! object storage. Handlers and services only ever see [`Backend`], which
//! bundles one adapter per port and is injected through router state.
//!
//! Layout:
//! - `supabase/`: reqwest adapters for GoTrue, PostgREST and Storage
//! - `memory.rs`: in-process fakes used by the tests

pub mod memory;
pub mod supabase;

use crate::config::{Config, TableBackend};
use crate::db::sqlite::SqliteTables;
use crate::error::PortalError;
use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// One row as exchanged with the relational store.
pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Users,
    Banners,
    Facilities,
    Services,
    Modules,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Banners => "banners",
            Table::Facilities => "facilities",
            Table::Services => "services",
            Table::Modules => "modules",
        }
    }
}

/// Storage partitions, one per publishable entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Banners,
    Facilities,
    Services,
}

impl Bucket {
    pub fn name(&self) -> &'static str {
        match self {
            Bucket::Banners => "banners",
            Bucket::Facilities => "facilities",
            Bucket::Services => "services",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub direction: Direction,
}

impl Order {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            direction: Direction::Asc,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            direction: Direction::Desc,
        }
    }
}

/// A select with equality filters and optional ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: Table,
    pub filters: Vec<(&'static str, Value)>,
    pub order: Option<Order>,
}

impl Select {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push((column, value.into()));
        self
    }

    pub fn order(mut self, order: Option<Order>) -> Self {
        self.order = order;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, PortalError>;

    /// Resolve the user behind an access token; `None` when the token is not a live session.
    async fn current_user(&self, access_token: &str) -> Result<Option<AuthUser>, PortalError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), PortalError>;
}

#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, query: Select) -> Result<Vec<Record>, PortalError>;

    /// Insert one row and return it as stored (with generated columns).
    async fn insert(&self, table: Table, record: Record) -> Result<Record, PortalError>;

    /// Apply `patch` to the row with the given id; `NotFound` when no row matched.
    async fn update_by_id(&self, table: Table, id: i64, patch: Record)
    -> Result<Record, PortalError>;

    async fn delete_by_id(&self, table: Table, id: i64) -> Result<(), PortalError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), PortalError>;

    fn public_url(&self, bucket: Bucket, key: &str) -> Result<Url, PortalError>;

    async fn remove(&self, bucket: Bucket, keys: &[String]) -> Result<(), PortalError>;
}

/// The injected backend: one adapter per capability group.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthBackend>,
    pub tables: Arc<dyn TableStore>,
    pub objects: Arc<dyn ObjectStore>,
}

impl Backend {
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        tables: Arc<dyn TableStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            auth,
            tables,
            objects,
        }
    }

    /// Build the adapters selected by configuration.
    pub async fn connect(cfg: &Config) -> Result<Self, PortalError> {
        let client = supabase::SupabaseClient::new(&cfg.supabase)?;
        let auth = Arc::new(supabase::SupabaseAuth::new(client.clone()));
        let objects = Arc::new(supabase::SupabaseStorage::new(client.clone()));
        let tables: Arc<dyn TableStore> = match cfg.storage.tables {
            TableBackend::Supabase => Arc::new(supabase::SupabaseTables::new(client)),
            TableBackend::Sqlite => {
                let tables = SqliteTables::connect(&cfg.storage.database_url).await?;
                info!(database_url = %cfg.storage.database_url, "sqlite table store ready");
                Arc::new(tables)
            }
        };
        Ok(Self::new(auth, tables, objects))
    }
}
