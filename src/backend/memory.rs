//! In-process fakes for every port, with call counters and failure switches
//! so tests can observe exactly which mutations a workflow performed.

use crate::backend::{
    AuthBackend, AuthSession, AuthUser, Backend, Bucket, Direction, ObjectStore, Record, Select,
    Table, TableStore,
};
use crate::error::PortalError;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn injected(op: &str) -> PortalError {
    PortalError::UpstreamStatus {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: format!("injected {op} failure"),
    }
}

/// Bundle of the three fakes; `backend()` hands out the injectable view.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    pub auth: Arc<MemoryAuth>,
    pub tables: Arc<MemoryTables>,
    pub objects: Arc<MemoryObjects>,
}

impl MemoryBackend {
    pub fn backend(&self) -> Backend {
        Backend::new(self.auth.clone(), self.tables.clone(), self.objects.clone())
    }

    /// Register an auth account together with its `users` row.
    pub fn add_user(&self, id: &str, email: &str, password: &str, role: &str) {
        self.auth.register(id, email, password);
        let mut row = Record::new();
        row.insert("id".into(), id.into());
        row.insert("email".into(), email.into());
        row.insert("name".into(), email.split('@').next().unwrap_or(email).into());
        row.insert("role".into(), role.into());
        self.tables.seed(Table::Users, row);
    }
}

#[derive(Default)]
pub struct MemoryAuth {
    accounts: Mutex<HashMap<String, (String, AuthUser)>>,
    sessions: Mutex<HashMap<String, AuthUser>>,
    next_token: AtomicUsize,
    sign_outs: AtomicUsize,
}

impl MemoryAuth {
    pub fn register(&self, id: &str, email: &str, password: &str) {
        let user = AuthUser {
            id: id.to_string(),
            email: Some(email.to_string()),
        };
        lock(&self.accounts).insert(email.to_string(), (password.to_string(), user));
    }

    /// Create a live session directly, bypassing the password grant.
    pub fn issue_token(&self, user_id: &str) -> String {
        let n = self.next_token.fetch_add(1, AtomicOrdering::SeqCst);
        let token = format!("mem-token-{n}");
        let email = lock(&self.accounts)
            .values()
            .find(|(_, u)| u.id == user_id)
            .and_then(|(_, u)| u.email.clone());
        lock(&self.sessions).insert(
            token.clone(),
            AuthUser {
                id: user_id.to_string(),
                email,
            },
        );
        token
    }

    pub fn is_live(&self, token: &str) -> bool {
        lock(&self.sessions).contains_key(token)
    }

    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for MemoryAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, PortalError> {
        let user = match lock(&self.accounts).get(email) {
            Some((expected, user)) if expected == password => user.clone(),
            _ => return Err(PortalError::InvalidCredentials),
        };
        let access_token = self.issue_token(&user.id);
        Ok(AuthSession { access_token, user })
    }

    async fn current_user(&self, access_token: &str) -> Result<Option<AuthUser>, PortalError> {
        Ok(lock(&self.sessions).get(access_token).cloned())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), PortalError> {
        self.sign_outs.fetch_add(1, AtomicOrdering::SeqCst);
        lock(&self.sessions).remove(access_token);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTables {
    rows: Mutex<BTreeMap<Table, Vec<Record>>>,
    next_id: AtomicUsize,
    selects: AtomicUsize,
    mutations: AtomicUsize,
    fail_writes: AtomicBool,
    fail_selects: AtomicBool,
}

impl MemoryTables {
    /// Insert a row as-is, without counting it as a mutation.
    pub fn seed(&self, table: Table, row: Record) {
        lock(&self.rows).entry(table).or_default().push(row);
    }

    pub fn rows(&self, table: Table) -> Vec<Record> {
        lock(&self.rows).get(&table).cloned().unwrap_or_default()
    }

    pub fn select_count(&self) -> usize {
        self.selects.load(AtomicOrdering::SeqCst)
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.load(AtomicOrdering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn fail_selects(&self, fail: bool) {
        self.fail_selects.store(fail, AtomicOrdering::SeqCst);
    }

    fn begin_write(&self, op: &str) -> Result<(), PortalError> {
        self.mutations.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(injected(op));
        }
        Ok(())
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn id_of(row: &Record) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

#[async_trait]
impl TableStore for MemoryTables {
    async fn select(&self, query: Select) -> Result<Vec<Record>, PortalError> {
        self.selects.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_selects.load(AtomicOrdering::SeqCst) {
            return Err(injected("select"));
        }
        let mut rows: Vec<Record> = self
            .rows(query.table)
            .into_iter()
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|(col, value)| row.get(*col) == Some(value))
            })
            .collect();
        if let Some(order) = query.order {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(order.column), b.get(order.column));
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, mut record: Record) -> Result<Record, PortalError> {
        self.begin_write("insert")?;
        if table != Table::Users && !record.contains_key("id") {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            record.insert("id".into(), Value::from(id));
        }
        if table == Table::Banners && !record.contains_key("created_at") {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            record.insert("created_at".into(), Value::from(now));
        }
        self.seed(table, record.clone());
        Ok(record)
    }

    async fn update_by_id(
        &self,
        table: Table,
        id: i64,
        patch: Record,
    ) -> Result<Record, PortalError> {
        self.begin_write("update")?;
        let mut rows = lock(&self.rows);
        let row = rows
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| id_of(r) == Some(id)))
            .ok_or(PortalError::NotFound {
                entity: table.name(),
                id,
            })?;
        for (k, v) in patch {
            row.insert(k, v);
        }
        Ok(row.clone())
    }

    async fn delete_by_id(&self, table: Table, id: i64) -> Result<(), PortalError> {
        self.begin_write("delete")?;
        if let Some(rows) = lock(&self.rows).get_mut(&table) {
            rows.retain(|r| id_of(r) != Some(id));
        }
        Ok(())
    }
}

/// Stored object: bytes plus content type.
type StoredObject = (Bytes, String);

pub struct MemoryObjects {
    base: Url,
    objects: Mutex<BTreeMap<(Bucket, String), StoredObject>>,
    uploads: AtomicUsize,
    removals: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_removes: AtomicBool,
}

impl Default for MemoryObjects {
    fn default() -> Self {
        Self {
            base: Url::parse("http://objects.test/public/").expect("static url"),
            objects: Mutex::new(BTreeMap::new()),
            uploads: AtomicUsize::new(0),
            removals: AtomicUsize::new(0),
            fail_uploads: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
        }
    }
}

impl MemoryObjects {
    pub fn keys(&self, bucket: Bucket) -> Vec<String> {
        lock(&self.objects)
            .keys()
            .filter(|(b, _)| *b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(AtomicOrdering::SeqCst)
    }

    pub fn removal_count(&self) -> usize {
        self.removals.load(AtomicOrdering::SeqCst)
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn upload(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), PortalError> {
        self.uploads.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_uploads.load(AtomicOrdering::SeqCst) {
            return Err(injected("upload"));
        }
        let mut objects = lock(&self.objects);
        let slot = (bucket, key.to_string());
        if objects.contains_key(&slot) {
            return Err(PortalError::UpstreamStatus {
                status: StatusCode::CONFLICT,
                message: "The resource already exists".to_string(),
            });
        }
        objects.insert(slot, (bytes, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> Result<Url, PortalError> {
        Ok(self.base.join(&format!("{}/{key}", bucket.name()))?)
    }

    async fn remove(&self, bucket: Bucket, keys: &[String]) -> Result<(), PortalError> {
        self.removals.fetch_add(keys.len(), AtomicOrdering::SeqCst);
        if self.fail_removes.load(AtomicOrdering::SeqCst) {
            return Err(injected("remove"));
        }
        let mut objects = lock(&self.objects);
        for key in keys {
            objects.remove(&(bucket, key.clone()));
        }
        Ok(())
    }
}
