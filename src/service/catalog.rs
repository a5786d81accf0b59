use crate::backend::{Backend, Select, Table};
use crate::db::models::{Facility, Module, Role, Service, User, from_record};
use crate::error::PortalError;
use crate::service::publish::{Publishable, Publisher};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::error;

/// A result set plus the message to show when it is empty.
#[derive(Debug, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<&'static str>,
}

impl<T> Listing<T> {
    pub fn new(items: Vec<T>, empty_message: &'static str) -> Self {
        let empty_message = items.is_empty().then_some(empty_message);
        Self {
            items,
            empty_message,
        }
    }
}

async fn fetch<T: DeserializeOwned>(
    backend: &Backend,
    query: Select,
) -> Result<Vec<T>, PortalError> {
    let table = query.table;
    let rows = backend
        .tables
        .select(query)
        .await
        .inspect_err(|e| error!(table = table.name(), error = %e, "fetch failed"))?;
    rows.into_iter().map(from_record).collect()
}

async fn published<P: Publishable>(
    publisher: &Publisher,
    empty_message: &'static str,
) -> Result<Listing<P>, PortalError> {
    Ok(Listing::new(publisher.list::<P>().await?, empty_message))
}

pub async fn facilities(publisher: &Publisher) -> Result<Listing<Facility>, PortalError> {
    published(publisher, "No facilities available").await
}

pub async fn services(publisher: &Publisher) -> Result<Listing<Service>, PortalError> {
    published(publisher, "No services available").await
}

pub async fn modules(backend: &Backend) -> Result<Listing<Module>, PortalError> {
    let items = fetch(backend, Select::from(Table::Modules)).await?;
    Ok(Listing::new(items, "No modules available at the moment."))
}

pub async fn students(backend: &Backend) -> Result<Listing<User>, PortalError> {
    let items = fetch(
        backend,
        Select::from(Table::Users).eq("role", Role::Student.as_str()),
    )
    .await?;
    Ok(Listing::new(items, "No students registered yet."))
}

/// Round-trip to the table store; used as the service health probe.
pub async fn facility_count(backend: &Backend) -> Result<usize, PortalError> {
    Ok(backend
        .tables
        .select(Select::from(Table::Facilities))
        .await?
        .len())
}
