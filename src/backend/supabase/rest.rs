use super::{SupabaseClient, check};
use crate::backend::{Direction, Record, Select, Table, TableStore};
use crate::error::PortalError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use url::Url;

/// PostgREST (`/rest/v1`) adapter.
pub struct SupabaseTables {
    client: SupabaseClient,
}

impl SupabaseTables {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn table_url(&self, table: Table) -> Result<Url, PortalError> {
        self.client.endpoint(&format!("rest/v1/{}", table.name()))
    }

    fn by_id(&self, table: Table, id: i64) -> Result<Url, PortalError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        Ok(url)
    }
}

/// Render a filter operand the way PostgREST expects it in `col=eq.<value>`.
fn filter_operand(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn select_url(mut url: Url, query: &Select) -> Url {
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("select", "*");
        for (column, value) in &query.filters {
            pairs.append_pair(column, &format!("eq.{}", filter_operand(value)));
        }
        if let Some(order) = query.order {
            let dir = match order.direction {
                Direction::Asc => "asc",
                Direction::Desc => "desc",
            };
            pairs.append_pair("order", &format!("{}.{dir}", order.column));
        }
    }
    url
}

fn first_row(rows: Vec<Record>, table: Table) -> Result<Record, PortalError> {
    rows.into_iter().next().ok_or_else(|| {
        PortalError::RowShape(format!("{} mutation returned no representation", table.name()))
    })
}

#[async_trait]
impl TableStore for SupabaseTables {
    async fn select(&self, query: Select) -> Result<Vec<Record>, PortalError> {
        let url = select_url(self.table_url(query.table)?, &query);
        let resp = self.client.privileged(Method::GET, url).send().await?;
        Ok(check(resp, "rest.select").await?.json().await?)
    }

    async fn insert(&self, table: Table, record: Record) -> Result<Record, PortalError> {
        let url = self.table_url(table)?;
        let resp = self
            .client
            .privileged(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&[Value::Object(record)])
            .send()
            .await?;
        let rows: Vec<Record> = check(resp, "rest.insert").await?.json().await?;
        first_row(rows, table)
    }

    async fn update_by_id(
        &self,
        table: Table,
        id: i64,
        patch: Record,
    ) -> Result<Record, PortalError> {
        let url = self.by_id(table, id)?;
        let resp = self
            .client
            .privileged(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&Value::Object(patch))
            .send()
            .await?;
        let rows: Vec<Record> = check(resp, "rest.update").await?.json().await?;
        rows.into_iter().next().ok_or(PortalError::NotFound {
            entity: table.name(),
            id,
        })
    }

    async fn delete_by_id(&self, table: Table, id: i64) -> Result<(), PortalError> {
        let url = self.by_id(table, id)?;
        let resp = self.client.privileged(Method::DELETE, url).send().await?;
        check(resp, "rest.delete").await?;
        Ok(())
    }
}
