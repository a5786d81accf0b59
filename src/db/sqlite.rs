use crate::backend::{Direction, Record, Select, Table, TableStore};
use crate::db::schema::{Column, ColumnKind, SQLITE_INIT, column, columns};
use crate::error::PortalError;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Self-hosted relational store with the same table layout as the hosted one.
#[derive(Clone)]
pub struct SqliteTables {
    pool: SqlitePool,
}

impl SqliteTables {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database and apply the bundled DDL.
    pub async fn connect(database_url: &str) -> Result<Self, PortalError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let tables = Self::new(pool);
        tables.init_schema().await?;
        Ok(tables)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), PortalError> {
        // sqlx::query runs a single statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn known_column(table: Table, name: &str) -> Result<Column, PortalError> {
        column(table, name).ok_or_else(|| {
            PortalError::validation(format!("unknown column `{name}` on {}", table.name()))
        })
    }

    /// Split a record into whitelisted columns and their values, dropping the
    /// generated `id` of integer-keyed tables.
    fn assignments(table: Table, record: Record) -> Result<Vec<(Column, Value)>, PortalError> {
        record
            .into_iter()
            .filter(|(k, _)| !(k == "id" && table != Table::Users))
            .map(|(k, v)| Ok((Self::known_column(table, &k)?, v)))
            .collect()
    }

    fn row_to_record(table: Table, row: &SqliteRow) -> Result<Record, PortalError> {
        let mut record = Record::new();
        for (name, kind) in columns(table) {
            let value = match kind {
                ColumnKind::Integer => row.try_get::<Option<i64>, _>(*name)?.map(Value::from),
                ColumnKind::Bool => row
                    .try_get::<Option<i64>, _>(*name)?
                    .map(|i| Value::Bool(i != 0)),
                ColumnKind::Text => row.try_get::<Option<String>, _>(*name)?.map(Value::from),
            };
            record.insert((*name).to_string(), value.unwrap_or(Value::Null));
        }
        Ok(record)
    }
}

fn column_list(table: Table) -> String {
    columns(table)
        .iter()
        .map(|(name, _)| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bind_value<'q>(
    query: SqliteQuery<'q>,
    (name, kind): Column,
    value: Value,
) -> Result<SqliteQuery<'q>, PortalError> {
    let mismatch = |v: &Value| PortalError::validation(format!("invalid value {v} for `{name}`"));
    Ok(match (kind, value) {
        (_, Value::Null) => query.bind(None::<String>),
        (ColumnKind::Integer, Value::Number(n)) => {
            let i = n.as_i64().ok_or_else(|| mismatch(&Value::Number(n.clone())))?;
            query.bind(i)
        }
        (ColumnKind::Bool, Value::Bool(b)) => query.bind(i64::from(b)),
        (ColumnKind::Text, Value::String(s)) => query.bind(s),
        (_, other) => return Err(mismatch(&other)),
    })
}

#[async_trait]
impl TableStore for SqliteTables {
    async fn select(&self, query: Select) -> Result<Vec<Record>, PortalError> {
        let table = query.table;
        let mut sql = format!("SELECT {} FROM {}", column_list(table), table.name());
        let mut binds = Vec::with_capacity(query.filters.len());
        for (i, (name, value)) in query.filters.into_iter().enumerate() {
            let col = Self::known_column(table, name)?;
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!("\"{name}\" = ?"));
            binds.push((col, value));
        }
        if let Some(order) = query.order {
            Self::known_column(table, order.column)?;
            let dir = match order.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            sql.push_str(&format!(" ORDER BY \"{}\" {dir}", order.column));
        }

        let mut q = sqlx::query(&sql);
        for (col, value) in binds {
            q = bind_value(q, col, value)?;
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Self::row_to_record(table, row))
            .collect()
    }

    async fn insert(&self, table: Table, record: Record) -> Result<Record, PortalError> {
        let assignments = Self::assignments(table, record)?;
        let names: Vec<String> = assignments
            .iter()
            .map(|((name, _), _)| format!("\"{name}\""))
            .collect();
        let placeholders = vec!["?"; assignments.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders}) RETURNING {}",
            table.name(),
            names.join(", "),
            column_list(table)
        );

        let mut q = sqlx::query(&sql);
        for (col, value) in assignments {
            q = bind_value(q, col, value)?;
        }
        let row = q.fetch_one(&self.pool).await?;
        Self::row_to_record(table, &row)
    }

    async fn update_by_id(
        &self,
        table: Table,
        id: i64,
        patch: Record,
    ) -> Result<Record, PortalError> {
        let assignments = Self::assignments(table, patch)?;
        if assignments.is_empty() {
            return Err(PortalError::validation("nothing to update"));
        }
        let sets: Vec<String> = assignments
            .iter()
            .map(|((name, _), _)| format!("\"{name}\" = ?"))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ? RETURNING {}",
            table.name(),
            sets.join(", "),
            column_list(table)
        );

        let mut q = sqlx::query(&sql);
        for (col, value) in assignments {
            q = bind_value(q, col, value)?;
        }
        let row = q.bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Self::row_to_record(table, &row),
            None => Err(PortalError::NotFound {
                entity: table.name(),
                id,
            }),
        }
    }

    async fn delete_by_id(&self, table: Table, id: i64) -> Result<(), PortalError> {
        sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table.name()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
