//! SQL DDL and column catalogue for the self-hosted (SQLite) table store.
//! Mirrors the hosted tables so either store can back the same services.

use crate::backend::Table;

/// SQLite schema:
/// - `users.id` is the auth user id (UUID text); `role` is checked to student/admin
/// - entity tables use INTEGER PRIMARY KEY AUTOINCREMENT ids
/// - booleans are stored as INTEGER 0/1, timestamps as RFC3339 text
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NULL,
    email TEXT NULL,
    role TEXT NULL CHECK (role IN ('student', 'admin')),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS banners (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    image_url TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    type TEXT NOT NULL CHECK (type IN ('mobile', 'desktop')),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_banners_active_type ON banners(active, type);

CREATE TABLE IF NOT EXISTS facilities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    image_url TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS services (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    image_url TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS modules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    image_url TEXT NOT NULL DEFAULT ''
)
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Bool,
    Text,
}

pub type Column = (&'static str, ColumnKind);

const USERS: &[Column] = &[
    ("id", ColumnKind::Text),
    ("name", ColumnKind::Text),
    ("email", ColumnKind::Text),
    ("role", ColumnKind::Text),
    ("created_at", ColumnKind::Text),
];

const BANNERS: &[Column] = &[
    ("id", ColumnKind::Integer),
    ("title", ColumnKind::Text),
    ("image_url", ColumnKind::Text),
    ("active", ColumnKind::Bool),
    ("type", ColumnKind::Text),
    ("created_at", ColumnKind::Text),
];

const CATALOG_ENTRY: &[Column] = &[
    ("id", ColumnKind::Integer),
    ("name", ColumnKind::Text),
    ("description", ColumnKind::Text),
    ("image_url", ColumnKind::Text),
];

const MODULES: &[Column] = &[
    ("id", ColumnKind::Integer),
    ("title", ColumnKind::Text),
    ("description", ColumnKind::Text),
    ("image_url", ColumnKind::Text),
];

/// Whitelisted columns per table; anything else is rejected before SQL is built.
pub fn columns(table: Table) -> &'static [Column] {
    match table {
        Table::Users => USERS,
        Table::Banners => BANNERS,
        Table::Facilities | Table::Services => CATALOG_ENTRY,
        Table::Modules => MODULES,
    }
}

pub fn column(table: Table, name: &str) -> Option<Column> {
    columns(table).iter().copied().find(|(c, _)| *c == name)
}
