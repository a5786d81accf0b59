//! Database module: row models and the self-hosted table store.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring table rows and conversions
//! - `schema.rs`: SQL DDL and column catalogue (SQLite-first)
//! - `sqlite.rs`: `TableStore` implementation over sqlx

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{Banner, BannerType, Facility, Module, Role, Service, User};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, SqliteTables};
