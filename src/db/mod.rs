//! Database module: the embedded SQLite store behind the SQL tutor,
//! progress tracking, the weather cache and project bookkeeping.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and dynamic query results
//! - `schema.rs`: SQL DDL for initializing the database
//! - `seed.rs`: sample rows for the tutorial tables
//! - `sqlite.rs`: the [`SqlEngine`] handle

pub mod models;
pub mod schema;
pub mod seed;
pub mod sqlite;

pub use models::{Cell, ColumnInfo, LessonProgress, NewProject, ProjectRecord, QueryResult};
pub use schema::{SAMPLE_TABLES, SQLITE_INIT};
pub use sqlite::{MAX_RESULT_ROWS, SqlEngine, SqlitePool};
