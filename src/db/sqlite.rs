use crate::db::models::{
    Cell, ColumnInfo, LessonProgress, NewProject, ProjectRecord, QueryResult, parse_timestamp,
};
use crate::db::schema::SQLITE_INIT;
use crate::db::seed::{DEPARTMENTS, EMPLOYEES, SALES};
use crate::error::{CodeMasterError, Result};
use chrono::{Duration as ChronoDuration, Utc};
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteColumn, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Pool, Row, Sqlite, TypeInfo, ValueRef};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub type SqlitePool = Pool<Sqlite>;

/// Rows kept from a single ad-hoc query.
pub const MAX_RESULT_ROWS: usize = 10_000;

/// Handle to the local embedded database.
#[derive(Clone)]
pub struct SqlEngine {
    pool: SqlitePool,
}

impl SqlEngine {
    /// Open (creating if missing) the database file, ensure the schema and
    /// seed the tutorial tables on first run.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let connect_opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(connect_opts)
            .await?;

        let engine = Self { pool };
        engine.init_schema().await?;
        engine.populate_sample_data().await?;
        info!(path = %path.display(), "SQL database initialized");
        Ok(engine)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<()> {
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Insert the sample rows in one transaction when `employees` is empty.
    /// Returns whether anything was inserted.
    pub async fn populate_sample_data(&self) -> Result<bool> {
        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        for d in DEPARTMENTS.iter() {
            sqlx::query(
                "INSERT INTO departments (dept_id, dept_name, location, budget) VALUES (?, ?, ?, ?)",
            )
            .bind(d.id)
            .bind(d.name)
            .bind(d.location)
            .bind(d.budget)
            .execute(&mut *tx)
            .await?;
        }
        for e in EMPLOYEES.iter() {
            sqlx::query(
                r#"INSERT INTO employees
                   (employee_id, first_name, last_name, email, department, salary, hire_date, manager_id)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(e.id)
            .bind(e.first_name)
            .bind(e.last_name)
            .bind(e.email)
            .bind(e.department)
            .bind(e.salary)
            .bind(e.hire_date)
            .bind(e.manager_id)
            .execute(&mut *tx)
            .await?;
        }
        for s in SALES.iter() {
            sqlx::query(
                r#"INSERT INTO sales
                   (sale_id, employee_id, product_name, sale_amount, sale_date, customer_name)
                   VALUES (?, ?, ?, ?, ?, ?)"#,
            )
            .bind(s.id)
            .bind(s.employee_id)
            .bind(s.product)
            .bind(s.amount)
            .bind(s.date)
            .bind(s.customer)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(
            departments = DEPARTMENTS.len(),
            employees = EMPLOYEES.len(),
            sales = SALES.len(),
            "sample data populated"
        );
        Ok(true)
    }

    /// Run an arbitrary statement and decode its rows dynamically, keeping
    /// at most [`MAX_RESULT_ROWS`]. Rows are streamed so a runaway query
    /// stops at the cap. Errors raised by SQLite itself come back as
    /// [`CodeMasterError::Sql`].
    pub async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let mut columns = None;
        let mut rows = Vec::new();
        let mut truncated = false;
        {
            let mut stream = sqlx::query(sql).fetch(&self.pool);
            while let Some(row) = stream.try_next().await.map_err(sql_error)? {
                if rows.len() == MAX_RESULT_ROWS {
                    truncated = true;
                    break;
                }
                if columns.is_none() {
                    columns = Some(column_names(row.columns()));
                }
                let cells = (0..row.len())
                    .map(|i| decode_cell(&row, i))
                    .collect::<std::result::Result<Vec<Cell>, sqlx::Error>>()?;
                rows.push(cells);
            }
        }

        let columns = match columns {
            Some(columns) => columns,
            None => (&self.pool)
                .describe(sql)
                .await
                .map(|d| column_names(d.columns()))
                .unwrap_or_default(),
        };

        if truncated {
            warn!(limit = MAX_RESULT_ROWS, "query result truncated");
        }
        debug!(rows = rows.len(), truncated, "query executed");
        Ok(QueryResult {
            columns,
            rows,
            truncated,
        })
    }

    /// Run a data-modifying statement; returns the affected row count.
    pub async fn execute_update(&self, sql: &str) -> Result<u64> {
        let done = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(sql_error)?;
        debug!(affected = done.rows_affected(), "update executed");
        Ok(done.rows_affected())
    }

    pub async fn available_tables(&self) -> Result<Vec<String>> {
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names.into_iter().map(|(n,)| n).collect())
    }

    pub async fn table_schema(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = sqlx::query(r#"SELECT name, type, "notnull", pk FROM pragma_table_info(?)"#)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        if rows.is_empty() {
            return Err(CodeMasterError::UnknownTable(table.to_string()));
        }
        rows.into_iter()
            .map(|row| {
                let not_null: i64 = row.try_get("notnull")?;
                let pk: i64 = row.try_get("pk")?;
                Ok(ColumnInfo {
                    column: row.try_get("name")?,
                    data_type: row.try_get("type")?,
                    not_null: not_null != 0,
                    primary_key: pk != 0,
                })
            })
            .collect()
    }

    /// Count one attempt at a lesson. Completion and best score are sticky.
    pub async fn record_attempt(
        &self,
        lesson_id: &str,
        lesson_title: &str,
        completed: bool,
        score: i64,
    ) -> Result<LessonProgress> {
        let completed_at = completed.then(|| Utc::now().to_rfc3339());
        sqlx::query(
            r#"
            INSERT INTO tutorial_progress (
                lesson_id, lesson_title, completed, completed_at, score, attempts
            ) VALUES (?, ?, ?, ?, ?, 1)
            ON CONFLICT(lesson_id) DO UPDATE SET
                lesson_title = excluded.lesson_title,
                attempts = tutorial_progress.attempts + 1,
                completed = MAX(tutorial_progress.completed, excluded.completed),
                completed_at = COALESCE(tutorial_progress.completed_at, excluded.completed_at),
                score = MAX(tutorial_progress.score, excluded.score)
            "#,
        )
        .bind(lesson_id)
        .bind(lesson_title)
        .bind(completed)
        .bind(completed_at)
        .bind(score)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r#"SELECT lesson_id, lesson_title, completed, completed_at, score, attempts
               FROM tutorial_progress WHERE lesson_id = ?"#,
        )
        .bind(lesson_id)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_progress(row)
    }

    pub async fn progress(&self) -> Result<Vec<LessonProgress>> {
        let rows = sqlx::query(
            r#"SELECT lesson_id, lesson_title, completed, completed_at, score, attempts
               FROM tutorial_progress ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_progress).collect()
    }

    /// Cached JSON for `key` if it is younger than `max_age`.
    pub async fn cache_get(&self, key: &str, max_age: ChronoDuration) -> Result<Option<String>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT weather_data, cached_at FROM weather_cache WHERE cache_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(data, cached_at)| {
            let cached_at = parse_timestamp(&cached_at)?;
            (Utc::now() - cached_at < max_age).then_some(data)
        }))
    }

    pub async fn cache_put(&self, key: &str, data: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO weather_cache (cache_key, weather_data, cached_at) VALUES (?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                weather_data = excluded.weather_data,
                cached_at = excluded.cached_at
            "#,
        )
        .bind(key)
        .bind(data)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert by unique project name. Returns the row id.
    pub async fn upsert_project(&self, project: NewProject) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO projects (
                name, path, description, language, created_at, last_accessed,
                file_count, line_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                path = excluded.path,
                description = COALESCE(excluded.description, projects.description),
                language = excluded.language,
                last_accessed = excluded.last_accessed,
                file_count = excluded.file_count,
                line_count = excluded.line_count
            "#,
        )
        .bind(&project.name)
        .bind(&project.path)
        .bind(&project.description)
        .bind(&project.language)
        .bind(&now)
        .bind(&now)
        .bind(project.file_count)
        .bind(project.line_count)
        .execute(&self.pool)
        .await?;

        let rec: (i64,) = sqlx::query_as("SELECT id FROM projects WHERE name = ?")
            .bind(&project.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        let rows = sqlx::query(
            r#"SELECT id, name, path, description, language, created_at, last_accessed,
               file_count, line_count
               FROM projects ORDER BY last_accessed DESC, id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_project).collect()
    }

    pub async fn get_project(&self, name: &str) -> Result<ProjectRecord> {
        let row = sqlx::query(
            r#"SELECT id, name, path, description, language, created_at, last_accessed,
               file_count, line_count
               FROM projects WHERE name = ?"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CodeMasterError::UnknownProject(name.to_string()))?;
        Self::row_to_project(row)
    }

    pub async fn touch_project(&self, name: &str) -> Result<()> {
        let done = sqlx::query("UPDATE projects SET last_accessed = ? WHERE name = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(name)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(CodeMasterError::UnknownProject(name.to_string()));
        }
        Ok(())
    }

    fn row_to_progress(row: SqliteRow) -> Result<LessonProgress> {
        let completed_i: i64 = row.try_get("completed")?;
        let completed_at: Option<String> = row.try_get("completed_at")?;
        Ok(LessonProgress {
            lesson_id: row.try_get("lesson_id")?,
            lesson_title: row.try_get("lesson_title")?,
            completed: completed_i != 0,
            completed_at: completed_at.as_deref().and_then(parse_timestamp),
            score: row.try_get("score")?,
            attempts: row.try_get("attempts")?,
        })
    }

    fn row_to_project(row: SqliteRow) -> Result<ProjectRecord> {
        let created_at: String = row.try_get("created_at")?;
        let last_accessed: String = row.try_get("last_accessed")?;
        let decode_ts = |s: &str| {
            parse_timestamp(s).ok_or_else(|| {
                sqlx::Error::Decode(format!("invalid timestamp `{s}`").into())
            })
        };
        Ok(ProjectRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            path: row.try_get("path")?,
            description: row.try_get("description")?,
            language: row.try_get("language")?,
            created_at: decode_ts(&created_at)?,
            last_accessed: decode_ts(&last_accessed)?,
            file_count: row.try_get("file_count")?,
            line_count: row.try_get("line_count")?,
        })
    }
}

fn column_names(columns: &[SqliteColumn]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

/// SQLite-level failures in user SQL are feedback, not internal errors.
fn sql_error(e: sqlx::Error) -> CodeMasterError {
    match e {
        sqlx::Error::Database(db) => CodeMasterError::Sql(db.message().to_string()),
        other => CodeMasterError::DatabaseError(other),
    }
}

/// Decode by the value's runtime storage class rather than the declared
/// column type, so expressions like `AVG(salary)` come back as REAL.
fn decode_cell(row: &SqliteRow, idx: usize) -> std::result::Result<Cell, sqlx::Error> {
    let type_name = {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(Cell::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };
    let cell = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Cell::Integer(row.try_get_unchecked::<i64, _>(idx)?),
        "REAL" | "NUMERIC" => Cell::Real(row.try_get_unchecked::<f64, _>(idx)?),
        "BLOB" => Cell::Blob(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
        _ => Cell::Text(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(cell)
}
