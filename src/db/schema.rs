//! SQL DDL for initializing the local database.
//! Statements are separated by `;` and executed one at a time.

/// Application tables plus the sample schema used by the SQL tutor.
/// - `tutorial_progress.lesson_id` is UNIQUE so attempts upsert per lesson
/// - `weather_cache.cache_key` is UNIQUE; `weather_data` holds JSON text
/// - `employees.department` joins to `departments.dept_name` by name
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    path TEXT NOT NULL,
    description TEXT,
    language TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    last_accessed TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    file_count INTEGER NOT NULL DEFAULT 0,
    line_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tutorial_progress (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lesson_id TEXT NOT NULL UNIQUE,
    lesson_title TEXT NOT NULL,
    completed BOOLEAN NOT NULL DEFAULT 0,
    completed_at TEXT NULL,
    score INTEGER NOT NULL DEFAULT 0,
    attempts INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS departments (
    dept_id INTEGER PRIMARY KEY,
    dept_name TEXT NOT NULL UNIQUE,
    location TEXT,
    budget REAL
);

CREATE TABLE IF NOT EXISTS employees (
    employee_id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    department TEXT,
    salary REAL,
    hire_date DATE,
    manager_id INTEGER,
    FOREIGN KEY (manager_id) REFERENCES employees(employee_id)
);

CREATE TABLE IF NOT EXISTS sales (
    sale_id INTEGER PRIMARY KEY,
    employee_id INTEGER,
    product_name TEXT NOT NULL,
    sale_amount REAL NOT NULL,
    sale_date DATE NOT NULL,
    customer_name TEXT,
    FOREIGN KEY (employee_id) REFERENCES employees(employee_id)
);

CREATE TABLE IF NOT EXISTS weather_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cache_key TEXT NOT NULL UNIQUE,
    weather_data TEXT NOT NULL,
    cached_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_employees_department ON employees(department);
CREATE INDEX IF NOT EXISTS idx_sales_employee ON sales(employee_id)
"#;

/// Tables the SQL tutor exposes to learners.
pub const SAMPLE_TABLES: [&str; 3] = ["employees", "departments", "sales"];
