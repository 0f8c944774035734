//! The SQL tutorial: a bundled lesson catalog and the validate, execute,
//! give-feedback loop over the seeded sample database.

use crate::db::{Cell, LessonProgress, MAX_RESULT_ROWS, QueryResult, SqlEngine};
use crate::error::{CodeMasterError, Result};
use crate::utils::format_duration;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tabled::builder::Builder;
use tabled::settings::Style;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Statements learners may not run.
pub const FORBIDDEN_KEYWORDS: [&str; 7] = [
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE",
];
pub const DISPLAY_ROW_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonExample {
    pub query: &'static str,
    pub explanation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lesson {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub difficulty: Difficulty,
    pub examples: &'static [LessonExample],
}

pub static LESSONS: [Lesson; 5] = [
    Lesson {
        id: "basic_select",
        title: "Basic SELECT Statements",
        description: "Learn how to query data from tables",
        difficulty: Difficulty::Beginner,
        examples: &[
            LessonExample {
                query: "SELECT * FROM employees;",
                explanation: "Select all columns from the employees table",
            },
            LessonExample {
                query: "SELECT first_name, last_name FROM employees;",
                explanation: "Select specific columns",
            },
            LessonExample {
                query: "SELECT * FROM employees WHERE department = 'Engineering';",
                explanation: "Filter rows with a WHERE clause",
            },
        ],
    },
    Lesson {
        id: "filtering_sorting",
        title: "Filtering and Sorting Data",
        description: "Use WHERE, ORDER BY and LIMIT clauses",
        difficulty: Difficulty::Beginner,
        examples: &[
            LessonExample {
                query: "SELECT * FROM employees WHERE salary > 80000;",
                explanation: "Filter by a numeric condition",
            },
            LessonExample {
                query: "SELECT * FROM employees ORDER BY salary DESC;",
                explanation: "Sort by salary in descending order",
            },
            LessonExample {
                query: "SELECT * FROM employees ORDER BY hire_date LIMIT 5;",
                explanation: "Get the 5 earliest hired employees",
            },
        ],
    },
    Lesson {
        id: "joins",
        title: "JOIN Operations",
        description: "Combine data from multiple tables",
        difficulty: Difficulty::Intermediate,
        examples: &[
            LessonExample {
                query: "SELECT e.first_name, e.last_name, s.product_name, s.sale_amount\n\
                        FROM employees e\n\
                        JOIN sales s ON e.employee_id = s.employee_id;",
                explanation: "Inner join to get employee sales data",
            },
            LessonExample {
                query: "SELECT e.first_name, e.last_name, m.first_name AS manager_name\n\
                        FROM employees e\n\
                        LEFT JOIN employees m ON e.manager_id = m.employee_id;",
                explanation: "Self-join to get employee and manager names",
            },
        ],
    },
    Lesson {
        id: "aggregation",
        title: "Aggregate Functions",
        description: "Use COUNT, SUM, AVG, MIN and MAX",
        difficulty: Difficulty::Intermediate,
        examples: &[
            LessonExample {
                query: "SELECT COUNT(*) AS total_employees FROM employees;",
                explanation: "Count the employees",
            },
            LessonExample {
                query: "SELECT department, AVG(salary) AS avg_salary FROM employees GROUP BY department;",
                explanation: "Average salary by department",
            },
            LessonExample {
                query: "SELECT SUM(sale_amount) AS total_sales FROM sales;",
                explanation: "Total sales amount",
            },
        ],
    },
    Lesson {
        id: "advanced",
        title: "Advanced Queries",
        description: "Subqueries, window functions and complex operations",
        difficulty: Difficulty::Advanced,
        examples: &[
            LessonExample {
                query: "SELECT * FROM employees\n\
                        WHERE salary > (SELECT AVG(salary) FROM employees);",
                explanation: "Employees with above-average salary using a subquery",
            },
            LessonExample {
                query: "SELECT e.first_name, e.last_name, COUNT(s.sale_id) AS total_sales\n\
                        FROM employees e\n\
                        LEFT JOIN sales s ON e.employee_id = s.employee_id\n\
                        GROUP BY e.employee_id\n\
                        ORDER BY total_sales DESC;",
                explanation: "Employee sales performance ranking",
            },
            LessonExample {
                query: "SELECT first_name, department, salary,\n\
                        RANK() OVER (PARTITION BY department ORDER BY salary DESC) AS dept_rank\n\
                        FROM employees;",
                explanation: "Rank salaries within each department with a window function",
            },
        ],
    },
];

pub fn lessons() -> &'static [Lesson] {
    &LESSONS
}

pub fn lesson(id: &str) -> Result<&'static Lesson> {
    LESSONS
        .iter()
        .find(|l| l.id == id)
        .ok_or_else(|| CodeMasterError::UnknownLesson(id.to_string()))
}

/// Replace string literals, quoted identifiers and comments with spaces
/// so keyword checks only see SQL tokens.
fn mask_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                let quote = c;
                while let Some(n) = chars.next() {
                    if n == quote {
                        // Doubled quote is an escape.
                        if chars.peek() == Some(&quote) {
                            chars.next();
                            continue;
                        }
                        break;
                    }
                }
                out.push(' ');
            }
            '-' if chars.peek() == Some(&'-') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
                out.push('\n');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

fn tokens(masked: &str) -> impl Iterator<Item = String> + '_ {
    masked
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_uppercase)
}

/// Learning-mode gate: one read-only statement terminated by `;`.
pub fn validate_query(sql: &str) -> Result<()> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(CodeMasterError::QueryRejected("query is empty".to_string()));
    }
    let masked = mask_literals(trimmed);

    if let Some(kw) = tokens(&masked).find(|t| FORBIDDEN_KEYWORDS.contains(&t.as_str())) {
        return Err(CodeMasterError::QueryRejected(format!(
            "query contains forbidden keyword: {kw}"
        )));
    }
    match tokens(&masked).next().as_deref() {
        Some("SELECT" | "WITH") => {}
        _ => {
            return Err(CodeMasterError::QueryRejected(
                "only SELECT queries are allowed in learning mode".to_string(),
            ));
        }
    }
    let body = masked.trim_end();
    let Some(body) = body.strip_suffix(';') else {
        return Err(CodeMasterError::QueryRejected(
            "query should end with a semicolon (;)".to_string(),
        ));
    };
    if body.contains(';') {
        return Err(CodeMasterError::QueryRejected(
            "run one statement at a time".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub row_count: usize,
    pub column_count: usize,
    pub numeric_columns: Vec<ColumnStats>,
    pub date_columns: Vec<String>,
    pub suggestions: Vec<String>,
    /// Only the first [`MAX_RESULT_ROWS`] rows were kept.
    pub truncated: bool,
}

impl Feedback {
    pub fn analyze(result: &QueryResult) -> Self {
        let numeric_columns = result
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| numeric_stats(result, idx, name))
            .collect();
        let date_columns = result
            .columns
            .iter()
            .filter(|c| {
                let lower = c.to_lowercase();
                lower.contains("date") || lower.contains("time")
            })
            .cloned()
            .collect();

        let mut suggestions = Vec::new();
        if result.truncated {
            suggestions.push(format!(
                "Only the first {MAX_RESULT_ROWS} rows were kept; add LIMIT or a WHERE clause"
            ));
        }
        if result.rows.len() > 1 {
            suggestions.push("Add a WHERE clause to filter specific rows".to_string());
            suggestions.push("Use ORDER BY to sort the results".to_string());
            suggestions.push("Try GROUP BY to aggregate the data".to_string());
        } else if result.is_empty() {
            suggestions.push("No rows matched; loosen the WHERE conditions".to_string());
        }

        Feedback {
            row_count: result.rows.len(),
            column_count: result.columns.len(),
            numeric_columns,
            date_columns,
            suggestions,
            truncated: result.truncated,
        }
    }
}

/// Stats for a column whose non-NULL values are all numeric.
fn numeric_stats(result: &QueryResult, idx: usize, name: &str) -> Option<ColumnStats> {
    let mut values = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        match row.get(idx) {
            Some(Cell::Null) | None => {}
            Some(cell) => values.push(cell.as_f64()?),
        }
    }
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Some(ColumnStats {
        column: name.to_string(),
        min,
        max,
        avg: (avg * 100.0).round() / 100.0,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Success {
        result: QueryResult,
        feedback: Feedback,
    },
    Rejected {
        reason: String,
    },
    SqlError {
        message: String,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExampleRun {
    pub lesson_id: &'static str,
    pub example: LessonExample,
    pub outcome: RunOutcome,
    pub progress: LessonProgress,
}

/// Executes learner queries against the sample database.
pub struct SqlTutor {
    engine: SqlEngine,
}

impl SqlTutor {
    pub fn new(engine: SqlEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &SqlEngine {
        &self.engine
    }

    /// Validate and run one query. Rejections and SQLite errors are part of
    /// the outcome; only infrastructure failures are returned as `Err`.
    pub async fn run(&self, sql: &str) -> Result<RunOutcome> {
        if let Err(e) = validate_query(sql) {
            let reason = match e {
                CodeMasterError::QueryRejected(reason) => reason,
                other => other.to_string(),
            };
            debug!(%reason, "query rejected");
            return Ok(RunOutcome::Rejected { reason });
        }
        self.execute(sql).await
    }

    async fn execute(&self, sql: &str) -> Result<RunOutcome> {
        match self.engine.execute_query(sql).await {
            Ok(result) => {
                let feedback = Feedback::analyze(&result);
                info!(rows = feedback.row_count, columns = feedback.column_count, "query executed");
                Ok(RunOutcome::Success { result, feedback })
            }
            Err(CodeMasterError::Sql(message)) => Ok(RunOutcome::SqlError { message }),
            Err(e) => Err(e),
        }
    }

    /// Run example `number` (1-based) of a lesson and record the attempt.
    pub async fn run_lesson_example(&self, lesson_id: &str, number: usize) -> Result<ExampleRun> {
        let lesson = lesson(lesson_id)?;
        let example = number
            .checked_sub(1)
            .and_then(|i| lesson.examples.get(i))
            .ok_or_else(|| CodeMasterError::UnknownExample {
                lesson: lesson_id.to_string(),
                index: number,
            })?;
        let outcome = self.execute(example.query).await?;
        let completed = outcome.is_success();
        let progress = self
            .engine
            .record_attempt(lesson.id, lesson.title, completed, if completed { 100 } else { 0 })
            .await?;
        Ok(ExampleRun {
            lesson_id: lesson.id,
            example: example.clone(),
            outcome,
            progress,
        })
    }

    pub async fn progress(&self) -> Result<Vec<LessonProgress>> {
        self.engine.progress().await
    }

    /// Read `;`-terminated statements from `input` until EOF or `.quit`.
    /// Returns the number of statements run.
    pub async fn shell<R, W>(&self, input: R, mut output: W) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut buffer = String::new();
        let mut executed = 0;
        let started = Instant::now();

        output
            .write_all(b"SQL tutor shell. End statements with ';'. Type .help for commands.\n")
            .await?;
        loop {
            let prompt: &[u8] = if buffer.is_empty() { b"sql> " } else { b"...> " };
            output.write_all(prompt).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let trimmed = line.trim();
            if buffer.is_empty() && trimmed.starts_with('.') {
                let reply = match self.dot_command(trimmed).await? {
                    Some(reply) => reply,
                    None => break,
                };
                output.write_all(reply.as_bytes()).await?;
                continue;
            }

            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(&line);
            if !buffer.trim_end().ends_with(';') {
                continue;
            }

            let outcome = self.run(&buffer).await?;
            executed += 1;
            output.write_all(render_outcome(&outcome).as_bytes()).await?;
            buffer.clear();
        }
        output.write_all(b"\n").await?;
        if !buffer.trim().is_empty() {
            output
                .write_all(b"statement not terminated by ';' was discarded\n")
                .await?;
        }
        let summary = format!(
            "{executed} statement(s) run in {}\n",
            format_duration(started.elapsed().as_secs_f64())
        );
        output.write_all(summary.as_bytes()).await?;
        output.flush().await?;
        Ok(executed)
    }

    /// `None` ends the session.
    async fn dot_command(&self, cmd: &str) -> Result<Option<String>> {
        let mut parts = cmd.split_whitespace();
        let reply = match parts.next().unwrap_or_default() {
            ".quit" | ".exit" => return Ok(None),
            ".tables" => self.engine.available_tables().await?.join("\n") + "\n",
            ".schema" => match parts.next() {
                Some(table) => match self.engine.table_schema(table).await {
                    Ok(cols) => {
                        let mut b = Builder::default();
                        b.push_record(["Column", "Type", "Not null", "Primary key"]);
                        for c in cols {
                            b.push_record([
                                c.column,
                                c.data_type,
                                c.not_null.to_string(),
                                c.primary_key.to_string(),
                            ]);
                        }
                        b.build().with(Style::psql()).to_string() + "\n"
                    }
                    Err(e) => format!("{e}\n"),
                },
                None => "usage: .schema <table>\n".to_string(),
            },
            ".lessons" => LESSONS
                .iter()
                .map(|l| format!("{:<18} {} ({})\n", l.id, l.title, l.difficulty))
                .collect(),
            _ => ".tables            list tables\n\
                  .schema <table>    show a table's columns\n\
                  .lessons           list lessons\n\
                  .quit              leave the shell\n"
                .to_string(),
        };
        Ok(Some(reply))
    }
}

/// Render a query result as a text table, capped at [`DISPLAY_ROW_LIMIT`]
/// rows.
pub fn render_result(result: &QueryResult) -> String {
    let mut b = Builder::default();
    b.push_record(result.columns.iter().cloned());
    for row in result.rows.iter().take(DISPLAY_ROW_LIMIT) {
        b.push_record(row.iter().map(Cell::to_string));
    }
    let mut out = b.build().with(Style::psql()).to_string();
    out.push('\n');
    if result.rows.len() > DISPLAY_ROW_LIMIT {
        out.push_str(&format!(
            "... and {} more rows\n",
            result.rows.len() - DISPLAY_ROW_LIMIT
        ));
    }
    out
}

pub fn render_feedback(feedback: &Feedback) -> String {
    let mut out = format!(
        "{} row(s){}, {} column(s)\n",
        feedback.row_count,
        if feedback.truncated { " (truncated)" } else { "" },
        feedback.column_count
    );
    for s in &feedback.numeric_columns {
        out.push_str(&format!(
            "  {}: min {} max {} avg {}\n",
            s.column, s.min, s.max, s.avg
        ));
    }
    if !feedback.date_columns.is_empty() {
        out.push_str(&format!(
            "  date columns: {} (try ORDER BY for time-based analysis)\n",
            feedback.date_columns.join(", ")
        ));
    }
    for s in &feedback.suggestions {
        out.push_str(&format!("  hint: {s}\n"));
    }
    out
}

pub fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Success { result, feedback } => {
            render_result(result) + &render_feedback(feedback)
        }
        RunOutcome::Rejected { reason } => format!("rejected: {reason}\n"),
        RunOutcome::SqlError { message } => format!("SQL error: {message}\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_select() {
        assert!(validate_query("SELECT * FROM employees;").is_ok());
        assert!(validate_query("  select 1 ;  ").is_ok());
        assert!(validate_query("WITH t AS (SELECT 1 AS x) SELECT x FROM t;").is_ok());
    }

    #[test]
    fn rejects_forbidden_keywords() {
        for sql in [
            "DROP TABLE employees;",
            "SELECT * FROM employees; DELETE FROM employees;",
            "WITH x AS (DELETE FROM sales) SELECT 1;",
        ] {
            assert!(
                matches!(validate_query(sql), Err(CodeMasterError::QueryRejected(_))),
                "{sql}"
            );
        }
    }

    #[test]
    fn keywords_are_matched_as_tokens() {
        // Identifiers and literals that merely contain a keyword are fine.
        assert!(validate_query("SELECT last_updated FROM t;").is_ok());
        assert!(validate_query("SELECT 'drop me' AS note;").is_ok());
        assert!(validate_query("SELECT 1 -- delete later\n;").is_ok());
    }

    #[test]
    fn requires_select_and_semicolon() {
        let reason = |sql| match validate_query(sql) {
            Err(CodeMasterError::QueryRejected(r)) => r,
            other => panic!("expected rejection, got {other:?}"),
        };
        assert!(reason("PRAGMA table_info(employees);").contains("only SELECT"));
        assert!(reason("SELECT * FROM employees").contains("semicolon"));
        assert!(reason("SELECT 1; SELECT 2;").contains("one statement"));
        assert!(reason("   ").contains("empty"));
    }

    #[test]
    fn feedback_reports_numeric_stats() {
        let result = QueryResult {
            columns: vec!["name".into(), "salary".into(), "hire_date".into()],
            rows: vec![
                vec![Cell::Text("a".into()), Cell::Real(100.0), Cell::Text("2020-01-01".into())],
                vec![Cell::Text("b".into()), Cell::Integer(50), Cell::Null],
                vec![Cell::Text("c".into()), Cell::Null, Cell::Null],
            ],
            ..Default::default()
        };
        let fb = Feedback::analyze(&result);
        assert_eq!(fb.row_count, 3);
        assert_eq!(fb.column_count, 3);
        assert_eq!(
            fb.numeric_columns,
            vec![ColumnStats {
                column: "salary".into(),
                min: 50.0,
                max: 100.0,
                avg: 75.0,
            }]
        );
        assert_eq!(fb.date_columns, vec!["hire_date".to_string()]);
        assert_eq!(fb.suggestions.len(), 3);
        assert!(!fb.truncated);
    }

    #[test]
    fn truncated_results_are_flagged_in_feedback() {
        let result = QueryResult {
            columns: vec!["x".into()],
            rows: vec![vec![Cell::Integer(1)], vec![Cell::Integer(2)]],
            truncated: true,
        };
        let fb = Feedback::analyze(&result);
        assert!(fb.truncated);
        assert!(fb.suggestions[0].contains("LIMIT"));
        assert!(render_feedback(&fb).starts_with("2 row(s) (truncated), 1 column(s)"));
    }

    #[test]
    fn lesson_catalog_examples_pass_validation() {
        assert_eq!(lessons().len(), 5);
        for l in lessons() {
            for ex in l.examples {
                assert!(validate_query(ex.query).is_ok(), "{}", ex.query);
            }
        }
        assert!(matches!(lesson("nope"), Err(CodeMasterError::UnknownLesson(_))));
    }

    #[test]
    fn render_caps_rows() {
        let result = QueryResult {
            columns: vec!["n".into()],
            rows: (0..105).map(|i| vec![Cell::Integer(i)]).collect(),
            ..Default::default()
        };
        let text = render_result(&result);
        assert!(text.ends_with("... and 5 more rows\n"));
    }
}
