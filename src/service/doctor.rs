use crate::config::{ApiKeys, DataDir};
use crate::db::{SAMPLE_TABLES, SqlEngine};
use crate::service::git::GitRepo;
use crate::utils::validate_api_key;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckStatus::Ok => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl Check {
    fn new(name: impl Into<String>, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<Check>,
}

impl DoctorReport {
    pub fn healthy(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }
}

/// Inspect the local environment. Missing keys only warn: every feature
/// has an offline mode.
pub async fn run(data_dir: &DataDir, keys: &ApiKeys) -> DoctorReport {
    let mut checks = Vec::new();

    checks.push(match data_dir.ensure().and_then(|()| probe_write(data_dir)) {
        Ok(()) => Check::new(
            "data directory",
            CheckStatus::Ok,
            data_dir.root().display().to_string(),
        ),
        Err(e) => Check::new("data directory", CheckStatus::Fail, e.to_string()),
    });

    checks.push(check_database(data_dir).await);

    for (service, env, value) in keys.entries() {
        let name = format!("{service} key");
        checks.push(match value {
            None => Check::new(name, CheckStatus::Warn, format!("{env} not set")),
            Some(key) if validate_api_key(key, service) => {
                Check::new(name, CheckStatus::Ok, format!("{env} looks valid"))
            }
            Some(_) => Check::new(name, CheckStatus::Warn, format!("{env} looks malformed")),
        });
    }

    checks.push(match GitRepo::version().await {
        Some(version) => Check::new("git", CheckStatus::Ok, version),
        None => Check::new("git", CheckStatus::Warn, "git executable not found"),
    });

    DoctorReport { checks }
}

fn probe_write(data_dir: &DataDir) -> crate::error::Result<()> {
    let probe = data_dir.root().join(".doctor_probe");
    std::fs::write(&probe, b"ok")?;
    std::fs::remove_file(&probe)?;
    Ok(())
}

async fn check_database(data_dir: &DataDir) -> Check {
    let engine = match SqlEngine::open(&data_dir.database_path()).await {
        Ok(engine) => engine,
        Err(e) => return Check::new("database", CheckStatus::Fail, e.to_string()),
    };
    let check = match engine.available_tables().await {
        Ok(tables) => {
            let missing: Vec<_> = SAMPLE_TABLES
                .iter()
                .filter(|t| !tables.iter().any(|have| have.as_str() == **t))
                .collect();
            if missing.is_empty() {
                Check::new(
                    "database",
                    CheckStatus::Ok,
                    format!("{} tables", tables.len()),
                )
            } else {
                Check::new(
                    "database",
                    CheckStatus::Fail,
                    format!("missing sample tables: {missing:?}"),
                )
            }
        }
        Err(e) => Check::new("database", CheckStatus::Fail, e.to_string()),
    };
    engine.close().await;
    check
}
