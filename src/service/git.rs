use crate::error::{CodeMasterError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// One line of `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Staged state (`M`, `A`, `D`, `R`, `?`, ` ` ...).
    pub index: char,
    /// Working tree state.
    pub worktree: char,
    pub path: String,
    /// Source path of a rename or copy.
    pub orig_path: Option<String>,
}

impl StatusEntry {
    pub fn describe(&self) -> &'static str {
        match (self.index, self.worktree) {
            ('?', '?') => "untracked",
            ('!', '!') => "ignored",
            ('U', _) | (_, 'U') | ('A', 'A') | ('D', 'D') => "conflict",
            ('R', _) => "renamed",
            ('C', _) => "copied",
            ('A', _) => "added",
            ('D', _) | (_, 'D') => "deleted",
            ('M', _) | (_, 'M') | ('T', _) | (_, 'T') => "modified",
            _ => "changed",
        }
    }

    pub fn is_staged(&self) -> bool {
        !matches!(self.index, ' ' | '?' | '!')
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitStatus {
    pub branch: Option<String>,
    pub entries: Vec<StatusEntry>,
}

impl GitStatus {
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub name: String,
    pub current: bool,
}

/// Thin wrapper running `git -C <root> ...`.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `git --version`, or `None` when git is not installed.
    pub async fn version() -> Option<String> {
        let output = Command::new("git").arg("--version").output().await.ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!(repo = %self.root.display(), ?args, "running git");
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .await?;
        if !output.status.success() {
            return Err(CodeMasterError::Git {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub async fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .await
            .is_ok_and(|out| out.trim() == "true")
    }

    async fn require_repository(&self) -> Result<()> {
        if self.is_repository().await {
            Ok(())
        } else {
            Err(CodeMasterError::NotARepository(
                self.root.display().to_string(),
            ))
        }
    }

    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        self.run(&["init"]).await?;
        Ok(())
    }

    pub async fn status(&self) -> Result<GitStatus> {
        self.require_repository().await?;
        let out = self.run(&["status", "--porcelain=v1", "--branch"]).await?;
        Ok(parse_status(&out))
    }

    pub async fn log(&self, limit: usize) -> Result<Vec<CommitSummary>> {
        self.require_repository().await?;
        let limit = format!("-n{limit}");
        let out = match self
            .run(&["log", &limit, "--date=short", "--format=%H%x1f%an%x1f%ad%x1f%s"])
            .await
        {
            Ok(out) => out,
            // A fresh repository has no HEAD yet.
            Err(CodeMasterError::Git { stderr, .. }) if stderr.contains("does not have any commits") => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        Ok(parse_log(&out))
    }

    pub async fn diff(&self, staged: bool) -> Result<String> {
        self.require_repository().await?;
        if staged {
            self.run(&["diff", "--cached"]).await
        } else {
            self.run(&["diff"]).await
        }
    }

    pub async fn branches(&self) -> Result<Vec<Branch>> {
        self.require_repository().await?;
        let out = self.run(&["branch", "--list"]).await?;
        Ok(parse_branches(&out))
    }

    pub async fn add(&self, paths: &[&str]) -> Result<()> {
        let mut args = vec!["add", "--"];
        if paths.is_empty() {
            args.push(".");
        } else {
            args.extend_from_slice(paths);
        }
        self.run(&args).await?;
        Ok(())
    }

    /// Returns the new commit's hash.
    pub async fn commit(&self, message: &str) -> Result<String> {
        self.run(&["commit", "-m", message]).await?;
        Ok(self.run(&["rev-parse", "HEAD"]).await?.trim().to_string())
    }
}

pub fn parse_status(out: &str) -> GitStatus {
    let mut status = GitStatus::default();
    for line in out.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            status.branch = parse_branch_header(header);
            continue;
        }
        let mut chars = line.chars();
        let (Some(index), Some(worktree)) = (chars.next(), chars.next()) else {
            continue;
        };
        let rest = chars.as_str().trim_start();
        if rest.is_empty() {
            continue;
        }
        let (path, orig_path) = match rest.split_once(" -> ") {
            Some((from, to)) => (unquote(to), Some(unquote(from))),
            None => (unquote(rest), None),
        };
        status.entries.push(StatusEntry {
            index,
            worktree,
            path,
            orig_path,
        });
    }
    status
}

fn parse_branch_header(header: &str) -> Option<String> {
    let name = header
        .strip_prefix("No commits yet on ")
        .or_else(|| header.strip_prefix("Initial commit on "))
        .unwrap_or(header);
    let name = name.split("...").next().unwrap_or(name);
    let name = name.split(" [").next().unwrap_or(name).trim();
    (!name.is_empty() && !name.starts_with("HEAD (no branch)")).then(|| name.to_string())
}

fn unquote(path: &str) -> String {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
        .to_string()
}

pub fn parse_log(out: &str) -> Vec<CommitSummary> {
    out.lines()
        .filter_map(|line| {
            let mut parts = line.split('\x1f');
            Some(CommitSummary {
                hash: parts.next()?.to_string(),
                author: parts.next()?.to_string(),
                date: parts.next()?.to_string(),
                subject: parts.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

pub fn parse_branches(out: &str) -> Vec<Branch> {
    out.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let current = line.starts_with('*');
            Branch {
                name: line[2.min(line.len())..].trim().to_string(),
                current,
            }
        })
        .collect()
}
