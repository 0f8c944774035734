use crate::config::ConfigStore;
use crate::db::{NewProject, ProjectRecord, SqlEngine};
use crate::error::{CodeMasterError, Result};
use crate::utils::sanitize_filename;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

const SKIPPED_DIRS: [&str; 6] = ["target", "node_modules", "__pycache__", "venv", "dist", "build"];

const LANGUAGES: [(&str, &str); 20] = [
    ("rs", "Rust"),
    ("py", "Python"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("go", "Go"),
    ("java", "Java"),
    ("kt", "Kotlin"),
    ("c", "C"),
    ("h", "C"),
    ("cpp", "C++"),
    ("hpp", "C++"),
    ("cs", "C#"),
    ("rb", "Ruby"),
    ("php", "PHP"),
    ("swift", "Swift"),
    ("sql", "SQL"),
    ("sh", "Shell"),
    ("html", "HTML"),
];

pub fn language_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectScan {
    /// Source files recognised by extension.
    pub file_count: usize,
    pub line_count: usize,
    pub total_bytes: u64,
    /// Files per language.
    pub languages: BTreeMap<String, usize>,
}

impl ProjectScan {
    /// Language with the most files; ties resolve alphabetically.
    pub fn dominant_language(&self) -> Option<&str> {
        self.languages
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(lang, _)| lang.as_str())
    }
}

/// Directories that never hold project sources: hidden ones and the
/// usual build and dependency folders.
fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

/// Walk `root`, skipping hidden and build directories, and count source
/// files and their lines.
pub fn scan_directory(root: &Path) -> Result<ProjectScan> {
    let mut scan = ProjectScan::default();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));
    for entry in walker {
        let entry = entry.map_err(|e| CodeMasterError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(lang) = language_for(entry.path()) else {
            continue;
        };
        scan.file_count += 1;
        scan.total_bytes += entry
            .metadata()
            .map_err(|e| CodeMasterError::Io(e.into()))?
            .len();
        scan.line_count += count_lines(entry.path())?;
        *scan.languages.entry(lang.to_string()).or_default() += 1;
    }
    debug!(root = %root.display(), files = scan.file_count, "project scanned");
    Ok(scan)
}

fn count_lines(path: &Path) -> Result<usize> {
    let reader = BufReader::new(fs::File::open(path)?);
    // Non-UTF-8 content still counts by newline.
    Ok(reader.split(b'\n').count())
}

/// Registered projects, stored in the `projects` table.
pub struct ProjectService {
    engine: SqlEngine,
}

impl ProjectService {
    pub fn new(engine: SqlEngine) -> Self {
        Self { engine }
    }

    /// Scan `path` and insert or refresh its project row. The name
    /// defaults to the directory name.
    pub async fn add(
        &self,
        path: &Path,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<(ProjectRecord, ProjectScan)> {
        let root: PathBuf = tokio::fs::canonicalize(path).await?;
        if !tokio::fs::metadata(&root).await?.is_dir() {
            return Err(CodeMasterError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("{} is not a directory", root.display()),
            )));
        }
        let name = name.unwrap_or_else(|| {
            root.file_name()
                .map(|n| sanitize_filename(&n.to_string_lossy()))
                .unwrap_or_else(|| sanitize_filename(&root.display().to_string()))
        });

        let scan_root = root.clone();
        let scan = tokio::task::spawn_blocking(move || scan_directory(&scan_root))
            .await
            .map_err(|e| CodeMasterError::Io(std::io::Error::other(e)))??;

        self.engine
            .upsert_project(NewProject {
                name: name.clone(),
                path: root.display().to_string(),
                description,
                language: scan.dominant_language().map(str::to_string),
                file_count: scan.file_count as i64,
                line_count: scan.line_count as i64,
            })
            .await?;
        info!(name = %name, files = scan.file_count, lines = scan.line_count, "project registered");
        let record = self.engine.get_project(&name).await?;
        Ok((record, scan))
    }

    pub async fn list(&self) -> Result<Vec<ProjectRecord>> {
        self.engine.list_projects().await
    }

    /// Touch `last_accessed` and move the project to the front of the
    /// recent list.
    pub async fn open(&self, name: &str, store: &mut ConfigStore) -> Result<ProjectRecord> {
        self.engine.touch_project(name).await?;
        let record = self.engine.get_project(name).await?;
        store.add_recent_project(&record.path)?;
        Ok(record)
    }
}
