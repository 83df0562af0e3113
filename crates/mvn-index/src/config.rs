//! Index configuration and repository root resolution.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Environment variable naming an explicit repository root.
pub const REPO_OVERRIDE_ENV: &str = "MVN_INDEX_REPO";

/// Repository location below the home directory when no override is given.
pub const DEFAULT_REPO_RELATIVE: &str = ".m2/repository";

/// Tunables for scanning, extraction and hierarchy resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Name of the index directory created inside the repository root.
    pub index_dir_name: String,
    /// An existing index directory is reused only when it holds more than
    /// this many non-hidden entries.
    pub min_index_entries: usize,
    /// File name suffixes the scanner never reports.
    pub skip_extensions: Vec<String>,
    /// Extensions the archive reader treats as non-archives without opening.
    pub non_archive_extensions: Vec<String>,
    /// Packagings that may extend a hierarchy.
    pub hierarchy_packagings: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir_name: ".index".to_string(),
            min_index_entries: 0,
            skip_extensions: vec![".lastUpdated".to_string()],
            non_archive_extensions: ["xml", "cfg", "yml", "tar.gz"]
                .into_iter()
                .map(String::from)
                .collect(),
            hierarchy_packagings: vec!["pom".to_string(), "bundle".to_string()],
        }
    }
}

impl IndexConfig {
    /// Rejects values that would make the index unusable.
    pub fn validate(&self) -> Result<()> {
        let name = self.index_dir_name.trim();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(IndexError::InvalidInput(format!(
                "index_dir_name must be a plain directory name, got '{}'",
                self.index_dir_name
            )));
        }
        if self.hierarchy_packagings.is_empty() {
            return Err(IndexError::InvalidInput(
                "hierarchy_packagings must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn index_dir(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.index_dir_name)
    }

    /// Lock file guarding the index against concurrent writers.
    pub fn lock_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(format!("{}.lock", self.index_dir_name))
    }

    pub(crate) fn is_skipped_name(&self, name: &str) -> bool {
        name.starts_with('.') || self.skip_extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}

/// Resolves the repository root from an override, the working directory and
/// the home directory, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    root: PathBuf,
}

impl RepoLocation {
    /// Resolves using `MVN_INDEX_REPO`, the process working directory and the
    /// user's home directory.
    pub fn from_env() -> Result<Self> {
        let override_path = env::var_os(REPO_OVERRIDE_ENV).map(PathBuf::from);
        let working_dir = env::current_dir().ok();
        let home = dirs::home_dir();
        Self::resolve(
            override_path.as_deref(),
            working_dir.as_deref(),
            home.as_deref(),
        )
    }

    pub fn resolve(
        override_path: Option<&Path>,
        working_dir: Option<&Path>,
        home: Option<&Path>,
    ) -> Result<Self> {
        if let Some(candidate) = override_path {
            if candidate.is_absolute() && candidate.is_dir() {
                return Ok(Self::at(candidate.to_path_buf()));
            }
            if let Some(working_dir) = working_dir {
                let relative = working_dir.join(candidate);
                if relative.is_dir() {
                    return Ok(Self::at(relative));
                }
            }
        }

        if let Some(home) = home {
            let default = home.join(DEFAULT_REPO_RELATIVE);
            if default.is_dir() {
                return Ok(Self::at(default));
            }
        }

        Err(IndexError::NotFound(format!(
            "unable to locate a repository: working dir = {}, home = {}, {REPO_OVERRIDE_ENV} = {}",
            display_opt(working_dir),
            display_opt(home),
            display_opt(override_path),
        )))
    }

    fn at(root: PathBuf) -> Self {
        log::debug!("resolved repository root {}", root.display());
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn into_path(self) -> PathBuf {
        self.root
    }
}

fn display_opt(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unset>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.index_dir_name, ".index");
        assert_eq!(config.min_index_entries, 0);
        assert!(config.is_skipped_name("thing.lastUpdated"));
        assert!(config.is_skipped_name(".DS_Store"));
        assert!(!config.is_skipped_name("foo-1.0.jar"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_nested_index_dir() {
        let config = IndexConfig {
            index_dir_name: "a/b".to_string(),
            ..IndexConfig::default()
        };
        assert!(matches!(config.validate(), Err(IndexError::InvalidInput(_))));
    }

    #[test]
    fn absolute_override_wins() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("custom");
        fs::create_dir_all(&repo).unwrap();
        fs::create_dir_all(temp.path().join("home/.m2/repository")).unwrap();

        let location = RepoLocation::resolve(
            Some(&repo),
            Some(temp.path()),
            Some(&temp.path().join("home")),
        )
        .unwrap();
        assert_eq!(location.root(), repo);
    }

    #[test]
    fn relative_override_uses_working_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("repo")).unwrap();

        let location =
            RepoLocation::resolve(Some(Path::new("repo")), Some(temp.path()), None).unwrap();
        assert_eq!(location.root(), temp.path().join("repo"));
    }

    #[test]
    fn falls_back_to_home_default() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        fs::create_dir_all(home.join(DEFAULT_REPO_RELATIVE)).unwrap();

        let location =
            RepoLocation::resolve(Some(Path::new("missing")), Some(temp.path()), Some(&home))
                .unwrap();
        assert_eq!(location.root(), home.join(DEFAULT_REPO_RELATIVE));
    }

    #[test]
    fn failure_names_every_source() {
        let temp = TempDir::new().unwrap();
        let error = RepoLocation::resolve(
            Some(Path::new("nope")),
            Some(temp.path()),
            Some(&temp.path().join("home")),
        )
        .unwrap_err();
        let message = error.to_string();
        assert!(matches!(error, IndexError::NotFound(_)));
        assert!(message.contains("working dir"));
        assert!(message.contains("home"));
        assert!(message.contains(REPO_OVERRIDE_ENV));
        assert!(message.contains("nope"));
    }
}
