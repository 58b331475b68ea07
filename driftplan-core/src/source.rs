//! SQL source discovery: single files, several files, or directory trees.

use std::path::{Path, PathBuf};

use crate::error::{DriftplanError, Result, Side};

/// One unit of SQL text handed to the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlSource {
    /// Where the text came from, used in warnings.
    pub label: String,
    pub sql: String,
}

impl SqlSource {
    pub fn new(label: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sql: sql.into(),
        }
    }

    /// Read a file, dropping a UTF-8 byte order mark.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let content = content.strip_prefix('\u{FEFF}').unwrap_or(&content);
        Ok(Self::new(path.display().to_string(), content))
    }
}

/// Every `*.sql` file under `dir`, recursively, in path order.
///
/// Subdirectory names carry no meaning; `tables/` and `views/` are read the
/// same way.
pub fn discover_sql_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
        })
        .collect();
    files.sort();
    files
}

/// Load the sources for one side of a comparison.
///
/// Paths may mix files and directories; each file becomes its own source and
/// order follows the arguments, then path order within a directory.
pub fn load_sources(paths: &[PathBuf], side: Side) -> Result<Vec<SqlSource>> {
    let mut sources = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(DriftplanError::SourceNotFound {
                side,
                path: path.display().to_string(),
            });
        }
        if path.is_dir() {
            let files = discover_sql_files(path);
            if files.is_empty() {
                return Err(DriftplanError::NoSqlFiles {
                    side,
                    path: path.display().to_string(),
                });
            }
            log::debug!(
                "Discovered SQL files; side={}, dir={}, count={}",
                side,
                path.display(),
                files.len()
            );
            for file in files {
                sources.push(SqlSource::read(&file)?);
            }
        } else {
            sources.push(SqlSource::read(path)?);
        }
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_discovery_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("views")).unwrap();
        std::fs::create_dir_all(dir.path().join("tables")).unwrap();
        std::fs::write(dir.path().join("views/v.sql"), "CREATE VIEW v AS SELECT 1").unwrap();
        std::fs::write(dir.path().join("tables/b.SQL"), "CREATE TABLE b (id int);").unwrap();
        std::fs::write(dir.path().join("tables/a.sql"), "CREATE TABLE a (id int);").unwrap();
        std::fs::write(dir.path().join("README.md"), "not sql").unwrap();

        let files = discover_sql_files(dir.path());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["tables/a.sql", "tables/b.SQL", "views/v.sql"]);
    }

    #[test]
    fn test_missing_path_names_the_side() {
        let err = load_sources(&[PathBuf::from("/definitely/not/here.sql")], Side::Target)
            .unwrap_err();
        assert!(matches!(err, DriftplanError::SourceNotFound { side: Side::Target, .. }));
        assert!(err.to_string().starts_with("target path"));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_sources(&[dir.path().to_path_buf()], Side::Source).unwrap_err();
        assert!(matches!(err, DriftplanError::NoSqlFiles { .. }));
    }

    #[test]
    fn test_bom_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("schema.sql");
        std::fs::write(&file, "\u{FEFF}CREATE TABLE t (a int);").unwrap();
        let sources = load_sources(&[file], Side::Source).unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].sql.starts_with("CREATE"));
    }
}
