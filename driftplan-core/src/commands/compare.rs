//! Compare two sets of SQL files.

use std::path::PathBuf;

use crate::config::DriftplanConfig;
use crate::error::{Result, Side};
use crate::normalize::normalize_with;
use crate::source::load_sources;

use super::{build_report, paths_label, CompareReport};

/// Execute the compare command.
///
/// Each side may name files and directories; every `*.sql` file becomes an
/// independent source. Both sides are loaded before anything is parsed so a
/// bad path fails fast.
pub fn execute(config: &DriftplanConfig, source: &[PathBuf], target: &[PathBuf]) -> Result<CompareReport> {
    let dialect = config.dialect()?;
    let source_sql = load_sources(source, Side::Source)?;
    let target_sql = load_sources(target, Side::Target)?;
    log::info!(
        "Comparing schemas; dialect={}, source_files={}, target_files={}",
        dialect,
        source_sql.len(),
        target_sql.len()
    );

    let threshold = config.parser.parallel_threshold;
    let source_model = normalize_with(dialect, &source_sql, threshold);
    let target_model = normalize_with(dialect, &target_sql, threshold);

    Ok(build_report(
        config,
        dialect,
        (paths_label(source), source_model),
        (paths_label(target), target_model),
        Vec::new(),
        Vec::new(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Action;
    use crate::error::DriftplanError;
    use crate::model::ObjectKind;

    fn config(dialect: &str) -> DriftplanConfig {
        let mut config = DriftplanConfig::default();
        config.compare.dialect = Some(dialect.to_string());
        config
    }

    fn write(dir: &std::path::Path, name: &str, sql: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, sql).unwrap();
        path
    }

    #[test]
    fn test_compare_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.sql", "CREATE TABLE t (id int); CREATE VIEW v AS SELECT id FROM t;");
        let b = write(dir.path(), "b.sql", "CREATE TABLE t (id int, name text); CREATE TABLE u (id int);");
        let report = execute(&config("postgres"), &[a], &[b]).unwrap();
        assert!(report.has_changes);
        assert_eq!(
            report.plan.lines(),
            vec!["Drop View: v", "Alter Table: t", "Create Table: u"]
        );
        assert_eq!(report.source_objects, 2);
        assert_eq!(report.target_objects, 2);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_object_type_filter_applies_to_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.sql", "CREATE TABLE t (id int); CREATE VIEW v AS SELECT id FROM t;");
        let b = write(dir.path(), "b.sql", "CREATE TABLE t (id int);");
        let mut config = config("postgres");
        config.compare.object_types = vec![ObjectKind::Table];
        let report = execute(&config, &[a], &[b]).unwrap();
        assert!(!report.has_changes);
        assert_eq!(report.plan.to_string(), "No changes detected");
    }

    #[test]
    fn test_warnings_are_collected_from_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.sql", "CREATE TABLE t (id int); CREATE TABLE t (id int);");
        let b = write(dir.path(), "b.sql", "CREATE TABLE t (id int);\nCREATE VIEW x AS SELECT 'oops");
        let report = execute(&config("postgres"), &[a], &[b]).unwrap();
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].message.contains("duplicate"));
        assert_eq!(report.plan.count(Action::Create), 1);
    }

    #[test]
    fn test_report_serializes_plan_and_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.sql", "CREATE TABLE t (id int);");
        let b = write(dir.path(), "b.sql", "CREATE TABLE t (id bigint);");
        let report = execute(&config("postgres"), &[a], &[b]).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["dialect"], "postgres");
        assert_eq!(json["has_changes"], true);
        assert_eq!(json["plan"]["operations"][0]["action"], "alter");
        assert_eq!(json["plan"]["operations"][0]["name"]["name"], "t");
        assert!(json["warnings"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_missing_target_names_the_side() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.sql", "CREATE TABLE t (id int);");
        let err = execute(&config("postgres"), &[a], &[dir.path().join("missing.sql")]).unwrap_err();
        assert!(matches!(err, DriftplanError::SourceNotFound { side: Side::Target, .. }));
    }

    #[test]
    fn test_unknown_dialect_fails_before_reading() {
        let err = execute(&config("oracle"), &[], &[]).unwrap_err();
        assert!(matches!(err, DriftplanError::UnsupportedDialect { .. }));
    }
}
