//! Command implementations: compare (files against files) and compare-livedb
//! (live database against files).

pub mod compare;
pub mod compare_live;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DriftplanConfig;
use crate::diff::{diff_with, DiffOptions, Plan};
use crate::dialect::Dialect;
use crate::filter::filter;
use crate::model::{ModelWarning, ObjectKind, SchemaModel};

/// Report produced by both compare commands.
#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub dialect: Dialect,
    /// What the source side was read from.
    pub source: String,
    /// What the target side was read from.
    pub target: String,
    /// Kinds the comparison was restricted to (empty means all).
    pub object_types: Vec<ObjectKind>,
    /// Objects compared on each side, after filtering.
    pub source_objects: usize,
    pub target_objects: usize,
    /// Ordered operations turning source into target.
    pub plan: Plan,
    pub has_changes: bool,
    /// Duplicates, unsplittable statements, unreadable catalog entries and
    /// introspection gaps, source side first.
    pub warnings: Vec<ModelWarning>,
    /// Kinds the live source could not see (compare-livedb only).
    pub omitted_kinds: Vec<ObjectKind>,
    pub generated_at: DateTime<Utc>,
}

/// Filter both models, diff them and assemble the report.
pub(crate) fn build_report(
    config: &DriftplanConfig,
    dialect: Dialect,
    (source_label, source): (String, SchemaModel),
    (target_label, target): (String, SchemaModel),
    extra_warnings: Vec<ModelWarning>,
    omitted_kinds: Vec<ObjectKind>,
) -> CompareReport {
    let kinds = &config.compare.object_types;
    let source = filter(&source, kinds);
    let target = filter(&target, kinds);
    let options = DiffOptions {
        detect_renames: config.compare.detect_renames,
    };
    let plan = diff_with(&source, &target, &options);

    let mut warnings: Vec<ModelWarning> = source.warnings().to_vec();
    warnings.extend(target.warnings().iter().cloned());
    warnings.extend(extra_warnings);

    CompareReport {
        dialect,
        source: source_label,
        target: target_label,
        object_types: kinds.clone(),
        source_objects: source.len(),
        target_objects: target.len(),
        has_changes: !plan.is_empty(),
        plan,
        warnings,
        omitted_kinds,
        generated_at: Utc::now(),
    }
}

/// Display label for a list of paths.
pub(crate) fn paths_label(paths: &[std::path::PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
