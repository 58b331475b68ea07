//! Compare a live database (source) against SQL files (target).

use std::path::PathBuf;
use std::time::Duration;

use crate::config::DriftplanConfig;
use crate::db;
use crate::dialect::Dialect;
use crate::error::{DriftplanError, Result, Side};
use crate::introspect::{introspect, CatalogReader, IntrospectedSchema, PgCatalog, LIVE_SOURCE};
use crate::model::{ModelWarning, ObjectKind};
use crate::normalize::normalize_with;
use crate::source::load_sources;

use super::{build_report, paths_label, CompareReport};

/// Execute the compare-livedb command.
///
/// The target files are read first so a bad path is reported without opening
/// a connection. Connecting and reading the catalog share one deadline,
/// `database.introspect_timeout_secs` (0 disables it).
pub async fn execute(config: &DriftplanConfig, target: &[PathBuf]) -> Result<CompareReport> {
    let dialect = live_dialect(config)?;
    let target_sql = load_sources(target, Side::Target)?;
    let conn_string = config.connection_string()?;

    let live = with_deadline(config.database.introspect_timeout_secs, async {
        let client = db::connect(&conn_string, &config.database, Side::Source).await?;
        let database = db::get_current_database(&client).await?;
        log::info!(
            "Introspecting live database; database={}, schema={}",
            database,
            config.database.schema
        );
        let reader = PgCatalog::new(&client, config.database.schema.clone());
        introspect(&reader, dialect).await
    })
    .await?;

    let target_model = normalize_with(dialect, &target_sql, config.parser.parallel_threshold);
    Ok(finish(config, dialect, live, target_model, target))
}

/// Execute compare-livedb against an already-open catalog reader.
pub async fn execute_with_reader<R: CatalogReader>(
    config: &DriftplanConfig,
    reader: &R,
    target: &[PathBuf],
) -> Result<CompareReport> {
    let dialect = live_dialect(config)?;
    let target_sql = load_sources(target, Side::Target)?;
    let live = introspect(reader, dialect).await?;
    let target_model = normalize_with(dialect, &target_sql, config.parser.parallel_threshold);
    Ok(finish(config, dialect, live, target_model, target))
}

fn live_dialect(config: &DriftplanConfig) -> Result<Dialect> {
    let dialect = config.dialect()?;
    if dialect != Dialect::Postgres {
        return Err(DriftplanError::IntrospectionUnsupported {
            dialect: dialect.to_string(),
        });
    }
    Ok(dialect)
}

async fn with_deadline<F, T>(secs: u32, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    if secs == 0 {
        return fut.await;
    }
    match tokio::time::timeout(Duration::from_secs(secs as u64), fut).await {
        Ok(result) => result,
        Err(_) => Err(DriftplanError::ConnectionError {
            side: Side::Source,
            reason: format!("introspection timed out after {}s", secs),
        }),
    }
}

fn finish(
    config: &DriftplanConfig,
    dialect: Dialect,
    live: IntrospectedSchema,
    target_model: crate::model::SchemaModel,
    target: &[PathBuf],
) -> CompareReport {
    let kinds = &config.compare.object_types;
    let mut omitted = live.omitted_among(kinds);
    let mut extra = Vec::new();
    if !omitted.is_empty() {
        let names = kind_names(&omitted);
        log::warn!(
            "Live database does not report some object kinds; they are compared as absent; kinds={}",
            names
        );
        extra.push(ModelWarning {
            source: LIVE_SOURCE.to_string(),
            message: format!("not introspected, target objects of these kinds appear as creates: {}", names),
        });
    }

    // the catalog never yields raw statements, so every one in the target is a create
    let raw_count = if kinds.is_empty() || kinds.contains(&ObjectKind::RawUnparsed) {
        target_model
            .iter()
            .filter(|o| o.kind() == ObjectKind::RawUnparsed)
            .count()
    } else {
        0
    };
    if raw_count > 0 {
        log::warn!(
            "Target holds raw SQL with no live counterpart; it is compared as absent; statements={}",
            raw_count
        );
        extra.push(ModelWarning {
            source: LIVE_SOURCE.to_string(),
            message: format!(
                "{} raw SQL statement(s) in the target cannot be introspected and appear as creates",
                raw_count
            ),
        });
        omitted.push(ObjectKind::RawUnparsed);
    }

    build_report(
        config,
        dialect,
        (format!("{} (schema {})", LIVE_SOURCE, config.database.schema), live.model),
        (paths_label(target), target_model),
        extra,
        omitted,
    )
}

fn kind_names(kinds: &[ObjectKind]) -> String {
    kinds
        .iter()
        .map(|k| k.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}
