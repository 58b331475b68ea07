//! PostgreSQL catalog reader.

use tokio_postgres::Client;

use crate::error::Result;

use super::{CatalogReader, ColumnRow, ConstraintRow, IndexRow, TableRow};

/// Reads one schema of a PostgreSQL database through `pg_catalog`.
///
/// Types, defaults, constraints and indexes are taken in the catalog's own
/// rendering (`format_type`, `pg_get_expr`, `pg_get_constraintdef`,
/// `pg_get_indexdef`) so they can be run through the DDL normalizers.
pub struct PgCatalog<'a> {
    client: &'a Client,
    schema: String,
}

impl<'a> PgCatalog<'a> {
    pub fn new(client: &'a Client, schema: impl Into<String>) -> Self {
        Self {
            client,
            schema: schema.into(),
        }
    }
}

impl CatalogReader for PgCatalog<'_> {
    async fn tables(&self) -> Result<Vec<TableRow>> {
        let rows = self
            .client
            .query(
                "SELECT n.nspname, c.relname, ts.spcname,
                        CASE WHEN c.relkind = 'p' THEN pg_get_partkeydef(c.oid) END,
                        c.reloptions::text[]
                 FROM pg_class c
                 JOIN pg_namespace n ON n.oid = c.relnamespace
                 LEFT JOIN pg_tablespace ts ON ts.oid = c.reltablespace
                 WHERE n.nspname = $1 AND c.relkind IN ('r', 'p') AND NOT c.relispartition
                 ORDER BY c.relname",
                &[&self.schema],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|r| TableRow {
                schema: r.get(0),
                name: r.get(1),
                tablespace: r.get(2),
                partition_key: r.get(3),
                options: r.get::<_, Option<Vec<String>>>(4).unwrap_or_default(),
            })
            .collect())
    }

    async fn columns(&self) -> Result<Vec<ColumnRow>> {
        let rows = self
            .client
            .query(
                "SELECT n.nspname, c.relname, a.attname,
                        format_type(a.atttypid, a.atttypmod),
                        NOT a.attnotnull,
                        pg_get_expr(d.adbin, d.adrelid),
                        a.attidentity <> '',
                        a.attgenerated <> ''
                 FROM pg_attribute a
                 JOIN pg_class c ON c.oid = a.attrelid
                 JOIN pg_namespace n ON n.oid = c.relnamespace
                 LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
                 WHERE n.nspname = $1 AND c.relkind IN ('r', 'p') AND NOT c.relispartition
                   AND a.attnum > 0 AND NOT a.attisdropped
                 ORDER BY c.relname, a.attnum",
                &[&self.schema],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|r| ColumnRow {
                schema: r.get(0),
                table: r.get(1),
                name: r.get(2),
                data_type: r.get(3),
                nullable: r.get(4),
                default: r.get(5),
                identity: r.get(6),
                generated: r.get(7),
            })
            .collect())
    }

    async fn constraints(&self) -> Result<Vec<ConstraintRow>> {
        let rows = self
            .client
            .query(
                "SELECT n.nspname, c.relname, con.conname, pg_get_constraintdef(con.oid)
                 FROM pg_constraint con
                 JOIN pg_class c ON c.oid = con.conrelid
                 JOIN pg_namespace n ON n.oid = c.relnamespace
                 WHERE n.nspname = $1 AND con.contype IN ('p', 'u', 'f', 'c') AND NOT c.relispartition
                 ORDER BY c.relname, con.conname",
                &[&self.schema],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|r| ConstraintRow {
                schema: r.get(0),
                table: r.get(1),
                name: r.get(2),
                definition: r.get::<_, Option<String>>(3).unwrap_or_default(),
            })
            .collect())
    }

    async fn indexes(&self) -> Result<Vec<IndexRow>> {
        // indexes backing a primary key, unique or exclusion constraint are
        // reported through the constraint
        let rows = self
            .client
            .query(
                "SELECT n.nspname, i.relname, pg_get_indexdef(i.oid)
                 FROM pg_index x
                 JOIN pg_class i ON i.oid = x.indexrelid
                 JOIN pg_class t ON t.oid = x.indrelid
                 JOIN pg_namespace n ON n.oid = i.relnamespace
                 WHERE n.nspname = $1 AND t.relkind IN ('r', 'p') AND NOT t.relispartition
                   AND NOT EXISTS (
                       SELECT 1 FROM pg_constraint con
                       WHERE con.conrelid = x.indrelid
                         AND con.conindid = x.indexrelid
                         AND con.contype IN ('p', 'u', 'x')
                   )
                 ORDER BY i.relname",
                &[&self.schema],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|r| IndexRow {
                schema: r.get(0),
                name: r.get(1),
                definition: r.get(2),
            })
            .collect())
    }
}
