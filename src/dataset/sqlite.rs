//! SQLite dataset implementation

use crate::crawler::CrawlStats;
use crate::dataset::schema::initialize_schema;
use crate::dataset::traits::{
    DatasetResult, DatasetStore, DatasetSummary, RunRecord, RunStatus,
};
use crate::extract::PageResult;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;

/// SQLite dataset backend
pub struct SqliteDataset {
    conn: Connection,
}

impl SqliteDataset {
    /// Opens or creates a dataset file
    ///
    /// Missing parent directories are created.
    pub fn open(path: &Path) -> DatasetResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Self::with_connection(conn)
    }

    /// Creates an in-memory dataset
    pub fn in_memory() -> DatasetResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> DatasetResult<Self> {
        initialize_schema(&conn)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR IGNORE INTO dataset_info (id, created_at, modified_at, item_count)
             VALUES (1, ?1, ?1, 0)",
            params![now],
        )?;
        Ok(Self { conn })
    }

    /// Number of deal rows across all page results
    pub fn count_deals(&self) -> DatasetResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM deals", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Number of link rows across all page results
    pub fn count_links(&self) -> DatasetResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Reads an RFC 3339 column
fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => time_column(row, idx).map(Some),
        None => Ok(None),
    }
}

impl DatasetStore for SqliteDataset {
    fn append(&mut self, result: &PageResult) -> DatasetResult<()> {
        let data = serde_json::to_string(result)?;
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO page_results (url, title, status, attempts, error_message, crawled_at, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                result.url,
                result.title,
                result.status.to_db_string(),
                result.attempts,
                result.error,
                result.timestamp.to_rfc3339(),
                data
            ],
        )?;
        let page_id = tx.last_insert_rowid();

        {
            let mut insert_deal = tx.prepare_cached(
                "INSERT INTO deals (page_id, title, price, original_price, discount, description,
                 image, link, category, store, source_url, extracted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for deal in &result.deals {
                insert_deal.execute(params![
                    page_id,
                    deal.title,
                    deal.price,
                    deal.original_price,
                    deal.discount,
                    deal.description,
                    deal.image,
                    deal.link,
                    deal.category,
                    deal.store,
                    deal.source_url,
                    deal.timestamp.to_rfc3339()
                ])?;
            }

            let mut insert_link =
                tx.prepare_cached("INSERT INTO links (page_id, href, text) VALUES (?1, ?2, ?3)")?;
            for link in &result.links {
                insert_link.execute(params![page_id, link.href, link.text])?;
            }
        }

        tx.execute(
            "UPDATE dataset_info SET item_count = item_count + 1, modified_at = ?1 WHERE id = 1",
            params![now],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn summary(&self) -> DatasetResult<DatasetSummary> {
        let summary = self.conn.query_row(
            "SELECT item_count, created_at, modified_at FROM dataset_info WHERE id = 1",
            [],
            |row| {
                Ok(DatasetSummary {
                    item_count: row.get::<_, i64>(0)? as u64,
                    created_at: time_column(row, 1)?,
                    modified_at: time_column(row, 2)?,
                })
            },
        )?;
        Ok(summary)
    }

    fn results(&self) -> DatasetResult<Vec<PageResult>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM page_results ORDER BY id")?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::with_capacity(rows.len());
        for data in rows {
            results.push(serde_json::from_str(&data)?);
        }
        Ok(results)
    }

    fn start_run(&mut self, config_hash: &str) -> DatasetResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        stats: &CrawlStats,
        status: RunStatus,
    ) -> DatasetResult<()> {
        let now = Utc::now().to_rfc3339();
        let stats = serde_json::to_string(stats)?;
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, stats = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, stats, run_id],
        )?;
        Ok(())
    }

    fn runs(&self) -> DatasetResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, stats FROM runs ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    RunRecord {
                        id: row.get(0)?,
                        started_at: time_column(row, 1)?,
                        finished_at: optional_time_column(row, 2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Failed),
                        stats: None,
                    },
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut run, stats)| -> DatasetResult<RunRecord> {
                if let Some(stats) = stats {
                    run.stats = Some(serde_json::from_str(&stats)?);
                }
                Ok(run)
            })
            .collect()
    }

    fn clear(&mut self) -> DatasetResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "
            DELETE FROM links;
            DELETE FROM deals;
            DELETE FROM page_results;
            DELETE FROM runs;
        ",
        )?;
        tx.execute(
            "UPDATE dataset_info SET created_at = ?1, modified_at = ?1, item_count = 0 WHERE id = 1",
            params![now],
        )?;
        tx.commit()?;
        Ok(())
    }
}
