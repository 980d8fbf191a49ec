use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{domain::UnknownToken, paging::PageRequest};

mod organizations;
mod requests;
mod residence;
mod staff;
mod users;

pub use requests::{NewRequest, RequestFilter, RequestUpdate};
pub use residence::HouseRename;
pub use users::UserRemoval;

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// One page of rows together with the unpaged row count.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Searchable text columns and their lowercased shadows.
const FOLDED_COLUMNS: [(&str, &str, &str); 4] = [
    ("houses", "address", "address_folded"),
    ("organizations", "name", "name_folded"),
    ("specializations", "name", "name_folded"),
    ("requests", "complaint", "complaint_folded"),
];

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // every connection to an in-memory url opens its own empty database
        let pool_options = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        let storage = Self { pool };
        storage.backfill_folded().await?;
        Ok(storage)
    }

    /// Fills folded columns for rows written before they existed.
    async fn backfill_folded(&self) -> Result<()> {
        for (table, source, folded) in FOLDED_COLUMNS {
            let rows: Vec<(i64, String)> =
                sqlx::query_as(&format!("SELECT rowid, {source} FROM {table} WHERE {folded} IS NULL"))
                    .fetch_all(&self.pool)
                    .await?;
            if rows.is_empty() {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            for (rowid, text) in &rows {
                sqlx::query(&format!("UPDATE {table} SET {folded} = ? WHERE rowid = ?"))
                    .bind(fold(text))
                    .bind(rowid)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            tracing::info!(table, rows = rows.len(), "backfilled folded search column");
        }
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

pub(crate) fn parse_token<T>(raw: &str) -> Result<T>
where
    T: FromStr<Err = UnknownToken>,
{
    raw.parse::<T>()
        .with_context(|| format!("stored value `{raw}` is not a known token"))
}

/// Unicode lowercase form stored in the `*_folded` columns.
pub(crate) fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Turns a user supplied needle into a folded `%needle%` for
/// `LIKE ... ESCAPE '\'` against a `*_folded` column. Blank needles mean
/// "no filter".
pub(crate) fn contains_pattern(needle: Option<&str>) -> Option<String> {
    let needle = needle.map(str::trim).filter(|n| !n.is_empty())?;
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in fold(needle).chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    Some(escaped)
}

pub(crate) fn window(page: PageRequest) -> (i64, i64) {
    (i64::from(page.limit), page.offset())
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
