/// Database module for the user's database
///
/// This module wraps the database the conversation is about: listing tables,
/// describing the schema for the SQL agent, previewing tables and running the
/// read-only queries the agent produces.
///
/// Two backends are supported:
/// - **SQLite**: a local file, opened read-only. The file is never created, so
///   a typo in the configured path fails loudly instead of producing an empty
///   database.
/// - **PostgreSQL**: a `postgres://` URL. Every session is started with
///   `default_transaction_read_only`, so the server refuses writes too.
use anyhow::{Context, Result};
use futures::{Stream, TryStreamExt};
use sdk::errors::EngineError;
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Executor, Row, TypeInfo, ValueRef};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

/// Statement keywords accepted by [`Database::run_read_query`]
const READ_KEYWORDS: &[&str] = &["SELECT", "WITH", "PRAGMA", "EXPLAIN", "SHOW", "VALUES"];

/// Secret key for the PostgreSQL password (env: `DATABASE_PASSWORD`)
pub const DATABASE_PASSWORD: &str = "database_password";

/// URL schemes routed to the PostgreSQL backend
const POSTGRES_SCHEMES: &[&str] = &["postgres://", "postgresql://"];

/// How long to wait for a server connection before giving up
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Which database engine a [`Database`] talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "SQLite"),
            Backend::Postgres => write!(f, "PostgreSQL"),
        }
    }
}

enum Pool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

/// Database connection pool
pub struct Database {
    pool: Pool,
}

/// A column as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// Rows returned by a query, rendered to text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// True when more rows matched than were kept
    pub truncated: bool,
}

impl QueryRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for QueryRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return write!(f, "(no rows)");
        }

        writeln!(f, "{}", self.columns.join(" | "))?;
        for row in &self.rows {
            writeln!(f, "{}", row.join(" | "))?;
        }
        if self.truncated {
            write!(f, "... (more rows omitted)")?;
        }
        Ok(())
    }
}

/// True when `url` names a PostgreSQL server
pub fn is_postgres_url(url: &str) -> bool {
    POSTGRES_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

impl Database {
    /// Open the database described by the `[database]` config section
    ///
    /// A configured `url` wins over `path`. `password` is applied to
    /// PostgreSQL connections when given and ignored for SQLite.
    pub async fn open(config: &DatabaseConfig, password: Option<&str>) -> Result<Self> {
        match config.url.as_deref() {
            Some(url) if is_postgres_url(url) => Self::connect_postgres(url, password).await,
            Some(url) => Err(EngineError::Config(format!(
                "Unsupported database URL scheme in '{}'. Use postgres:// or set database.path",
                url.split("://").next().unwrap_or_default()
            ))
            .into()),
            None => Self::connect(&config.path).await,
        }
    }

    /// Open an existing SQLite database
    ///
    /// The file must already exist. The pool is opened read-only, so even a
    /// statement that slips past [`is_read_query`] cannot modify the data.
    pub async fn connect(db_path: &Path) -> Result<Self> {
        info!("Connecting to database at: {}", db_path.display());

        if !db_path.exists() {
            return Err(EngineError::Database(format!(
                "Database file not found: {}",
                db_path.display()
            ))
            .into());
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(false)
            .read_only(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        debug!("Database connection established");
        Ok(Self {
            pool: Pool::Sqlite(pool),
        })
    }

    /// Connect to a PostgreSQL server
    ///
    /// `password` overrides any password embedded in `url`.
    pub async fn connect_postgres(url: &str, password: Option<&str>) -> Result<Self> {
        let mut options = PgConnectOptions::from_str(url)
            .map_err(|e| EngineError::Config(format!("Invalid database URL: {}", e)))?
            .options([("default_transaction_read_only", "on")])
            .disable_statement_logging();
        if let Some(password) = password {
            options = options.password(password);
        }

        info!(
            "Connecting to PostgreSQL database {} on {}:{}",
            options.get_database().unwrap_or("(default)"),
            options.get_host(),
            options.get_port()
        );

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        debug!("Database connection established");
        Ok(Self {
            pool: Pool::Postgres(pool),
        })
    }

    /// The engine behind this connection
    pub fn backend(&self) -> Backend {
        match self.pool {
            Pool::Sqlite(_) => Backend::Sqlite,
            Pool::Postgres(_) => Backend::Postgres,
        }
    }

    /// User tables, sorted by name
    ///
    /// SQLite's internal tables are excluded. On PostgreSQL only base tables
    /// of the current schema are listed.
    pub async fn table_names(&self) -> Result<Vec<String>> {
        let names: Vec<String> = match &self.pool {
            Pool::Sqlite(pool) => {
                sqlx::query_scalar(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                     ORDER BY name",
                )
                .fetch_all(pool)
                .await
            }
            Pool::Postgres(pool) => {
                sqlx::query_scalar(
                    "SELECT table_name::text FROM information_schema.tables \
                     WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
                     ORDER BY table_name",
                )
                .fetch_all(pool)
                .await
            }
        }
        .context("Failed to list tables")?;

        Ok(names)
    }

    /// Columns of `table` in declaration order
    pub async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let columns: Vec<(String, String)> = match &self.pool {
            Pool::Sqlite(pool) => {
                sqlx::query_as("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
                    .bind(table)
                    .fetch_all(pool)
                    .await
            }
            Pool::Postgres(pool) => {
                sqlx::query_as(
                    "SELECT column_name::text, upper(data_type::text) \
                     FROM information_schema.columns \
                     WHERE table_schema = current_schema() AND table_name::text = $1 \
                     ORDER BY ordinal_position",
                )
                .bind(table)
                .fetch_all(pool)
                .await
            }
        }
        .with_context(|| format!("Failed to read columns of {}", table))?;

        Ok(columns
            .into_iter()
            .map(|(name, data_type)| ColumnInfo { name, data_type })
            .collect())
    }

    /// Human-readable schema listing used to ground the SQL agent
    ///
    /// ```text
    /// The database has the following tables and columns:
    ///
    /// Table: users
    /// - id (INTEGER)
    /// - name (TEXT)
    /// ```
    pub async fn schema_description(&self) -> Result<String> {
        let mut lines = vec!["The database has the following tables and columns:\n".to_string()];

        for table in self.table_names().await? {
            lines.push(format!("Table: {}", table));
            for column in self.columns(&table).await? {
                lines.push(format!("- {} ({})", column.name, column.data_type));
            }
            lines.push(String::new());
        }

        Ok(lines.join("\n"))
    }

    /// First `limit` rows of `table`
    pub async fn preview(&self, table: &str, limit: usize) -> Result<QueryRows> {
        let sql = format!("SELECT * FROM {} LIMIT {}", quote_identifier(table), limit);
        self.fetch_rows(&sql, limit)
            .await
            .with_context(|| format!("Error querying {}", table))
    }

    /// Run a model-generated query, keeping at most `max_rows` rows
    ///
    /// Rows are streamed; the query stops once one row past the cap arrives.
    ///
    /// # Errors
    /// `EngineError::WriteQueryNotAllowed` for anything but a single read
    /// statement, otherwise the database error.
    pub async fn run_read_query(&self, sql: &str, max_rows: usize) -> Result<QueryRows> {
        if !is_read_query(sql) {
            return Err(EngineError::WriteQueryNotAllowed.into());
        }

        debug!("Running query: {}", sql);
        let rows = self
            .fetch_rows(sql.trim().trim_end_matches(';'), max_rows)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        Ok(rows)
    }

    /// Close the database connection
    pub async fn close(self) {
        match self.pool {
            Pool::Sqlite(pool) => pool.close().await,
            Pool::Postgres(pool) => pool.close().await,
        }
        info!("Database connection closed");
    }

    // Unprepared statements: PostgreSQL then returns every value as text
    async fn fetch_rows(&self, sql: &str, max_rows: usize) -> Result<QueryRows, sqlx::Error> {
        match &self.pool {
            Pool::Sqlite(pool) => collect_rows(pool.fetch(sql), max_rows, render_sqlite_value).await,
            Pool::Postgres(pool) => {
                collect_rows(pool.fetch(sql), max_rows, render_postgres_value).await
            }
        }
    }
}

/// Quote an identifier for interpolation into SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// True when `sql` is a single statement starting with a read keyword
pub fn is_read_query(sql: &str) -> bool {
    let statement = sql.trim().trim_end_matches(';').trim();
    if statement.is_empty() || statement.contains(';') {
        return false;
    }

    let keyword = statement
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_uppercase();

    READ_KEYWORDS.contains(&keyword.as_str())
}

/// Pull rows off `stream` until `max_rows` are kept and one more is seen
async fn collect_rows<R, S>(
    mut stream: S,
    max_rows: usize,
    render: fn(&R, usize) -> String,
) -> Result<QueryRows, sqlx::Error>
where
    R: Row,
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
{
    let mut result = QueryRows::default();

    while let Some(row) = stream.try_next().await? {
        if result.columns.is_empty() {
            result.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
        }
        if result.rows.len() == max_rows {
            result.truncated = true;
            break;
        }
        result.rows.push((0..row.len()).map(|i| render(&row, i)).collect());
    }

    Ok(result)
}

/// SQLite values are dynamically typed, so try the storage classes in turn
fn render_sqlite_value(row: &SqliteRow, index: usize) -> String {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return "NULL".to_string(),
        Ok(raw) => {
            if raw.type_info().name() == "BLOB" {
                if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
                    return format!("<{} bytes>", bytes.len());
                }
            }
        }
        Err(_) => return "?".to_string(),
    }

    if let Ok(v) = row.try_get::<i64, _>(index) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return v;
    }
    if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
        return format!("<{} bytes>", bytes.len());
    }
    "?".to_string()
}

/// Text-format values decode as strings whatever their column type
fn render_postgres_value(row: &PgRow, index: usize) -> String {
    match row.try_get_unchecked::<Option<String>, _>(index) {
        Ok(Some(text)) => text,
        Ok(None) => "NULL".to_string(),
        Err(_) => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_read_queries_accepted() {
        assert!(is_read_query("SELECT * FROM users"));
        assert!(is_read_query("  select name from users;  "));
        assert!(is_read_query("WITH t AS (SELECT 1) SELECT * FROM t"));
        assert!(is_read_query("PRAGMA table_info(users)"));
        assert!(is_read_query("EXPLAIN QUERY PLAN SELECT 1"));
        assert!(is_read_query("SELECT(1)"));
        assert!(is_read_query("SHOW search_path"));
    }

    #[test]
    fn test_write_queries_rejected() {
        assert!(!is_read_query("DELETE FROM users"));
        assert!(!is_read_query("UPDATE users SET name = 'x'"));
        assert!(!is_read_query("DROP TABLE users"));
        assert!(!is_read_query("INSERT INTO users VALUES (1)"));
        assert!(!is_read_query(""));
        assert!(!is_read_query("SELECT 1; DROP TABLE users"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_postgres_url_detection() {
        assert!(is_postgres_url("postgres://user@localhost/shop"));
        assert!(is_postgres_url("postgresql://user:pw@db:5432/shop"));
        assert!(!is_postgres_url("mysql://user@localhost/shop"));
        assert!(!is_postgres_url("/var/data/shop.db"));
    }

    #[test]
    fn test_query_rows_display() {
        let rows = QueryRows {
            columns: vec!["id".into(), "name".into()],
            rows: vec![vec!["1".into(), "Ada".into()]],
            truncated: true,
        };
        assert_eq!(rows.to_string(), "id | name\n1 | Ada\n... (more rows omitted)");
        assert_eq!(QueryRows::default().to_string(), "(no rows)");
    }

    #[tokio::test]
    async fn test_connect_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Database::connect(&dir.path().join("missing.db")).await;
        assert!(result.is_err());
        assert!(!dir.path().join("missing.db").exists());
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_url_scheme() {
        let config = DatabaseConfig {
            url: Some("mysql://root@localhost/shop".to_string()),
            path: PathBuf::from("/nonexistent.db"),
            ..DatabaseConfig::default()
        };

        let err = Database::open(&config, None).await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::Config(message)) if message.contains("mysql")
        ));
    }

    #[tokio::test]
    async fn test_connect_postgres_rejects_malformed_url() {
        let err = Database::connect_postgres("postgres://user@host:notaport/db", None)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_postgres_unreachable_server() {
        let result = Database::connect_postgres("postgres://dbchat@127.0.0.1:1/shop", Some("pw")).await;
        let err = result.err().unwrap();
        assert!(format!("{:#}", err).starts_with("Failed to connect to database"));
        assert!(!format!("{:#}", err).contains("pw@"));
    }
}
