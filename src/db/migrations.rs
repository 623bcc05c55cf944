//! Database connection, migrations and initialization.

use crate::config::connection_string;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Default pool size when the caller does not configure one.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a connection waits on a locked database before failing.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a pooled connection to the SQLite file at `db_path` and verify it answers.
///
/// The file and its parent directory are created when missing. Every pooled
/// connection has foreign keys enforced, WAL journaling, NORMAL sync and a
/// busy timeout.
pub async fn connect(db_path: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let options = SqliteConnectOptions::from_str(&connection_string(db_path))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    ping(&pool).await?;

    info!(path = %db_path, max_connections, "Database connection established");
    Ok(pool)
}

/// Liveness check.
pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let (one,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;
    if one != 1 {
        return Err(sqlx::Error::Protocol(format!(
            "liveness check returned {}",
            one
        )));
    }
    Ok(())
}

/// Connect with the default pool size and apply the schema.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = connect(db_path, DEFAULT_MAX_CONNECTIONS).await?;
    run_migrations(&pool).await?;

    info!("Database initialized successfully at {}", db_path);
    Ok(pool)
}

/// Apply the schema additively, in one transaction.
///
/// Tables and indexes are created when missing. A table that already exists
/// gets any declared column it lacks through `ALTER TABLE ... ADD COLUMN`.
/// Existing columns and rows are never touched, so running this against an
/// up-to-date database changes nothing.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");
    let schema_sql = include_str!("schema.sql");

    let mut tx = pool.begin().await?;
    for statement in schema_sql.split(';') {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            continue;
        }
        sqlx::query(trimmed).execute(&mut *tx).await?;
        if let Some(table) = TableDecl::parse(trimmed) {
            add_missing_columns(&mut *tx, &table).await?;
        }
    }
    tx.commit().await?;

    info!("Migrations completed successfully");
    Ok(())
}

/// A `CREATE TABLE` statement from the schema, reduced to its columns.
#[derive(Debug, PartialEq)]
struct TableDecl {
    name: String,
    columns: Vec<ColumnDecl>,
}

#[derive(Debug, PartialEq)]
struct ColumnDecl {
    name: String,
    definition: String,
}

const TABLE_CONSTRAINTS: [&str; 5] = ["PRIMARY", "UNIQUE", "CHECK", "FOREIGN", "CONSTRAINT"];

impl TableDecl {
    /// Returns `None` for anything that is not a `CREATE TABLE`.
    fn parse(statement: &str) -> Option<Self> {
        let sql: String = statement
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");

        let header_end = sql.find('(')?;
        let header: Vec<&str> = sql[..header_end].split_whitespace().collect();
        let is_table = header.len() >= 3
            && header[0].eq_ignore_ascii_case("CREATE")
            && header[1].eq_ignore_ascii_case("TABLE");
        if !is_table {
            return None;
        }
        let name = header.last()?.to_string();

        let body = &sql[header_end + 1..sql.rfind(')')?];
        let columns = split_top_level(body)
            .into_iter()
            .filter_map(|entry| {
                let first = entry.split_whitespace().next()?;
                if TABLE_CONSTRAINTS
                    .iter()
                    .any(|kw| first.eq_ignore_ascii_case(kw))
                {
                    return None;
                }
                Some(ColumnDecl {
                    name: first.to_string(),
                    definition: entry,
                })
            })
            .collect();

        Some(TableDecl { name, columns })
    }
}

/// Split a table body on commas that are not nested inside parentheses.
fn split_top_level(body: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in body.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(current.split_whitespace().collect::<Vec<_>>().join(" "));
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    let last = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !last.is_empty() {
        entries.push(last);
    }
    entries
}

/// Rewrite a column definition into one SQLite accepts in `ADD COLUMN`.
///
/// NOT NULL columns without a default get the zero value of their type.
/// Columns that SQLite cannot add in place are rejected.
fn additive_definition(table: &str, column: &ColumnDecl) -> Result<String, sqlx::Error> {
    let upper = column.definition.to_uppercase();
    let not_null = upper.contains("NOT NULL");
    if upper.contains("PRIMARY KEY")
        || upper.contains("UNIQUE")
        || (not_null && upper.contains("REFERENCES"))
    {
        return Err(sqlx::Error::Protocol(format!(
            "column {}.{} cannot be added to an existing table; rebuild it",
            table, column.name
        )));
    }
    if !not_null || upper.contains("DEFAULT") {
        return Ok(column.definition.clone());
    }

    let mut parts = column.definition.splitn(3, ' ');
    let name = parts.next().unwrap_or_default();
    let ty = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default();
    let zero = match ty.to_uppercase().as_str() {
        "TEXT" => "''",
        "REAL" => "0.0",
        _ => "0",
    };
    Ok(format!("{} {} DEFAULT {} {}", name, ty, zero, rest)
        .trim_end()
        .to_string())
}

async fn add_missing_columns(
    conn: &mut SqliteConnection,
    table: &TableDecl,
) -> Result<(), sqlx::Error> {
    let existing: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?)")
        .bind(&table.name)
        .fetch_all(&mut *conn)
        .await?;

    for column in &table.columns {
        if existing
            .iter()
            .any(|(name,)| name.eq_ignore_ascii_case(&column.name))
        {
            continue;
        }
        let definition = additive_definition(&table.name, column)?;
        debug!(table = %table.name, column = %column.name, "Adding missing column");
        sqlx::query(&format!("ALTER TABLE {} ADD COLUMN {}", table.name, definition))
            .execute(&mut *conn)
            .await?;
        info!(table = %table.name, column = %column.name, "Added column");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_db_path(temp_dir: &TempDir) -> String {
        temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string()
    }

    #[tokio::test]
    async fn test_init_db_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_db_path(&temp_dir);

        let pool = init_db(&db_path).await.expect("init_db failed");
        assert!(Path::new(&db_path).exists());

        let result: (i64,) = sqlx::query_as("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        assert_eq!(result.0, 1);
    }

    #[tokio::test]
    async fn test_connect_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("nested")
            .join("dir")
            .join("test.db")
            .to_string_lossy()
            .to_string();

        let pool = connect(&db_path, 1).await.expect("connect failed");
        ping(&pool).await.expect("ping failed");
        assert!(Path::new(&db_path).exists());
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_db_path(&temp_dir))
            .await
            .expect("init_db failed");

        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .expect("query failed");
        let names: Vec<&str> = rows.iter().map(|r| r.0.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "categories",
                "ingredients",
                "instructions",
                "recipe_categories",
                "recipe_ingredients",
                "recipe_tags",
                "recipes",
                "seasonalities",
                "tags",
                "users",
            ]
        );
    }

    #[tokio::test]
    async fn test_every_pooled_connection_is_configured() {
        let temp_dir = TempDir::new().unwrap();
        let pool = connect(&temp_db_path(&temp_dir), 3)
            .await
            .expect("connect failed");

        // Hold all three so each check runs on a distinct connection.
        let mut conns = Vec::new();
        for _ in 0..3 {
            conns.push(pool.acquire().await.expect("acquire failed"));
        }
        for conn in conns.iter_mut() {
            let (fk,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
                .fetch_one(&mut **conn)
                .await
                .unwrap();
            assert_eq!(fk, 1);

            let (timeout,): (i64,) = sqlx::query_as("PRAGMA busy_timeout")
                .fetch_one(&mut **conn)
                .await
                .unwrap();
            assert_eq!(timeout, BUSY_TIMEOUT.as_millis() as i64);

            // 1 = NORMAL
            let (sync,): (i64,) = sqlx::query_as("PRAGMA synchronous")
                .fetch_one(&mut **conn)
                .await
                .unwrap();
            assert_eq!(sync, 1);
        }
    }

    #[test]
    fn test_parse_table_decl() {
        let table = TableDecl::parse(
            "-- leading comment\nCREATE TABLE IF NOT EXISTS recipe_ingredients (\n    recipe_id INTEGER NOT NULL REFERENCES recipes(id),\n    quantity REAL NOT NULL CHECK (quantity > 0),\n    PRIMARY KEY (recipe_id, quantity)\n)",
        )
        .expect("not parsed");
        assert_eq!(table.name, "recipe_ingredients");
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["recipe_id", "quantity"]);
        assert_eq!(
            table.columns[1].definition,
            "quantity REAL NOT NULL CHECK (quantity > 0)"
        );

        assert!(TableDecl::parse("CREATE INDEX IF NOT EXISTS idx ON t(a)").is_none());
    }

    #[test]
    fn test_additive_definition_defaults() {
        let column = |definition: &str| ColumnDecl {
            name: definition.split(' ').next().unwrap().to_string(),
            definition: definition.to_string(),
        };

        assert_eq!(
            additive_definition("recipes", &column("servings INTEGER NOT NULL DEFAULT 0 CHECK (servings >= 0)")).unwrap(),
            "servings INTEGER NOT NULL DEFAULT 0 CHECK (servings >= 0)"
        );
        assert_eq!(
            additive_definition("users", &column("created_at INTEGER NOT NULL")).unwrap(),
            "created_at INTEGER DEFAULT 0 NOT NULL"
        );
        assert_eq!(
            additive_definition("recipe_ingredients", &column("unit TEXT NOT NULL CHECK (length(unit) <= 50)")).unwrap(),
            "unit TEXT DEFAULT '' NOT NULL CHECK (length(unit) <= 50)"
        );
        assert!(additive_definition("users", &column("email TEXT NOT NULL UNIQUE")).is_err());
        assert!(additive_definition(
            "recipes",
            &column("user_id INTEGER NOT NULL REFERENCES users(id)")
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_migrations_add_missing_columns_to_legacy_table() {
        let temp_dir = TempDir::new().unwrap();
        let pool = connect(&temp_db_path(&temp_dir), 1)
            .await
            .expect("connect failed");
        sqlx::query(
            "CREATE TABLE recipes (id INTEGER PRIMARY KEY AUTOINCREMENT, user_id INTEGER NOT NULL, title TEXT NOT NULL, description TEXT, created_at INTEGER NOT NULL, updated_at INTEGER NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();

        run_migrations(&pool).await.expect("migration failed");

        let columns: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info('recipes')")
                .fetch_all(&pool)
                .await
                .unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.0.as_str()).collect();
        for expected in ["prep_time_minutes", "cook_time_minutes", "servings"] {
            assert!(names.contains(&expected), "missing {}", expected);
        }

        run_migrations(&pool).await.expect("second migration failed");
        let again: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info('recipes')")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(again.len(), columns.len());
    }
}
