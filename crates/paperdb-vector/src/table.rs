//! Postgres connection and housekeeping helpers.
//!
//! Provides the connection handle, quoted table names, and ensure-* helpers
//! for the pgvector extension and the paper table.

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};

use paperdb_core::config::DatabaseSettings;

/// Fully-qualified Postgres table name (schema + table).
#[derive(Debug, Clone)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    pub fn new<S, T>(schema: S, table: T) -> Result<Self>
    where
        S: Into<String>,
        T: Into<String>,
    {
        let schema = schema.into();
        let table = table.into();
        anyhow::ensure!(!schema.trim().is_empty(), "schema name is required");
        anyhow::ensure!(!table.trim().is_empty(), "table name is required");
        Ok(Self { schema, table })
    }

    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self> {
        Self::new(settings.schema.clone(), settings.table.clone())
    }

    /// Fully-qualified table reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    let escaped = input.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// One open session: the client plus the task driving its socket.
pub struct PgConnection {
    client: Client,
    driver: JoinHandle<()>,
}

impl PgConnection {
    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }

    /// Ends the session and waits for the driver task to finish.
    pub async fn close(self) {
        drop(self.client);
        if let Err(err) = self.driver.await {
            tracing::warn!(error = %err, "postgres connection task ended abnormally");
        }
        tracing::info!("Database connection closed.");
    }
}

pub fn connect_config(settings: &DatabaseSettings) -> Result<tokio_postgres::Config> {
    if let Some(url) = settings.url.as_deref().filter(|u| !u.trim().is_empty()) {
        return url.parse().context("invalid database.url");
    }
    let mut config = tokio_postgres::Config::new();
    config
        .host(&settings.host)
        .port(settings.port)
        .dbname(&settings.name)
        .user(&settings.user);
    if let Some(password) = &settings.password {
        config.password(password);
    }
    Ok(config)
}

pub async fn open_db(settings: &DatabaseSettings) -> Result<PgConnection> {
    let config = connect_config(settings)?;
    let (client, connection) = config
        .connect(NoTls)
        .await
        .with_context(|| format!("failed to connect to Postgres at {}:{}", settings.host, settings.port))?;
    let driver = tokio::spawn(async move {
        if let Err(err) = connection.await {
            tracing::error!(error = %err, "postgres connection error");
        }
    });
    tracing::info!("Successfully connected to the database.");
    Ok(PgConnection { client, driver })
}

pub async fn ensure_vector_extension(client: &Client) -> Result<()> {
    client
        .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
        .await
        .context("failed to ensure pgvector extension")?;
    Ok(())
}

pub async fn ensure_paper_table(client: &Client, table: &TableName, dims: usize) -> Result<()> {
    anyhow::ensure!(dims > 0, "embedding dimension must be positive");
    client
        .execute(&paper_table_ddl(table, dims), &[])
        .await
        .context("failed to create paper table")?;
    Ok(())
}

pub fn paper_table_ddl(table: &TableName, dims: usize) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            title TEXT,
            authors TEXT,
            publication_year TEXT,
            journal_name TEXT,
            abstract TEXT,
            doi TEXT,
            url TEXT,
            abstract_embedding VECTOR({dims})
        )",
        table.qualified()
    )
}
