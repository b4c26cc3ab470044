use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use futures::SinkExt;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::config::WarehouseConfig;
use crate::core::calendar::DateDimensionRow;
use crate::core::warehouse::Warehouse;
use crate::schema::DIM_DATE;

/// PostgreSQL-backed warehouse.
///
/// A connection is opened per operation and dropped when it completes, so
/// nothing is held across stages. Statements run over the simple query
/// protocol, which means autocommit per statement — a failing statement in
/// a DDL list leaves the earlier ones applied.
pub struct PostgresWarehouse {
    config: tokio_postgres::Config,
}

impl PostgresWarehouse {
    pub fn new(settings: &WarehouseConfig) -> Self {
        let mut config = tokio_postgres::Config::new();
        config.host(&settings.host);
        config.port(settings.port);
        config.user(&settings.user);
        config.dbname(&settings.dbname);
        if let Some(password) = settings.password() {
            config.password(&password);
        }

        PostgresWarehouse { config }
    }

    async fn client(&self) -> Result<Client> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .context("Failed to connect to the warehouse")?;

        // The connection object drives the socket; it ends when the client
        // is dropped at the end of the calling operation.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("Warehouse connection error: {e}");
            }
        });

        Ok(client)
    }
}

fn copy_statement(table: &str, columns: &[String]) -> String {
    format!(
        "COPY {table} ({}) FROM STDIN WITH (FORMAT csv)",
        columns.join(", ")
    )
}

fn count_statement(table: &str, limit: Option<u64>) -> String {
    match limit {
        Some(limit) => {
            format!("SELECT COUNT(*) FROM (SELECT 1 FROM {table} LIMIT {limit}) AS sample")
        }
        None => format!("SELECT COUNT(*) FROM {table}"),
    }
}

#[async_trait]
impl Warehouse for PostgresWarehouse {
    async fn execute(&self, statements: &[String]) -> Result<()> {
        let client = self.client().await?;
        for statement in statements {
            client
                .batch_execute(statement)
                .await
                .with_context(|| format!("Statement failed: {statement}"))?;
        }
        debug!("Executed {} statements", statements.len());
        Ok(())
    }

    async fn copy_csv(&self, table: &str, columns: &[String], data: &[u8]) -> Result<u64> {
        let client = self.client().await?;
        let sink = client
            .copy_in(copy_statement(table, columns).as_str())
            .await
            .with_context(|| format!("COPY into {table} failed to start"))?;
        let mut sink = Box::pin(sink);

        sink.send(Bytes::copy_from_slice(data))
            .await
            .with_context(|| format!("COPY send to {table} failed"))?;
        let rows = sink
            .as_mut()
            .finish()
            .await
            .with_context(|| format!("COPY into {table} was rejected"))?;

        debug!("Copied {rows} rows into {table}");
        Ok(rows)
    }

    async fn distinct_dates(&self, table: &str, date_column: &str) -> Result<Vec<NaiveDate>> {
        let client = self.client().await?;
        let query = format!("SELECT DISTINCT {date_column} FROM {table} ORDER BY {date_column}");
        let rows = client
            .query(query.as_str(), &[])
            .await
            .with_context(|| format!("Failed to read distinct dates from {table}"))?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn insert_date_rows(&self, rows: &[DateDimensionRow]) -> Result<u64> {
        let client = self.client().await?;
        let statement = client
            .prepare(&format!(
                "INSERT INTO {DIM_DATE} \
                 (date, day_of_month, iso_week, month, year, quarter, day_of_week, day_of_year) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (date) DO NOTHING"
            ))
            .await
            .context("Failed to prepare date dimension insert")?;

        let mut inserted = 0;
        for row in rows {
            inserted += client
                .execute(
                    &statement,
                    &[
                        &row.date,
                        &row.day_of_month,
                        &row.iso_week,
                        &row.month,
                        &row.year,
                        &row.quarter,
                        &row.day_of_week,
                        &row.day_of_year,
                    ],
                )
                .await
                .with_context(|| format!("Failed to insert date dimension row {}", row.date))?;
        }
        Ok(inserted)
    }

    async fn count_rows(&self, table: &str, limit: Option<u64>) -> Result<u64> {
        let client = self.client().await?;
        let row = client
            .query_one(count_statement(table, limit).as_str(), &[])
            .await
            .with_context(|| format!("Failed to count rows of {table}"))?;

        Ok(row.get::<_, i64>(0) as u64)
    }
}
