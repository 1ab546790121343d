use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use common::{Candle, CandleStore, Error, Exchange, Result};

/// Embedded migrations from the workspace `migrations/` directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// SQLite-backed candle store.
///
/// Satisfies the `CandleStore` contract: ordered queries, idempotent
/// batch upserts keyed by (exchange, symbol, period, time). Single writer
/// per process; batches run in one transaction.
#[derive(Clone)]
pub struct SqliteCandleStore {
    pool: SqlitePool,
}

impl SqliteCandleStore {
    /// Open (creating if missing) the database at `url` and apply migrations.
    /// WAL journal, normal synchronous.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(Error::Database)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        MIGRATOR.run(&pool).await?;
        info!(url, "Candle store ready");
        Ok(Self { pool })
    }

    /// In-memory store for tests. A single pooled connection keeps every
    /// query on the same in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CandleStore for SqliteCandleStore {
    async fn get_candles(
        &self,
        exchange: Exchange,
        symbol: &str,
        period: i64,
        since_time: i64,
    ) -> Result<Vec<Candle>> {
        let rows = sqlx::query(
            "SELECT exchange, symbol, period, time, open, high, low, close, volume \
             FROM candlesticks \
             WHERE exchange = ?1 AND symbol = ?2 AND period = ?3 AND time > ?4 \
             ORDER BY time ASC",
        )
        .bind(exchange.to_string())
        .bind(symbol)
        .bind(period)
        .bind(since_time)
        .fetch_all(&self.pool)
        .await?;

        debug!(%exchange, symbol, period, since_time, count = rows.len(), "Fetched candles");

        rows.into_iter()
            .map(|row| {
                let exchange: String = row.try_get("exchange")?;
                let exchange = exchange.parse::<Exchange>().map_err(Error::Other)?;
                Ok(Candle {
                    exchange,
                    symbol: row.try_get("symbol")?,
                    period: row.try_get("period")?,
                    time: row.try_get("time")?,
                    open: row.try_get("open")?,
                    high: row.try_get("high")?,
                    low: row.try_get("low")?,
                    close: row.try_get("close")?,
                    volume: row.try_get("volume")?,
                })
            })
            .collect()
    }

    async fn insert_candles(&self, candles: &[Candle]) -> Result<()> {
        if candles.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for candle in candles {
            sqlx::query(
                "INSERT INTO candlesticks \
                 (exchange, symbol, period, time, open, high, low, close, volume) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
                 ON CONFLICT(exchange, symbol, period, time) DO UPDATE SET \
                 open = excluded.open, high = excluded.high, low = excluded.low, \
                 close = excluded.close, volume = excluded.volume",
            )
            .bind(candle.exchange.to_string())
            .bind(&candle.symbol)
            .bind(candle.period)
            .bind(candle.time)
            .bind(candle.open)
            .bind(candle.high)
            .bind(candle.low)
            .bind(candle.close)
            .bind(candle.volume)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(count = candles.len(), "Upserted candle batch");
        Ok(())
    }
}
