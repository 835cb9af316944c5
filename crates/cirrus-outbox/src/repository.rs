use std::str::FromStr;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use time::format_description::well_known::Rfc3339;

use cirrus_core::{AlertCandidate, CanonicalWeatherRecord};

use super::error::OutboxError;
use super::models::{candidate_created_at, AlertRow, AlertStatus, WeatherRow};

#[derive(Debug, Clone)]
pub struct OutboxConfig {
    pub url: String,
}

impl OutboxConfig {
    /// Process-local database. Shared cache keeps every pooled
    /// connection on the same in-memory store.
    pub fn in_memory() -> Self {
        Self {
            url: String::from("sqlite:file:cirrus-mem?mode=memory&cache=shared"),
        }
    }
}

/// Counts per delivery state, for the status command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub sent: u64,
    pub failed: u64,
}

/// Sqlite-backed storage for weather records and the alert outbox.
///
/// Records and their derived alert candidates land in one transaction,
/// so a crash never leaves alerts without the records they were
/// computed from.
pub struct Outbox {
    pool: SqlitePool,
}

impl Outbox {
    pub async fn new(config: OutboxConfig) -> Result<Self, OutboxError> {
        // A first run must be able to open a database that does not exist
        // yet; the sqlite driver only creates the file when asked to.
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| OutboxError::ConnectionError(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| OutboxError::ConnectionError(e.to_string()))?;

        Self::initialize_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn initialize_schema(pool: &SqlitePool) -> Result<(), OutboxError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS weather_records (
                location_id INTEGER NOT NULL,
                issued_at TEXT NOT NULL,
                forecast_at TEXT NOT NULL,
                temperature_current REAL NOT NULL,
                temperature_max REAL,
                temperature_min REAL,
                sky TEXT NOT NULL,
                precipitation_type TEXT NOT NULL,
                precipitation_amount REAL NOT NULL,
                precipitation_probability INTEGER,
                wind_speed REAL,
                wind_category TEXT NOT NULL,
                humidity REAL,
                temperature_delta_vs_yesterday REAL NOT NULL,
                humidity_delta_vs_yesterday REAL NOT NULL,
                PRIMARY KEY (location_id, forecast_at)
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| OutboxError::QueryError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alert_outbox (
                id TEXT PRIMARY KEY,
                location_id INTEGER NOT NULL,
                alert_type TEXT NOT NULL,
                message TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| OutboxError::QueryError(e.to_string()))?;

        Ok(())
    }

    /// Persist one reconciliation pass atomically. Records upsert on
    /// their (location, forecast instant) key; candidates insert as
    /// new PENDING rows.
    pub async fn record_pass(
        &self,
        records: &[CanonicalWeatherRecord],
        candidates: &[AlertCandidate],
    ) -> Result<(), OutboxError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| OutboxError::QueryError(e.to_string()))?;

        for record in records {
            let issued_at = format_instant(record.issued_at)?;
            let forecast_at = format_instant(record.forecast_at)?;
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO weather_records (
                    location_id, issued_at, forecast_at,
                    temperature_current, temperature_max, temperature_min,
                    sky, precipitation_type, precipitation_amount,
                    precipitation_probability, wind_speed, wind_category,
                    humidity, temperature_delta_vs_yesterday, humidity_delta_vs_yesterday
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.location_id)
            .bind(issued_at)
            .bind(forecast_at)
            .bind(record.temperature_current)
            .bind(record.temperature_max)
            .bind(record.temperature_min)
            .bind(record.sky.as_str())
            .bind(record.precipitation_type.as_str())
            .bind(record.precipitation_amount)
            .bind(record.precipitation_probability)
            .bind(record.wind_speed)
            .bind(record.wind_category.as_str())
            .bind(record.humidity)
            .bind(record.temperature_delta_vs_yesterday)
            .bind(record.humidity_delta_vs_yesterday)
            .execute(&mut *tx)
            .await
            .map_err(|e| OutboxError::QueryError(e.to_string()))?;
        }

        for candidate in candidates {
            sqlx::query(
                r#"
                INSERT INTO alert_outbox (id, location_id, alert_type, message, status, created_at)
                VALUES (?, ?, ?, ?, 'PENDING', ?)
                "#,
            )
            .bind(candidate.id.to_string())
            .bind(candidate.location_id)
            .bind(candidate.alert_type.as_str())
            .bind(&candidate.message)
            .bind(candidate_created_at(candidate))
            .execute(&mut *tx)
            .await
            .map_err(|e| OutboxError::QueryError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| OutboxError::QueryError(e.to_string()))
    }

    /// The oldest pending alerts, up to `limit`.
    pub async fn fetch_pending(&self, limit: usize) -> Result<Vec<AlertRow>, OutboxError> {
        sqlx::query_as::<_, AlertRow>(
            "SELECT id, location_id, alert_type, message, status, created_at \
             FROM alert_outbox WHERE status = 'PENDING' ORDER BY created_at, id LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| OutboxError::QueryError(e.to_string()))
    }

    /// Optimistic `PENDING -> SENT`. Returns false when another worker
    /// already moved the row out of PENDING.
    pub async fn mark_sent(&self, id: &str) -> Result<bool, OutboxError> {
        self.transition(id, AlertStatus::Sent).await
    }

    /// Optimistic `PENDING -> FAILED`. Returns false when the row was
    /// no longer pending.
    pub async fn mark_failed(&self, id: &str) -> Result<bool, OutboxError> {
        self.transition(id, AlertStatus::Failed).await
    }

    async fn transition(&self, id: &str, to: AlertStatus) -> Result<bool, OutboxError> {
        let result = sqlx::query("UPDATE alert_outbox SET status = ? WHERE id = ? AND status = 'PENDING'")
            .bind(to.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| OutboxError::QueryError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn status_counts(&self) -> Result<StatusCounts, OutboxError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM alert_outbox GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| OutboxError::QueryError(e.to_string()))?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match AlertStatus::parse(&status) {
                Some(AlertStatus::Pending) => counts.pending = count as u64,
                Some(AlertStatus::Sent) => counts.sent = count as u64,
                Some(AlertStatus::Failed) => counts.failed = count as u64,
                None => return Err(OutboxError::InvalidRow(status)),
            }
        }
        Ok(counts)
    }

    /// Stored records for one location, newest forecast first.
    pub async fn weather_records(
        &self,
        location_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<WeatherRow>, OutboxError> {
        let limit = limit.unwrap_or(100) as i64;
        sqlx::query_as::<_, WeatherRow>(
            "SELECT * FROM weather_records WHERE location_id = ? ORDER BY forecast_at DESC LIMIT ?",
        )
        .bind(location_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| OutboxError::QueryError(e.to_string()))
    }

    pub async fn get_alert(&self, id: &str) -> Result<AlertRow, OutboxError> {
        sqlx::query_as::<_, AlertRow>(
            "SELECT id, location_id, alert_type, message, status, created_at \
             FROM alert_outbox WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| OutboxError::QueryError(e.to_string()))?
        .ok_or_else(|| OutboxError::AlertNotFound(id.to_string()))
    }
}

fn format_instant(instant: time::OffsetDateTime) -> Result<String, OutboxError> {
    instant
        .format(&Rfc3339)
        .map_err(|e| OutboxError::InvalidRow(e.to_string()))
}
