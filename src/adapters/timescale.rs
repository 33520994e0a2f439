use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::Measurement;
use crate::error::StoreError;
use crate::ports::MeasurementSink;

pub struct TimescaleSink {
    pool: PgPool,
    write_timeout: Duration,
}

impl TimescaleSink {
    pub fn new(pool: PgPool, write_timeout: Duration) -> Self {
        Self { pool, write_timeout }
    }
}

#[async_trait]
impl MeasurementSink for TimescaleSink {
    #[instrument(skip(self, measurement), fields(topic = %measurement.topic))]
    async fn write(&self, measurement: &Measurement) -> Result<(), StoreError> {
        // One row per message, no batching. The pool keeps connections
        // open across calls and re-acquires after a drop; a dead store
        // surfaces as Unavailable, a hung one as Timeout.
        let query = r#"
            INSERT INTO measurements (ts, topic, value, payload)
            VALUES ($1, $2, $3, $4)
        "#;

        let insert = sqlx::query(query)
            .bind(measurement.ts)
            .bind(&measurement.topic)
            .bind(measurement.value)
            .bind(&measurement.payload)
            .execute(&self.pool);

        match tokio::time::timeout(self.write_timeout, insert).await {
            Ok(Ok(_)) => {
                debug!("Measurement stored");
                Ok(())
            }
            Ok(Err(e)) => Err(StoreError::Unavailable(e)),
            Err(_) => Err(StoreError::Timeout(self.write_timeout)),
        }
    }
}
