use async_trait::async_trait;

use crate::domain::Measurement;
use crate::error::StoreError;

#[async_trait]
pub trait MeasurementSink: Send + Sync {
    /// Persist one measurement as one row. Each call is its own atomic
    /// unit; on success the row is durable and visible to readers.
    async fn write(&self, measurement: &Measurement) -> Result<(), StoreError>;
}
