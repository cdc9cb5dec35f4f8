//! Inbound Ports (Driving Ports)
//!
//! `DataRefReader` is the only API applications call directly. Both receive
//! models implement it, so callers are written once against the trait.

use async_trait::async_trait;

use crate::domain::{ClientError, DataRefName, DataRefType, DataRefValue};

/// Typed dataref reads.
///
/// Each call is exactly one request/response attempt bounded by the read
/// timeout. Nothing is retried; polling loops belong to the caller.
#[async_trait]
pub trait DataRefReader: Send + Sync {
    /// Read `name` declared as `data_type`.
    async fn read(
        &self,
        name: &DataRefName,
        data_type: DataRefType,
    ) -> Result<DataRefValue, ClientError>;

    async fn read_int(&self, name: &DataRefName) -> Result<i64, ClientError> {
        let value = self.read(name, DataRefType::Int).await?;
        value.as_int().ok_or(ClientError::TypeMismatch {
            expected: DataRefType::Int,
            actual: value.kind(),
        })
    }

    async fn read_float(&self, name: &DataRefName) -> Result<f32, ClientError> {
        let value = self.read(name, DataRefType::Float).await?;
        value.as_float().ok_or(ClientError::TypeMismatch {
            expected: DataRefType::Float,
            actual: value.kind(),
        })
    }

    async fn read_int_array(&self, name: &DataRefName) -> Result<Vec<i64>, ClientError> {
        let value = self.read(name, DataRefType::IntArray).await?;
        let actual = value.kind();
        value.into_int_array().ok_or(ClientError::TypeMismatch {
            expected: DataRefType::IntArray,
            actual,
        })
    }

    async fn read_float_array(&self, name: &DataRefName) -> Result<Vec<f32>, ClientError> {
        let value = self.read(name, DataRefType::FloatArray).await?;
        let actual = value.kind();
        value.into_float_array().ok_or(ClientError::TypeMismatch {
            expected: DataRefType::FloatArray,
            actual,
        })
    }
}
