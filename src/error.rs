//! Crate-wide error handling
//!
//! Configuration problems keep the pipeline in a not-renderable state instead
//! of panicking; capacity problems refuse the offending write and leave prior
//! contents intact.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrassError {
    #[error("Region '{region}' overflow: {requested} elements into {capacity} reserved")]
    RegionOverflow {
        region: String,
        requested: usize,
        capacity: usize,
    },

    #[error("Unknown buffer region: {0}")]
    UnknownRegion(String),

    #[error("Invalid source geometry: {0}")]
    InvalidGeometry(String),

    #[error("Pipeline is not renderable: {0}")]
    NotRenderable(String),

    #[error("Failed to map GPU buffer: {0}")]
    BufferMapping(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Type alias for grass renderer operation results
pub type GrassResult<T> = Result<T, GrassError>;

/// Helper trait to attach a component context to foreign errors
pub trait GrassErrorContext<T> {
    fn grass_context(self, context: &str) -> GrassResult<T>;
}

impl<T, E> GrassErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn grass_context(self, context: &str) -> GrassResult<T> {
        self.map_err(|e| GrassError::Internal(format!("{}: {}", context, e)))
    }
}

/// Create a buffer mapping error
pub fn buffer_mapping_error(detail: impl Into<String>) -> GrassError {
    GrassError::BufferMapping(detail.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GrassError::RegionOverflow {
            region: "ShadowDraw".to_string(),
            requested: 2,
            capacity: 1,
        };
        assert!(err.to_string().contains("ShadowDraw"));
        assert!(err.to_string().contains("2 elements into 1 reserved"));
    }

    #[test]
    fn test_context_helper() {
        let result: Result<(), std::fmt::Error> = Err(std::fmt::Error);
        let wrapped = result.grass_context("formatting draw args");
        match wrapped {
            Err(GrassError::Internal(msg)) => assert!(msg.starts_with("formatting draw args")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
