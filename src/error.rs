// src/error.rs
//! Unified error handling for capture sessions
//!
//! Every failure a session can hit is expressed as a [`CaptureError`]. The
//! variants follow the propagation policy of the session: connection setup
//! failures are fatal, descriptive and optional-capability failures are
//! recovered where they happen, and export failures end the session while
//! handing the captured frames back to the caller.

use crate::acquisition::SensorFrame;
use crate::hal::LinkError;
use std::fmt;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Unified error type for capture sessions
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No device answered at the requested address within the discovery timeout
    #[error("[DEVICE] No device found at {address} within {timeout:?} ({context})")]
    DeviceNotFound {
        address: String,
        timeout: Duration,
        context: ErrorContext,
    },

    /// An optional device feature is not available
    #[error("[CAPABILITY] {capability} is not supported by the device ({context})")]
    UnsupportedCapability {
        capability: String,
        context: ErrorContext,
    },

    /// A single descriptive query (name, battery, firmware) failed
    #[error("[METADATA] Could not read {field}: {source} ({context})")]
    MetadataRead {
        field: &'static str,
        #[source]
        source: LinkError,
        context: ErrorContext,
    },

    /// Device link failure during connection setup or streaming activation
    #[error("[LINK] {source} ({context})")]
    Link {
        #[source]
        source: LinkError,
        context: ErrorContext,
    },

    /// The exporter failed to persist the session
    ///
    /// The drained frames travel with the error so the caller can retry.
    #[error("[EXPORT] Failed to export {} frames: {source} ({context})", .frames.len())]
    Export {
        #[source]
        source: crate::export::ExportError,
        frames: Vec<SensorFrame>,
        context: ErrorContext,
    },

    /// Invalid configuration
    #[error("[CONFIG] Configuration error in {component}: {reason}")]
    Configuration { component: String, reason: String },

    /// The session was stopped before the sequence completed
    #[error("[SESSION] Session cancelled during {during}")]
    Cancelled { during: String },
}

impl CaptureError {
    /// Whether the session can keep running after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CaptureError::UnsupportedCapability { .. } | CaptureError::MetadataRead { .. }
        )
    }

    /// Build a configuration error
    pub fn configuration(component: &str, reason: impl Into<String>) -> Self {
        CaptureError::Configuration {
            component: component.to_string(),
            reason: reason.into(),
        }
    }
}

/// Error context for debugging and analysis
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
        }
    }

    /// Create error context with file and line information
    pub fn with_location(
        component: &str,
        operation: &str,
        file: &'static str,
        line: u32,
    ) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file, self.line) {
            (Some(file), Some(line)) => {
                write!(f, "{}::{} at {}:{}", self.component, self.operation, file, line)
            }
            _ => write!(f, "{}::{}", self.component, self.operation),
        }
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Convenience trait for attaching context to device link results
pub trait IntoCaptureError<T> {
    fn capture_err(self, component: &str, operation: &str) -> CaptureResult<T>;
}

impl<T> IntoCaptureError<T> for Result<T, LinkError> {
    fn capture_err(self, component: &str, operation: &str) -> CaptureResult<T> {
        self.map_err(|source| CaptureError::Link {
            source,
            context: ErrorContext::new(component, operation),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("session", "connect");
        assert_eq!(context.component, "session");
        assert_eq!(context.operation, "connect");
        assert!(context.timestamp <= SystemTime::now());
        assert_eq!(context.to_string(), "session::connect");
    }

    #[test]
    fn test_error_context_macro_records_location() {
        let context = error_context!("session", "open");
        assert!(context.file.unwrap().ends_with("error.rs"));
        assert!(context.line.unwrap() > 0);
    }

    #[test]
    fn test_device_not_found_display() {
        let err = CaptureError::DeviceNotFound {
            address: "AA:BB:CC:DD:EE:FF".to_string(),
            timeout: Duration::from_secs(10),
            context: ErrorContext::new("session", "connect"),
        };

        let display = err.to_string();
        assert!(display.contains("AA:BB:CC:DD:EE:FF"));
        assert!(display.contains("10s"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_recoverable_classification() {
        let unsupported = CaptureError::UnsupportedCapability {
            capability: "battery notifications".to_string(),
            context: ErrorContext::new("session", "enable_optional_notifications"),
        };
        let metadata = CaptureError::MetadataRead {
            field: "battery",
            source: LinkError::Disconnected,
            context: ErrorContext::new("session", "read_metadata"),
        };

        assert!(unsupported.is_recoverable());
        assert!(metadata.is_recoverable());
        assert!(!CaptureError::configuration("session", "no classes").is_recoverable());
    }

    #[test]
    fn test_into_capture_error_trait() {
        let result: Result<(), LinkError> = Err(LinkError::Transport("gatt write failed".into()));

        match result.capture_err("session", "activate_streaming").unwrap_err() {
            CaptureError::Link { source, context } => {
                assert!(source.to_string().contains("gatt write failed"));
                assert_eq!(context.operation, "activate_streaming");
            }
            other => panic!("Expected link error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CaptureError>();
    }
}
