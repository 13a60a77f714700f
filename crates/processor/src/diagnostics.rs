//! Write-only diagnostics collected while processing a document.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

/// The processor operation a diagnostics entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operation {
    EncryptContent,
    DecryptContent,
}

/// Timing and volume of a single completed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OperationDiagnostics {
    pub operation: Operation,
    /// Milliseconds since the Unix epoch at which the operation started.
    pub start_time_ms: u64,
    pub duration_ms: u64,
    /// Number of properties encrypted or decrypted.
    pub properties_count: usize,
}

/// Diagnostics sink passed into every processor call.
///
/// The processor only appends to it. Callers read the collected entries
/// afterwards, typically to attach them to their own request diagnostics.
#[derive(Debug, Default)]
pub struct DiagnosticsContext {
    entries: Vec<OperationDiagnostics>,
    open: Option<(Operation, SystemTime, Instant)>,
}

impl DiagnosticsContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin(&mut self, operation: Operation) {
        self.open = Some((operation, SystemTime::now(), Instant::now()));
    }

    pub(crate) fn end(&mut self, properties_count: usize) {
        let Some((operation, started, clock)) = self.open.take() else {
            return;
        };
        let duration = clock.elapsed();
        debug!(
            ?operation,
            properties_count,
            duration_ms = duration.as_millis() as u64,
            "operation completed"
        );
        self.entries.push(OperationDiagnostics {
            operation,
            start_time_ms: started
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_millis() as u64,
            duration_ms: duration.as_millis() as u64,
            properties_count,
        });
    }

    /// Completed operations, oldest first.
    pub fn entries(&self) -> &[OperationDiagnostics] {
        &self.entries
    }

    /// Render the collected entries as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "EncryptionDiagnostics": self.entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_completed_operations() {
        let mut d = DiagnosticsContext::new();
        d.begin(Operation::EncryptContent);
        d.end(2);
        d.begin(Operation::DecryptContent);
        d.end(1);

        let entries = d.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, Operation::EncryptContent);
        assert_eq!(entries[0].properties_count, 2);
        assert_eq!(entries[1].operation, Operation::DecryptContent);
    }

    #[test]
    fn unfinished_operation_is_not_recorded() {
        let mut d = DiagnosticsContext::new();
        d.begin(Operation::EncryptContent);
        assert!(d.entries().is_empty());
        d.end(0);
        d.end(0);
        assert_eq!(d.entries().len(), 1);
    }

    #[test]
    fn json_rendering() {
        let mut d = DiagnosticsContext::new();
        d.begin(Operation::DecryptContent);
        d.end(3);
        let json = d.to_json();
        let first = &json["EncryptionDiagnostics"][0];
        assert_eq!(first["Operation"], "DecryptContent");
        assert_eq!(first["PropertiesCount"], 3);
    }
}
