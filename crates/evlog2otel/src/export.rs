//! Exporter contracts.
//!
//! Exporters are synchronous sinks invoked from the driver's thread. The
//! driver ignores export results and never retries; shutdown is the caller's
//! responsibility.

use crate::model::{Metric, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportResult {
    Success,
    Failure,
}

pub trait SpanExporter {
    fn export(&mut self, batch: &[Span]) -> ExportResult;

    fn shutdown(&mut self) {}
}

pub trait MetricExporter {
    fn export(&mut self, batch: &[Metric]) -> ExportResult;

    fn shutdown(&mut self) {}
}
