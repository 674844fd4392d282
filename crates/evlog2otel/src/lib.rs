//! Converts a managed runtime's event log into distributed-tracing output.
//!
//! The event log is a time-stamped stream of runtime events (thread
//! scheduling, GC windows, heap statistics, user messages). This crate folds
//! that stream through a single-threaded state machine which parses the
//! embedded `ot2` tracing sublanguage (see `evlog-msgparser`), correlates
//! ephemeral per-callsite serials with stable span identifiers, attributes GC
//! time to concurrently live spans, and hands finished spans and metric
//! samples to exporter sinks.
//!
//! Ingestion runs in one of two modes: a batch fold over a closed log file
//! (events are globally sorted by timestamp first), or a tailing loop over a
//! handle such as a named pipe, where the log is decoded incrementally and
//! end-of-file is governed by an [`EofPolicy`].
//!
//! # Usage
//!
//! ```no_run
//! use evlog2otel::{run, Source};
//! # use evlog2otel::{EventDecoder, EventLogSource, DecodeStep, ExportResult,
//! #     Metric, RuntimeEvent, Span, SpanExporter, MetricExporter};
//! # struct Fmt;
//! # struct Dec;
//! # impl EventDecoder for Dec {
//! #     fn step(&mut self, _input: Option<&[u8]>) -> DecodeStep { DecodeStep::Done }
//! # }
//! # impl EventLogSource for Fmt {
//! #     type Decoder = Dec;
//! #     fn decode_file(&self, _path: &std::path::Path) -> Result<Vec<RuntimeEvent>, String> {
//! #         Ok(vec![])
//! #     }
//! #     fn decoder(&self) -> Dec { Dec }
//! # }
//! # struct Sink;
//! # impl SpanExporter for Sink {
//! #     fn export(&mut self, _batch: &[Span]) -> ExportResult { ExportResult::Success }
//! # }
//! # impl MetricExporter for Sink {
//! #     fn export(&mut self, _batch: &[Metric]) -> ExportResult { ExportResult::Success }
//! # }
//!
//! let mut spans = Sink;
//! let mut metrics = Sink;
//! let origin_ns = 1_700_000_000_000_000_000;
//!
//! // A `.pipe` suffix selects the tailing handle mode.
//! let source = Source::from_path("app.eventlog").unwrap();
//! run(origin_ns, &mut spans, &mut metrics, source, &Fmt).unwrap();
//! ```

pub mod driver;
pub mod event;
pub mod export;
pub mod interp;
pub mod model;
mod store;

pub use driver::{run, run_with, EofPolicy, Source};
pub use event::{
    DecodeStep, EventDecoder, EventLogSource, EventSpec, RuntimeEvent, ThreadStopStatus,
};
pub use export::{ExportResult, MetricExporter, SpanExporter};
pub use interp::{Interpreter, Output, ProcessError};
pub use model::{Metric, MetricPoint, Span, SpanEvent, SpanStatus, TagValue};

pub use evlog_msgparser::{Instrument, InstrumentKind, SpanContext, SpanId, TraceId};
