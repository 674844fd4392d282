use std::collections::HashMap;

use evlog_msgparser::{Instrument, SpanContext, SpanId};

/// Thread id carried by spans that belong to no runtime thread (GC windows).
pub const NO_THREAD: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanStatus {
    #[default]
    Ok,
    Error,
}

/// A tag value. The textual framing only produces strings; integer tags are
/// reserved for exporter-side enrichment.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Str(String),
    Int(i64),
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Str(value.to_owned())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Str(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}

/// A timestamped annotation within a span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanEvent {
    pub ts: u64,
    pub name: String,
    pub value: String,
}

/// A finished (or in-flight) interval in a distributed trace.
///
/// Timestamps are wall-clock nanoseconds. `events` is stored
/// most-recent-first; exporters that need chronological order reverse it.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub context: SpanContext,
    pub parent_id: Option<SpanId>,
    pub operation: String,
    pub thread_id: u32,
    pub started_at: u64,
    pub finished_at: u64,
    pub status: SpanStatus,
    pub tags: HashMap<String, TagValue>,
    pub events: Vec<SpanEvent>,
    /// Nanoseconds of GC activity that overlapped this span while it was
    /// live. Every concurrently live span is charged the full window.
    pub gc_nanos: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricPoint {
    pub ts: u64,
    pub value: i64,
}

/// A batch of samples for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub instrument: Instrument,
    pub points: Vec<MetricPoint>,
}

impl Metric {
    pub fn single(instrument: Instrument, ts: u64, value: i64) -> Self {
        Metric {
            instrument,
            points: vec![MetricPoint { ts, value }],
        }
    }
}
