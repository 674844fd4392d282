//! The event-log state machine.
//!
//! Folds [`RuntimeEvent`]s into finished [`Span`]s and [`Metric`] samples.
//! The fold owns all mutable state; each event's effect is applied atomically
//! before the next event is looked at.

use std::collections::HashMap;

use evlog_msgparser::{binary, text, Instrument, ParseError, SpanContext, SpanId, TraceId, TracingOp};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::event::{EventSpec, RuntimeEvent};
use crate::model::{Metric, Span, SpanEvent, SpanStatus, TagValue, NO_THREAD};
use crate::store::SpanStore;

/// Thread id charged with user messages recorded on an unknown capability.
const FALLBACK_THREAD: u32 = 1;

/// Everything one event emitted. Spans precede metrics.
#[derive(Debug, Default)]
pub struct Output {
    pub spans: Vec<Span>,
    pub metrics: Vec<Metric>,
}

/// A fatal data error in the event stream.
///
/// Only malformed tracing messages produce this; messages that are simply
/// not tracing-related are skipped. Inconsistencies in the interpreter's own
/// bookkeeping panic instead.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("bad tracing message in event at t={ts}ns: {source}")]
    BadMessage {
        ts: u64,
        #[source]
        source: ParseError,
    },
}

pub struct Interpreter {
    /// Wall-clock nanoseconds corresponding to the log's `t = 0`.
    origin: u64,
    /// Which thread currently runs on each capability.
    thread_map: HashMap<u16, u32>,
    /// Trace context associated with each thread.
    trace_map: HashMap<u32, TraceId>,
    store: SpanStore,
    gc_started_at: u64,
    gc_generation: u64,
    events_processed: u64,
    spans_emitted: u64,
    rng: StdRng,
}

impl Interpreter {
    /// Create an interpreter with an entropy-seeded span-id generator.
    pub fn new(origin: u64) -> Self {
        Self::with_rng(origin, StdRng::from_entropy())
    }

    /// Create an interpreter with a deterministic span-id generator.
    pub fn with_seed(origin: u64, seed: u64) -> Self {
        Self::with_rng(origin, StdRng::seed_from_u64(seed))
    }

    fn with_rng(origin: u64, rng: StdRng) -> Self {
        Interpreter {
            origin,
            thread_map: HashMap::new(),
            trace_map: HashMap::new(),
            store: SpanStore::new(),
            gc_started_at: 0,
            gc_generation: 0,
            events_processed: 0,
            spans_emitted: 0,
            rng,
        }
    }

    pub fn origin(&self) -> u64 {
        self.origin
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn spans_emitted(&self) -> u64 {
        self.spans_emitted
    }

    /// Number of GC windows observed so far.
    pub fn gc_generations(&self) -> u64 {
        self.gc_generation
    }

    /// Number of spans begun but not yet emitted.
    pub fn in_flight(&self) -> usize {
        self.store.len()
    }

    /// Apply one runtime event and collect what it emitted.
    pub fn process(&mut self, event: &RuntimeEvent) -> Result<Output, ProcessError> {
        self.events_processed += 1;

        let now = self.origin + event.ts;
        let thread = event
            .cap
            .and_then(|cap| self.thread_map.get(&cap).copied());
        let trace = thread.and_then(|tid| self.trace_map.get(&tid).copied());

        let mut out = Output::default();
        match &event.spec {
            EventSpec::WallClockTime { sec, nsec } => {
                // The reading was taken at log time `ts`, so the origin is
                // whatever makes `origin + ts` equal that reading.
                self.origin = sec * 1_000_000_000 + u64::from(*nsec) - event.ts;
            }

            EventSpec::CreateThread { thread: new_tid } => {
                let inherited = trace.unwrap_or(TraceId(self.origin));
                self.trace_map.insert(*new_tid, inherited);
                out.metrics
                    .push(Metric::single(Instrument::up_down("threads"), now, 1));
            }

            EventSpec::RunThread { thread: tid } => {
                if let Some(cap) = event.cap {
                    self.thread_map.insert(cap, *tid);
                }
            }

            EventSpec::StopThread {
                thread: tid,
                status,
            } if status.is_terminal() => {
                if let Some(cap) = event.cap {
                    self.thread_map.remove(&cap);
                    self.trace_map.remove(tid);
                    out.metrics
                        .push(Metric::single(Instrument::up_down("threads"), now, -1));
                }
            }
            EventSpec::StopThread { .. } => {}

            EventSpec::StartGc => {
                self.gc_started_at = now;
            }

            EventSpec::EndGc => {
                let window = now.saturating_sub(self.gc_started_at);
                self.gc_generation += 1;

                // Every span live across the window is charged in full.
                for span in self.store.live_spans_mut() {
                    span.gc_nanos += window;
                }

                // The window itself becomes a span rooting its own trace.
                let sid = SpanId(self.rng.next_u64());
                out.spans.push(Span {
                    context: SpanContext {
                        span_id: sid,
                        trace_id: TraceId(sid.0),
                    },
                    parent_id: None,
                    operation: "gc".to_owned(),
                    thread_id: NO_THREAD,
                    started_at: self.gc_started_at,
                    finished_at: now,
                    status: SpanStatus::Ok,
                    tags: HashMap::new(),
                    events: Vec::new(),
                    gc_nanos: window,
                });
                out.metrics
                    .push(Metric::single(Instrument::sum("gc"), now, window as i64));
            }

            EventSpec::HeapLive { live_bytes } => {
                out.metrics.push(Metric::single(
                    Instrument::value("heap_live_bytes"),
                    now,
                    *live_bytes as i64,
                ));
            }

            EventSpec::HeapAllocated { alloc_bytes } => {
                if let Some(cap) = event.cap {
                    out.metrics.push(Metric::single(
                        Instrument::sum(format!("cap_{cap}_heap_alloc_bytes")),
                        now,
                        *alloc_bytes as i64,
                    ));
                }
            }

            EventSpec::Message { text } => {
                let parsed = text::decode(text).map_err(|source| ProcessError::BadMessage {
                    ts: event.ts,
                    source,
                })?;
                if let Some(op) = parsed {
                    self.apply_op(op, thread.unwrap_or(FALLBACK_THREAD), now, trace, &mut out);
                }
            }

            EventSpec::BinaryMessage { payload } => {
                let parsed = binary::decode(payload).map_err(|source| ProcessError::BadMessage {
                    ts: event.ts,
                    source,
                })?;
                if let Some(op) = parsed {
                    self.apply_op(op, thread.unwrap_or(FALLBACK_THREAD), now, trace, &mut out);
                }
            }

            EventSpec::Shutdown
            | EventSpec::CapDelete
            | EventSpec::CapsetDelete
            | EventSpec::Other => {}
        }

        self.spans_emitted += out.spans.len() as u64;
        Ok(out)
    }

    fn apply_op(
        &mut self,
        op: TracingOp,
        tid: u32,
        now: u64,
        trace: Option<TraceId>,
        out: &mut Output,
    ) {
        match op {
            TracingOp::BeginSpan { serial, name } => {
                match self.store.lookup_serial(serial) {
                    None => {
                        let parent_id = self.store.current_span(tid);
                        let sid = self.store.invent_sid(serial, &mut self.rng);
                        self.store.create(
                            sid,
                            Span {
                                context: SpanContext {
                                    span_id: sid,
                                    trace_id: trace.unwrap_or(TraceId::SENTINEL),
                                },
                                parent_id,
                                operation: name,
                                thread_id: tid,
                                started_at: now,
                                finished_at: 0,
                                status: SpanStatus::Ok,
                                tags: HashMap::new(),
                                events: Vec::new(),
                                gc_nanos: 0,
                            },
                        );
                    }
                    Some(sid) => {
                        // The serial is still mapped: either its previous
                        // span never saw an End, or an orphan End left a
                        // placeholder. Ship it out with the fresh metadata;
                        // finished_at stays whatever it was.
                        self.store.modify(sid, |span| {
                            span.operation = name;
                            span.started_at = now;
                            span.thread_id = tid;
                        });
                        out.spans.push(self.store.emit(serial, sid));
                    }
                }
            }

            TracingOp::EndSpan { serial } => match self.store.lookup_serial(serial) {
                None => {
                    // End before Begin. Park a placeholder under this serial;
                    // it is only emitted if a later Begin reuses the serial.
                    let parent_id = self.store.current_span(tid);
                    let sid = self.store.invent_sid(serial, &mut self.rng);
                    self.store.create(
                        sid,
                        Span {
                            context: SpanContext {
                                span_id: sid,
                                trace_id: trace.unwrap_or(TraceId::SENTINEL),
                            },
                            parent_id,
                            operation: String::new(),
                            thread_id: tid,
                            started_at: 0,
                            finished_at: now,
                            status: SpanStatus::Ok,
                            tags: HashMap::new(),
                            events: Vec::new(),
                            gc_nanos: 0,
                        },
                    );
                }
                Some(sid) => {
                    self.store.modify(sid, |span| span.finished_at = now);
                    out.spans.push(self.store.emit(serial, sid));
                }
            },

            TracingOp::SetParent { serial, context } => {
                let sid = self.known_serial(serial, "set parent");
                self.store.modify(sid, |span| {
                    span.parent_id = Some(context.span_id);
                    span.context.trace_id = context.trace_id;
                });
                self.trace_map.insert(tid, context.trace_id);
            }

            TracingOp::SetTraceId { serial, trace_id } => {
                let sid = self.known_serial(serial, "set traceid");
                self.store
                    .modify(sid, |span| span.context.trace_id = trace_id);
                self.trace_map.insert(tid, trace_id);
            }

            TracingOp::SetSpanId { serial, span_id } => {
                let sid = self.known_serial(serial, "set spanid");
                // Rewrites the span's announced id only; the store keeps its
                // original key, so serial lookups still resolve.
                self.store.modify(sid, |span| span.context.span_id = span_id);
            }

            TracingOp::Tag { serial, key, value } => {
                let sid = self.known_serial(serial, "set tag");
                self.store.modify(sid, |span| {
                    span.tags.insert(key, TagValue::Str(value));
                });
            }

            TracingOp::Event {
                serial,
                name,
                value,
            } => {
                let sid = self.known_serial(serial, "add event");
                self.store.modify(sid, |span| {
                    span.events.insert(0, SpanEvent { ts: now, name, value });
                });
            }

            TracingOp::Metric { instrument, value } => {
                out.metrics.push(Metric::single(instrument, now, value));
            }
        }
    }

    fn known_serial(&self, serial: u64, what: &str) -> SpanId {
        self.store.lookup_serial(serial).unwrap_or_else(|| {
            panic!("tracing producer bug: {what} for unknown span serial {serial}")
        })
    }
}
