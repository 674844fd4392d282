//! In-flight span bookkeeping.

use std::collections::HashMap;

use evlog_msgparser::SpanId;
use rand::RngCore;

use crate::model::Span;

/// Index of spans that have begun but not yet been emitted.
///
/// Live spans satisfy a bijection: a span is present in `spans` exactly when
/// one serial maps to its id in `serial2sid`, and both entries leave together
/// at emission. `thread2sid` tracks the top of each thread's span stack; the
/// stack itself is threaded through span parent links rather than stored.
#[derive(Debug, Default)]
pub(crate) struct SpanStore {
    spans: HashMap<SpanId, Span>,
    serial2sid: HashMap<u64, SpanId>,
    thread2sid: HashMap<u32, SpanId>,
}

impl SpanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_serial(&self, serial: u64) -> Option<SpanId> {
        self.serial2sid.get(&serial).copied()
    }

    /// The span currently on top of a thread's stack.
    pub fn current_span(&self, thread_id: u32) -> Option<SpanId> {
        self.thread2sid.get(&thread_id).copied()
    }

    /// Draw a fresh span id for a serial.
    ///
    /// Panics if the serial is already mapped; callers dispatch on
    /// [`SpanStore::lookup_serial`] first.
    pub fn invent_sid(&mut self, serial: u64, rng: &mut impl RngCore) -> SpanId {
        let sid = SpanId(rng.next_u64());
        let prior = self.serial2sid.insert(serial, sid);
        assert!(
            prior.is_none(),
            "span store corrupted: serial {serial} already mapped to {}",
            prior.unwrap(),
        );
        sid
    }

    /// Insert a span and make it the top of its thread's stack.
    ///
    /// The prior top is clobbered; callers that want a stack record it as the
    /// new span's parent before calling.
    pub fn create(&mut self, sid: SpanId, span: Span) {
        self.thread2sid.insert(span.thread_id, sid);
        self.spans.insert(sid, span);
    }

    /// Remove a finished span, unmapping its serial and popping its thread's
    /// stack back to the span's parent.
    ///
    /// Panics when the serial/span pair is inconsistent; that is an
    /// interpreter bug, not a data problem.
    pub fn emit(&mut self, serial: u64, sid: SpanId) -> Span {
        let mapped = self.serial2sid.remove(&serial);
        assert_eq!(
            mapped,
            Some(sid),
            "span store corrupted: serial {serial} mapped to {mapped:?}, emitting {sid}",
        );
        let span = self
            .spans
            .remove(&sid)
            .unwrap_or_else(|| panic!("span store corrupted: no span for id {sid}"));
        match span.parent_id {
            Some(parent) => {
                self.thread2sid.insert(span.thread_id, parent);
            }
            None => {
                self.thread2sid.remove(&span.thread_id);
            }
        }
        span
    }

    /// Adjust a span in place; silently a no-op if the id is unknown.
    pub fn modify(&mut self, sid: SpanId, f: impl FnOnce(&mut Span)) {
        if let Some(span) = self.spans.get_mut(&sid) {
            f(span);
        }
    }

    pub fn live_spans_mut(&mut self) -> impl Iterator<Item = &mut Span> {
        self.spans.values_mut()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty() && self.serial2sid.is_empty() && self.thread2sid.is_empty()
    }
}
