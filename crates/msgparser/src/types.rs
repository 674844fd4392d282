// === Error types ===

/// Errors that can occur while decoding a tracing message.
///
/// A payload that is recognizably *not* a tracing message (no `ot2` prefix,
/// wrong binary magic) is not an error; the decoders report it as `None`.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected end of message data")]
    UnexpectedEof,

    #[error("invalid UTF-8 in message payload")]
    InvalidUtf8,

    #[error("unknown message type tag: {0}")]
    UnknownMessageType(u8),

    #[error("unknown instrument tag: {0}")]
    UnknownInstrument(i8),

    #[error("malformed tracing message: {0:?}")]
    Malformed(String),
}

// === Identifiers ===

/// A 64-bit trace identifier. Zero is a legal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(pub u64);

/// A 64-bit span identifier. Zero is a legal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(pub u64);

impl TraceId {
    /// The trace id assigned to spans that finish without ever having been
    /// associated with a trace.
    pub const SENTINEL: TraceId = TraceId(42);

    /// Parse from unprefixed hex, the form the textual framing carries.
    pub fn from_hex(s: &str) -> Option<Self> {
        u64::from_str_radix(s, 16).ok().map(TraceId)
    }
}

impl SpanId {
    pub fn from_hex(s: &str) -> Option<Self> {
        u64::from_str_radix(s, 16).ok().map(SpanId)
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::fmt::Display for SpanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A span's identity within its trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanContext {
    pub span_id: SpanId,
    pub trace_id: TraceId,
}

// === Instruments ===

/// The kind of a metric instrument.
///
/// The wire tag bytes and textual tokens here are shared with the
/// runtime-side emitter and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum InstrumentKind {
    UpDownSumObserver = 1,
    SumObserver = 2,
    ValueObserver = 3,
}

impl InstrumentKind {
    pub fn from_tag(tag: i8) -> Option<Self> {
        match tag {
            1 => Some(Self::UpDownSumObserver),
            2 => Some(Self::SumObserver),
            3 => Some(Self::ValueObserver),
            _ => None,
        }
    }

    pub fn tag(self) -> i8 {
        self as i8
    }

    /// The token naming this kind in the textual framing.
    pub fn token(self) -> &'static str {
        match self {
            Self::UpDownSumObserver => "updown",
            Self::SumObserver => "sum",
            Self::ValueObserver => "value",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "updown" => Some(Self::UpDownSumObserver),
            "sum" => Some(Self::SumObserver),
            "value" => Some(Self::ValueObserver),
            _ => None,
        }
    }
}

/// A named, typed metric source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub kind: InstrumentKind,
    pub name: String,
}

impl Instrument {
    pub fn up_down(name: impl Into<String>) -> Self {
        Instrument {
            kind: InstrumentKind::UpDownSumObserver,
            name: name.into(),
        }
    }

    pub fn sum(name: impl Into<String>) -> Self {
        Instrument {
            kind: InstrumentKind::SumObserver,
            name: name.into(),
        }
    }

    pub fn value(name: impl Into<String>) -> Self {
        Instrument {
            kind: InstrumentKind::ValueObserver,
            name: name.into(),
        }
    }
}

// === Tracing operations ===

/// A decoded tracing command.
///
/// `serial` is the ephemeral identifier chosen by the emitting code; it is
/// only meaningful between a `BeginSpan` and its matching `EndSpan` and is
/// reused freely across the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub enum TracingOp {
    BeginSpan { serial: u64, name: String },
    EndSpan { serial: u64 },
    Tag { serial: u64, key: String, value: String },
    Event { serial: u64, name: String, value: String },
    SetParent { serial: u64, context: SpanContext },
    SetTraceId { serial: u64, trace_id: TraceId },
    SetSpanId { serial: u64, span_id: SpanId },
    Metric { instrument: Instrument, value: i64 },
}
