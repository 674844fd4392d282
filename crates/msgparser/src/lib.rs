//! Parser and encoder for the `ot2` user-tracing message protocol.
//!
//! Instrumented programs smuggle tracing commands through their runtime's
//! event log as user messages. Two framings carry the same command algebra:
//! a textual one (`ot2 begin span 7 handle request`) and a binary one used
//! by hot paths. This crate decodes both into a typed [`TracingOp`] and
//! encodes ops back into either framing.
//!
//! # Binary framing
//!
//! Each message starts with a 32-bit little-endian header whose low 24 bits
//! are the magic marker (the ASCII bytes `ot2`) and whose high 8 bits are the
//! message tag. A header with the wrong magic is not a tracing message at all;
//! a matching magic with an unknown tag is a protocol error.
//!
//! | Tag | Message            | Body (little-endian)                                      |
//! |-----|--------------------|-----------------------------------------------------------|
//! | 1   | BEGIN_SPAN         | `serial:u64`, `name:rest`                                 |
//! | 2   | END_SPAN           | `serial:u64`                                              |
//! | 3   | TAG                | `serial:u64`, `klen:u32`, `vlen:u32`, `k:klen`, `v:vlen`  |
//! | 4   | EVENT              | same as TAG                                               |
//! | 5   | SET_PARENT_CONTEXT | `serial:u64`, `span:u64`, `trace:u64`                     |
//! | 6   | SET_TRACE_ID       | `serial:u64`, `trace:u64`                                 |
//! | 7   | SET_SPAN_ID        | `serial:u64`, `span:u64`                                  |
//! | 8   | METRIC_CAPTURE     | `tag:i8`, `value:i64`, `name:rest`                        |
//!
//! All strings are UTF-8; malformed UTF-8 fails the decode.
//!
//! # Usage
//!
//! ```
//! use evlog_msgparser::{binary, text, TracingOp};
//!
//! let op = text::decode("ot2 begin span 100 handle request").unwrap().unwrap();
//! assert!(matches!(op, TracingOp::BeginSpan { serial: 100, .. }));
//!
//! let bytes = binary::encode(&op);
//! assert_eq!(binary::decode(&bytes).unwrap(), Some(op));
//! ```

pub mod binary;
mod reader;
pub mod text;
pub mod types;
mod writer;

pub use binary::OTEL_MAGIC;
pub use types::{
    Instrument, InstrumentKind, ParseError, SpanContext, SpanId, TraceId, TracingOp,
};
pub use writer::MsgBuffer;
