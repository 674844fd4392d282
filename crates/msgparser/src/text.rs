//! The textual framing of the tracing protocol.
//!
//! Messages are whitespace-tokenized. Serials are decimal, identifiers are
//! unprefixed hex, and trailing name/value fields may span multiple tokens
//! (re-joined with single spaces).

use crate::types::{
    Instrument, InstrumentKind, ParseError, SpanContext, SpanId, TraceId, TracingOp,
};

/// Decode a textual user message.
///
/// Returns `Ok(None)` for messages that do not start with the `ot2`
/// discriminator; those are not tracing messages. A message that does start
/// with `ot2` but matches no production is a hard error.
pub fn decode(message: &str) -> Result<Option<TracingOp>, ParseError> {
    let tokens: Vec<&str> = message.split_whitespace().collect();
    match tokens.split_first() {
        Some((&"ot2", rest)) => decode_op(message, rest).map(Some),
        _ => Ok(None),
    }
}

fn decode_op(message: &str, tokens: &[&str]) -> Result<TracingOp, ParseError> {
    let malformed = || ParseError::Malformed(message.to_owned());

    match tokens {
        ["begin", "span", serial, name @ ..] => Ok(TracingOp::BeginSpan {
            serial: dec(serial).ok_or_else(malformed)?,
            name: name.join(" "),
        }),
        ["end", "span", serial] => Ok(TracingOp::EndSpan {
            serial: dec(serial).ok_or_else(malformed)?,
        }),
        ["set", "tag", serial, key, value @ ..] => Ok(TracingOp::Tag {
            serial: dec(serial).ok_or_else(malformed)?,
            key: (*key).to_owned(),
            value: value.join(" "),
        }),
        ["add", "event", serial, key, value @ ..] => Ok(TracingOp::Event {
            serial: dec(serial).ok_or_else(malformed)?,
            name: (*key).to_owned(),
            value: value.join(" "),
        }),
        ["set", "traceid", serial, trace] => Ok(TracingOp::SetTraceId {
            serial: dec(serial).ok_or_else(malformed)?,
            trace_id: TraceId::from_hex(trace).ok_or_else(malformed)?,
        }),
        ["set", "spanid", serial, span] => Ok(TracingOp::SetSpanId {
            serial: dec(serial).ok_or_else(malformed)?,
            span_id: SpanId::from_hex(span).ok_or_else(malformed)?,
        }),
        ["set", "parent", serial, trace, parent] => Ok(TracingOp::SetParent {
            serial: dec(serial).ok_or_else(malformed)?,
            context: SpanContext {
                span_id: SpanId::from_hex(parent).ok_or_else(malformed)?,
                trace_id: TraceId::from_hex(trace).ok_or_else(malformed)?,
            },
        }),
        ["metric", kind, name, value] => Ok(TracingOp::Metric {
            instrument: Instrument {
                kind: InstrumentKind::from_token(kind).ok_or_else(malformed)?,
                name: (*name).to_owned(),
            },
            value: value.parse().map_err(|_| malformed())?,
        }),
        _ => Err(malformed()),
    }
}

fn dec(token: &str) -> Option<u64> {
    token.parse().ok()
}

/// Render an operation in the textual framing. The decoder accepts every
/// rendered message.
pub fn render(op: &TracingOp) -> String {
    match op {
        TracingOp::BeginSpan { serial, name } => format!("ot2 begin span {serial} {name}"),
        TracingOp::EndSpan { serial } => format!("ot2 end span {serial}"),
        TracingOp::Tag { serial, key, value } => format!("ot2 set tag {serial} {key} {value}"),
        TracingOp::Event {
            serial,
            name,
            value,
        } => format!("ot2 add event {serial} {name} {value}"),
        TracingOp::SetTraceId { serial, trace_id } => {
            format!("ot2 set traceid {serial} {trace_id}")
        }
        TracingOp::SetSpanId { serial, span_id } => format!("ot2 set spanid {serial} {span_id}"),
        TracingOp::SetParent { serial, context } => format!(
            "ot2 set parent {serial} {} {}",
            context.trace_id, context.span_id
        ),
        TracingOp::Metric { instrument, value } => format!(
            "ot2 metric {} {} {value}",
            instrument.kind.token(),
            instrument.name
        ),
    }
}
