use bytes::{BufMut, Bytes, BytesMut};

use crate::binary;
use crate::types::TracingOp;

/// A buffer for encoding binary tracing messages.
pub struct MsgBuffer {
    buf: BytesMut,
}

impl MsgBuffer {
    pub fn with_capacity(size: usize) -> Self {
        MsgBuffer {
            buf: BytesMut::with_capacity(size),
        }
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    /// Writes the 32-bit message header for the given tag.
    pub fn header(&mut self, tag: u8) {
        self.buf
            .put_u32_le(binary::OTEL_MAGIC | u32::from(tag) << 24);
    }

    pub fn u64(&mut self, u: u64) {
        self.buf.put_u64_le(u);
    }

    pub fn u32(&mut self, u: u32) {
        self.buf.put_u32_le(u);
    }

    pub fn i64(&mut self, i: i64) {
        self.buf.put_i64_le(i);
    }

    pub fn i8(&mut self, i: i8) {
        self.buf.put_i8(i);
    }

    /// Writes a string's raw bytes, with no length prefix.
    pub fn str(&mut self, s: &str) {
        self.buf.reserve(s.len());
        self.buf.put_slice(s.as_bytes());
    }

    /// Writes a u32-length-prefixed string.
    pub fn sized_str(&mut self, s: &str) {
        self.u32(s.len() as u32);
        self.str(s);
    }
}

/// Encode an operation in the binary framing.
pub fn encode(op: &TracingOp) -> Bytes {
    let mut eb = MsgBuffer::with_capacity(32);
    match op {
        TracingOp::BeginSpan { serial, name } => {
            eb.header(binary::BEGIN_SPAN);
            eb.u64(*serial);
            eb.str(name);
        }
        TracingOp::EndSpan { serial } => {
            eb.header(binary::END_SPAN);
            eb.u64(*serial);
        }
        TracingOp::Tag { serial, key, value } => {
            eb.header(binary::TAG);
            eb.u64(*serial);
            eb.u32(key.len() as u32);
            eb.u32(value.len() as u32);
            eb.str(key);
            eb.str(value);
        }
        TracingOp::Event {
            serial,
            name,
            value,
        } => {
            eb.header(binary::EVENT);
            eb.u64(*serial);
            eb.u32(name.len() as u32);
            eb.u32(value.len() as u32);
            eb.str(name);
            eb.str(value);
        }
        TracingOp::SetParent { serial, context } => {
            eb.header(binary::SET_PARENT_CONTEXT);
            eb.u64(*serial);
            eb.u64(context.span_id.0);
            eb.u64(context.trace_id.0);
        }
        TracingOp::SetTraceId { serial, trace_id } => {
            eb.header(binary::SET_TRACE_ID);
            eb.u64(*serial);
            eb.u64(trace_id.0);
        }
        TracingOp::SetSpanId { serial, span_id } => {
            eb.header(binary::SET_SPAN_ID);
            eb.u64(*serial);
            eb.u64(span_id.0);
        }
        TracingOp::Metric { instrument, value } => {
            eb.header(binary::METRIC_CAPTURE);
            eb.i8(instrument.kind.tag());
            eb.i64(*value);
            eb.str(&instrument.name);
        }
    }
    eb.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Instrument, SpanContext, SpanId, TraceId};

    fn sample_ops() -> Vec<TracingOp> {
        vec![
            TracingOp::BeginSpan {
                serial: 100,
                name: "handle request".to_owned(),
            },
            TracingOp::BeginSpan {
                serial: 0,
                name: String::new(),
            },
            TracingOp::EndSpan { serial: u64::MAX },
            TracingOp::Tag {
                serial: 5,
                key: "color".to_owned(),
                value: "blau".to_owned(),
            },
            TracingOp::Tag {
                serial: 5,
                key: String::new(),
                value: String::new(),
            },
            TracingOp::Event {
                serial: 6,
                name: "retry".to_owned(),
                value: "1".to_owned(),
            },
            TracingOp::SetParent {
                serial: 7,
                context: SpanContext {
                    span_id: SpanId(0xbb),
                    trace_id: TraceId(0xaa),
                },
            },
            TracingOp::SetTraceId {
                serial: 8,
                trace_id: TraceId(0),
            },
            TracingOp::SetSpanId {
                serial: 9,
                span_id: SpanId(u64::MAX),
            },
            TracingOp::Metric {
                instrument: Instrument::value("heap_live_bytes"),
                value: i64::MIN,
            },
            TracingOp::Metric {
                instrument: Instrument::up_down("threads"),
                value: -1,
            },
        ]
    }

    #[test]
    fn test_encode_decode_round_trip() {
        for op in sample_ops() {
            let bytes = encode(&op);
            assert_eq!(
                crate::binary::decode(&bytes).unwrap(),
                Some(op.clone()),
                "round trip failed for {op:?}",
            );
        }
    }

    #[test]
    fn test_encoded_header_layout() {
        let bytes = encode(&TracingOp::EndSpan { serial: 1 });
        assert_eq!(bytes.len(), 4 + 8);
        let header = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        assert_eq!(header & 0x00ff_ffff, crate::binary::OTEL_MAGIC);
        assert_eq!(header >> 24, u32::from(crate::binary::END_SPAN));
    }

    #[test]
    fn test_tag_lengths_precede_payloads() {
        let bytes = encode(&TracingOp::Tag {
            serial: 1,
            key: "ab".to_owned(),
            value: "cde".to_owned(),
        });
        // header + serial + klen + vlen + "ab" + "cde"
        assert_eq!(bytes.len(), 4 + 8 + 4 + 4 + 2 + 3);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 3);
        assert_eq!(&bytes[20..], b"abcde");
    }
}
