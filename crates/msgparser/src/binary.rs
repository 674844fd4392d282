//! The binary framing of the tracing protocol.

use crate::reader::MsgReader;
use crate::types::{
    Instrument, InstrumentKind, ParseError, SpanContext, SpanId, TraceId, TracingOp,
};

/// Marker in the low 24 bits of every message header: the ASCII bytes `ot2`.
pub const OTEL_MAGIC: u32 = 0x006f_7432;

// Message tag constants (high byte of the header).
pub(crate) const BEGIN_SPAN: u8 = 1;
pub(crate) const END_SPAN: u8 = 2;
pub(crate) const TAG: u8 = 3;
pub(crate) const EVENT: u8 = 4;
pub(crate) const SET_PARENT_CONTEXT: u8 = 5;
pub(crate) const SET_TRACE_ID: u8 = 6;
pub(crate) const SET_SPAN_ID: u8 = 7;
pub(crate) const METRIC_CAPTURE: u8 = 8;

pub use crate::writer::encode;

/// Decode a binary user message.
///
/// A payload shorter than the 32-bit header, or one whose magic does not
/// match, is not a tracing message; nothing beyond the header peek is
/// examined and the decode returns `Ok(None)`. A matching magic with an
/// out-of-range tag or a malformed body is a hard error.
pub fn decode(payload: &[u8]) -> Result<Option<TracingOp>, ParseError> {
    if payload.len() < 4 {
        return Ok(None);
    }
    let header = u32::from_le_bytes(payload[0..4].try_into().unwrap());
    if header & 0x00ff_ffff != OTEL_MAGIC {
        return Ok(None);
    }
    let tag = (header >> 24) as u8;

    let mut r = MsgReader::new(&payload[4..]);
    let op = match tag {
        BEGIN_SPAN => TracingOp::BeginSpan {
            serial: r.u64(),
            name: r.utf8_rest(),
        },
        END_SPAN => TracingOp::EndSpan { serial: r.u64() },
        TAG | EVENT => {
            let serial = r.u64();
            let klen = r.u32() as usize;
            let vlen = r.u32() as usize;
            let key = r.utf8(klen);
            let value = r.utf8(vlen);
            if tag == TAG {
                TracingOp::Tag { serial, key, value }
            } else {
                TracingOp::Event {
                    serial,
                    name: key,
                    value,
                }
            }
        }
        SET_PARENT_CONTEXT => TracingOp::SetParent {
            serial: r.u64(),
            context: SpanContext {
                span_id: SpanId(r.u64()),
                trace_id: TraceId(r.u64()),
            },
        },
        SET_TRACE_ID => TracingOp::SetTraceId {
            serial: r.u64(),
            trace_id: TraceId(r.u64()),
        },
        SET_SPAN_ID => TracingOp::SetSpanId {
            serial: r.u64(),
            span_id: SpanId(r.u64()),
        },
        METRIC_CAPTURE => {
            let instrument_tag = r.i8();
            let value = r.i64();
            let name = r.utf8_rest();
            if let Some(err) = r.error() {
                return Err(err.into());
            }
            let kind = InstrumentKind::from_tag(instrument_tag)
                .ok_or(ParseError::UnknownInstrument(instrument_tag))?;
            TracingOp::Metric {
                instrument: Instrument { kind, name },
                value,
            }
        }
        other => return Err(ParseError::UnknownMessageType(other)),
    };

    if let Some(err) = r.error() {
        return Err(err.into());
    }
    Ok(Some(op))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(tag: u8) -> [u8; 4] {
        (OTEL_MAGIC | u32::from(tag) << 24).to_le_bytes()
    }

    #[test]
    fn test_magic_bytes() {
        // Low three bytes of the header spell "ot2" on the wire.
        assert_eq!(&header(1)[..3], &[b'2', b't', b'o']);
        assert_eq!(header(1)[3], 1);
    }

    #[test]
    fn test_wrong_magic_is_not_a_message() {
        let mut payload = vec![0x00, 0x00, 0x00, 0x01];
        payload.extend_from_slice(&1u64.to_le_bytes());
        assert_eq!(decode(&payload).unwrap(), None);
    }

    #[test]
    fn test_short_payload_is_not_a_message() {
        assert_eq!(decode(&[]).unwrap(), None);
        assert_eq!(decode(&[b'2', b't', b'o']).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_tag_fails() {
        let payload = header(0).to_vec();
        assert!(matches!(
            decode(&payload),
            Err(ParseError::UnknownMessageType(0))
        ));

        let mut payload = header(9).to_vec();
        payload.extend_from_slice(&1u64.to_le_bytes());
        assert!(matches!(
            decode(&payload),
            Err(ParseError::UnknownMessageType(9))
        ));
    }

    #[test]
    fn test_begin_span() {
        let mut payload = header(BEGIN_SPAN).to_vec();
        payload.extend_from_slice(&100u64.to_le_bytes());
        payload.extend_from_slice(b"handle request");
        assert_eq!(
            decode(&payload).unwrap(),
            Some(TracingOp::BeginSpan {
                serial: 100,
                name: "handle request".to_owned(),
            })
        );
    }

    #[test]
    fn test_end_span() {
        let mut payload = header(END_SPAN).to_vec();
        payload.extend_from_slice(&100u64.to_le_bytes());
        assert_eq!(
            decode(&payload).unwrap(),
            Some(TracingOp::EndSpan { serial: 100 })
        );
    }

    #[test]
    fn test_tag_and_event_bodies() {
        for (tag, key_is_name) in [(TAG, false), (EVENT, true)] {
            let mut payload = header(tag).to_vec();
            payload.extend_from_slice(&5u64.to_le_bytes());
            payload.extend_from_slice(&3u32.to_le_bytes());
            payload.extend_from_slice(&5u32.to_le_bytes());
            payload.extend_from_slice(b"key");
            payload.extend_from_slice(b"value");
            let op = decode(&payload).unwrap().unwrap();
            if key_is_name {
                assert_eq!(
                    op,
                    TracingOp::Event {
                        serial: 5,
                        name: "key".to_owned(),
                        value: "value".to_owned(),
                    }
                );
            } else {
                assert_eq!(
                    op,
                    TracingOp::Tag {
                        serial: 5,
                        key: "key".to_owned(),
                        value: "value".to_owned(),
                    }
                );
            }
        }
    }

    #[test]
    fn test_set_parent_context() {
        let mut payload = header(SET_PARENT_CONTEXT).to_vec();
        payload.extend_from_slice(&9u64.to_le_bytes());
        payload.extend_from_slice(&0xbbu64.to_le_bytes());
        payload.extend_from_slice(&0xaau64.to_le_bytes());
        assert_eq!(
            decode(&payload).unwrap(),
            Some(TracingOp::SetParent {
                serial: 9,
                context: SpanContext {
                    span_id: SpanId(0xbb),
                    trace_id: TraceId(0xaa),
                },
            })
        );
    }

    #[test]
    fn test_metric_capture() {
        let mut payload = header(METRIC_CAPTURE).to_vec();
        payload.push(InstrumentKind::SumObserver.tag() as u8);
        payload.extend_from_slice(&42i64.to_le_bytes());
        payload.extend_from_slice(b"req");
        assert_eq!(
            decode(&payload).unwrap(),
            Some(TracingOp::Metric {
                instrument: Instrument::sum("req"),
                value: 42,
            })
        );
    }

    #[test]
    fn test_metric_unknown_instrument() {
        let mut payload = header(METRIC_CAPTURE).to_vec();
        payload.push(0x7f);
        payload.extend_from_slice(&1i64.to_le_bytes());
        payload.extend_from_slice(b"x");
        assert!(matches!(
            decode(&payload),
            Err(ParseError::UnknownInstrument(0x7f))
        ));
    }

    #[test]
    fn test_truncated_body_fails() {
        let mut payload = header(END_SPAN).to_vec();
        payload.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(decode(&payload), Err(ParseError::UnexpectedEof)));

        // A truncated metric reports the missing bytes, not a bogus
        // instrument tag.
        let mut payload = header(METRIC_CAPTURE).to_vec();
        payload.push(InstrumentKind::SumObserver.tag() as u8);
        assert!(matches!(decode(&payload), Err(ParseError::UnexpectedEof)));
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let mut payload = header(BEGIN_SPAN).to_vec();
        payload.extend_from_slice(&1u64.to_le_bytes());
        payload.extend_from_slice(&[0xFF, 0xFE]);
        assert!(matches!(decode(&payload), Err(ParseError::InvalidUtf8)));
    }
}
