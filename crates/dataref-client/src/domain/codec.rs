//! Wire codec for the dataref bridge protocol.
//!
//! Pure functions, no I/O. Messages are ASCII text with `|`-separated fields:
//!
//! ```text
//! request:  <request_id>|dataref|read|<type>|<name>
//! response: <request_id>|dataref|response|<type>|<value>
//! ```
//!
//! The legacy form without the leading request id is accepted on decode
//! but never produced. Array values are comma-joined without brackets.
//!
//! Numbers are written with Rust's `Display`, which always uses `.` and
//! ASCII digits regardless of locale.

use crate::domain::error::CodecError;
use crate::domain::types::{
    DataRefName, DataRefRequest, DataRefResponse, DataRefType, DataRefValue, RequestId,
};

/// Separator between message fields.
pub const FIELD_SEPARATOR: char = '|';

/// Separator between array elements inside the value field.
pub const ARRAY_SEPARATOR: char = ',';

/// Message category shared by requests and responses.
pub const CATEGORY: &str = "dataref";

/// Action field of a read request.
pub const READ_ACTION: &str = "read";

/// Action field of a read response.
pub const RESPONSE_ACTION: &str = "response";

/// Largest request datagram the client will send.
pub const MAX_REQUEST_SIZE: usize = 1024;

/// Largest response datagram the client accepts.
///
/// This is the effective ceiling on array length: a `[float]` response must
/// fit in this many bytes including the header fields.
pub const MAX_RESPONSE_SIZE: usize = 2048;

/// Fields of one frame after the category has been checked.
struct Frame<'a> {
    request_id: Option<&'a str>,
    type_tag: &'a str,
    payload: &'a str,
}

/// Encode a read request in the id-bearing form.
pub fn encode_request(
    request_id: &RequestId,
    name: &DataRefName,
    data_type: DataRefType,
) -> Vec<u8> {
    format!(
        "{request_id}{sep}{CATEGORY}{sep}{READ_ACTION}{sep}{data_type}{sep}{name}",
        sep = FIELD_SEPARATOR
    )
    .into_bytes()
}

/// Decode a read request (responder side).
pub fn decode_request(bytes: &[u8]) -> Result<DataRefRequest, CodecError> {
    let text = as_text(bytes)?;
    let frame = split_frame(text, READ_ACTION)?;

    Ok(DataRefRequest {
        request_id: frame.request_id.map(RequestId::parse).transpose()?,
        data_type: frame.type_tag.parse()?,
        name: DataRefName::new(frame.payload)?,
    })
}

/// Encode a read response. `request_id` is echoed verbatim when present.
///
/// The value is written as-is under `data_type`, even when the two disagree.
/// That is how a host reports a dataref read under the wrong declared type.
pub fn encode_response(
    request_id: Option<&RequestId>,
    data_type: DataRefType,
    value: &DataRefValue,
) -> Result<Vec<u8>, CodecError> {
    let value = encode_value(value)?;
    let sep = FIELD_SEPARATOR;
    let body = match request_id {
        Some(id) => format!("{id}{sep}{CATEGORY}{sep}{RESPONSE_ACTION}{sep}{data_type}{sep}{value}"),
        None => format!("{CATEGORY}{sep}{RESPONSE_ACTION}{sep}{data_type}{sep}{value}"),
    };
    Ok(body.into_bytes())
}

/// Render a value in its wire form.
pub fn encode_value(value: &DataRefValue) -> Result<String, CodecError> {
    fn join<T: ToString>(items: &[T]) -> String {
        let sep = ARRAY_SEPARATOR.to_string();
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(sep.as_str())
    }

    match value {
        DataRefValue::Int(v) => Ok(v.to_string()),
        DataRefValue::Float(v) => Ok(v.to_string()),
        DataRefValue::IntArray(v) => Ok(join(v)),
        DataRefValue::FloatArray(v) => Ok(join(v)),
        DataRefValue::Invalid => Err(CodecError::Malformed(
            "an invalid value has no wire form".into(),
        )),
    }
}

/// Decode a read response.
///
/// Fails with `Malformed` when fields are missing or the frame is not a
/// dataref response, `UnknownType` for an unrecognised type tag, and
/// `ValueParse` when the value does not parse under the tag. Arrays are
/// all-or-nothing.
pub fn decode_response(bytes: &[u8]) -> Result<DataRefResponse, CodecError> {
    let text = as_text(bytes)?;
    let frame = split_frame(text, RESPONSE_ACTION)?;

    let request_id = frame.request_id.map(RequestId::parse).transpose()?;
    let data_type: DataRefType = frame.type_tag.parse()?;
    let value = decode_value(data_type, frame.payload)?;

    Ok(DataRefResponse {
        request_id,
        data_type,
        value,
    })
}

/// Parse a value field under a declared type.
///
/// Floats are parsed at double precision and narrowed to `f32`. An empty
/// field is an empty array for array types and an error for scalars.
pub fn decode_value(data_type: DataRefType, text: &str) -> Result<DataRefValue, CodecError> {
    match data_type {
        DataRefType::Int => parse_int(data_type, text.trim()).map(DataRefValue::Int),
        DataRefType::Float => parse_float(data_type, text.trim()).map(DataRefValue::Float),
        DataRefType::IntArray => parse_array(data_type, text, parse_int).map(DataRefValue::IntArray),
        DataRefType::FloatArray => {
            parse_array(data_type, text, parse_float).map(DataRefValue::FloatArray)
        }
    }
}

/// Best-effort extraction of the request id from a response that may not
/// decode, so a value failure can be routed to the request that caused it.
///
/// Only the first two fields are inspected, so a truncated datagram works
/// as long as its head is intact.
pub fn peek_request_id(bytes: &[u8]) -> Option<RequestId> {
    let separator = FIELD_SEPARATOR as u8;
    let mut fields = bytes.splitn(3, |b| *b == separator);
    let first = std::str::from_utf8(fields.next()?).ok()?;
    if first == CATEGORY || fields.next()? != CATEGORY.as_bytes() {
        return None;
    }
    RequestId::parse(first).ok()
}

fn as_text(bytes: &[u8]) -> Result<&str, CodecError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| CodecError::Malformed(format!("message is not valid UTF-8: {e}")))?;
    Ok(text.trim_end_matches(['\r', '\n']))
}

fn split_frame<'a>(text: &'a str, action: &str) -> Result<Frame<'a>, CodecError> {
    let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();

    let (request_id, rest) = match fields.len() {
        5 => (Some(fields[0]), &fields[1..]),
        4 if fields[0] == CATEGORY => (None, &fields[..]),
        n => {
            return Err(CodecError::Malformed(format!(
                "expected 5 fields (4 in legacy form), found {n} in {text:?}"
            )))
        }
    };

    if rest[0] != CATEGORY {
        return Err(CodecError::Malformed(format!(
            "unexpected category {:?} in {text:?}",
            rest[0]
        )));
    }
    if rest[1] != action {
        return Err(CodecError::Malformed(format!(
            "expected action {action:?}, found {:?}",
            rest[1]
        )));
    }

    Ok(Frame {
        request_id,
        type_tag: rest[2],
        payload: rest[3],
    })
}

fn parse_int(data_type: DataRefType, token: &str) -> Result<i64, CodecError> {
    token.parse::<i64>().map_err(|e| CodecError::ValueParse {
        data_type,
        value: token.to_string(),
        reason: e.to_string(),
    })
}

fn parse_float(data_type: DataRefType, token: &str) -> Result<f32, CodecError> {
    token
        .parse::<f64>()
        .map(|v| v as f32)
        .map_err(|e| CodecError::ValueParse {
            data_type,
            value: token.to_string(),
            reason: e.to_string(),
        })
}

fn parse_array<T>(
    data_type: DataRefType,
    text: &str,
    parse: fn(DataRefType, &str) -> Result<T, CodecError>,
) -> Result<Vec<T>, CodecError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    text.split(ARRAY_SEPARATOR)
        .enumerate()
        .map(|(index, token)| {
            parse(data_type, token.trim()).map_err(|err| match err {
                CodecError::ValueParse { value, reason, .. } => CodecError::ValueParse {
                    data_type,
                    value,
                    reason: format!("element {index}: {reason}"),
                },
                other => other,
            })
        })
        .collect()
}
