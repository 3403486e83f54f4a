use bytes::{Bytes, BytesMut};
use thiserror::Error;

const SIMPLE_STRING_PREFIX: u8 = b'+';
const ERR_PREFIX: u8 = b'-';
const INTEGER_PREFIX: u8 = b':';
const BULK_STRING_PREFIX: u8 = b'$';
const ARRAY_PREFIX: u8 = b'*';
const CRLF: &[u8] = b"\r\n";

// Same ceilings as redis' proto-max-bulk-len and its multibulk length limit.
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;
pub(crate) const MAX_ARRAY_LEN: usize = 1024 * 1024;
/// Longest header or simple-string line accepted before its CRLF shows up.
pub(crate) const MAX_LINE_LEN: usize = 64 * 1024;
// Element slots reserved up front; the rest grow as elements actually arrive.
const PREALLOCATED_ELEMENTS: usize = 64;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum FrameError {
    /// More bytes are needed before the frame can be decoded.
    #[error("incomplete frame")]
    Incomplete,
    #[error("unknown frame type byte '{}'", .0.escape_ascii())]
    UnexpectedTypeByte(u8),
    #[error("array elements must be bulk strings or integers, got '{}'", .0.escape_ascii())]
    UnexpectedElementType(u8),
    #[error("invalid array length: {0}")]
    InvalidArrayLength(String),
    #[error("invalid bulk length: {0}")]
    InvalidBulkLength(String),
    #[error("invalid integer: {0}")]
    InvalidInteger(String),
    #[error("bulk string is not terminated by CRLF")]
    MissingTerminator,
    #[error("line exceeds {} bytes without CRLF", MAX_LINE_LEN)]
    LineTooLong,
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
    #[error("empty request")]
    EmptyRequest,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum QueryIO {
    #[default]
    Null,
    SimpleString(String),
    /// Binary safe: any byte sequence, CRLF and invalid UTF-8 included.
    BulkString(Bytes),
    Integer(i64),
    Array(Vec<QueryIO>),
    Err(String),
}

impl QueryIO {
    pub fn serialize(self) -> Bytes {
        match self {
            | QueryIO::Null => Bytes::from_static(b"$-1\r\n"),
            | QueryIO::SimpleString(s) => Bytes::from(format!("+{s}\r\n")),
            | QueryIO::Err(e) => Bytes::from(format!("-{e}\r\n")),
            | QueryIO::Integer(n) => Bytes::from(format!(":{n}\r\n")),
            | QueryIO::BulkString(s) => {
                let mut byte_mut = BytesMut::with_capacity(1 + 20 + s.len() + 4);
                byte_mut.extend_from_slice(&[BULK_STRING_PREFIX]);
                byte_mut.extend_from_slice(s.len().to_string().as_bytes());
                byte_mut.extend_from_slice(CRLF);
                byte_mut.extend_from_slice(&s);
                byte_mut.extend_from_slice(CRLF);
                byte_mut.freeze()
            },
            | QueryIO::Array(array) => {
                let mut buffer = BytesMut::with_capacity(array.len() * 32 + 16);
                buffer.extend_from_slice(format!("*{}\r\n", array.len()).as_bytes());
                for item in array {
                    buffer.extend_from_slice(&item.serialize());
                }
                buffer.freeze()
            },
        }
    }
}

impl From<String> for QueryIO {
    fn from(value: String) -> Self {
        QueryIO::BulkString(value.into())
    }
}

impl From<Bytes> for QueryIO {
    fn from(value: Bytes) -> Self {
        QueryIO::BulkString(value)
    }
}

impl<T: Into<Bytes>> From<Option<T>> for QueryIO {
    fn from(v: Option<T>) -> Self {
        match v {
            | Some(v) => QueryIO::BulkString(v.into()),
            | None => QueryIO::Null,
        }
    }
}

impl<T: Into<Bytes>> From<Vec<T>> for QueryIO {
    fn from(value: Vec<T>) -> Self {
        QueryIO::Array(value.into_iter().map(|v| QueryIO::BulkString(v.into())).collect())
    }
}

impl From<QueryIO> for Bytes {
    fn from(value: QueryIO) -> Self {
        value.serialize()
    }
}

/// A single inbound frame on a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// `*<n>` array of raw arguments; integer elements keep their decimal text. Never empty.
    Command(Vec<Bytes>),
    /// A top-level `+<text>` line. Not tokenized, answered as-is.
    Inline(String),
}

/// Decodes one request frame from the front of `buffer`, returning it with the number of bytes
/// it occupied. `FrameError::Incomplete` means the buffer ends before the frame does.
pub fn parse_request(buffer: &[u8]) -> Result<(Request, usize), FrameError> {
    let Some(&type_byte) = buffer.first() else {
        return Err(FrameError::Incomplete);
    };

    match type_byte {
        | SIMPLE_STRING_PREFIX => {
            let (line, len) = read_line(buffer, 1)?;
            Ok((Request::Inline(to_text(line)?), len))
        },
        | ARRAY_PREFIX => parse_command(buffer),
        | byte => Err(FrameError::UnexpectedTypeByte(byte)),
    }
}

fn parse_command(buffer: &[u8]) -> Result<(Request, usize), FrameError> {
    let (array_len, mut offset) = parse_array_len(buffer, 0)?;
    if array_len == 0 {
        return Err(FrameError::EmptyRequest);
    }

    let mut args = Vec::with_capacity(array_len.min(PREALLOCATED_ELEMENTS));
    for _ in 0..array_len {
        let Some(&element_type) = buffer.get(offset) else {
            return Err(FrameError::Incomplete);
        };
        let (arg, next) = match element_type {
            | BULK_STRING_PREFIX => parse_bulk_string(buffer, offset)?,
            | INTEGER_PREFIX => {
                let (text, next) = parse_integer_text(buffer, offset)?;
                (Bytes::from(text), next)
            },
            | byte => return Err(FrameError::UnexpectedElementType(byte)),
        };
        args.push(arg);
        offset = next;
    }

    Ok((Request::Command(args), offset))
}

/// Decodes a reply frame as sent by a server. Used on the replica side of the handshake.
pub fn deserialize(buffer: &[u8]) -> Result<(QueryIO, usize), FrameError> {
    deserialize_at(buffer, 0)
}

fn deserialize_at(buffer: &[u8], start: usize) -> Result<(QueryIO, usize), FrameError> {
    let Some(&type_byte) = buffer.get(start) else {
        return Err(FrameError::Incomplete);
    };

    match type_byte {
        | SIMPLE_STRING_PREFIX => {
            let (line, next) = read_line(buffer, start + 1)?;
            Ok((QueryIO::SimpleString(to_text(line)?), next))
        },
        | ERR_PREFIX => {
            let (line, next) = read_line(buffer, start + 1)?;
            Ok((QueryIO::Err(to_text(line)?), next))
        },
        | INTEGER_PREFIX => {
            let (text, next) = parse_integer_text(buffer, start)?;
            let n = text.parse().map_err(|_| FrameError::InvalidInteger(text))?;
            Ok((QueryIO::Integer(n), next))
        },
        | BULK_STRING_PREFIX => {
            let (len, next) = read_line(buffer, start + 1)?;
            if len == b"-1" {
                return Ok((QueryIO::Null, next));
            }
            let (s, next) = parse_bulk_string(buffer, start)?;
            Ok((QueryIO::BulkString(s), next))
        },
        | ARRAY_PREFIX => {
            let (array_len, mut offset) = parse_array_len(buffer, start)?;

            let mut elements = Vec::with_capacity(array_len.min(PREALLOCATED_ELEMENTS));
            for _ in 0..array_len {
                let (element, next) = deserialize_at(buffer, offset)?;
                elements.push(element);
                offset = next;
            }
            Ok((QueryIO::Array(elements), offset))
        },
        | byte => Err(FrameError::UnexpectedTypeByte(byte)),
    }
}

// *<count>\r\n
fn parse_array_len(buffer: &[u8], start: usize) -> Result<(usize, usize), FrameError> {
    let (count, next) = read_line(buffer, start + 1)?;
    let count = to_text(count)?;
    match count.parse::<usize>() {
        | Ok(n) if n <= MAX_ARRAY_LEN => Ok((n, next)),
        | _ => Err(FrameError::InvalidArrayLength(count)),
    }
}

// $<len>\r\n<bytes>\r\n
fn parse_bulk_string(buffer: &[u8], start: usize) -> Result<(Bytes, usize), FrameError> {
    let (len, content_start) = read_line(buffer, start + 1)?;
    let len = to_text(len)?;
    let content_len: usize = match len.parse() {
        | Ok(n) if n <= MAX_BULK_LEN => n,
        | _ => return Err(FrameError::InvalidBulkLength(len)),
    };

    let content_end = content_start + content_len;
    if buffer.len() < content_end + CRLF.len() {
        return Err(FrameError::Incomplete);
    }
    if &buffer[content_end..content_end + CRLF.len()] != CRLF {
        return Err(FrameError::MissingTerminator);
    }

    let content = Bytes::copy_from_slice(&buffer[content_start..content_end]);
    Ok((content, content_end + CRLF.len()))
}

// :<digits>\r\n, kept as its decimal text
fn parse_integer_text(buffer: &[u8], start: usize) -> Result<(String, usize), FrameError> {
    let (digits, next) = read_line(buffer, start + 1)?;
    let text = to_text(digits)?;
    if text.parse::<i64>().is_err() {
        return Err(FrameError::InvalidInteger(text));
    }
    Ok((text, next))
}

/// Returns the bytes between `start` and the next CRLF, and the index right after that CRLF.
/// Only the first `MAX_LINE_LEN` bytes are searched.
fn read_line(buffer: &[u8], start: usize) -> Result<(&[u8], usize), FrameError> {
    let rest = buffer.get(start..).ok_or(FrameError::Incomplete)?;
    let window = &rest[..rest.len().min(MAX_LINE_LEN + CRLF.len())];
    match window.windows(CRLF.len()).position(|w| w == CRLF) {
        | Some(end) => Ok((&rest[..end], start + end + CRLF.len())),
        | None if rest.len() > MAX_LINE_LEN + 1 => Err(FrameError::LineTooLong),
        | None => Err(FrameError::Incomplete),
    }
}

fn to_text(bytes: &[u8]) -> Result<String, FrameError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| FrameError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write_array;

    #[test]
    fn test_parse_command_of_bulk_strings() {
        // GIVEN
        let buffer = b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n";

        // WHEN
        let (request, len) = parse_request(buffer).unwrap();

        // THEN
        assert_eq!(request, Request::Command(vec!["ECHO".into(), "hey".into()]));
        assert_eq!(len, buffer.len());
    }

    #[test]
    fn test_integer_element_is_rendered_as_text() {
        let buffer = b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n:42\r\n";

        let (request, _) = parse_request(buffer).unwrap();

        assert_eq!(request, Request::Command(vec!["SET".into(), "k".into(), "42".into()]));
    }

    #[test]
    fn test_integer_element_must_be_numeric() {
        let buffer = b"*2\r\n:notanumber\r\n";

        let err = parse_request(buffer).unwrap_err();

        assert_eq!(err, FrameError::InvalidInteger("notanumber".into()));
    }

    #[test]
    fn test_inline_line_is_passed_through() {
        let (request, len) = parse_request(b"+PING\r\n").unwrap();

        assert_eq!(request, Request::Inline("PING".into()));
        assert_eq!(len, 7);
    }

    #[test]
    fn test_unknown_leading_byte_is_named_in_error() {
        let err = parse_request(b"?what\r\n").unwrap_err();

        assert_eq!(err, FrameError::UnexpectedTypeByte(b'?'));
        assert!(err.to_string().contains("'?'"));
    }

    #[test]
    fn test_truncated_frames_are_incomplete() {
        for cut in [b"*2\r\n$4\r\nECHO\r\n".as_slice(), b"*2\r\n$4\r\nEC", b"*2", b"", b"+PI"] {
            assert_eq!(parse_request(cut).unwrap_err(), FrameError::Incomplete, "{cut:?}");
        }
    }

    #[test]
    fn test_bulk_string_without_crlf_after_content() {
        let err = parse_request(b"*1\r\n$4\r\nPINGxx\r\n").unwrap_err();
        assert_eq!(err, FrameError::MissingTerminator);
    }

    #[test]
    fn test_bad_lengths() {
        assert!(matches!(parse_request(b"*x\r\n"), Err(FrameError::InvalidArrayLength(_))));
        assert!(matches!(parse_request(b"*1\r\n$-1\r\n"), Err(FrameError::InvalidBulkLength(_))));
        assert_eq!(parse_request(b"*0\r\n").unwrap_err(), FrameError::EmptyRequest);
    }

    #[test]
    fn test_only_bytes_of_first_frame_are_consumed() {
        let buffer = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n";

        let (_, len) = parse_request(buffer).unwrap();

        assert_eq!(len, buffer.len() / 2);
    }

    #[test]
    fn test_serialize_replies() {
        assert_eq!(QueryIO::SimpleString("OK".into()).serialize(), Bytes::from("+OK\r\n"));
        assert_eq!(QueryIO::Err("ERR nope".into()).serialize(), Bytes::from("-ERR nope\r\n"));
        assert_eq!(QueryIO::BulkString("hey".into()).serialize(), Bytes::from("$3\r\nhey\r\n"));
        assert_eq!(QueryIO::BulkString("".into()).serialize(), Bytes::from("$0\r\n\r\n"));
        assert_eq!(QueryIO::Null.serialize(), Bytes::from("$-1\r\n"));
        assert_eq!(QueryIO::Integer(3).serialize(), Bytes::from(":3\r\n"));
        assert_eq!(write_array!("a", "bc").serialize(), Bytes::from("*2\r\n$1\r\na\r\n$2\r\nbc\r\n"));
        assert_eq!(QueryIO::Array(vec![]).serialize(), Bytes::from("*0\r\n"));
    }

    #[test]
    fn test_bulk_string_survives_encoding_with_crlf_inside() {
        // GIVEN
        let value = "line one\r\nline two";
        let encoded = write_array!("SET", "k", value).serialize();

        // WHEN
        let (request, len) = parse_request(&encoded).unwrap();

        // THEN
        assert_eq!(request, Request::Command(vec!["SET".into(), "k".into(), value.into()]));
        assert_eq!(len, encoded.len());
    }

    #[test]
    fn test_array_length_over_limit_is_rejected_before_allocating() {
        // GIVEN a header announcing far more elements than could ever be sent
        let buffer = b"*99999999999999999\r\n";

        // WHEN
        let err = parse_request(buffer).unwrap_err();

        // THEN
        assert_eq!(err, FrameError::InvalidArrayLength("99999999999999999".into()));
        assert_eq!(
            deserialize(buffer).unwrap_err(),
            FrameError::InvalidArrayLength("99999999999999999".into())
        );
    }

    #[test]
    fn test_array_length_at_limit_waits_for_elements() {
        let header = format!("*{MAX_ARRAY_LEN}\r\n");
        assert_eq!(parse_request(header.as_bytes()).unwrap_err(), FrameError::Incomplete);

        let over = format!("*{}\r\n", MAX_ARRAY_LEN + 1);
        assert!(matches!(
            parse_request(over.as_bytes()),
            Err(FrameError::InvalidArrayLength(_))
        ));
    }

    #[test]
    fn test_unterminated_line_is_bounded() {
        // GIVEN
        let mut buffer = b"*".to_vec();
        buffer.extend(std::iter::repeat_n(b'1', MAX_LINE_LEN));

        // WHEN the line is still within the limit
        assert_eq!(parse_request(&buffer).unwrap_err(), FrameError::Incomplete);
        buffer.extend_from_slice(b"11");

        // THEN
        assert_eq!(parse_request(&buffer).unwrap_err(), FrameError::LineTooLong);
    }

    #[test]
    fn test_bulk_content_is_not_subject_to_line_limit() {
        let value = "x".repeat(MAX_LINE_LEN * 2);
        let encoded = write_array!("SET", "k", value.clone()).serialize();

        let (request, len) = parse_request(&encoded).unwrap();

        assert_eq!(request, Request::Command(vec!["SET".into(), "k".into(), value.into()]));
        assert_eq!(len, encoded.len());
    }

    #[test]
    fn test_bulk_strings_are_binary_safe() {
        // GIVEN bytes that are not valid UTF-8
        let value = Bytes::from_static(&[0xFF, 0xFE, 0x00, 0x80]);
        let encoded = write_array!("SET", "k", value.clone()).serialize();

        // WHEN
        let (request, _) = parse_request(&encoded).unwrap();

        // THEN
        assert_eq!(request, Request::Command(vec!["SET".into(), "k".into(), value.clone()]));
        let reply = QueryIO::BulkString(value.clone()).serialize();
        assert_eq!(deserialize(&reply).unwrap(), (QueryIO::BulkString(value), reply.len()));
    }

    #[test]
    fn test_zero_length_bulk_string_round_trip() {
        let encoded = write_array!("ECHO", "").serialize();
        assert_eq!(&encoded[..], b"*2\r\n$4\r\nECHO\r\n$0\r\n\r\n");

        let (request, len) = parse_request(&encoded).unwrap();

        assert_eq!(request, Request::Command(vec!["ECHO".into(), Bytes::new()]));
        assert_eq!(len, encoded.len());
        assert_eq!(deserialize(b"$0\r\n\r\n").unwrap(), (QueryIO::BulkString(Bytes::new()), 6));
    }

    #[test]
    fn test_deserialize_replies() {
        assert_eq!(deserialize(b"+PONG\r\n").unwrap(), (QueryIO::SimpleString("PONG".into()), 7));
        assert_eq!(deserialize(b"-ERR x\r\n").unwrap(), (QueryIO::Err("ERR x".into()), 8));
        assert_eq!(deserialize(b"$-1\r\n").unwrap(), (QueryIO::Null, 5));
        assert_eq!(deserialize(b":7\r\n").unwrap(), (QueryIO::Integer(7), 4));
        assert_eq!(
            deserialize(b"*2\r\n$1\r\na\r\n$-1\r\n").unwrap(),
            (QueryIO::Array(vec![QueryIO::BulkString("a".into()), QueryIO::Null]), 16)
        );
        assert_eq!(deserialize(b"$3\r\nab").unwrap_err(), FrameError::Incomplete);
    }
}
