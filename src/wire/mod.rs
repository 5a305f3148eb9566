//! DNS wire-format codec (RFC 1035 style, uncompressed names only).
//!
//! [`DnsQuery::parse`] decodes a binary query message into a [`Header`] and
//! its [`Question`] list. [`build_response`] serializes a transaction id,
//! flags, questions and answer records back into a bounded message through
//! the [`MessageWriter`], never exceeding [`MAX_MESSAGE_LEN`] bytes.
//!
//! Compression pointers are not supported: a length octet above the
//! 63-octet label limit (which includes the `0b11`-prefixed pointer bytes)
//! is rejected as malformed.

mod writer;

pub use writer::MessageWriter;

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Size of the fixed DNS message header.
pub const HEADER_LEN: usize = 12;

/// Hard capacity for serialized responses, the classic UDP payload limit.
pub const MAX_MESSAGE_LEN: usize = 512;

/// RFC 1035: a single name label holds at most 63 octets.
pub const MAX_LABEL_LEN: usize = 63;

/// QR bit: the message is a response.
pub const FLAG_QR: u16 = 0x8000;

/// RA bit: recursion available.
pub const FLAG_RA: u16 = 0x0080;

const QTYPE_A: u16 = 1;
const QTYPE_AAAA: u16 = 28;

/// The fixed 12-byte DNS message header.
///
/// The id and flags are treated as opaque and echoed into responses; the
/// four section counts are how many entries each section declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub flags: u16,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

/// One entry of the question section.
///
/// The qname is the dot-separated label sequence exactly as received: no
/// trailing dot, no case folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub qname: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// Record types the override table can answer for.
///
/// Everything outside A/AAAA carries its raw qtype in [`Unsupported`] and is
/// delegated upstream rather than interpreted.
///
/// [`Unsupported`]: RecordType::Unsupported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    AAAA,
    Unsupported(u16),
}

impl RecordType {
    /// Map a raw question qtype to a record type.
    #[must_use]
    pub fn from_qtype(qtype: u16) -> Self {
        match qtype {
            QTYPE_A => RecordType::A,
            QTYPE_AAAA => RecordType::AAAA,
            other => RecordType::Unsupported(other),
        }
    }

    /// The raw wire value for this record type.
    #[must_use]
    pub fn qtype(self) -> u16 {
        match self {
            RecordType::A => QTYPE_A,
            RecordType::AAAA => QTYPE_AAAA,
            RecordType::Unsupported(other) => other,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::Unsupported(other) => write!(f, "TYPE{other}"),
        }
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::AAAA),
            other => Err(Error::UnknownRecordType(other.to_string())),
        }
    }
}

/// An answer record: name, type, class, ttl and raw rdata bytes (4 for A,
/// 16 for AAAA).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: RecordType,
    pub class: u16,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

/// A parsed DNS query message: header plus the full question list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuery {
    pub header: Header,
    pub questions: Vec<Question>,
}

impl DnsQuery {
    /// Parse a DNS query message.
    ///
    /// Every question `qdcount` declares is decoded. Callers that act on the
    /// first question only still hold the complete message and can forward
    /// it untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedQuery`] when the buffer is shorter than the
    /// 12-byte header, a name lacks its terminating zero label, or a label or
    /// fixed field would read past the end of the buffer.
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < HEADER_LEN {
            return Err(Error::MalformedQuery(
                "message shorter than the 12-byte header",
            ));
        }

        let header = Header {
            id: read_u16(buf, 0),
            flags: read_u16(buf, 2),
            qdcount: read_u16(buf, 4),
            ancount: read_u16(buf, 6),
            nscount: read_u16(buf, 8),
            arcount: read_u16(buf, 10),
        };

        let mut pos = HEADER_LEN;
        let mut questions = Vec::new();
        for _ in 0..header.qdcount {
            let (qname, name_end) = parse_name(buf, pos)?;
            if buf.len() < name_end + 4 {
                return Err(Error::MalformedQuery("question truncated after name"));
            }
            questions.push(Question {
                qname,
                qtype: read_u16(buf, name_end),
                qclass: read_u16(buf, name_end + 2),
            });
            pos = name_end + 4;
        }

        Ok(DnsQuery { header, questions })
    }
}

/// Serialize a response message.
///
/// The id and flags are written verbatim. The question and answer counts
/// come from the list lengths; the authority and additional counts are
/// always zero. Returns only the bytes actually written.
///
/// # Errors
///
/// Returns [`Error::BufferOverflow`] when the encoded message would exceed
/// [`MAX_MESSAGE_LEN`]. The capacity check happens before each write, so a
/// failed build never leaves a partially written message behind.
pub fn build_response(
    id: u16,
    flags: u16,
    questions: &[Question],
    answers: &[ResourceRecord],
) -> Result<Vec<u8>, Error> {
    let mut writer = MessageWriter::new();
    writer.write_u16(id)?;
    writer.write_u16(flags)?;
    writer.write_u16(u16_len(questions.len())?)?;
    writer.write_u16(u16_len(answers.len())?)?;
    writer.write_u16(0)?; // nscount: no authority section
    writer.write_u16(0)?; // arcount: no additional section

    for question in questions {
        write_name(&mut writer, &question.qname)?;
        writer.write_u16(question.qtype)?;
        writer.write_u16(question.qclass)?;
    }

    for record in answers {
        write_name(&mut writer, &record.name)?;
        writer.write_u16(record.rtype.qtype())?;
        writer.write_u16(record.class)?;
        writer.write_u32(record.ttl)?;
        writer.write_u16(u16_len(record.rdata.len())?)?;
        writer.write_bytes(&record.rdata)?;
    }

    Ok(writer.into_bytes())
}

fn read_u16(buf: &[u8], pos: usize) -> u16 {
    u16::from_be_bytes([buf[pos], buf[pos + 1]])
}

fn u16_len(len: usize) -> Result<u16, Error> {
    u16::try_from(len).map_err(|_| Error::MalformedQuery("length field exceeds 16 bits"))
}

/// Walk length-prefixed labels from `start` until the terminating zero
/// label, returning the dot-joined name and the position after the zero.
fn parse_name(buf: &[u8], start: usize) -> Result<(String, usize), Error> {
    let mut labels: Vec<&str> = Vec::new();
    let mut pos = start;
    loop {
        let len = usize::from(
            *buf.get(pos)
                .ok_or(Error::MalformedQuery("name missing terminating zero label"))?,
        );
        pos += 1;
        if len == 0 {
            break;
        }
        if len > MAX_LABEL_LEN {
            return Err(Error::MalformedQuery("label length exceeds 63 octets"));
        }
        let label_bytes = buf
            .get(pos..pos + len)
            .ok_or(Error::MalformedQuery("label extends past end of message"))?;
        let label = std::str::from_utf8(label_bytes)
            .map_err(|_| Error::MalformedQuery("label is not valid UTF-8"))?;
        labels.push(label);
        pos += len;
    }
    Ok((labels.join("."), pos))
}

fn write_name(writer: &mut MessageWriter, name: &str) -> Result<(), Error> {
    for label in name.trim_end_matches('.').split('.') {
        if label.is_empty() {
            continue;
        }
        match u8::try_from(label.len()) {
            Ok(len) if usize::from(len) <= MAX_LABEL_LEN => {
                writer.write_u8(len)?;
                writer.write_bytes(label.as_bytes())?;
            }
            _ => return Err(Error::MalformedQuery("label length exceeds 63 octets")),
        }
    }
    writer.write_u8(0)
}
