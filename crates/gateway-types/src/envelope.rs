//! # Message Envelope
//!
//! The byte form of a [`Message`] used whenever a message crosses a byte
//! boundary (a module fed raw envelopes, a foreign producer, a file).
//!
//! ## Layout
//!
//! All integers are 4-byte big-endian.
//!
//! ```text
//! ┌──────────┬────────────┬─────────────┬──────────────────────────┬─────────────┬─────────┐
//! │ A1 60    │ total size │ prop count  │ key\0value\0 × count     │ content len │ content │
//! │ 2 bytes  │ u32        │ i32         │ UTF-8                    │ u32         │ bytes   │
//! └──────────┴────────────┴─────────────┴──────────────────────────┴─────────────┴─────────┘
//! ```
//!
//! A message with no properties and no content encodes to exactly
//! [`MIN_ENVELOPE_LEN`] bytes. Decoding is strict: the size field must match
//! the input length and no bytes may follow the content.

use crate::entities::{Message, Properties};
use crate::errors::CodecError;

/// Fixed two-byte envelope header.
pub const ENVELOPE_MAGIC: [u8; 2] = [0xA1, 0x60];

/// Size of an envelope carrying no properties and no content.
pub const MIN_ENVELOPE_LEN: usize = 2 + 4 + 4 + 4;

/// Encode a message into its envelope.
///
/// # Errors
///
/// - [`CodecError::EmbeddedNul`] if a property key or value contains `\0`
/// - [`CodecError::TooLarge`] if a size does not fit its 4-byte field
pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    let properties = message.properties();
    let content = message.content();

    let mut properties_len = 0usize;
    for (key, value) in properties {
        check_no_nul("key", key)?;
        check_no_nul("value", value)?;
        properties_len += key.len() + 1 + value.len() + 1;
    }

    let total = MIN_ENVELOPE_LEN + properties_len + content.len();
    let total_field = u32::try_from(total).map_err(|_| CodecError::TooLarge(total))?;
    let count_field =
        i32::try_from(properties.len()).map_err(|_| CodecError::TooLarge(properties.len()))?;
    let content_field =
        u32::try_from(content.len()).map_err(|_| CodecError::TooLarge(content.len()))?;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&ENVELOPE_MAGIC);
    out.extend_from_slice(&total_field.to_be_bytes());
    out.extend_from_slice(&count_field.to_be_bytes());
    for (key, value) in properties {
        out.extend_from_slice(key.as_bytes());
        out.push(0);
        out.extend_from_slice(value.as_bytes());
        out.push(0);
    }
    out.extend_from_slice(&content_field.to_be_bytes());
    out.extend_from_slice(content);

    debug_assert_eq!(out.len(), total);
    Ok(out)
}

/// Decode an envelope into a message.
///
/// # Errors
///
/// Returns a [`CodecError`] describing the first malformed field.
pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    if bytes.len() < MIN_ENVELOPE_LEN {
        return Err(CodecError::TooShort {
            len: bytes.len(),
            min: MIN_ENVELOPE_LEN,
        });
    }

    let mut reader = Reader::new(bytes);

    let header = reader.take(2, "header")?;
    if header != ENVELOPE_MAGIC {
        return Err(CodecError::BadHeader {
            found: [header[0], header[1]],
        });
    }

    let declared = reader.read_u32("total size")?;
    if usize::try_from(declared).ok() != Some(bytes.len()) {
        return Err(CodecError::SizeMismatch {
            declared,
            actual: bytes.len(),
        });
    }

    let count = reader.read_i32("property count")?;
    if count < 0 {
        return Err(CodecError::InvalidPropertyCount(count));
    }

    let mut properties = Properties::new();
    for _ in 0..count {
        let key = reader.read_cstr("key")?;
        let value = reader.read_cstr("value")?;
        if properties.contains_key(&key) {
            return Err(CodecError::DuplicateProperty(key));
        }
        properties.insert(key, value);
    }

    let content_len = reader.read_u32("content length")?;
    let content_len = usize::try_from(content_len)
        .map_err(|_| CodecError::Truncated { field: "content" })?;
    let content = reader.take(content_len, "content")?.to_vec();

    if reader.remaining() > 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }

    Ok(Message::new(content, properties))
}

impl Message {
    /// Decode a message from its envelope. See [`decode`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes)
    }

    /// Encode this message into its envelope. See [`encode`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        encode(self)
    }
}

fn check_no_nul(field: &'static str, s: &str) -> Result<(), CodecError> {
    if s.as_bytes().contains(&0) {
        return Err(CodecError::EmbeddedNul {
            field,
            value: s.to_string(),
        });
    }
    Ok(())
}

/// Cursor over the envelope bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated { field });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        let raw = self.take(4, field)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn read_i32(&mut self, field: &'static str) -> Result<i32, CodecError> {
        let raw = self.take(4, field)?;
        Ok(i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn read_cstr(&mut self, field: &'static str) -> Result<String, CodecError> {
        let rest = &self.bytes[self.pos..];
        let Some(nul) = rest.iter().position(|b| *b == 0) else {
            return Err(CodecError::Truncated { field });
        };
        let s = std::str::from_utf8(&rest[..nul])
            .map_err(|_| CodecError::InvalidUtf8 { field })?
            .to_string();
        self.pos += nul + 1;
        Ok(s)
    }
}
