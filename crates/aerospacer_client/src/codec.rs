//! Length-checked payload builder
//!
//! Every instruction encoder writes through [`LengthCheckedWriter`] and closes
//! with [`LengthCheckedWriter::finish`], which compares what was written with
//! an independently computed expected length. A mismatch means the payload
//! would be misread by the program, so it is returned as an error instead of
//! being emitted.
//!
//! Wire types (all little-endian):
//! - u32 / u64: fixed width
//! - string: u32 length + raw UTF-8 bytes, no padding
//! - optional pubkey: 1 byte flag (0 = absent, nothing follows; 1 = present,
//!   32 bytes follow)
//! - pubkey list: u32 count + count * 32 bytes

use solana_sdk::pubkey::Pubkey;

use crate::error::EncodeError;

pub const SELECTOR_LEN: usize = 8;
pub const U32_LEN: usize = 4;
pub const U64_LEN: usize = 8;
pub const PUBKEY_LEN: usize = 32;

/// Encoded size of a length-prefixed string
pub const fn string_len(s: &str) -> usize {
    U32_LEN + s.len()
}

/// Encoded size of an optional pubkey
pub const fn option_pubkey_len(value: Option<&Pubkey>) -> usize {
    match value {
        Some(_) => 1 + PUBKEY_LEN,
        None => 1,
    }
}

/// Encoded size of a pubkey list
pub const fn pubkey_list_len(count: usize) -> usize {
    U32_LEN + count * PUBKEY_LEN
}

#[derive(Debug)]
pub struct LengthCheckedWriter {
    operation: &'static str,
    buf: Vec<u8>,
}

impl LengthCheckedWriter {
    /// Start a payload with its 8-byte selector
    pub fn new(operation: &'static str, selector: [u8; SELECTOR_LEN], capacity: usize) -> Self {
        let mut buf = Vec::with_capacity(capacity);
        buf.extend_from_slice(&selector);
        Self { operation, buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_string(&mut self, value: &str) -> Result<&mut Self, EncodeError> {
        let len = u32::try_from(value.len()).map_err(|_| EncodeError::TooLong {
            field: "string",
            len: value.len(),
        })?;
        self.put_u32(len);
        self.buf.extend_from_slice(value.as_bytes());
        Ok(self)
    }

    pub fn put_option_pubkey(&mut self, value: Option<&Pubkey>) -> &mut Self {
        match value {
            Some(key) => {
                self.buf.push(1);
                self.buf.extend_from_slice(key.as_ref());
            }
            None => self.buf.push(0),
        }
        self
    }

    pub fn put_pubkey_list(&mut self, values: &[Pubkey]) -> Result<&mut Self, EncodeError> {
        let count = u32::try_from(values.len()).map_err(|_| EncodeError::TooLong {
            field: "pubkey list",
            len: values.len(),
        })?;
        self.put_u32(count);
        for key in values {
            self.buf.extend_from_slice(key.as_ref());
        }
        Ok(self)
    }

    /// Close the payload, checking it against the expected length
    pub fn finish(self, expected: usize) -> Result<Vec<u8>, EncodeError> {
        if self.buf.len() != expected {
            return Err(EncodeError::LengthMismatch {
                operation: self.operation,
                expected,
                actual: self.buf.len(),
            });
        }
        Ok(self.buf)
    }
}
