/// Read-only blob views
///
/// A field can hold one binary record or a list of binary records; both are
/// exposed through [`Blob`], which presents the chunks as one contiguous byte
/// sequence.
use bytes::{Bytes, BytesMut};

use crate::error::{JdbcError, Result};
use crate::models::Value;

/// A byte sequence assembled from one or more binary chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    chunks: Vec<Bytes>,
}

impl Blob {
    pub fn single(data: Bytes) -> Self {
        Blob { chunks: vec![data] }
    }

    /// Composite view spanning all chunks, in order.
    pub fn composite(chunks: Vec<Bytes>) -> Self {
        Blob { chunks }
    }

    /// Build a view over a stored value.
    ///
    /// A single binary record is wrapped as-is and a list made only of binary
    /// records becomes a composite view. Any other shape yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Blob(data) => Some(Blob::single(data.clone())),
            list if list.is_blob_list() => {
                let Value::List(items) = list else {
                    return None;
                };
                let chunks = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Blob(data) => Some(data.clone()),
                        _ => None,
                    })
                    .collect();
                Some(Blob::composite(chunks))
            }
            _ => None,
        }
    }

    /// Total length in bytes.
    pub fn length(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Copy up to `length` bytes starting at the 1-based position `pos`.
    ///
    /// Reading past the end returns the available bytes.
    pub fn get_bytes(&self, pos: u64, length: usize) -> Result<Bytes> {
        if pos < 1 {
            return Err(JdbcError::argument("Blob.positionLessThanMin", &[&pos]));
        }
        let mut skip = usize::try_from(pos - 1)
            .map_err(|_| JdbcError::argument("Blob.positionOutOfRange", &[&pos]))?;
        let mut out = BytesMut::with_capacity(length);

        for chunk in &self.chunks {
            if out.len() == length {
                break;
            }
            if skip >= chunk.len() {
                skip -= chunk.len();
                continue;
            }
            let wanted = (length - out.len()).min(chunk.len() - skip);
            out.extend_from_slice(&chunk[skip..skip + wanted]);
            skip = 0;
        }
        Ok(out.freeze())
    }

    /// All bytes, concatenated.
    pub fn to_bytes(&self) -> Bytes {
        match self.chunks.as_slice() {
            [only] => only.clone(),
            chunks => {
                let mut out = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
                for chunk in chunks {
                    out.extend_from_slice(chunk);
                }
                out.freeze()
            }
        }
    }

    /// 1-based position of the first occurrence of `pattern` at or after
    /// `start`, or `None`.
    pub fn position(&self, pattern: &[u8], start: u64) -> Option<u64> {
        if pattern.is_empty() || start < 1 {
            return None;
        }
        let data = self.to_bytes();
        let from = usize::try_from(start - 1).ok()?;
        data.get(from..)?
            .windows(pattern.len())
            .position(|w| w == pattern)
            .map(|offset| (from + offset) as u64 + 1)
    }

    pub fn set_bytes(&mut self, _pos: u64, _data: &[u8]) -> Result<usize> {
        Err(JdbcError::unsupported("Blob::set_bytes"))
    }

    pub fn truncate(&mut self, _length: u64) -> Result<()> {
        Err(JdbcError::unsupported("Blob::truncate"))
    }
}
