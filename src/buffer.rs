//! Byte-oriented streaming I/O: a bounded reader over an immutable slice and
//! a growable writer, both used directly by `crate::binary`.

use bytes::BytesMut;

use crate::error::{Error, Result};

const DEFAULT_WRITE_CAPACITY: usize = 4096;

/// Reads from an immutable byte slice, advancing an internal offset. Never
/// decodes multi-byte integers itself — that's `crate::binary`'s job.
pub struct ReadBuffer<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ReadBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ReadBuffer { data, offset: 0 }
    }

    /// Bytes not yet consumed.
    pub fn available(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    /// Borrow the next `n` bytes without copying, advancing the offset.
    pub fn read(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.available() {
            return Err(Error::end_of_input());
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    /// Copy the next `n` bytes out, advancing the offset.
    pub fn take(&mut self, n: usize) -> Result<Vec<u8>> {
        self.read(n).map(|s| s.to_vec())
    }

    /// Discard the next `n` bytes without materializing them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read(n).map(|_| ())
    }
}

/// A growable byte sink. Initial capacity defaults to 4096 bytes; growth
/// doubles the current allocation, or grows by exactly the shortfall when
/// doubling would still be insufficient for the write at hand.
pub struct WriteBuffer {
    buf: BytesMut,
}

impl WriteBuffer {
    pub fn new() -> Self {
        WriteBuffer::with_capacity(DEFAULT_WRITE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        WriteBuffer {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    fn reserve_additional(&mut self, additional: usize) {
        let needed = self.buf.len() + additional;
        if needed <= self.buf.capacity() {
            return;
        }
        let doubled = self.buf.capacity().saturating_mul(2);
        let target = doubled.max(needed);
        self.buf.reserve(target - self.buf.capacity());
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.reserve_additional(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    pub fn length(&self) -> usize {
        self.buf.len()
    }

    pub fn value(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        WriteBuffer::new()
    }
}

/// Optional resource bounds for the binary reader (ambient addition, off by
/// default). Embedding a core like this one in a service that accepts
/// untrusted bytes needs a way to bound container sizes and nesting depth
/// before they're fully decoded.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_container_size: Option<usize>,
    pub max_string_size: Option<usize>,
    pub max_recursion_depth: Option<usize>,
}

impl Limits {
    pub fn unbounded() -> Self {
        Limits::default()
    }

    pub fn check_container_size(&self, size: usize) -> Result<()> {
        if let Some(max) = self.max_container_size {
            if size > max {
                return Err(Error::size_limit(format!(
                    "container size {size} exceeds maximum allowed size of {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn check_string_size(&self, size: usize) -> Result<()> {
        if let Some(max) = self.max_string_size {
            if size > max {
                return Err(Error::size_limit(format!(
                    "byte array size {size} exceeds maximum allowed size of {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn check_depth(&self, depth: usize) -> Result<()> {
        if let Some(max) = self.max_recursion_depth {
            if depth > max {
                return Err(Error::depth_limit(format!(
                    "maximum recursion depth {max} exceeded"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_buffer_tracks_offset_and_availability() {
        let data = [1u8, 2, 3, 4, 5];
        let mut rb = ReadBuffer::new(&data);
        assert_eq!(rb.available(), 5);
        assert_eq!(rb.read(2).unwrap(), &[1, 2]);
        assert_eq!(rb.available(), 3);
        assert_eq!(rb.take(3).unwrap(), vec![3, 4, 5]);
        assert_eq!(rb.available(), 0);
    }

    #[test]
    fn read_buffer_rejects_over_read() {
        let data = [1u8, 2];
        let mut rb = ReadBuffer::new(&data);
        assert!(rb.read(3).is_err());
    }

    #[test]
    fn write_buffer_grows_and_reports_value() {
        let mut wb = WriteBuffer::with_capacity(4);
        wb.write(&[1, 2, 3]);
        wb.write(&[4, 5, 6, 7, 8]);
        assert_eq!(wb.value(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(wb.length(), 8);
        wb.clear();
        assert_eq!(wb.length(), 0);
    }

    #[test]
    fn limits_reject_oversized_containers() {
        let limits = Limits {
            max_container_size: Some(10),
            ..Limits::default()
        };
        assert!(limits.check_container_size(5).is_ok());
        assert!(limits.check_container_size(11).is_err());
    }
}
