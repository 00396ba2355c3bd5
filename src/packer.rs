//! Serialization of one record into a caller-owned buffer.
//!
//! glibc hands every `get*_r` call a fixed-shape struct plus a scratch buffer;
//! the struct's string fields must end up pointing into that buffer. Packing is
//! done in two steps: [`pack`] checks the exact required size and writes the
//! field bytes through a [`BufferWriter`], recording offsets only, and then
//! [`Pack::apply`] turns those offsets into addresses with [`address`].
//! Nothing is written unless the whole record fits.

use libc::c_char;
use std::mem::{align_of, size_of};

pub const POINTER_SIZE: usize = size_of::<*mut c_char>();
pub const POINTER_ALIGN: usize = align_of::<*mut c_char>();

// Pointer slots are written as native-endian `usize` values.
const _: () = assert!(size_of::<usize>() == POINTER_SIZE);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("buffer too small: {required} bytes required, {capacity} available")]
pub struct TooSmall {
    pub required: usize,
    pub capacity: usize,
}

/// A record that can be laid out in an NSS result buffer.
pub trait Pack {
    /// The libc struct handed to us by glibc.
    type Target;
    /// Buffer offsets of every variable-length field.
    type Offsets;

    /// Exact number of bytes [`Pack::write`] consumes for a buffer starting at `base`.
    ///
    /// The base address matters only for records that store pointer arrays,
    /// since those are aligned at their absolute address.
    fn required_len(&self, base: usize) -> usize;

    fn write(&self, writer: &mut BufferWriter<'_>) -> Result<Self::Offsets, TooSmall>;

    /// Fills `out` with numeric fields by value and string fields as pointers into `base`.
    fn apply(&self, offsets: &Self::Offsets, base: *mut c_char, out: &mut Self::Target);
}

/// Bytes needed to store `value` as a C string.
pub fn c_string_len(value: &str) -> usize {
    value.len().saturating_add(1)
}

/// Bytes needed for a null-terminated array of `count` pointers placed at address `addr`,
/// including the alignment padding in front of it.
pub fn pointer_array_len(addr: usize, count: usize) -> usize {
    padding(addr, POINTER_ALIGN)
        .saturating_add(count.saturating_add(1).saturating_mul(POINTER_SIZE))
}

fn padding(addr: usize, align: usize) -> usize {
    (align - addr % align) % align
}

/// Converts a buffer offset produced by [`BufferWriter`] into an address.
pub fn address(base: *mut c_char, offset: usize) -> *mut c_char {
    base.wrapping_add(offset)
}

/// Sequential writer over the caller's buffer.
///
/// Every write is bounds-checked; a write that does not fit fails with
/// [`TooSmall`] instead of touching memory past the end.
pub struct BufferWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> BufferWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn base_addr(&self) -> usize {
        self.buf.as_ptr() as usize
    }

    fn reserve(&mut self, len: usize) -> Result<&mut [u8], TooSmall> {
        let start = self.pos;
        let end = match start.checked_add(len) {
            Some(end) if end <= self.buf.len() => end,
            _ => {
                return Err(TooSmall {
                    required: start.saturating_add(len),
                    capacity: self.buf.len(),
                })
            }
        };
        self.pos = end;
        Ok(&mut self.buf[start..end])
    }

    /// Writes `value` followed by a NUL byte and returns the offset it starts at.
    pub fn put_str(&mut self, value: &str) -> Result<usize, TooSmall> {
        let offset = self.pos;
        let slot = self.reserve(c_string_len(value))?;
        let (text, nul) = slot.split_at_mut(value.len());
        text.copy_from_slice(value.as_bytes());
        nul[0] = 0;
        Ok(offset)
    }

    /// Writes an aligned, null-terminated array of pointers to previously written
    /// strings and returns the offset of its first slot.
    pub fn put_pointer_array(&mut self, offsets: &[usize]) -> Result<usize, TooSmall> {
        let base = self.base_addr();
        let pad = padding(base.wrapping_add(self.pos), POINTER_ALIGN);
        self.reserve(pad)?;

        let start = self.pos;
        for &offset in offsets {
            let target = base.wrapping_add(offset);
            self.reserve(POINTER_SIZE)?.copy_from_slice(&target.to_ne_bytes());
        }
        self.reserve(POINTER_SIZE)?.copy_from_slice(&0usize.to_ne_bytes());
        Ok(start)
    }
}

/// Lays `record` out in `buffer`, or reports the exact size it needs.
///
/// On `TooSmall` the buffer is left untouched.
pub fn pack<R: Pack>(record: &R, buffer: &mut [u8]) -> Result<R::Offsets, TooSmall> {
    let capacity = buffer.len();
    let required = record.required_len(buffer.as_ptr() as usize);
    if required > capacity {
        return Err(TooSmall { required, capacity });
    }

    let mut writer = BufferWriter::new(buffer);
    record.write(&mut writer)
}

/// [`pack`] followed by [`Pack::apply`] into `out`.
pub fn pack_into<R: Pack>(record: &R, buffer: &mut [u8], out: &mut R::Target) -> Result<(), TooSmall> {
    let offsets = pack(record, buffer)?;
    record.apply(&offsets, buffer.as_mut_ptr().cast::<c_char>(), out);
    Ok(())
}
