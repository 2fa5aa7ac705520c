//! The seekable byte-stream contract the ring cache wraps.
//!
//! This is the "underlying seekable byte-stream provider" named as an
//! out-of-scope external collaborator: the host application supplies one,
//! the ring cache only consumes it.

use std::io;

/// Capabilities the ring cache's producer loop needs from the stream it
/// reads ahead of the consumer.
///
/// A source with unknown or zero size disables the filter (`RingCache::open`
/// returns [`crate::CacheError::UnknownSize`]).
pub trait Source: Send {
    /// Total size of the stream in bytes. Must be `> 0` for the filter to
    /// be installable.
    fn len(&self) -> u64;

    /// Whether the source supports repositioning at all.
    fn can_seek(&self) -> bool;

    /// The source's current read position.
    fn position(&self) -> u64;

    /// Blocking read with short-read semantics: `Ok(n)` with `n < buf.len()`
    /// signals the source is at or near end-of-stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Reposition the source's read cursor to an absolute offset.
    fn seek(&mut self, offset: u64) -> io::Result<()>;
}

/// Adapts any `Read + Seek` stream into a [`Source`] by capturing its size
/// and position once at construction, since `Seek` alone has no
/// non-mutating way to ask either question.
pub struct SeekableSource<R> {
    inner: R,
    len: u64,
    position: u64,
}

impl<R: io::Read + io::Seek> SeekableSource<R> {
    /// Wrap `inner`, seeking to its end to measure `len` and back to its
    /// current position.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let position = inner.stream_position()?;
        let len = inner.seek(io::SeekFrom::End(0))?;
        inner.seek(io::SeekFrom::Start(position))?;
        Ok(Self { inner, len, position })
    }
}

impl<R: io::Read + io::Seek + Send> Source for SeekableSource<R> {
    fn len(&self) -> u64 {
        self.len
    }

    fn can_seek(&self) -> bool {
        true
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.inner.seek(io::SeekFrom::Start(offset))?;
        self.position = offset;
        Ok(())
    }
}
