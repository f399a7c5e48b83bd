use std::io::{self, Read};

//===========================================================================//

/// A reader wrapper that tracks how many bytes have been consumed.
///
/// The ICO directory declares an absolute file offset for every entry's
/// image data, so the decoder needs to know its exact position in the
/// stream at all times, without requiring `Seek`.
pub(crate) struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    pub(crate) fn new(inner: R) -> CountingReader<R> {
        CountingReader { inner, count: 0 }
    }

    /// Returns the number of bytes read from the underlying stream so far.
    pub(crate) fn bytes_read(&self) -> u64 {
        self.count
    }

    /// Consumes and discards up to `count` bytes, returning the number of
    /// bytes actually skipped (less than `count` only at end of stream).
    pub(crate) fn skip(&mut self, count: u64) -> io::Result<u64> {
        io::copy(&mut Read::by_ref(self).take(count), &mut io::sink())
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let num_bytes = self.inner.read(buf)?;
        self.count += num_bytes as u64;
        Ok(num_bytes)
    }
}

//===========================================================================//


//===========================================================================//
