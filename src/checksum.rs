//! Checksum.
//!
//! This module computes the SHA-256 digest of a download "on the fly" while it is written to disc.
//! The digest is only reported, never compared against anything.

use sha2::{Digest, Sha256};
use std::io::{Result as IoResult, Write};

/// Writer that hashes everything passing through it.
pub(crate) struct ChecksumWrite<W> {
    hasher: Sha256,
    write: W,
    written: u64,
}

impl<W: Write> ChecksumWrite<W> {
    /// Creates a new `ChecksumWrite` on top of the given [Write].
    pub(crate) fn new(write: W) -> Self {
        Self {
            hasher: Sha256::new(),
            write,
            written: 0,
        }
    }

    /// Flushes the inner writer and returns the number of bytes written together with the lower-case hex digest.
    pub(crate) fn finish(mut self) -> IoResult<(u64, String)> {
        self.flush()?;
        let hash = self.hasher.finalize();
        let checksum = base16ct::lower::encode_string(&hash);

        Ok((self.written, checksum))
    }
}

impl<W: Write> Write for ChecksumWrite<W> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        let n = self.write.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;

        Ok(n)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.write.flush()
    }
}
