//! Byte-stuffing adapters for the UARTGW framing format.

use std::io::{self, Read, Write};

/// Frame delimiter byte. Never appears inside a frame.
pub const FRAME_DELIMITER: u8 = 0xfd;

/// Escape introducer byte. The byte following it is OR'd with `0x80`.
pub const ESCAPE_BYTE: u8 = 0xfc;

/// A writer that escapes `0xfd` and `0xfc` for the UARTGW.
///
/// `0xfd` (the frame delimiter) must be escaped within a frame. `0xfc`
/// introduces an escaped byte, so bytes which happen to be `0xfc` need to be
/// escaped as well.
pub struct EscapingWriter<W> {
    inner: W,
}

impl<W: Write> EscapingWriter<W> {
    pub fn new(inner: W) -> Self {
        EscapingWriter { inner }
    }
}

impl<W: Write> Write for EscapingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // Twice as long: in the worst case, every byte needs to be escaped.
        let mut escaped = Vec::with_capacity(buf.len() * 2);
        for &b in buf {
            if b == FRAME_DELIMITER || b == ESCAPE_BYTE {
                escaped.push(ESCAPE_BYTE);
                escaped.push(b & 0x7f);
            } else {
                escaped.push(b);
            }
        }
        self.inner.write_all(&escaped)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A reader that reverses the UARTGW byte stuffing.
pub struct UnescapingReader<R> {
    inner: R,
}

impl<R: Read> UnescapingReader<R> {
    pub fn new(inner: R) -> Self {
        UnescapingReader { inner }
    }
}

impl<R: Read> Read for UnescapingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut raw = vec![0u8; buf.len()];
        let n = self.inner.read(&mut raw)?;
        if n == 0 {
            return Ok(0);
        }

        let mut escape = false;
        let mut idx = 0;
        for &b in &raw[..n] {
            if b == ESCAPE_BYTE {
                escape = true;
                continue;
            }
            buf[idx] = if escape {
                escape = false;
                b | 0x80
            } else {
                b
            };
            idx += 1;
        }

        // We cannot end on an escape byte because the escape state would not
        // be carried over into the next read call. Force a read.
        if escape {
            let mut last = [0u8; 1];
            self.inner.read_exact(&mut last)?;
            buf[idx] = last[0] | 0x80;
            idx += 1;
        }

        Ok(idx)
    }
}
