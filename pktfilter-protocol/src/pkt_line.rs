//! pkt-line framing over a blocking byte stream.
//!
//! ```text
//! [len: 4 lowercase hex digits, counts itself][payload: len - 4 bytes]
//! 0000 = flush (end of a group of lines or payload chunks)
//! ```

use std::io::{self, Read, Write};

use crate::error::{violation, FilterError};

/// Largest packet on the wire, header included.
pub const LARGE_PACKET_MAX: usize = 65520;
/// Largest payload a single packet can carry.
pub const LARGE_PACKET_DATA_MAX: usize = LARGE_PACKET_MAX - HEADER_LEN;

const HEADER_LEN: usize = 4;
const FLUSH: &[u8; HEADER_LEN] = b"0000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Data(Vec<u8>),
    Flush,
    /// Clean end of stream at a packet boundary.
    Eof,
}

/// Duplex pkt-line channel: reads from `R`, writes to `W`.
#[derive(Debug)]
pub struct PktChannel<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> PktChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

impl<R: Read, W> PktChannel<R, W> {
    pub fn read_packet(&mut self) -> Result<Packet, FilterError> {
        let mut header = [0u8; HEADER_LEN];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(Packet::Eof),
            HEADER_LEN => {}
            n => {
                return Err(violation(format!(
                    "truncated packet header ({n} of {HEADER_LEN} bytes)"
                )))
            }
        }

        let len = parse_header(&header)?;
        if len == 0 {
            return Ok(Packet::Flush);
        }
        if len < HEADER_LEN {
            return Err(violation(format!("unexpected special packet '{len:04x}'")));
        }
        if len > LARGE_PACKET_MAX {
            return Err(violation(format!(
                "packet length {len} exceeds maximum of {LARGE_PACKET_MAX}"
            )));
        }

        let mut data = vec![0u8; len - HEADER_LEN];
        let got = read_full(&mut self.reader, &mut data)?;
        if got != data.len() {
            return Err(violation(format!(
                "truncated packet ({got} of {} payload bytes)",
                data.len()
            )));
        }
        Ok(Packet::Data(data))
    }

    /// Read one text line. `None` means flush; end of stream is fatal.
    pub fn read_line(&mut self) -> Result<Option<String>, FilterError> {
        match self.read_packet()? {
            Packet::Data(data) => decode_line(data).map(Some),
            Packet::Flush => Ok(None),
            Packet::Eof => Err(violation("unexpected EOF while reading a line")),
        }
    }

    /// Read a `key=value` line and return the value. `None` means the peer
    /// closed the stream; a flush, another key or an empty value is fatal.
    pub fn read_key_value(&mut self, key: &str) -> Result<Option<String>, FilterError> {
        let line = match self.read_packet()? {
            Packet::Data(data) => decode_line(data)?,
            Packet::Flush => String::new(),
            Packet::Eof => return Ok(None),
        };
        match line
            .strip_prefix(key)
            .and_then(|rest| rest.strip_prefix('='))
        {
            Some(value) if !value.is_empty() => Ok(Some(value.to_owned())),
            _ => Err(violation(format!("bad {key}: '{line}'"))),
        }
    }

    /// Require the next packet to be a flush.
    pub fn expect_flush(&mut self, what: &str) -> Result<(), FilterError> {
        match self.read_packet()? {
            Packet::Flush => Ok(()),
            Packet::Data(data) => Err(violation(format!(
                "bad {what}: '{}'",
                String::from_utf8_lossy(&data)
            ))),
            Packet::Eof => Err(violation(format!("bad {what}: unexpected EOF"))),
        }
    }

    /// Collect payload packets up to the closing flush.
    pub fn read_stream(&mut self) -> Result<Vec<u8>, FilterError> {
        let mut buf = Vec::new();
        loop {
            match self.read_packet()? {
                Packet::Data(data) => buf.extend_from_slice(&data),
                Packet::Flush => return Ok(buf),
                Packet::Eof => return Err(violation("unexpected EOF while reading content")),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

impl<R, W: Write> PktChannel<R, W> {
    pub fn write_packet(&mut self, data: &[u8]) -> Result<(), FilterError> {
        if data.len() > LARGE_PACKET_DATA_MAX {
            return Err(violation(format!(
                "packet payload of {} bytes exceeds maximum of {LARGE_PACKET_DATA_MAX}",
                data.len()
            )));
        }
        write!(self.writer, "{:04x}", data.len() + HEADER_LEN)?;
        self.writer.write_all(data)?;
        Ok(())
    }

    pub fn write_line(&mut self, line: &str) -> Result<(), FilterError> {
        self.write_packet(line.as_bytes())
    }

    /// Write a flush packet and push everything buffered so far to the peer.
    pub fn write_flush(&mut self) -> Result<(), FilterError> {
        self.writer.write_all(FLUSH)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write `content` as maximum-sized packets without a closing flush.
    /// Returns the number of packets written.
    pub fn write_stream(&mut self, content: &[u8]) -> Result<usize, FilterError> {
        let mut packets = 0;
        for chunk in content.chunks(LARGE_PACKET_DATA_MAX) {
            self.write_packet(chunk)?;
            packets += 1;
        }
        Ok(packets)
    }
}

/// Fill `buf` unless the stream ends first; returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

fn parse_header(header: &[u8; HEADER_LEN]) -> Result<usize, FilterError> {
    let text = std::str::from_utf8(header)
        .ok()
        .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| {
            violation(format!(
                "bad packet header '{}'",
                String::from_utf8_lossy(header)
            ))
        })?;
    usize::from_str_radix(text, 16)
        .map_err(|_| violation(format!("bad packet header '{text}'")))
}

fn decode_line(mut data: Vec<u8>) -> Result<String, FilterError> {
    if data.last() == Some(&b'\n') {
        data.pop();
    }
    String::from_utf8(data).map_err(|err| {
        violation(format!(
            "line is not valid UTF-8: '{}'",
            String::from_utf8_lossy(err.as_bytes())
        ))
    })
}
