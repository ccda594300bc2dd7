//! Control message encoding and decoding.
//!
//! Each message is a tag byte followed by its fields; strings carry a
//! 16-bit length prefix, sizes are 64-bit. Decoding is strict: unknown
//! tags, truncated fields, trailing bytes and invalid UTF-8 are all
//! rejected as malformed.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::WireError;
use crate::frame::{read_frame, write_frame};
use crate::types::CatalogEntry;

const TAG_CATALOG: u8 = 0x01;
const TAG_REQUEST: u8 = 0x02;
const TAG_FILE_HEADER: u8 = 0x03;
const TAG_ERROR: u8 = 0x04;
const TAG_READY: u8 = 0x05;
const TAG_DISCONNECT: u8 = 0x06;

/// A control message on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Server -> client: the files currently advertised.
    Catalog(Vec<CatalogEntry>),
    /// Client -> server: request one file by catalog name.
    Request { name: String },
    /// Server -> client: the requested file's name and exact size.
    FileHeader { name: String, size: u64 },
    /// Server -> client: the request cannot be served.
    Error { message: String },
    /// Client -> server: start streaming.
    Ready,
    /// Client -> server: closing without a request.
    Disconnect,
}

impl Message {
    /// Encodes the message into a frame payload.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::new();
        match self {
            Message::Catalog(entries) => {
                buf.push(TAG_CATALOG);
                buf.extend_from_slice(&(entries.len() as u32).to_be_bytes());
                for entry in entries {
                    put_str(&mut buf, &entry.name)?;
                    buf.extend_from_slice(&entry.size.to_be_bytes());
                }
            }
            Message::Request { name } => {
                buf.push(TAG_REQUEST);
                put_str(&mut buf, name)?;
            }
            Message::FileHeader { name, size } => {
                buf.push(TAG_FILE_HEADER);
                put_str(&mut buf, name)?;
                buf.extend_from_slice(&size.to_be_bytes());
            }
            Message::Error { message } => {
                buf.push(TAG_ERROR);
                put_str(&mut buf, message)?;
            }
            Message::Ready => buf.push(TAG_READY),
            Message::Disconnect => buf.push(TAG_DISCONNECT),
        }
        Ok(buf)
    }

    /// Decodes a frame payload into a message.
    pub fn decode(payload: &[u8]) -> Result<Message, WireError> {
        let mut reader = FieldReader::new(payload);
        let tag = reader.u8()?;

        let msg = match tag {
            TAG_CATALOG => {
                let count = reader.u32()?;
                let mut entries = Vec::with_capacity(count.min(1024) as usize);
                for _ in 0..count {
                    let name = reader.str()?;
                    let size = reader.u64()?;
                    entries.push(CatalogEntry { name, size });
                }
                Message::Catalog(entries)
            }
            TAG_REQUEST => Message::Request {
                name: reader.str()?,
            },
            TAG_FILE_HEADER => Message::FileHeader {
                name: reader.str()?,
                size: reader.u64()?,
            },
            TAG_ERROR => Message::Error {
                message: reader.str()?,
            },
            TAG_READY => Message::Ready,
            TAG_DISCONNECT => Message::Disconnect,
            other => {
                return Err(WireError::Malformed(format!("unknown tag 0x{other:02x}")));
            }
        };

        reader.finish()?;
        Ok(msg)
    }
}

/// Writes one message as a frame.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &Message,
) -> Result<(), WireError> {
    let payload = msg.encode()?;
    write_frame(writer, &payload).await
}

/// Reads one message from the stream.
///
/// Returns `None` on clean EOF between messages.
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Message>, WireError> {
    match read_frame(reader).await? {
        Some(payload) => Ok(Some(Message::decode(&payload)?)),
        None => Ok(None),
    }
}

/// Appends a 16-bit length-prefixed UTF-8 string.
fn put_str(buf: &mut Vec<u8>, s: &str) -> Result<(), WireError> {
    let bytes = s.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(WireError::Malformed(format!(
            "string too long: {} bytes (max {})",
            bytes.len(),
            u16::MAX
        )));
    }
    buf.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Sequential field reader over a frame payload.
struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.pos + n > self.buf.len() {
            return Err(WireError::Malformed("truncated message".into()));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn str(&mut self) -> Result<String, WireError> {
        let len = u16::from_be_bytes(self.take(2)?.try_into().unwrap());
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| WireError::Malformed(format!("invalid UTF-8 string: {e}")))
    }

    /// Rejects trailing bytes after the last field.
    fn finish(&self) -> Result<(), WireError> {
        if self.pos != self.buf.len() {
            return Err(WireError::Malformed(format!(
                "{} trailing bytes after message",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}
