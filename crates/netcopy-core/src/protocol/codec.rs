//! Wire format codec for netcopy messages.
//!
//! A serialized message is a 16-byte header followed by the body:
//!
//! ```text
//! type:u32 LE | payload_length:u32 LE | sequence:u32 LE | reserved:u32 (zero)
//! ```
//!
//! Body primitives are little-endian integers, `u8` 0/1 booleans, and
//! length-prefixed strings/byte arrays (`u32` length + raw bytes). Decoding
//! is strict: underflow, trailing bytes, and unknown type codes all fail.
//!
//! On the transport each serialized (and, post-handshake, encrypted) message
//! travels as one frame: `[total_length:u32 LE][payload]`.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::{HEADER_SIZE, MAX_FRAME_SIZE};
use crate::crypto::SecurityLevel;
use crate::error::{Error, Result};
use crate::protocol::message::{msg_type, *};

// =============================================================================
// Encoding
// =============================================================================

/// Serialize a message with the given header sequence number.
pub fn encode(message: &Message, sequence: u32) -> Result<Bytes> {
    let mut body = BytesMut::new();
    encode_body(message, &mut body)?;

    if body.len() > u32::MAX as usize {
        return Err(Error::protocol("message body exceeds u32 length"));
    }

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    buf.put_u32_le(message.message_type());
    buf.put_u32_le(body.len() as u32);
    buf.put_u32_le(sequence);
    buf.put_u32_le(0); // reserved, must be zero on send
    buf.extend_from_slice(&body);
    Ok(buf.freeze())
}

fn encode_body(message: &Message, buf: &mut BytesMut) -> Result<()> {
    match message {
        Message::HandshakeRequest(m) => {
            put_string(buf, &m.client_version)?;
            put_bytes(buf, &m.client_nonce)?;
            buf.put_u8(m.security_level.as_wire());
        }
        Message::HandshakeResponse(m) => {
            put_string(buf, &m.server_version)?;
            put_bytes(buf, &m.server_nonce)?;
            buf.put_u8(m.auth_required as u8);
            buf.put_u8(m.accepted_security_level.as_wire());
        }
        Message::FileRequest(m) => {
            put_string(buf, &m.source_path)?;
            put_string(buf, &m.destination_path)?;
            buf.put_u8(m.recursive as u8);
            buf.put_u64_le(m.resume_offset);
        }
        Message::FileResponse(m) => {
            buf.put_u8(m.success as u8);
            put_string(buf, &m.error)?;
            buf.put_u64_le(m.file_size);
            buf.put_u64_le(m.resume_offset);
        }
        Message::FileData(m) => {
            buf.put_u64_le(m.offset);
            put_bytes(buf, &m.data)?;
            buf.put_u8(m.is_last_chunk as u8);
            buf.put_u8(m.compressed as u8);
        }
        Message::FileAck(m) => {
            buf.put_u64_le(m.bytes_received);
            buf.put_u8(m.success as u8);
            put_string(buf, &m.error)?;
        }
        Message::Error(m) => {
            buf.put_u32_le(m.code);
            put_string(buf, &m.description)?;
        }
    }
    Ok(())
}

fn put_string(buf: &mut BytesMut, value: &str) -> Result<()> {
    put_bytes(buf, value.as_bytes())
}

fn put_bytes(buf: &mut BytesMut, value: &[u8]) -> Result<()> {
    if value.len() > u32::MAX as usize {
        return Err(Error::protocol("field length exceeds u32"));
    }
    buf.put_u32_le(value.len() as u32);
    buf.extend_from_slice(value);
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Deserialize a message, returning it together with the header sequence
/// number. The input must be exactly one serialized message.
pub fn decode(data: &[u8]) -> Result<(Message, u32)> {
    if data.len() < HEADER_SIZE {
        return Err(Error::protocol(format!(
            "message too short: {} bytes",
            data.len()
        )));
    }

    let msg_type = u32::from_le_bytes(data[0..4].try_into().unwrap());
    let payload_length = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
    let sequence = u32::from_le_bytes(data[8..12].try_into().unwrap());
    // data[12..16] is reserved and ignored on receive.

    let body = &data[HEADER_SIZE..];
    if body.len() != payload_length {
        return Err(Error::protocol(format!(
            "payload length mismatch: header says {}, got {}",
            payload_length,
            body.len()
        )));
    }

    let mut reader = Reader::new(body);
    let message = decode_body(msg_type, &mut reader)?;
    reader.finish()?;
    Ok((message, sequence))
}

fn decode_body(msg_type: u32, r: &mut Reader<'_>) -> Result<Message> {
    let message = match msg_type {
        msg_type::HANDSHAKE_REQUEST => Message::HandshakeRequest(HandshakeRequest {
            client_version: r.read_string()?,
            client_nonce: r.read_bytes()?,
            security_level: SecurityLevel::from_wire(r.read_u8()?)?,
        }),
        msg_type::HANDSHAKE_RESPONSE => Message::HandshakeResponse(HandshakeResponse {
            server_version: r.read_string()?,
            server_nonce: r.read_bytes()?,
            auth_required: r.read_bool()?,
            accepted_security_level: SecurityLevel::from_wire(r.read_u8()?)?,
        }),
        msg_type::FILE_REQUEST => Message::FileRequest(FileRequest {
            source_path: r.read_string()?,
            destination_path: r.read_string()?,
            recursive: r.read_bool()?,
            resume_offset: r.read_u64()?,
        }),
        msg_type::FILE_RESPONSE => Message::FileResponse(FileResponse {
            success: r.read_bool()?,
            error: r.read_string()?,
            file_size: r.read_u64()?,
            resume_offset: r.read_u64()?,
        }),
        msg_type::FILE_DATA => Message::FileData(FileData {
            offset: r.read_u64()?,
            data: r.read_bytes()?,
            is_last_chunk: r.read_bool()?,
            compressed: r.read_bool()?,
        }),
        msg_type::FILE_ACK => Message::FileAck(FileAck {
            bytes_received: r.read_u64()?,
            success: r.read_bool()?,
            error: r.read_string()?,
        }),
        msg_type::ERROR_MESSAGE => Message::Error(ErrorMessage {
            code: r.read_u32()?,
            description: r.read_string()?,
        }),
        other => {
            return Err(Error::protocol(format!("unknown message type: {}", other)));
        }
    };
    Ok(message)
}

/// Bounds-checked cursor over a message body.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return Err(Error::protocol("buffer underflow"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| Error::protocol("string is not valid UTF-8"))
    }

    /// Every byte of the body must be consumed.
    fn finish(&self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(Error::protocol(format!(
                "{} trailing bytes after message body",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Frame I/O
// =============================================================================

/// Write one `[length][payload]` frame and flush.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_SIZE {
        return Err(Error::protocol(format!(
            "frame too large: {} bytes (max {})",
            payload.len(),
            MAX_FRAME_SIZE
        )));
    }

    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one `[length][payload]` frame, enforcing the frame size cap.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(Error::protocol(format!(
            "frame length {} exceeds maximum {}",
            len, MAX_FRAME_SIZE
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::HandshakeRequest(HandshakeRequest {
                client_version: "netcopy v1.0.0".into(),
                client_nonce: vec![7u8; 16],
                security_level: SecurityLevel::Aes256Gcm,
            }),
            Message::HandshakeResponse(HandshakeResponse {
                server_version: "netcopy v1.0.0".into(),
                server_nonce: vec![9u8; 16],
                auth_required: true,
                accepted_security_level: SecurityLevel::High,
            }),
            Message::FileRequest(FileRequest {
                source_path: "local/file.bin".into(),
                destination_path: "/srv/data/file.bin".into(),
                recursive: false,
                resume_offset: 1,
            }),
            Message::FileResponse(FileResponse {
                success: true,
                error: String::new(),
                file_size: 0,
                resume_offset: 65536,
            }),
            Message::FileData(FileData {
                offset: 131072,
                data: vec![0xAB; 300],
                is_last_chunk: true,
                compressed: false,
            }),
            Message::FileAck(FileAck::success(131372)),
            Message::Error(ErrorMessage {
                code: 42,
                description: "session torn down".into(),
            }),
        ]
    }

    #[test]
    fn round_trip_all_kinds() {
        for (i, message) in sample_messages().into_iter().enumerate() {
            let encoded = encode(&message, i as u32 + 1).unwrap();
            let (decoded, sequence) = decode(&encoded).unwrap();
            assert_eq!(decoded, message);
            assert_eq!(sequence, i as u32 + 1);
        }
    }

    #[test]
    fn header_layout() {
        let message = Message::FileAck(FileAck::success(0));
        let encoded = encode(&message, 5).unwrap();

        assert_eq!(u32::from_le_bytes(encoded[0..4].try_into().unwrap()), 6);
        assert_eq!(
            u32::from_le_bytes(encoded[4..8].try_into().unwrap()) as usize,
            encoded.len() - HEADER_SIZE
        );
        assert_eq!(u32::from_le_bytes(encoded[8..12].try_into().unwrap()), 5);
        // reserved is zero on send
        assert_eq!(u32::from_le_bytes(encoded[12..16].try_into().unwrap()), 0);
    }

    #[test]
    fn reserved_is_ignored_on_receive() {
        let message = Message::FileAck(FileAck::success(10));
        let mut encoded = encode(&message, 1).unwrap().to_vec();
        encoded[12..16].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        let (decoded, _) = decode(&encoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn unknown_type_fails() {
        let message = Message::FileAck(FileAck::success(0));
        let mut encoded = encode(&message, 1).unwrap().to_vec();
        encoded[0..4].copy_from_slice(&7u32.to_le_bytes()); // retired RESUME_REQUEST code
        assert!(matches!(
            decode(&encoded),
            Err(Error::Protocol { .. })
        ));

        encoded[0..4].copy_from_slice(&99u32.to_le_bytes());
        assert!(decode(&encoded).is_err());
    }

    #[test]
    fn truncated_body_fails() {
        let message = Message::FileRequest(FileRequest {
            source_path: "a".into(),
            destination_path: "/b".into(),
            recursive: true,
            resume_offset: 0,
        });
        let encoded = encode(&message, 1).unwrap();

        for cut in HEADER_SIZE..encoded.len() {
            assert!(decode(&encoded[..cut]).is_err(), "cut at {} accepted", cut);
        }
    }

    #[test]
    fn trailing_bytes_fail() {
        let message = Message::FileAck(FileAck::success(1));
        let encoded = encode(&message, 1).unwrap();

        // Extra byte beyond the declared payload length: length mismatch.
        let mut extended = encoded.to_vec();
        extended.push(0);
        assert!(decode(&extended).is_err());

        // Payload length inflated to cover a stray trailing byte: the body
        // reader must reject the leftovers.
        let mut inflated = encoded.to_vec();
        inflated.push(0);
        let body_len = (inflated.len() - HEADER_SIZE) as u32;
        inflated[4..8].copy_from_slice(&body_len.to_le_bytes());
        assert!(decode(&inflated).is_err());
    }

    #[test]
    fn header_too_short_fails() {
        assert!(decode(&[1, 0, 0]).is_err());
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn invalid_utf8_string_fails() {
        let message = Message::Error(ErrorMessage {
            code: 1,
            description: "ok".into(),
        });
        let mut encoded = encode(&message, 1).unwrap().to_vec();
        // Corrupt the string bytes (last two bytes of the body).
        let len = encoded.len();
        encoded[len - 2] = 0xFF;
        encoded[len - 1] = 0xFE;
        assert!(decode(&encoded).is_err());
    }

    #[test]
    fn string_length_underflow_fails() {
        // FILE_ACK whose error-string length runs past the end of the body.
        let mut body = BytesMut::new();
        body.put_u64_le(0);
        body.put_u8(0);
        body.put_u32_le(1000); // declared string length, no bytes follow

        let mut buf = BytesMut::new();
        buf.put_u32_le(msg_type::FILE_ACK);
        buf.put_u32_le(body.len() as u32);
        buf.put_u32_le(1);
        buf.put_u32_le(0);
        buf.extend_from_slice(&body);

        assert!(decode(&buf).is_err());
    }

    #[test]
    fn empty_file_data_round_trips() {
        let message = Message::FileData(FileData {
            offset: 0,
            data: vec![],
            is_last_chunk: true,
            compressed: false,
        });
        let encoded = encode(&message, 1).unwrap();
        let (decoded, _) = decode(&encoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_frame(&mut client, b"hello frame").await.unwrap();
        let payload = read_frame(&mut server).await.unwrap();
        assert_eq!(payload, b"hello frame");
    }

    #[tokio::test]
    async fn frame_consumes_exactly_one_frame() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_frame(&mut client, b"first").await.unwrap();
        write_frame(&mut client, b"second").await.unwrap();

        assert_eq!(read_frame(&mut server).await.unwrap(), b"first");
        assert_eq!(read_frame(&mut server).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn oversized_frame_rejected_on_read() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let bogus_len = (MAX_FRAME_SIZE as u32 + 1).to_le_bytes();
        tokio::io::AsyncWriteExt::write_all(&mut client, &bogus_len)
            .await
            .unwrap();

        assert!(matches!(
            read_frame(&mut server).await,
            Err(Error::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn oversized_frame_rejected_on_write() {
        let (mut client, _server) = tokio::io::duplex(64);
        let huge = vec![0u8; MAX_FRAME_SIZE + 1];
        assert!(write_frame(&mut client, &huge).await.is_err());
    }
}
