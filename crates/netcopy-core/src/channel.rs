//! Secure channel: handshake plus encrypted framing.
//!
//! # Handshake flow
//!
//! - **Client**: sends `HandshakeRequest` (version, fresh 16-byte nonce,
//!   desired security level) in cleartext, then validates the
//!   `HandshakeResponse`.
//! - **Server**: receives the request, reflects the requested level,
//!   replies with `HandshakeResponse` (version, nonce, auth flag, accepted
//!   level) in cleartext.
//!
//! Both handshake frames travel unencrypted; afterwards both peers build
//! the negotiated cipher from the pre-shared key and every frame payload on
//! the wire is the cipher's envelope for the serialized message.
//!
//! Each peer stamps its outgoing frames with its own sequence counter
//! starting at 1; a received sequence that does not strictly increase is a
//! fatal protocol error. Closing the transport is the cancellation signal:
//! in-flight reads and writes surface transport errors and are not retried.

use std::time::Duration;

use rand::RngCore;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::constants::{HANDSHAKE_NONCE_LEN, VERSION_STRING};
use crate::crypto::{CipherSuite, SecretKey, SecurityLevel};
use crate::error::{Error, Result};
use crate::protocol::{codec, HandshakeRequest, HandshakeResponse, Message};

/// One end of a netcopy session.
pub struct SecureChannel<S> {
    stream: S,
    cipher: Option<CipherSuite>,
    /// Sequence number for the next frame this peer sends.
    send_sequence: u32,
    /// Highest sequence number received from the peer so far.
    last_recv_sequence: u32,
    /// Per-frame receive timeout; `None` waits forever.
    recv_timeout: Option<Duration>,
}

impl<S> SecureChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream. The channel starts in cleartext; encryption
    /// switches on when the handshake completes.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            cipher: None,
            send_sequence: 1,
            last_recv_sequence: 0,
            recv_timeout: None,
        }
    }

    pub fn with_timeout(stream: S, timeout: Duration) -> Self {
        let mut channel = Self::new(stream);
        if !timeout.is_zero() {
            channel.recv_timeout = Some(timeout);
        }
        channel
    }

    /// Install the session cipher; every subsequent frame is encrypted.
    pub fn enable_encryption(&mut self, cipher: CipherSuite) {
        self.cipher = Some(cipher);
    }

    pub fn security_level(&self) -> Option<SecurityLevel> {
        self.cipher.as_ref().map(CipherSuite::security_level)
    }

    /// Serialize, (optionally) encrypt, and send one message.
    pub async fn send(&mut self, message: &Message) -> Result<()> {
        let sequence = self.send_sequence;
        self.send_sequence = self.send_sequence.wrapping_add(1);

        let plaintext = codec::encode(message, sequence)?;
        let payload = match &self.cipher {
            Some(cipher) => cipher.encrypt(&plaintext)?,
            None => plaintext.to_vec(),
        };

        codec::write_frame(&mut self.stream, &payload).await
    }

    /// Receive, (optionally) decrypt, and deserialize one message, enforcing
    /// sequence monotonicity.
    pub async fn recv(&mut self) -> Result<Message> {
        let payload = match self.recv_timeout {
            Some(timeout) => tokio::time::timeout(timeout, codec::read_frame(&mut self.stream))
                .await
                .map_err(|_| Error::transport("receive timed out"))??,
            None => codec::read_frame(&mut self.stream).await?,
        };

        let plaintext = match &self.cipher {
            Some(cipher) => cipher.decrypt(&payload)?,
            None => payload,
        };

        let (message, sequence) = codec::decode(&plaintext)?;

        if sequence <= self.last_recv_sequence {
            return Err(Error::protocol(format!(
                "non-monotonic sequence number: got {}, last was {}",
                sequence, self.last_recv_sequence
            )));
        }
        self.last_recv_sequence = sequence;

        Ok(message)
    }

    /// Perform the client side of the handshake and switch to encrypted
    /// framing at the accepted security level.
    pub async fn handshake_initiate(
        &mut self,
        requested_level: SecurityLevel,
        key: &SecretKey,
    ) -> Result<HandshakeResponse> {
        let request = HandshakeRequest {
            client_version: VERSION_STRING.to_string(),
            client_nonce: random_nonce(),
            security_level: requested_level,
        };
        self.send(&Message::HandshakeRequest(request)).await?;

        let response = match self.recv().await? {
            Message::HandshakeResponse(response) => response,
            other => {
                return Err(Error::protocol(format!(
                    "expected HandshakeResponse, got {}",
                    other.type_name()
                )));
            }
        };

        debug!(
            server_version = %response.server_version,
            level = %response.accepted_security_level,
            "handshake completed"
        );

        self.enable_encryption(CipherSuite::new(response.accepted_security_level, key));
        Ok(response)
    }

    /// Perform the server side of the handshake. The requested security
    /// level is accepted as-is and reflected back to the client.
    pub async fn handshake_respond(
        &mut self,
        auth_required: bool,
        key: &SecretKey,
    ) -> Result<HandshakeRequest> {
        let request = match self.recv().await? {
            Message::HandshakeRequest(request) => request,
            other => {
                return Err(Error::protocol(format!(
                    "expected HandshakeRequest, got {}",
                    other.type_name()
                )));
            }
        };

        debug!(
            client_version = %request.client_version,
            level = %request.security_level,
            "handshake request received"
        );

        let response = HandshakeResponse {
            server_version: VERSION_STRING.to_string(),
            server_nonce: random_nonce(),
            auth_required,
            accepted_security_level: request.security_level,
        };
        self.send(&Message::HandshakeResponse(response)).await?;

        self.enable_encryption(CipherSuite::new(request.security_level, key));
        Ok(request)
    }
}

fn random_nonce() -> Vec<u8> {
    let mut nonce = vec![0u8; HANDSHAKE_NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}
