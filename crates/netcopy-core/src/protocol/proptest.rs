//! Property-based tests for the protocol codec.
//!
//! These tests use proptest to verify:
//! - Codec roundtrip for arbitrary messages
//! - Codec never panics on arbitrary input
//! - Length prefix correctness

#![cfg(test)]

use proptest::prelude::*;

use crate::constants::HEADER_SIZE;
use crate::crypto::SecurityLevel;
use crate::protocol::codec::{decode, encode};
use crate::protocol::message::*;

// =============================================================================
// Arbitrary Generators
// =============================================================================

fn arb_security_level() -> impl Strategy<Value = SecurityLevel> {
    prop_oneof![
        Just(SecurityLevel::High),
        Just(SecurityLevel::Fast),
        Just(SecurityLevel::Aes),
        Just(SecurityLevel::Aes256Gcm),
    ]
}

prop_compose! {
    fn arb_handshake_request()(
        client_version in "[ -~]{0,64}",
        client_nonce in prop::collection::vec(any::<u8>(), 0..32),
        security_level in arb_security_level(),
    ) -> HandshakeRequest {
        HandshakeRequest { client_version, client_nonce, security_level }
    }
}

prop_compose! {
    fn arb_handshake_response()(
        server_version in "[ -~]{0,64}",
        server_nonce in prop::collection::vec(any::<u8>(), 0..32),
        auth_required in any::<bool>(),
        accepted_security_level in arb_security_level(),
    ) -> HandshakeResponse {
        HandshakeResponse { server_version, server_nonce, auth_required, accepted_security_level }
    }
}

prop_compose! {
    fn arb_file_request()(
        source_path in "[ -~]{0,128}",
        destination_path in "[ -~]{0,128}",
        recursive in any::<bool>(),
        resume_offset in any::<u64>(),
    ) -> FileRequest {
        FileRequest { source_path, destination_path, recursive, resume_offset }
    }
}

prop_compose! {
    fn arb_file_response()(
        success in any::<bool>(),
        error in "[ -~]{0,128}",
        file_size in any::<u64>(),
        resume_offset in any::<u64>(),
    ) -> FileResponse {
        FileResponse { success, error, file_size, resume_offset }
    }
}

prop_compose! {
    fn arb_file_data()(
        offset in any::<u64>(),
        data in prop::collection::vec(any::<u8>(), 0..4096),
        is_last_chunk in any::<bool>(),
        compressed in any::<bool>(),
    ) -> FileData {
        FileData { offset, data, is_last_chunk, compressed }
    }
}

prop_compose! {
    fn arb_file_ack()(
        bytes_received in any::<u64>(),
        success in any::<bool>(),
        error in "[ -~]{0,128}",
    ) -> FileAck {
        FileAck { bytes_received, success, error }
    }
}

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        arb_handshake_request().prop_map(Message::HandshakeRequest),
        arb_handshake_response().prop_map(Message::HandshakeResponse),
        arb_file_request().prop_map(Message::FileRequest),
        arb_file_response().prop_map(Message::FileResponse),
        arb_file_data().prop_map(Message::FileData),
        arb_file_ack().prop_map(Message::FileAck),
        (any::<u32>(), "[ -~]{0,128}")
            .prop_map(|(code, description)| Message::Error(ErrorMessage { code, description })),
    ]
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn roundtrip_arbitrary_messages(message in arb_message(), sequence in any::<u32>()) {
        let encoded = encode(&message, sequence).unwrap();
        let (decoded, decoded_sequence) = decode(&encoded).unwrap();
        prop_assert_eq!(decoded, message);
        prop_assert_eq!(decoded_sequence, sequence);
    }

    #[test]
    fn payload_length_matches_body(message in arb_message()) {
        let encoded = encode(&message, 1).unwrap();
        let declared = u32::from_le_bytes(encoded[4..8].try_into().unwrap()) as usize;
        prop_assert_eq!(declared, encoded.len() - HEADER_SIZE);
    }

    #[test]
    fn decode_never_panics_on_garbage(data in prop::collection::vec(any::<u8>(), 0..512)) {
        // Must return Ok or Err, never panic.
        let _ = decode(&data);
    }

    #[test]
    fn decode_rejects_any_truncation(message in arb_message()) {
        let encoded = encode(&message, 1).unwrap();
        if encoded.len() > HEADER_SIZE {
            let cut = encoded.len() - 1;
            prop_assert!(decode(&encoded[..cut]).is_err());
        }
    }
}
