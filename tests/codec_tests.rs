//! Codec Tests
//!
//! Tests for request and response header encoding/decoding.

use std::io::Cursor;

use filevault::protocol::{
    decode_request_header, decode_response_header, decode_u32_le, encode_request,
    encode_request_header, encode_response_header, encode_u32_le, OpCode, Request,
    ResponseHeader, StatusCode, MAX_NAME_LEN, PROTOCOL_VERSION, REQUEST_PREFIX_SIZE,
    RESPONSE_PREFIX_SIZE,
};
use filevault::VaultError;
use proptest::prelude::*;

// =============================================================================
// Wire Format Verification Tests
// =============================================================================

#[test]
fn test_wire_format_request_header() {
    let encoded =
        encode_request_header(0x0403_0201, 1, OpCode::RestoreFile, Some("ab.txt")).unwrap();

    // Expected: [01 02 03 04][01][C8][06 00][a b . t x t]
    //           client_id LE  ver op(200) name_len name
    assert_eq!(&encoded[0..4], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(encoded[4], 1);
    assert_eq!(encoded[5], 200);
    assert_eq!(&encoded[6..8], &[0x06, 0x00]);
    assert_eq!(&encoded[8..], b"ab.txt");
}

#[test]
fn test_wire_format_list_request_has_no_name() {
    let encoded = encode_request_header(7, 1, OpCode::GenerateFilesList, None).unwrap();
    assert_eq!(encoded, vec![7, 0, 0, 0, 1, 202]);
    assert_eq!(encoded.len(), REQUEST_PREFIX_SIZE);
}

#[test]
fn test_empty_name_omits_name_fields() {
    let encoded = encode_request_header(7, 1, OpCode::DeleteFile, Some("")).unwrap();
    assert_eq!(encoded.len(), REQUEST_PREFIX_SIZE);
}

#[test]
fn test_wire_format_backup_request_appends_size() {
    let request = Request::Backup {
        name: "f".to_string(),
        size: 2500,
    };
    let encoded = encode_request(42, PROTOCOL_VERSION, &request).unwrap();

    assert_eq!(
        encoded,
        vec![42, 0, 0, 0, 1, 100, 1, 0, b'f', 0xC4, 0x09, 0x00, 0x00]
    );
}

#[test]
fn test_wire_format_response_header() {
    let header = ResponseHeader::with_name(1, StatusCode::SuccessRestoreFile, "x");
    let encoded = encode_response_header(&header).unwrap();

    // 210 = 0x00D2, 1001 = 0x03E9
    assert_eq!(encoded, vec![1, 0xD2, 0x00, 0x01, 0x00, b'x']);

    let header = ResponseHeader::new(1, StatusCode::ErrorUserHasNoFiles);
    assert_eq!(encode_response_header(&header).unwrap(), vec![1, 0xEA, 0x03]);
}

#[test]
fn test_response_name_omitted_for_plain_status() {
    // A stray name on a status without name fields never reaches the wire
    let header = ResponseHeader::with_name(1, StatusCode::SuccessBackupFile, "ignored");
    let encoded = encode_response_header(&header).unwrap();
    assert_eq!(encoded.len(), RESPONSE_PREFIX_SIZE);
}

#[test]
fn test_u32_le() {
    assert_eq!(encode_u32_le(0x1122_3344), [0x44, 0x33, 0x22, 0x11]);

    let mut cursor = Cursor::new(vec![0x44, 0x33, 0x22, 0x11]);
    assert_eq!(decode_u32_le(&mut cursor).unwrap(), 0x1122_3344);
}

// =============================================================================
// Encoding Error Tests
// =============================================================================

#[test]
fn test_name_at_length_limit() {
    let name = "a".repeat(MAX_NAME_LEN);
    let encoded = encode_request_header(1, 1, OpCode::BackupFile, Some(&name)).unwrap();
    assert_eq!(&encoded[6..8], &[0xFF, 0xFF]);
    assert_eq!(encoded.len(), REQUEST_PREFIX_SIZE + 2 + MAX_NAME_LEN);
}

#[test]
fn test_name_too_long() {
    let name = "a".repeat(MAX_NAME_LEN + 1);
    let result = encode_request_header(1, 1, OpCode::BackupFile, Some(&name));
    assert!(matches!(result, Err(VaultError::ProtocolEncode(_))));
}

#[test]
fn test_non_ascii_name() {
    let result = encode_request_header(1, 1, OpCode::RestoreFile, Some("résumé.txt"));
    assert!(matches!(result, Err(VaultError::ProtocolEncode(_))));
}

#[test]
fn test_request_with_empty_name_rejected() {
    let result = encode_request(1, 1, &Request::Delete { name: String::new() });
    assert!(matches!(result, Err(VaultError::ProtocolEncode(_))));
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_plain_status_reads_only_prefix() {
    for status in [
        StatusCode::SuccessDeleteFile,
        StatusCode::SuccessBackupFile,
        StatusCode::ErrorUserHasNoFiles,
        StatusCode::ErrorGeneric,
    ] {
        let mut bytes = encode_response_header(&ResponseHeader::new(1, status)).unwrap();
        // Trailing bytes that must not be consumed
        bytes.extend_from_slice(&[0x05, 0x00, b'h', b'e']);

        let mut cursor = Cursor::new(bytes);
        let header = decode_response_header(&mut cursor).unwrap();

        assert_eq!(header.status, status);
        assert!(header.name.is_empty());
        assert_eq!(header.name_len(), 0);
        assert_eq!(cursor.position(), RESPONSE_PREFIX_SIZE as u64);
    }
}

#[test]
fn test_decode_named_statuses() {
    for status in [
        StatusCode::SuccessRestoreFile,
        StatusCode::SuccessGenerateFileList,
        StatusCode::ErrorFileDoesntExist,
    ] {
        let header = ResponseHeader::with_name(1, status, "report.pdf");
        let mut bytes = encode_response_header(&header).unwrap();
        bytes.extend_from_slice(&encode_u32_le(99));

        let mut cursor = Cursor::new(bytes);
        let decoded = decode_response_header(&mut cursor).unwrap();

        assert_eq!(decoded, header);
        assert_eq!(decoded.name_len(), 10);
        // Payload size stays in the stream for the caller
        assert_eq!(decode_u32_le(&mut cursor).unwrap(), 99);
    }
}

#[test]
fn test_decode_truncated_prefix() {
    let mut cursor = Cursor::new(vec![1, 0xD1]);
    let result = decode_response_header(&mut cursor);
    assert!(matches!(result, Err(VaultError::ProtocolDecode(_))));
}

#[test]
fn test_decode_truncated_name() {
    // SUCCESS_RESTORE_FILE announcing a 5-byte name, only 2 present
    let mut cursor = Cursor::new(vec![1, 0xD2, 0x00, 0x05, 0x00, b'a', b'b']);
    let result = decode_response_header(&mut cursor);
    assert!(matches!(result, Err(VaultError::ProtocolDecode(_))));
}

#[test]
fn test_decode_missing_name_length() {
    // ERROR_FILE_DOESNT_EXIST with no name fields at all
    let mut cursor = Cursor::new(vec![1, 0xE9, 0x03]);
    let result = decode_response_header(&mut cursor);
    assert!(matches!(result, Err(VaultError::ProtocolDecode(_))));
}

#[test]
fn test_decode_unknown_status() {
    let mut cursor = Cursor::new(vec![1, 0x00, 0x00]);
    let result = decode_response_header(&mut cursor);
    assert!(result.unwrap_err().to_string().contains("Unknown response status"));
}

#[test]
fn test_decode_non_ascii_name() {
    let mut cursor = Cursor::new(vec![1, 0xD3, 0x00, 0x02, 0x00, 0xC3, 0xA9]);
    let result = decode_response_header(&mut cursor);
    assert!(matches!(result, Err(VaultError::ProtocolDecode(_))));
}

#[test]
fn test_decode_unknown_op() {
    let mut cursor = Cursor::new(vec![1, 0, 0, 0, 1, 99]);
    let result = decode_request_header(&mut cursor);
    assert!(result.unwrap_err().to_string().contains("Unknown op code"));
}

#[test]
fn test_decode_backup_request_leaves_size_field() {
    let request = Request::Backup {
        name: "a.bin".to_string(),
        size: 77,
    };
    let bytes = encode_request(5, PROTOCOL_VERSION, &request).unwrap();

    let mut cursor = Cursor::new(bytes);
    let header = decode_request_header(&mut cursor).unwrap();
    assert_eq!(header.op, OpCode::BackupFile);
    assert_eq!(header.name, "a.bin");
    assert_eq!(decode_u32_le(&mut cursor).unwrap(), 77);
}

// =============================================================================
// Status Code Tests
// =============================================================================

#[test]
fn test_status_display() {
    assert_eq!(
        StatusCode::SuccessBackupFile.to_string(),
        "SUCCESS_BACKUP_FILE (209)"
    );
    assert!(StatusCode::SuccessDeleteFile.is_success());
    assert!(!StatusCode::ErrorGeneric.is_success());
}

#[test]
fn test_status_try_from_all_codes() {
    for code in [208u16, 209, 210, 211, 1001, 1002, 1003] {
        assert_eq!(StatusCode::try_from(code).unwrap().code(), code);
    }
    assert!(StatusCode::try_from(212).is_err());
}

#[test]
fn test_only_restore_and_list_success_carry_payload() {
    for code in [208u16, 209, 210, 211, 1001, 1002, 1003] {
        let status = StatusCode::try_from(code).unwrap();
        assert_eq!(status.carries_payload(), code == 210 || code == 211, "{}", status);
    }
}

// =============================================================================
// Round-Trip Properties
// =============================================================================

fn named_op() -> impl Strategy<Value = OpCode> {
    prop_oneof![
        Just(OpCode::BackupFile),
        Just(OpCode::RestoreFile),
        Just(OpCode::DeleteFile),
    ]
}

fn any_status() -> impl Strategy<Value = StatusCode> {
    prop_oneof![
        Just(StatusCode::SuccessDeleteFile),
        Just(StatusCode::SuccessBackupFile),
        Just(StatusCode::SuccessRestoreFile),
        Just(StatusCode::SuccessGenerateFileList),
        Just(StatusCode::ErrorFileDoesntExist),
        Just(StatusCode::ErrorUserHasNoFiles),
        Just(StatusCode::ErrorGeneric),
    ]
}

proptest! {
    #[test]
    fn request_header_round_trip(
        client_id in any::<u32>(),
        version in any::<u8>(),
        op in named_op(),
        name in "[ -~]{1,300}",
    ) {
        let bytes = encode_request_header(client_id, version, op, Some(&name)).unwrap();
        let decoded = decode_request_header(&mut Cursor::new(bytes)).unwrap();

        prop_assert_eq!(decoded.client_id, client_id);
        prop_assert_eq!(decoded.version, version);
        prop_assert_eq!(decoded.op, op);
        prop_assert_eq!(decoded.name, name);
    }

    #[test]
    fn list_request_round_trip(client_id in any::<u32>(), version in any::<u8>()) {
        let bytes =
            encode_request_header(client_id, version, OpCode::GenerateFilesList, None).unwrap();
        let decoded = decode_request_header(&mut Cursor::new(bytes)).unwrap();

        prop_assert_eq!(decoded.client_id, client_id);
        prop_assert_eq!(decoded.op, OpCode::GenerateFilesList);
        prop_assert!(decoded.name.is_empty());
    }

    #[test]
    fn response_header_round_trip(
        version in any::<u8>(),
        status in any_status(),
        name in "[ -~]{0,300}",
    ) {
        let name = if status.carries_name() { name } else { String::new() };
        let header = ResponseHeader::with_name(version, status, name);

        let bytes = encode_response_header(&header).unwrap();
        let mut cursor = Cursor::new(bytes);
        let decoded = decode_response_header(&mut cursor).unwrap();

        prop_assert_eq!(&decoded, &header);
        prop_assert_eq!(cursor.position() as usize, cursor.get_ref().len());
    }
}
