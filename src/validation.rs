use uuid::Uuid;

use crate::warp_helpers::ValidationError;

/// Length of a hyphenated UUID (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`).
const HYPHENATED_UUID_LEN: usize = 36;

/// Accepts only the hyphenated UUID form. Ids end up in upstream paths, so
/// anything else (braces, urn prefix, slashes) is refused.
pub fn is_valid_uuid(value: &str) -> bool {
    value.len() == HYPHENATED_UUID_LEN && Uuid::try_parse(value).is_ok()
}

pub fn validate_uuid(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if is_valid_uuid(value) {
        Ok(())
    } else {
        Err(ValidationError {
            message: format!("Invalid {}: must be a valid UUID", field_name),
        })
    }
}

/// Dates must start with `YYYY-MM-DD`; a time suffix is passed through.
pub fn is_iso_date_prefix(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_uuids() {
        assert!(is_valid_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_valid_uuid("550E8400-E29B-41D4-A716-446655440000"));
    }

    #[test]
    fn test_invalid_uuids() {
        assert!(!is_valid_uuid(""));
        assert!(!is_valid_uuid("not-a-uuid"));
        assert!(!is_valid_uuid("550e8400e29b41d4a716446655440000"));
        assert!(!is_valid_uuid("{550e8400-e29b-41d4-a716-446655440000}"));
        assert!(!is_valid_uuid("../../etc/passwd"));
        assert!(!is_valid_uuid("550e8400-e29b-41d4-a716-44665544000g"));
    }

    #[test]
    fn test_validate_uuid_message() {
        let err = validate_uuid("nope", "asset_id").unwrap_err();
        assert_eq!(err.message, "Invalid asset_id: must be a valid UUID");
    }

    #[test]
    fn test_iso_date_prefix() {
        assert!(is_iso_date_prefix("2024-01-31"));
        assert!(is_iso_date_prefix("2024-01-31T23:59:59.999Z"));
        assert!(!is_iso_date_prefix("2024-1-31"));
        assert!(!is_iso_date_prefix("31.01.2024"));
        assert!(!is_iso_date_prefix(""));
    }
}
