/// Error code registry for longtask
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 3000-3999: Storage errors
/// - 3100-3199: Serialization errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_TOML: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_ITEMS_UNAVAILABLE: u16 = 1010;

    // Storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_PERMISSION_DENIED: u16 = 3002;
    pub const STORAGE_CORRUPTED: u16 = 3006;
    pub const STORAGE_PERSIST_FAILED: u16 = 3013;

    // Serialization errors (3100-3199)
    pub const SERIALIZATION_GENERIC: u16 = 3100;
    pub const SERIALIZATION_ENCODE: u16 = 3101;
    pub const SERIALIZATION_DECODE: u16 = 3102;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::CONFIG_GENERIC => "General configuration error",
        ErrorCode::CONFIG_NOT_FOUND => "Configuration file not found",
        ErrorCode::CONFIG_INVALID_TOML => "Configuration file is not valid TOML",
        ErrorCode::CONFIG_INVALID_VALUE => "Invalid configuration value",
        ErrorCode::CONFIG_ITEMS_UNAVAILABLE => "Task could not enumerate its items",

        ErrorCode::STORAGE_GENERIC => "General storage error",
        ErrorCode::STORAGE_IO_ERROR => "Storage I/O error",
        ErrorCode::STORAGE_PERMISSION_DENIED => "Permission denied accessing checkpoint",
        ErrorCode::STORAGE_CORRUPTED => "Checkpoint data is corrupted",
        ErrorCode::STORAGE_PERSIST_FAILED => "Checkpoint could not be moved into place",

        ErrorCode::SERIALIZATION_GENERIC => "General serialization error",
        ErrorCode::SERIALIZATION_ENCODE => "Failed to encode checkpoint",
        ErrorCode::SERIALIZATION_DECODE => "Failed to decode checkpoint",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_have_descriptions() {
        for code in [
            ErrorCode::CONFIG_GENERIC,
            ErrorCode::CONFIG_ITEMS_UNAVAILABLE,
            ErrorCode::STORAGE_IO_ERROR,
            ErrorCode::STORAGE_PERSIST_FAILED,
            ErrorCode::SERIALIZATION_ENCODE,
        ] {
            assert_ne!(describe_error_code(code), "Unknown error code");
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(describe_error_code(42), "Unknown error code");
    }
}
