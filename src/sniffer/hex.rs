/// Lowercase hex, two digits per byte, no separators.
pub fn raw_data_to_hex(data: &[u8]) -> String {
    ::hex::encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_payload() {
        assert_eq!(raw_data_to_hex(b"..."), "2e2e2e");
    }

    #[test]
    fn test_hex_is_lowercase_and_padded() {
        assert_eq!(raw_data_to_hex(&[0x00, 0x0a, 0xff, 0xAB]), "000affab");
        assert_eq!(raw_data_to_hex(&[]), "");
    }

    #[test]
    fn test_hex_length_is_twice_input() {
        let data: Vec<u8> = (0..=255).collect();
        let hex = raw_data_to_hex(&data);
        assert_eq!(hex.len(), 512);
        assert!(hex.starts_with("000102"));
        assert!(hex.ends_with("fdfeff"));
    }
}
