//! Integration tests for hash crate

#[cfg(test)]
mod tests {
    use xfer_hash::*;

    #[test]
    fn test_key_digest_is_uuid_shaped() {
        let name = key_digest("https://example.com/api/thumbnail");
        let parsed = uuid::Uuid::parse_str(&name).unwrap();
        assert_eq!(parsed.hyphenated().to_string(), name);
    }

    #[test]
    fn test_key_digest_follows_full_key() {
        let base = "https://example.com/api/thumbnail";
        assert_eq!(
            key_digest(base),
            Hash::from_data(base.as_bytes())
                .to_uuid()
                .hyphenated()
                .to_string()
        );
        assert_ne!(key_digest(base), key_digest(&format!("{base}?size=2")));
    }
}
