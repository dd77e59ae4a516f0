//! Address canonicalization for deduplication.
//!
//! This is the only address-level check the engine performs; RFC 5322
//! syntax is left to the provider.

/// Lower-case and trim an address.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize an optional address, dropping it when nothing is left.
pub fn normalize_opt(raw: Option<&str>) -> Option<String> {
    raw.map(normalize).filter(|a| !a.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize("  Jane.Doe@Example.ORG \n"), "jane.doe@example.org");
    }

    #[test]
    fn test_normalize_opt_drops_blank() {
        assert_eq!(normalize_opt(None), None);
        assert_eq!(normalize_opt(Some("   ")), None);
        assert_eq!(normalize_opt(Some("A@B.org")), Some("a@b.org".to_string()));
    }
}
