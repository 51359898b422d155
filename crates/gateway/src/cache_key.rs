use sha2::{Digest, Sha256};

use streamgate_core::TenantCode;

/// Derive the cache key for one catalog operation.
///
/// The key is `{TENANT}:{operation}:{digest}` where the digest is the hex
/// SHA-256 of the parameters rendered as `name=value` pairs, sorted by
/// name, with names lower-cased and values trimmed. Equal inputs always map
/// to the same slot regardless of parameter order or stray whitespace, and
/// every key starts with the tenant code.
pub fn cache_key(tenant: &TenantCode, operation: &str, params: &[(&str, String)]) -> String {
    let mut pairs: Vec<(String, &str)> = params
        .iter()
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim()))
        .collect();
    pairs.sort_unstable();

    let canonical = pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
    format!("{tenant}:{operation}:{digest}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantCode {
        TenantCode::new("042")
    }

    #[test]
    fn deterministic() {
        let a = cache_key(&tenant(), "movies", &[("category_id", "12".into())]);
        let b = cache_key(&tenant(), "movies", &[("category_id", "12".into())]);
        assert_eq!(a, b);
        assert!(a.starts_with("042:movies:"));
    }

    #[test]
    fn insensitive_to_order_whitespace_and_name_case() {
        let a = cache_key(
            &tenant(),
            "epg",
            &[("stream_id", "7".into()), ("limit", "10".into())],
        );
        let b = cache_key(
            &tenant(),
            "epg",
            &[("LIMIT", " 10".into()), ("stream_id", "7 ".into())],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn tenant_code_is_normalized_into_the_key() {
        let a = cache_key(&TenantCode::new(" abc "), "live_categories", &[]);
        assert!(a.starts_with("ABC:live_categories:"));
    }

    #[test]
    fn different_inputs_differ() {
        let none = cache_key(&tenant(), "movies", &[]);
        let cat = cache_key(&tenant(), "movies", &[("category_id", "12".into())]);
        let other_tenant = cache_key(&TenantCode::new("043"), "movies", &[]);
        let other_op = cache_key(&tenant(), "series", &[]);
        assert_ne!(none, cat);
        assert_ne!(none, other_tenant);
        assert_ne!(none, other_op);
    }
}
