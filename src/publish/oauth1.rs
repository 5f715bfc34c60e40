// src/publish/oauth1.rs
//! OAuth 1.0a request signing (HMAC-SHA1) for the publish endpoint.
//!
//! The signing core takes nonce and timestamp as parameters so tests can
//! pin them; the public wrapper generates both fresh for every call.
//! Reusing either across calls is a correctness violation.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::distr::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LEN: usize = 32;

/// User-context credential quad.
#[derive(Debug, Clone)]
pub struct OauthKeys {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub token_secret: String,
}

/// Strict RFC 3986 percent-encoding: everything but ALPHA / DIGIT /
/// `-._~` is escaped, including `! ' ( ) *`.
pub fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Fresh random nonce: 32 alphanumeric characters.
pub fn fresh_nonce<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// Signature base string: `METHOD&enc(url)&enc(sorted-params)`.
fn signature_base(method: &str, url: &str, encoded_pairs: &[(String, String)]) -> String {
    let joined = encoded_pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&joined)
    )
}

/// Build the `Authorization: OAuth ...` header value for a request with a
/// pinned nonce and timestamp. Deterministic given its inputs.
pub fn authorization_header_pinned(
    method: &str,
    url: &str,
    keys: &OauthKeys,
    nonce: &str,
    timestamp: i64,
) -> String {
    let ts = timestamp.to_string();
    let params: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", keys.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", ts.as_str()),
        ("oauth_token", keys.access_token.as_str()),
        ("oauth_version", OAUTH_VERSION),
    ];

    // Encode first, then sort lexicographically by encoded key/value.
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let base = signature_base(method, url, &encoded);
    let signing_key = format!(
        "{}&{}",
        percent_encode(&keys.consumer_secret),
        percent_encode(&keys.token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes()).expect("hmac accepts any key");
    mac.update(base.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    let mut header_pairs = encoded;
    header_pairs.push(("oauth_signature".to_string(), percent_encode(&signature)));
    header_pairs.sort();

    let joined = header_pairs
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {joined}")
}

/// Header value with a fresh nonce and the current Unix timestamp.
pub fn authorization_header(method: &str, url: &str, keys: &OauthKeys) -> String {
    let nonce = fresh_nonce(&mut rand::rng());
    let timestamp = chrono::Utc::now().timestamp();
    authorization_header_pinned(method, url, keys, &nonce, timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> OauthKeys {
        OauthKeys {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            access_token: "at".into(),
            token_secret: "ts".into(),
        }
    }

    const URL: &str = "https://api.twitter.com/2/tweets";

    #[test]
    fn strict_encoding_escapes_reserved_extras() {
        assert_eq!(percent_encode("a!b'c(d)e*f"), "a%21b%27c%28d%29e%2Af");
        assert_eq!(percent_encode("safe-._~AZ09"), "safe-._~AZ09");
        assert_eq!(percent_encode("a b"), "a%20b");
    }

    #[test]
    fn pinned_inputs_are_deterministic() {
        let a = authorization_header_pinned("POST", URL, &keys(), "NONCE", 1_700_000_000);
        let b = authorization_header_pinned("POST", URL, &keys(), "NONCE", 1_700_000_000);
        assert_eq!(a, b);
    }

    #[test]
    fn any_changed_input_changes_the_signature() {
        let base = authorization_header_pinned("POST", URL, &keys(), "NONCE", 1_700_000_000);
        let variants = [
            authorization_header_pinned("GET", URL, &keys(), "NONCE", 1_700_000_000),
            authorization_header_pinned("POST", "https://api.twitter.com/2/other", &keys(), "NONCE", 1_700_000_000),
            authorization_header_pinned("POST", URL, &keys(), "OTHER", 1_700_000_000),
            authorization_header_pinned("POST", URL, &keys(), "NONCE", 1_700_000_001),
        ];
        for v in variants {
            assert_ne!(base, v);
        }

        let mut k = keys();
        k.consumer_secret = "different".into();
        assert_ne!(
            base,
            authorization_header_pinned("POST", URL, &k, "NONCE", 1_700_000_000)
        );
    }

    #[test]
    fn header_carries_sorted_quoted_protocol_params() {
        let h = authorization_header_pinned("POST", URL, &keys(), "NONCE", 1_700_000_000);
        assert!(h.starts_with("OAuth oauth_consumer_key=\"ck\""));
        for key in [
            "oauth_nonce",
            "oauth_signature",
            "oauth_signature_method",
            "oauth_timestamp",
            "oauth_token",
            "oauth_version",
        ] {
            assert!(h.contains(&format!("{key}=\"")), "missing {key}");
        }
        // Sorted order: signature sits between nonce and signature_method.
        let pos = |needle: &str| h.find(needle).unwrap();
        assert!(pos("oauth_nonce=") < pos("oauth_signature="));
        assert!(pos("oauth_signature=") < pos("oauth_signature_method="));
        assert!(pos("oauth_signature_method=") < pos("oauth_timestamp="));
    }

    #[test]
    fn base_string_shape() {
        let encoded = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        let base = signature_base("post", "https://x.io/p", &encoded);
        assert_eq!(base, "POST&https%3A%2F%2Fx.io%2Fp&a%3D1%26b%3D2");
    }

    #[test]
    fn fresh_nonces_differ_and_are_alphanumeric() {
        let mut rng = rand::rng();
        let a = fresh_nonce(&mut rng);
        let b = fresh_nonce(&mut rng);
        assert_eq!(a.len(), NONCE_LEN);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
