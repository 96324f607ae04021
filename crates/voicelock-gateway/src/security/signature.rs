//! Webhook signature verification.
//!
//! The webhook provider signs each request with HMAC-SHA1 over a canonical
//! payload: the full request URL followed by every form parameter's key and
//! value, keys in ascending lexicographic order. That ordering is an
//! interoperability contract with the signer; any deviation breaks
//! verification for every request.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

/// Everything needed to verify one request's signature.
///
/// Built once per request and never mutated. The `BTreeMap` gives the
/// ordered-by-key iteration the canonical payload requires.
#[derive(Debug, Clone, Copy)]
pub struct SignatureContext<'a> {
    /// Public URL the provider signed against
    pub canonical_url: &'a str,
    /// Decoded form parameters
    pub form_params: &'a BTreeMap<String, String>,
    /// Signature header value, if present
    pub provided_signature: Option<&'a str>,
    /// Shared signing secret, if configured
    pub shared_secret: Option<&'a str>,
}

/// Verify a webhook signature. Fails closed when the signature header or the
/// shared secret is absent.
pub fn verify(ctx: &SignatureContext<'_>) -> bool {
    let (Some(provided), Some(secret)) = (ctx.provided_signature, ctx.shared_secret) else {
        return false;
    };
    if provided.is_empty() || secret.is_empty() {
        return false;
    }
    let expected = compute_signature(secret, ctx.canonical_url, ctx.form_params);
    constant_time_eq(&expected, provided)
}

/// Compute the base64 HMAC-SHA1 digest of the canonical payload.
pub fn compute_signature(secret: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    let payload = canonical_payload(url, params);
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC key size is always valid");
    mac.update(payload.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// URL concatenated with each `key ++ value` pair in ascending key order.
fn canonical_payload(url: &str, params: &BTreeMap<String, String>) -> String {
    let mut payload = String::from(url);
    for (key, value) in params {
        payload.push_str(key);
        payload.push_str(value);
    }
    payload
}

/// Constant-time string comparison to prevent timing attacks.
///
/// SECURITY: the comparison cost must not depend on where the inputs differ,
/// nor on whether they differ in length at all. Both inputs are padded to the
/// max length with *different* pad bytes and compared in full with
/// `subtle::ConstantTimeEq`; the length check is folded in as a constant-time
/// condition rather than an early return. A length mismatch therefore costs
/// the same as a content mismatch and always yields `false`.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let max_len = std::cmp::max(a.len(), b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const URL: &str = "https://example.com/voice/incoming";
    const SECRET: &str = "test-auth-token";

    #[test]
    fn test_verify_accepts_matching_signature() {
        let form = params(&[("From", "+15551234567"), ("CallSid", "CA123")]);
        let signature = compute_signature(SECRET, URL, &form);
        let ctx = SignatureContext {
            canonical_url: URL,
            form_params: &form,
            provided_signature: Some(&signature),
            shared_secret: Some(SECRET),
        };
        assert!(verify(&ctx));
    }

    #[test]
    fn test_verify_rejects_tampered_param() {
        let form = params(&[("From", "+15551234567"), ("CallSid", "CA123")]);
        let signature = compute_signature(SECRET, URL, &form);
        let tampered = params(&[("From", "+19998887777"), ("CallSid", "CA123")]);
        let ctx = SignatureContext {
            canonical_url: URL,
            form_params: &tampered,
            provided_signature: Some(&signature),
            shared_secret: Some(SECRET),
        };
        assert!(!verify(&ctx));
    }

    #[test]
    fn test_verify_rejects_tampered_url() {
        let form = params(&[("From", "+15551234567")]);
        let signature = compute_signature(SECRET, URL, &form);
        let ctx = SignatureContext {
            canonical_url: "https://example.com/voice/other",
            form_params: &form,
            provided_signature: Some(&signature),
            shared_secret: Some(SECRET),
        };
        assert!(!verify(&ctx));
    }

    #[test]
    fn test_verify_fails_closed_without_signature_or_secret() {
        let form = params(&[("From", "+15551234567")]);
        let ctx = SignatureContext {
            canonical_url: URL,
            form_params: &form,
            provided_signature: None,
            shared_secret: Some(SECRET),
        };
        assert!(!verify(&ctx));

        let signature = compute_signature(SECRET, URL, &form);
        let ctx = SignatureContext {
            canonical_url: URL,
            form_params: &form,
            provided_signature: Some(&signature),
            shared_secret: None,
        };
        assert!(!verify(&ctx));
    }

    #[test]
    fn test_canonical_payload_sorts_keys() {
        let form = params(&[("Zulu", "1"), ("Alpha", "2"), ("Mike", "3")]);
        assert_eq!(
            canonical_payload("url", &form),
            "urlAlpha2Mike3Zulu1"
        );
    }

    #[test]
    fn test_signature_depends_on_key_value_pairing() {
        // Swapping which key owns which value must change the payload.
        let a = params(&[("A", "xy"), ("B", "z")]);
        let b = params(&[("A", "x"), ("B", "yz")]);
        assert_ne!(
            compute_signature(SECRET, URL, &a),
            compute_signature(SECRET, URL, &b)
        );
    }

    #[test]
    fn test_constant_time_eq_basic() {
        assert!(constant_time_eq("abcdef", "abcdef"));
        assert!(!constant_time_eq("abcdef", "abcdeg"));
        assert!(!constant_time_eq("", "abcdef"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_constant_time_eq_length_mismatch_is_false() {
        // Different lengths always compare unequal, even when one is a
        // prefix of the other and even with the 0x00/0xFF pad values.
        assert!(!constant_time_eq("abc", "abcdef"));
        assert!(!constant_time_eq("abcdef", "abc"));
        assert!(!constant_time_eq("abc\u{0}\u{0}\u{0}", "abc"));
    }
}
