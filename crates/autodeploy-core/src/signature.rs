//! GitHub webhook signature verification using HMAC-SHA256.
//!
//! GitHub signs every delivery with the shared webhook secret and sends the
//! result in the `X-Hub-Signature-256` header as `sha256=<hex>`. Verification
//! runs before anything else looks at the body.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// The shared webhook secret. Never printed.
#[derive(Clone)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

/// Parses a signature header (`sha256=<hex>`) into raw bytes.
///
/// Returns `None` for a missing prefix, another algorithm or bad hex.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.trim().strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 of `payload` under `secret`.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take any size key");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a header value (`sha256=<hex>`).
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verifies `body` against the declared signature header.
///
/// Returns the body unchanged when the signature matches. The MAC comparison
/// is constant time.
pub fn verify_signature<'a>(
    body: &'a [u8],
    signature: Option<&str>,
    secret: &WebhookSecret,
) -> Result<&'a [u8], SignatureError> {
    let header = match signature {
        Some(header) if !header.trim().is_empty() => header,
        _ => return Err(SignatureError::MissingSignature),
    };

    let expected = parse_signature_header(header).ok_or(SignatureError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSignature)?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map(|()| body)
        .map_err(|_| SignatureError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sign(body: &[u8], secret: &[u8]) -> String {
        format_signature_header(&compute_signature(body, secret))
    }

    #[test]
    fn test_known_vector() {
        // Example from GitHub's webhook documentation.
        let secret = WebhookSecret::new("It's a Secret to Everybody");
        let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

        let verified = verify_signature(b"Hello, World!", Some(header), &secret).unwrap();
        assert_eq!(verified, b"Hello, World!");
    }

    #[test]
    fn test_missing_signature() {
        let secret = WebhookSecret::new("s3cret");
        assert_eq!(
            verify_signature(b"{}", None, &secret),
            Err(SignatureError::MissingSignature)
        );
        assert_eq!(
            verify_signature(b"{}", Some("  "), &secret),
            Err(SignatureError::MissingSignature)
        );
    }

    #[test]
    fn test_malformed_headers_are_invalid() {
        let secret = WebhookSecret::new("s3cret");
        let good = sign(b"{}", b"s3cret");
        let bare_hex = good.strip_prefix("sha256=").unwrap().to_string();

        for header in [bare_hex.as_str(), "sha1=abcd", "sha256=not-hex", "sha256="] {
            assert_eq!(
                verify_signature(b"{}", Some(header), &secret),
                Err(SignatureError::InvalidSignature),
                "header {header:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_wrong_secret() {
        let header = sign(b"payload", b"right");
        let secret = WebhookSecret::new("wrong");
        assert_eq!(
            verify_signature(b"payload", Some(&header), &secret),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = WebhookSecret::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }

    proptest! {
        #[test]
        fn correct_signature_always_verifies(
            body in proptest::collection::vec(any::<u8>(), 0..512),
            secret in proptest::collection::vec(any::<u8>(), 1..64),
        ) {
            let header = sign(&body, &secret);
            let secret = WebhookSecret::new(secret);
            prop_assert_eq!(verify_signature(&body, Some(&header), &secret), Ok(&body[..]));
        }

        #[test]
        fn single_bit_flip_in_body_is_rejected(
            body in proptest::collection::vec(any::<u8>(), 1..512),
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            bit in any::<proptest::sample::Index>(),
        ) {
            let header = sign(&body, &secret);
            let mut tampered = body.clone();
            let bit = bit.index(tampered.len() * 8);
            tampered[bit / 8] ^= 1 << (bit % 8);

            let secret = WebhookSecret::new(secret);
            prop_assert_eq!(
                verify_signature(&tampered, Some(&header), &secret),
                Err(SignatureError::InvalidSignature)
            );
        }

        #[test]
        fn single_bit_flip_in_signature_is_rejected(
            body in proptest::collection::vec(any::<u8>(), 0..512),
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            bit in 0usize..256,
        ) {
            let mut mac = compute_signature(&body, &secret);
            mac[bit / 8] ^= 1 << (bit % 8);
            let header = format_signature_header(&mac);

            let secret = WebhookSecret::new(secret);
            prop_assert_eq!(
                verify_signature(&body, Some(&header), &secret),
                Err(SignatureError::InvalidSignature)
            );
        }
    }
}
