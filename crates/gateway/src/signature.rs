//! Checkout-callback signature validation.
//!
//! The gateway signs `"{order_ref}|{payment_ref}"` with the shared key
//! secret (HMAC-SHA256, hex). Verification recomputes the digest and
//! compares in constant time; a plain string equality would leak match
//! length through timing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex HMAC-SHA256 signature for an order/payment pair.
pub fn sign(secret: &[u8], order_ref: &str, payment_ref: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any size");
    mac.update(format!("{}|{}", order_ref.trim(), payment_ref.trim()).as_bytes());
    encode_hex(&mac.finalize().into_bytes())
}

/// Validate a supplied checkout signature. Pure: the same inputs and
/// secret always produce the same verdict.
pub fn verify_signature(
    secret: &[u8],
    order_ref: &str,
    payment_ref: &str,
    signature: &str,
) -> bool {
    let expected = sign(secret, order_ref, payment_ref);
    constant_time_eq::constant_time_eq(expected.as_bytes(), signature.trim().as_bytes())
}

fn encode_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        encoded.push(HEX[(byte >> 4) as usize] as char);
        encoded.push(HEX[(byte & 0x0f) as usize] as char);
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"rzp_test_secret";

    #[test]
    fn test_signature_round_trip() {
        let signature = sign(SECRET, "order_abc", "pay_xyz");
        assert!(verify_signature(SECRET, "order_abc", "pay_xyz", &signature));
    }

    #[test]
    fn test_signature_is_deterministic() {
        assert_eq!(
            sign(SECRET, "order_abc", "pay_xyz"),
            sign(SECRET, "order_abc", "pay_xyz")
        );
    }

    #[test]
    fn test_signature_trims_whitespace() {
        let signature = sign(SECRET, "order_abc", "pay_xyz");
        assert!(verify_signature(
            SECRET,
            " order_abc ",
            " pay_xyz ",
            &format!(" {signature} ")
        ));
    }

    #[test]
    fn test_wrong_inputs_rejected() {
        let signature = sign(SECRET, "order_abc", "pay_xyz");
        assert!(!verify_signature(SECRET, "order_abc", "pay_other", &signature));
        assert!(!verify_signature(SECRET, "order_other", "pay_xyz", &signature));
        assert!(!verify_signature(b"other_secret", "order_abc", "pay_xyz", &signature));
        assert!(!verify_signature(SECRET, "order_abc", "pay_xyz", "deadbeef"));
    }
}
