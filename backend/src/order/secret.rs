//! Delivery hand-off secrets
//!
//! Every order carries a 6-digit OTP and a random QR token. The customer
//! shows either one to the delivery agent, who submits it to confirm the
//! drop-off before the secret expires.

use rand::Rng;

/// Number of random bytes behind a QR token (hex encoded to twice as many chars)
const QR_TOKEN_BYTES: usize = 16;

/// A freshly generated OTP / QR token pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySecret {
    pub otp: String,
    pub qr_token: String,
}

impl DeliverySecret {
    /// Generate a new secret pair from the thread-local RNG
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let otp = rng.gen_range(100_000..1_000_000u32).to_string();

        let mut bytes = [0u8; QR_TOKEN_BYTES];
        rng.fill(&mut bytes);

        Self {
            otp,
            qr_token: hex::encode(bytes),
        }
    }
}

/// Whether a submitted code equals the stored OTP or QR token.
///
/// Surrounding whitespace is ignored; an empty submission never matches.
pub fn code_matches(submitted: &str, otp: &str, qr_token: &str) -> bool {
    let submitted = submitted.trim();
    !submitted.is_empty() && (submitted == otp || submitted == qr_token)
}
