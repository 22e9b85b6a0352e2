//! Identifier and room-code generation.
//!
//! Room codes are short human-shareable tokens meant to be read aloud or
//! typed from another screen, so the alphabet excludes characters that are
//! easy to confuse in transcription (`0`, `1`, `I`, `O`, lowercase).
//! Generic identifiers are session-scoped dedup keys, not security tokens.

use rand::Rng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 32-symbol alphabet for room codes. Deliberately excludes `0,1,I,O`.
pub const ROOM_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a generated room code.
pub const ROOM_CODE_LEN: usize = 6;

const ID_SUFFIX_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_SUFFIX_LEN: usize = 6;

/// Current timestamp in epoch milliseconds.
pub fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Generate a 6-character room code drawn uniformly from [`ROOM_CODE_ALPHABET`].
pub fn generate_room_code(rng: &mut impl Rng) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generate a non-cryptographic unique token: millisecond timestamp plus a
/// short random suffix. Adequate for session-scoped dedup, not for security.
pub fn generate_id(rng: &mut impl Rng) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_SUFFIX_ALPHABET[rng.gen_range(0..ID_SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", timestamp_millis(), suffix)
}
