use rand::Rng;

use crate::error::{Result, SignalError};

use super::store::RoomStore;

/// Alphabet shared with the web client: uppercase letters and digits
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Room codes are exactly this long
pub const CODE_LEN: usize = 6;

/// Collision retries before giving up. With ~31 bits of code space this
/// is practically unreachable, but exhaustion must be a defined failure.
const MAX_CODE_ATTEMPTS: usize = 5;

/// Generate a random 6-character room code drawn uniformly from [A-Z0-9]
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Pure format check: exactly six characters from [A-Z0-9].
/// Used to reject malformed input before any store lookup.
pub fn validate(code: &str) -> bool {
    code.len() == CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Generate a code that is not present in the store, retrying on
/// collision up to `MAX_CODE_ATTEMPTS` times.
pub async fn generate_unique(store: &RoomStore) -> Result<String> {
    for attempt in 0..MAX_CODE_ATTEMPTS {
        let code = generate();
        if store.get_room(&code).await.is_none() {
            return Ok(code);
        }
        tracing::warn!(code = %code, attempt = attempt, "Room code collision, retrying");
    }
    Err(SignalError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS))
}
