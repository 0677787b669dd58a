use crate::Generator;
use shrink_core::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const WIDTH: usize = 6;
/// Counter values that fit in ten base62 digits.
const CODE_SPACE: u64 = 62_u64.pow(10);

/// A short code generator using a sequential counter.
///
/// This generator produces base62 codes like "000000", "000001", ...,
/// "00000z", "000010". Codes are padded to six characters and grow past
/// six once the counter exceeds 62^6. After "zzzzzzzzzz" the sequence wraps
/// back to "000000", so codes never outgrow ten characters.
///
/// Sequential codes are guessable and only unique within one instance, so
/// this generator is meant for deterministic runs and single-writer setups.
/// Collisions with codes issued elsewhere are still caught by the store.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
        }
    }
}

impl SeqGenerator {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    /// Creates a generator starting from a specific counter value.
    ///
    /// Useful for resuming from a known state or distributing
    /// counter ranges across nodes.
    pub fn with_offset(offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset % CODE_SPACE),
        }
    }
}

impl Default for SeqGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_base62(mut value: u64) -> String {
    let mut digits = Vec::with_capacity(WIDTH);
    while value > 0 {
        digits.push(ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    while digits.len() < WIDTH {
        digits.push(b'0');
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

impl Generator for SeqGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let count = self.counter.fetch_add(1, Ordering::SeqCst) % CODE_SPACE;
        ShortCode::new_unchecked(encode_base62(count))
    }
}
