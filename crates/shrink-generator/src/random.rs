use crate::{Generator, GeneratorError};
use rand::distr::{Alphanumeric, SampleString};
use shrink_core::shortcode::{MAX_LENGTH, MIN_LENGTH};
use shrink_core::ShortCode;

pub const DEFAULT_LENGTH: usize = 6;

/// Draws codes uniformly from the 62-symbol alphabet `[A-Za-z0-9]`.
///
/// Uses the thread-local CSPRNG, so issued codes cannot be predicted from
/// earlier ones. With the default length the code space is 62^6.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self {
            length: DEFAULT_LENGTH,
        }
    }

    /// Creates a generator producing codes of `length` characters.
    pub fn with_length(length: usize) -> Result<Self, GeneratorError> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(GeneratorError::InvalidLength {
                length,
                min: MIN_LENGTH,
                max: MAX_LENGTH,
            });
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let code = Alphanumeric.sample_string(&mut rand::rng(), self.length);
        ShortCode::new_unchecked(code)
    }
}
