pub mod error;
pub mod random;
pub mod seq;

pub use error::GeneratorError;
pub use random::RandomGenerator;
pub use seq::SeqGenerator;

use shrink_core::ShortCode;

/// Trait for generating candidate short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness is the caller's responsibility: the code assignment engine
/// detects collisions through the mapping store and asks for another code.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Generates a candidate short code.
    fn generate(&self) -> Self::Output;
}
