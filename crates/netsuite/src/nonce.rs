use rand::distributions::Alphanumeric;
use rand::Rng;

pub const NONCE_LEN: usize = 11;

/// Random `[A-Za-z0-9]{11}` request identifiers for the OAuth replay window.
/// Not meant to be unguessable, only unique per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonceGenerator;

impl NonceGenerator {
    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        rng.sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect()
    }
}
