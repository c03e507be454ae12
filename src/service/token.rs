use std::sync::Arc;

use sha2::Digest;

/// Source of the opaque values handed to browsers, like the OAuth state.
pub(crate) trait TokenGenerator: Send + Sync {
    /// Builds a url safe token out of `length` bytes of randomness.
    fn generate(&self, length: usize) -> String;
}

/// Draws from the thread local CSPRNG, so concurrent requests never contend.
#[derive(Debug, Default)]
pub(crate) struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self, length: usize) -> String {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        use rand::RngCore;

        let mut buffer = vec![0u8; length];
        rand::thread_rng().fill_bytes(&mut buffer);
        URL_SAFE_NO_PAD.encode(buffer)
    }
}

#[derive(Clone)]
pub(crate) struct Generator(Arc<dyn TokenGenerator>);

impl Generator {
    pub fn random() -> Self {
        Self(Arc::new(RandomTokenGenerator))
    }

    pub fn generate(&self, length: usize) -> String {
        self.0.generate(length)
    }
}

/// Compares a token received from the browser with the expected one.
///
/// Both sides are hashed first so the comparison time doesn't depend on how
/// many leading characters match.
pub(crate) fn matches(expected: &str, given: &str) -> bool {
    sha2::Sha256::digest(expected.as_bytes()) == sha2::Sha256::digest(given.as_bytes())
}

#[cfg(test)]
pub(crate) const FIXED_TOKEN: &str = "c3RhdGUtdG9rZW4tZm9yLXRlc3Rpbmctb25seS0xMjM0";

#[cfg(test)]
#[derive(Debug)]
pub(crate) struct FixedTokenGenerator(pub &'static str);

#[cfg(test)]
impl TokenGenerator for FixedTokenGenerator {
    fn generate(&self, _length: usize) -> String {
        self.0.to_string()
    }
}

#[cfg(test)]
impl Generator {
    pub fn fixed(value: &'static str) -> Self {
        Self(Arc::new(FixedTokenGenerator(value)))
    }
}
