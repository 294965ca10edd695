use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignerError>;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("api secret is empty")]
    MissingSecret,
    #[error("api secret is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("api secret must decode to {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },
    #[error("signature is not valid base64 or has the wrong length")]
    MalformedSignature,
    #[error("signature verification failed")]
    Verification(#[from] ed25519_dalek::SignatureError),
}
