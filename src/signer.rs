//! Ed25519 credential used to authenticate private Backpack requests.
//!
//! The exchange issues API secrets as a base64-encoded 32-byte Ed25519 seed.
//! The matching public key doubles as the API key sent in `X-API-KEY`.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{
    Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey, SECRET_KEY_LENGTH,
    SIGNATURE_LENGTH,
};
use secrecy::{ExposeSecret, SecretString};

use crate::errors::{Result, SignerError};

/// Private signing key plus its base64 public key.
pub struct Credential {
    signing_key: SigningKey,
    public_key_b64: String,
}

impl Credential {
    /// Decode a base64 API secret as handed out by the exchange.
    pub fn from_base64_secret(secret: &SecretString) -> Result<Self> {
        let raw = secret.expose_secret().trim();
        if raw.is_empty() {
            return Err(SignerError::MissingSecret);
        }
        let bytes = STANDARD.decode(raw)?;
        Self::from_seed_bytes(&bytes)
    }

    pub fn from_seed_bytes(bytes: &[u8]) -> Result<Self> {
        let seed: [u8; SECRET_KEY_LENGTH] =
            bytes.try_into().map_err(|_| SignerError::KeyLength {
                expected: SECRET_KEY_LENGTH,
                actual: bytes.len(),
            })?;
        let signing_key = SigningKey::from_bytes(&seed);
        let public_key_b64 = STANDARD.encode(signing_key.verifying_key().as_bytes());
        Ok(Self {
            signing_key,
            public_key_b64,
        })
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Value sent in the `X-API-KEY` header.
    pub fn public_key_base64(&self) -> &str {
        &self.public_key_b64
    }

    /// Sign `message` and return the base64 encoded 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> String {
        let signature = self.signing_key.sign(message);
        STANDARD.encode(signature.to_bytes())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("public_key", &self.public_key_b64)
            .finish_non_exhaustive()
    }
}

/// Check a base64 signature produced by [`Credential::sign`].
pub fn verify_signature(
    public_key: &VerifyingKey,
    message: &[u8],
    signature_b64: &str,
) -> Result<()> {
    let bytes = STANDARD
        .decode(signature_b64)
        .map_err(|_| SignerError::MalformedSignature)?;
    let bytes: [u8; SIGNATURE_LENGTH] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignerError::MalformedSignature)?;
    let signature = Signature::from_bytes(&bytes);
    public_key.verify(message, &signature)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(value: &str) -> Vec<u8> {
        (0..value.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&value[i..i + 2], 16).unwrap())
            .collect()
    }

    // RFC 8032 section 7.1, TEST 1.
    const RFC_SECRET: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const RFC_PUBLIC: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
    const RFC_SIGNATURE: &str = "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b";

    #[test]
    fn test_rfc8032_vector() {
        let credential = Credential::from_seed_bytes(&hex(RFC_SECRET)).unwrap();
        assert_eq!(credential.public_key().as_bytes().to_vec(), hex(RFC_PUBLIC));
        assert_eq!(credential.public_key_base64(), STANDARD.encode(hex(RFC_PUBLIC)));
        assert_eq!(credential.sign(b""), STANDARD.encode(hex(RFC_SIGNATURE)));
    }

    #[test]
    fn test_base64_secret_round_trip() {
        let secret = SecretString::from(STANDARD.encode(hex(RFC_SECRET)));
        let credential = Credential::from_base64_secret(&secret).unwrap();
        let message = b"instruction=balanceQuery&timestamp=1700000000000&window=5000";
        let signature = credential.sign(message);

        verify_signature(&credential.public_key(), message, &signature).unwrap();
        assert!(verify_signature(&credential.public_key(), b"tampered", &signature).is_err());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let credential = Credential::from_seed_bytes(&[7u8; 32]).unwrap();
        assert_eq!(credential.sign(b"payload"), credential.sign(b"payload"));
    }

    #[test]
    fn test_rejects_bad_secrets() {
        let empty = SecretString::from("   ".to_string());
        assert!(matches!(
            Credential::from_base64_secret(&empty),
            Err(SignerError::MissingSecret)
        ));

        let not_base64 = SecretString::from("@@not base64@@".to_string());
        assert!(matches!(
            Credential::from_base64_secret(&not_base64),
            Err(SignerError::Base64(_))
        ));

        let short = SecretString::from(STANDARD.encode([1u8; 16]));
        assert!(matches!(
            Credential::from_base64_secret(&short),
            Err(SignerError::KeyLength {
                expected: 32,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let credential = Credential::from_seed_bytes(&hex(RFC_SECRET)).unwrap();
        let rendered = format!("{credential:?}");
        assert!(rendered.contains(credential.public_key_base64()));
        assert!(!rendered.contains("signing_key"));
    }
}
