use crate::error::SignerError;
use crate::types::Pubkey;
use ed25519_dalek::{Signer, SigningKey};
use std::path::Path;

/// Signing capability handed in by the wallet side.
pub trait WagerSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    fn sign(&self, message: &[u8]) -> Result<[u8; 64], SignerError>;
}

/// Local ed25519 keypair, e.g. from a Solana CLI keypair file.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// 64 bytes: secret key followed by the public key it must match.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        let bytes: &[u8; 64] = bytes.try_into().map_err(|_| {
            SignerError::InvalidKeypair(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|e| SignerError::InvalidKeypair(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Solana CLI format: a JSON array of 64 integers.
    pub fn read_from_file(path: &Path) -> Result<Self, SignerError> {
        let content = std::fs::read_to_string(path)?;
        let bytes: Vec<u8> = serde_json::from_str(&content)?;
        Self::from_keypair_bytes(&bytes)
    }
}

impl WagerSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing_key.verifying_key().to_bytes())
    }

    fn sign(&self, message: &[u8]) -> Result<[u8; 64], SignerError> {
        Ok(self.signing_key.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair_bytes(secret: [u8; 32]) -> Vec<u8> {
        let keypair = Keypair::from_secret_bytes(&secret);
        let mut bytes = secret.to_vec();
        bytes.extend_from_slice(&keypair.pubkey().to_bytes());
        bytes
    }

    #[test]
    fn test_read_cli_keypair_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");
        let bytes = keypair_bytes([21u8; 32]);
        std::fs::write(&path, serde_json::to_string(&bytes).unwrap()).unwrap();

        let keypair = Keypair::read_from_file(&path).unwrap();
        assert_eq!(
            keypair.pubkey(),
            Keypair::from_secret_bytes(&[21u8; 32]).pubkey()
        );
    }

    #[test]
    fn test_rejects_mismatched_or_short_keypairs() {
        let mut bytes = keypair_bytes([21u8; 32]);
        bytes[40] ^= 0x01;
        assert!(matches!(
            Keypair::from_keypair_bytes(&bytes),
            Err(SignerError::InvalidKeypair(_))
        ));

        assert!(matches!(
            Keypair::from_keypair_bytes(&[0u8; 32]),
            Err(SignerError::InvalidKeypair(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Keypair::read_from_file(&dir.path().join("missing.json")),
            Err(SignerError::Io(_))
        ));
    }
}
