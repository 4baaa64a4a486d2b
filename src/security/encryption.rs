//! AES-256-GCM engine for audit records at rest.
//!
//! Every audit record is encrypted with a fresh random nonce and framed as
//! `aes256:<base64(nonce + ciphertext)>`, one record per file. The running
//! process only encrypts; `decrypt` exists for offline review tooling and
//! round-trip tests. Key files are raw 32-byte keys, created on first use
//! with owner-only permissions.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Nonce size for AES-256-GCM (12 bytes / 96 bits).
const AES_GCM_NONCE_SIZE: usize = 12;

/// Prefix identifying the record framing on disk.
const AES_GCM_PREFIX: &str = "aes256:";

/// AES-256-GCM encryption engine for the audit trail.
pub struct AesEncryptor {
    key: [u8; 32],
}

impl AesEncryptor {
    /// Create an encryptor from a raw 256-bit key.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Load the key from an existing key file.
    pub fn from_key_file(path: &Path) -> anyhow::Result<Self> {
        let key_bytes = std::fs::read(path)?;
        if key_bytes.len() != 32 {
            anyhow::bail!(
                "audit key must be exactly 32 bytes, got {} in {}",
                key_bytes.len(),
                path.display()
            );
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        Ok(Self { key })
    }

    /// Generate a fresh random key and persist it with 0600 permissions.
    pub fn generate_key_file(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let key: [u8; 32] = Aes256Gcm::generate_key(OsRng).into();
        std::fs::write(path, key)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(Self { key })
    }

    /// Load the key file if present, otherwise generate one in place.
    pub fn load_or_generate(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_key_file(path)
        } else {
            Self::generate_key_file(path)
        }
    }

    /// SHA-256 fingerprint of the key (hex). Safe to log; the raw key
    /// never appears in logs or audit records.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.key))
    }

    /// Encrypt plaintext into the prefixed base64 framing.
    ///
    /// A fresh nonce is drawn per call, so encrypting identical input
    /// twice yields different output.
    pub fn encrypt(&self, plaintext: &str) -> anyhow::Result<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| anyhow::anyhow!("AES cipher init failed: {e}"))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("AES encryption failed: {e}"))?;

        // Format: aes256:<base64(nonce + ciphertext)>
        let mut combined = Vec::with_capacity(AES_GCM_NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&combined);
        Ok(format!("{AES_GCM_PREFIX}{encoded}"))
    }

    /// Decrypt a framed record back to plaintext. Offline tooling only.
    pub fn decrypt(&self, encrypted: &str) -> anyhow::Result<String> {
        let encoded = encrypted
            .strip_prefix(AES_GCM_PREFIX)
            .ok_or_else(|| anyhow::anyhow!("missing {AES_GCM_PREFIX} prefix"))?;

        use base64::Engine;
        let combined = base64::engine::general_purpose::STANDARD.decode(encoded)?;

        if combined.len() < AES_GCM_NONCE_SIZE {
            anyhow::bail!("ciphertext too short");
        }

        let (nonce_bytes, ciphertext) = combined.split_at(AES_GCM_NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| anyhow::anyhow!("AES cipher init failed: {e}"))?;

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| anyhow::anyhow!("AES decryption failed: {e}"))?;

        String::from_utf8(plaintext).map_err(|e| anyhow::anyhow!("invalid UTF-8 in plaintext: {e}"))
    }

    /// Whether a string carries the encrypted-record framing.
    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(AES_GCM_PREFIX)
    }
}
