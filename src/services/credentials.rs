//! Token encryption.
//!
//! Personal access tokens are stored encrypted with AES-256-CBC and PKCS#7
//! padding. Each encryption draws a fresh 16-byte IV which is prepended to
//! the ciphertext; the `IV || ciphertext` blob is base64 encoded.
//!
//! The key itself is kept in the OS keychain (Keychain on macOS, Credential
//! Manager on Windows, Secret Service on Linux) and generated on first use,
//! or supplied by the user as a base64 string in the settings.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine};
use keyring::Entry;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::EncryptionSettings;
use crate::error::AppError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Encrypts tokens before they are persisted and decrypts them for use.
pub trait CredentialStore: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, AppError>;
    fn decrypt(&self, encoded: &str) -> Result<String, AppError>;
}

/// 256-bit key material, wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

impl EncryptionKey {
    /// Generate a random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            AppError::crypto(format!(
                "Invalid key length: expected {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, AppError> {
        let mut bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::crypto(format!("Key is not valid base64: {}", e)))?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Resolve the key described by the settings.
    ///
    /// An explicit `key_base64` wins; otherwise the keychain entry is read,
    /// and created with a random key if it does not exist yet.
    pub fn from_settings(settings: &EncryptionSettings) -> Result<Self, AppError> {
        match &settings.key_base64 {
            Some(encoded) => Self::from_base64(encoded),
            None => Self::load_or_create_in_keychain(
                &settings.keychain_service,
                &settings.keychain_account,
            ),
        }
    }

    /// Read the key from the OS keychain, generating and storing one if absent.
    pub fn load_or_create_in_keychain(service: &str, account: &str) -> Result<Self, AppError> {
        let entry = Entry::new(service, account).map_err(|e| {
            AppError::credential_storage(format!("Failed to create keyring entry: {}", e))
        })?;

        match entry.get_password() {
            Ok(encoded) => Self::from_base64(&encoded),
            Err(keyring::Error::NoEntry) => {
                log::info!("[credentials] No encryption key in keychain, generating one");
                let key = Self::generate();
                entry.set_password(&key.to_base64()).map_err(|e| {
                    AppError::credential_storage(format!("Failed to store key: {}", e))
                })?;
                Ok(key)
            }
            Err(e) => Err(AppError::credential_storage(format!(
                "Failed to retrieve key: {}",
                e
            ))),
        }
    }
}

/// AES-256-CBC implementation of `CredentialStore`.
#[derive(Debug, Clone)]
pub struct TokenCipher {
    key: EncryptionKey,
}

impl TokenCipher {
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }
}

impl CredentialStore for TokenCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&self.key.0.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(blob))
    }

    fn decrypt(&self, encoded: &str) -> Result<String, AppError> {
        let blob = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::crypto(format!("Token is not valid base64: {}", e)))?;

        // At least the IV plus one padded block.
        if blob.len() < IV_LEN * 2 || (blob.len() - IV_LEN) % IV_LEN != 0 {
            return Err(AppError::crypto("Encrypted token has an invalid length"));
        }

        let (iv, ciphertext) = blob.split_at(IV_LEN);
        let iv: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|_| AppError::crypto("Encrypted token has an invalid IV"))?;

        let mut plaintext = Aes256CbcDec::new(&self.key.0.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| AppError::crypto("Failed to decrypt token (wrong key or corrupt data)"))?;

        let token = String::from_utf8(plaintext.clone())
            .map_err(|_| AppError::crypto("Decrypted token is not valid UTF-8"));
        plaintext.zeroize();
        token
    }
}
