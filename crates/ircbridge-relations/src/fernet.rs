//! Fernet tokens used to exchange the registration document with the homeserver.
//!
//! Token layout: `0x80 || timestamp (u64 BE) || iv (16) || AES-128-CBC ciphertext || HMAC-SHA256`,
//! URL-safe base64 encoded. The key is 32 bytes: signing half first, encryption half second.

use std::time::{SystemTime, UNIX_EPOCH};

use aes::Aes128;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::error::{RelationDataError, RelationResult};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

const VERSION: u8 = 0x80;
const HEADER_LEN: usize = 1 + 8 + 16;
const TAG_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

const URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Symmetric key shared with the homeserver charm.
#[derive(Clone)]
pub struct FernetKey {
    signing: [u8; 16],
    encryption: [u8; 16],
}

impl std::fmt::Debug for FernetKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("FernetKey(<redacted>)")
    }
}

impl FernetKey {
    /// Decode a URL-safe base64 key.
    ///
    /// # Errors
    ///
    /// Returns [`RelationDataError::Fernet`] when the key is not 32 bytes of base64.
    pub fn from_base64(key: &str) -> RelationResult<Self> {
        let raw = URL_SAFE
            .decode(key.trim())
            .map_err(|_| RelationDataError::fernet("decode_key", "invalid_base64"))?;
        let raw: [u8; 32] = raw
            .try_into()
            .map_err(|_| RelationDataError::fernet("decode_key", "invalid_length"))?;
        let mut signing = [0_u8; 16];
        let mut encryption = [0_u8; 16];
        signing.copy_from_slice(&raw[..16]);
        encryption.copy_from_slice(&raw[16..]);
        Ok(Self {
            signing,
            encryption,
        })
    }

    fn mac(&self) -> RelationResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.signing)
            .map_err(|_| RelationDataError::fernet("sign", "invalid_length"))
    }

    /// Encrypt `plaintext` into a token stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`RelationDataError::Fernet`] when the signer cannot be initialised.
    pub fn encrypt(&self, plaintext: &[u8]) -> RelationResult<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let mut iv = [0_u8; 16];
        rand::rng().fill(&mut iv);
        self.encrypt_with(plaintext, timestamp, iv)
    }

    fn encrypt_with(&self, plaintext: &[u8], timestamp: u64, iv: [u8; 16]) -> RelationResult<String> {
        let ciphertext = Aes128CbcEnc::new(&self.encryption.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + TAG_LEN);
        token.push(VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(&iv);
        token.extend_from_slice(&ciphertext);

        let mut mac = self.mac()?;
        mac.update(&token);
        token.extend_from_slice(&mac.finalize().into_bytes());
        Ok(URL_SAFE.encode(token))
    }

    /// Verify and decrypt a token. Token age is not checked.
    ///
    /// # Errors
    ///
    /// Returns [`RelationDataError::Fernet`] when the token is malformed, signed with
    /// another key, or its padding is corrupt.
    pub fn decrypt(&self, token: &str) -> RelationResult<Vec<u8>> {
        let raw = URL_SAFE
            .decode(token.trim())
            .map_err(|_| RelationDataError::fernet("decrypt", "invalid_base64"))?;
        if raw.len() < HEADER_LEN + BLOCK_LEN + TAG_LEN
            || (raw.len() - HEADER_LEN - TAG_LEN) % BLOCK_LEN != 0
        {
            return Err(RelationDataError::fernet("decrypt", "invalid_length"));
        }
        if raw[0] != VERSION {
            return Err(RelationDataError::fernet("decrypt", "unsupported_version"));
        }

        let (signed, tag) = raw.split_at(raw.len() - TAG_LEN);
        let mut mac = self.mac()?;
        mac.update(signed);
        mac.verify_slice(tag)
            .map_err(|_| RelationDataError::fernet("decrypt", "bad_signature"))?;

        let mut iv = [0_u8; 16];
        iv.copy_from_slice(&signed[9..HEADER_LEN]);
        Aes128CbcDec::new(&self.encryption.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&signed[HEADER_LEN..])
            .map_err(|_| RelationDataError::fernet("decrypt", "bad_padding"))
    }

    /// Decrypt a token into UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`RelationDataError::Fernet`] on any decryption failure or non UTF-8 content.
    pub fn decrypt_string(&self, token: &str) -> RelationResult<String> {
        String::from_utf8(self.decrypt(token)?)
            .map_err(|_| RelationDataError::fernet("decrypt", "invalid_utf8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    const KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";
    const TOKEN: &str = "gAAAAAAdwJ6wAAECAwQFBgcICQoLDA0ODy021cpGVWKZ_eEwCGM4BLLF_5CV9dOPmrhuVUPgJobwOz7JcbmrR64jVmpU4IwqDA==";
    const TIMESTAMP: u64 = 499_162_800;
    const IV: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

    #[test]
    fn matches_reference_token() -> Result<(), Box<dyn Error>> {
        let key = FernetKey::from_base64(KEY)?;
        assert_eq!(key.encrypt_with(b"hello", TIMESTAMP, IV)?, TOKEN);
        assert_eq!(key.decrypt_string(TOKEN)?, "hello");
        Ok(())
    }

    #[test]
    fn fresh_tokens_decrypt_and_differ() -> Result<(), Box<dyn Error>> {
        let key = FernetKey::from_base64(KEY)?;
        let registration = "id: irc-bridge\nas_token: abc\n";
        let first = key.encrypt(registration.as_bytes())?;
        let second = key.encrypt(registration.as_bytes())?;
        assert_ne!(first, second);
        assert_eq!(key.decrypt_string(&first)?, registration);
        Ok(())
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() -> Result<(), Box<dyn Error>> {
        let key = FernetKey::from_base64(KEY)?;
        let other = FernetKey::from_base64(&URL_SAFE.encode([7_u8; 32]))?;
        assert!(matches!(
            other.decrypt(TOKEN),
            Err(RelationDataError::Fernet {
                reason: "bad_signature",
                ..
            })
        ));

        let mut raw = URL_SAFE.decode(TOKEN)?;
        raw[30] ^= 0x01;
        assert!(key.decrypt(&URL_SAFE.encode(raw)).is_err());
        assert!(key.decrypt("not a token").is_err());
        assert!(FernetKey::from_base64("c2hvcnQ=").is_err());
        Ok(())
    }
}
