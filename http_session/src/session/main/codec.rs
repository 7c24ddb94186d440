//! Stateless session token encoding
//!
//! A session token is `b64(data).b64(expiry).b64(mac)` where `data` is the
//! serialized payload (optionally AES-256-GCM sealed), `expiry` is the decimal
//! expiry timestamp in seconds since the epoch (empty for tokens that never
//! expire) and `mac` is HMAC-SHA256 over the first two segments. The MAC is
//! checked before anything else is looked at.

use chrono::Utc;
use hmac::{Hmac, Mac};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use sha2::Sha256;

use crate::config::SessionConfig;
use crate::session::errors::{DecodeError, SessionError};
use crate::session::types::SessionPayload;
use crate::utils::{base64url_decode, base64url_encode, gen_random_bytes};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct TokenCodec {
    sign_key: [u8; 32],
    enc_key: Option<[u8; 32]>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("encrypted", &self.enc_key.is_some())
            .finish()
    }
}

fn new_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
}

fn derive_key(secret: &str, label: &str, salt: &str) -> [u8; 32] {
    let mut mac = new_mac(secret.as_bytes());
    mac.update(label.as_bytes());
    mac.update(salt.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    key
}

impl TokenCodec {
    pub fn new(config: &SessionConfig) -> Self {
        let sign_key = derive_key(&config.server_secret, "signing:", &config.signing_salt);
        let enc_key = config
            .encrypt_data
            .then(|| derive_key(&config.server_secret, "encryption:", &config.signing_salt));
        Self { sign_key, enc_key }
    }

    pub fn is_encrypted(&self) -> bool {
        self.enc_key.is_some()
    }

    /// Encode `payload` into a signed token expiring at `expires_at` (seconds since
    /// the epoch), or never when `None`.
    pub fn encode<T: SessionPayload>(
        &self,
        payload: &T,
        expires_at: Option<i64>,
    ) -> Result<String, SessionError> {
        let mut data = payload.to_bytes()?;
        if let Some(key) = &self.enc_key {
            data = seal(key, data)?;
        }
        let expiry = expires_at.map(|e| e.to_string()).unwrap_or_default();

        let signed = format!(
            "{}.{}",
            base64url_encode(&data),
            base64url_encode(expiry.as_bytes())
        );
        let signature = self.sign(&signed);
        Ok(format!("{signed}.{}", base64url_encode(&signature)))
    }

    /// Decode a token against the current server time.
    pub fn decode<T: SessionPayload>(&self, token: &str) -> Result<T, DecodeError> {
        self.decode_at(token, Utc::now().timestamp())
    }

    /// Decode a token as if the current time were `now`.
    pub fn decode_at<T: SessionPayload>(&self, token: &str, now: i64) -> Result<T, DecodeError> {
        let (data_b64, expiry_b64) = self.verified_segments(token)?;

        let expiry = base64url_decode(expiry_b64).map_err(|_| DecodeError::Malformed)?;
        let expiry = String::from_utf8(expiry).map_err(|_| DecodeError::Malformed)?;
        if !expiry.is_empty() {
            let expires_at: i64 = expiry.parse().map_err(|_| DecodeError::Malformed)?;
            if now >= expires_at {
                tracing::debug!("Session token expired at {}", expires_at);
                return Err(DecodeError::Expired);
            }
        }

        let mut data = base64url_decode(data_b64).map_err(|_| DecodeError::Malformed)?;
        if let Some(key) = &self.enc_key {
            data = open(key, data).ok_or_else(|| {
                tracing::error!("Session token has a valid signature but cannot be decrypted");
                DecodeError::Malformed
            })?;
        }

        T::from_bytes(&data).map_err(|e| {
            tracing::error!("Session payload cannot be deserialized: {}", e);
            DecodeError::Malformed
        })
    }

    /// Check structure and signature only, ignoring expiry.
    pub fn verify_signature(&self, token: &str) -> Result<(), DecodeError> {
        self.verified_segments(token).map(|_| ())
    }

    fn verified_segments<'a>(&self, token: &'a str) -> Result<(&'a str, &'a str), DecodeError> {
        let mut parts = token.split('.');
        let (Some(data), Some(expiry), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(DecodeError::Malformed);
        };
        if data.is_empty() || signature.is_empty() {
            return Err(DecodeError::Malformed);
        }

        let signature = base64url_decode(signature).map_err(|_| DecodeError::BadSignature)?;
        let signed_len = data.len() + 1 + expiry.len();
        let mut mac = new_mac(&self.sign_key);
        mac.update(&token.as_bytes()[..signed_len]);
        mac.verify_slice(&signature).map_err(|_| {
            tracing::warn!("Session token signature mismatch");
            DecodeError::BadSignature
        })?;

        Ok((data, expiry))
    }

    fn sign(&self, signed: &str) -> Vec<u8> {
        let mut mac = new_mac(&self.sign_key);
        mac.update(signed.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn seal(key: &[u8; 32], mut data: Vec<u8>) -> Result<Vec<u8>, SessionError> {
    let key = UnboundKey::new(&AES_256_GCM, key)
        .map(LessSafeKey::new)
        .map_err(|_| SessionError::Crypto("Invalid encryption key".to_string()))?;
    let mut sealed = gen_random_bytes(NONCE_LEN)?;
    let nonce = Nonce::try_assume_unique_for_key(&sealed)
        .map_err(|_| SessionError::Crypto("Invalid nonce".to_string()))?;

    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut data)
        .map_err(|_| SessionError::Crypto("Failed to encrypt session data".to_string()))?;

    sealed.extend_from_slice(&data);
    Ok(sealed)
}

fn open(key: &[u8; 32], sealed: Vec<u8>) -> Option<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        return None;
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce).ok()?;
    let key = UnboundKey::new(&AES_256_GCM, key).map(LessSafeKey::new).ok()?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = key.open_in_place(nonce, Aad::empty(), &mut in_out).ok()?;
    Some(plaintext.to_vec())
}
