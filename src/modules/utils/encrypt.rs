// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use base64::{engine::general_purpose, Engine as _};
use ring::aead::{Aad, BoundKey, Nonce, NonceSequence, OpeningKey, SealingKey, AES_256_GCM};
use ring::pbkdf2::{self, derive};
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

struct SingleNonceSequence([u8; NONCE_LEN]);

impl NonceSequence for SingleNonceSequence {
    fn advance(&mut self) -> Result<Nonce, ring::error::Unspecified> {
        Ok(Nonce::assume_unique_for_key(self.0))
    }
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        salt,
        password.as_bytes(),
        &mut key,
    );
    key
}

/// Output layout: URL-safe base64 of `salt ‖ nonce ‖ ciphertext+tag`.
pub fn encrypt_with(password: &str, plaintext: &str) -> Result<String, ring::error::Unspecified> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)?;
    let key = derive_key(password, &salt);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)?;
    let unbound_key = ring::aead::UnboundKey::new(&AES_256_GCM, &key)?;
    let mut sealing_key = SealingKey::new(unbound_key, SingleNonceSequence(nonce_bytes));
    let mut in_out = plaintext.as_bytes().to_vec();
    sealing_key.seal_in_place_append_tag(Aad::empty(), &mut in_out)?;

    let mut result = Vec::with_capacity(SALT_LEN + NONCE_LEN + in_out.len());
    result.extend_from_slice(&salt);
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&in_out);
    Ok(general_purpose::URL_SAFE.encode(&result))
}

pub fn decrypt_with(password: &str, data: &str) -> Result<String, ring::error::Unspecified> {
    let data = general_purpose::URL_SAFE
        .decode(data)
        .map_err(|_| ring::error::Unspecified)?;
    if data.len() < SALT_LEN + NONCE_LEN {
        return Err(ring::error::Unspecified);
    }
    let salt = &data[0..SALT_LEN];
    let nonce_bytes: [u8; NONCE_LEN] = data[SALT_LEN..SALT_LEN + NONCE_LEN]
        .try_into()
        .map_err(|_| ring::error::Unspecified)?;
    let key = derive_key(password, salt);

    let unbound_key = ring::aead::UnboundKey::new(&AES_256_GCM, &key)?;
    let mut opening_key = OpeningKey::new(unbound_key, SingleNonceSequence(nonce_bytes));
    let mut in_out = data[SALT_LEN + NONCE_LEN..].to_vec();
    let decrypted_bytes = opening_key.open_in_place(Aad::empty(), &mut in_out)?;
    String::from_utf8(decrypted_bytes.to_vec()).map_err(|_| ring::error::Unspecified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let password = "my_secure_passwasdasdasdasdasord";
        let plaintext = "smtp-app-password";
        let encrypted = encrypt_with(password, plaintext).unwrap();
        assert_ne!(encrypted, plaintext);
        let decrypted = decrypt_with(password, &encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_password_rejected() {
        let encrypted = encrypt_with("key-one", "secret").unwrap();
        assert!(decrypt_with("key-two", &encrypted).is_err());
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert!(decrypt_with("key", "not base64 !!").is_err());
        assert!(decrypt_with("key", "c2hvcnQ=").is_err());
    }
}
