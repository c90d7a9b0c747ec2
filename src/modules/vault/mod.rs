// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::{code::ErrorCode, MailQueueResult};
use crate::modules::utils::encrypt::{decrypt_with, encrypt_with};
use crate::raise_error;

/// Stores mail-account secrets at rest and reveals them on demand.
pub trait CredentialVault: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> MailQueueResult<String>;

    /// Fails with `ErrorCode::DecryptionFailed` when the ciphertext is malformed
    /// or was sealed under a different key.
    fn decrypt(&self, secret: &str) -> MailQueueResult<String>;
}

/// AES-256-GCM vault keyed by a password-derived key.
pub struct AesGcmVault {
    password: String,
}

impl AesGcmVault {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl CredentialVault for AesGcmVault {
    fn encrypt(&self, plaintext: &str) -> MailQueueResult<String> {
        encrypt_with(&self.password, plaintext)
            .map_err(|_| raise_error!("Failed to encrypt string.".into(), ErrorCode::InternalError))
    }

    fn decrypt(&self, secret: &str) -> MailQueueResult<String> {
        decrypt_with(&self.password, secret).map_err(|_| {
            raise_error!(
                "Decryption failed, likely due to incorrect encryption key or corrupted data"
                    .into(),
                ErrorCode::DecryptionFailed
            )
        })
    }
}
