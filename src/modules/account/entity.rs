// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use crate::modules::account::payload::{AccountCreateRequest, AccountUpdateRequest};
use crate::modules::error::MailQueueResult;
use crate::modules::vault::CredentialVault;
use crate::{id, utc_now};
use native_db::*;
use native_model::{native_model, Model};
use poem_openapi::{Enum, Object};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOURLY_QUOTA: u32 = 80;

/// Outbound mail-server credential and policy set, scoped to one tenant.
#[derive(Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
#[native_model(id = 2, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct MailAccount {
    #[secondary_key(unique)]
    pub id: u64,
    #[secondary_key]
    pub tenant_id: u64,
    pub host: String,
    pub port: u16,
    /// Authenticating user; also the envelope sender unless `from_address` is set.
    pub username: String,
    /// Password sealed by the credential vault. Never holds plaintext.
    pub secret: String,
    pub from_name: String,
    pub from_address: Option<String>,
    pub security: Security,
    /// Disables certificate chain and hostname validation.
    pub skip_tls_verify: bool,
    pub hourly_quota: u32,
    pub active: bool,
    pub is_default: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MailAccount {
    fn pk(&self) -> String {
        format!("{}_{}", self.created_at, self.id)
    }

    pub fn new(
        request: AccountCreateRequest,
        vault: &impl CredentialVault,
    ) -> MailQueueResult<Self> {
        let now = utc_now!();
        Ok(Self {
            id: id!(),
            tenant_id: request.tenant_id,
            host: request.host,
            port: request.port,
            username: request.username,
            secret: vault.encrypt(&request.password)?,
            from_name: request.from_name,
            from_address: request.from_address,
            security: request.security,
            skip_tls_verify: request.skip_tls_verify.unwrap_or(false),
            hourly_quota: request.hourly_quota.unwrap_or(DEFAULT_HOURLY_QUOTA),
            active: request.active.unwrap_or(true),
            is_default: request.is_default.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(
        &self,
        request: AccountUpdateRequest,
        vault: &impl CredentialVault,
    ) -> MailQueueResult<Self> {
        let mut updated = self.clone();
        if let Some(host) = request.host {
            updated.host = host;
        }
        if let Some(port) = request.port {
            updated.port = port;
        }
        if let Some(username) = request.username {
            updated.username = username;
        }
        if let Some(password) = request.password {
            updated.secret = vault.encrypt(&password)?;
        }
        if let Some(from_name) = request.from_name {
            updated.from_name = from_name;
        }
        if request.from_address.is_some() {
            updated.from_address = request.from_address;
        }
        if let Some(security) = request.security {
            updated.security = security;
        }
        if let Some(skip) = request.skip_tls_verify {
            updated.skip_tls_verify = skip;
        }
        if let Some(quota) = request.hourly_quota {
            updated.hourly_quota = quota;
        }
        if let Some(active) = request.active {
            updated.active = active;
        }
        if let Some(is_default) = request.is_default {
            updated.is_default = is_default;
        }
        updated.updated_at = utc_now!();
        Ok(updated)
    }

    pub fn sender_address(&self) -> &str {
        self.from_address.as_deref().unwrap_or(&self.username)
    }
}

impl fmt::Debug for MailAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailAccount")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("security", &self.security)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .field("hourly_quota", &self.hourly_quota)
            .field("active", &self.active)
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// Transport-security mode of a mail account.
#[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Serialize, Deserialize, Enum)]
pub enum Security {
    /// Unencrypted connection
    None,
    /// TLS handshake before the SMTP greeting (implicit TLS)
    #[default]
    Ssl,
    /// Plain connection upgraded in place with STARTTLS
    StartTls,
    /// Historical name for `Ssl`
    Tls,
}

impl Security {
    pub fn is_implicit_tls(&self) -> bool {
        matches!(self, Security::Ssl | Security::Tls)
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Security::None => write!(f, "none"),
            Security::Ssl => write!(f, "ssl"),
            Security::StartTls => write!(f, "starttls"),
            Security::Tls => write!(f, "tls"),
        }
    }
}

/// Account as returned over the API, without the sealed secret.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Object)]
pub struct MailAccountView {
    pub id: u64,
    pub tenant_id: u64,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub from_name: String,
    pub from_address: Option<String>,
    pub security: Security,
    pub skip_tls_verify: bool,
    pub hourly_quota: u32,
    pub active: bool,
    pub is_default: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<MailAccount> for MailAccountView {
    fn from(account: MailAccount) -> Self {
        Self {
            id: account.id,
            tenant_id: account.tenant_id,
            host: account.host,
            port: account.port,
            username: account.username,
            from_name: account.from_name,
            from_address: account.from_address,
            security: account.security,
            skip_tls_verify: account.skip_tls_verify,
            hourly_quota: account.hourly_quota,
            active: account.active,
            is_default: account.is_default,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
