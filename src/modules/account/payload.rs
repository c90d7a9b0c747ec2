// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::entity::Security;
use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Eq, PartialEq, Serialize, Deserialize, Object)]
pub struct AccountCreateRequest {
    /// Owning tenant.
    pub tenant_id: u64,
    /// SMTP server hostname or IP address
    #[oai(validator(max_length = 253, pattern = r"^[a-zA-Z0-9\-\.]+$"))]
    pub host: String,
    /// SMTP server port number
    #[oai(validator(minimum(value = "1"), maximum(value = "65535")))]
    pub port: u16,
    #[oai(validator(min_length = 1, max_length = 256))]
    pub username: String,
    /// Plaintext password. It is sealed by the credential vault before it is
    /// stored and is never returned.
    #[oai(validator(min_length = 1, max_length = 256))]
    pub password: String,
    pub from_name: String,
    pub from_address: Option<String>,
    pub security: Security,
    pub skip_tls_verify: Option<bool>,
    /// Hourly send ceiling, default 80.
    #[oai(validator(minimum(value = "1")))]
    pub hourly_quota: Option<u32>,
    pub active: Option<bool>,
    pub is_default: Option<bool>,
}

impl fmt::Debug for AccountCreateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCreateRequest")
            .field("tenant_id", &self.tenant_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("security", &self.security)
            .field("hourly_quota", &self.hourly_quota)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default, Eq, PartialEq, Serialize, Deserialize, Object)]
pub struct AccountUpdateRequest {
    #[oai(validator(max_length = 253, pattern = r"^[a-zA-Z0-9\-\.]+$"))]
    pub host: Option<String>,
    #[oai(validator(minimum(value = "1"), maximum(value = "65535")))]
    pub port: Option<u16>,
    pub username: Option<String>,
    #[oai(validator(min_length = 1, max_length = 256))]
    pub password: Option<String>,
    pub from_name: Option<String>,
    pub from_address: Option<String>,
    pub security: Option<Security>,
    pub skip_tls_verify: Option<bool>,
    #[oai(validator(minimum(value = "1")))]
    pub hourly_quota: Option<u32>,
    pub active: Option<bool>,
    pub is_default: Option<bool>,
}

impl fmt::Debug for AccountUpdateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountUpdateRequest")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("security", &self.security)
            .field("hourly_quota", &self.hourly_quota)
            .field("active", &self.active)
            .field("is_default", &self.is_default)
            .finish_non_exhaustive()
    }
}
