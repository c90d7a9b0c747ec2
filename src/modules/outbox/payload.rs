// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::outbox::entity::EmailCategory;
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// Request to queue one outbound message.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Object)]
pub struct EnqueueRequest {
    pub tenant_id: u64,
    /// Mail account to send through. When omitted, the tenant's default
    /// account is resolved at dispatch time.
    pub account_id: Option<u64>,
    /// The first recipient becomes `To`; the rest are copied on `Cc`.
    #[oai(validator(min_items = 1, max_items = 100))]
    pub recipients: Vec<String>,
    #[oai(validator(max_length = 998))]
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub category: Option<EmailCategory>,
    /// Earliest dispatch time (UNIX epoch milliseconds).
    pub not_before: Option<i64>,
    /// Overrides the configured attempt ceiling.
    #[oai(validator(minimum(value = "1"), maximum(value = "20")))]
    pub max_attempts: Option<u32>,
}
