// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use crate::modules::error::code::ErrorCode;

/// Step of the SMTP conversation a send failed in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SendStage {
    /// TCP connect, implicit TLS handshake, or reading the greeting.
    Connect,
    /// EHLO and, for STARTTLS accounts, the in-place upgrade.
    Handshake,
    Auth,
    Sender,
    /// `RCPT TO` for the n-th recipient, counted from 1.
    Recipient(usize),
    DataOpen,
    DataWrite,
    DataClose,
    Quit,
    /// The whole conversation ran past the per-send deadline.
    Timeout,
}

impl SendStage {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            SendStage::Connect | SendStage::Handshake => ErrorCode::SmtpConnectionFailed,
            SendStage::Auth => ErrorCode::SmtpAuthenticationFailed,
            SendStage::Timeout => ErrorCode::ConnectionTimeout,
            _ => ErrorCode::SmtpCommandFailed,
        }
    }
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendStage::Connect => write!(f, "connect"),
            SendStage::Handshake => write!(f, "handshake"),
            SendStage::Auth => write!(f, "auth"),
            SendStage::Sender => write!(f, "sender"),
            SendStage::Recipient(n) => write!(f, "recipient-{}", n),
            SendStage::DataOpen => write!(f, "data-open"),
            SendStage::DataWrite => write!(f, "data-write"),
            SendStage::DataClose => write!(f, "data-close"),
            SendStage::Quit => write!(f, "quit"),
            SendStage::Timeout => write!(f, "timeout"),
        }
    }
}
