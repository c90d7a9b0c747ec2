// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Cow;

use mail_send::mail_builder::{headers::address::Address, MessageBuilder};

use crate::modules::account::entity::MailAccount;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailQueueResult;
use crate::modules::outbox::entity::QueueEntry;
use crate::{raise_error, utc_now};

/// Everything the wire conversation needs from one queue entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Envelope {
    pub from_name: String,
    pub from_address: String,
    /// The first recipient is the primary; the rest are copied.
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

impl Envelope {
    pub fn new(entry: &QueueEntry, account: &MailAccount) -> Self {
        Self {
            from_name: account.from_name.clone(),
            from_address: account.sender_address().to_string(),
            recipients: entry.recipients.clone(),
            subject: entry.subject.clone(),
            body: entry.body.clone(),
            is_html: entry.is_html,
        }
    }

    /// Renders the RFC 5322 message: `To` carries the first recipient and
    /// every remaining recipient is folded into a single `Cc` header.
    pub fn render(&self, host_name: &str) -> MailQueueResult<Vec<u8>> {
        let (first, rest) = self.recipients.split_first().ok_or_else(|| {
            raise_error!(
                "Envelope has no recipients".into(),
                ErrorCode::InvalidParameter
            )
        })?;

        let from_name = (!self.from_name.trim().is_empty()).then(|| self.from_name.as_str());
        let mut builder = MessageBuilder::new()
            .from(Address::new_address(
                from_name,
                Cow::Borrowed(self.from_address.as_str()),
            ))
            .to(Address::new_address(None::<&str>, Cow::Borrowed(first.as_str())))
            .subject(self.subject.as_str())
            .message_id(generate_message_id(host_name))
            .date(utc_now!() / 1000);

        if !rest.is_empty() {
            let copies = rest
                .iter()
                .map(|r| Address::new_address(None::<&str>, Cow::Borrowed(r.as_str())))
                .collect::<Vec<_>>();
            builder = builder.cc(Address::new_list(copies));
        }

        let body = normalize_line_endings(&self.body);
        builder = if self.is_html {
            builder.html_body(body)
        } else {
            builder.text_body(body)
        };

        builder.write_to_vec().map_err(|e| {
            raise_error!(
                format!("Failed to build message: {}", e),
                ErrorCode::InternalError
            )
        })
    }
}

fn generate_message_id(host_name: &str) -> String {
    format!(
        "{}.{:032x}@{}",
        utc_now!(),
        rand::random::<u128>(),
        host_name
    )
}

/// Converts bare `\n` and `\r` into `\r\n`.
pub fn normalize_line_endings(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            other => out.push(other),
        }
    }
    out
}

/// Transparency for the DATA phase: every line starting with `.` gets an
/// extra leading `.`, and the payload is terminated by `CRLF . CRLF`.
pub fn dot_stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 8);
    let mut line_start = true;
    for &byte in message {
        if line_start && byte == b'.' {
            out.push(b'.');
        }
        out.push(byte);
        line_start = byte == b'\n';
    }
    if !out.ends_with(b"\r\n") {
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b".\r\n");
    out
}
