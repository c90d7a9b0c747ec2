// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use mail_send::smtp::message::Parameters;
use mail_send::smtp::tls::build_tls_connector;
use mail_send::smtp::AssertReply;
use mail_send::{Credentials, SmtpClient};
use rustls::crypto::CryptoProvider;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::modules::account::entity::{MailAccount, Security};
use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailQueueResult;
use crate::modules::smtp::envelope::{dot_stuff, Envelope};
use crate::modules::smtp::stage::SendStage;
use crate::{raise_error, raise_transport_error};

pub const EXT_START_TLS: u32 = 1 << 24;

/// Makes ring the process-wide rustls provider unless one is already set.
/// Every SMTP TLS connector is built against it.
pub fn install_crypto_provider() -> MailQueueResult<()> {
    let _ = CryptoProvider::install_default(rustls::crypto::ring::default_provider());
    match CryptoProvider::get_default() {
        Some(_) => Ok(()),
        None => Err(raise_error!(
            "no rustls crypto provider available".into(),
            ErrorCode::InternalError
        )),
    }
}

/// Connection settings of one account with its password already decrypted.
/// Lives only for the duration of a dispatch pass and is never persisted.
#[derive(Clone)]
pub struct ResolvedAccount {
    pub account_id: u64,
    pub host: String,
    pub port: u16,
    pub security: Security,
    pub skip_tls_verify: bool,
    pub username: String,
    pub password: String,
}

impl ResolvedAccount {
    pub fn new(account: &MailAccount, password: String) -> Self {
        Self {
            account_id: account.id,
            host: account.host.clone(),
            port: account.port,
            security: account.security,
            skip_tls_verify: account.skip_tls_verify,
            username: account.username.clone(),
            password,
        }
    }
}

impl fmt::Debug for ResolvedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAccount")
            .field("account_id", &self.account_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Delivers one envelope through one account. Implementations hold no
/// per-send state.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        account: &ResolvedAccount,
        envelope: &Envelope,
    ) -> impl Future<Output = MailQueueResult<()>> + Send;
}

pub struct SmtpTransport {
    timeout: Duration,
    local_host: String,
}

impl SmtpTransport {
    pub fn new(timeout: Duration) -> Self {
        let local_host = gethostname::gethostname()
            .to_str()
            .unwrap_or("[127.0.0.1]")
            .to_string();
        Self {
            timeout,
            local_host,
        }
    }

    async fn converse(&self, account: &ResolvedAccount, envelope: &Envelope) -> MailQueueResult<()> {
        let message = envelope.render(&self.local_host)?;
        let stream = TcpStream::connect((account.host.as_str(), account.port))
            .await
            .map_err(|e| raise_transport_error!(SendStage::Connect, e.to_string()))?;

        let mut client = SmtpClient {
            stream,
            timeout: self.timeout,
        };
        let credentials = Credentials::new(account.username.clone(), account.password.clone());

        if account.security.is_implicit_tls() {
            let tls_connector = build_tls_connector(account.skip_tls_verify);
            let mut client = client
                .into_tls(&tls_connector, &account.host)
                .await
                .map_err(|e| raise_transport_error!(SendStage::Handshake, format!("{:#?}", e)))?;
            greet(&mut client).await?;
            return self.deliver(client, &credentials, envelope, &message).await;
        }

        greet(&mut client).await?;
        if account.security != Security::StartTls {
            return self.deliver(client, &credentials, envelope, &message).await;
        }

        let response = client
            .ehlo(&self.local_host)
            .await
            .map_err(|e| raise_transport_error!(SendStage::Handshake, format!("{:#?}", e)))?;
        if !response.has_capability(EXT_START_TLS) {
            return Err(raise_transport_error!(
                SendStage::Handshake,
                format!("{} does not advertise STARTTLS", account.host)
            ));
        }
        let tls_connector = build_tls_connector(account.skip_tls_verify);
        let client = client
            .start_tls(&tls_connector, &account.host)
            .await
            .map_err(|e| raise_transport_error!(SendStage::Handshake, format!("{:#?}", e)))?;
        self.deliver(client, &credentials, envelope, &message).await
    }

    /// Shared tail of every security mode: EHLO, AUTH, MAIL FROM, RCPT TO
    /// per recipient, DATA, QUIT.
    async fn deliver<T: AsyncRead + AsyncWrite + Unpin>(
        &self,
        mut client: SmtpClient<T>,
        credentials: &Credentials<String>,
        envelope: &Envelope,
        message: &[u8],
    ) -> MailQueueResult<()> {
        let capabilities = client
            .capabilities(&self.local_host, false)
            .await
            .map_err(|e| raise_transport_error!(SendStage::Handshake, format!("{:#?}", e)))?;

        client
            .authenticate(credentials, &capabilities)
            .await
            .map_err(|e| raise_transport_error!(SendStage::Auth, format!("{:#?}", e)))?;

        client
            .mail_from(&envelope.from_address, &Parameters::new())
            .await
            .map_err(|e| raise_transport_error!(SendStage::Sender, format!("{:#?}", e)))?;

        for (index, recipient) in envelope.recipients.iter().enumerate() {
            client
                .rcpt_to(recipient, &Parameters::new())
                .await
                .map_err(|e| {
                    raise_transport_error!(SendStage::Recipient(index + 1), format!("{:#?}", e))
                })?;
        }

        client
            .cmd(b"DATA\r\n")
            .await
            .and_then(|response| response.assert_code(354))
            .map_err(|e| raise_transport_error!(SendStage::DataOpen, format!("{:#?}", e)))?;

        let payload = dot_stuff(message);
        client
            .stream
            .write_all(&payload)
            .await
            .map_err(|e| raise_transport_error!(SendStage::DataWrite, e.to_string()))?;
        client
            .stream
            .flush()
            .await
            .map_err(|e| raise_transport_error!(SendStage::DataWrite, e.to_string()))?;

        client
            .read()
            .await
            .and_then(|response| response.assert_positive_completion())
            .map_err(|e| raise_transport_error!(SendStage::DataClose, format!("{:#?}", e)))?;

        client
            .quit()
            .await
            .map_err(|e| raise_transport_error!(SendStage::Quit, format!("{:#?}", e)))
    }
}

async fn greet<T: AsyncRead + AsyncWrite + Unpin>(client: &mut SmtpClient<T>) -> MailQueueResult<()> {
    client
        .read()
        .await
        .and_then(|response| response.assert_positive_completion())
        .map_err(|e| raise_transport_error!(SendStage::Connect, format!("{:#?}", e)))
}

impl Transport for SmtpTransport {
    async fn send(&self, account: &ResolvedAccount, envelope: &Envelope) -> MailQueueResult<()> {
        debug!(
            "Sending to {} recipient(s) via {}:{} ({})",
            envelope.recipients.len(),
            account.host,
            account.port,
            account.security
        );
        match tokio::time::timeout(self.timeout, self.converse(account, envelope)).await {
            Ok(result) => result,
            Err(_) => Err(raise_transport_error!(
                SendStage::Timeout,
                format!("no completion within {}s", self.timeout.as_secs())
            )),
        }
    }
}
