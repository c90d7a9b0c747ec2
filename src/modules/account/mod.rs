// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::entity::MailAccount;
use crate::modules::account::payload::{AccountCreateRequest, AccountUpdateRequest};
use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailQueueResult;
use crate::modules::store::OutboxStore;
use crate::modules::vault::CredentialVault;
use crate::{raise_error, validate_email};
use tracing::info;

pub mod entity;
pub mod payload;

pub async fn create_account<S: OutboxStore, V: CredentialVault>(
    store: &S,
    vault: &V,
    mut request: AccountCreateRequest,
    default_hourly_quota: u32,
) -> MailQueueResult<MailAccount> {
    if let Some(address) = &request.from_address {
        validate_email!(address)?;
    }
    request.hourly_quota.get_or_insert(default_hourly_quota);

    let account = MailAccount::new(request, vault)?;
    store.save_account(account.clone()).await?;
    info!(
        "Mail account {} created for tenant {} ({}:{})",
        account.id, account.tenant_id, account.host, account.port
    );
    Ok(account)
}

pub async fn get_account<S: OutboxStore>(store: &S, id: u64) -> MailQueueResult<MailAccount> {
    store.get_account(id).await?.ok_or_else(|| {
        raise_error!(
            format!("Mail account {} not found", id),
            ErrorCode::ResourceNotFound
        )
    })
}

/// Applies a partial update. A new password is resealed before it is stored.
pub async fn update_account<S: OutboxStore, V: CredentialVault>(
    store: &S,
    vault: &V,
    id: u64,
    request: AccountUpdateRequest,
) -> MailQueueResult<MailAccount> {
    if let Some(address) = &request.from_address {
        validate_email!(address)?;
    }
    let current = get_account(store, id).await?;
    let updated = current.apply_update(request, vault)?;
    store.save_account(updated.clone()).await?;
    info!("Mail account {} updated", id);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::account::entity::Security;
    use crate::modules::database::manager::DatabaseManager;
    use crate::modules::store::nativedb::NativeDbOutboxStore;
    use crate::modules::vault::AesGcmVault;

    fn request(tenant_id: u64) -> AccountCreateRequest {
        AccountCreateRequest {
            tenant_id,
            host: "smtp.example.com".into(),
            port: 587,
            username: "robot@example.com".into(),
            password: "hunter2".into(),
            from_name: "Acme".into(),
            from_address: None,
            security: Security::StartTls,
            skip_tls_verify: None,
            hourly_quota: None,
            active: None,
            is_default: Some(true),
        }
    }

    fn store() -> NativeDbOutboxStore {
        NativeDbOutboxStore::new(DatabaseManager::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn created_account_seals_password_and_takes_default_quota() {
        let store = store();
        let vault = AesGcmVault::new("k");
        let account = create_account(&store, &vault, request(1), 42).await.unwrap();

        assert_eq!(account.hourly_quota, 42);
        assert_ne!(account.secret, "hunter2");
        assert_eq!(vault.decrypt(&account.secret).unwrap(), "hunter2");
        let stored = get_account(&store, account.id).await.unwrap();
        assert_eq!(stored.secret, account.secret);
        assert!(stored.active);
    }

    #[tokio::test]
    async fn invalid_from_address_is_rejected() {
        let store = store();
        let vault = AesGcmVault::new("k");
        let mut bad = request(1);
        bad.from_address = Some("not-an-address".into());
        let err = create_account(&store, &vault, bad, 80).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParameter);
    }

    #[tokio::test]
    async fn update_reseals_new_password() {
        let store = store();
        let vault = AesGcmVault::new("k");
        let account = create_account(&store, &vault, request(1), 80).await.unwrap();

        let updated = update_account(
            &store,
            &vault,
            account.id,
            AccountUpdateRequest {
                password: Some("correct horse".into()),
                hourly_quota: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.hourly_quota, 5);
        assert_eq!(vault.decrypt(&updated.secret).unwrap(), "correct horse");
        assert_eq!(updated.host, account.host);
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let err = get_account(&store(), 7).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ResourceNotFound);
    }
}
