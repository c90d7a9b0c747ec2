// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::entity::MailAccountView;
use crate::modules::account::payload::{AccountCreateRequest, AccountUpdateRequest};
use crate::modules::account::{create_account, get_account, update_account};
use crate::modules::rest::api::{ApiContext, ApiTags};
use crate::modules::rest::ApiResult;
use poem_openapi::param::Path;
use poem_openapi::payload::Json;
use poem_openapi::OpenApi;

pub struct AccountApi {
    pub context: ApiContext,
}

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::Account")]
impl AccountApi {
    /// Get mail account details by ID. The stored secret is never returned.
    #[oai(
        path = "/account/:account_id",
        method = "get",
        operation_id = "get_account"
    )]
    async fn get_account(
        &self,
        /// The account ID to retrieve
        account_id: Path<u64>,
    ) -> ApiResult<Json<MailAccountView>> {
        let account = get_account(self.context.store.as_ref(), account_id.0).await?;
        Ok(Json(account.into()))
    }

    /// Create a mail account. The password is encrypted before it is stored.
    #[oai(path = "/account", method = "post", operation_id = "create_account")]
    async fn create_account(
        &self,
        /// Account creation request payload
        payload: Json<AccountCreateRequest>,
    ) -> ApiResult<Json<MailAccountView>> {
        let account = create_account(
            self.context.store.as_ref(),
            self.context.vault.as_ref(),
            payload.0,
            self.context.default_hourly_quota,
        )
        .await?;
        Ok(Json(account.into()))
    }

    /// Update an existing mail account. Omitted fields keep their current value.
    #[oai(
        path = "/account/:account_id",
        method = "post",
        operation_id = "update_account"
    )]
    async fn update_account(
        &self,
        /// The account ID to update
        account_id: Path<u64>,
        /// Fields to change
        payload: Json<AccountUpdateRequest>,
    ) -> ApiResult<Json<MailAccountView>> {
        let account = update_account(
            self.context.store.as_ref(),
            self.context.vault.as_ref(),
            account_id.0,
            payload.0,
        )
        .await?;
        Ok(Json(account.into()))
    }
}
