//! HTTP transport to the Users service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use tracing::debug;

use super::BalanceClient;
use super::error::UpstreamError;
use crate::account::{Account, OpStatus};
use crate::core_types::{Amount, OpId, UserId};
use crate::gateway::types::{AdjustBalanceRequest, OperationStatusResponse};

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpBalanceClient {
    client: Client,
    base_url: Url,
}

impl HttpBalanceClient {
    /// `base_url` is the Users service root, e.g. `http://localhost:8080`
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| UpstreamError::Transport(format!("invalid users url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::Transport(format!(
                "invalid users url: {}",
                base_url
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Base URL plus path segments, each one percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn user_url(&self, user_id: &UserId) -> Url {
        self.url(&["users", user_id.as_str()])
    }

    /// Turn a non-success response into its error class
    async fn check(response: Response) -> Result<Response, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(UpstreamError::from_status(status.as_u16(), body))
    }
}

#[async_trait]
impl BalanceClient for HttpBalanceClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn get_balance(&self, user_id: &UserId) -> Result<Account, UpstreamError> {
        let url = self.user_url(user_id);
        debug!(%url, "GET balance");
        let response = Self::check(self.client.get(url).send().await?).await?;
        let account = response.json::<Account>().await?;
        Ok(account)
    }

    async fn adjust_balance(
        &self,
        user_id: &UserId,
        delta: Amount,
        expected_balance: Option<Amount>,
        op_id: Option<&OpId>,
    ) -> Result<(), UpstreamError> {
        let url = self.user_url(user_id);
        let body = AdjustBalanceRequest {
            amount: delta,
            expected_balance,
            op_id: op_id.map(|o| o.as_str().to_string()),
        };
        debug!(%url, delta, ?expected_balance, ?op_id, "PUT balance");
        Self::check(self.client.put(url).json(&body).send().await?).await?;
        Ok(())
    }

    async fn void_operation(
        &self,
        user_id: &UserId,
        op_id: &OpId,
    ) -> Result<OpStatus, UpstreamError> {
        let url = self.url(&["users", user_id.as_str(), "operations", op_id.as_str(), "void"]);
        debug!(%url, "POST void");
        let response = Self::check(self.client.post(url).send().await?).await?;
        let result = response.json::<OperationStatusResponse>().await?;
        Ok(result.status)
    }
}
