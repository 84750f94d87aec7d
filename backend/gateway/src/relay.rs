//! HTTP client for a sponsor relay's `POST /sponsor`.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use crate::errors::{GatewayError, Result};
use crate::sponsor::SponsorResponse;
use crate::submitter::{Action, Receipt};

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Ask the relay to perform `action` for `user_address`.
    pub async fn request(&self, action: Action, user_address: &str) -> Result<Receipt> {
        let resp = self
            .http
            .post(format!("{}/sponsor", self.base_url))
            .json(&json!({ "action": action.as_str(), "userAddress": user_address }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let reason = body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("no reason given");
            return Err(GatewayError::Network(format!(
                "relay returned {status}: {reason}"
            )));
        }

        let body: SponsorResponse = resp.json().await?;
        if !body.success || body.hash.is_empty() {
            return Err(GatewayError::Decode(
                "relay response carried no transaction hash".into(),
            ));
        }

        Ok(Receipt {
            hash: body.hash,
            ledger: body.receipt.ledger,
            return_value: None,
            sponsored: true,
        })
    }
}
