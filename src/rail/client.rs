//! HTTP client for the Lightning gateway

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Msats;

use super::{
    DecodedInvoice, LightningInvoice, LnurlWithdrawPoint, PaymentContext, PaymentOutcome,
    PaymentRail, RailError,
};

/// JSON client for the Lightning gateway API.
#[derive(Debug, Clone)]
pub struct HttpRailClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct InvoiceRequest<'a> {
    amount_msats: i64,
    memo: &'a str,
}

#[derive(Debug, Serialize)]
struct PaymentRequestBody<'a> {
    invoice: &'a str,
}

#[derive(Debug, Serialize)]
struct ReceiveRequest<'a> {
    context: PaymentContext,
    operation_id: &'a str,
}

#[derive(Debug, Serialize)]
struct LnurlWithdrawRequest<'a> {
    max_msats: i64,
    min_msats: i64,
    memo: &'a str,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpRailClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, RailError>
    where
        Req: Serialize + ?Sized,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RailError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let reason = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RailError::Rejected(reason));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| RailError::Transport(e.to_string()))
    }
}

#[async_trait]
impl PaymentRail for HttpRailClient {
    async fn invoice(&self, amount: Msats, memo: &str) -> Result<LightningInvoice, RailError> {
        let invoice: LightningInvoice = self
            .post_json(
                "/invoices",
                &InvoiceRequest {
                    amount_msats: amount.value(),
                    memo,
                },
            )
            .await?;
        tracing::debug!(operation_id = %invoice.operation_id, %amount, "Created invoice");
        Ok(invoice)
    }

    async fn decode(&self, invoice: &str) -> Result<DecodedInvoice, RailError> {
        self.post_json("/invoices/decode", &PaymentRequestBody { invoice })
            .await
    }

    async fn pay(&self, invoice: &str) -> Result<PaymentOutcome, RailError> {
        let outcome: PaymentOutcome = self
            .post_json("/payments", &PaymentRequestBody { invoice })
            .await?;
        tracing::info!(
            operation_id = %outcome.operation_id,
            fee = %outcome.fee_msats,
            "Paid invoice"
        );
        Ok(outcome)
    }

    async fn receive(
        &self,
        context: PaymentContext,
        operation_id: &str,
    ) -> Result<(), RailError> {
        self.post_json::<_, serde_json::Value>(
            "/payments/subscribe",
            &ReceiveRequest {
                context,
                operation_id,
            },
        )
        .await?;
        Ok(())
    }

    async fn create_lnurl_withdraw_point(
        &self,
        max_msats: Msats,
        min_msats: Msats,
        memo: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<LnurlWithdrawPoint, RailError> {
        let point: LnurlWithdrawPoint = self
            .post_json(
                "/lnurl/withdraw",
                &LnurlWithdrawRequest {
                    max_msats: max_msats.value(),
                    min_msats: min_msats.value(),
                    memo,
                    expires_at,
                },
            )
            .await?;
        tracing::info!(k1 = %point.k1, max = %max_msats, "Minted LNURL-withdraw point");
        Ok(point)
    }
}
