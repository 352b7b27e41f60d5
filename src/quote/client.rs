//! HTTP client for the swap service

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    OfframpSwap, OfframpSwapRequest, OnrampSwap, OnrampSwapRequest, Quote, QuoteError,
    QuoteProvider,
};

/// JSON client for the swap service API.
#[derive(Debug, Clone)]
pub struct HttpQuoteClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct QuoteRequest<'a> {
    from: &'a str,
    to: &'a str,
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpQuoteClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, QuoteError>
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
            .map_err(|e| QuoteError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let reason = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(QuoteError::Rejected(reason));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| QuoteError::Transport(e.to_string()))
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteClient {
    async fn get_quote(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<Quote, QuoteError> {
        let quote: Quote = self
            .post_json("/quotes", &QuoteRequest { from, to, amount })
            .await?;
        tracing::debug!(quote_id = %quote.id, rate = %quote.rate, from, to, "Fetched exchange quote");
        Ok(quote)
    }

    async fn create_onramp_swap(
        &self,
        request: OnrampSwapRequest,
    ) -> Result<OnrampSwap, QuoteError> {
        let swap: OnrampSwap = self.post_json("/swaps/onramp", &request).await?;
        tracing::info!(swap_id = %swap.id, status = ?swap.status, "Created onramp swap");
        Ok(swap)
    }

    async fn create_offramp_swap(
        &self,
        request: OfframpSwapRequest,
    ) -> Result<OfframpSwap, QuoteError> {
        let swap: OfframpSwap = self.post_json("/swaps/offramp", &request).await?;
        tracing::info!(swap_id = %swap.id, status = ?swap.status, "Created offramp swap");
        Ok(swap)
    }
}
