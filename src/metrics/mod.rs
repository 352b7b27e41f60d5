//! Metrics sink
//!
//! Fire-and-forget operation outcome records. The orchestrator never
//! blocks on or reacts to the sink's result.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Which settlement rail (or read path) an operation used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMethod {
    Lightning,
    OnrampSwap,
    OfframpSwap,
    LnurlWithdraw,
    BalanceRead,
    Unspecified,
}

impl SettlementMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementMethod::Lightning => "lightning",
            SettlementMethod::OnrampSwap => "onramp_swap",
            SettlementMethod::OfframpSwap => "offramp_swap",
            SettlementMethod::LnurlWithdraw => "lnurl_withdraw",
            SettlementMethod::BalanceRead => "balance_read",
            SettlementMethod::Unspecified => "unspecified",
        }
    }
}

/// Outcome record emitted after every deposit/withdrawal attempt and
/// balance read.
#[derive(Debug, Clone, Serialize)]
pub struct OperationMetric {
    pub user_id: Uuid,
    pub amount_msats: Option<i64>,
    pub amount_fiat: Option<Decimal>,
    pub method: SettlementMethod,
    pub success: bool,
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// Receiver of operation outcome records.
pub trait MetricsSink: Send + Sync {
    fn record(&self, metric: OperationMetric);
}

/// Sink that emits each record as a structured tracing event.
#[derive(Debug, Clone, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record(&self, metric: OperationMetric) {
        tracing::info!(
            target: "satswallet::metrics",
            user_id = %metric.user_id,
            amount_msats = ?metric.amount_msats,
            amount_fiat = ?metric.amount_fiat,
            method = metric.method.as_str(),
            success = metric.success,
            duration_ms = metric.duration.as_millis() as u64,
            error_type = ?metric.error_type,
            "operation"
        );
    }
}
