//! Event channel
//!
//! Asynchronous, at-least-once channel carrying rail confirmation events
//! back into the engine. Webhook routes push onto the sender; the
//! reconciler consumes the receiver. Handlers must tolerate redelivery.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::quote::SwapStatus;
use crate::rail::PaymentContext;

/// Named rail confirmation events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WalletEvent {
    /// An inbound payment on a registered operation id settled.
    PaymentReceived {
        context: PaymentContext,
        operation_id: String,
    },

    /// An inbound payment on a registered operation id failed.
    PaymentFailed {
        context: PaymentContext,
        operation_id: String,
    },

    /// A swap moved to a new status.
    SwapStatusChanged {
        context: PaymentContext,
        swap_tracker: String,
        status: SwapStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl WalletEvent {
    /// Topic name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            WalletEvent::PaymentReceived { .. } => "payment-received",
            WalletEvent::PaymentFailed { .. } => "payment-failed",
            WalletEvent::SwapStatusChanged { .. } => "swap-status-changed",
        }
    }
}

pub type EventSender = mpsc::Sender<WalletEvent>;
pub type EventReceiver = mpsc::Receiver<WalletEvent>;

/// Create a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_round_trip() {
        let event = WalletEvent::SwapStatusChanged {
            context: PaymentContext::Deposit,
            swap_tracker: "swap-42".to_string(),
            status: SwapStatus::Complete,
            error: None,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("swap-status-changed"));

        let decoded: WalletEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.name(), "swap-status-changed");
    }

    #[test]
    fn test_event_names() {
        let event = WalletEvent::PaymentReceived {
            context: PaymentContext::Deposit,
            operation_id: "op-1".to_string(),
        };
        assert_eq!(event.name(), "payment-received");

        let event = WalletEvent::PaymentFailed {
            context: PaymentContext::Withdraw,
            operation_id: "op-2".to_string(),
        };
        assert_eq!(event.name(), "payment-failed");
    }
}
