// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post-commit SMS notifications.
//!
//! Notices are built from committed ledger state and sent after the unit of
//! work that produced them has committed. A failed send never reverses the
//! transfer; it is logged and reported to the caller as a
//! [`NotificationWarning`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::ledger::money::Amount;
use crate::providers::SmsProvider;

pub const NOTIFICATION_FAILURE: &str = "notification_failure";

/// One SMS to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub phone_number: String,
    pub message: String,
}

impl Notice {
    /// Credit alert for the receiving party.
    pub fn credit(phone_number: &str, amount: Amount, from: &str, new_balance: Amount) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            message: format!(
                "Your Olra account has been credited with {amount} by {from}. Your new account balance is {new_balance}"
            ),
        }
    }

    /// Debit alert for the paying party.
    pub fn debit(phone_number: &str, amount: Amount, new_balance: Amount) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            message: format!(
                "Your Olra account has been debited with {amount}. Your new account balance is {new_balance}"
            ),
        }
    }

    /// Debit alert for a member paying into a group wallet.
    pub fn group_debit(phone_number: &str, amount: Amount, group_tag: &str, new_balance: Amount) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            message: format!(
                "Your Olra account has been debited with {amount} for group {group_tag}. Your new account balance is {new_balance}"
            ),
        }
    }

    /// Credit alert for a member receiving a payout from a group wallet.
    pub fn group_payout(phone_number: &str, amount: Amount, group_tag: &str, new_balance: Amount) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            message: format!(
                "Your Olra account has been credited with {amount} from group {group_tag}. Your new account balance is {new_balance}"
            ),
        }
    }

    /// Funds request alert for the requestee.
    pub fn funds_request(
        phone_number: &str,
        first_name: &str,
        last_name: &str,
        requester_tag: &str,
        amount: Amount,
    ) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            message: format!(
                "Hello {first_name} {last_name}, you have received a request from {requester_tag} to send the amount of {amount} to them. Kindly log into your Olra account to do so."
            ),
        }
    }
}

/// Non-fatal warning attached to a committed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NotificationWarning {
    /// Always `notification_failure`.
    pub kind: String,
    pub message: String,
    /// Number of notices that could not be delivered.
    pub failed: usize,
}

/// Sends notices through the configured SMS provider.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sms: Arc<dyn SmsProvider>,
}

impl NotificationDispatcher {
    pub fn new(sms: Arc<dyn SmsProvider>) -> Self {
        Self { sms }
    }

    /// Deliver every notice. Returns a warning if any delivery failed.
    pub async fn dispatch(&self, notices: Vec<Notice>) -> Option<NotificationWarning> {
        let total = notices.len();
        let mut failed = 0;

        for notice in notices {
            match self.sms.send_sms(&notice.phone_number, &notice.message).await {
                Ok(status) if status.accepted => {
                    debug!(reference = ?status.reference, "Notification delivered");
                }
                Ok(_) => {
                    warn!("Notification rejected by SMS provider");
                    failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Notification delivery failed");
                    failed += 1;
                }
            }
        }

        (failed > 0).then(|| NotificationWarning {
            kind: NOTIFICATION_FAILURE.to_string(),
            message: format!("{failed} of {total} notifications could not be delivered"),
            failed,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::providers::{DeliveryStatus, ProviderError, SmsProvider};

    /// Records every SMS it is asked to send.
    #[derive(Default)]
    pub struct RecordingSms {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSms {
        pub fn messages(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SmsProvider for RecordingSms {
        async fn send_otp(&self, _phone_number: &str) -> Result<String, ProviderError> {
            Ok("pin-1".to_string())
        }

        async fn verify_otp(&self, _pin_id: &str, pin: &str) -> Result<bool, ProviderError> {
            Ok(pin == "123456")
        }

        async fn send_sms(&self, phone_number: &str, message: &str) -> Result<DeliveryStatus, ProviderError> {
            self.sent
                .lock()
                .unwrap()
                .push((phone_number.to_string(), message.to_string()));
            Ok(DeliveryStatus {
                accepted: true,
                reference: None,
            })
        }
    }

    /// Fails every call.
    pub struct FailingSms;

    #[async_trait]
    impl SmsProvider for FailingSms {
        async fn send_otp(&self, _phone_number: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Request {
                provider: "test",
                message: "unavailable".into(),
            })
        }

        async fn verify_otp(&self, _pin_id: &str, _pin: &str) -> Result<bool, ProviderError> {
            Err(ProviderError::Request {
                provider: "test",
                message: "unavailable".into(),
            })
        }

        async fn send_sms(&self, _phone_number: &str, _message: &str) -> Result<DeliveryStatus, ProviderError> {
            Err(ProviderError::Request {
                provider: "test",
                message: "unavailable".into(),
            })
        }
    }
}
