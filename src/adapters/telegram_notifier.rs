//! Telegram Bot API notifier.
//!
//! Without a token and chat id, or when built without the `telegram`
//! feature, messages go to the log instead. Delivery failures are logged
//! and never fail the caller.

use crate::domain::error::SolidQuantError;
use crate::ports::notifier_port::NotifierPort;

pub const MESSAGE_PREFIX: &str = "[SolidQuant]";
pub const ALERT_PREFIX: &str = "[WARNING]";

#[cfg(feature = "telegram")]
const SEND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[cfg(feature = "telegram")]
#[derive(serde::Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramNotifier {
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str) -> Self {
        TelegramNotifier {
            token: token.trim().to_string(),
            chat_id: chat_id.trim().to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.chat_id.is_empty()
    }

    pub fn format_message(text: &str) -> String {
        format!("{MESSAGE_PREFIX}\n{text}")
    }

    pub fn format_alert(text: &str) -> String {
        format!("{ALERT_PREFIX}\n{text}")
    }

    fn deliver(&self, text: &str, alert: bool) {
        if !self.is_configured() {
            if alert {
                tracing::warn!(target: "notifier", "{text}");
            } else {
                tracing::info!(target: "notifier", "{text}");
            }
            return;
        }
        if let Err(err) = self.post(text) {
            tracing::error!(error = %err, "telegram delivery failed");
        }
    }

    #[cfg(feature = "telegram")]
    fn post(&self, text: &str) -> Result<(), String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build http client: {e}"))?;
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let resp = client
            .post(&url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .map_err(|e| format!("request failed: {}", e.without_url()))?;
        if !resp.status().is_success() {
            return Err(format!("telegram http error: status {}", resp.status().as_u16()));
        }
        Ok(())
    }

    #[cfg(not(feature = "telegram"))]
    fn post(&self, text: &str) -> Result<(), String> {
        tracing::info!(target: "notifier", "{text}");
        Ok(())
    }
}

impl NotifierPort for TelegramNotifier {
    fn send_message(&self, text: &str) -> Result<(), SolidQuantError> {
        self.deliver(&Self::format_message(text), false);
        Ok(())
    }

    fn send_alert(&self, text: &str) -> Result<(), SolidQuantError> {
        self.deliver(&Self::format_alert(text), true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes() {
        assert_eq!(
            TelegramNotifier::format_message("Hold (Bull)"),
            "[SolidQuant]\nHold (Bull)"
        );
        assert_eq!(
            TelegramNotifier::format_alert("Circuit breaker"),
            "[WARNING]\nCircuit breaker"
        );
    }

    #[test]
    fn blank_credentials_are_unconfigured() {
        assert!(!TelegramNotifier::new("", "").is_configured());
        assert!(!TelegramNotifier::new("token", "  ").is_configured());
        assert!(TelegramNotifier::new("token", "123").is_configured());
    }

    #[test]
    fn unconfigured_notifier_never_fails() {
        let notifier = TelegramNotifier::new("", "");
        assert!(notifier.send_message("hello").is_ok());
        assert!(notifier.send_alert("danger").is_ok());
    }
}
