use crate::errors::PaymentError;
use crate::middleware::request_logger::RequestLogger;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{Datelike, Utc};
use log::{error, info};
use reqwest::{header, Client};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const STRIPE_API_BASE: &str = "https://api.stripe.com";

// Stripe API response structures
#[derive(Debug, Deserialize)]
struct TokenResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

/// Card details handed to the tokenizer. Never logged.
#[derive(Clone)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: u32,
    pub exp_year: i32,
    pub cvc: String,
}

impl CardDetails {
    /// Stripe's documented test card, for demo mode. No charge is made.
    pub fn test_card() -> Self {
        CardDetails {
            number: "4242424242424242".to_string(),
            exp_month: 12,
            exp_year: Utc::now().year() + 1,
            cvc: "123".to_string(),
        }
    }

    fn last4(&self) -> &str {
        let start = self.number.len().saturating_sub(4);
        self.number.get(start..).unwrap_or("")
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("last4", &self.last4())
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .finish_non_exhaustive()
    }
}

/// Turns card details into an opaque single-use payment token.
#[async_trait]
pub trait PaymentTokenizer: Send + Sync {
    async fn create_card_token(&self, card: &CardDetails) -> Result<String, PaymentError>;
}

// Stripe tokenizer authenticated with the publishable key
#[derive(Clone)]
pub struct StripeTokenizer {
    client: Client,
    publishable_key: String,
    api_base: String,
}

impl StripeTokenizer {
    pub fn new(publishable_key: String, timeout: Duration) -> Result<Self, PaymentError> {
        if publishable_key.trim().is_empty() {
            return Err(PaymentError::NotConfigured);
        }
        let client = Client::builder().timeout(timeout).build()?;

        Ok(StripeTokenizer {
            client,
            publishable_key,
            api_base: STRIPE_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn authorization(&self) -> String {
        // Stripe takes the key as the basic-auth username with an empty password
        format!("Basic {}", STANDARD.encode(format!("{}:", self.publishable_key)))
    }
}

#[async_trait]
impl PaymentTokenizer for StripeTokenizer {
    async fn create_card_token(&self, card: &CardDetails) -> Result<String, PaymentError> {
        info!("Requesting Stripe card token for card ending {}", card.last4());

        let exp_month = card.exp_month.to_string();
        let exp_year = card.exp_year.to_string();
        let form = [
            ("card[number]", card.number.as_str()),
            ("card[exp_month]", exp_month.as_str()),
            ("card[exp_year]", exp_year.as_str()),
            ("card[cvc]", card.cvc.as_str()),
        ];

        let request = self
            .client
            .post(format!("{}/v1/tokens", self.api_base))
            .header(header::AUTHORIZATION, self.authorization())
            .form(&form);
        let response = RequestLogger::send(request).await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = parse_error_message(&response_text)
                .unwrap_or_else(|| format!("Stripe responded with {}", status));
            error!("Stripe tokenization failed: {}", message);
            return Err(PaymentError::Declined(message));
        }

        let token: TokenResponse = match serde_json::from_str(&response_text) {
            Ok(token) => token,
            Err(e) => {
                error!("Failed to parse Stripe token response: {}", e);
                return Err(PaymentError::MissingToken);
            }
        };

        token
            .id
            .filter(|id| !id.is_empty())
            .ok_or(PaymentError::MissingToken)
    }
}

fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<StripeErrorResponse>(body)
        .ok()
        .and_then(|e| e.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_not_configured() {
        assert!(matches!(
            StripeTokenizer::new("  ".to_string(), Duration::from_secs(1)),
            Err(PaymentError::NotConfigured)
        ));
    }

    #[test]
    fn publishable_key_is_sent_as_basic_auth_user() {
        let tokenizer = StripeTokenizer::new("pk_test_123".to_string(), Duration::from_secs(1))
            .unwrap()
            .with_api_base("http://localhost:12111/");
        assert_eq!(tokenizer.authorization(), "Basic cGtfdGVzdF8xMjM6");
        assert_eq!(tokenizer.api_base, "http://localhost:12111");
    }

    #[test]
    fn card_debug_output_masks_the_number() {
        let rendered = format!("{:?}", CardDetails::test_card());
        assert!(rendered.contains("4242"));
        assert!(!rendered.contains("4242424242424242"));
        assert!(!rendered.contains("123\""));
    }

    #[test]
    fn stripe_error_messages_are_extracted() {
        let body = r#"{"error":{"type":"card_error","message":"Your card was declined."}}"#;
        assert_eq!(parse_error_message(body).as_deref(), Some("Your card was declined."));
        assert_eq!(parse_error_message("oops"), None);
    }
}
