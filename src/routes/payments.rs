use super::{parse_list, ApiClient};
use crate::errors::ApiError;
use crate::middleware::auth_middleware::{AuthMiddleware, Bearer};
use crate::models::all_models::{Payment, SubscribeRequest};
use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;

#[async_trait]
pub trait PaymentsApi: Send + Sync {
    /// Buys a plan for a company with a tokenized card.
    async fn subscribe_to_plan(
        &self,
        bearer: &Bearer,
        request: &SubscribeRequest,
    ) -> Result<(), ApiError>;

    async fn payments(&self, bearer: &Bearer) -> Result<Vec<Payment>, ApiError>;
}

#[async_trait]
impl PaymentsApi for ApiClient {
    //Subscribe To Plan
    //Subscribe To Plan Input: SubscribeRequest
    async fn subscribe_to_plan(
        &self,
        bearer: &Bearer,
        request: &SubscribeRequest,
    ) -> Result<(), ApiError> {
        info!(
            "Subscribing company {} to plan {}",
            request.company_id, request.subscription_plan_id
        );
        let body = self
            .send_for_text(self.post("Payments/subscribe").authorized(bearer).json(request))
            .await?;
        check_envelope(&body)
    }

    //Get Payments
    //Get Payments Output: Vec<Payment>
    async fn payments(&self, bearer: &Bearer) -> Result<Vec<Payment>, ApiError> {
        let body = self.send_for_text(self.get("Payments").authorized(bearer)).await?;
        parse_list(&body)
    }
}

/// A 2xx body may still carry `isSuccess: false`.
fn check_envelope(body: &str) -> Result<(), ApiError> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Ok(());
    };
    if value.get("isSuccess") == Some(&Value::Bool(false)) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request was not accepted")
            .to_string();
        warn!("Subscription rejected: {}", message);
        return Err(ApiError::Rejected(message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelopes_reporting_failure_are_rejections() {
        assert!(check_envelope("").is_ok());
        assert!(check_envelope(r#"{"subscriptionID": 4}"#).is_ok());
        assert!(check_envelope(r#"{"isSuccess": true}"#).is_ok());
        assert!(matches!(
            check_envelope(r#"{"isSuccess": false, "message": "Card declined"}"#),
            Err(ApiError::Rejected(m)) if m == "Card declined"
        ));
    }
}
