use super::{parse_list, ApiClient};
use crate::errors::ApiError;
use crate::middleware::auth_middleware::{AuthMiddleware, Bearer};
use crate::models::all_models::SubscriptionPlan;
use async_trait::async_trait;
use log::info;

#[async_trait]
pub trait PlansApi: Send + Sync {
    async fn subscription_plans(&self, bearer: &Bearer) -> Result<Vec<SubscriptionPlan>, ApiError>;
}

//Get Subscription Plans
//Get Subscription Plans Output: Vec<SubscriptionPlan>
#[async_trait]
impl PlansApi for ApiClient {
    async fn subscription_plans(&self, bearer: &Bearer) -> Result<Vec<SubscriptionPlan>, ApiError> {
        let body = self
            .send_for_text(self.get("SubscriptionPlans").authorized(bearer))
            .await?;
        let plans: Vec<SubscriptionPlan> = parse_list(&body)?;
        info!("Fetched {} subscription plans", plans.len());
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::{local_client, serve_once};

    #[tokio::test]
    async fn plans_are_fetched_with_the_bearer_token() {
        let body = r#"{"isSuccess":true,"data":[{"subscriptionPlanID":3,"planName":"Growth",
            "price":899.0,"durationInDays":30,"maxEmployees":50,"mealLimitPerDay":2,
            "isCustomizable":true}]}"#;
        let (base_url, server) = serve_once("200 OK", "application/json", body).await;

        let plans = local_client(&base_url)
            .subscription_plans(&Bearer::new("aaa.bbb.ccc"))
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].plan_name, "Growth");
        assert!(request.starts_with("GET /api/SubscriptionPlans "), "{request}");
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer aaa.bbb.ccc"));
    }
}
