use super::{parse_list, ApiClient};
use crate::errors::ApiError;
use crate::middleware::auth_middleware::{AuthMiddleware, Bearer};
use crate::models::all_models::Order;
use async_trait::async_trait;

#[async_trait]
pub trait OrdersApi: Send + Sync {
    /// Orders placed by the signed-in employee.
    async fn my_orders(&self, bearer: &Bearer) -> Result<Vec<Order>, ApiError>;

    /// Every order visible to the signed-in user (admin view).
    async fn all_orders(&self, bearer: &Bearer) -> Result<Vec<Order>, ApiError>;
}

#[async_trait]
impl OrdersApi for ApiClient {
    async fn my_orders(&self, bearer: &Bearer) -> Result<Vec<Order>, ApiError> {
        let body = self
            .send_for_text(self.get("Orders/my-orders").authorized(bearer))
            .await?;
        parse_list(&body)
    }

    async fn all_orders(&self, bearer: &Bearer) -> Result<Vec<Order>, ApiError> {
        let body = self.send_for_text(self.get("Orders").authorized(bearer)).await?;
        parse_list(&body)
    }
}
