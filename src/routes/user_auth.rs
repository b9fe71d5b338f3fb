use super::{parse_json, ApiClient};
use crate::errors::ApiError;
use crate::middleware::request_logger::RequestLogger;
use crate::models::all_models::{ApiResponse, LoginData, LoginRequest};
use async_trait::async_trait;
use log::{error, info};

/// Remote credential check.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<ApiResponse<LoginData>, ApiError>;
}

//Login
//Login Input: LoginRequest
//Login Output: ApiResponse<LoginData>
#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<ApiResponse<LoginData>, ApiError> {
        info!("Logging in as {}", request.email);

        let response = RequestLogger::send(self.post("Auth/login").json(request)).await?;
        let status = response.status();
        let body = response.text().await?;

        // Rejected credentials still come back as an envelope
        if !status.is_success() {
            return match serde_json::from_str::<ApiResponse<LoginData>>(&body) {
                Ok(envelope) => Ok(envelope),
                Err(_) => {
                    error!("Login failed with {}: {}", status, body);
                    Err(ApiError::Status { status, body })
                }
            };
        }

        parse_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SessionError;
    use crate::handlers::auth::TokenCodec;
    use crate::handlers::session::SessionManager;
    use crate::handlers::token_store::{MemoryTokenStore, TokenStore};
    use crate::routes::tests::{local_client, serve_once};
    use std::sync::Arc;

    fn credentials() -> LoginRequest {
        LoginRequest {
            email: "eve@acme.test".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn rejected_credentials_come_back_as_an_envelope() {
        let (base_url, server) = serve_once(
            "401 Unauthorized",
            "application/json",
            r#"{"isSuccess":false,"message":"Invalid email or password"}"#,
        )
        .await;

        let response = local_client(&base_url).login(&credentials()).await.unwrap();
        let request = server.await.unwrap();

        assert!(!response.is_success);
        assert_eq!(response.message.as_deref(), Some("Invalid email or password"));
        assert!(response.data.is_none());
        assert!(request.starts_with("POST /api/Auth/login "), "{request}");
        assert!(request.contains(r#""email":"eve@acme.test""#));
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn any_json_object_on_failure_reads_as_unsuccessful() {
        let (base_url, server) =
            serve_once("400 Bad Request", "application/json", r#"{"error":"x"}"#).await;

        let response = local_client(&base_url).login(&credentials()).await.unwrap();
        server.await.unwrap();

        assert!(!response.is_success);
        assert!(response.message.is_none());
    }

    #[tokio::test]
    async fn non_json_failures_are_status_errors() {
        let (base_url, server) = serve_once(
            "500 Internal Server Error",
            "text/html",
            "<html>oops</html>",
        )
        .await;

        let err = local_client(&base_url).login(&credentials()).await.unwrap_err();
        server.await.unwrap();

        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "<html>oops</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn session_reports_the_server_message_on_rejection() {
        let (base_url, server) = serve_once(
            "401 Unauthorized",
            "application/json",
            r#"{"isSuccess":false,"message":"Invalid email or password"}"#,
        )
        .await;
        let store = Arc::new(MemoryTokenStore::new());
        let session = SessionManager::new(
            store.clone(),
            Arc::new(local_client(&base_url)),
            TokenCodec::new(),
        );
        session.restore();

        let err = session.login("eve@acme.test", "hunter2").await.unwrap_err();
        server.await.unwrap();

        match err {
            SessionError::Authentication(message) => {
                assert_eq!(message, "Invalid email or password")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!session.is_authenticated());
        assert_eq!(store.load().unwrap(), None);
    }
}
