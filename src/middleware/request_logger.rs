use chrono::Utc;
use log::{error, info};
use reqwest::{RequestBuilder, Response};
use std::time::Instant;

// Outgoing request logger
pub struct RequestLogger;

impl RequestLogger {
    /// Sends the request, logging method, URL, status and elapsed time.
    /// Headers are never logged since they may carry the bearer token.
    pub async fn send(builder: RequestBuilder) -> Result<Response, reqwest::Error> {
        let (client, request) = builder.build_split();
        let request = request?;

        let method = request.method().clone();
        let url = request.url().clone();
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        info!(
            "[MEALTIMES-REQUEST] {} {} - Timestamp: {}",
            method, url, timestamp
        );

        let start_time = Instant::now();
        let res = client.execute(request).await;
        let elapsed = start_time.elapsed();

        match &res {
            Ok(response) => {
                info!(
                    "[MEALTIMES-RESPONSE] {} {} - Status: {} - Time: {:.2?}",
                    method,
                    url,
                    response.status().as_u16(),
                    elapsed
                );
            }
            Err(err) => {
                error!(
                    "[MEALTIMES-ERROR] {} {} - Error: {} - Time: {:.2?}",
                    method, url, err, elapsed
                );
            }
        }

        res
    }
}
