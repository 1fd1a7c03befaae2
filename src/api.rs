//! Backend REST client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    orders::{OrderConfirmation, OrderGateway, OrderRequest},
    restaurants::{Restaurant, RestaurantDirectory},
};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The configured base URL cannot have paths appended to it.
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),

    /// The backend returned a non-2xx response.
    #[error("unexpected response from backend ({status}): {body}")]
    UnexpectedResponse {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },
}

/// Connection settings for the backend API.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL, e.g. `"http://localhost:8080/api"`.
    pub base_url: String,

    /// Bearer token for authenticated calls.
    pub token: Option<String>,
}

/// HTTP client for the restaurant and order endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiClientConfig,
    http: Client,
}

impl ApiClient {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: ApiClientConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    /// Append `segments` to the configured base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let base = &self.config.base_url;

        let mut url =
            Url::parse(base).map_err(|err| ApiError::InvalidUrl(format!("{base}: {err}")))?;

        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(base.clone()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    Err(ApiError::UnexpectedResponse { status, body })
}

#[async_trait]
impl RestaurantDirectory for ApiClient {
    #[instrument(skip(self))]
    async fn restaurant_by_slug(&self, slug: &str) -> Result<Restaurant, ApiError> {
        let url = self.endpoint(&["restaurants", "slug", slug])?;

        let response = self.authorize(self.http.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!("restaurant '{slug}'")));
        }

        let restaurant: Restaurant = ensure_success(response).await?.json().await?;

        debug!(id = restaurant.id, "fetched restaurant");

        Ok(restaurant)
    }
}

#[async_trait]
impl OrderGateway for ApiClient {
    #[instrument(skip_all, fields(idempotency_key = %order.idempotency_key))]
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, ApiError> {
        let url = self.endpoint(&["orders"])?;

        let response = self
            .authorize(self.http.post(url))
            .header("Idempotency-Key", order.idempotency_key.to_string())
            .json(order)
            .send()
            .await?;

        let confirmation: OrderConfirmation = ensure_success(response).await?.json().await?;

        debug!(order_id = confirmation.id, "order created");

        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };
    use uuid::Uuid;

    use crate::orders::{OrderDetails, PaymentMethod};

    use super::*;

    /// Answer a single request with `response` and hand back the raw request text.
    async fn serve_once(
        response: String,
    ) -> std::io::Result<(String, JoinHandle<std::io::Result<String>>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}/api", listener.local_addr()?);

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await?;
            let mut request = Vec::new();
            let mut buffer = [0_u8; 1024];

            loop {
                let read = stream.read(&mut buffer).await?;
                if read == 0 {
                    break;
                }

                request.extend_from_slice(buffer.get(..read).unwrap_or_default());

                if request_complete(&request) {
                    break;
                }
            }

            stream.write_all(response.as_bytes()).await?;
            stream.shutdown().await?;

            Ok(String::from_utf8_lossy(&request).into_owned())
        });

        Ok((base_url, handle))
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);

        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };

        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);

        body.len() >= length
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn order_request() -> OrderRequest {
        OrderRequest {
            details: OrderDetails {
                restaurant_id: 7,
                customer_name: "Ada".to_string(),
                customer_phone: "0700".to_string(),
                customer_email: "ada@example.com".to_string(),
                delivery_address: "1 Engine Row".to_string(),
                delivery_instructions: None,
                payment_method: PaymentMethod::Cash,
                customer_latitude: None,
                customer_longitude: None,
                items: Vec::new(),
                subtotal: Decimal::new(10_00, 2),
                platform_fee: Decimal::new(1_50, 2),
                delivery_fee: Decimal::new(2_50, 2),
                total_amount: Decimal::new(14_00, 2),
            },
            payment_intent_id: None,
            idempotency_key: Uuid::new_v4(),
        }
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(ApiClientConfig {
            base_url: base_url.to_string(),
            token: None,
        })
    }

    #[test]
    fn endpoint_joins_without_double_slashes() -> TestResult {
        assert_eq!(
            client("http://localhost:8080/api/").endpoint(&["orders"])?.as_str(),
            "http://localhost:8080/api/orders"
        );
        assert_eq!(
            client("http://localhost:8080/api")
                .endpoint(&["restaurants", "slug", "pizza"])?
                .as_str(),
            "http://localhost:8080/api/restaurants/slug/pizza"
        );
        assert_eq!(
            client("http://localhost:8080").endpoint(&["orders"])?.as_str(),
            "http://localhost:8080/orders"
        );

        Ok(())
    }

    #[test]
    fn endpoint_encodes_slugs() -> TestResult {
        let url = client("http://localhost:8080/api")
            .endpoint(&["restaurants", "slug", "pie and mash/../admin"])?;

        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/restaurants/slug/pie%20and%20mash%2F..%2Fadmin"
        );

        Ok(())
    }

    #[test]
    fn endpoint_rejects_unusable_base() {
        let result = client("not a url").endpoint(&["orders"]);

        assert!(
            matches!(result, Err(ApiError::InvalidUrl(_))),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_http_error() {
        // Port 9 (discard) is not expected to be listening.
        let result = client("http://127.0.0.1:9").restaurant_by_slug("pizza").await;

        assert!(
            matches!(result, Err(ApiError::Http(_))),
            "expected transport error, got {result:?}"
        );
    }

    #[tokio::test]
    async fn fetches_restaurant_by_slug() -> TestResult {
        let body = r#"{"id":7,"name":"Slice","slug":"slice","latitude":51.5,"longitude":-0.12}"#;
        let (base_url, server) = serve_once(http_response("200 OK", body)).await?;

        let restaurant = client(&base_url).restaurant_by_slug("slice").await?;
        let request = server.await??;

        assert_eq!(restaurant.id, 7);
        assert_eq!(restaurant.latitude, Some(51.5));
        assert!(
            request.starts_with("GET /api/restaurants/slug/slice "),
            "got {request}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn missing_restaurant_is_not_found() -> TestResult {
        let (base_url, server) = serve_once(http_response("404 Not Found", "")).await?;

        let result = client(&base_url).restaurant_by_slug("closed").await;
        server.await??;

        assert!(
            matches!(result, Err(ApiError::NotFound(_))),
            "expected not found, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn rejected_order_keeps_status_and_body() -> TestResult {
        let response = http_response("422 Unprocessable Entity", r#"{"error":"closed"}"#);
        let (base_url, server) = serve_once(response).await?;

        let result = client(&base_url).submit_order(&order_request()).await;
        server.await??;

        let Err(ApiError::UnexpectedResponse { status, body }) = &result else {
            return Err(format!("expected unexpected response, got {result:?}").into());
        };

        assert_eq!(*status, 422);
        assert!(body.contains("closed"), "got {body}");

        Ok(())
    }

    #[tokio::test]
    async fn order_carries_token_and_idempotency_key() -> TestResult {
        let response = http_response("201 Created", r#"{"id":42,"status":"PENDING"}"#);
        let (base_url, server) = serve_once(response).await?;

        let order = order_request();
        let api = ApiClient::new(ApiClientConfig {
            base_url,
            token: Some("secret".to_string()),
        });

        let confirmation = api.submit_order(&order).await?;
        let request = server.await??.to_ascii_lowercase();

        assert_eq!(confirmation.id, 42);
        assert_eq!(confirmation.status.as_deref(), Some("PENDING"));
        assert!(request.starts_with("post /api/orders "), "got {request}");
        assert!(request.contains("authorization: bearer secret"), "got {request}");
        assert!(
            request.contains(&format!("idempotency-key: {}", order.idempotency_key)),
            "got {request}"
        );
        assert!(request.contains("\"paymentmethod\":\"cash\""), "got {request}");

        Ok(())
    }
}
