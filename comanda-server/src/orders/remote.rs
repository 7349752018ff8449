//! REST client for a remote order service
//!
//! | Method | Path | Use |
//! |--------|------|-----|
//! | GET | /orders/{id} | order with lines |
//! | GET | /orders?status=CREATED | open orders |
//! | GET | /order-items/{id} | single line |
//! | POST | /order-items/{id}/transition | line compare-and-set |
//! | POST | /orders/{id}/transition | order compare-and-set |
//!
//! A `409 Conflict` on a transition means the current status no longer
//! matched `from`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{Order, OrderLine, OrderLineStatus, OrderStatus};
use std::time::Duration;

use super::gateway::{GatewayError, GatewayResult, OrderGateway};

#[derive(Serialize)]
struct TransitionRequest<S> {
    from: S,
    to: S,
}

/// [`OrderGateway`] backed by HTTP calls to the order service
#[derive(Debug, Clone)]
pub struct HttpOrderGateway {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpOrderGateway {
    /// Create a client with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_send_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Request(err.to_string())
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        not_found: GatewayError,
    ) -> GatewayResult<T> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(not_found),
            status if status.is_success() => resp
                .json::<T>()
                .await
                .map_err(|e| GatewayError::Response(e.to_string())),
            status => Err(error_from_response(status, resp).await),
        }
    }

    async fn post_transition<S: Serialize>(
        &self,
        path: &str,
        body: TransitionRequest<S>,
        not_found: GatewayError,
    ) -> GatewayResult<bool> {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        match resp.status() {
            StatusCode::CONFLICT => Ok(false),
            StatusCode::NOT_FOUND => Err(not_found),
            status if status.is_success() => Ok(true),
            status => Err(error_from_response(status, resp).await),
        }
    }
}

/// Build an error from a non-success response, preferring the JSON `message`
async fn error_from_response(status: StatusCode, resp: reqwest::Response) -> GatewayError {
    let text = resp.text().await.unwrap_or_default();

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text)
        && let Some(msg) = json.get("message").and_then(|v| v.as_str())
    {
        return GatewayError::Response(format!("{}: {}", status, msg));
    }

    if text.is_empty() {
        GatewayError::Response(format!("HTTP Error: {}", status))
    } else {
        GatewayError::Response(format!("{}: {}", status, text))
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    async fn get_order(&self, order_id: i64) -> GatewayResult<Order> {
        self.get_json(
            &format!("/orders/{}", order_id),
            GatewayError::OrderNotFound(order_id),
        )
        .await
    }

    async fn get_line(&self, line_id: i64) -> GatewayResult<OrderLine> {
        self.get_json(
            &format!("/order-items/{}", line_id),
            GatewayError::LineNotFound(line_id),
        )
        .await
    }

    async fn list_open_orders(&self) -> GatewayResult<Vec<Order>> {
        self.get_json(
            "/orders?status=CREATED",
            GatewayError::Response("open orders endpoint not found".into()),
        )
        .await
    }

    async fn transition_line(
        &self,
        line_id: i64,
        from: OrderLineStatus,
        to: OrderLineStatus,
    ) -> GatewayResult<bool> {
        self.post_transition(
            &format!("/order-items/{}/transition", line_id),
            TransitionRequest { from, to },
            GatewayError::LineNotFound(line_id),
        )
        .await
    }

    async fn transition_order(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> GatewayResult<bool> {
        self.post_transition(
            &format!("/orders/{}/transition", order_id),
            TransitionRequest { from, to },
            GatewayError::OrderNotFound(order_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Path,
        http::StatusCode as AxumStatus,
        routing::{get, post},
    };
    use serde_json::{Value, json};

    fn order_json(id: i64) -> Value {
        json!({
            "id": id,
            "status": "CREATED",
            "zone": "Terraza",
            "table": "4",
            "created_at": 0,
            "lines": [{
                "id": 100,
                "order_id": id,
                "name": "Tortilla",
                "quantity": 2,
                "status": "CREATED",
                "created_at": 0
            }]
        })
    }

    async fn spawn_order_service() -> String {
        let app = Router::new()
            .route(
                "/orders/{id}",
                get(|Path(id): Path<i64>| async move {
                    if id == 1 {
                        Ok(Json(order_json(1)))
                    } else {
                        Err(AxumStatus::NOT_FOUND)
                    }
                }),
            )
            .route("/orders", get(|| async { Json(json!([order_json(1)])) }))
            .route(
                "/order-items/{id}/transition",
                post(|Path(id): Path<i64>, Json(body): Json<Value>| async move {
                    assert_eq!(body["from"], "CREATED");
                    assert_eq!(body["to"], "PREPARING");
                    if id == 100 {
                        AxumStatus::NO_CONTENT
                    } else {
                        AxumStatus::CONFLICT
                    }
                }),
            )
            .route(
                "/orders/{id}/transition",
                post(|| async {
                    (
                        AxumStatus::INTERNAL_SERVER_ERROR,
                        Json(json!({"message": "database locked"})),
                    )
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_reads_orders() {
        let base = spawn_order_service().await;
        let gateway = HttpOrderGateway::new(base, Duration::from_secs(2)).unwrap();

        let order = gateway.get_order(1).await.unwrap();
        assert_eq!(order.table.as_deref(), Some("4"));
        assert_eq!(order.lines[0].quantity, 2);

        assert!(matches!(
            gateway.get_order(2).await,
            Err(GatewayError::OrderNotFound(2))
        ));
        assert_eq!(gateway.list_open_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transitions() {
        let base = spawn_order_service().await;
        let gateway = HttpOrderGateway::new(base, Duration::from_secs(2)).unwrap();

        assert!(
            gateway
                .transition_line(100, OrderLineStatus::Created, OrderLineStatus::Preparing)
                .await
                .unwrap()
        );
        assert!(
            !gateway
                .transition_line(101, OrderLineStatus::Created, OrderLineStatus::Preparing)
                .await
                .unwrap()
        );

        let err = gateway
            .transition_order(1, OrderStatus::Created, OrderStatus::Preparing)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("database locked"));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway =
            HttpOrderGateway::new(format!("http://{}", addr), Duration::from_millis(500)).unwrap();
        assert!(matches!(
            gateway.get_order(1).await,
            Err(GatewayError::Request(_) | GatewayError::Timeout(_))
        ));
    }
}
