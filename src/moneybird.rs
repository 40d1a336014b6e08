use url::Url;

use crate::error::Error;
use crate::oauth::ensure_success;
use crate::types::{Administration, AdministrationId, Invoice};

/// Read-only client for the Moneybird v2 REST API.
///
/// Every call requires a currently-valid bearer token; token lifecycle is the
/// caller's concern (see [`crate::token`]).
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client against the given API base (e.g. `https://moneybird.com/api/v2`).
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// List administrations visible to the authenticated account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Provider`]
    /// carrying the upstream status on a non-success response.
    pub async fn list_administrations(
        &self,
        access_token: &str,
    ) -> Result<Vec<Administration>, Error> {
        let url = format!(
            "{}/administrations.json",
            self.base.as_str().trim_end_matches('/')
        );
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = ensure_success(response, "administrations request").await?;
        response.json().await.map_err(Into::into)
    }

    /// List open or late sales invoices of one administration.
    ///
    /// The `state:open|late` filter is applied server-side by Moneybird.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Provider`]
    /// carrying the upstream status on a non-success response.
    pub async fn list_open_invoices(
        &self,
        access_token: &str,
        administration_id: &AdministrationId,
    ) -> Result<Vec<Invoice>, Error> {
        let url = format!(
            "{}/{}/sales_invoices.json",
            self.base.as_str().trim_end_matches('/'),
            administration_id
        );
        let response = self
            .http
            .get(url)
            .query(&[("filter", "state:open|late")])
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = ensure_success(response, "invoices request").await?;
        response.json().await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InvoiceState;
    use httpmock::prelude::*;
    use tokio::runtime::Runtime;

    fn runtime() -> Runtime {
        Runtime::new().unwrap()
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(server.url("/api/v2").parse().unwrap())
    }

    #[test]
    fn list_administrations_sends_bearer_token() {
        let rt = runtime();
        rt.block_on(async {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v2/administrations.json")
                    .header("authorization", "Bearer tok-1");
                then.status(200).json_body(serde_json::json!([
                    { "id": "123", "name": "ACME BV", "language": "nl", "currency": "EUR" }
                ]));
            });

            let administrations = client_for(&server)
                .list_administrations("tok-1")
                .await
                .unwrap();
            mock.assert();
            assert_eq!(administrations.len(), 1);
            assert_eq!(administrations[0].name, "ACME BV");
            assert_eq!(administrations[0].id.to_string(), "123");
        });
    }

    #[test]
    fn list_open_invoices_filters_server_side() {
        let rt = runtime();
        rt.block_on(async {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v2/123/sales_invoices.json")
                    .query_param("filter", "state:open|late")
                    .header("authorization", "Bearer tok-1");
                then.status(200).json_body(serde_json::json!([{
                    "id": "inv-1",
                    "invoice_id": "MB-1001",
                    "contact": { "company_name": "Globex" },
                    "invoice_date": "2025-08-10",
                    "due_date": "2025-09-10",
                    "total_price_excl_tax": 4214.88,
                    "total_price_incl_tax": 5100.0,
                    "state": "late",
                    "currency": "EUR"
                }]));
            });

            let invoices = client_for(&server)
                .list_open_invoices("tok-1", &AdministrationId::from("123".to_string()))
                .await
                .unwrap();
            mock.assert();
            assert_eq!(invoices.len(), 1);
            assert_eq!(invoices[0].state, InvoiceState::Late);
        });
    }

    #[test]
    fn upstream_error_carries_status() {
        let rt = runtime();
        rt.block_on(async {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/api/v2/administrations.json");
                then.status(401).body("unauthorized");
            });

            let err = client_for(&server)
                .list_administrations("stale-token")
                .await
                .unwrap_err();
            match err {
                Error::Provider { status, .. } => assert_eq!(status, 401),
                other => panic!("expected Provider error, got {other:?}"),
            }
        });
    }
}
