//! Result view client
//!
//! Queries expose their current result set through the query container's
//! view service. The view streams as a JSON array: a header element
//! first, then one data element per result record.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ReactionError, ReactionResult};

/// One element of a query result view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ViewElement {
    /// Leads the view; carries the sequence the view reflects
    #[serde(rename_all = "camelCase")]
    Header {
        sequence: u64,
        timestamp: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
    /// One current result record
    Data(Map<String, Value>),
}

/// HTTP client for a query container's view service.
pub struct ResultViewClient {
    client: Client,
    base_url: String,
}

impl ResultViewClient {
    /// Creates a client against an explicit view service URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        ResultViewClient {
            client: Client::new(),
            base_url,
        }
    }

    /// Creates a client for the named query container, using the view
    /// service address convention `http://<id>-view-svc`.
    pub fn for_query_container(query_container_id: &str) -> Self {
        ResultViewClient::new(format!("http://{}-view-svc", query_container_id))
    }

    fn view_endpoint(&self, query_id: &str) -> String {
        format!("{}/{}", self.base_url, query_id)
    }

    /// Fetches the current result view of a query.
    pub async fn current_result(&self, query_id: &str) -> ReactionResult<Vec<ViewElement>> {
        let url = self.view_endpoint(query_id);
        debug!("Fetching current result view from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ReactionError::Http(format!(
                "View request for query {} failed with status {}: {}",
                query_id, status, detail
            )));
        }

        let elements = response.json::<Vec<ViewElement>>().await?;
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn view_elements_parse_header_and_data() {
        let elements: Vec<ViewElement> = serde_json::from_value(json!([
            {"header": {"sequence": 3, "timestamp": 1_698_000_000_000u64, "state": "running"}},
            {"data": {"roomId": "r1", "comfortLevel": 44}}
        ]))
        .unwrap();

        assert_eq!(elements.len(), 2);
        assert!(matches!(
            elements[0],
            ViewElement::Header { sequence: 3, .. }
        ));
        match &elements[1] {
            ViewElement::Data(row) => assert_eq!(row["comfortLevel"], json!(44)),
            other => panic!("expected a data element, got {:?}", other),
        }
    }

    #[test]
    fn trailing_slashes_are_trimmed_from_the_base_url() {
        let client = ResultViewClient::new("http://container-view-svc//");
        assert_eq!(
            client.view_endpoint("room-comfort"),
            "http://container-view-svc/room-comfort"
        );
    }

    #[test]
    fn query_container_clients_follow_the_address_convention() {
        let client = ResultViewClient::for_query_container("default");
        assert_eq!(client.view_endpoint("q1"), "http://default-view-svc/q1");
    }
}
