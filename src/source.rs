//! Data source abstraction used by data layer refreshes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;

/// A single data record, normally a JSON object.
pub type Record = Value;

/// Response returned by a data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    /// Records, in display order.
    #[serde(default)]
    pub body: Vec<Record>,
}

/// Pending result of a [`DataSource::get_data`] call.
pub type DataFuture = Pin<Box<dyn Future<Output = Result<DataResponse>>>>;

/// Fetches records for the plot's current state.
///
/// Called exactly once per refresh, synchronously, with the plot's shared
/// state and the layer's declared field list. The returned future must not
/// borrow from either argument.
pub trait DataSource {
    /// Request records for `state`, restricted to `fields`.
    fn get_data(&self, state: &Value, fields: &[String]) -> DataFuture;
}

/// Arguments of one recorded [`StaticSource`] request.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    /// State passed to the source.
    pub state: Value,
    /// Field list passed to the source.
    pub fields: Vec<String>,
}

/// In-memory source that answers every request with the same outcome.
#[derive(Debug)]
pub struct StaticSource {
    outcome: std::result::Result<Vec<Record>, String>,
    requests: RefCell<Vec<DataRequest>>,
}

impl StaticSource {
    /// Source that always returns `body`.
    #[must_use]
    pub fn new(body: Vec<Record>) -> Self {
        Self {
            outcome: Ok(body),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Source whose every request fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<DataRequest> {
        self.requests.borrow().clone()
    }
}

impl DataSource for StaticSource {
    fn get_data(&self, state: &Value, fields: &[String]) -> DataFuture {
        self.requests.borrow_mut().push(DataRequest {
            state: state.clone(),
            fields: fields.to_vec(),
        });
        let outcome = self
            .outcome
            .clone()
            .map(|body| DataResponse { body })
            .map_err(Error::DataSource);
        Box::pin(std::future::ready(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_source_records_requests() {
        let source = StaticSource::new(vec![json!({"v": 1})]);
        let response = source
            .get_data(&json!({"chr": 10}), &["v".to_string()])
            .await
            .unwrap();
        assert_eq!(response.body, vec![json!({"v": 1})]);
        let requests = source.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].state, json!({"chr": 10}));
        assert_eq!(requests[0].fields, vec!["v".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_source() {
        let source = StaticSource::failing("offline");
        let err = source.get_data(&json!({}), &[]).await.unwrap_err();
        assert!(matches!(err, Error::DataSource(ref m) if m == "offline"));
    }

    #[test]
    fn test_response_deserializes_body() {
        let response: DataResponse =
            serde_json::from_value(json!({"body": [{"id": 1}], "header": {}})).unwrap();
        assert_eq!(response.body.len(), 1);
        let empty: DataResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.body.is_empty());
    }
}
