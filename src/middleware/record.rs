//! The structured record emitted for each side of an exchange.

use serde::{Deserialize, Serialize};

/// One side of an audited exchange.
///
/// A request record carries `url`, `userId` and `request`. A response record
/// carries `url`, `userId`, `statusCode` and `response`. Fields that are
/// `None` are left out of the serialized form entirely:
///
/// ```rust
/// use wiretap::middleware::LogRecord;
///
/// let record = LogRecord::response("http example.com/api/test ", None, 200, "ok");
/// assert_eq!(
///     serde_json::to_string(&record).unwrap(),
///     r#"{"url":"http example.com/api/test ","response":"ok","statusCode":200}"#,
/// );
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl LogRecord {
    /// A request record. An empty body is omitted rather than logged as `""`.
    pub fn request(url: impl Into<String>, user_id: Option<i32>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            url: url.into(),
            user_id,
            request: (!body.is_empty()).then_some(body),
            response: None,
            status_code: None,
        }
    }

    /// A response record. The body is always present, even when empty.
    pub fn response(
        url: impl Into<String>,
        user_id: Option<i32>,
        status_code: u16,
        body: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            user_id,
            request: None,
            response: Some(body.into()),
            status_code: Some(status_code),
        }
    }

    pub fn is_response(&self) -> bool {
        self.status_code.is_some()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
