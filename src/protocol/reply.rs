use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A single result row; passed through without validation.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("reply body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reply body is not a JSON object")]
    NotObject,
}

/// Reply to any command, classified by the shape of its body.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A bare token such as the login acknowledgement.
    Status(String),
    /// `<keyword> <object>` carrying data.
    Data { keyword: String, body: Record },
    /// `<keyword> <object>` whose object has an `id` key.
    Error(ServerError),
}

impl Reply {
    /// Classifies a decoded reply.
    ///
    /// An object body carrying a top-level `id` key is an error reply whatever
    /// keyword precedes it.
    pub fn parse(text: &str) -> Result<Self, ReplyError> {
        let Some((keyword, body)) = text.split_once(' ') else {
            return Ok(Reply::Status(text.to_string()));
        };

        let body = match serde_json::from_str(body)? {
            Value::Object(body) => body,
            _ => return Err(ReplyError::NotObject),
        };

        if body.contains_key("id") {
            Ok(Reply::Error(ServerError::from_body(body)))
        } else {
            Ok(Reply::Data {
                keyword: keyword.to_string(),
                body,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Throttled,
    Other(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Throttled => f.write_str("throttled"),
            ErrorKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// Error or status object returned in place of data.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerError {
    pub kind: ErrorKind,
    pub message: Option<String>,
    /// Seconds to wait before retrying, sent with throttling errors.
    pub fullwait: Option<f64>,
    pub body: Record,
}

impl ServerError {
    fn from_body(body: Record) -> Self {
        let kind = match body.get("id") {
            Some(Value::String(id)) if id == "throttled" => ErrorKind::Throttled,
            Some(Value::String(id)) => ErrorKind::Other(id.clone()),
            Some(other) => ErrorKind::Other(other.to_string()),
            None => ErrorKind::Other(String::new()),
        };
        let message = body.get("msg").and_then(Value::as_str).map(str::to_string);
        let fullwait = body.get("fullwait").and_then(Value::as_f64);

        Self {
            kind,
            message,
            fullwait,
            body,
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.kind == ErrorKind::Throttled
    }

    /// The server-requested pause, if present and representable.
    pub fn wait(&self) -> Option<Duration> {
        self.fullwait
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {msg}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// One page of `get` results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultPage {
    pub items: Vec<Record>,
    pub num: u64,
    pub more: bool,
}

/// Reply to `get`: a page of results or the error sent in its place.
#[derive(Debug, Clone, PartialEq)]
pub enum PageReply {
    Page(ResultPage),
    Error(ServerError),
}

/// Row totals per entity table, as returned by `dbstats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Stats(Record);

impl Stats {
    pub fn new(totals: Record) -> Self {
        Self(totals)
    }

    pub fn total(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn as_map(&self) -> &Record {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_bare_status() {
        assert_eq!(Reply::parse("ok").unwrap(), Reply::Status("ok".to_string()));
    }

    #[test]
    fn parse_data_reply() {
        let reply = Reply::parse(r#"results {"items":[],"num":0,"more":false}"#).unwrap();

        let Reply::Data { keyword, body } = reply else {
            panic!("expected data reply");
        };
        assert_eq!(keyword, "results");
        assert_eq!(body.get("more"), Some(&json!(false)));
    }

    #[test]
    fn id_key_marks_error_regardless_of_keyword() {
        for keyword in ["error", "results", "dbstats", "ok"] {
            let reply = Reply::parse(&format!(r#"{keyword} {{"id":"parse","msg":"bad"}}"#)).unwrap();
            let Reply::Error(err) = reply else {
                panic!("expected error reply for '{keyword}'");
            };
            assert_eq!(err.kind, ErrorKind::Other("parse".to_string()));
            assert_eq!(err.to_string(), "parse: bad");
        }
    }

    #[test]
    fn error_keyword_without_id_is_data() {
        let reply = Reply::parse(r#"error {"msg":"no id here"}"#).unwrap();
        assert!(matches!(reply, Reply::Data { .. }));
    }

    #[test]
    fn parse_throttle() {
        let reply = Reply::parse(r#"error {"id":"throttled","fullwait":2}"#).unwrap();

        let Reply::Error(err) = reply else {
            panic!("expected error reply");
        };
        assert!(err.is_throttled());
        assert_eq!(err.wait(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn negative_wait_is_unusable() {
        let reply = Reply::parse(r#"error {"id":"throttled","fullwait":-1}"#).unwrap();

        let Reply::Error(err) = reply else {
            panic!("expected error reply");
        };
        assert_eq!(err.wait(), None);
    }

    #[test]
    fn body_must_be_object() {
        assert!(matches!(
            Reply::parse("results [1,2]"),
            Err(ReplyError::NotObject)
        ));
        assert!(matches!(Reply::parse("results {"), Err(ReplyError::Json(_))));
    }

    #[test]
    fn stats_total() {
        let Value::Object(map) = json!({"vn": 30, "users": 5, "cached": true}) else {
            unreachable!()
        };
        let stats = Stats::new(map);

        assert_eq!(stats.total("vn"), Some(30));
        assert_eq!(stats.total("cached"), None);
        assert_eq!(stats.total("chars"), None);
    }
}
