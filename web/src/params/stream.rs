use serde::Deserialize;
use ::sse::StreamRequest;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub(crate) struct StreamParams {
    /// Milliseconds between events. Missing, malformed or non-positive values use the server default.
    #[param(example = "250")]
    pub(crate) interval_ms: Option<String>,
    /// First sequence value to emit. Takes precedence over `Last-Event-ID`.
    #[param(example = "10")]
    pub(crate) start: Option<String>,
    /// Number of events to send before closing. Missing, malformed or zero streams forever.
    #[param(example = "5")]
    pub(crate) limit: Option<String>,
}

impl StreamParams {
    pub(crate) fn into_stream_request(self, last_event_id: Option<String>) -> StreamRequest {
        StreamRequest {
            interval_ms: self.interval_ms,
            start: self.start,
            limit: self.limit,
            last_event_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;

    fn parse(uri: &str) -> StreamParams {
        let uri: Uri = uri.parse().unwrap();
        Query::<StreamParams>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_query_names_are_camel_case() {
        let params = parse("/stream?intervalMs=250&start=10&limit=5");
        assert_eq!(params.interval_ms.as_deref(), Some("250"));
        assert_eq!(params.start.as_deref(), Some("10"));
        assert_eq!(params.limit.as_deref(), Some("5"));
    }

    #[test]
    fn test_malformed_values_are_kept_as_text() {
        let params = parse("/stream?intervalMs=abc&start=-1");
        assert_eq!(params.interval_ms.as_deref(), Some("abc"));
        assert_eq!(params.start.as_deref(), Some("-1"));
        assert_eq!(params.limit, None);
    }

    #[test]
    fn test_into_stream_request_carries_last_event_id() {
        let request = parse("/stream?limit=3").into_stream_request(Some("41".to_string()));
        assert_eq!(
            request,
            StreamRequest {
                interval_ms: None,
                start: None,
                limit: Some("3".to_string()),
                last_event_id: Some("41".to_string()),
            }
        );
    }
}
