use futures::StreamExt;
use thiserror::Error;
use url::Url;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving a channel feed.
///
/// None of these are fatal to a sync: the orchestrator logs them and
/// continues with an empty batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, timeout, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Body is not valid UTF-8
    #[error("Feed body is not valid UTF-8")]
    InvalidUtf8,
    /// The configured feed endpoint could not be turned into a URL
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),
}

/// Builds the feed URL for a channel: `base` with a `channel_id` query parameter.
///
/// Existing query parameters on `base` are kept.
pub fn feed_url(base: &str, channel_id: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(base).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            base,
            url.scheme()
        )));
    }
    url.query_pairs_mut().append_pair("channel_id", channel_id);
    Ok(url)
}

/// Retrieves a feed document as text with a single unauthenticated GET.
///
/// No retries are attempted; a timeout, if any, comes from the `client`.
///
/// # Errors
///
/// - [`FetchError::Network`] - Connection, TLS or client timeout errors
/// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchError::ResponseTooLarge`] - Response exceeded 10MB
/// - [`FetchError::IncompleteResponse`] - Body shorter than Content-Length
/// - [`FetchError::InvalidUtf8`] - Body is not UTF-8
pub async fn fetch_feed(client: &reqwest::Client, url: &Url) -> Result<String, FetchError> {
    let response = client.get(url.as_str()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    tracing::debug!(url = %url, bytes = bytes.len(), "Fetched feed");

    String::from_utf8(bytes).map_err(|_| FetchError::InvalidUtf8)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0"?><feed></feed>"#;

    #[test]
    fn test_feed_url_appends_channel_id() {
        let url = feed_url("https://www.youtube.com/feeds/videos.xml", "UC123").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.youtube.com/feeds/videos.xml?channel_id=UC123"
        );
    }

    #[test]
    fn test_feed_url_keeps_existing_query() {
        let url = feed_url("https://example.com/feed?lang=en", "UC 1").unwrap();
        assert_eq!(url.as_str(), "https://example.com/feed?lang=en&channel_id=UC+1");
    }

    #[test]
    fn test_feed_url_rejects_garbage() {
        assert!(matches!(
            feed_url("not a url", "UC123"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            feed_url("ftp://example.com/feed", "UC123"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feeds/videos.xml"))
            .and(query_param("channel_id", "UC123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(FEED)
                    .insert_header("Content-Type", "application/atom+xml"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = feed_url(&format!("{}/feeds/videos.xml", mock_server.uri()), "UC123").unwrap();
        let body = fetch_feed(&reqwest::Client::new(), &url).await.unwrap();
        assert_eq!(body, FEED);
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = feed_url(&mock_server.uri(), "UC123").unwrap();
        match fetch_feed(&reqwest::Client::new(), &url).await {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_500_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = feed_url(&mock_server.uri(), "UC123").unwrap();
        let result = fetch_feed(&reqwest::Client::new(), &url).await;
        assert!(matches!(result, Err(FetchError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'a'; MAX_FEED_SIZE + 1]))
            .mount(&mock_server)
            .await;

        let url = feed_url(&mock_server.uri(), "UC123").unwrap();
        let result = fetch_feed(&reqwest::Client::new(), &url).await;
        assert!(matches!(result, Err(FetchError::ResponseTooLarge)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_utf8() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0xfd]))
            .mount(&mock_server)
            .await;

        let url = feed_url(&mock_server.uri(), "UC123").unwrap();
        let result = fetch_feed(&reqwest::Client::new(), &url).await;
        assert!(matches!(result, Err(FetchError::InvalidUtf8)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Nothing listens on port 1
        let url = feed_url("http://127.0.0.1:1/feed", "UC123").unwrap();
        let result = fetch_feed(&reqwest::Client::new(), &url).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
