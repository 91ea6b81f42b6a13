use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use http::header::{self, HeaderMap, HeaderValue};
use http::StatusCode;
use log::{debug, trace};
use reqwest::{Client, RequestBuilder};
use tokio::sync::RwLock;
use url::Url;

use crate::{ErrorKind, Result};

/// What a single request returned, as far as retrieval is concerned
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Fetched {
    /// Successful response with its body
    Body(String),
    /// The server answered with `429 Too Many Requests`
    Throttled,
    /// Any other non-success status
    Status(StatusCode),
}

/// Memoized response bodies, keyed by request URL
type ResponseCache = DashMap<Url, String>;

/// HTTP connection shared by all retrievals of one source.
///
/// The client is created on [`open`](Self::open) (or lazily on the first
/// request) and dropped again on [`close`](Self::close). Every request sent
/// through the session is counted.
#[derive(Debug)]
pub(crate) struct HttpSession {
    headers: HeaderMap,
    timeout: Duration,
    client: RwLock<Option<Client>>,
    requests: AtomicUsize,
    cache: ResponseCache,
}

impl HttpSession {
    /// Create a closed session.
    /// `headers` are sent with every request in addition to the user agent.
    pub(crate) fn new(user_agent: &str, timeout: Duration, mut headers: HeaderMap) -> Result<Self> {
        headers.insert(header::USER_AGENT, HeaderValue::from_str(user_agent)?);
        Ok(Self {
            headers,
            timeout,
            client: RwLock::new(None),
            requests: AtomicUsize::new(0),
            cache: DashMap::new(),
        })
    }

    /// Create the HTTP client unless there is one already
    pub(crate) async fn open(&self) -> Result<Client> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.client.write().await;
        // Another task might have opened the session while we were waiting
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(self.headers.clone())
            .timeout(self.timeout)
            .build()
            .map_err(ErrorKind::BuildRequestClient)?;
        debug!("Opened HTTP session");
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drop the HTTP client, closing its idle connections
    pub(crate) async fn close(&self) {
        if self.client.write().await.take().is_some() {
            debug!("Closed HTTP session");
        }
    }

    #[cfg(test)]
    pub(crate) async fn is_open(&self) -> bool {
        self.client.read().await.is_some()
    }

    pub(crate) fn requests_made(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Send the request produced by `build` and read its body on success
    pub(crate) async fn send<F>(&self, build: F) -> Result<Fetched>
    where
        F: FnOnce(&Client) -> RequestBuilder,
    {
        let client = self.open().await?;
        self.requests.fetch_add(1, Ordering::Relaxed);

        let response = build(&client)
            .send()
            .await
            .map_err(ErrorKind::NetworkRequest)?;

        let status = response.status();
        trace!("{} {status}", response.url());
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Fetched::Throttled);
        }
        if !status.is_success() {
            return Ok(Fetched::Status(status));
        }

        let body = response.text().await.map_err(ErrorKind::ReadResponseBody)?;
        Ok(Fetched::Body(body))
    }

    /// `GET` the given URL. Successful bodies are remembered, so asking for
    /// the same URL again does not cause another request.
    pub(crate) async fn get_cached(&self, url: &Url) -> Result<Fetched> {
        if let Some(body) = self.cache.get(url) {
            trace!("Cache hit for {url}");
            return Ok(Fetched::Body(body.clone()));
        }

        let fetched = self.send(|client| client.get(url.clone())).await?;
        if let Fetched::Body(body) = &fetched {
            self.cache.insert(url.clone(), body.clone());
        }
        Ok(fetched)
    }

    /// Whether a `GET` on `url` is currently answered with `429`
    pub(crate) async fn probe(&self, url: &Url) -> Result<bool> {
        let client = self.open().await?;
        self.requests.fetch_add(1, Ordering::Relaxed);

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(ErrorKind::NetworkRequest)?;
        Ok(response.status() == StatusCode::TOO_MANY_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::mock_server;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session() -> HttpSession {
        HttpSession::new("wordcards-test", Duration::from_secs(5), HeaderMap::new()).unwrap()
    }

    #[tokio::test]
    async fn test_open_and_close_are_idempotent() {
        let session = session();
        assert!(!session.is_open().await);

        session.open().await.unwrap();
        session.open().await.unwrap();
        assert!(session.is_open().await);

        session.close().await;
        session.close().await;
        assert!(!session.is_open().await);
        assert_eq!(session.requests_made(), 0);
    }

    #[tokio::test]
    async fn test_too_many_requests_is_throttled() {
        let mock_server = mock_server!(StatusCode::TOO_MANY_REQUESTS);
        let url = Url::parse(&mock_server.uri()).unwrap();

        let session = session();
        assert_eq!(session.get_cached(&url).await.unwrap(), Fetched::Throttled);
        assert_eq!(session.requests_made(), 1);
    }

    #[tokio::test]
    async fn test_other_status_is_reported() {
        let mock_server = mock_server!(StatusCode::SERVICE_UNAVAILABLE);
        let url = Url::parse(&mock_server.uri()).unwrap();

        let fetched = session().get_cached(&url).await.unwrap();
        assert_eq!(fetched, Fetched::Status(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_successful_bodies_are_cached() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hola"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let url = Url::parse(&format!("{}/hola", mock_server.uri())).unwrap();

        let session = session();
        for _ in 0..3 {
            assert_eq!(
                session.get_cached(&url).await.unwrap(),
                Fetched::Body("hello".into())
            );
        }
        assert_eq!(session.requests_made(), 1);
    }

    #[tokio::test]
    async fn test_throttled_responses_are_not_cached() {
        let mock_server = mock_server!(StatusCode::TOO_MANY_REQUESTS);
        let url = Url::parse(&mock_server.uri()).unwrap();

        let session = session();
        session.get_cached(&url).await.unwrap();
        session.get_cached(&url).await.unwrap();
        assert_eq!(session.requests_made(), 2);
    }

    #[tokio::test]
    async fn test_probe() {
        let throttled = mock_server!(StatusCode::TOO_MANY_REQUESTS);
        let ok = mock_server!(StatusCode::OK);

        let session = session();
        assert!(session.probe(&Url::parse(&throttled.uri()).unwrap()).await.unwrap());
        assert!(!session.probe(&Url::parse(&ok.uri()).unwrap()).await.unwrap());
        assert_eq!(session.requests_made(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        // Nothing listens on the discard port
        let url = Url::parse("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            session().probe(&url).await,
            Err(ErrorKind::NetworkRequest(_))
        ));
    }
}
