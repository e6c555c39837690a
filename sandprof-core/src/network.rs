//! Network call interception
//!
//! Rather than patching a process-wide fetch, the session hands out a
//! [`NetworkObserver`] that the instrumented execution routes its calls
//! through, either directly with [`NetworkObserver::observe`] or by wrapping
//! its transport in an [`ObservedTransport`]. Once the session stops, the
//! observer becomes a plain pass-through.

use crate::types::NetworkRequest;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

/// Method recorded when the caller does not specify one
pub const DEFAULT_METHOD: &str = "GET";

/// Destination for observed requests
pub trait RequestSink: Send + Sync {
    /// Whether the owning session is recording
    fn is_active(&self) -> bool;

    /// Current session time in milliseconds
    fn now_ms(&self) -> f64;

    /// Append a request; returns `false` once the session stopped accepting
    fn push_request(&self, request: NetworkRequest) -> bool;
}

/// Minimal view of a response needed for recording
pub trait ObservedResponse {
    fn status(&self) -> u16;

    /// Header lookup; implementations should match names case-insensitively
    fn header(&self, name: &str) -> Option<&str>;
}

/// Times and records calls made through it
#[derive(Clone)]
pub struct NetworkObserver {
    sink: Arc<dyn RequestSink>,
}

impl NetworkObserver {
    pub fn new(sink: Arc<dyn RequestSink>) -> Self {
        Self { sink }
    }

    /// Check whether calls are currently being recorded
    pub fn is_recording(&self) -> bool {
        self.sink.is_active()
    }

    /// Run a synchronous call, recording it if the session is active
    ///
    /// Failures are recorded with status `0` and the error is handed back
    /// to the caller untouched.
    pub fn observe<R, E, F>(&self, method: &str, url: &str, call: F) -> Result<R, E>
    where
        R: ObservedResponse,
        F: FnOnce() -> Result<R, E>,
    {
        if !self.is_recording() {
            return call();
        }

        let start_time = self.sink.now_ms();
        let result = call();
        let end_time = self.sink.now_ms();
        self.record(method, url, start_time, end_time, result.as_ref().ok());
        result
    }

    /// Await a call, recording it if the session is active
    pub async fn observe_async<R, E, Fut>(&self, method: &str, url: &str, call: Fut) -> Result<R, E>
    where
        R: ObservedResponse,
        Fut: Future<Output = Result<R, E>>,
    {
        if !self.is_recording() {
            return call.await;
        }

        let start_time = self.sink.now_ms();
        let result = call.await;
        let end_time = self.sink.now_ms();
        self.record(method, url, start_time, end_time, result.as_ref().ok());
        result
    }

    fn record<R: ObservedResponse>(
        &self,
        method: &str,
        url: &str,
        start_time: f64,
        end_time: f64,
        response: Option<&R>,
    ) {
        let method = if method.is_empty() {
            DEFAULT_METHOD
        } else {
            method
        };
        let (status, size) = match response {
            Some(response) => (response.status(), content_length(response)),
            None => (0, 0),
        };

        let request = NetworkRequest {
            url: url.to_string(),
            method: method.to_string(),
            duration: (end_time - start_time).max(0.0),
            status,
            size,
            start_time,
            end_time,
        };
        trace!("Observed {} {} -> {}", request.method, request.url, status);
        self.sink.push_request(request);
    }
}

fn content_length<R: ObservedResponse>(response: &R) -> u64 {
    response
        .header("content-length")
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Outbound HTTP request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: DEFAULT_METHOD.to_string(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// HTTP response as seen by the instrumented code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ObservedResponse for HttpResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Anything able to carry an HTTP request out of the sandbox
#[async_trait]
pub trait HttpTransport: Send + Sync {
    type Error: Send;

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Self::Error>;
}

/// Transport wrapper that records every call through a [`NetworkObserver`]
pub struct ObservedTransport<T> {
    inner: T,
    observer: NetworkObserver,
}

impl<T> ObservedTransport<T> {
    pub fn new(inner: T, observer: NetworkObserver) -> Self {
        Self { inner, observer }
    }

    /// Unwrap the original transport
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for ObservedTransport<T> {
    type Error = T::Error;

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Self::Error> {
        let method = request.method.clone();
        let url = request.url.clone();
        self.observer
            .observe_async(&method, &url, self.inner.send(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct TestSink {
        active: AtomicBool,
        now: Mutex<f64>,
        requests: Mutex<Vec<NetworkRequest>>,
    }

    impl RequestSink for TestSink {
        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }

        fn now_ms(&self) -> f64 {
            let mut now = self.now.lock();
            *now += 25.0;
            *now
        }

        fn push_request(&self, request: NetworkRequest) -> bool {
            if !self.is_active() {
                return false;
            }
            self.requests.lock().push(request);
            true
        }
    }

    fn active_sink() -> Arc<TestSink> {
        let sink = Arc::new(TestSink::default());
        sink.active.store(true, Ordering::SeqCst);
        sink
    }

    fn ok_response(len: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: vec![("Content-Length".to_string(), len.to_string())],
            body: Vec::new(),
        }
    }

    #[test]
    fn test_observe_records_success() {
        let sink = active_sink();
        let observer = NetworkObserver::new(sink.clone());

        let result: Result<_, String> = observer.observe("", "https://api.test/a", || Ok(ok_response("512")));
        assert_eq!(result.unwrap().status, 200);

        let requests = sink.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].size, 512);
        assert_eq!(requests[0].duration, 25.0);
        assert!(requests[0].end_time >= requests[0].start_time);
    }

    #[test]
    fn test_observe_records_failure_and_returns_error() {
        let sink = active_sink();
        let observer = NetworkObserver::new(sink.clone());

        let result: Result<HttpResponse, String> =
            observer.observe("POST", "https://api.test/b", || Err("connection reset".to_string()));
        assert_eq!(result.unwrap_err(), "connection reset");

        let requests = sink.requests.lock();
        assert_eq!(requests[0].status, 0);
        assert_eq!(requests[0].size, 0);
        assert_eq!(requests[0].method, "POST");
    }

    #[test]
    fn test_unparseable_content_length_is_zero() {
        let sink = active_sink();
        let observer = NetworkObserver::new(sink.clone());
        let _: Result<_, String> = observer.observe("GET", "https://api.test/c", || Ok(ok_response("lots")));
        assert_eq!(sink.requests.lock()[0].size, 0);
    }

    #[test]
    fn test_inactive_observer_passes_through() {
        let sink = Arc::new(TestSink::default());
        let observer = NetworkObserver::new(sink.clone());
        let result: Result<_, String> = observer.observe("GET", "https://api.test/d", || Ok(ok_response("1")));
        assert!(result.is_ok());
        assert!(sink.requests.lock().is_empty());
    }

    struct StaticTransport;

    #[async_trait]
    impl HttpTransport for StaticTransport {
        type Error = String;

        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Self::Error> {
            if request.url.contains("down") {
                Err(format!("{} unreachable", request.url))
            } else {
                Ok(ok_response("64"))
            }
        }
    }

    #[tokio::test]
    async fn test_observed_transport_records_calls() {
        let sink = active_sink();
        let transport = ObservedTransport::new(StaticTransport, NetworkObserver::new(sink.clone()));

        let response = transport.send(HttpRequest::get("https://up.test")).await.unwrap();
        assert_eq!(response.status, 200);
        let err = transport
            .send(HttpRequest::post("https://down.test", b"{}".to_vec()))
            .await
            .unwrap_err();
        assert!(err.contains("unreachable"));

        let requests = sink.requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].size, 64);
        assert_eq!(requests[1].status, 0);
        assert_eq!(requests[1].method, "POST");
    }
}
