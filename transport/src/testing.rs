//! In-memory [`HttpClient`] double for tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};

enum Route {
    Fixed(HttpResponse),
    File(Bytes),
    Fail(String),
}

/// Routes requests by method and URL to canned responses
///
/// Files registered with [`MockHttpClient::serve_file`] answer `HEAD` with
/// their length and `GET` with `Range` support, like a static media server.
/// Every request is recorded and can be inspected with
/// [`MockHttpClient::requests`].
#[derive(Default)]
pub struct MockHttpClient {
    routes: Mutex<HashMap<(Method, String), Route>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method url` with a fixed status and body
    pub fn route(&self, method: Method, url: &str, status: u16, body: impl Into<Bytes>) -> &Self {
        let response = HttpResponse::new(status, [("content-type", "text/xml")], body);
        self.insert(method, url, Route::Fixed(response));
        self
    }

    /// Answer `method url` with a transport failure
    pub fn fail(&self, method: Method, url: &str, message: &str) -> &Self {
        self.insert(method, url, Route::Fail(message.to_string()));
        self
    }

    /// Serve `data` at `url` with HEAD and ranged GET support
    pub fn serve_file(&self, url: &str, data: impl Into<Bytes>) -> &Self {
        let data = data.into();
        self.insert(Method::Head, url, Route::File(data.clone()));
        self.insert(Method::Get, url, Route::File(data));
        self
    }

    /// All requests seen so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Number of requests seen for `method url`
    pub fn count(&self, method: Method, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    fn insert(&self, method: Method, url: &str, route: Route) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert((method, url.to_string()), route);
        }
    }
}

fn parse_range(header: &str, len: u64) -> Option<(u64, u64)> {
    let spec = header.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start: u64 = start.trim().parse().ok()?;
    let end: u64 = match end.trim() {
        "" => len.checked_sub(1)?,
        value => value.parse().ok()?,
    };
    if start >= len || start > end {
        return None;
    }
    Some((start, end.min(len - 1)))
}

fn file_response(request: &HttpRequest, data: &Bytes) -> HttpResponse {
    let len = data.len() as u64;
    match request.method {
        Method::Head => HttpResponse::new(
            200,
            [("content-length", len.to_string()), ("accept-ranges", "bytes".to_string())],
            Bytes::new(),
        ),
        _ => match request.header_value("range") {
            None => HttpResponse::new(200, [("content-length", len.to_string())], data.clone()),
            Some(range) => match parse_range(range, len) {
                Some((start, end)) => HttpResponse::new(
                    206,
                    [("content-range", format!("bytes {}-{}/{}", start, end, len))],
                    data.slice(start as usize..=end as usize),
                ),
                None => HttpResponse::new(
                    416,
                    [("content-range", format!("bytes */{}", len))],
                    Bytes::new(),
                ),
            },
        },
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        if let Ok(mut log) = self.log.lock() {
            log.push(request.clone());
        }

        let routes = self
            .routes
            .lock()
            .map_err(|_| TransportError::Network("mock routes poisoned".to_string()))?;

        match routes.get(&(request.method, request.url.clone())) {
            Some(Route::Fixed(response)) => Ok(response.clone()),
            Some(Route::File(data)) => Ok(file_response(&request, data)),
            Some(Route::Fail(message)) => Err(TransportError::Network(message.clone())),
            None => Ok(HttpResponse::new(404, Vec::<(String, String)>::new(), Bytes::new())),
        }
    }
}
