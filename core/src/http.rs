//! HTTP transport types shared by the client and its transports.
//!
//! # Design
//! Requests and responses are plain data. `TaskboardClient::build_request`
//! produces an `HttpRequest` without touching the network; a `Transport`
//! executes it and hands back an `HttpResponse`. Keeping the two halves
//! apart lets the session-expiry logic be tested against a fake transport.
//!
//! All fields use owned types so values can move freely between tasks.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute: the client has already prefixed the configured base
/// origin onto the operation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 401 is the only status the backend uses to reject a credential.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Result of a single `TaskboardClient::request` call.
///
/// `AuthRequired` means the operation did not happen: either no token was
/// stored and the request was never sent, or the backend answered 401. In
/// both cases the session has already been cleared and redirected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Response(HttpResponse),
    AuthRequired,
}

impl RequestOutcome {
    pub fn into_response(self) -> Option<HttpResponse> {
        match self {
            RequestOutcome::Response(response) => Some(response),
            RequestOutcome::AuthRequired => None,
        }
    }
}
