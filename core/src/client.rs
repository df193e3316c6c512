//! The taskboard API client: bearer-token attachment, base-URL prefixing and
//! session-expiry handling for every call.
//!
//! # Design
//! `TaskboardClient` owns a `ClientConfig`, a `SessionContext` and a
//! `Transport`. `build_request` is pure and produces an `HttpRequest`;
//! `request` adds the session checks around the round-trip. A missing token
//! or a 401 clears the session, redirects to the login view and yields
//! `RequestOutcome::AuthRequired` instead of an error. The domain
//! operations built on top of `request` live in `api.rs`.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, RequestOutcome};
use crate::session::SessionContext;
use crate::transport::{ReqwestTransport, Transport};

/// Asynchronous client for the taskboard backend.
#[derive(Debug)]
pub struct TaskboardClient<S, T = ReqwestTransport> {
    config: ClientConfig,
    session: S,
    transport: T,
}

impl<S: SessionContext> TaskboardClient<S, ReqwestTransport> {
    /// Client that talks to `config.base_url` over `reqwest`.
    pub fn connect(config: ClientConfig, session: S) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::new(config, session, transport))
    }
}

impl<S: SessionContext, T: Transport> TaskboardClient<S, T> {
    pub fn new(config: ClientConfig, session: S, transport: T) -> Self {
        Self {
            config,
            session,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Describe one call as plain data without sending it.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if let Some(token) = token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        let body = body
            .map(|value| serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string())))
            .transpose()?;
        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.config.base_url),
            headers,
            body,
        })
    }

    /// Perform one request against the backend.
    ///
    /// With `requires_auth`, a missing token redirects to the login view and
    /// nothing is sent. A 401 clears the token and redirects whether or not
    /// the call was authenticated. Any other response is returned unread.
    /// Transport failures propagate as `Err`.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        requires_auth: bool,
    ) -> Result<RequestOutcome, ApiError> {
        let token = if requires_auth {
            match self.session.token() {
                Some(token) => Some(token),
                None => {
                    info!(method = method.as_str(), path, "no session token, redirecting to login");
                    self.session.redirect_to_login(&self.config.login_location);
                    return Ok(RequestOutcome::AuthRequired);
                }
            }
        } else {
            None
        };

        let request = self.build_request(method, path, body.as_ref(), token.as_deref())?;
        debug!(method = method.as_str(), url = %request.url, "sending request");
        let response = self.transport.execute(request).await?;

        if response.is_unauthorized() {
            warn!(method = method.as_str(), path, "session rejected by backend, redirecting to login");
            self.session.clear_token();
            self.session.redirect_to_login(&self.config.login_location);
            return Ok(RequestOutcome::AuthRequired);
        }

        Ok(RequestOutcome::Response(response))
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::fake::FakeTransport;
    use super::*;
    use crate::session::MemorySession;

    fn client(session: MemorySession, transport: FakeTransport) -> TaskboardClient<MemorySession, FakeTransport> {
        TaskboardClient::new(ClientConfig::new("http://localhost:8000"), session, transport)
    }

    #[test]
    fn build_request_without_token_or_body() {
        let c = client(MemorySession::new(), FakeTransport::default());
        let req = c.build_request(HttpMethod::Get, "/groups/", None, None).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/groups/");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn build_request_attaches_bearer_and_body() {
        let c = client(MemorySession::new(), FakeTransport::default());
        let body = json!({"name": "Ops"});
        let req = c
            .build_request(HttpMethod::Post, "/groups/", Some(&body), Some("abc"))
            .unwrap();
        assert_eq!(req.header("Authorization"), Some("Bearer abc"));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, body);
    }

    #[tokio::test]
    async fn missing_token_redirects_without_sending() {
        let c = client(MemorySession::new(), FakeTransport::default().respond(200, "[]"));
        let outcome = c.request(HttpMethod::Get, "/groups/", None, true).await.unwrap();
        assert_eq!(outcome, RequestOutcome::AuthRequired);
        assert!(c.transport().sent().is_empty());
        assert_eq!(c.session().location().as_deref(), Some("login.html"));
    }

    #[tokio::test]
    async fn unauthenticated_call_sends_without_token() {
        let c = client(MemorySession::new(), FakeTransport::default().respond(200, "{}"));
        let outcome = c
            .request(HttpMethod::Post, "/auth/login", Some(json!({"email": "a"})), false)
            .await
            .unwrap();
        assert!(matches!(outcome, RequestOutcome::Response(ref r) if r.status == 200));
        let sent = c.transport().sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].header("authorization").is_none());
        assert!(c.session().location().is_none());
    }

    #[tokio::test]
    async fn unauthenticated_call_ignores_stored_token() {
        let c = client(MemorySession::with_token("abc"), FakeTransport::default().respond(200, "{}"));
        c.request(HttpMethod::Post, "/auth/register", None, false).await.unwrap();
        assert!(c.transport().sent()[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn stored_token_is_attached() {
        let c = client(MemorySession::with_token("abc"), FakeTransport::default().respond(200, "[]"));
        c.request(HttpMethod::Get, "/groups/", None, true).await.unwrap();
        assert_eq!(c.transport().sent()[0].header("authorization"), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn unauthorized_response_clears_token_and_redirects() {
        let c = client(MemorySession::with_token("stale"), FakeTransport::default().respond(401, ""));
        let outcome = c.request(HttpMethod::Get, "/groups/", None, true).await.unwrap();
        assert_eq!(outcome, RequestOutcome::AuthRequired);
        assert!(c.session().token().is_none());
        assert_eq!(c.session().location().as_deref(), Some("login.html"));
    }

    #[tokio::test]
    async fn unauthorized_response_is_handled_for_unauthenticated_calls() {
        let c = client(MemorySession::with_token("abc"), FakeTransport::default().respond(401, ""));
        let outcome = c
            .request(HttpMethod::Post, "/auth/login", None, false)
            .await
            .unwrap();
        assert_eq!(outcome, RequestOutcome::AuthRequired);
        assert!(c.session().token().is_none());
        assert_eq!(c.session().location().as_deref(), Some("login.html"));
    }

    #[tokio::test]
    async fn error_statuses_are_returned_raw() {
        for status in [400, 403, 404, 500] {
            let c = client(
                MemorySession::with_token("abc"),
                FakeTransport::default().respond(status, r#"{"detail":"nope"}"#),
            );
            let outcome = c.request(HttpMethod::Get, "/groups/9", None, true).await.unwrap();
            let response = outcome.into_response().unwrap();
            assert_eq!(response.status, status);
            assert_eq!(response.body, r#"{"detail":"nope"}"#);
            assert_eq!(c.session().token().as_deref(), Some("abc"));
            assert!(c.session().location().is_none());
        }
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let c = client(MemorySession::with_token("abc"), FakeTransport::default().fail("connection refused"));
        let err = c.request(HttpMethod::Get, "/groups/", None, true).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(ref m) if m == "connection refused"));
        assert_eq!(c.session().token().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn custom_login_location_is_used() {
        let c = TaskboardClient::new(
            ClientConfig::new("http://localhost:8000").with_login_location("/signin"),
            MemorySession::new(),
            FakeTransport::default(),
        );
        c.request(HttpMethod::Get, "/groups/", None, true).await.unwrap();
        assert_eq!(c.session().location().as_deref(), Some("/signin"));
    }
}
