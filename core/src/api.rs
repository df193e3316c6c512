//! Domain operations: each one is a fixed method, path and body passed to
//! `TaskboardClient::request`, followed by decoding a successful response.
//!
//! When the session is missing or rejected, list operations return an empty
//! `Vec` and single-item operations return `None`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::client::TaskboardClient;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpResponse};
use crate::session::SessionContext;
use crate::transport::Transport;
use crate::types::{
    AccessToken, Acknowledgement, Group, GroupDetail, Invite, LoginRequest, Member, NewGroup, NewTask,
    RegisterRequest, Task, TaskUpdate, User,
};

impl<S: SessionContext, T: Transport> TaskboardClient<S, T> {
    // --- auth ---

    /// `POST /auth/login`. Does not store the token; see `sign_in`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<AccessToken>, ApiError> {
        let body = to_json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        self.fetch_one(HttpMethod::Post, "/auth/login", Some(body), false).await
    }

    /// `login` followed by storing the returned token in the session. Fails
    /// with `ApiError::Storage` when the token could not be stored.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Option<AccessToken>, ApiError> {
        let token = self.login(email, password).await?;
        if let Some(token) = &token {
            self.session().set_token(&token.access_token)?;
            info!("signed in");
        }
        Ok(token)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Option<User>, ApiError> {
        let body = to_json(&RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })?;
        self.fetch_one(HttpMethod::Post, "/auth/register", Some(body), false).await
    }

    /// Local only: drop the token and go to the login view.
    pub fn logout(&self) {
        self.session().clear_token();
        self.session().redirect_to_login(&self.config().login_location);
    }

    // --- users ---

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.fetch_list("/users/").await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, ApiError> {
        self.fetch_one(HttpMethod::Get, &format!("/users/{user_id}"), None, true).await
    }

    // --- groups ---

    pub async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
        self.fetch_list("/groups/").await
    }

    pub async fn create_group(&self, name: &str) -> Result<Option<Group>, ApiError> {
        let body = to_json(&NewGroup { name: name.to_string() })?;
        self.fetch_one(HttpMethod::Post, "/groups/", Some(body), true).await
    }

    pub async fn get_group(&self, group_id: i64) -> Result<Option<GroupDetail>, ApiError> {
        self.fetch_one(HttpMethod::Get, &format!("/groups/{group_id}"), None, true).await
    }

    pub async fn list_group_members(&self, group_id: i64) -> Result<Vec<Member>, ApiError> {
        self.fetch_list(&format!("/groups/{group_id}/members")).await
    }

    pub async fn generate_invite(&self, group_id: i64) -> Result<Option<Invite>, ApiError> {
        self.fetch_one(HttpMethod::Post, &format!("/groups/{group_id}/invite"), None, true).await
    }

    pub async fn remove_member(&self, group_id: i64, user_id: i64) -> Result<Option<Acknowledgement>, ApiError> {
        let path = format!("/groups/{group_id}/members/{user_id}");
        self.acknowledge(HttpMethod::Delete, &path).await
    }

    pub async fn join_group(&self, invite_token: &str) -> Result<Option<Acknowledgement>, ApiError> {
        self.acknowledge(HttpMethod::Get, &format!("/groups/join/{invite_token}")).await
    }

    // --- tasks ---

    pub async fn list_group_tasks(&self, group_id: i64) -> Result<Vec<Task>, ApiError> {
        self.fetch_list(&format!("/tasks/group/{group_id}")).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Option<Task>, ApiError> {
        let body = to_json(task)?;
        self.fetch_one(HttpMethod::Post, "/tasks/", Some(body), true).await
    }

    pub async fn update_task(&self, task_id: i64, update: &TaskUpdate) -> Result<Option<Task>, ApiError> {
        let body = to_json(update)?;
        self.fetch_one(HttpMethod::Put, &format!("/tasks/{task_id}"), Some(body), true).await
    }

    pub async fn delete_task(&self, task_id: i64) -> Result<Option<Acknowledgement>, ApiError> {
        self.acknowledge(HttpMethod::Delete, &format!("/tasks/{task_id}")).await
    }

    // --- helpers ---

    async fn fetch_list<D: DeserializeOwned>(&self, path: &str) -> Result<Vec<D>, ApiError> {
        match self.request(HttpMethod::Get, path, None, true).await?.into_response() {
            Some(response) => decode(response),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_one<D: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        requires_auth: bool,
    ) -> Result<Option<D>, ApiError> {
        self.request(method, path, body, requires_auth)
            .await?
            .into_response()
            .map(decode::<D>)
            .transpose()
    }

    async fn acknowledge(&self, method: HttpMethod, path: &str) -> Result<Option<Acknowledgement>, ApiError> {
        self.request(method, path, None, true)
            .await?
            .into_response()
            .map(decode_acknowledgement)
            .transpose()
    }
}

fn to_json<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode<D: DeserializeOwned>(response: HttpResponse) -> Result<D, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Like `decode`, but an empty success body (e.g. 204) is a valid answer.
fn decode_acknowledgement(response: HttpResponse) -> Result<Acknowledgement, ApiError> {
    check_status(&response)?;
    if response.body.trim().is_empty() {
        return Ok(Acknowledgement::default());
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
