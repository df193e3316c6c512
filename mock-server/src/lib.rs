//! In-memory stand-in for the taskboard backend.
//!
//! Implements the HTTP contract the client consumes: bearer-token auth,
//! groups with owner/admin/member roles, single-use invites, and tasks.
//! Every endpoint except `/auth/*` answers 401 without a valid token.
//! Errors carry a `{"detail": "..."}` body.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupDetail {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub status: String,
    pub group_id: Option<i64>,
    pub created_at: String,
}

/// A task as the API returns it, with its group embedded.
#[derive(Clone, Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,
    pub group: Option<Group>,
}

#[derive(Deserialize)]
pub struct Register {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateGroup {
    pub name: String,
}

/// `status` distinguishes a missing key (`None`) from an explicit `null`
/// (`Some(None)`): the former takes the schema default, the latter `todo`.
#[derive(Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Option<String>>,
    pub group_id: Option<i64>,
}

/// Only keys present in the body are applied; `null` clears a nullable field.
#[derive(Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub deadline: Option<Option<String>>,
    pub status: Option<String>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

struct Account {
    user: User,
    username: String,
    password: String,
}

struct Membership {
    id: i64,
    user_id: i64,
    group_id: i64,
    role: String,
}

struct InviteRecord {
    token: String,
    group_id: i64,
    used: bool,
}

#[derive(Default)]
struct Store {
    next_id: i64,
    accounts: BTreeMap<i64, Account>,
    sessions: HashMap<String, i64>,
    groups: BTreeMap<i64, Group>,
    memberships: Vec<Membership>,
    invites: Vec<InviteRecord>,
    tasks: BTreeMap<i64, Task>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn members_of(&self, group_id: i64) -> Vec<Member> {
        self.memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .filter_map(|m| {
                self.accounts.get(&m.user_id).map(|a| Member {
                    id: m.id,
                    user_id: a.user.id,
                    username: a.username.clone(),
                    email: a.user.email.clone(),
                    role: m.role.clone(),
                })
            })
            .collect()
    }

    fn task_response(&self, task: &Task) -> TaskResponse {
        TaskResponse {
            task: task.clone(),
            group: task.group_id.and_then(|id| self.groups.get(&id).cloned()),
        }
    }

    /// Owner, or a member holding the `admin` role.
    fn can_manage(&self, group: &Group, user_id: i64) -> bool {
        group.owner_id == user_id
            || self
                .memberships
                .iter()
                .any(|m| m.group_id == group.id && m.user_id == user_id && m.role == "admin")
    }
}

/// Shared handle to the in-memory store.
#[derive(Clone, Default)]
pub struct Backend {
    store: Arc<RwLock<Store>>,
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate every issued token, as if all sessions expired at once.
    pub async fn revoke_tokens(&self) {
        self.store.write().await.sessions.clear();
        info!("all sessions revoked");
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/users/", get(list_users))
            .route("/users/{id}", get(get_user))
            .route("/groups/", get(list_groups).post(create_group))
            .route("/groups/{id}", get(get_group))
            .route("/groups/{id}/members", get(list_members))
            .route("/groups/{id}/members/{user_id}", delete(remove_member))
            .route("/groups/{id}/invite", post(generate_invite))
            .route("/groups/join/{token}", get(join_group))
            .route("/tasks/", post(create_task))
            .route("/tasks/group/{group_id}", get(list_group_tasks))
            .route("/tasks/{id}", put(update_task).delete(delete_task))
            .with_state(self.clone())
    }
}

pub fn app() -> Router {
    Backend::new().router()
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, Backend::new()).await
}

pub async fn serve(listener: TcpListener, backend: Backend) -> Result<(), std::io::Error> {
    axum::serve(listener, backend.router()).await
}

/// Error response in the backend's `{"detail": ...}` shape.
pub struct ApiFailure {
    status: StatusCode,
    detail: &'static str,
}

fn fail(status: StatusCode, detail: &'static str) -> ApiFailure {
    ApiFailure { status, detail }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiFailure>;

/// Host used in invite links when the request carries no `Host` header.
const DEFAULT_HOST: &str = "127.0.0.1:8000";

/// Caller identified by a valid `Authorization: Bearer` header.
pub struct AuthUser(pub i64);

impl FromRequestParts<Backend> for AuthUser {
    type Rejection = ApiFailure;

    async fn from_request_parts(parts: &mut Parts, backend: &Backend) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authenticated"))?;
        let store = backend.store.read().await;
        store
            .sessions
            .get(token)
            .copied()
            .map(AuthUser)
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
    }
}

// --- auth ---

async fn register(State(backend): State<Backend>, Json(input): Json<Register>) -> ApiResult<User> {
    let mut store = backend.store.write().await;
    if store.accounts.values().any(|a| a.user.email == input.email) {
        return Err(fail(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    let user = User {
        id: store.next_id(),
        email: input.email,
    };
    store.accounts.insert(
        user.id,
        Account {
            user: user.clone(),
            username: input.username,
            password: input.password,
        },
    );
    info!(user_id = user.id, "user registered");
    Ok(Json(user))
}

async fn login(State(backend): State<Backend>, Json(input): Json<Login>) -> ApiResult<serde_json::Value> {
    let mut store = backend.store.write().await;
    let account = store
        .accounts
        .values()
        .find(|a| a.user.email == input.email)
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "Email incorrect"))?;
    if account.password != input.password {
        return Err(fail(StatusCode::BAD_REQUEST, "Password incorrect"));
    }
    let user_id = account.user.id;
    let token = Uuid::new_v4().simple().to_string();
    store.sessions.insert(token.clone(), user_id);
    info!(user_id, "session issued");
    Ok(Json(json!({ "access_token": token, "token_type": "bearer" })))
}

// --- users ---

async fn list_users(State(backend): State<Backend>, AuthUser(_): AuthUser) -> Json<Vec<User>> {
    let store = backend.store.read().await;
    Json(store.accounts.values().map(|a| a.user.clone()).collect())
}

async fn get_user(State(backend): State<Backend>, AuthUser(_): AuthUser, Path(id): Path<i64>) -> ApiResult<User> {
    let store = backend.store.read().await;
    store
        .accounts
        .get(&id)
        .map(|a| Json(a.user.clone()))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "User not found"))
}

// --- groups ---

async fn list_groups(State(backend): State<Backend>, AuthUser(user_id): AuthUser) -> Json<Vec<Group>> {
    let store = backend.store.read().await;
    let groups = store
        .groups
        .values()
        .filter(|g| store.memberships.iter().any(|m| m.group_id == g.id && m.user_id == user_id))
        .cloned()
        .collect();
    Json(groups)
}

async fn create_group(
    State(backend): State<Backend>,
    AuthUser(user_id): AuthUser,
    Json(input): Json<CreateGroup>,
) -> Json<Group> {
    let mut store = backend.store.write().await;
    let group = Group {
        id: store.next_id(),
        name: input.name,
        owner_id: user_id,
    };
    store.groups.insert(group.id, group.clone());
    let membership_id = store.next_id();
    store.memberships.push(Membership {
        id: membership_id,
        user_id,
        group_id: group.id,
        role: "admin".to_string(),
    });
    info!(group_id = group.id, owner_id = user_id, "group created");
    Json(group)
}

async fn get_group(
    State(backend): State<Backend>,
    AuthUser(_): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<GroupDetail> {
    let store = backend.store.read().await;
    let group = store
        .groups
        .get(&id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Group not found"))?;
    Ok(Json(GroupDetail {
        id: group.id,
        name: group.name.clone(),
        owner_id: group.owner_id,
        members: store.members_of(id),
    }))
}

async fn list_members(
    State(backend): State<Backend>,
    AuthUser(_): AuthUser,
    Path(id): Path<i64>,
) -> Json<Vec<Member>> {
    let store = backend.store.read().await;
    Json(store.members_of(id))
}

async fn remove_member(
    State(backend): State<Backend>,
    AuthUser(user_id): AuthUser,
    Path((group_id, member_id)): Path<(i64, i64)>,
) -> ApiResult<serde_json::Value> {
    let mut store = backend.store.write().await;
    let group = store
        .groups
        .get(&group_id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Group not found"))?;
    if !store.can_manage(group, user_id) {
        return Err(fail(StatusCode::FORBIDDEN, "Only the owner or an admin can remove a member"));
    }
    let index = store
        .memberships
        .iter()
        .position(|m| m.group_id == group_id && m.user_id == member_id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Member not found"))?;
    store.memberships.remove(index);
    debug!(group_id, member_id, "member removed");
    Ok(Json(json!({ "message": "Member removed" })))
}

async fn generate_invite(
    State(backend): State<Backend>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<serde_json::Value> {
    let mut store = backend.store.write().await;
    let group = store
        .groups
        .get(&group_id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Group not found"))?;
    if !store.can_manage(group, user_id) {
        return Err(fail(StatusCode::FORBIDDEN, "Only the owner or an admin can invite"));
    }
    let token = Uuid::new_v4().simple().to_string();
    store.invites.push(InviteRecord {
        token: token.clone(),
        group_id,
        used: false,
    });
    debug!(group_id, "invite generated");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_HOST);
    Ok(Json(json!({
        "invite_link": format!("http://{host}/groups/join/{token}"),
        "token": token,
    })))
}

async fn join_group(
    State(backend): State<Backend>,
    AuthUser(user_id): AuthUser,
    Path(token): Path<String>,
) -> ApiResult<serde_json::Value> {
    let mut store = backend.store.write().await;
    let index = store
        .invites
        .iter()
        .position(|i| i.token == token && !i.used)
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "Invite invalid or already used"))?;
    let group_id = store.invites[index].group_id;
    if store
        .memberships
        .iter()
        .any(|m| m.group_id == group_id && m.user_id == user_id)
    {
        return Ok(Json(json!({ "message": "Already a member" })));
    }
    let membership_id = store.next_id();
    store.memberships.push(Membership {
        id: membership_id,
        user_id,
        group_id,
        role: "member".to_string(),
    });
    store.invites[index].used = true;
    info!(group_id, user_id, "joined group by invite");
    Ok(Json(json!({ "message": "Added to group" })))
}

// --- tasks ---

async fn create_task(
    State(backend): State<Backend>,
    AuthUser(_): AuthUser,
    Json(input): Json<CreateTask>,
) -> ApiResult<TaskResponse> {
    let mut store = backend.store.write().await;
    if let Some(group_id) = input.group_id {
        if !store.groups.contains_key(&group_id) {
            return Err(fail(StatusCode::NOT_FOUND, "Group not found"));
        }
    }
    let task = Task {
        id: store.next_id(),
        title: input.title,
        description: Some(input.description.unwrap_or_default()),
        deadline: input.deadline,
        status: initial_status(input.status),
        group_id: input.group_id,
        created_at: chrono::Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    };
    store.tasks.insert(task.id, task.clone());
    debug!(task_id = task.id, "task created");
    Ok(Json(store.task_response(&task)))
}

/// Missing key takes the schema default `pending`; `null` or an empty
/// string falls back to `todo`.
fn initial_status(status: Option<Option<String>>) -> String {
    match status {
        None => "pending".to_string(),
        Some(Some(status)) if !status.is_empty() => status,
        Some(_) => "todo".to_string(),
    }
}

async fn list_group_tasks(
    State(backend): State<Backend>,
    AuthUser(_): AuthUser,
    Path(group_id): Path<i64>,
) -> Json<Vec<TaskResponse>> {
    let store = backend.store.read().await;
    Json(
        store
            .tasks
            .values()
            .filter(|t| t.group_id == Some(group_id))
            .map(|t| store.task_response(t))
            .collect(),
    )
}

async fn update_task(
    State(backend): State<Backend>,
    AuthUser(_): AuthUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTask>,
) -> ApiResult<TaskResponse> {
    let mut store = backend.store.write().await;
    let task = store
        .tasks
        .get_mut(&id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Task not found"))?;
    if let Some(title) = input.title {
        task.title = title;
    }
    if let Some(description) = input.description {
        task.description = description;
    }
    if let Some(deadline) = input.deadline {
        task.deadline = deadline;
    }
    if let Some(status) = input.status {
        task.status = status;
    }
    let task = task.clone();
    Ok(Json(store.task_response(&task)))
}

async fn delete_task(
    State(backend): State<Backend>,
    AuthUser(_): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let mut store = backend.store.write().await;
    store
        .tasks
        .remove(&id)
        .map(|_| Json(json!({ "message": "Task deleted" })))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Task not found"))
}
