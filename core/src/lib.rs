//! Asynchronous API client for the taskboard service (groups, invites, tasks).
//!
//! # Overview
//! Every domain operation is a fixed method, path and optional JSON body
//! sent through one `TaskboardClient::request`, which attaches the bearer
//! token, prefixes the backend origin, and handles session expiry.
//!
//! # Design
//! - Token storage and navigation sit behind the `SessionContext` trait;
//!   `MemorySession` and `FileSession` are provided.
//! - I/O sits behind the `Transport` trait; `ReqwestTransport` is the
//!   network implementation, tests substitute a recording fake.
//! - A missing or rejected token is not an error: `request` returns
//!   `RequestOutcome::AuthRequired`, list operations return an empty `Vec`
//!   and single-item operations return `None`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod transport;
pub mod types;

pub use client::TaskboardClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestOutcome};
pub use session::{FileSession, MemorySession, SessionContext};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    AccessToken, Acknowledgement, Group, GroupDetail, Invite, LoginRequest, Member, NewGroup, NewTask,
    RegisterRequest, Task, TaskUpdate, User,
};
