//! REST and SSE surface of the training hub (`http-server` feature).
//!
//! Every `/v1` route authenticates a bearer token through [`extract::CurrentUser`]
//! and checks the permission its operation needs before calling into
//! [`crate::db::services`] or [`crate::services`]. Successful mutations are
//! published on the change feed that `GET /v1/changes` streams.
//!
//! ```text
//! request ─► router (trace, cors, gzip, body limit)
//!              └► handler ─► CurrentUser / Lang / Path / Query / Json
//!                    ├► service functions ─► FullRepository
//!                    └► ChangeFeed::publish
//! ```
//!
//! Errors leave as `{code, message, details?}` via [`error::AppError`].

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
