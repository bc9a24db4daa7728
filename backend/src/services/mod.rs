//! Service layer for business logic beyond plain CRUD.
//!
//! CRUD orchestration lives in [`crate::db::services`]; the modules here
//! derive views (calendar, compliance, filtered lists), run multi-step
//! workflows (plan conversion) and own the process-wide auth and change-feed
//! state.

pub mod auth;
pub mod calendar;
pub mod changes;
pub mod compliance;
pub mod filtering;
pub mod i18n;
pub mod permissions;
pub mod planning;
pub mod scheduling;

pub use auth::{AuthConfig, AuthContext, AuthError, Authenticator};
pub use changes::{ChangeAction, ChangeEvent, ChangeFeed, ChangeTable};
pub use i18n::Language;
