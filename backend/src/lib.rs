//! # Training Hub Backend
//!
//! Training administration for a transport company.
//!
//! This crate keeps the records behind the training planner: employees and
//! their availability, the course catalog, scheduled trainings with their
//! participants, the certificates (licenses) employees hold and the Code 95
//! continuing-education points drivers collect. It exposes a REST API via
//! Axum for the SPA frontend.
//!
//! ## Features
//!
//! - **Scheduling**: Multi-session trainings, capacity and availability checks
//! - **Completion**: Code 95 points and licenses issued on completion
//! - **Compliance**: License expiry and Code 95 cycle progress per employee
//! - **Planning**: Preliminary plans, candidate suggestions, conversion into trainings
//! - **Access**: Bearer-token sessions with role-based permissions
//! - **Realtime**: Change notifications over Server-Sent Events
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Identifier types and the public domain re-exports
//! - [`models`]: Domain records and their drafts
//! - [`db`]: Repository pattern, persistence backends and CRUD services
//! - [`services`]: Business logic on top of the repository
//! - [`config`]: Server configuration from the environment
//! - [`http`]: Axum-based HTTP server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod config;

pub mod db;
pub mod models;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
