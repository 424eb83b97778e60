//! Piazza: a multi-author publishing server.
//!
//! Posts are organized by category and location, readers comment, and
//! authors keep exclusive control over their own content. The layers are
//! `domain` (records and access rules), `application` (services and
//! repository traits), `infra` (Postgres adapters and the HTTP surface)
//! and `presentation` (askama views).

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
