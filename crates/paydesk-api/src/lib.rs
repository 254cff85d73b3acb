//! Paydesk API Library
//!
//! HTTP handlers, authentication, payment and reconciliation services, and
//! application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod services;
pub mod setup;

pub mod auth;
pub mod error;
pub mod state;

pub use error::ErrorResponse;
