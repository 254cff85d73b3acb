//! Bearer token authentication
//!
//! Sessions are issued by the dashboard's identity service; this server only
//! verifies HS256 JWTs signed with the shared `JWT_SECRET`. The `sub` claim is
//! the user id every owner-scoped query is filtered by.

pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::JwtKeys;
pub use middleware::{auth_middleware, AuthState};
pub use models::{AuthUser, ConnectStateClaims, JwtClaims};
