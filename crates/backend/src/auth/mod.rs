//! Authentication: JWT issuing/validation, password hashing, and the
//! bearer-token middleware guarding the API routes.

pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod types;

pub use types::{AuthConfig, AuthUser};
