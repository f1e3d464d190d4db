//! Authentication infrastructure module
//!
//! Validates the session tokens issued by the hosted auth backend.

mod jwt;

pub use jwt::{JwtClaims, JwtConfig, JwtService, SessionValidator};
