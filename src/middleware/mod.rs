//! Middleware module
//!
//! Contains Tower middleware for authentication.

pub mod auth;
