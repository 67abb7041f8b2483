//! HTTP route handlers outside the auth module.

pub mod health;
