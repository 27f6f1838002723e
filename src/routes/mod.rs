//! HTTP route handlers outside the auth domain.
//!
//! Handlers are typed Rocket functions annotated with `#[openapi]` so
//! `rocket_okapi` can derive an OpenAPI document automatically; the auth
//! routes themselves live in `crate::auth::routes`.

pub mod health;
