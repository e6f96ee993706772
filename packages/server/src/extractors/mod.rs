pub mod antiforgery;
pub mod auth;
pub mod json;
