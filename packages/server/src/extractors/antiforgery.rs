//! Double-submit anti-forgery tokens.
//!
//! Form GETs hand out a random token both in the response body and in a
//! cookie. The matching POST must echo the token in the `X-CSRF-Token`
//! header or in the `__RequestVerificationToken` form field.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::AppError;

pub const COOKIE_NAME: &str = "autorealm_csrf";
pub const HEADER_NAME: &str = "x-csrf-token";
pub const FORM_FIELD: &str = "__RequestVerificationToken";

const TOKEN_BYTES: usize = 32;

/// Anti-forgery state of the current request.
#[derive(Debug, Clone)]
pub struct AntiForgery {
    cookie_token: Option<String>,
    header_token: Option<String>,
}

impl AntiForgery {
    /// Token to embed in a form, reusing the client's cookie when it has one.
    ///
    /// The returned jar must be part of the response so the cookie is set.
    pub fn issue(&self, jar: CookieJar) -> (CookieJar, String) {
        if let Some(token) = &self.cookie_token {
            return (jar, token.clone());
        }

        let token = hex::encode(rand::random::<[u8; TOKEN_BYTES]>());
        let cookie = Cookie::build((COOKIE_NAME, token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict);
        (jar.add(cookie), token)
    }

    /// Check the submitted token against the cookie. The header wins over the form field.
    pub fn verify(&self, form_token: Option<&str>) -> Result<(), AppError> {
        let expected = self.cookie_token.as_deref().ok_or(AppError::AntiForgery)?;
        let submitted = self
            .header_token
            .as_deref()
            .or(form_token)
            .ok_or(AppError::AntiForgery)?;

        if constant_time_eq(expected.as_bytes(), submitted.as_bytes()) {
            Ok(())
        } else {
            Err(AppError::AntiForgery)
        }
    }
}

impl<S> FromRequestParts<S> for AntiForgery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie_token = jar
            .get(COOKIE_NAME)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty());
        let header_token = parts
            .headers
            .get(HEADER_NAME)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(AntiForgery {
            cookie_token,
            header_token,
        })
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
