use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;

use crate::error::AppError;
use crate::extractors::antiforgery::FORM_FIELD;
use crate::models::car_ad::{CarAdForm, FieldError, PhotoUpload, fields};

/// A car-ad form as bound from a multipart body.
///
/// Field-level binding problems (a year that is not a number, an oversized
/// photo) are collected in `errors` so the form can be shown again with the
/// submitted values. Broken multipart framing is an `AppError` instead.
#[derive(Debug, Default)]
pub struct CarAdSubmission {
    pub form: CarAdForm,
    pub photo: Option<PhotoUpload>,
    pub antiforgery_token: Option<String>,
    pub errors: Vec<FieldError>,
}

impl CarAdSubmission {
    fn has_error_on(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Bind the ad fields and the file in `photo_field` from `multipart`.
///
/// Once the photo is known to be too large, running into the request body
/// limit ends binding and the fields read so far are kept.
pub async fn read_car_ad_submission(
    multipart: &mut Multipart,
    photo_field: &str,
    max_photo_size: usize,
) -> Result<CarAdSubmission, AppError> {
    let mut submission = CarAdSubmission::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if hit_body_limit(&e) && submission.has_error_on(photo_field) => break,
            Err(e) => return Err(multipart_error(e)),
        };
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == photo_field {
            match read_photo(field, max_photo_size).await? {
                Ok(photo) => submission.photo = photo,
                Err(message) => submission
                    .errors
                    .push(FieldError::new(photo_field, message)),
            }
            continue;
        }

        let text = match field.text().await {
            Ok(text) => text,
            Err(e) if hit_body_limit(&e) && submission.has_error_on(photo_field) => break,
            Err(e) => return Err(multipart_error(e)),
        };

        let form = &mut submission.form;
        match name.as_str() {
            fields::ID => form.id = text.trim().parse().ok(),
            fields::BRAND => form.brand = text,
            fields::MODEL => form.model = text,
            fields::CITY => form.city = text,
            fields::DESCRIPTION => form.description = Some(text),
            fields::YEAR => form.year = bind_number(&text, "Year", &mut submission.errors),
            fields::PRICE => form.price = bind_number(&text, "Price", &mut submission.errors),
            fields::MILEAGE => {
                form.mileage = bind_number(&text, "Mileage", &mut submission.errors)
            }
            FORM_FIELD => submission.antiforgery_token = Some(text),
            _ => {} // Ignore unknown fields.
        }
    }

    Ok(submission)
}

fn hit_body_limit(err: &MultipartError) -> bool {
    err.status() == StatusCode::PAYLOAD_TOO_LARGE
}

fn multipart_error(err: MultipartError) -> AppError {
    if hit_body_limit(&err) {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(format!("Multipart error: {}", err.body_text()))
    }
}

fn photo_too_large(max_size: usize) -> String {
    format!("Photo exceeds maximum size of {max_size} bytes.")
}

/// Read an uploaded file into memory, giving up once it passes `max_size`.
///
/// The outer `Result` carries transport failures, the inner one a
/// user-facing message about the file itself. The unread rest of an
/// oversized file is skipped by the next `next_field` call.
async fn read_photo(
    mut field: Field<'_>,
    max_size: usize,
) -> Result<Result<Option<PhotoUpload>, String>, AppError> {
    let content_type = field
        .content_type()
        .map(str::to_string)
        .or_else(|| {
            field
                .file_name()
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|m| m.to_string())
        });

    let mut bytes = Vec::new();
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) if hit_body_limit(&e) => return Ok(Err(photo_too_large(max_size))),
            Err(e) => return Err(multipart_error(e)),
        };
        if bytes.len() + chunk.len() > max_size {
            return Ok(Err(photo_too_large(max_size)));
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Ok(Ok(None));
    }
    Ok(Ok(Some(PhotoUpload {
        bytes,
        content_type,
    })))
}

/// Parse an optional number. Blank input is `None`; garbage is `None` plus a field error.
fn bind_number<T: std::str::FromStr>(
    raw: &str,
    label: &str,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(FieldError::new(
                label.to_lowercase(),
                format!("The value '{raw}' is not valid for {label}."),
            ));
            None
        }
    }
}
