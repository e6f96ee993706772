use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::entity::{car_ad, user};

/// Form field names shared by the create and edit forms.
pub mod fields {
    pub const ID: &str = "id";
    pub const BRAND: &str = "brand";
    pub const MODEL: &str = "model";
    pub const YEAR: &str = "year";
    pub const PRICE: &str = "price";
    pub const MILEAGE: &str = "mileage";
    pub const CITY: &str = "city";
    pub const DESCRIPTION: &str = "description";
    /// File field on the create form.
    pub const PHOTO: &str = "photo";
    /// File field on the edit form.
    pub const NEW_PHOTO: &str = "newPhoto";
}

/// Editable ad fields as bound from a submitted form.
///
/// Numeric fields are optional so a partially filled form can be sent back
/// to the client unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CarAdForm {
    /// Ad ID. Ignored on create, must match the route on edit.
    #[schema(example = 12)]
    pub id: Option<i32>,
    #[schema(example = "Porsche")]
    pub brand: String,
    #[schema(example = "911")]
    pub model: String,
    #[schema(example = 2019)]
    pub year: Option<i32>,
    #[schema(example = 89000)]
    pub price: Option<i64>,
    #[schema(example = 42000)]
    pub mileage: Option<i32>,
    #[schema(example = "Stuttgart")]
    pub city: String,
    #[schema(example = "Garage kept, full service history")]
    pub description: Option<String>,
}

impl From<&car_ad::Model> for CarAdForm {
    fn from(model: &car_ad::Model) -> Self {
        Self {
            id: Some(model.id),
            brand: model.brand.clone(),
            model: model.model.clone(),
            year: Some(model.year),
            price: Some(model.price),
            mileage: Some(model.mileage),
            city: model.city.clone(),
            description: Some(model.description.clone()),
        }
    }
}

/// An uploaded photo held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// A validation message attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct FieldError {
    /// Offending form field, or empty for form-level errors.
    #[schema(example = "photo")]
    pub field: String,
    #[schema(example = "Photo is required.")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Everything needed to show the create or edit form.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CarAdFormView {
    pub ad: CarAdForm,
    /// Brand options, in display order.
    pub brands: Vec<String>,
    /// Model options for the currently selected brand.
    pub models: Vec<String>,
    pub errors: Vec<FieldError>,
    /// Echo back as `__RequestVerificationToken` or `X-CSRF-Token` on submit.
    pub antiforgery_token: String,
}

/// Row of the ad listing. The photo is served separately.
#[derive(Debug, Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct CarAdListItem {
    pub id: i32,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: i64,
    pub mileage: i32,
    pub city: String,
    pub description: String,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CarAdListResponse {
    pub data: Vec<CarAdListItem>,
    pub total: u64,
}

/// A single ad without its photo bytes.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CarAdResponse {
    pub id: i32,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: i64,
    pub mileage: i32,
    pub city: String,
    pub description: String,
    pub owner_id: i32,
    /// Relative URL of the photo.
    #[schema(example = "/car-ads/12/photo")]
    pub photo_url: String,
    #[schema(example = "image/jpeg")]
    pub photo_content_type: Option<String>,
    pub photo_size: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<car_ad::Model> for CarAdResponse {
    fn from(model: car_ad::Model) -> Self {
        Self {
            photo_url: format!("/car-ads/{}/photo", model.id),
            photo_size: model.photo.len(),
            id: model.id,
            brand: model.brand,
            model: model.model,
            year: model.year,
            price: model.price,
            mileage: model.mileage,
            city: model.city,
            description: model.description,
            owner_id: model.owner_id,
            photo_content_type: model.photo_content_type,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OwnerResponse {
    pub id: i32,
    pub username: String,
}

impl From<user::Model> for OwnerResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// Detail view: the ad and its resolved owner.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CarAdDetailResponse {
    pub ad: CarAdResponse,
    pub owner: Option<OwnerResponse>,
}

/// Delete confirmation view.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteConfirmView {
    pub ad: CarAdResponse,
    pub antiforgery_token: String,
}

/// Urlencoded body of the delete confirmation POST.
#[derive(Deserialize, Default)]
pub struct DeleteForm {
    #[serde(rename = "__RequestVerificationToken")]
    pub antiforgery_token: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ModelsQuery {
    /// Brand to look up. Unknown or missing brands yield an empty list.
    pub brand: Option<String>,
}
