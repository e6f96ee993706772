use axum::Json;
use axum::extract::rejection::FormRejection;
use axum::extract::{DefaultBodyLimit, Form, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::instrument;

use crate::config::ListingConfig;
use crate::error::{AppError, ErrorBody};
use crate::extractors::antiforgery::AntiForgery;
use crate::extractors::auth::AuthUser;
use crate::models::car_ad::{
    CarAdDetailResponse, CarAdForm, CarAdFormView, CarAdListResponse, CarAdResponse,
    DeleteConfirmView, DeleteForm, FieldError, ModelsQuery, fields,
};
use crate::services::car_ad::ListingError;
use crate::services::identity::resolve_current_user;
use crate::state::AppState;
use crate::utils::multipart::read_car_ad_submission;

const LIST_ROUTE: &str = "/car-ads";

/// Room for the text fields next to the photo.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn car_ad_upload_body_limit(listing: &ListingConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(listing.max_photo_size.saturating_add(FORM_OVERHEAD))
}

/// Route ids that do not parse can never match a record.
fn parse_id(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

/// Build the create/edit form view, handing out an anti-forgery token.
fn form_response(
    status: StatusCode,
    state: &AppState,
    antiforgery: &AntiForgery,
    jar: CookieJar,
    ad: CarAdForm,
    errors: Vec<FieldError>,
) -> Response {
    let (jar, antiforgery_token) = antiforgery.issue(jar);
    let models = state.catalog.models_for(&ad.brand).to_vec();
    let view = CarAdFormView {
        ad,
        brands: state.catalog.brands(),
        models,
        errors,
        antiforgery_token,
    };
    (status, jar, Json(view)).into_response()
}

/// Turn a failed create or edit into a form redisplay, or an error response.
fn listing_failure(
    err: ListingError,
    state: &AppState,
    antiforgery: &AntiForgery,
    jar: CookieJar,
    ad: CarAdForm,
) -> Response {
    let (status, error) = match err {
        ListingError::Validation { field, message } => {
            (StatusCode::UNPROCESSABLE_ENTITY, FieldError::new(field, message))
        }
        err @ ListingError::Unauthorized => {
            (StatusCode::UNPROCESSABLE_ENTITY, FieldError::new("", err.to_string()))
        }
        err @ ListingError::ConcurrencyConflict => {
            (StatusCode::CONFLICT, FieldError::new("", err.to_string()))
        }
        other => return AppError::from(other).into_response(),
    };
    form_response(status, state, antiforgery, jar, ad, vec![error])
}

async fn list_response(state: &AppState) -> Result<Json<CarAdListResponse>, AppError> {
    let data = state.car_ads().list_all().await?;
    let total = data.len() as u64;
    Ok(Json(CarAdListResponse { data, total }))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Car Ads",
    operation_id = "listCarAds",
    summary = "List all car ads",
    description = "Returns every ad ordered by ID. Photos are not inlined; use `photo_url`.",
    responses(
        (status = 200, description = "All car ads", body = CarAdListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_car_ads(
    State(state): State<AppState>,
) -> Result<Json<CarAdListResponse>, AppError> {
    list_response(&state).await
}

#[utoipa::path(
    get,
    path = "/home",
    tag = "Car Ads",
    operation_id = "homeCarAds",
    summary = "Home page listing",
    description = "Same data as the main listing.",
    responses(
        (status = 200, description = "All car ads", body = CarAdListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<Json<CarAdListResponse>, AppError> {
    list_response(&state).await
}

#[utoipa::path(
    get,
    path = "/details/{id}",
    tag = "Car Ads",
    operation_id = "getCarAdDetails",
    summary = "Get a car ad with its owner",
    params(("id" = String, Path, description = "Car ad ID")),
    responses(
        (status = 200, description = "Car ad details", body = CarAdDetailResponse),
        (status = 404, description = "Car ad not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn car_ad_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CarAdDetailResponse>, AppError> {
    let (ad, owner) = state.car_ads().get_detail(parse_id(&id)).await?;
    Ok(Json(CarAdDetailResponse {
        ad: CarAdResponse::from(ad),
        owner: owner.map(Into::into),
    }))
}

#[utoipa::path(
    get,
    path = "/models",
    tag = "Car Ads",
    operation_id = "getModelsForBrand",
    summary = "List models offered for a brand",
    description = "Unknown or missing brands yield an empty array. Matching is case-sensitive.",
    params(ModelsQuery),
    responses(
        (status = 200, description = "Model names in display order", body = Vec<String>),
    ),
)]
#[instrument(skip(state, query), fields(brand = query.brand.as_deref()))]
pub async fn models_for_brand(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> Json<Vec<String>> {
    let brand = query.brand.unwrap_or_default();
    Json(state.car_ads().models_for_brand(&brand))
}

#[utoipa::path(
    get,
    path = "/create",
    tag = "Car Ads",
    operation_id = "createCarAdForm",
    summary = "Empty create form",
    description = "Returns brand options and an anti-forgery token. Also sets the anti-forgery cookie.",
    responses(
        (status = 200, description = "Create form", body = CarAdFormView),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, antiforgery, jar), fields(user_id = auth_user.user_id))]
pub async fn create_form(
    auth_user: AuthUser,
    State(state): State<AppState>,
    antiforgery: AntiForgery,
    jar: CookieJar,
) -> Response {
    form_response(
        StatusCode::OK,
        &state,
        &antiforgery,
        jar,
        CarAdForm::default(),
        Vec::new(),
    )
}

#[utoipa::path(
    post,
    path = "/create",
    tag = "Car Ads",
    operation_id = "createCarAd",
    summary = "Create a car ad",
    description = "Multipart form with the ad fields and a required `photo` file. \
        An empty `description` is stored as the configured placeholder. \
        The owner is always the caller.",
    request_body(content_type = "multipart/form-data", description = "Ad fields, `photo` and `__RequestVerificationToken`"),
    responses(
        (status = 303, description = "Created; redirects to the listing"),
        (status = 400, description = "Bad anti-forgery token (ANTIFORGERY_INVALID) or malformed body (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "Request body over the upload limit (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 422, description = "Form redisplayed with errors", body = CarAdFormView),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, antiforgery, jar, multipart), fields(user_id = auth_user.user_id))]
pub async fn create_car_ad(
    auth_user: AuthUser,
    State(state): State<AppState>,
    antiforgery: AntiForgery,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut submission = read_car_ad_submission(
        &mut multipart,
        fields::PHOTO,
        state.config.listing.max_photo_size,
    )
    .await?;
    antiforgery.verify(submission.antiforgery_token.as_deref())?;
    state.car_ads().fill_default_description(&mut submission.form);

    if !submission.errors.is_empty() {
        return Ok(form_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &state,
            &antiforgery,
            jar,
            submission.form,
            submission.errors,
        ));
    }

    let caller = resolve_current_user(&state.db, &auth_user)
        .await?
        .map(|user| user.id);

    match state
        .car_ads()
        .create(submission.form.clone(), submission.photo, caller)
        .await
    {
        Ok(_) => Ok(Redirect::to(LIST_ROUTE).into_response()),
        Err(err) => Ok(listing_failure(
            err,
            &state,
            &antiforgery,
            jar,
            submission.form,
        )),
    }
}

#[utoipa::path(
    get,
    path = "/edit/{id}",
    tag = "Car Ads",
    operation_id = "editCarAdForm",
    summary = "Pre-filled edit form",
    params(("id" = String, Path, description = "Car ad ID")),
    responses(
        (status = 200, description = "Edit form", body = CarAdFormView),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Car ad not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, antiforgery, jar), fields(user_id = auth_user.user_id))]
pub async fn edit_form(
    auth_user: AuthUser,
    State(state): State<AppState>,
    antiforgery: AntiForgery,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let ad = state.car_ads().get_for_edit(parse_id(&id)).await?;
    Ok(form_response(
        StatusCode::OK,
        &state,
        &antiforgery,
        jar,
        CarAdForm::from(&ad),
        Vec::new(),
    ))
}

#[utoipa::path(
    post,
    path = "/edit/{id}",
    tag = "Car Ads",
    operation_id = "editCarAd",
    summary = "Update a car ad",
    description = "Multipart form with the ad fields, the matching `id` and an optional `newPhoto`. \
        Without `newPhoto` the stored photo is kept. The ad is reassigned to the caller \
        unless `listing.preserve_owner_on_edit` is set.",
    params(("id" = String, Path, description = "Car ad ID")),
    request_body(content_type = "multipart/form-data", description = "Ad fields, optional `newPhoto` and `__RequestVerificationToken`"),
    responses(
        (status = 303, description = "Updated; redirects to the listing"),
        (status = 400, description = "Bad anti-forgery token (ANTIFORGERY_INVALID) or malformed body (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "Request body over the upload limit (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Route and body IDs differ (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Ad changed concurrently; form redisplayed", body = CarAdFormView),
        (status = 422, description = "Form redisplayed with errors", body = CarAdFormView),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, antiforgery, jar, multipart), fields(user_id = auth_user.user_id))]
pub async fn edit_car_ad(
    auth_user: AuthUser,
    State(state): State<AppState>,
    antiforgery: AntiForgery,
    jar: CookieJar,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let id = parse_id(&id).ok_or(ListingError::NotFound)?;

    let mut submission = read_car_ad_submission(
        &mut multipart,
        fields::NEW_PHOTO,
        state.config.listing.max_photo_size,
    )
    .await?;
    antiforgery.verify(submission.antiforgery_token.as_deref())?;
    state.car_ads().fill_default_description(&mut submission.form);

    if submission.form.id != Some(id) {
        return Err(ListingError::NotFound.into());
    }

    if !submission.errors.is_empty() {
        return Ok(form_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &state,
            &antiforgery,
            jar,
            submission.form,
            submission.errors,
        ));
    }

    let Some(caller) = resolve_current_user(&state.db, &auth_user).await? else {
        return Ok(listing_failure(
            ListingError::Unauthorized,
            &state,
            &antiforgery,
            jar,
            submission.form,
        ));
    };

    match state
        .car_ads()
        .edit(id, submission.form.clone(), submission.photo, caller.id)
        .await
    {
        Ok(_) => Ok(Redirect::to(LIST_ROUTE).into_response()),
        Err(err) => Ok(listing_failure(
            err,
            &state,
            &antiforgery,
            jar,
            submission.form,
        )),
    }
}

#[utoipa::path(
    get,
    path = "/delete/{id}",
    tag = "Car Ads",
    operation_id = "deleteCarAdConfirm",
    summary = "Delete confirmation",
    params(("id" = String, Path, description = "Car ad ID")),
    responses(
        (status = 200, description = "Ad to confirm", body = DeleteConfirmView),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Car ad not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, antiforgery, jar), fields(user_id = auth_user.user_id))]
pub async fn delete_confirm(
    auth_user: AuthUser,
    State(state): State<AppState>,
    antiforgery: AntiForgery,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ad = state.car_ads().get_for_delete(parse_id(&id)).await?;
    let (jar, antiforgery_token) = antiforgery.issue(jar);
    Ok((
        jar,
        Json(DeleteConfirmView {
            ad: CarAdResponse::from(ad),
            antiforgery_token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/delete/{id}",
    tag = "Car Ads",
    operation_id = "deleteCarAd",
    summary = "Delete a car ad",
    description = "Deleting an unknown ID is not an error.",
    params(("id" = String, Path, description = "Car ad ID")),
    request_body(content_type = "application/x-www-form-urlencoded", description = "`__RequestVerificationToken`, unless sent as `X-CSRF-Token`"),
    responses(
        (status = 303, description = "Deleted; redirects to the listing"),
        (status = 400, description = "Bad anti-forgery token (ANTIFORGERY_INVALID)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, antiforgery, form), fields(user_id = auth_user.user_id))]
pub async fn delete_car_ad(
    auth_user: AuthUser,
    State(state): State<AppState>,
    antiforgery: AntiForgery,
    Path(id): Path<String>,
    form: Result<Form<DeleteForm>, FormRejection>,
) -> Result<Redirect, AppError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    antiforgery.verify(form.antiforgery_token.as_deref())?;

    if let Some(id) = parse_id(&id) {
        state.car_ads().delete_confirmed(id).await?;
    }
    Ok(Redirect::to(LIST_ROUTE))
}

#[utoipa::path(
    get,
    path = "/{id}/photo",
    tag = "Car Ads",
    operation_id = "getCarAdPhoto",
    summary = "Download the ad photo",
    params(("id" = String, Path, description = "Car ad ID")),
    responses(
        (status = 200, description = "Raw image bytes", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 404, description = "Car ad not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn car_ad_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (bytes, content_type) = state.car_ads().photo(parse_id(&id)).await?;
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
