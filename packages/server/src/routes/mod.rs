use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn car_ad_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let pages = OpenApiRouter::new()
        .routes(routes!(handlers::car_ad::list_car_ads))
        .routes(routes!(handlers::car_ad::home))
        .routes(routes!(handlers::car_ad::car_ad_details))
        .routes(routes!(handlers::car_ad::models_for_brand))
        .routes(routes!(
            handlers::car_ad::delete_confirm,
            handlers::car_ad::delete_car_ad
        ))
        .routes(routes!(handlers::car_ad::car_ad_photo));

    let uploads = OpenApiRouter::new()
        .routes(routes!(
            handlers::car_ad::create_form,
            handlers::car_ad::create_car_ad
        ))
        .routes(routes!(
            handlers::car_ad::edit_form,
            handlers::car_ad::edit_car_ad
        ))
        .layer(handlers::car_ad::car_ad_upload_body_limit(&config.listing));

    pages.merge(uploads)
}

pub fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}
