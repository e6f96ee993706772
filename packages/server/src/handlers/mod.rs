pub mod auth;
pub mod car_ad;
