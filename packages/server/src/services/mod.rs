pub mod car_ad;
pub mod identity;
