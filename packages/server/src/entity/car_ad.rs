use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "car_ad")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: i64,   // whole currency units
    pub mileage: i32, // in kilometers
    pub city: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Raw image bytes, never empty.
    pub photo: Vec<u8>,
    pub photo_content_type: Option<String>,

    pub owner_id: i32,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
