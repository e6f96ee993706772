//! Car-ad listing workflow: list, detail, create, edit, delete and the
//! brand/model lookup.
//!
//! The service owns the rules; handlers only bind requests and shape
//! responses. Ids arrive as `Option<i32>` because a missing or malformed
//! route id behaves exactly like an id with no matching record.

use chrono::Utc;
use sea_orm::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::BrandCatalog;
use crate::config::ListingConfig;
use crate::entity::{car_ad, user};
use crate::models::car_ad::{CarAdForm, CarAdListItem, PhotoUpload, fields};

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Car ad not found")]
    NotFound,

    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("The current user could not be resolved")]
    Unauthorized,

    #[error("The car ad was changed or removed by someone else. Please submit again.")]
    ConcurrencyConflict,

    #[error(transparent)]
    Database(#[from] DbErr),
}

impl ListingError {
    fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ListingError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Form fields after validation.
struct ValidatedAd {
    brand: String,
    model: String,
    year: i32,
    price: i64,
    mileage: i32,
    city: String,
    description: String,
}

pub struct CarAdService<'a> {
    db: &'a DatabaseConnection,
    catalog: &'a BrandCatalog,
    settings: &'a ListingConfig,
}

impl<'a> CarAdService<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        catalog: &'a BrandCatalog,
        settings: &'a ListingConfig,
    ) -> Self {
        Self {
            db,
            catalog,
            settings,
        }
    }

    /// All ads ordered by id, without photo bytes.
    pub async fn list_all(&self) -> Result<Vec<CarAdListItem>, ListingError> {
        let items = car_ad::Entity::find()
            .select_only()
            .column(car_ad::Column::Id)
            .column(car_ad::Column::Brand)
            .column(car_ad::Column::Model)
            .column(car_ad::Column::Year)
            .column(car_ad::Column::Price)
            .column(car_ad::Column::Mileage)
            .column(car_ad::Column::City)
            .column(car_ad::Column::Description)
            .column(car_ad::Column::OwnerId)
            .column(car_ad::Column::CreatedAt)
            .column(car_ad::Column::UpdatedAt)
            .order_by_asc(car_ad::Column::Id)
            .into_model::<CarAdListItem>()
            .all(self.db)
            .await?;
        Ok(items)
    }

    /// The ad together with its owner.
    pub async fn get_detail(
        &self,
        id: Option<i32>,
    ) -> Result<(car_ad::Model, Option<user::Model>), ListingError> {
        let id = id.ok_or(ListingError::NotFound)?;
        car_ad::Entity::find_by_id(id)
            .find_also_related(user::Entity)
            .one(self.db)
            .await?
            .ok_or(ListingError::NotFound)
    }

    pub fn brands(&self) -> Vec<String> {
        self.catalog.brands()
    }

    pub fn models_for_brand(&self, brand: &str) -> Vec<String> {
        self.catalog.models_for(brand).to_vec()
    }

    /// Store a new ad owned by `caller`.
    ///
    /// `caller` is the resolved user id; `None` aborts without writing.
    pub async fn create(
        &self,
        form: CarAdForm,
        photo: Option<PhotoUpload>,
        caller: Option<i32>,
    ) -> Result<car_ad::Model, ListingError> {
        let owner_id = caller.ok_or(ListingError::Unauthorized)?;

        let photo = photo
            .filter(|p| !p.bytes.is_empty())
            .ok_or_else(|| ListingError::validation(fields::PHOTO, "Photo is required."))?;

        let ad = self.validate(&form)?;
        let now = Utc::now();

        let new_ad = car_ad::ActiveModel {
            brand: Set(ad.brand),
            model: Set(ad.model),
            year: Set(ad.year),
            price: Set(ad.price),
            mileage: Set(ad.mileage),
            city: Set(ad.city),
            description: Set(ad.description),
            photo: Set(photo.bytes),
            photo_content_type: Set(photo.content_type),
            owner_id: Set(owner_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = new_ad.insert(self.db).await?;
        info!(ad_id = model.id, owner_id, "Car ad created");
        Ok(model)
    }

    /// Put the placeholder into an empty description, so a redisplayed form
    /// shows what would have been stored.
    pub fn fill_default_description(&self, form: &mut CarAdForm) {
        if form.description.as_deref().is_none_or(str::is_empty) {
            form.description = Some(self.settings.default_description.clone());
        }
    }

    /// The ad to pre-fill the edit form with.
    pub async fn get_for_edit(&self, id: Option<i32>) -> Result<car_ad::Model, ListingError> {
        self.find(id).await
    }

    /// Overwrite the ad's fields with the submitted form.
    ///
    /// Without a new photo the stored one is carried over. The ad is handed
    /// to `caller_id` unless `preserve_owner_on_edit` is set.
    pub async fn edit(
        &self,
        id: i32,
        form: CarAdForm,
        new_photo: Option<PhotoUpload>,
        caller_id: i32,
    ) -> Result<car_ad::Model, ListingError> {
        if form.id != Some(id) {
            return Err(ListingError::NotFound);
        }

        let ad = self.validate(&form)?;

        let mut active = car_ad::ActiveModel {
            id: Unchanged(id),
            brand: Set(ad.brand),
            model: Set(ad.model),
            year: Set(ad.year),
            price: Set(ad.price),
            mileage: Set(ad.mileage),
            city: Set(ad.city),
            description: Set(ad.description),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        match new_photo.filter(|p| !p.bytes.is_empty()) {
            Some(photo) => {
                active.photo = Set(photo.bytes);
                active.photo_content_type = Set(photo.content_type);
            }
            None => {
                if let Some((bytes, content_type)) = self.stored_photo(id).await? {
                    active.photo = Set(bytes);
                    active.photo_content_type = Set(content_type);
                }
            }
        }

        if !self.settings.preserve_owner_on_edit {
            active.owner_id = Set(caller_id);
        }

        match active.update(self.db).await {
            Ok(model) => {
                info!(ad_id = id, owner_id = model.owner_id, "Car ad updated");
                Ok(model)
            }
            Err(DbErr::RecordNotUpdated) => {
                warn!(ad_id = id, "Car ad vanished before the update was written");
                Err(ListingError::ConcurrencyConflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The ad to show on the delete confirmation page.
    pub async fn get_for_delete(&self, id: Option<i32>) -> Result<car_ad::Model, ListingError> {
        self.find(id).await
    }

    /// Remove the ad. Unknown ids are ignored.
    pub async fn delete_confirmed(&self, id: i32) -> Result<(), ListingError> {
        let result = car_ad::Entity::delete_by_id(id).exec(self.db).await?;
        if result.rows_affected == 0 {
            debug!(ad_id = id, "Delete of unknown car ad ignored");
        } else {
            info!(ad_id = id, "Car ad deleted");
        }
        Ok(())
    }

    pub async fn exists(&self, id: i32) -> Result<bool, ListingError> {
        let count = car_ad::Entity::find_by_id(id).count(self.db).await?;
        Ok(count > 0)
    }

    /// Photo bytes and MIME type of an ad.
    pub async fn photo(&self, id: Option<i32>) -> Result<(Vec<u8>, Option<String>), ListingError> {
        let id = id.ok_or(ListingError::NotFound)?;
        self.stored_photo(id).await?.ok_or(ListingError::NotFound)
    }

    async fn find(&self, id: Option<i32>) -> Result<car_ad::Model, ListingError> {
        let id = id.ok_or(ListingError::NotFound)?;
        car_ad::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(ListingError::NotFound)
    }

    async fn stored_photo(&self, id: i32) -> Result<Option<(Vec<u8>, Option<String>)>, DbErr> {
        car_ad::Entity::find_by_id(id)
            .select_only()
            .column(car_ad::Column::Photo)
            .column(car_ad::Column::PhotoContentType)
            .into_tuple::<(Vec<u8>, Option<String>)>()
            .one(self.db)
            .await
    }

    fn validate(&self, form: &CarAdForm) -> Result<ValidatedAd, ListingError> {
        let brand = form.brand.trim();
        if brand.is_empty() {
            return Err(ListingError::validation(fields::BRAND, "Brand is required."));
        }
        let model = form.model.trim();
        if model.is_empty() {
            return Err(ListingError::validation(fields::MODEL, "Model is required."));
        }
        if self.settings.enforce_brand_models && !self.catalog.contains(brand, model) {
            return Err(ListingError::validation(
                fields::MODEL,
                format!("Model '{model}' is not offered for brand '{brand}'."),
            ));
        }

        let year = form
            .year
            .ok_or_else(|| ListingError::validation(fields::YEAR, "Year is required."))?;
        let price = form
            .price
            .ok_or_else(|| ListingError::validation(fields::PRICE, "Price is required."))?;
        let mileage = form
            .mileage
            .ok_or_else(|| ListingError::validation(fields::MILEAGE, "Mileage is required."))?;

        let description = match form.description.as_deref() {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => self.settings.default_description.clone(),
        };

        Ok(ValidatedAd {
            brand: brand.to_string(),
            model: model.to_string(),
            year,
            price,
            mileage,
            city: form.city.trim().to_string(),
            description,
        })
    }
}
