//! Read-only brand to model lookup table.
//!
//! Built once at startup from configuration and shared through `AppState`.
//! Brand order is preserved because it drives the order of form options.

use crate::config::{BrandConfig, CatalogConfig};

const BUILTIN: &[(&str, &[&str])] = &[
    ("Rolls-Royce", &["Ghost", "Phantom Series II", "Spectre"]),
    ("Porsche", &["911", "Cayenne", "Panamera"]),
    ("Ford", &["Fiesta", "Focus", "Mustang"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandModels {
    pub brand: String,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandCatalog {
    entries: Vec<BrandModels>,
}

impl BrandCatalog {
    pub fn new(entries: Vec<BrandModels>) -> Self {
        Self { entries }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|(brand, models)| BrandModels {
                    brand: (*brand).to_string(),
                    models: models.iter().map(|m| (*m).to_string()).collect(),
                })
                .collect(),
        )
    }

    /// Use the configured brands, or the built-in table when none are configured.
    pub fn from_config(config: &CatalogConfig) -> Self {
        if config.brands.is_empty() {
            return Self::builtin();
        }
        Self::new(
            config
                .brands
                .iter()
                .map(|BrandConfig { name, models }| BrandModels {
                    brand: name.clone(),
                    models: models.clone(),
                })
                .collect(),
        )
    }

    pub fn brands(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.brand.clone()).collect()
    }

    /// Models for `brand`, empty when the brand is unknown. Matching is case-sensitive.
    pub fn models_for(&self, brand: &str) -> &[String] {
        self.entries
            .iter()
            .find(|e| e.brand == brand)
            .map(|e| e.models.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, brand: &str, model: &str) -> bool {
        self.models_for(brand).iter().any(|m| m == model)
    }
}

impl Default for BrandCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
