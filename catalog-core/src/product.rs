//! Product entity, creation requests and partial updates.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A catalog item as held by every store.
///
/// `image_key` is an opaque blob reference; the empty string means the
/// product has no image and must never be handed to a resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub product_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_key: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub remaining_sku: u64,
}

impl Product {
    pub fn new(id: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_name: product_name.into(),
            description: String::new(),
            image_key: String::new(),
            price: 0.0,
            remaining_sku: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image_key(mut self, image_key: impl Into<String>) -> Self {
        self.image_key = image_key.into();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_remaining_sku(mut self, remaining_sku: u64) -> Self {
        self.remaining_sku = remaining_sku;
        self
    }

    /// Returns the image key if one is set.
    pub fn image_key(&self) -> Option<&str> {
        if self.image_key.is_empty() {
            None
        } else {
            Some(&self.image_key)
        }
    }

    /// Merge the named fields of `patch` into this product.
    ///
    /// Fields the patch leaves as `None` are untouched, and `id` never changes.
    /// The patch is assumed to have been validated.
    pub fn apply_patch(&mut self, patch: &ProductPatch) {
        if let Some(product_name) = &patch.product_name {
            self.product_name = product_name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(remaining_sku) = patch.remaining_sku {
            // Validation guarantees non-negative.
            self.remaining_sku = remaining_sku.max(0) as u64;
        }
    }
}

/// Raw image bytes attached to a creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: None,
            content_type: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Lower-cased file extension of the uploaded file, if it has one.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Request to create a product.
///
/// Only `id` and `product_name` are required; the rest default to an empty
/// description, zero price and zero stock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub id: String,
    pub product_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub remaining_sku: Option<i64>,
    #[serde(skip)]
    pub image: Option<ImageUpload>,
}

impl CreateProductRequest {
    pub fn new(id: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_name: product_name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_remaining_sku(mut self, remaining_sku: i64) -> Self {
        self.remaining_sku = Some(remaining_sku);
        self
    }

    pub fn with_image(mut self, image: ImageUpload) -> Self {
        self.image = Some(image);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("id", &self.id)?;
        require_non_blank("product_name", &self.product_name)?;
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(remaining_sku) = self.remaining_sku {
            validate_remaining_sku(remaining_sku)?;
        }
        if let Some(image) = &self.image {
            if image.bytes.is_empty() {
                return Err(ValidationError::InvalidValue {
                    field: "image".to_string(),
                    reason: "upload is empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Build the stored product, with the given image key.
    pub fn to_product(&self, image_key: impl Into<String>) -> Product {
        Product {
            id: self.id.clone(),
            product_name: self.product_name.clone(),
            description: self.description.clone().unwrap_or_default(),
            image_key: image_key.into(),
            price: self.price.unwrap_or(0.0),
            remaining_sku: self.remaining_sku.unwrap_or(0).max(0) as u64,
        }
    }
}

/// Partial update. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_sku: Option<i64>,
}

impl ProductPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product_name(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = Some(product_name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn remaining_sku(mut self, remaining_sku: i64) -> Self {
        self.remaining_sku = Some(remaining_sku);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.remaining_sku.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(product_name) = &self.product_name {
            require_non_blank("product_name", product_name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(remaining_sku) = self.remaining_sku {
            validate_remaining_sku(remaining_sku)?;
        }
        Ok(())
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "price".to_string(),
            reason: format!("must be a finite non-negative number, got {}", price),
        });
    }
    Ok(())
}

fn validate_remaining_sku(remaining_sku: i64) -> Result<(), ValidationError> {
    if remaining_sku < 0 {
        return Err(ValidationError::InvalidValue {
            field: "remaining_sku".to_string(),
            reason: format!("must be non-negative, got {}", remaining_sku),
        });
    }
    Ok(())
}
