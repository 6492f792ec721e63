//! Response shapes returned by the façade.
//!
//! Both access paths produce these same shapes; only the latency fields and
//! `path` differ between them.

use catalog_core::{AccessPath, LatencyMeasurement, LatencyUnit, Product};
use serde::{Deserialize, Serialize};

/// A product as read through either path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    /// Retrievable image URL, empty when the product has no image or the
    /// image could not be resolved.
    pub image_url: String,
    #[serde(rename = "responseTime")]
    pub response_time: f64,
    #[serde(rename = "responseTimeUnit")]
    pub response_time_unit: LatencyUnit,
    pub path: AccessPath,
}

impl ProductView {
    pub fn new(product: Product, image_url: String, latency: &LatencyMeasurement) -> Self {
        Self {
            product,
            image_url,
            response_time: latency.value,
            response_time_unit: latency.unit,
            path: latency.path,
        }
    }

    pub fn id(&self) -> &str {
        &self.product.id
    }
}

/// Outcome of a successful create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedProduct {
    pub id: String,
    pub image_url: String,
    pub message: String,
}

/// Outcome of a delete. `deleted` is false when the id was already absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_view_wire_shape() {
        let latency = LatencyMeasurement::new(
            "get",
            AccessPath::Accelerated,
            Duration::from_micros(250),
            LatencyUnit::Microseconds,
        );
        let view = ProductView::new(
            Product::new("p1", "Widget").with_price(9.99),
            "http://localhost:3000/blobs/products/p1.png".to_string(),
            &latency,
        );

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["product_name"], "Widget");
        assert_eq!(json["image_key"], "");
        assert_eq!(json["price"], 9.99);
        assert_eq!(json["remaining_sku"], 0);
        assert_eq!(json["responseTimeUnit"], "us");
        assert_eq!(json["path"], "accelerated");
        assert!(json["responseTime"].as_f64().unwrap() >= 250.0);
    }
}
