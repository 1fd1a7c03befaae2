//! Restaurants

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::{api::ApiError, cart::RestaurantRef, geo::Coordinate};

/// Restaurant details as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    /// Backend restaurant id
    pub id: i64,

    /// Display name
    pub name: String,

    /// URL slug
    pub slug: String,

    /// Stored latitude, if the restaurant has one
    #[serde(default)]
    pub latitude: Option<f64>,

    /// Stored longitude, if the restaurant has one
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Restaurant {
    /// Location of the restaurant, when both components are stored.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.latitude?, self.longitude?))
    }
}

impl From<&Restaurant> for RestaurantRef {
    fn from(restaurant: &Restaurant) -> Self {
        Self {
            id: restaurant.id,
            name: restaurant.name.clone(),
            slug: restaurant.slug.clone(),
        }
    }
}

/// Looks restaurants up by slug.
#[automock]
#[async_trait]
pub trait RestaurantDirectory: Send + Sync {
    /// Fetch a single restaurant.
    async fn restaurant_by_slug(&self, slug: &str) -> Result<Restaurant, ApiError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn coordinate_requires_both_components() {
        let mut restaurant = Restaurant {
            id: 1,
            name: "Curry House".to_string(),
            slug: "curry-house".to_string(),
            latitude: Some(51.5),
            longitude: None,
        };

        assert_eq!(restaurant.coordinate(), None);

        restaurant.longitude = Some(-0.12);

        assert_eq!(restaurant.coordinate(), Some(Coordinate::new(51.5, -0.12)));
    }

    #[test]
    fn deserializes_backend_payload_without_location() -> TestResult {
        let restaurant: Restaurant =
            serde_json::from_str(r#"{"id": 4, "name": "Noodle Bar", "slug": "noodle-bar"}"#)?;

        assert_eq!(restaurant.coordinate(), None);
        assert_eq!(RestaurantRef::from(&restaurant).slug, "noodle-bar");

        Ok(())
    }
}
