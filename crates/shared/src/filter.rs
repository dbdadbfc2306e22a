//! Subscription criteria and the match predicate shared by client and server.

use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::models::PropertyRecord;

/// Raw subscription criteria, as sent in a `subscribe` payload.
///
/// An absent field imposes no constraint. Use [`SubscriptionFilterSpec::new`]
/// to obtain a validated filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_bathrooms: Option<f64>,
}

impl FilterCriteria {
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn property_type(mut self, property_type: impl Into<String>) -> Self {
        self.property_type = Some(property_type.into());
        self
    }

    pub fn min_bedrooms(mut self, beds: u32) -> Self {
        self.min_bedrooms = Some(beds);
        self
    }

    pub fn min_bathrooms(mut self, baths: f64) -> Self {
        self.min_bathrooms = Some(baths);
        self
    }
}

/// A validated, immutable subscription filter.
///
/// Holding one guarantees that every numeric bound is finite and that
/// `min_price <= max_price` whenever both are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "FilterCriteria", into = "FilterCriteria")]
pub struct SubscriptionFilterSpec {
    criteria: FilterCriteria,
    location_lower: Option<String>,
}

impl SubscriptionFilterSpec {
    pub fn new(criteria: FilterCriteria) -> Result<Self, FilterError> {
        let bounds = [
            ("minPrice", criteria.min_price),
            ("maxPrice", criteria.max_price),
            ("minBathrooms", criteria.min_bathrooms),
        ];
        for (field, bound) in bounds {
            if let Some(value) = bound.filter(|v| !v.is_finite()) {
                return Err(FilterError::NonFiniteBound { field, value });
            }
        }
        if let (Some(min), Some(max)) = (criteria.min_price, criteria.max_price) {
            if min > max {
                return Err(FilterError::InvalidPriceRange { min, max });
            }
        }
        let location_lower = criteria.location.as_ref().map(|l| l.to_lowercase());
        Ok(Self {
            criteria,
            location_lower,
        })
    }

    /// A filter with no criteria; matches every event.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// All present criteria ANDed together.
    ///
    /// A criterion whose field is missing from the (partial) record does not
    /// match: an update that omits the price cannot satisfy a price bound.
    pub fn matches(&self, entity: &PropertyRecord) -> bool {
        let c = &self.criteria;

        if let Some(needle) = &self.location_lower {
            match &entity.location {
                Some(loc) if loc.to_lowercase().contains(needle.as_str()) => {}
                _ => return false,
            }
        }

        if c.min_price.is_some() || c.max_price.is_some() {
            let Some(price) = entity.price else {
                return false;
            };
            if c.min_price.is_some_and(|min| price < min) {
                return false;
            }
            if c.max_price.is_some_and(|max| price > max) {
                return false;
            }
        }

        if let Some(wanted) = &c.property_type {
            if entity.property_type.as_ref() != Some(wanted) {
                return false;
            }
        }

        if let Some(min) = c.min_bedrooms {
            if !entity.bedrooms.is_some_and(|beds| beds >= f64::from(min)) {
                return false;
            }
        }

        if let Some(min) = c.min_bathrooms {
            if !entity.bathrooms.is_some_and(|baths| baths >= min) {
                return false;
            }
        }

        true
    }
}

impl TryFrom<FilterCriteria> for SubscriptionFilterSpec {
    type Error = FilterError;

    fn try_from(criteria: FilterCriteria) -> Result<Self, Self::Error> {
        Self::new(criteria)
    }
}

impl From<SubscriptionFilterSpec> for FilterCriteria {
    fn from(spec: SubscriptionFilterSpec) -> Self {
        spec.criteria
    }
}
