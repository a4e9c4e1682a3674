//! Land parcel input model
//!
//! A parcel is owned by the host, which is responsible for keeping every
//! slider value inside its range. The `set_*` helpers clamp the way a range
//! slider would; `validate` is what the sequencer checks before a run.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::valuation::{RURAL_RATE_PER_ACRE, URBAN_RATE_PER_SQFT};

pub const URBAN_AREA_RANGE: (f64, f64) = (500.0, 10_000.0);
pub const RURAL_AREA_RANGE: (f64, f64) = (1.0, 50.0);
pub const DISTANCE_RANGE_KM: (f64, f64) = (0.0, 100.0);
pub const RATING_RANGE: (f64, f64) = (1.0, 10.0);
pub const NUTRIENT_RANGE_PCT: (f64, f64) = (0.0, 100.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParcelKind {
    Urban,
    Rural,
}

impl ParcelKind {
    pub fn area_range(self) -> (f64, f64) {
        match self {
            ParcelKind::Urban => URBAN_AREA_RANGE,
            ParcelKind::Rural => RURAL_AREA_RANGE,
        }
    }

    pub fn area_unit(self) -> &'static str {
        match self {
            ParcelKind::Urban => "SqFt",
            ParcelKind::Rural => "Acres",
        }
    }

    /// Price of one unit of area (square foot or acre) before any factor.
    pub fn base_rate_per_unit(self) -> f64 {
        match self {
            ParcelKind::Urban => URBAN_RATE_PER_SQFT,
            ParcelKind::Rural => RURAL_RATE_PER_ACRE,
        }
    }
}

impl fmt::Display for ParcelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParcelKind::Urban => write!(f, "Urban"),
            ParcelKind::Rural => write!(f, "Rural"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelField {
    Area,
    DistanceFromCenter,
    InfrastructureRating,
    SoilQualityIndex,
    Nitrogen,
    Phosphorus,
    Potassium,
}

impl fmt::Display for ParcelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParcelField::Area => "area",
            ParcelField::DistanceFromCenter => "distance_from_center_km",
            ParcelField::InfrastructureRating => "infrastructure_rating",
            ParcelField::SoilQualityIndex => "soil_quality_index",
            ParcelField::Nitrogen => "nitrogen",
            ParcelField::Phosphorus => "phosphorus",
            ParcelField::Potassium => "potassium",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParcelError {
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: ParcelField, value: f64 },
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: ParcelField,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandParcel {
    pub location_name: String,
    pub kind: ParcelKind,
    /// Square feet for urban parcels, acres for rural ones.
    pub area: f64,
    pub distance_from_center_km: f64,
    pub infrastructure_rating: f64,
    /// Only meaningful for rural parcels; never enters the price.
    pub soil_quality_index: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

impl Default for LandParcel {
    fn default() -> Self {
        Self {
            location_name: "Chennai Suburban".to_string(),
            kind: ParcelKind::Urban,
            area: 1_200.0,
            distance_from_center_km: 5.0,
            infrastructure_rating: 7.0,
            soil_quality_index: 5.0,
            nitrogen: 45.0,
            phosphorus: 30.0,
            potassium: 25.0,
        }
    }
}

impl LandParcel {
    fn fields(&self) -> [(ParcelField, f64, (f64, f64)); 7] {
        [
            (ParcelField::Area, self.area, self.kind.area_range()),
            (
                ParcelField::DistanceFromCenter,
                self.distance_from_center_km,
                DISTANCE_RANGE_KM,
            ),
            (
                ParcelField::InfrastructureRating,
                self.infrastructure_rating,
                RATING_RANGE,
            ),
            (
                ParcelField::SoilQualityIndex,
                self.soil_quality_index,
                RATING_RANGE,
            ),
            (ParcelField::Nitrogen, self.nitrogen, NUTRIENT_RANGE_PCT),
            (ParcelField::Phosphorus, self.phosphorus, NUTRIENT_RANGE_PCT),
            (ParcelField::Potassium, self.potassium, NUTRIENT_RANGE_PCT),
        ]
    }

    pub fn validate(&self) -> Result<(), ParcelError> {
        for (field, value, (min, max)) in self.fields() {
            if !value.is_finite() {
                return Err(ParcelError::NotFinite { field, value });
            }
            if value < min || value > max {
                return Err(ParcelError::OutOfRange {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Pull every numeric field into its range. Non-finite values snap to the
    /// lower bound, matching a slider that never held a value.
    pub fn clamped(mut self) -> Self {
        self.area = clamp_to(self.area, self.kind.area_range());
        self.distance_from_center_km = clamp_to(self.distance_from_center_km, DISTANCE_RANGE_KM);
        self.infrastructure_rating = clamp_to(self.infrastructure_rating, RATING_RANGE);
        self.soil_quality_index = clamp_to(self.soil_quality_index, RATING_RANGE);
        self.nitrogen = clamp_to(self.nitrogen, NUTRIENT_RANGE_PCT);
        self.phosphorus = clamp_to(self.phosphorus, NUTRIENT_RANGE_PCT);
        self.potassium = clamp_to(self.potassium, NUTRIENT_RANGE_PCT);
        self
    }

    /// Fields whose value differs between `self` and `other`.
    pub fn changed_fields(&self, other: &LandParcel) -> Vec<ParcelField> {
        self.fields()
            .iter()
            .zip(other.fields().iter())
            .filter(|(a, b)| a.1.to_bits() != b.1.to_bits())
            .map(|(a, _)| a.0)
            .collect()
    }

    /// Toggling the kind changes the area unit, so the area is re-clamped
    /// into the new kind's range.
    pub fn set_kind(&mut self, kind: ParcelKind) {
        self.kind = kind;
        self.area = clamp_to(self.area, kind.area_range());
    }

    pub fn set_area(&mut self, area: f64) {
        self.area = clamp_to(area, self.kind.area_range());
    }

    pub fn set_distance_from_center_km(&mut self, km: f64) {
        self.distance_from_center_km = clamp_to(km, DISTANCE_RANGE_KM);
    }

    pub fn set_infrastructure_rating(&mut self, rating: f64) {
        self.infrastructure_rating = clamp_to(rating, RATING_RANGE);
    }

    pub fn set_soil_quality_index(&mut self, index: f64) {
        self.soil_quality_index = clamp_to(index, RATING_RANGE);
    }

    pub fn set_nutrients(&mut self, nitrogen: f64, phosphorus: f64, potassium: f64) {
        self.nitrogen = clamp_to(nitrogen, NUTRIENT_RANGE_PCT);
        self.phosphorus = clamp_to(phosphorus, NUTRIENT_RANGE_PCT);
        self.potassium = clamp_to(potassium, NUTRIENT_RANGE_PCT);
    }

    pub fn is_rural(&self) -> bool {
        self.kind == ParcelKind::Rural
    }
}

fn clamp_to(value: f64, (min, max): (f64, f64)) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}
