use serde::Serialize;

use crate::parcel::{LandParcel, ParcelError, ParcelKind};

pub const URBAN_RATE_PER_SQFT: f64 = 5_000.0;
pub const RURAL_RATE_PER_ACRE: f64 = 500_000.0;
pub const MIN_DISTANCE_FACTOR: f64 = 0.2;
/// Multiplier applied on top of the model price at the context stage.
pub const GENAI_PREMIUM: f64 = 1.15;

/// Full breakdown of one appraisal, intermediate factors included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Valuation {
    pub base_rate_per_unit: f64,
    pub raw_price: f64,
    pub distance_factor: f64,
    pub infra_factor: f64,
    pub nutrition_factor: f64,
    pub model_price: f64,
    pub final_price: f64,
}

impl Valuation {
    /// Closed-form price for a parcel. Performs no validation; callers that
    /// cannot vouch for their input should use [`Valuation::appraise`].
    pub fn compute(parcel: &LandParcel) -> Self {
        let base_rate_per_unit = parcel.kind.base_rate_per_unit();
        let raw_price = parcel.area * base_rate_per_unit;
        let distance_factor =
            ((100.0 - parcel.distance_from_center_km) / 100.0).max(MIN_DISTANCE_FACTOR);
        let infra_factor = 1.0 + parcel.infrastructure_rating / 10.0;
        // Uses the NPK inputs, not the randomized soil scan shown to the user.
        let nutrition_factor = match parcel.kind {
            ParcelKind::Rural => {
                1.0 + (parcel.nitrogen + parcel.phosphorus + parcel.potassium) / 300.0
            }
            ParcelKind::Urban => 1.0,
        };
        let model_price = raw_price * distance_factor * infra_factor * nutrition_factor;
        let final_price = model_price * GENAI_PREMIUM;

        Self {
            base_rate_per_unit,
            raw_price,
            distance_factor,
            infra_factor,
            nutrition_factor,
            model_price,
            final_price,
        }
    }

    pub fn appraise(parcel: &LandParcel) -> Result<Self, ParcelError> {
        parcel.validate()?;
        Ok(Self::compute(parcel))
    }

    pub fn premium(&self) -> f64 {
        self.final_price - self.model_price
    }
}
