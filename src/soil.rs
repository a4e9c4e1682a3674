//! Simulated soil nutrient scan
//!
//! The scan is cosmetic: its values are drawn fresh for every rural run and
//! never feed back into the price, which uses the parcel's own NPK inputs.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Integer nutrient percentages from one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoilReading {
    pub nitrogen: u8,
    pub phosphorus: u8,
    pub potassium: u8,
}

impl SoilReading {
    /// Independent uniform draws: nitrogen in 30..=69, phosphorus and
    /// potassium in 20..=49.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        Self {
            nitrogen: rng.gen_range(30..70),
            phosphorus: rng.gen_range(20..50),
            potassium: rng.gen_range(20..50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilNarrative {
    HighNitrogen,
    PhosphorusRich,
    BalancedMineral,
}

impl SoilNarrative {
    pub fn select(reading: &SoilReading) -> Self {
        if reading.nitrogen > 60 {
            SoilNarrative::HighNitrogen
        } else if reading.phosphorus > 40 {
            SoilNarrative::PhosphorusRich
        } else {
            SoilNarrative::BalancedMineral
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            SoilNarrative::HighNitrogen => {
                "High Nitrogen detected. Exceptional for leafy green production and overall biomass."
            }
            SoilNarrative::PhosphorusRich => {
                "Phosphorus rich soil. Ideal for root development and flowering plants."
            }
            SoilNarrative::BalancedMineral => {
                "Balanced mineral composition. Highly resilient soil suitable for diverse multi-cropping."
            }
        }
    }
}

impl fmt::Display for SoilNarrative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
