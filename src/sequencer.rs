//! Valuation simulation sequencer
//!
//! An explicit state machine for the three-stage pipeline animation:
//!
//! ```text
//! Idle --start--> Data --tick--> Model --tick--> Context (terminal)
//!   ^                                                  |
//!   +-------------------------reset--------------------+
//! ```
//!
//! The sequencer knows nothing about time. Whoever owns it calls [`tick`]
//! on a cadence; see [`crate::engine`] for the timed driver.
//!
//! [`tick`]: Sequencer::tick

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::parcel::{LandParcel, ParcelError};
use crate::soil::{SoilNarrative, SoilReading};
use crate::valuation::Valuation;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Data = 0,
    Model = 1,
    Context = 2,
}

impl Stage {
    pub const TERMINAL: Stage = Stage::Context;
    pub const ALL: [Stage; 3] = [Stage::Data, Stage::Model, Stage::Context];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Data => "Raw Data",
            Stage::Model => "ML Model",
            Stage::Context => "GenAI Context",
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Data => Some(Stage::Model),
            Stage::Model => Some(Stage::Context),
            Stage::Context => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State of the current (or most recent) run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationRun {
    pub is_running: bool,
    pub current_stage: Stage,
    pub soil_reading: Option<SoilReading>,
    pub soil_narrative: Option<SoilNarrative>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SequencerEvent {
    StageChanged {
        stage: Stage,
    },
    SoilReadingReady {
        reading: SoilReading,
        narrative: SoilNarrative,
    },
    ValuesReady {
        model_price: f64,
        final_price: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started(Vec<SequencerEvent>),
    /// A run is already in progress or parked at the terminal stage.
    AlreadyRunning,
}

pub struct Sequencer<R> {
    rng: R,
    run: SimulationRun,
    parcel: Option<LandParcel>,
    valuation: Option<Valuation>,
}

impl<R: Rng> Sequencer<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            run: SimulationRun::default(),
            parcel: None,
            valuation: None,
        }
    }

    /// Begin a run for a snapshot of `parcel`. Later edits to the host's
    /// parcel do not affect a run in progress.
    pub fn start(&mut self, parcel: &LandParcel) -> Result<StartOutcome, ParcelError> {
        if self.run.is_running {
            debug!(stage = %self.run.current_stage, "start ignored, run in progress");
            return Ok(StartOutcome::AlreadyRunning);
        }
        let valuation = Valuation::appraise(parcel)?;

        self.run = SimulationRun {
            is_running: true,
            current_stage: Stage::Data,
            soil_reading: None,
            soil_narrative: None,
        };
        self.parcel = Some(parcel.clone());
        self.valuation = Some(valuation);
        info!(
            location = %parcel.location_name,
            kind = %parcel.kind,
            area = parcel.area,
            "valuation run started"
        );
        Ok(StartOutcome::Started(vec![SequencerEvent::StageChanged {
            stage: Stage::Data,
        }]))
    }

    /// Advance one stage. Does nothing when idle or already terminal.
    pub fn tick(&mut self) -> Vec<SequencerEvent> {
        if !self.run.is_running {
            return Vec::new();
        }
        let Some(next) = self.run.current_stage.next() else {
            return Vec::new();
        };

        self.run.current_stage = next;
        debug!(stage = %next, index = next.index(), "stage advanced");
        let mut events = vec![SequencerEvent::StageChanged { stage: next }];

        match next {
            Stage::Model => {
                let rural = self.parcel.as_ref().is_some_and(LandParcel::is_rural);
                if rural && self.run.soil_reading.is_none() {
                    let reading = SoilReading::sample(&mut self.rng);
                    let narrative = SoilNarrative::select(&reading);
                    debug!(?reading, ?narrative, "soil scan simulated");
                    self.run.soil_reading = Some(reading);
                    self.run.soil_narrative = Some(narrative);
                    events.push(SequencerEvent::SoilReadingReady { reading, narrative });
                }
            }
            Stage::Context => {
                if let Some(valuation) = &self.valuation {
                    info!(
                        model_price = valuation.model_price,
                        final_price = valuation.final_price,
                        "valuation run reached terminal stage"
                    );
                    events.push(SequencerEvent::ValuesReady {
                        model_price: valuation.model_price,
                        final_price: valuation.final_price,
                    });
                }
            }
            Stage::Data => {}
        }
        events
    }

    /// Return to the initial state. Returns false if there was nothing to
    /// reset.
    pub fn reset(&mut self) -> bool {
        if self.run == SimulationRun::default() && self.parcel.is_none() {
            return false;
        }
        debug!(stage = %self.run.current_stage, "run reset");
        self.run = SimulationRun::default();
        self.parcel = None;
        self.valuation = None;
        true
    }

    pub fn run(&self) -> &SimulationRun {
        &self.run
    }

    pub fn is_running(&self) -> bool {
        self.run.is_running
    }

    pub fn current_stage(&self) -> Stage {
        self.run.current_stage
    }

    pub fn is_terminal(&self) -> bool {
        self.run.is_running && self.run.current_stage == Stage::TERMINAL
    }

    pub fn parcel(&self) -> Option<&LandParcel> {
        self.parcel.as_ref()
    }

    pub fn valuation(&self) -> Option<&Valuation> {
        self.valuation.as_ref()
    }
}
