pub mod config;
pub mod currency;
pub mod engine;
pub mod market;
pub mod parcel;
pub mod rng;
pub mod sequencer;
pub mod soil;
pub mod valuation;

pub use config::{AppConfig, ConfigLoader};
pub use engine::{PipelineDriver, PipelineEvent, PipelineEventKind, RunLifecycle};
pub use parcel::{LandParcel, ParcelError, ParcelKind};
pub use sequencer::{Sequencer, SequencerEvent, SimulationRun, Stage, StartOutcome};
pub use valuation::Valuation;
