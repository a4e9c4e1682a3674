use std::collections::VecDeque;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use landval::{
    parcel::{LandParcel, ParcelKind},
    sequencer::{Sequencer, SequencerEvent, Stage, StartOutcome},
    soil::{SoilNarrative, SoilReading},
};

/// Replays a fixed list of `u32` draws.
struct ScriptedRng {
    draws: VecDeque<u32>,
}

impl ScriptedRng {
    /// Draws that make `gen_range(low..low + span)` land on the given values.
    fn soil(nitrogen: u8, phosphorus: u8, potassium: u8) -> Self {
        let draws = [(nitrogen, 30, 40), (phosphorus, 20, 30), (potassium, 20, 30)]
            .into_iter()
            .map(|(value, low, span)| draw_for(u64::from(value - low), span))
            .collect();
        Self { draws }
    }
}

fn draw_for(offset: u64, span: u64) -> u32 {
    ((offset << 32).div_ceil(span)) as u32
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        self.draws.pop_front().expect("script exhausted")
    }

    fn next_u64(&mut self) -> u64 {
        u64::from(self.next_u32())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest {
            *byte = self.next_u32() as u8;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

fn rural_parcel() -> LandParcel {
    LandParcel {
        kind: ParcelKind::Rural,
        area: 10.0,
        distance_from_center_km: 20.0,
        infrastructure_rating: 5.0,
        ..LandParcel::default()
    }
}

fn started(outcome: StartOutcome) -> Vec<SequencerEvent> {
    match outcome {
        StartOutcome::Started(events) => events,
        StartOutcome::AlreadyRunning => panic!("expected a fresh run"),
    }
}

fn stages(events: &[SequencerEvent]) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|event| match event {
            SequencerEvent::StageChanged { stage } => Some(*stage),
            _ => None,
        })
        .collect()
}

fn narrative_for_forced(nitrogen: u8, phosphorus: u8) -> SoilNarrative {
    let mut seq = Sequencer::new(ScriptedRng::soil(nitrogen, phosphorus, 25));
    seq.start(&rural_parcel()).unwrap();
    let events = seq.tick();
    let reading = seq.run().soil_reading.expect("rural run has a reading");
    assert_eq!(reading.nitrogen, nitrogen);
    assert_eq!(reading.phosphorus, phosphorus);
    assert_eq!(reading.potassium, 25);
    assert!(events.contains(&SequencerEvent::SoilReadingReady {
        reading,
        narrative: seq.run().soil_narrative.unwrap(),
    }));
    seq.run().soil_narrative.unwrap()
}

#[test]
fn stages_advance_monotonically_to_terminal() {
    let mut seq = Sequencer::new(ChaCha8Rng::seed_from_u64(1));
    let mut seen = stages(&started(seq.start(&LandParcel::default()).unwrap()));
    for _ in 0..5 {
        seen.extend(stages(&seq.tick()));
    }
    assert_eq!(seen, vec![Stage::Data, Stage::Model, Stage::Context]);
    assert!(seq.is_terminal());
    assert_eq!(seq.current_stage(), Stage::TERMINAL);
}

#[test]
fn values_ready_fires_once_at_terminal() {
    let mut seq = Sequencer::new(ChaCha8Rng::seed_from_u64(1));
    seq.start(&LandParcel::default()).unwrap();
    assert!(seq.tick().iter().all(|e| !matches!(e, SequencerEvent::ValuesReady { .. })));
    let terminal = seq.tick();
    let valuation = *seq.valuation().expect("valuation captured at start");
    assert_eq!(
        terminal,
        vec![
            SequencerEvent::StageChanged {
                stage: Stage::Context
            },
            SequencerEvent::ValuesReady {
                model_price: valuation.model_price,
                final_price: valuation.final_price,
            },
        ]
    );
    assert!((valuation.model_price - 9_690_000.0).abs() < 1e-6);
    assert!(seq.tick().is_empty());
}

#[test]
fn urban_run_never_has_a_soil_reading() {
    let mut seq = Sequencer::new(ChaCha8Rng::seed_from_u64(5));
    let mut events = started(seq.start(&LandParcel::default()).unwrap());
    while !seq.is_terminal() {
        events.extend(seq.tick());
        assert!(seq.run().soil_reading.is_none());
        assert!(seq.run().soil_narrative.is_none());
    }
    assert!(!events
        .iter()
        .any(|e| matches!(e, SequencerEvent::SoilReadingReady { .. })));
}

#[test]
fn rural_reading_is_generated_once_at_model_stage() {
    let mut seq = Sequencer::new(ChaCha8Rng::seed_from_u64(5));
    seq.start(&rural_parcel()).unwrap();
    assert!(seq.run().soil_reading.is_none());

    let model = seq.tick();
    let reading = seq.run().soil_reading.expect("reading at model stage");
    let readings = model
        .iter()
        .filter(|e| matches!(e, SequencerEvent::SoilReadingReady { .. }))
        .count();
    assert_eq!(readings, 1);
    assert_eq!(
        seq.run().soil_narrative,
        Some(SoilNarrative::select(&reading))
    );

    let context = seq.tick();
    assert!(!context
        .iter()
        .any(|e| matches!(e, SequencerEvent::SoilReadingReady { .. })));
    assert_eq!(seq.run().soil_reading, Some(reading));
}

#[test]
fn soil_reading_does_not_change_price() {
    let mut a = Sequencer::new(ChaCha8Rng::seed_from_u64(1));
    let mut b = Sequencer::new(ChaCha8Rng::seed_from_u64(2));
    a.start(&rural_parcel()).unwrap();
    b.start(&rural_parcel()).unwrap();
    a.tick();
    b.tick();
    assert_eq!(a.valuation(), b.valuation());
}

#[test]
fn narrative_boundaries() {
    assert_eq!(narrative_for_forced(61, 20), SoilNarrative::HighNitrogen);
    assert_eq!(narrative_for_forced(60, 41), SoilNarrative::PhosphorusRich);
    assert_eq!(narrative_for_forced(60, 40), SoilNarrative::BalancedMineral);
}

#[test]
fn narrative_select_boundaries() {
    let reading = |nitrogen, phosphorus| SoilReading {
        nitrogen,
        phosphorus,
        potassium: 25,
    };
    assert_eq!(SoilNarrative::select(&reading(61, 20)), SoilNarrative::HighNitrogen);
    assert_eq!(SoilNarrative::select(&reading(60, 41)), SoilNarrative::PhosphorusRich);
    assert_eq!(SoilNarrative::select(&reading(60, 40)), SoilNarrative::BalancedMineral);
    assert_eq!(
        SoilNarrative::HighNitrogen.text(),
        "High Nitrogen detected. Exceptional for leafy green production and overall biomass."
    );
}

#[test]
fn start_while_running_or_terminal_is_a_no_op() {
    let mut seq = Sequencer::new(ChaCha8Rng::seed_from_u64(3));
    seq.start(&rural_parcel()).unwrap();
    seq.tick();
    let before = seq.run().clone();
    assert_eq!(
        seq.start(&LandParcel::default()).unwrap(),
        StartOutcome::AlreadyRunning
    );
    assert_eq!(seq.run(), &before);

    seq.tick();
    assert!(seq.is_terminal());
    assert_eq!(
        seq.start(&rural_parcel()).unwrap(),
        StartOutcome::AlreadyRunning
    );
    assert!(seq.is_terminal());
}

#[test]
fn reset_clears_run_and_allows_restart() {
    let mut seq = Sequencer::new(ChaCha8Rng::seed_from_u64(3));
    seq.start(&rural_parcel()).unwrap();
    seq.tick();
    assert!(seq.run().soil_reading.is_some());

    assert!(seq.reset());
    assert!(!seq.is_running());
    assert_eq!(seq.current_stage(), Stage::Data);
    assert!(seq.run().soil_reading.is_none());
    assert!(seq.run().soil_narrative.is_none());
    assert!(seq.tick().is_empty());

    let events = started(seq.start(&rural_parcel()).unwrap());
    assert_eq!(stages(&events), vec![Stage::Data]);
}

#[test]
fn parcel_is_snapshotted_at_start() {
    let mut seq = Sequencer::new(ChaCha8Rng::seed_from_u64(3));
    let mut parcel = LandParcel::default();
    seq.start(&parcel).unwrap();
    parcel.set_kind(ParcelKind::Rural);
    seq.tick();
    assert!(seq.run().soil_reading.is_none());
    assert_eq!(seq.parcel().map(|p| p.kind), Some(ParcelKind::Urban));
}
