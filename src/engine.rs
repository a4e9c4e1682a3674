//! Timed pipeline driver
//!
//! Owns a [`Sequencer`] behind a mutex and a scheduled ticker task that
//! advances it every `tick_interval`. Every ticker is tagged with the
//! generation it was spawned for; `reset`, a fresh `start` and `Drop` bump
//! the generation and abort the task. A tick that already woke up checks its
//! generation under the sequencer lock, so it can never publish into a run
//! that has been torn down.

use std::future::Future;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use tracing::{debug, info, warn};

use crate::parcel::{LandParcel, ParcelError};
use crate::sequencer::{Sequencer, SequencerEvent, SimulationRun, StartOutcome};
use crate::valuation::Valuation;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1_500);

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineEvent {
    pub run_id: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: PipelineEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PipelineEventKind {
    Sequencer(SequencerEvent),
    Lifecycle(RunLifecycle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunLifecycle {
    Reset,
}

/// Point-in-time view of the driver for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub run_id: u64,
    pub run: SimulationRun,
    pub parcel: Option<LandParcel>,
    pub valuation: Option<Valuation>,
}

struct Shared<R> {
    sequencer: Mutex<Sequencer<R>>,
    generation: AtomicU64,
    events: broadcast::Sender<PipelineEvent>,
}

impl<R> Shared<R> {
    fn lock(&self) -> MutexGuard<'_, Sequencer<R>> {
        self.sequencer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, run_id: u64, kind: PipelineEventKind) {
        let event = PipelineEvent {
            run_id,
            at: Utc::now(),
            kind,
        };
        // No subscribers is fine; the host may only poll snapshots.
        let _ = self.events.send(event);
    }
}

pub struct PipelineDriver<R> {
    shared: Arc<Shared<R>>,
    tick_interval: Duration,
    ticker: Option<JoinHandle<()>>,
    run_id: u64,
}

impl<R> PipelineDriver<R>
where
    R: Rng + Send + 'static,
{
    pub fn new(sequencer: Sequencer<R>) -> Self {
        Self::with_interval(sequencer, DEFAULT_TICK_INTERVAL)
    }

    pub fn with_interval(sequencer: Sequencer<R>, tick_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            shared: Arc::new(Shared {
                sequencer: Mutex::new(sequencer),
                generation: AtomicU64::new(0),
                events,
            }),
            tick_interval,
            ticker: None,
            run_id: 0,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Start a run. A no-op while a run is in progress or parked at the
    /// terminal stage; call [`reset`](Self::reset) first to run again.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, parcel: &LandParcel) -> Result<StartOutcome, ParcelError> {
        let shared = Arc::clone(&self.shared);
        let mut sequencer = shared.lock();
        if sequencer.is_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }

        self.cancel_ticker();
        let outcome = sequencer.start(parcel)?;
        if let StartOutcome::Started(events) = &outcome {
            self.run_id += 1;
            for event in events {
                shared.publish(self.run_id, PipelineEventKind::Sequencer(event.clone()));
            }
            let generation = shared.generation.load(Ordering::SeqCst);
            self.ticker = Some(spawn_ticker(
                Arc::clone(&shared),
                generation,
                self.run_id,
                self.tick_interval,
            ));
        }
        Ok(outcome)
    }

    /// Cancel any pending tick and return to the initial state.
    pub fn reset(&mut self) {
        let shared = Arc::clone(&self.shared);
        let mut sequencer = shared.lock();
        self.cancel_ticker();
        if sequencer.reset() {
            info!(run_id = self.run_id, "valuation run reset");
            shared.publish(
                self.run_id,
                PipelineEventKind::Lifecycle(RunLifecycle::Reset),
            );
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let sequencer = self.shared.lock();
        RunSnapshot {
            run_id: self.run_id,
            run: sequencer.run().clone(),
            parcel: sequencer.parcel().cloned(),
            valuation: sequencer.valuation().copied(),
        }
    }

    pub fn receiver(&self) -> broadcast::Receiver<PipelineEvent> {
        self.shared.events.subscribe()
    }

    pub fn subscribe(&self) -> impl Stream<Item = PipelineEvent> {
        BroadcastStream::new(self.receiver()).filter_map(|msg| match msg {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "pipeline subscriber lagged, events dropped");
                None
            }
        })
    }

    /// Wait for the current run to finish. Returns the valuation once the
    /// terminal stage is reached, or `None` if the run is reset first or no
    /// run is active.
    ///
    /// The subscription is taken when this is called, so the returned future
    /// does not borrow the driver and the run can still be reset meanwhile.
    pub fn wait_until_terminal(
        &self,
    ) -> impl Future<Output = Option<Valuation>> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        let mut events = Box::pin(self.subscribe());
        async move {
            {
                let sequencer = shared.lock();
                if !sequencer.is_running() {
                    return None;
                }
                if sequencer.is_terminal() {
                    return sequencer.valuation().copied();
                }
            }
            while let Some(event) = events.next().await {
                match event.kind {
                    PipelineEventKind::Sequencer(SequencerEvent::ValuesReady { .. }) => {
                        let valuation = shared.lock().valuation().copied();
                        return valuation;
                    }
                    PipelineEventKind::Lifecycle(RunLifecycle::Reset) => return None,
                    PipelineEventKind::Sequencer(_) => {}
                }
            }
            None
        }
    }

    fn cancel_ticker(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl<R> Drop for PipelineDriver<R> {
    fn drop(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

fn spawn_ticker<R>(
    shared: Arc<Shared<R>>,
    generation: u64,
    run_id: u64,
    period: Duration,
) -> JoinHandle<()>
where
    R: Rng + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let mut sequencer = shared.lock();
            if shared.generation.load(Ordering::SeqCst) != generation {
                debug!(run_id, "stale tick discarded");
                break;
            }
            for event in sequencer.tick() {
                shared.publish(run_id, PipelineEventKind::Sequencer(event));
            }
            if sequencer.is_terminal() || !sequencer.is_running() {
                debug!(run_id, "ticker finished");
                break;
            }
        }
    })
}
