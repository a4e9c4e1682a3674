use std::collections::HashMap;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Hands out one independent random stream per run, all derived from a
/// single master seed so a session can be replayed.
pub struct RngManager {
    seed: u64,
    master: ChaCha8Rng,
    derived: HashMap<String, u64>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            master: ChaCha8Rng::seed_from_u64(seed),
            derived: HashMap::new(),
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Asking for the same name twice yields identically seeded streams.
    pub fn stream(&mut self, name: &str) -> ChaCha8Rng {
        let master = &mut self.master;
        let derived = *self.derived.entry(name.to_string()).or_insert_with(|| {
            let mut seed_bytes = [0u8; 8];
            master.fill_bytes(&mut seed_bytes);
            u64::from_le_bytes(seed_bytes)
        });
        ChaCha8Rng::seed_from_u64(derived)
    }

    pub fn run_stream(&mut self, run_id: u64) -> ChaCha8Rng {
        self.stream(&format!("run-{run_id}"))
    }
}

impl Default for RngManager {
    fn default() -> Self {
        Self::new(42)
    }
}
