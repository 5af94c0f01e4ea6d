use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Global runtime configuration for the engine.
/// Thread-safe via atomics, can be changed on-the-fly.
#[derive(Debug)]
pub struct GlobalConfig {
    /// top_k: neighborhood size kept by top-k neighborhoods (higher = denser, slower)
    pub top_k: AtomicUsize,

    /// sim_threshold: minimum similarity kept by threshold neighborhoods,
    /// stored as raw f64 bits
    pub sim_threshold: AtomicU64,
}

impl GlobalConfig {
    pub fn new() -> Self {
        Self {
            top_k: AtomicUsize::new(10),
            sim_threshold: AtomicU64::new(0.0f64.to_bits()),
        }
    }

    pub fn get_top_k(&self) -> usize {
        self.top_k.load(Ordering::Relaxed)
    }

    pub fn set_top_k(&self, val: usize) {
        self.top_k.store(val, Ordering::Relaxed);
    }

    pub fn get_sim_threshold(&self) -> f64 {
        f64::from_bits(self.sim_threshold.load(Ordering::Relaxed))
    }

    pub fn set_sim_threshold(&self, val: f64) {
        self.sim_threshold.store(val.to_bits(), Ordering::Relaxed);
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::new()
    }
}
