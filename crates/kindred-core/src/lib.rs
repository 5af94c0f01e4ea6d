pub mod config;
pub mod index;
pub mod topn;

pub use config::GlobalConfig;
pub use topn::{BoundedTopN, TopNError};

/// An integer index paired with a score.
///
/// The universal currency of the engine: neighborhoods, similarity results
/// and ranked lists are all sequences of these. No ordering is implied by
/// the type itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub idx: u32,
    pub score: f64,
}

impl Scored {
    #[inline]
    pub fn new(idx: u32, score: f64) -> Self {
        Self { idx, score }
    }
}
