#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

//! Co-occurrence similarity and neighborhood construction over a
//! [`PreferenceStore`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use kindred_core::{BoundedTopN, GlobalConfig};
use kindred_prefs::PreferenceStore;

pub use kindred_core::Scored;

pub mod metric;

/// Which side of the dual index is the subject of similarity queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// User-user similarity: profiles are item lists.
    Users,
    /// Item-item similarity: profiles are user lists.
    Items,
}

/// Counter accumulation strategy for co-occurrence counting.
///
/// Both strategies produce identical results; the choice trades memory for
/// speed and is made by the caller, never guessed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStrategy {
    /// Full-length counter array over the candidate universe. Fastest when
    /// candidate density is high.
    Dense,
    /// Hash map sized to the actual intersection. Preferred for large,
    /// sparsely-touched universes.
    Sparse,
}

/// Set-overlap similarity engine.
///
/// For a queried index, walks its profile and, through the dual index, every
/// other subject sharing at least one profile entry, counting co-occurrences
/// and applying the metric `sim(intersection, |A|, |B|)`. The queried index
/// itself is never part of the result.
pub struct SetSimilarity<F> {
    data: Arc<PreferenceStore>,
    axis: Axis,
    strategy: CounterStrategy,
    metric: F,
}

impl<F> SetSimilarity<F>
where
    F: Fn(usize, usize, usize) -> f64 + Send + Sync,
{
    pub fn new(data: Arc<PreferenceStore>, axis: Axis, strategy: CounterStrategy, metric: F) -> Self {
        Self {
            data,
            axis,
            strategy,
            metric,
        }
    }

    #[inline]
    fn profile(&self, idx: u32) -> &[(u32, f64)] {
        match self.axis {
            Axis::Users => self.data.user_prefs(idx),
            Axis::Items => self.data.item_prefs(idx),
        }
    }

    // Subjects referencing the given counterpart object.
    #[inline]
    fn object_subjects(&self, obj: u32) -> &[(u32, f64)] {
        match self.axis {
            Axis::Users => self.data.item_prefs(obj),
            Axis::Items => self.data.user_prefs(obj),
        }
    }

    #[inline]
    fn profile_size(&self, idx: u32) -> usize {
        self.profile(idx).len()
    }

    fn universe(&self) -> usize {
        match self.axis {
            Axis::Users => self.data.num_users(),
            Axis::Items => self.data.num_items(),
        }
    }

    /// All subjects sharing at least one profile entry with `idx`, scored by
    /// the metric. Unordered. An empty profile yields an empty result.
    pub fn similar_to(&self, idx: u32) -> Vec<Scored> {
        let na = self.profile_size(idx);
        match self.strategy {
            CounterStrategy::Dense => self.similar_dense(idx, na),
            CounterStrategy::Sparse => self.similar_sparse(idx, na),
        }
    }

    fn similar_dense(&self, idx: u32, na: usize) -> Vec<Scored> {
        let mut counts = vec![0u32; self.universe()];
        for &(obj, _) in self.profile(idx) {
            for &(cand, _) in self.object_subjects(obj) {
                counts[cand as usize] += 1;
            }
        }
        if let Some(own) = counts.get_mut(idx as usize) {
            *own = 0;
        }

        counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(cand, &c)| {
                let nb = self.profile_size(cand as u32);
                Scored::new(cand as u32, (self.metric)(c as usize, na, nb))
            })
            .collect()
    }

    fn similar_sparse(&self, idx: u32, na: usize) -> Vec<Scored> {
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for &(obj, _) in self.profile(idx) {
            for &(cand, _) in self.object_subjects(obj) {
                *counts.entry(cand).or_insert(0) += 1;
            }
        }
        counts.remove(&idx);

        counts
            .into_iter()
            .map(|(cand, c)| {
                let nb = self.profile_size(cand);
                Scored::new(cand, (self.metric)(c as usize, na, nb))
            })
            .collect()
    }

    /// Pairwise form: builds the object set of `idx1` once and returns a
    /// function scoring any `idx2` against it.
    pub fn pairwise(&self, idx1: u32) -> impl Fn(u32) -> f64 + '_ {
        let set: HashSet<u32> = self.profile(idx1).iter().map(|&(obj, _)| obj).collect();
        let na = set.len();
        move |idx2| {
            let coo = self
                .profile(idx2)
                .iter()
                .filter(|(obj, _)| set.contains(obj))
                .count();
            (self.metric)(coo, na, self.profile_size(idx2))
        }
    }
}

/// A finite, unordered stream of scored neighbors per queried index.
///
/// Implementations never emit the queried index itself.
pub trait Neighborhood: Send + Sync {
    fn neighbors(&self, idx: u32) -> Vec<Scored>;
}

/// Neighborhood backed directly by a [`SetSimilarity`] engine.
pub struct SimilarityNeighborhood<F> {
    sim: SetSimilarity<F>,
}

impl<F> SimilarityNeighborhood<F>
where
    F: Fn(usize, usize, usize) -> f64 + Send + Sync,
{
    pub fn new(sim: SetSimilarity<F>) -> Self {
        Self { sim }
    }
}

impl<F> Neighborhood for SimilarityNeighborhood<F>
where
    F: Fn(usize, usize, usize) -> f64 + Send + Sync,
{
    fn neighbors(&self, idx: u32) -> Vec<Scored> {
        self.sim.similar_to(idx)
    }
}

/// Keeps the `top_k` best-scored neighbors of the wrapped source.
///
/// `top_k` is read from the shared [`GlobalConfig`] on every query, so it can
/// be tuned at runtime without rebuilding anything.
pub struct TopKNeighborhood<N> {
    inner: N,
    config: Arc<GlobalConfig>,
}

impl<N: Neighborhood> TopKNeighborhood<N> {
    pub fn new(inner: N, config: Arc<GlobalConfig>) -> Self {
        Self { inner, config }
    }
}

impl<N: Neighborhood> Neighborhood for TopKNeighborhood<N> {
    fn neighbors(&self, idx: u32) -> Vec<Scored> {
        let k = self.config.get_top_k();
        let mut top = BoundedTopN::new(k);
        for s in self.inner.neighbors(idx) {
            let _ = top.insert(s.idx, s.score);
        }
        top.into_sorted_vec()
    }
}

/// Keeps neighbors scoring strictly above `sim_threshold`.
pub struct ThresholdNeighborhood<N> {
    inner: N,
    config: Arc<GlobalConfig>,
}

impl<N: Neighborhood> ThresholdNeighborhood<N> {
    pub fn new(inner: N, config: Arc<GlobalConfig>) -> Self {
        Self { inner, config }
    }
}

impl<N: Neighborhood> Neighborhood for ThresholdNeighborhood<N> {
    fn neighbors(&self, idx: u32) -> Vec<Scored> {
        let threshold = self.config.get_sim_threshold();
        self.inner
            .neighbors(idx)
            .into_iter()
            .filter(|s| s.score > threshold)
            .collect()
    }
}

/// Eagerly materialized neighborhoods for all `n` indices.
pub struct CachedNeighborhood {
    cached: Vec<Vec<Scored>>,
}

impl CachedNeighborhood {
    pub fn build<N: Neighborhood + ?Sized>(n: usize, source: &N) -> Self {
        let start = Instant::now();
        let cached: Vec<Vec<Scored>> = (0..n as u32)
            .into_par_iter()
            .map(|idx| source.neighbors(idx))
            .collect();
        debug!(
            indices = n,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "cached neighborhoods"
        );
        Self { cached }
    }
}

impl Neighborhood for CachedNeighborhood {
    fn neighbors(&self, idx: u32) -> Vec<Scored> {
        self.cached.get(idx as usize).cloned().unwrap_or_default()
    }
}

// Origins are fanned out to worker threads in slices of this many; each
// finished slice is folded into `reverse` by the building thread alone.
const MERGE_CHUNK: usize = 256;

/// Transpose of a neighborhood relation, materialized for a filtered subset
/// of target indices.
///
/// `neighbors(target)` lists every `(origin, score)` such that `target`
/// appears with `score` in `source.neighbors(origin)`. The filter controls
/// memory: unfiltered targets get no storage at all, and querying one is a
/// contract violation.
pub struct InvertedNeighborhood {
    reverse: Vec<Option<Vec<Scored>>>,
}

impl InvertedNeighborhood {
    pub fn build<N, F>(n: usize, source: &N, filter: F) -> Self
    where
        N: Neighborhood + ?Sized,
        F: Fn(u32) -> bool + Sync,
    {
        let start = Instant::now();

        // Phase 1: slots for filtered targets only.
        let mut reverse: Vec<Option<Vec<Scored>>> =
            (0..n as u32).map(|idx| filter(idx).then(Vec::new)).collect();

        // Phase 2: neighbor lists are computed in parallel, but every write
        // into `reverse` happens on this thread, one origin at a time.
        let origins: Vec<u32> = (0..n as u32).collect();
        let mut relations = 0usize;
        for chunk in origins.chunks(MERGE_CHUNK) {
            let computed: Vec<(u32, Vec<Scored>)> = chunk
                .par_iter()
                .map(|&origin| (origin, source.neighbors(origin)))
                .collect();
            for (origin, list) in computed {
                for s in list {
                    if let Some(slot) = reverse.get_mut(s.idx as usize).and_then(Option::as_mut) {
                        slot.push(Scored::new(origin, s.score));
                        relations += 1;
                    }
                }
            }
        }

        info!(
            origins = n,
            relations,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built inverted neighborhood"
        );

        Self { reverse }
    }

    /// Whether `idx` passed the build filter and can be queried.
    pub fn is_materialized(&self, idx: u32) -> bool {
        matches!(self.reverse.get(idx as usize), Some(Some(_)))
    }
}

impl Neighborhood for InvertedNeighborhood {
    fn neighbors(&self, idx: u32) -> Vec<Scored> {
        match self.reverse.get(idx as usize) {
            Some(Some(list)) => list.clone(),
            _ => panic!("InvertedNeighborhood: index {idx} was not materialized by the filter"),
        }
    }
}
