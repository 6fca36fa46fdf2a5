use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::AddAssign;

/// Counters kept by one `Resource`. Workers never touch each other's counters; totals are made
/// by summing the per-resource values after the fact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Rays accepted for shooting. Also the ray sequence number of the resource.
    pub rays: u64,
    /// Rays that missed the model box (and had no infinite primitives to hit).
    pub model_misses: u64,
    /// Rays reported through `hit` / `miss`.
    pub hits: u64,
    pub misses: u64,
    pub shots: u64,
    pub shot_hits: u64,
    pub shot_misses: u64,
    pub piece_shots: u64,
    pub piece_shot_hits: u64,
    pub piece_shot_misses: u64,
    /// Primitives rejected by their bounding box without being shot.
    pub pruned: u64,
    /// Candidates skipped because they were already tested for the current ray.
    pub duplicates: u64,
    pub cells: u64,
    pub empty_cells: u64,
    pub box_pushes: u64,
    pub stuck_rays: u64,
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        self.rays += rhs.rays;
        self.model_misses += rhs.model_misses;
        self.hits += rhs.hits;
        self.misses += rhs.misses;
        self.shots += rhs.shots;
        self.shot_hits += rhs.shot_hits;
        self.shot_misses += rhs.shot_misses;
        self.piece_shots += rhs.piece_shots;
        self.piece_shot_hits += rhs.piece_shot_hits;
        self.piece_shot_misses += rhs.piece_shot_misses;
        self.pruned += rhs.pruned;
        self.duplicates += rhs.duplicates;
        self.cells += rhs.cells;
        self.empty_cells += rhs.empty_cells;
        self.box_pushes += rhs.box_pushes;
        self.stuck_rays += rhs.stuck_rays;
    }
}

impl Sum for Stats {
    fn sum<I: Iterator<Item = Stats>>(iter: I) -> Self {
        iter.fold(Stats::default(), |mut total, s| {
            total += s;
            total
        })
    }
}

impl<'a> Sum<&'a Stats> for Stats {
    fn sum<I: Iterator<Item = &'a Stats>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "rays: {} ({} hit, {} missed, {} missed the model, {} stuck)",
            self.rays, self.hits, self.misses, self.model_misses, self.stuck_rays
        )?;
        writeln!(
            f,
            "shots: {} ({} hit, {} missed), piece shots: {} ({} hit, {} missed)",
            self.shots,
            self.shot_hits,
            self.shot_misses,
            self.piece_shots,
            self.piece_shot_hits,
            self.piece_shot_misses
        )?;
        write!(
            f,
            "pruned: {}, duplicates: {}, cells: {} ({} empty), pushes: {}",
            self.pruned, self.duplicates, self.cells, self.empty_cells, self.box_pushes
        )
    }
}
