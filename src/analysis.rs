//! Fires a grid of parallel rays through a scene along +x and tallies what each region presents:
//! area seen from the grid plane, line-of-sight thickness, and the volume they add up to.

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use log::{info, warn};
use math::hcm::{point3, vec3, Point3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use geometry::Ray;
use raytrace::{Application, HitContext, MissContext, OverlapReport, ResourcePool, Scene, Shot, Stats};

use crate::cli_options::CliOptions;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionTally {
    /// Rays that passed through the region at least once.
    pub rays: u64,
    /// Summed finite thickness over all rays.
    pub thickness: f64,
    /// Partitions of unbounded thickness, left out of `thickness`.
    pub unbounded: u64,
}

impl std::ops::AddAssign for RegionTally {
    fn add_assign(&mut self, rhs: Self) {
        self.rays += rhs.rays;
        self.thickness += rhs.thickness;
        self.unbounded += rhs.unbounded;
    }
}

/// Square grid on the x = const plane in front of the model.
#[derive(Debug, Clone, Copy)]
struct Grid {
    corner: Point3,
    cell: f64,
    n: usize,
}

impl Grid {
    fn covering(scene: &Scene, n: usize) -> Option<Grid> {
        let bbox = scene.tree().model_bbox();
        if bbox.is_empty() {
            return None;
        }
        let (lo, hi) = (bbox.min(), bbox.max());
        let side = (hi.y - lo.y).max(hi.z - lo.z) * 1.02;
        let center = point3(lo.x, (lo.y + hi.y) * 0.5, (lo.z + hi.z) * 0.5);
        Some(Grid {
            corner: point3(center.x - 1.0, center.y - side * 0.5, center.z - side * 0.5),
            cell: side / n as f64,
            n,
        })
    }

    fn origin(&self, col: usize, row: usize, jitter: (f64, f64)) -> Point3 {
        point3(
            self.corner.x,
            self.corner.y + (col as f64 + jitter.0) * self.cell,
            self.corner.z + (row as f64 + jitter.1) * self.cell,
        )
    }
}

struct Tally {
    regions: Vec<RegionTally>,
    overlaps: u64,
}

impl Application for Tally {
    type Output = ();

    fn hit(&mut self, ctx: HitContext<'_>) {
        for region in ctx.partitions.iter().filter_map(|p| p.region()).unique() {
            self.regions[region.0].rays += 1;
        }
        for part in ctx.partitions.iter() {
            let region = match part.region() {
                Some(r) => r,
                None => continue,
            };
            let thickness = part.thickness();
            let tally = &mut self.regions[region.0];
            if thickness.is_finite() {
                tally.thickness += thickness;
            } else {
                tally.unbounded += 1;
            }
        }
    }

    fn miss(&mut self, _ctx: MissContext<'_>) {}

    fn log_overlap(&mut self, report: &OverlapReport<'_>) {
        self.overlaps += 1;
        log::debug!(
            "overlap of {} regions in [{:.3}, {:.3}]",
            report.claimants.len(),
            report.in_dist,
            report.out_dist
        );
    }
}

pub struct Analysis {
    pub regions: Vec<RegionTally>,
    pub overlaps: u64,
    pub cell_area: f64,
    pub stats: Stats,
}

impl Analysis {
    pub fn report(&self, scene: &Scene) -> String {
        let mut lines = vec![format!(
            "{:<16} {:>10} {:>12} {:>12} {:>12}",
            "region", "rays", "area", "thickness", "volume"
        )];
        for (region, tally) in scene.regions().iter().zip(self.regions.iter()) {
            let mean = match tally.rays {
                0 => 0.0,
                n => tally.thickness / n as f64,
            };
            let mut line = format!(
                "{:<16} {:>10} {:>12.4} {:>12.4} {:>12.4}",
                region.name(),
                tally.rays,
                tally.rays as f64 * self.cell_area,
                mean,
                tally.thickness * self.cell_area
            );
            if tally.unbounded > 0 {
                line += &format!(" ({} unbounded)", tally.unbounded);
            }
            lines.push(line);
        }
        lines.push(format!("overlaps: {}", self.overlaps));
        lines.join("\n")
    }
}

fn row_rng(seed: Option<u64>, row: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(row as u64)),
        None => StdRng::seed_from_u64(rand::thread_rng().gen()),
    }
}

/// Shoots one row of the grid with a resource borrowed from the pool.
fn fire_row(pool: &ResourcePool<'_>, grid: &Grid, row: usize, options: &CliOptions) -> Tally {
    let scene = pool.scene();
    let mut tally = Tally {
        regions: vec![RegionTally::default(); scene.regions().len()],
        overlaps: 0,
    };
    let mut rng = row_rng(options.seed, row);
    let mut res = pool.acquire();
    for col in 0..grid.n {
        let origin = grid.origin(col, row, (rng.gen(), rng.gen()));
        let shot = Shot::new(Ray::new(origin, vec3(1.0, 0.0, 0.0)))
            .with_onehit(options.onehit)
            .at_pixel(col as i32, row as i32);
        if let Err(e) = scene.shoot(&mut res, &shot, &mut tally) {
            warn!("ray ({}, {}) failed: {}", col, row, e);
        }
    }
    pool.release(res);
    tally
}

fn merge(mut a: Tally, b: Tally) -> Tally {
    for (x, y) in a.regions.iter_mut().zip(b.regions) {
        *x += y;
    }
    a.overlaps += b.overlaps;
    a
}

pub fn run(scene: &Scene, options: &CliOptions) -> Analysis {
    let empty = || Tally {
        regions: vec![RegionTally::default(); scene.regions().len()],
        overlaps: 0,
    };
    let grid = match Grid::covering(scene, options.grid) {
        Some(grid) => grid,
        None => {
            warn!("scene has no bounded primitives, nothing to analyze");
            let tally = empty();
            return Analysis {
                regions: tally.regions,
                overlaps: 0,
                cell_area: 0.0,
                stats: Stats::default(),
            };
        }
    };

    let pool = ResourcePool::new(scene);
    let pb = ProgressBar::new(grid.n as u64);
    pb.set_style(ProgressStyle::default_bar().template("{bar:40} {pos}/{len} ETA: {eta}"));
    let start = std::time::Instant::now();
    let tally = if options.use_multi_thread {
        info!(
            "Firing {0}x{0} rays using {1} CPU cores...",
            grid.n,
            rayon::current_num_threads()
        );
        (0..grid.n)
            .into_par_iter()
            .map(|row| {
                let tally = fire_row(&pool, &grid, row, options);
                pb.inc(1);
                tally
            })
            .reduce(empty, merge)
    } else {
        info!("Firing {0}x{0} rays on one thread...", grid.n);
        (0..grid.n)
            .map(|row| {
                let tally = fire_row(&pool, &grid, row, options);
                pb.inc(1);
                tally
            })
            .fold(empty(), merge)
    };
    pb.finish();
    info!(
        "{} rays in {:.2?} with {} resources",
        grid.n * grid.n,
        start.elapsed(),
        pool.created()
    );

    Analysis {
        regions: tally.regions,
        overlaps: tally.overlaps,
        cell_area: grid.cell * grid.cell,
        stats: pool.total_stats(),
    }
}
