//! Shooting one ray: traversal, primitive tests, weaving and finalization.

use cutter::{BoxNode, CellId};
use geometry::{InvDir, Ray};
use primitive::{Capability, PrimId};

use crate::advance::Traversal;
use crate::app::{Application, HitContext, MissContext};
use crate::backing;
use crate::boolfinal::Finalizer;
use crate::error::ShootError;
use crate::partition::Partitions;
use crate::resource::{RayScratch, Resource};
use crate::scene::Scene;
use crate::seg::Seg;
use crate::weave::Weaver;

/// One ray query and how much of the answer the caller wants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    /// Need not have a unit direction; it is normalized before tracing.
    pub ray: Ray,
    /// 0 to find every partition. N > 0 stops once N hit points (two per partition) are
    /// final; N < 0 does the same for |N| but does not count air.
    pub onehit: i32,
    /// When positive, traversal stops past this distance.
    pub ray_length: f64,
    /// Skips boolean evaluation: every segment becomes a partition of the first region using
    /// its primitive.
    pub no_booleans: bool,
    /// Recursion depth; 0 for primary rays.
    pub level: usize,
    /// Grid position, for diagnostics.
    pub x: i32,
    pub y: i32,
}

impl Shot {
    pub fn new(ray: Ray) -> Self {
        Shot {
            ray,
            onehit: 0,
            ray_length: 0.0,
            no_booleans: false,
            level: 0,
            x: 0,
            y: 0,
        }
    }

    pub fn with_onehit(self, onehit: i32) -> Self {
        Shot { onehit, ..self }
    }

    pub fn with_ray_length(self, ray_length: f64) -> Self {
        Shot { ray_length, ..self }
    }

    pub fn with_no_booleans(self, no_booleans: bool) -> Self {
        Shot {
            no_booleans,
            ..self
        }
    }

    pub fn at_pixel(self, x: i32, y: i32) -> Self {
        Shot { x, y, ..self }
    }

    /// A secondary shot from a hit callback, one level deeper.
    pub fn spawn(&self, ray: Ray) -> Self {
        Shot {
            ray,
            level: self.level + 1,
            ..*self
        }
    }
}

impl Scene {
    /// Shoots `shot.ray` and reports the outcome to `app`: `hit` with the final partitions,
    /// or `miss`. The resource must have been created for this scene.
    ///
    /// Errors abort this ray only; the resource stays usable.
    pub fn shoot<A: Application>(
        &self,
        res: &mut Resource,
        shot: &Shot,
        app: &mut A,
    ) -> Result<A::Output, ShootError> {
        if !res.belongs_to(self) {
            return Err(ShootError::ResourceMismatch);
        }
        if shot.level > self.config().max_level {
            return Err(ShootError::RecursionLimit {
                level: shot.level,
                max: self.config().max_level,
            });
        }
        if !shot.ray.origin.is_finite() {
            return Err(ShootError::BadOrigin(shot.ray.origin));
        }
        let ray = shot
            .ray
            .normalized()
            .ok_or(ShootError::BadDirection(shot.ray.dir))?;

        res.stats.rays += 1;
        let seqno = res.next_seqno();
        let mut scratch = res.take_scratch();
        let traced = self.trace(res, &mut scratch, shot, &ray, seqno, app);
        let result = match traced {
            Ok(true) => {
                res.stats.hits += 1;
                let partitions = Partitions::new(
                    self,
                    &ray,
                    &scratch.segs,
                    &scratch.arena,
                    &scratch.output,
                    &scratch.finished,
                );
                Ok(app.hit(HitContext {
                    scene: self,
                    resource: res,
                    shot,
                    partitions,
                }))
            }
            Ok(false) => {
                res.stats.misses += 1;
                Ok(app.miss(MissContext {
                    scene: self,
                    resource: res,
                    shot,
                }))
            }
            Err(e) => Err(e),
        };
        res.return_scratch(scratch);
        result
    }

    /// Runs the traversal. Returns true if final partitions were found.
    fn trace<A: Application>(
        &self,
        res: &mut Resource,
        s: &mut RayScratch,
        shot: &Shot,
        ray: &Ray,
        seqno: u64,
        app: &mut A,
    ) -> Result<bool, ShootError> {
        let config = self.config();
        let inv = ray.inverse();
        let mut use_backbits = false;
        let mut trav = match self.tree().model_bbox().clip(ray, &inv) {
            Some(model) if model.max >= 0.0 => {
                let mut box_start = model.min;
                if !self.piece_prims().is_empty() && box_start < config.backing_dist {
                    use_backbits = true;
                    box_start = backing::find_backing_dist(
                        self,
                        ray,
                        &inv,
                        model.min,
                        model.max,
                        &mut s.backbits,
                    );
                } else if box_start < config.backing_dist {
                    box_start = config.backing_dist;
                }
                Traversal::new(self.tree(), *ray, inv, config, box_start, model.max)
            }
            _ if self.tree().has_infinite() => {
                Traversal::infinite_only(self.tree(), *ray, inv, config)
            }
            _ => {
                log::trace!("ray {} misses the model", ray);
                res.stats.model_misses += 1;
                return Ok(false);
            }
        };

        let mut last_bool_start = config.backing_dist;
        let mut done = false;
        loop {
            let cell_id = match trav.advance() {
                Ok(Some(id)) => id,
                Ok(None) => break,
                Err(e) => {
                    log::error!("{} on ray {} at ({}, {})", e, ray, shot.x, shot.y);
                    res.stats.stuck_rays += 1;
                    continue;
                }
            };
            let cell = match self.tree().cell(cell_id) {
                Some(cell) => cell,
                None => continue,
            };
            res.stats.cells += 1;
            if cell.is_empty() {
                res.stats.empty_cells += 1;
                trav.box_start = trav.box_end;
                continue;
            }
            let mut pending_hit = trav.box_end;

            let hop = Hop {
                cell: cell_id,
                box_end: trav.box_end,
                dist_corr: trav.dist_corr,
                newray: trav.newray,
                inv,
                use_backbits,
                seqno,
            };
            self.shoot_pieces(res, s, cell, &hop, ray)?;
            self.shoot_solids(res, s, cell, &hop);

            if !s.waiting.is_empty() && shot.onehit != 0 {
                self.weave(s, shot);
                pending_hit = s
                    .pending
                    .iter()
                    .filter_map(|&p| self.piece_index(p))
                    .map(|k| res.pieces[k].min_dist)
                    .fold(hop.box_end, f64::min);
                if self.finalize(s, shot, app, last_bool_start, pending_hit) {
                    done = true;
                    break;
                }
                last_bool_start = pending_hit;
            }

            if shot.ray_length > 0.0
                && hop.box_end >= shot.ray_length
                && shot.ray_length < pending_hit
            {
                break;
            }
            trav.box_start = trav.box_end;
        }
        res.stats.box_pushes += trav.pushes;
        if done {
            return Ok(true);
        }

        let pending = std::mem::take(&mut s.pending);
        for &prim in pending.iter() {
            if let Some(k) = self.piece_index(prim) {
                if !res.pieces[k].hits.is_empty() {
                    self.flush_pieces(res, s, prim, k, ray)?;
                }
            }
        }
        s.pending = pending;
        s.pending.clear();

        if !s.waiting.is_empty() {
            self.weave(s, shot);
        }
        if s.finished.is_empty() {
            return Ok(false);
        }
        self.finalize(s, shot, app, config.backing_dist, f64::INFINITY);
        Ok(!s.output.is_empty())
    }

    /// Tests the pieces of each piece primitive in `cell`, turning a primitive's hits into
    /// segments once the ray has passed its bounding box.
    fn shoot_pieces(
        &self,
        res: &mut Resource,
        s: &mut RayScratch,
        cell: &BoxNode,
        hop: &Hop,
        ray: &Ray,
    ) -> Result<(), ShootError> {
        let floor = self.config().backing_dist;
        for list in cell.pieces.iter() {
            let prim = list.prim;
            let i = prim.index();
            if hop.use_backbits && hop.box_end < floor && !s.backbits.test(i) {
                continue;
            }
            let k = match self.piece_index(prim) {
                Some(k) => k,
                None => {
                    return Err(ShootError::MissingCapability {
                        prim,
                        capability: Capability::PieceShot,
                    })
                }
            };
            let shape = self.prim(prim);
            let state = &mut res.pieces[k];
            let had_hits = if !state.is_current(hop.seqno) {
                let bbox = self.prim_bbox(prim);
                if !state.begin(hop.seqno, bbox, &hop.newray, &hop.inv, hop.dist_corr) {
                    res.stats.pruned += 1;
                    s.solidbits.set(i);
                    continue;
                }
                false
            } else {
                if s.solidbits.test(i) {
                    res.stats.duplicates += 1;
                    continue;
                }
                !state.hits.is_empty()
            };
            state.cell = Some(hop.cell);

            res.stats.piece_shots += 1;
            let found = shape
                .piece_shot(
                    &mut state.shot,
                    &mut state.hits,
                    &list.pieces,
                    hop.dist_corr,
                    &hop.newray,
                )
                .map_err(|capability| ShootError::MissingCapability { prim, capability })?;
            match found {
                0 => res.stats.piece_shot_misses += 1,
                _ => res.stats.piece_shot_hits += 1,
            }

            if state.is_complete(hop.box_end) {
                if !res.pieces[k].hits.is_empty() {
                    self.flush_pieces(res, s, prim, k, ray)?;
                }
                s.solidbits.set(i);
                s.pending.retain(|&p| p != prim);
            } else if !had_hits && !s.pending.contains(&prim) {
                s.pending.push(prim);
            }
        }
        Ok(())
    }

    /// Converts the accumulated hits of piece primitive `prim` into waiting segments.
    fn flush_pieces(
        &self,
        res: &mut Resource,
        s: &mut RayScratch,
        prim: PrimId,
        k: usize,
        ray: &Ray,
    ) -> Result<(), ShootError> {
        let state = &mut res.pieces[k];
        s.new_segs.clear();
        self.prim(prim)
            .piece_hitsegs(&mut state.hits, ray, &mut s.new_segs)
            .map_err(|capability| ShootError::MissingCapability { prim, capability })?;
        state.hits.clear();
        for seg in s.new_segs.drain(..) {
            let id = s.segs.push(Seg::new(prim, seg));
            s.waiting.push(id);
        }
        Ok(())
    }

    /// Shoots every primitive of `cell` that is tested whole and not tested yet on this ray.
    fn shoot_solids(&self, res: &mut Resource, s: &mut RayScratch, cell: &BoxNode, hop: &Hop) {
        let floor = self.config().backing_dist;
        if hop.box_end < floor {
            return;
        }
        for &prim in cell.solids.iter() {
            let i = prim.index();
            if s.solidbits.test(i) {
                res.stats.duplicates += 1;
                continue;
            }
            s.solidbits.set(i);
            let shape = self.prim(prim);
            if shape.use_rpp() {
                let reaches = self
                    .prim_bbox(prim)
                    .clip(&hop.newray, &hop.inv)
                    .map_or(false, |iv| hop.dist_corr + iv.max >= floor);
                if !reaches {
                    res.stats.pruned += 1;
                    continue;
                }
            }
            res.stats.shots += 1;
            s.new_segs.clear();
            if shape.shot(&hop.newray, &mut s.new_segs) == 0 {
                res.stats.shot_misses += 1;
                continue;
            }
            res.stats.shot_hits += 1;
            for mut seg in s.new_segs.drain(..) {
                seg.inhit.dist += hop.dist_corr;
                seg.outhit.dist += hop.dist_corr;
                let id = s.segs.push(Seg::new(prim, seg));
                s.waiting.push(id);
            }
        }
    }

    fn weave(&self, s: &mut RayScratch, shot: &Shot) {
        Weaver {
            segs: &mut s.segs,
            arena: &mut s.arena,
            list: &mut s.input,
            tol: self.config().tol.dist,
            no_booleans: shot.no_booleans,
        }
        .weave(&mut s.waiting, &mut s.finished);
    }

    fn finalize<A: Application>(
        &self,
        s: &mut RayScratch,
        shot: &Shot,
        app: &mut A,
        startdist: f64,
        enddist: f64,
    ) -> bool {
        Finalizer {
            scene: self,
            segs: &mut s.segs,
            arena: &mut s.arena,
            input: &mut s.input,
            output: &mut s.output,
            regiontable: &mut s.regiontable,
            solidbits: &s.solidbits,
            onehit: shot.onehit,
            no_booleans: shot.no_booleans,
            app,
        }
        .finalize(startdist, enddist)
    }
}

/// Where the traversal stands in the current cell.
struct Hop {
    cell: CellId,
    box_end: f64,
    dist_corr: f64,
    newray: Ray,
    inv: InvDir,
    use_backbits: bool,
    seqno: u64,
}
