use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cutter::{CutConfig, CutterBuilder, CutterTree};
use geometry::{BBox, Ray};
use math::BitVec;
use primitive::{PrimId, Primitive};

use crate::backing;
use crate::config::TraceConfig;
use crate::error::{Result, SceneError};
use crate::region::{Region, RegionId};

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// A prepared model: primitives, regions and the space partition over them. Frozen once built
/// and shared read-only by every worker.
pub struct Scene {
    id: u64,
    prims: Vec<Arc<dyn Primitive>>,
    prim_boxes: Vec<BBox>,
    regions: Vec<Region>,
    /// Regions whose boolean tree uses each primitive, in region order.
    prim_regions: Vec<Vec<RegionId>>,
    /// Position of each piece-enabled primitive in `piece_prims`.
    piece_index: Vec<Option<usize>>,
    piece_prims: Vec<PrimId>,
    tree: CutterTree,
    config: TraceConfig,
}

impl Scene {
    /// Assembles a scene from a pre-built tree, checking the trace settings and that every
    /// primitive the tree and the regions mention exists.
    pub fn new(
        prims: Vec<Arc<dyn Primitive>>,
        regions: Vec<Region>,
        tree: CutterTree,
        config: TraceConfig,
    ) -> Result<Scene> {
        config.check()?;
        let count = prims.len();
        for (node, cell) in tree.cells() {
            let listed = cell
                .solids
                .iter()
                .chain(cell.pieces.iter().map(|list| &list.prim));
            for &prim in listed {
                if prim.index() >= count {
                    return Err(SceneError::UnknownPrimitive {
                        node: node.0,
                        prim,
                        count,
                    });
                }
            }
        }
        for &prim in tree.infinite_cell().solids.iter() {
            if prim.index() >= count || !prims[prim.index()].is_infinite() {
                return Err(SceneError::BoundedInInfiniteCell { prim });
            }
        }
        tree.check_pieces(|p| prims[p.index()].piece_count())?;

        let mut prim_regions = vec![vec![]; count];
        for (i, region) in regions.iter().enumerate() {
            if region.name().is_empty() {
                return Err(SceneError::EmptyRegionName(i));
            }
            for prim in region.tree().prims() {
                if prim.index() >= count {
                    return Err(SceneError::RegionPrimitive {
                        region: region.name().to_string(),
                        prim,
                        count,
                    });
                }
                let owners: &mut Vec<RegionId> = &mut prim_regions[prim.index()];
                if !owners.contains(&RegionId(i)) {
                    owners.push(RegionId(i));
                }
            }
        }

        let mut piece_index = vec![None; count];
        let mut piece_prims = vec![];
        for (i, prim) in prims.iter().enumerate() {
            if prim.piece_count() > 0 {
                piece_index[i] = Some(piece_prims.len());
                piece_prims.push(PrimId(i));
            }
        }
        let prim_boxes = prims.iter().map(|p| p.bbox()).collect();

        Ok(Scene {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            prims,
            prim_boxes,
            regions,
            prim_regions,
            piece_index,
            piece_prims,
            tree,
            config,
        })
    }

    /// Builds the space partition with `cut` and assembles the scene.
    pub fn prepare(
        prims: Vec<Arc<dyn Primitive>>,
        regions: Vec<Region>,
        config: TraceConfig,
        cut: CutConfig,
    ) -> Result<Scene> {
        let tree = CutterBuilder::new(cut).build(&prims)?;
        let scene = Scene::new(prims, regions, tree, config)?;
        log::info!("prepared {}", scene);
        Ok(scene)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn prim(&self, id: PrimId) -> &dyn Primitive {
        self.prims[id.index()].as_ref()
    }

    pub fn prims(&self) -> &[Arc<dyn Primitive>] {
        &self.prims
    }

    pub fn prim_bbox(&self, id: PrimId) -> &BBox {
        &self.prim_boxes[id.index()]
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.0]
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn find_region(&self, name: &str) -> Option<RegionId> {
        self.regions
            .iter()
            .position(|r| r.name() == name)
            .map(RegionId)
    }

    /// Regions using `prim`; empty for a primitive no region refers to.
    pub fn prim_regions(&self, prim: PrimId) -> &[RegionId] {
        &self.prim_regions[prim.index()]
    }

    pub fn piece_prims(&self) -> &[PrimId] {
        &self.piece_prims
    }

    pub(crate) fn piece_index(&self, prim: PrimId) -> Option<usize> {
        self.piece_index[prim.index()]
    }

    pub fn tree(&self) -> &CutterTree {
        &self.tree
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Ray parameter where traversal of `ray` would begin, counting the backing distance of
    /// piece primitives. `None` if the ray misses the model box, or the box lies wholly behind
    /// the origin.
    pub fn start_distance(&self, ray: &Ray) -> Option<f64> {
        let ray = ray.normalized()?;
        let inv = ray.inverse();
        let model = self.tree.model_bbox().clip(&ray, &inv)?;
        if model.max < 0.0 {
            return None;
        }
        let floor = self.config.backing_dist;
        Some(match model.min < floor {
            true if !self.piece_prims.is_empty() => {
                let mut backbits = BitVec::new(self.prims.len());
                backing::find_backing_dist(self, &ray, &inv, model.min, model.max, &mut backbits)
            }
            true => floor,
            false => model.min,
        })
    }
}

impl Display for Scene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scene{{ {} prims ({} with pieces), {} regions, {} }}",
            self.prims.len(),
            self.piece_prims.len(),
            self.regions.len(),
            self.tree
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::BoolTree;
    use cutter::{BoxNode, CutterNode, NodeId, PieceList, TreeError};
    use math::hcm::{point3, vec3};
    use primitive::{HalfSpace, Sphere, TriangleMesh};

    fn sphere(x: f64) -> Arc<dyn Primitive> {
        Arc::new(Sphere::new(point3(x, 0.0, 0.0), 1.0))
    }

    fn single_cell(cell: BoxNode, infinite: Vec<PrimId>) -> CutterTree {
        let model = cell.bbox;
        CutterTree::new(vec![CutterNode::Box(cell)], NodeId(0), model, infinite).unwrap()
    }

    #[test]
    fn indexes_regions_and_pieces() {
        let mesh = TriangleMesh::cuboid(point3(4.0, -1.0, -1.0), point3(6.0, 1.0, 1.0)).with_pieces(true);
        let prims = vec![sphere(0.0), Arc::new(mesh) as Arc<dyn Primitive>, sphere(10.0)];
        let regions = vec![
            Region::new("a", BoolTree::solid(0).subtract(BoolTree::solid(1))),
            Region::new("b", BoolTree::solid(1)),
        ];
        let scene = Scene::prepare(prims, regions, TraceConfig::default(), CutConfig::default()).unwrap();
        assert_eq!(scene.prim_regions(PrimId(1)), &[RegionId(0), RegionId(1)]);
        assert!(scene.prim_regions(PrimId(2)).is_empty());
        assert_eq!(scene.piece_prims(), &[PrimId(1)]);
        assert_eq!(scene.piece_index(PrimId(1)), Some(0));
        assert_eq!(scene.piece_index(PrimId(0)), None);
        assert_eq!(scene.find_region("b"), Some(RegionId(1)));
        assert_eq!(scene.find_region("c"), None);
    }

    #[test]
    fn scenes_get_distinct_ids() {
        let a = Scene::prepare(vec![sphere(0.0)], vec![], TraceConfig::default(), CutConfig::default()).unwrap();
        let b = Scene::prepare(vec![sphere(0.0)], vec![], TraceConfig::default(), CutConfig::default()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn rejects_inconsistent_input() {
        let bbox = BBox::new(point3(-1.0, -1.0, -1.0), point3(1.0, 1.0, 1.0));
        let config = TraceConfig::default();

        let mut cell = BoxNode::new(bbox);
        cell.solids.push(PrimId(3));
        assert_eq!(
            Scene::new(vec![sphere(0.0)], vec![], single_cell(cell, vec![]), config).err(),
            Some(SceneError::UnknownPrimitive {
                node: 0,
                prim: PrimId(3),
                count: 1
            })
        );

        let tree = single_cell(BoxNode::new(bbox), vec![PrimId(0)]);
        assert_eq!(
            Scene::new(vec![sphere(0.0)], vec![], tree, config).err(),
            Some(SceneError::BoundedInInfiniteCell { prim: PrimId(0) })
        );

        let mut cell = BoxNode::new(bbox);
        cell.pieces.push(PieceList {
            prim: PrimId(0),
            pieces: vec![0],
        });
        assert_eq!(
            Scene::new(vec![sphere(0.0)], vec![], single_cell(cell, vec![]), config).err(),
            Some(SceneError::Tree(TreeError::PieceOutOfRange {
                node: 0,
                prim: PrimId(0),
                piece: 0,
                count: 0
            }))
        );

        let tree = single_cell(BoxNode::new(bbox), vec![]);
        let regions = vec![Region::new("r", BoolTree::solid(2))];
        assert_eq!(
            Scene::new(vec![sphere(0.0)], regions, tree, config).err(),
            Some(SceneError::RegionPrimitive {
                region: "r".to_string(),
                prim: PrimId(2),
                count: 1
            })
        );

        let tree = single_cell(BoxNode::new(bbox), vec![]);
        let regions = vec![Region::new("", BoolTree::solid(0))];
        assert_eq!(
            Scene::new(vec![sphere(0.0)], regions, tree, config).err(),
            Some(SceneError::EmptyRegionName(0))
        );

        let tree = single_cell(BoxNode::new(bbox), vec![]);
        let config = TraceConfig {
            offset_dist: 0.0,
            ..config
        };
        assert_eq!(
            Scene::new(vec![sphere(0.0)], vec![], tree, config).err(),
            Some(SceneError::BadConfig {
                field: "offset_dist",
                value: 0.0
            })
        );
    }

    #[test]
    fn start_distance_follows_the_floor() {
        let prims = vec![
            sphere(0.0),
            Arc::new(HalfSpace::new(vec3(0.0, 0.0, 1.0), -50.0)) as Arc<dyn Primitive>,
        ];
        let scene = Scene::prepare(prims, vec![], TraceConfig::default(), CutConfig::default()).unwrap();
        let inside = Ray::new(point3(0.0, 0.0, 0.0), vec3(2.0, 0.0, 0.0));
        assert_eq!(scene.start_distance(&inside), Some(-1.0));
        let far = Ray::new(point3(-10.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0));
        assert_eq!(scene.start_distance(&far), Some(9.0));
        let behind = Ray::new(point3(10.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0));
        assert_eq!(scene.start_distance(&behind), None);
    }
}
