use geometry::{InvDir, Ray};
use math::float::Float;
use math::BitVec;

use crate::scene::Scene;

/// Finds how far behind the origin the traversal has to start so that piece primitives whose
/// bounds straddle the origin are entered at their first hit.
///
/// Walks the cells from the origin to `model_end`. Every piece primitive whose bounding box the
/// ray enters before the backing floor is marked in `backbits`, and the earliest such entry
/// becomes the start distance. The result is never before `model_start`.
pub(crate) fn find_backing_dist(
    scene: &Scene,
    ray: &Ray,
    inv: &InvDir,
    model_start: f64,
    model_end: f64,
    backbits: &mut BitVec,
) -> f64 {
    let config = scene.config();
    let tree = scene.tree();
    let mut seen = BitVec::new(scene.prims().len());
    let mut min_backing = config.backing_dist;
    let mut cur = 0.0;
    while cur <= model_end {
        let (_, cell) = tree.locate(ray.position_at(cur));
        let clipped = match cell.bbox.clip(ray, inv) {
            Some(iv) => iv,
            None => break,
        };
        cur = step_past(cur, clipped.max, config.offset_dist);

        for list in cell.pieces.iter() {
            let i = list.prim.index();
            if seen.test(i) {
                continue;
            }
            seen.set(i);
            if let Some(iv) = scene.prim_bbox(list.prim).clip(ray, inv) {
                if iv.min < config.backing_dist {
                    backbits.set(i);
                    min_backing = min_backing.min(iv.min);
                }
            }
        }
    }
    log::trace!("backing distance {} for {}", min_backing, ray);
    min_backing.max(model_start)
}

/// The next walk distance after leaving a cell at `exit`. Always strictly past `cur`, also where
/// `offset` is below the float spacing of `cur`.
fn step_past(cur: f64, exit: f64, offset: f64) -> f64 {
    let next = (exit + offset).max(cur + offset);
    match next > cur {
        true => next,
        false => cur + offset.max(2.0 * cur.ulp()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::hcm::{point3, vec3};
    use primitive::{Cuboid, PrimId, Primitive, TriangleMesh};
    use std::sync::Arc;

    use crate::region::{BoolTree, Region};

    fn scene() -> Scene {
        let prims: Vec<Arc<dyn Primitive>> = vec![
            Arc::new(
                TriangleMesh::cuboid(point3(-6.0, -1.0, -1.0), point3(8.0, 1.0, 1.0))
                    .with_pieces(true),
            ),
            Arc::new(Cuboid::from_points(point3(-9.0, 3.0, -1.0), point3(9.0, 4.0, 1.0))),
            Arc::new(
                TriangleMesh::cuboid(point3(1.0, -1.0, -1.0), point3(3.0, 1.0, 1.0))
                    .with_pieces(true),
            ),
        ];
        let regions = vec![
            Region::new("long", BoolTree::solid(0)),
            Region::new("side", BoolTree::solid(1)),
            Region::new("short", BoolTree::solid(2)),
        ];
        Scene::prepare(prims, regions, Default::default(), Default::default()).unwrap()
    }

    #[test]
    fn reaches_back_to_straddling_pieces() {
        let scene = scene();
        let ray = Ray::new(point3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0));
        let inv = ray.inverse();
        let model = scene.tree().model_bbox().clip(&ray, &inv).unwrap();
        assert_eq!(model.min, -9.0);
        let mut backbits = BitVec::new(3);
        let start = find_backing_dist(&scene, &ray, &inv, model.min, model.max, &mut backbits);
        assert_eq!(start, -6.0);
        assert_eq!(backbits.iter_ones().collect::<Vec<_>>(), vec![0]);
        assert!(!backbits.test(PrimId(2).index()), "starts in front of the floor");
    }

    #[test]
    fn walk_always_moves_forward() {
        assert!((step_past(2.0, 5.0, 0.01) - 5.01).abs() < 1e-12);
        assert!((step_past(2.0, 1.0, 0.01) - 2.01).abs() < 1e-12);
        for cur in [0.0, 5.0, 1e15] {
            assert!(step_past(cur, cur, 0.0) > cur, "stalled at {}", cur);
            assert!(step_past(cur, cur - 3.0, 0.01) > cur, "stalled at {}", cur);
        }
    }

    #[test]
    fn never_before_model_start() {
        let scene = scene();
        let ray = Ray::new(point3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0));
        let inv = ray.inverse();
        let mut backbits = BitVec::new(3);
        let start = find_backing_dist(&scene, &ray, &inv, -4.0, 9.0, &mut backbits);
        assert_eq!(start, -4.0);
    }
}
