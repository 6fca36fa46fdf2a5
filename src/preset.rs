use std::sync::Arc;

use math::hcm::{point3, vec3, Point3};
use primitive::{Cuboid, HalfSpace, Primitive, Sphere, TriangleMesh};
use rand::{Rng, SeedableRng};
use raytrace::{BoolTree, Region};

/// Primitives and regions of a test model, before the space partition is built.
pub struct Model {
    pub prims: Vec<Arc<dyn Primitive>>,
    pub regions: Vec<Region>,
}

pub fn names() -> &'static [&'static str] {
    &["shell", "cabin", "blocks", "spheres"]
}

pub fn by_name(name: &str, seed: u64) -> Option<Model> {
    match name {
        "shell" => Some(shell()),
        "cabin" => Some(cabin()),
        "blocks" => Some(blocks()),
        "spheres" => Some(random_spheres(seed, 200)),
        _ => None,
    }
}

/// A hollow ball: thickness 3, inner radius 1.
pub fn shell() -> Model {
    Model {
        prims: vec![
            Arc::new(Sphere::new(Point3::ORIGIN, 4.0)),
            Arc::new(Sphere::new(Point3::ORIGIN, 1.0)),
        ],
        regions: vec![Region::new(
            "shell",
            BoolTree::solid(0).subtract(BoolTree::solid(1)),
        )],
    }
}

/// A box of air holding a seat, standing on an infinite floor.
pub fn cabin() -> Model {
    let prims: Vec<Arc<dyn Primitive>> = vec![
        Arc::new(Cuboid::from_points(point3(-5.0, -4.0, 0.0), point3(5.0, 4.0, 6.0))),
        Arc::new(Cuboid::from_points(point3(-1.0, -1.0, 0.0), point3(1.0, 1.0, 1.5))),
        Arc::new(Sphere::new(point3(0.0, 0.0, 2.5), 1.0)),
        Arc::new(HalfSpace::new(vec3(0.0, 0.0, 1.0), 0.0)),
    ];
    let regions = vec![
        Region::air("cabin", 1, BoolTree::solid(0)),
        Region::new("seat", BoolTree::union_of([1, 2])),
        Region::new("floor", BoolTree::solid(3)),
    ];
    Model { prims, regions }
}

/// Piece-enabled meshes next to a few solids, some overlapping.
pub fn blocks() -> Model {
    let mut prims: Vec<Arc<dyn Primitive>> = vec![];
    let mut regions = vec![];
    for i in 0..4 {
        let x = i as f64 * 6.0;
        let mesh = TriangleMesh::cuboid(point3(x, -2.0, -2.0), point3(x + 4.0, 2.0, 2.0))
            .with_pieces(i % 2 == 0);
        prims.push(Arc::new(mesh));
        regions.push(Region::new(&format!("block{}", i), BoolTree::solid(prims.len() - 1)));
    }
    prims.push(Arc::new(Sphere::new(point3(2.0, 0.0, 0.0), 1.5)));
    regions.push(Region::new("core", BoolTree::solid(prims.len() - 1)));
    prims.push(Arc::new(Cuboid::from_points(
        point3(-2.0, -0.5, -0.5),
        point3(24.0, 0.5, 0.5),
    )));
    regions.push(Region::new(
        "rod",
        BoolTree::solid(prims.len() - 1).subtract(BoolTree::solid(prims.len() - 2)),
    ));
    Model { prims, regions }
}

/// Random spheres grouped three to a region.
pub fn random_spheres(seed: u64, count: usize) -> Model {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let prims: Vec<Arc<dyn Primitive>> = (0..count)
        .map(|_| {
            let center = point3(
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
            );
            Arc::new(Sphere::new(center, rng.gen_range(0.2..2.0))) as Arc<dyn Primitive>
        })
        .collect();
    let regions = (0..count)
        .step_by(3)
        .map(|i| {
            let group = i..(i + 3).min(count);
            Region::new(&format!("cluster{}", i / 3), BoolTree::union_of(group))
        })
        .collect();
    Model { prims, regions }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_model_is_consistent() {
        for &name in names() {
            let model = by_name(name, 1).unwrap();
            let count = model.prims.len();
            for region in model.regions.iter() {
                assert!(
                    region.tree().prims().iter().all(|p| p.index() < count),
                    "{}: region {} refers past {} prims",
                    name,
                    region.name(),
                    count
                );
            }
        }
        assert!(by_name("teapot", 1).is_none());
    }
}
