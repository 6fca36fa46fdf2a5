use geometry::{BBox, Ray};
use math::hcm::{Point3, Vec3};
use math::BitVec;
use thiserror::Error;

use crate::{Capability, Hit, HitTable, Primitive, Segment};

/// Errors raised while assembling a `TriangleMesh`.
#[derive(Error, Debug, PartialEq)]
pub enum MeshError {
    #[error("mesh has no triangles")]
    Empty,
    #[error("index list length {0} is not a multiple of 3")]
    RaggedIndices(usize),
    #[error("triangle {triangle} refers to vertex {index}, but there are only {count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: usize,
        count: usize,
    },
    #[error("vertex {0} is not finite")]
    NonFiniteVertex(usize),
}

#[derive(Debug, Clone)]
struct Triangle {
    indices: [usize; 3],
    bbox: BBox,
}

/// A closed triangle mesh treated as a solid: the ray is inside between a hit on a triangle
/// facing against it and the next hit on a triangle facing along it.
///
/// Triangles are wound counter-clockwise seen from outside. With pieces enabled, each triangle
/// is a piece: the space partition lists only the triangles overlapping each cell, and hits are
/// accumulated across cells until the ray has left the mesh's bounding box.
///
/// Hit private data: `surfno` is the triangle index; `vpriv` holds the barycentric `(u, v)` and
/// the dot product of the ray direction with the facet normal.
pub struct TriangleMesh {
    positions: Vec<Point3>,
    triangles: Vec<Triangle>,
    bbox: BBox,
    use_pieces: bool,
}

impl TriangleMesh {
    pub fn new(positions: Vec<Point3>, indices: &[usize]) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::RaggedIndices(indices.len()));
        }
        if indices.is_empty() {
            return Err(MeshError::Empty);
        }
        if let Some(bad) = positions.iter().position(|p| !p.is_finite()) {
            return Err(MeshError::NonFiniteVertex(bad));
        }
        let mut triangles = Vec::with_capacity(indices.len() / 3);
        for (triangle, ijk) in indices.chunks_exact(3).enumerate() {
            if let Some(&index) = ijk.iter().find(|&&i| i >= positions.len()) {
                return Err(MeshError::IndexOutOfRange {
                    triangle,
                    index,
                    count: positions.len(),
                });
            }
            let (p0, p1, p2) = (positions[ijk[0]], positions[ijk[1]], positions[ijk[2]]);
            triangles.push(Triangle {
                indices: [ijk[0], ijk[1], ijk[2]],
                bbox: BBox::new(p0, p1).union(p2),
            });
        }
        let bbox = positions
            .iter()
            .fold(BBox::empty(), |b, &p| b.union(p));
        Ok(TriangleMesh {
            positions,
            triangles,
            bbox,
            use_pieces: true,
        })
    }

    /// A closed box between `p0` and `p1`, two triangles per face.
    pub fn cuboid(p0: Point3, p1: Point3) -> Self {
        let b = BBox::new(p0, p1);
        let (lo, hi) = (b.min(), b.max());
        let positions = (0..8)
            .map(|i| {
                Point3::new(
                    if i & 1 == 0 { lo.x } else { hi.x },
                    if i & 2 == 0 { lo.y } else { hi.y },
                    if i & 4 == 0 { lo.z } else { hi.z },
                )
            })
            .collect::<Vec<_>>();
        #[rustfmt::skip]
        let indices = [
            0, 4, 6,  0, 6, 2, // -x
            1, 3, 7,  1, 7, 5, // +x
            0, 1, 5,  0, 5, 4, // -y
            2, 6, 7,  2, 7, 3, // +y
            0, 2, 3,  0, 3, 1, // -z
            4, 5, 7,  4, 7, 6, // +z
        ];
        match Self::new(positions, &indices) {
            Ok(mesh) => mesh,
            Err(e) => unreachable!("fixed cuboid topology is valid: {}", e),
        }
    }

    /// Enables or disables the per-triangle piece optimization.
    pub fn with_pieces(self, use_pieces: bool) -> Self {
        TriangleMesh { use_pieces, ..self }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn corners(&self, tri: usize) -> (Point3, Point3, Point3) {
        let [i, j, k] = self.triangles[tri].indices;
        (self.positions[i], self.positions[j], self.positions[k])
    }

    fn facet_normal(&self, tri: usize) -> Vec3 {
        let (p0, p1, p2) = self.corners(tri);
        (p1 - p0).cross(p2 - p0)
    }

    fn intersect(&self, tri: usize, r: &Ray) -> Option<Hit> {
        let (p0, p1, p2) = self.corners(tri);
        intersect_triangle(p0, p1, p2, r).map(|(t, u, v, dn)| {
            Hit::new(t, tri as i32).with_priv(Vec3::new(u, v, dn))
        })
    }
}

/// Computes the intersection of the line of `r` with a triangle, edges included.
/// Returns `(t, u, v, dn)` where `p = p0 + u*(p1-p0) + v*(p2-p0)` is the hit point and `dn` is the
/// dot product of the ray direction with the (unnormalized) facet normal.
pub fn intersect_triangle(
    p0: Point3,
    p1: Point3,
    p2: Point3,
    r: &Ray,
) -> Option<(f64, f64, f64, f64)> {
    let normal = (p1 - p0).cross(p2 - p0);
    if normal.is_zero() {
        // Degenerate triangle.
        return None;
    }
    let dn = normal.dot(r.dir);
    if dn == 0.0 {
        return None;
    }
    // The equation for the plane of the triangle would be:
    // (p - p0).dot(normal) = 0. Plugging in the ray equation $p = o + td$, we have
    // (o + td - p0).dot(normal) = 0  =>  t*dot(d, normal) = dot(p0-o, normal)
    let t = normal.dot(p0 - r.origin) / dn;
    let p = r.position_at(t);
    // Signed (doubled) areas of the sub-triangles opposite each corner.
    let b0 = (p1 - p).cross(p2 - p).dot(normal);
    let b1 = (p2 - p).cross(p0 - p).dot(normal);
    let b2 = (p0 - p).cross(p1 - p).dot(normal);
    if b0.is_nan() || b1.is_nan() || b2.is_nan() {
        log::debug!("NaN barycentrics for triangle [{}, {}, {}]", p0, p1, p2);
        return None;
    }
    let inside = (b0 >= 0.0 && b1 >= 0.0 && b2 >= 0.0) || (b0 <= 0.0 && b1 <= 0.0 && b2 <= 0.0);
    let total_area = b0 + b1 + b2;
    if !inside || total_area == 0.0 {
        return None;
    }
    Some((t, b1 / total_area, b2 / total_area, dn))
}

/// Pairs sorted hits into segments: a hit on a facet facing the ray opens a segment, the next
/// hit on a facet facing away closes it. Repeated entries (a ray crossing a shared edge reports
/// the same surface crossing twice) and exits with no open segment are dropped.
fn make_segs(hits: impl Iterator<Item = Hit>, segs: &mut Vec<Segment>) -> usize {
    let mut added = 0;
    let mut open: Option<Hit> = None;
    for hit in hits {
        let entering = hit.vpriv.z < 0.0;
        match (entering, open) {
            (true, None) => open = Some(hit),
            (true, Some(_)) => {}
            (false, Some(inhit)) => {
                segs.push(Segment::new(inhit, hit));
                added += 1;
                open = None;
            }
            (false, None) => {
                log::trace!("dropping unmatched exit {}", hit);
            }
        }
    }
    if let Some(inhit) = open {
        log::debug!("mesh left open at {}; dropping unmatched entry", inhit);
    }
    added
}

impl Primitive for TriangleMesh {
    fn summary(&self) -> String {
        format!(
            "TriangleMesh{{ {} triangles, {} }}",
            self.triangles.len(),
            self.bbox
        )
    }
    fn bbox(&self) -> BBox {
        self.bbox
    }
    fn use_rpp(&self) -> bool {
        true
    }
    fn shot(&self, r: &Ray, segs: &mut Vec<Segment>) -> usize {
        let mut hits = (0..self.triangles.len())
            .filter_map(|tri| self.intersect(tri, r))
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| a.dist.total_cmp(&b.dist));
        make_segs(hits.into_iter(), segs)
    }

    fn piece_count(&self) -> usize {
        match self.use_pieces {
            true => self.triangles.len(),
            false => 0,
        }
    }
    fn piece_bbox(&self, piece: usize) -> Option<BBox> {
        self.triangles.get(piece).map(|t| t.bbox)
    }
    fn piece_shot(
        &self,
        shot: &mut BitVec,
        hits: &mut HitTable,
        pieces: &[usize],
        dist_corr: f64,
        r: &Ray,
    ) -> Result<usize, Capability> {
        if !self.use_pieces {
            return Err(Capability::PieceShot);
        }
        let mut found = 0;
        for &piece in pieces {
            if shot.test(piece) {
                continue;
            }
            shot.set(piece);
            if let Some(mut hit) = self.intersect(piece, r) {
                hit.dist += dist_corr;
                hits.push(hit);
                found += 1;
            }
        }
        Ok(found)
    }
    fn piece_hitsegs(
        &self,
        hits: &mut HitTable,
        _r: &Ray,
        segs: &mut Vec<Segment>,
    ) -> Result<usize, Capability> {
        if !self.use_pieces {
            return Err(Capability::PieceHitsegs);
        }
        hits.sort_by_dist();
        Ok(make_segs(hits.drain(), segs))
    }

    fn norm(&self, hit: &Hit, _r: &Ray) -> Vec3 {
        let tri = hit.surfno as usize;
        self.facet_normal(tri).try_hat().unwrap_or(Vec3::ZERO)
    }
    fn uv(&self, hit: &Hit, _r: &Ray) -> (f64, f64) {
        (hit.vpriv.x, hit.vpriv.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::hcm::{point3, vec3};

    #[test]
    fn rejects_bad_indices() {
        let positions = vec![point3(0.0, 0.0, 0.0), point3(1.0, 0.0, 0.0), point3(0.0, 1.0, 0.0)];
        assert_eq!(
            TriangleMesh::new(positions.clone(), &[0, 1]).err(),
            Some(MeshError::RaggedIndices(2))
        );
        assert_eq!(
            TriangleMesh::new(positions.clone(), &[0, 1, 3]).err(),
            Some(MeshError::IndexOutOfRange {
                triangle: 0,
                index: 3,
                count: 3
            })
        );
        assert_eq!(TriangleMesh::new(positions, &[]).err(), Some(MeshError::Empty));
    }

    #[test]
    fn cuboid_normals_point_outward() {
        let mesh = TriangleMesh::cuboid(point3(-1.0, -1.0, -1.0), point3(1.0, 1.0, 1.0));
        assert_eq!(mesh.triangle_count(), 12);
        for tri in 0..12 {
            let (p0, p1, p2) = mesh.corners(tri);
            let centroid = Vec3::from(p0) + Vec3::from(p1) + Vec3::from(p2);
            assert!(
                mesh.facet_normal(tri).dot(centroid) > 0.0,
                "triangle {} faces inward",
                tri
            );
        }
    }

    #[test]
    fn whole_shot_through_shared_edge_gives_one_segment() {
        // The ray crosses the -x and +x faces exactly on their diagonals.
        let mesh = TriangleMesh::cuboid(point3(-1.0, -1.0, -1.0), point3(1.0, 1.0, 1.0));
        let r = Ray::new(point3(-5.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0));
        let mut segs = vec![];
        assert_eq!(mesh.shot(&r, &mut segs), 1, "segs = {:?}", segs);
        assert!((segs[0].inhit.dist - 4.0).abs() < 1e-12);
        assert!((segs[0].outhit.dist - 6.0).abs() < 1e-12);
        let n = mesh.norm(&segs[0].inhit, &r);
        assert!((n - vec3(-1.0, 0.0, 0.0)).norm() < 1e-12, "n = {}", n);
    }

    #[test]
    fn piece_shot_accumulates_and_skips_shot_pieces() {
        let mesh = TriangleMesh::cuboid(point3(-2.0, -1.0, -1.0), point3(8.0, 1.0, 1.0));
        let r = Ray::new(point3(0.0, 0.25, -0.5), vec3(1.0, 0.0, 0.0));
        let mut shot = BitVec::new(mesh.piece_count());
        let mut hits = HitTable::new();
        let all = (0..12).collect::<Vec<_>>();
        let found = mesh.piece_shot(&mut shot, &mut hits, &all, 100.0, &r).unwrap();
        assert_eq!(found, 2);
        assert_eq!(mesh.piece_shot(&mut shot, &mut hits, &all, 100.0, &r), Ok(0));
        let mut segs = vec![];
        assert_eq!(mesh.piece_hitsegs(&mut hits, &r, &mut segs), Ok(1));
        assert!(hits.is_empty());
        assert!((segs[0].inhit.dist - 98.0).abs() < 1e-12, "{:?}", segs[0]);
        assert!((segs[0].outhit.dist - 108.0).abs() < 1e-12, "{:?}", segs[0]);
    }

    #[test]
    fn pieces_disabled_reports_missing_capability() {
        let mesh = TriangleMesh::cuboid(point3(0.0, 0.0, 0.0), point3(1.0, 1.0, 1.0))
            .with_pieces(false);
        assert_eq!(mesh.piece_count(), 0);
        let r = Ray::new(point3(-1.0, 0.5, 0.5), vec3(1.0, 0.0, 0.0));
        let mut shot = BitVec::new(12);
        let mut hits = HitTable::new();
        assert_eq!(
            mesh.piece_shot(&mut shot, &mut hits, &[0], 0.0, &r),
            Err(Capability::PieceShot)
        );
    }
}
