//! Static triangle geometry and its bounding-volume hierarchy
//!
//! Level meshes (mountains, structures, monuments) are stored in world space.
//! A [`Bvh`] over the triangles answers the two queries collision needs:
//! closest surface point to a point, and sphere overlap.

use glam::Vec3;

/// Triangles per BVH leaf
const LEAF_SIZE: usize = 4;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any `grow` call replaces
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut aabb = Self::EMPTY;
        for &p in points {
            aabb.grow(p);
        }
        aabb
    }

    #[inline]
    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    #[inline]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Squared distance from `p` to the box (0 inside)
    #[inline]
    pub fn distance_squared(&self, p: Vec3) -> f32 {
        let clamped = p.clamp(self.min, self.max);
        p.distance_squared(clamped)
    }

    #[inline]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        !self.is_empty() && self.distance_squared(center) <= radius * radius
    }

    /// Index of the longest axis (0 = x, 1 = y, 2 = z)
    fn longest_axis(&self) -> usize {
        let e = self.max - self.min;
        if e.x >= e.y && e.x >= e.z {
            0
        } else if e.y >= e.z {
            1
        } else {
            2
        }
    }
}

/// A world-space triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Unit normal from counter-clockwise winding (zero for degenerate triangles)
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&[self.a, self.b, self.c])
    }

    pub fn is_degenerate(&self) -> bool {
        (self.b - self.a).cross(self.c - self.a).length_squared() < 1e-12
    }

    /// Closest point on the triangle to `p` (Voronoi region walk)
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        let (a, b, c) = (self.a, self.b, self.c);
        let ab = b - a;
        let ac = c - a;

        // Vertex region A
        let ap = p - a;
        let d1 = ab.dot(ap);
        let d2 = ac.dot(ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        // Vertex region B
        let bp = p - b;
        let d3 = ab.dot(bp);
        let d4 = ac.dot(bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        // Edge AB
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return a + ab * v;
        }

        // Vertex region C
        let cp = p - c;
        let d5 = ab.dot(cp);
        let d6 = ac.dot(cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        // Edge AC
        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return a + ac * w;
        }

        // Edge BC
        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return b + (c - b) * w;
        }

        // Face interior
        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        a + ab * v + ac * w
    }

    /// Same triangle with the winding flipped
    fn flipped(&self) -> Triangle {
        Triangle::new(self.a, self.c, self.b)
    }
}

/// A triangle soup in world space
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    pub triangles: Vec<Triangle>,
}

impl TriMesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Build from an indexed vertex list; faces with out-of-range indices are skipped
    pub fn from_indexed(vertices: &[Vec3], faces: &[[u32; 3]]) -> Self {
        let mut triangles = Vec::with_capacity(faces.len());
        for face in faces {
            let fetch = |i: u32| vertices.get(i as usize).copied();
            match (fetch(face[0]), fetch(face[1]), fetch(face[2])) {
                (Some(a), Some(b), Some(c)) => triangles.push(Triangle::new(a, b, c)),
                _ => log::warn!("Skipping face {:?}: index out of range", face),
            }
        }
        Self { triangles }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn aabb(&self) -> Aabb {
        self.triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, t| acc.union(&t.aabb()))
    }

    /// Vertical cone standing on `base_center` (side faces plus base cap)
    pub fn cone(base_center: Vec3, radius: f32, height: f32, sides: u32) -> Self {
        let sides = sides.max(3);
        let apex = base_center + Vec3::Y * height;
        let ring = ring_points(base_center, radius, sides);
        let interior = base_center + Vec3::Y * (height * 0.25);

        let mut triangles = Vec::with_capacity(sides as usize * 2);
        for i in 0..ring.len() {
            let p0 = ring[i];
            let p1 = ring[(i + 1) % ring.len()];
            push_outward(&mut triangles, interior, Triangle::new(p0, apex, p1));
            push_outward(&mut triangles, interior, Triangle::new(base_center, p0, p1));
        }
        Self { triangles }
    }

    /// Vertical prism (pillar) with its base at `base_center`
    pub fn prism(base_center: Vec3, radius: f32, height: f32, sides: u32) -> Self {
        let sides = sides.max(3);
        let top_center = base_center + Vec3::Y * height;
        let bottom = ring_points(base_center, radius, sides);
        let top = ring_points(top_center, radius, sides);
        let interior = base_center + Vec3::Y * (height * 0.5);

        let mut triangles = Vec::with_capacity(sides as usize * 4);
        for i in 0..bottom.len() {
            let j = (i + 1) % bottom.len();
            push_outward(&mut triangles, interior, Triangle::new(bottom[i], top[i], bottom[j]));
            push_outward(&mut triangles, interior, Triangle::new(bottom[j], top[i], top[j]));
            push_outward(&mut triangles, interior, Triangle::new(base_center, bottom[i], bottom[j]));
            push_outward(&mut triangles, interior, Triangle::new(top_center, top[j], top[i]));
        }
        Self { triangles }
    }

    /// Geodesic sphere: icosahedron subdivided `subdivisions` times
    pub fn icosphere(center: Vec3, radius: f32, subdivisions: u32) -> Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let verts = [
            Vec3::new(-1.0, t, 0.0),
            Vec3::new(1.0, t, 0.0),
            Vec3::new(-1.0, -t, 0.0),
            Vec3::new(1.0, -t, 0.0),
            Vec3::new(0.0, -1.0, t),
            Vec3::new(0.0, 1.0, t),
            Vec3::new(0.0, -1.0, -t),
            Vec3::new(0.0, 1.0, -t),
            Vec3::new(t, 0.0, -1.0),
            Vec3::new(t, 0.0, 1.0),
            Vec3::new(-t, 0.0, -1.0),
            Vec3::new(-t, 0.0, 1.0),
        ]
        .map(|v| v.normalize());
        const FACES: [[usize; 3]; 20] = [
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        // Work on the unit sphere, place at the end
        let mut faces: Vec<[Vec3; 3]> = FACES
            .iter()
            .map(|f| [verts[f[0]], verts[f[1]], verts[f[2]]])
            .collect();
        for _ in 0..subdivisions {
            let mut next = Vec::with_capacity(faces.len() * 4);
            for [a, b, c] in faces {
                let ab = (a + b).normalize();
                let bc = (b + c).normalize();
                let ca = (c + a).normalize();
                next.push([a, ab, ca]);
                next.push([b, bc, ab]);
                next.push([c, ca, bc]);
                next.push([ab, bc, ca]);
            }
            faces = next;
        }

        let mut triangles = Vec::with_capacity(faces.len());
        for [a, b, c] in faces {
            let tri = Triangle::new(center + a * radius, center + b * radius, center + c * radius);
            push_outward(&mut triangles, center, tri);
        }
        Self { triangles }
    }
}

/// Evenly spaced points on a horizontal circle
fn ring_points(center: Vec3, radius: f32, sides: u32) -> Vec<Vec3> {
    (0..sides)
        .map(|i| {
            let theta = i as f32 / sides as f32 * std::f32::consts::TAU;
            center + Vec3::new(theta.cos() * radius, 0.0, theta.sin() * radius)
        })
        .collect()
}

/// Push a triangle of a convex solid, flipping it so its normal faces away from `interior`
fn push_outward(out: &mut Vec<Triangle>, interior: Vec3, tri: Triangle) {
    if tri.normal().dot(tri.centroid() - interior) < 0.0 {
        out.push(tri.flipped());
    } else {
        out.push(tri);
    }
}

/// Result of a closest-point query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestHit {
    /// Closest point on the mesh surface
    pub point: Vec3,
    /// Outward normal of the triangle containing `point`
    pub normal: Vec3,
    /// Index into the source mesh's triangle list
    pub triangle: u32,
    pub distance_squared: f32,
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf { start: u32, count: u32 },
    Inner { left: u32, right: u32 },
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    aabb: Aabb,
    kind: NodeKind,
}

/// Bounding-volume hierarchy over a [`TriMesh`]
///
/// Built once when a chunk's geometry finishes loading; immutable afterwards.
#[derive(Debug, Clone)]
pub struct Bvh {
    triangles: Vec<Triangle>,
    normals: Vec<Vec3>,
    /// Triangle indices, permuted so every leaf owns a contiguous range
    order: Vec<u32>,
    nodes: Vec<BvhNode>,
}

impl Bvh {
    /// Build the hierarchy (median split on the longest centroid axis).
    /// Degenerate triangles are dropped.
    pub fn build(mesh: &TriMesh) -> Self {
        let triangles: Vec<Triangle> = mesh
            .triangles
            .iter()
            .copied()
            .filter(|t| !t.is_degenerate())
            .collect();
        let normals = triangles.iter().map(Triangle::normal).collect();
        let centroids: Vec<Vec3> = triangles.iter().map(Triangle::centroid).collect();
        let mut order: Vec<u32> = (0..triangles.len() as u32).collect();
        let mut nodes = Vec::new();

        if !triangles.is_empty() {
            build_node(&triangles, &centroids, &mut order, 0, &mut nodes);
        }

        Self {
            triangles,
            normals,
            order,
            nodes,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bounds of the whole mesh (empty box for an empty mesh)
    pub fn aabb(&self) -> Aabb {
        self.nodes.first().map(|n| n.aabb).unwrap_or(Aabb::EMPTY)
    }

    /// Closest surface point to `p`, or `None` for an empty mesh
    pub fn closest_point(&self, p: Vec3) -> Option<ClosestHit> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best: Option<ClosestHit> = None;
        let mut best_d2 = f32::INFINITY;
        let mut stack: Vec<u32> = Vec::with_capacity(32);
        stack.push(0);

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            if node.aabb.distance_squared(p) > best_d2 {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { start, count } => {
                    for &ti in &self.order[start as usize..(start + count) as usize] {
                        let q = self.triangles[ti as usize].closest_point(p);
                        let d2 = p.distance_squared(q);
                        if d2 < best_d2 {
                            best_d2 = d2;
                            best = Some(ClosestHit {
                                point: q,
                                normal: self.normals[ti as usize],
                                triangle: ti,
                                distance_squared: d2,
                            });
                        }
                    }
                }
                NodeKind::Inner { left, right } => {
                    // Visit the nearer child first (pushed last)
                    let dl = self.nodes[left as usize].aabb.distance_squared(p);
                    let dr = self.nodes[right as usize].aabb.distance_squared(p);
                    if dl <= dr {
                        stack.push(right);
                        stack.push(left);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }

        best
    }

    /// Whether any triangle lies within `radius` of `center`
    pub fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let mut hit = false;
        self.visit_sphere(center, radius, |_| {
            hit = true;
            false
        });
        hit
    }

    /// Indices of all triangles within `radius` of `center`
    pub fn triangles_in_sphere(&self, center: Vec3, radius: f32) -> Vec<u32> {
        let mut out = Vec::new();
        self.visit_sphere(center, radius, |ti| {
            out.push(ti);
            true
        });
        out.sort_unstable();
        out
    }

    /// Walk triangles touching the sphere; the visitor returns `false` to stop early
    fn visit_sphere<F: FnMut(u32) -> bool>(&self, center: Vec3, radius: f32, mut visit: F) {
        if self.nodes.is_empty() {
            return;
        }
        let r2 = radius * radius;
        let mut stack: Vec<u32> = vec![0];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            if node.aabb.distance_squared(center) > r2 {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { start, count } => {
                    for &ti in &self.order[start as usize..(start + count) as usize] {
                        let q = self.triangles[ti as usize].closest_point(center);
                        if center.distance_squared(q) <= r2 && !visit(ti) {
                            return;
                        }
                    }
                }
                NodeKind::Inner { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
    }
}

/// Recursively build the subtree for `order[..]`, whose first element sits at
/// `offset` in the full order array. Returns the node index.
fn build_node(
    triangles: &[Triangle],
    centroids: &[Vec3],
    order: &mut [u32],
    offset: u32,
    nodes: &mut Vec<BvhNode>,
) -> u32 {
    let aabb = order
        .iter()
        .fold(Aabb::EMPTY, |acc, &i| acc.union(&triangles[i as usize].aabb()));
    let index = nodes.len() as u32;
    nodes.push(BvhNode {
        aabb,
        kind: NodeKind::Leaf {
            start: offset,
            count: order.len() as u32,
        },
    });

    if order.len() <= LEAF_SIZE {
        return index;
    }

    let centroid_bounds = Aabb::from_points(
        &order
            .iter()
            .map(|&i| centroids[i as usize])
            .collect::<Vec<_>>(),
    );
    let axis = centroid_bounds.longest_axis();
    order.sort_by(|&a, &b| {
        centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
    });

    let mid = order.len() / 2;
    let (lo, hi) = order.split_at_mut(mid);
    let left = build_node(triangles, centroids, lo, offset, nodes);
    let right = build_node(triangles, centroids, hi, offset + mid as u32, nodes);
    nodes[index as usize].kind = NodeKind::Inner { left, right };
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force_closest(mesh: &TriMesh, p: Vec3) -> f32 {
        mesh.triangles
            .iter()
            .filter(|t| !t.is_degenerate())
            .map(|t| p.distance_squared(t.closest_point(p)))
            .fold(f32::INFINITY, f32::min)
    }

    #[test]
    fn test_triangle_closest_point_regions() {
        let tri = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Z);
        // Above the face interior
        let q = tri.closest_point(Vec3::new(0.2, 3.0, 0.2));
        assert!((q - Vec3::new(0.2, 0.0, 0.2)).length() < 1e-6);
        // Vertex region
        assert_eq!(tri.closest_point(Vec3::new(-1.0, 0.0, -1.0)), Vec3::ZERO);
        // Edge BC
        let q = tri.closest_point(Vec3::new(1.0, 0.0, 1.0));
        assert!((q - Vec3::new(0.5, 0.0, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_icosphere_normals_point_outward() {
        let center = Vec3::new(3.0, 0.0, 0.0);
        let mesh = TriMesh::icosphere(center, 5.0, 2);
        assert_eq!(mesh.len(), 320);
        for tri in &mesh.triangles {
            assert!(tri.normal().dot(tri.centroid() - center) > 0.0);
        }
    }

    #[test]
    fn test_cone_and_prism_normals_point_outward() {
        let cone = TriMesh::cone(Vec3::ZERO, 4.2, 7.5, 6);
        assert_eq!(cone.len(), 12);
        let prism = TriMesh::prism(Vec3::ZERO, 2.0, 4.0, 8);
        assert_eq!(prism.len(), 32);
        let inside = Vec3::new(0.0, 1.0, 0.0);
        for tri in cone.triangles.iter().chain(&prism.triangles) {
            assert!(tri.normal().dot(tri.centroid() - inside) > 0.0);
        }
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let mut mesh = TriMesh::icosphere(Vec3::new(3.0, 0.0, 0.0), 5.0, 2);
        mesh.triangles
            .extend(TriMesh::cone(Vec3::new(-20.0, 0.0, -10.0), 4.2, 7.5, 6).triangles);
        let bvh = Bvh::build(&mesh);
        assert!(bvh.node_count() > 1);

        let probes = [
            Vec3::ZERO,
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(-18.0, 1.0, -9.0),
            Vec3::new(10.0, 10.0, 10.0),
            Vec3::new(-5.0, -2.0, 4.0),
        ];
        for p in probes {
            let hit = bvh.closest_point(p).expect("non-empty mesh");
            let expected = brute_force_closest(&mesh, p);
            assert!(
                (hit.distance_squared - expected).abs() < 1e-3,
                "probe {p:?}: bvh {} vs brute {}",
                hit.distance_squared,
                expected
            );
        }
    }

    #[test]
    fn test_empty_mesh_queries() {
        let bvh = Bvh::build(&TriMesh::default());
        assert!(bvh.closest_point(Vec3::ZERO).is_none());
        assert!(!bvh.overlaps_sphere(Vec3::ZERO, 100.0));
        assert!(bvh.aabb().is_empty());
    }

    #[test]
    fn test_sphere_overlap() {
        let bvh = Bvh::build(&TriMesh::icosphere(Vec3::ZERO, 5.0, 1));
        assert!(bvh.overlaps_sphere(Vec3::new(5.5, 0.0, 0.0), 1.0));
        assert!(!bvh.overlaps_sphere(Vec3::new(7.0, 0.0, 0.0), 1.0));
        // Fully inside a closed mesh but far from the surface: no triangle touches
        assert!(!bvh.overlaps_sphere(Vec3::ZERO, 1.0));
        let hits = bvh.triangles_in_sphere(Vec3::new(5.0, 0.0, 0.0), 0.5);
        assert!(!hits.is_empty());
        assert!(hits.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_from_indexed_skips_bad_faces() {
        let verts = [Vec3::ZERO, Vec3::X, Vec3::Z];
        let mesh = TriMesh::from_indexed(&verts, &[[0, 1, 2], [0, 1, 9]]);
        assert_eq!(mesh.len(), 1);
    }
}
