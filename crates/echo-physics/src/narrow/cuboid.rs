// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Box against box.
//!
//! Separating-axis test over the 15 candidate axes of two oriented boxes
//! (padded by the margin), followed by contact generation for the axis of
//! least overlap:
//! - face axes clip the incident face of one box against the side planes of
//!   the reference face of the other;
//! - edge axes report the closest points between the two supporting edges.
//!
//! If clipping leaves nothing, the deepest support point is reported so an
//! overlap always yields at least one contact.

use echo_geom::{Vec3, EPSILON};

use super::{ContactParams, Order};
use crate::body::Body;
use crate::contact::{Contact, MANIFOLD_CAPACITY};

// A later axis must beat the current best by this much to be chosen, which
// keeps resting stacks on stable face contacts.
const RELATIVE_TOLERANCE: f64 = 0.98;
const ABSOLUTE_TOLERANCE: f64 = 0.001;

/// Oriented box in world space.
#[derive(Debug, Clone, Copy)]
struct Oriented {
    center: Vec3,
    axes: [Vec3; 3],
    half: [f64; 3],
}

impl Oriented {
    fn of(body: &Body, margin: f64) -> Option<Self> {
        let half = body.shape().half_extents()?;
        let world = body.world();
        let rot = world.rotation().to_mat3();
        Some(Self {
            center: world.location(),
            axes: [rot.column(0), rot.column(1), rot.column(2)],
            half: half.add(&Vec3::splat(margin)).to_array(),
        })
    }

    /// Half-length of the box's shadow on `axis`.
    fn project(&self, axis: &Vec3) -> f64 {
        (0..3).map(|i| self.half[i] * self.axes[i].dot(axis).abs()).sum()
    }

    /// Corner furthest along `dir`.
    fn support(&self, dir: &Vec3) -> Vec3 {
        (0..3).fold(self.center, |p, i| {
            p + self.axes[i] * (sign_of(self.axes[i].dot(dir)) * self.half[i])
        })
    }

    /// Corners of the face whose outward normal is `sign * axes[axis]`,
    /// in winding order.
    fn face(&self, axis: usize, sign: f64) -> Polygon {
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;
        let c = self.center + self.axes[axis] * (sign * self.half[axis]);
        let eu = self.axes[u] * self.half[u];
        let ev = self.axes[v] * self.half[v];
        let mut poly = Polygon::default();
        for p in [c + eu + ev, c - eu + ev, c - eu - ev, c + eu - ev] {
            poly.push(p);
        }
        poly
    }

    /// Keeps the part of `poly` inside the slab of every axis except `skip`.
    fn clip_sides(&self, poly: Polygon, skip: usize) -> Polygon {
        let mut clipped = poly;
        for k in (0..3).filter(|&k| k != skip) {
            let axis = self.axes[k];
            let mid = axis.dot(&self.center);
            clipped = clipped.clip(&axis, mid + self.half[k]);
            clipped = clipped.clip(&(-axis), -mid + self.half[k]);
        }
        clipped
    }
}

fn sign_of(value: f64) -> f64 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Convex polygon with room for a quad clipped by four planes.
#[derive(Debug, Clone, Copy, Default)]
struct Polygon {
    points: [Vec3; 8],
    len: usize,
}

impl Polygon {
    fn push(&mut self, p: Vec3) {
        if self.len < self.points.len() {
            self.points[self.len] = p;
            self.len += 1;
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Vec3> {
        self.points[..self.len].iter()
    }

    /// Sutherland-Hodgman against the half-space `normal · p <= offset`.
    fn clip(&self, normal: &Vec3, offset: f64) -> Self {
        let mut out = Self::default();
        for i in 0..self.len {
            let p = self.points[i];
            let q = self.points[(i + 1) % self.len];
            let dp = normal.dot(&p) - offset;
            let dq = normal.dot(&q) - offset;
            if dp <= 0.0 {
                out.push(p);
            }
            if (dp < 0.0 && dq > 0.0) || (dp > 0.0 && dq < 0.0) {
                out.push(p + (q - p) * (dp / (dp - dq)));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum Feature {
    FaceB(usize),
    FaceA(usize),
    Edge(usize, usize),
}

#[derive(Debug, Clone, Copy)]
struct Axis {
    overlap: f64,
    normal: Vec3,
    feature: Feature,
}

/// Overlap of both boxes on `axis`, with the normal oriented from B to A.
/// `None` when the axis separates them.
fn test_axis(a: &Oriented, b: &Oriented, axis: Vec3, feature: Feature) -> Option<Axis> {
    let offset = a.center - b.center;
    let along = offset.dot(&axis);
    let overlap = a.project(&axis) + b.project(&axis) - along.abs();
    if overlap < 0.0 {
        return None;
    }
    let normal = if along < 0.0 { -axis } else { axis };
    Some(Axis {
        overlap,
        normal,
        feature,
    })
}

/// Axis of least overlap, or `None` if any axis separates the boxes.
fn least_overlap(a: &Oriented, b: &Oriented) -> Option<Axis> {
    let mut best: Option<Axis> = None;
    for j in 0..3 {
        let found = test_axis(a, b, b.axes[j], Feature::FaceB(j))?;
        if best.is_none_or(|current| found.overlap < current.overlap) {
            best = Some(found);
        }
    }
    let beats = |found: &Axis, current: &Option<Axis>| {
        current.is_none_or(|c| found.overlap < c.overlap * RELATIVE_TOLERANCE - ABSOLUTE_TOLERANCE)
    };
    for i in 0..3 {
        let found = test_axis(a, b, a.axes[i], Feature::FaceA(i))?;
        if beats(&found, &best) {
            best = Some(found);
        }
    }
    for i in 0..3 {
        for j in 0..3 {
            let cross = a.axes[i].cross(&b.axes[j]);
            let len = cross.length();
            if len < EPSILON {
                // Parallel edges: already covered by the face axes.
                continue;
            }
            let found = test_axis(a, b, cross * (1.0 / len), Feature::Edge(i, j))?;
            if beats(&found, &best) {
                best = Some(found);
            }
        }
    }
    best
}

/// Box (A) against box (B).
///
/// Both boxes are tested with their half-extents grown by the collision
/// margin, so flush faces report a depth of `-2 * margin` and a box resting
/// on another box settles about `2 * margin` above it. [`collide_box_plane`]
/// tests the true corners instead, so a box rests flush on a plane.
///
/// [`collide_box_plane`]: crate::narrow::collide_box_plane
pub fn collide_box_box(a: &Body, b: &Body, params: &ContactParams, out: &mut Vec<Contact>) -> Order {
    let (Some(oa), Some(ob)) = (Oriented::of(a, params.margin), Oriented::of(b, params.margin))
    else {
        return Order::Kept;
    };
    let Some(axis) = least_overlap(&oa, &ob) else {
        return Order::Kept;
    };
    let n = axis.normal;
    match axis.feature {
        Feature::FaceB(j) => {
            let reference = ob.center + n * ob.half[j];
            let (i, sign) = incident_face(&oa, &(-n));
            for q in ob.clip_sides(oa.face(i, sign), j).iter() {
                let depth = (*q - reference).dot(&n);
                if depth <= 0.0 {
                    out.push(Contact {
                        point: *q - n * depth,
                        normal: n,
                        depth,
                    });
                }
            }
        }
        Feature::FaceA(i) => {
            let reference = oa.center - n * oa.half[i];
            let (j, sign) = incident_face(&ob, &n);
            for q in oa.clip_sides(ob.face(j, sign), i).iter() {
                let depth = (reference - *q).dot(&n);
                if depth <= 0.0 {
                    out.push(Contact {
                        point: *q,
                        normal: n,
                        depth,
                    });
                }
            }
        }
        Feature::Edge(i, j) => {
            out.push(edge_contact(&oa, &ob, i, j, &n));
        }
    }
    if out.is_empty() {
        out.push(Contact {
            point: ob.support(&n),
            normal: n,
            depth: -axis.overlap,
        });
    }
    reduce(out, &n);
    Order::Kept
}

/// Face of `boxed` whose outward normal points most along `toward`.
fn incident_face(boxed: &Oriented, toward: &Vec3) -> (usize, f64) {
    let mut best = 0;
    let mut best_dot = f64::NEG_INFINITY;
    for (i, axis) in boxed.axes.iter().enumerate() {
        let d = axis.dot(toward).abs();
        if d > best_dot {
            best_dot = d;
            best = i;
        }
    }
    (best, sign_of(boxed.axes[best].dot(toward)))
}

/// Closest points between the edge of A along axis `i` and the edge of B
/// along axis `j` that face each other across `n`.
fn edge_contact(a: &Oriented, b: &Oriented, i: usize, j: usize, n: &Vec3) -> Contact {
    let mut pa = a.center;
    let mut pb = b.center;
    for k in 0..3 {
        if k != i {
            pa += a.axes[k] * (-sign_of(a.axes[k].dot(n)) * a.half[k]);
        }
        if k != j {
            pb += b.axes[k] * (sign_of(b.axes[k].dot(n)) * b.half[k]);
        }
    }
    let da = a.axes[i];
    let db = b.axes[j];
    let r = pa - pb;
    let cross_dot = da.dot(&db);
    let c = da.dot(&r);
    let f = db.dot(&r);
    let denom = 1.0 - cross_dot * cross_dot;
    let s = if denom > EPSILON {
        ((cross_dot * f - c) / denom).clamp(-a.half[i], a.half[i])
    } else {
        0.0
    };
    let t = (cross_dot * s + f).clamp(-b.half[j], b.half[j]);
    let s = (cross_dot * t - c).clamp(-a.half[i], a.half[i]);
    let on_a = pa + da * s;
    let on_b = pb + db * t;
    Contact {
        point: on_b,
        normal: *n,
        depth: (on_a - on_b).dot(n),
    }
}

/// Keeps at most [`MANIFOLD_CAPACITY`] contacts: the deepest, the one
/// furthest from it, and the two spanning the most area on either side.
fn reduce(contacts: &mut Vec<Contact>, n: &Vec3) {
    if contacts.len() <= MANIFOLD_CAPACITY {
        return;
    }
    let deepest = index_of_max(contacts, |c| -c.depth);
    let p0 = contacts[deepest].point;
    let far = index_of_max(contacts, |c| c.point.distance_squared(&p0));
    let p1 = contacts[far].point;
    let signed_area = |c: &Contact| (p1 - p0).cross(&(c.point - p0)).dot(n);
    let left = index_of_max(contacts, signed_area);
    let right = index_of_max(contacts, |c| -signed_area(c));
    let mut keep = [deepest, far, left, right];
    keep.sort_unstable();
    let mut chosen = [contacts[0]; MANIFOLD_CAPACITY];
    let mut count = 0;
    for (slot, &index) in keep.iter().enumerate() {
        if slot == 0 || keep[slot - 1] != index {
            chosen[count] = contacts[index];
            count += 1;
        }
    }
    contacts.clear();
    contacts.extend_from_slice(&chosen[..count]);
}

fn index_of_max(contacts: &[Contact], score: impl Fn(&Contact) -> f64) -> usize {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, c) in contacts.iter().enumerate() {
        let s = score(c);
        if s > best_score {
            best_score = s;
            best = i;
        }
    }
    best
}
