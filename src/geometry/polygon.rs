//! Simple polygon primitives used by the obstacle graph
//!
//! The planner only needs a handful of operations from its geometry kernel:
//! point containment, segment intersection, a bounding circle for cheap
//! rejection, and an offset ("buffer") used to derive the slightly shrunken
//! inner polygon that all collision tests run against.

use crate::common::{NavError, NavResult, Point2D};

/// Areas below this are treated as degenerate polygons
const MIN_AREA: f64 = 1e-12;

/// Offsets whose miter denominator falls below this are clamped
const MIN_MITER_DENOM: f64 = 1e-6;

/// Closed simple polygon with a cached bounding circle
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<Point2D>,
    center: Point2D,
    radius: f64,
    signed_area: f64,
}

impl Polygon {
    /// Create a polygon from its vertices in order (either winding)
    pub fn new(points: Vec<Point2D>) -> NavResult<Self> {
        if points.len() < 3 {
            return Err(NavError::InvalidParameter(format!(
                "polygon needs at least 3 points, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(NavError::InvalidParameter(
                "polygon points must be finite".to_string(),
            ));
        }

        let signed_area = Self::calc_signed_area(&points);
        if signed_area.abs() < MIN_AREA {
            return Err(NavError::InvalidParameter(
                "polygon has zero area".to_string(),
            ));
        }

        let center = Self::calc_centroid(&points, signed_area);
        let radius = points
            .iter()
            .map(|p| p.distance(&center))
            .fold(0.0, f64::max);

        Ok(Polygon {
            points,
            center,
            radius,
            signed_area,
        })
    }

    /// Axis-aligned rectangle with its lower-left corner at (x, y)
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> NavResult<Self> {
        Self::new(vec![
            Point2D::new(x, y),
            Point2D::new(x + width, y),
            Point2D::new(x + width, y + height),
            Point2D::new(x, y + height),
        ])
    }

    /// Regular polygon with `sides` vertices on a circle (counter-clockwise)
    pub fn regular(center: Point2D, radius: f64, sides: usize) -> NavResult<Self> {
        let points = (0..sides)
            .map(|i| {
                let angle = 2.0 * std::f64::consts::PI * i as f64 / sides as f64;
                Point2D::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
            })
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> Point2D {
        self.points[index]
    }

    pub fn prev_index(&self, index: usize) -> usize {
        if index == 0 {
            self.points.len() - 1
        } else {
            index - 1
        }
    }

    pub fn next_index(&self, index: usize) -> usize {
        if index + 1 == self.points.len() {
            0
        } else {
            index + 1
        }
    }

    /// Centroid of the polygon area
    pub fn center(&self) -> Point2D {
        self.center
    }

    /// Distance from the center to the furthest vertex
    pub fn bounding_radius(&self) -> f64 {
        self.radius
    }

    /// Positive for counter-clockwise winding
    pub fn signed_area(&self) -> f64 {
        self.signed_area
    }

    pub fn area(&self) -> f64 {
        self.signed_area.abs()
    }

    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area > 0.0
    }

    /// Crossing-number containment test
    pub fn contains_point(&self, p: &Point2D) -> bool {
        if p.distance_sq(&self.center) > self.radius * self.radius {
            return false;
        }

        let mut inside = false;
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if (pi.y > p.y) != (pj.y > p.y) {
                let x_cross = (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Cheap rejection: can the segment touch the bounding circle at all?
    pub fn intersection_possible(&self, p1: &Point2D, p2: &Point2D) -> bool {
        point_segment_distance_sq(&self.center, p1, p2) <= self.radius * self.radius
    }

    /// True if the segment crosses or touches an edge, or lies inside the polygon
    pub fn intersects_segment(&self, p1: &Point2D, p2: &Point2D) -> bool {
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            if segments_intersect(p1, p2, &self.points[j], &self.points[i]) {
                return true;
            }
            j = i;
        }
        self.contains_point(p1)
    }

    /// Offset every edge by `amount` along its outward normal.
    ///
    /// Negative amounts shrink the polygon. Returns `None` when the result
    /// collapses or flips orientation.
    pub fn buffered(&self, amount: f64) -> Option<Polygon> {
        if amount == 0.0 {
            return Some(self.clone());
        }

        let n = self.points.len();
        let orientation = if self.is_counter_clockwise() { 1.0 } else { -1.0 };
        let normals: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[self.next_index(i)];
                let (dx, dy) = (b.x - a.x, b.y - a.y);
                let len = (dx * dx + dy * dy).sqrt();
                if len == 0.0 {
                    (0.0, 0.0)
                } else {
                    (orientation * dy / len, -orientation * dx / len)
                }
            })
            .collect();

        let mut offset = Vec::with_capacity(n);
        for i in 0..n {
            let n1 = normals[self.prev_index(i)];
            let n2 = normals[i];
            let denom = (1.0 + n1.0 * n2.0 + n1.1 * n2.1).max(MIN_MITER_DENOM);
            let p = self.points[i];
            offset.push(Point2D::new(
                p.x + amount * (n1.0 + n2.0) / denom,
                p.y + amount * (n1.1 + n2.1) / denom,
            ));
        }

        // An edge that reverses direction means the offset passed through itself
        for i in 0..n {
            let j = self.next_index(i);
            let (a, b) = (self.points[i], self.points[j]);
            let (c, d) = (offset[i], offset[j]);
            if (b.x - a.x) * (d.x - c.x) + (b.y - a.y) * (d.y - c.y) <= 0.0 {
                return None;
            }
        }

        let buffered = Polygon::new(offset).ok()?;
        if buffered.signed_area.signum() != self.signed_area.signum() {
            return None;
        }
        if amount < 0.0 && buffered.area() >= self.area() {
            return None;
        }
        Some(buffered)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Polygon {
        Polygon {
            points: self.points.iter().map(|p| p.translated(dx, dy)).collect(),
            center: self.center.translated(dx, dy),
            radius: self.radius,
            signed_area: self.signed_area,
        }
    }

    /// Scale about the centroid
    pub fn scaled(&self, factor: f64) -> NavResult<Polygon> {
        let c = self.center;
        Polygon::new(
            self.points
                .iter()
                .map(|p| Point2D::new(c.x + (p.x - c.x) * factor, c.y + (p.y - c.y) * factor))
                .collect(),
        )
    }

    /// Rotate about the centroid by `angle` radians
    pub fn rotated(&self, angle: f64) -> Polygon {
        let (sin, cos) = angle.sin_cos();
        let c = self.center;
        let points = self
            .points
            .iter()
            .map(|p| {
                let (x, y) = (p.x - c.x, p.y - c.y);
                Point2D::new(c.x + x * cos - y * sin, c.y + x * sin + y * cos)
            })
            .collect();
        Polygon {
            points,
            center: c,
            radius: self.radius,
            signed_area: self.signed_area,
        }
    }

    fn calc_signed_area(points: &[Point2D]) -> f64 {
        let n = points.len();
        let mut sum = 0.0;
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        sum * 0.5
    }

    fn calc_centroid(points: &[Point2D], signed_area: f64) -> Point2D {
        // Shift to the first vertex to keep the products small
        let origin = points[0];
        let n = points.len();
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let a = Point2D::new(points[i].x - origin.x, points[i].y - origin.y);
            let b = points[(i + 1) % n];
            let b = Point2D::new(b.x - origin.x, b.y - origin.y);
            let f = a.x * b.y - b.x * a.y;
            cx += (a.x + b.x) * f;
            cy += (a.y + b.y) * f;
        }
        let k = 1.0 / (6.0 * signed_area);
        Point2D::new(origin.x + cx * k, origin.y + cy * k)
    }
}

/// Squared distance from `p` to the segment `a`-`b`
pub fn point_segment_distance_sq(p: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_sq(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_sq(&Point2D::new(a.x + t * dx, a.y + t * dy))
}

/// Closed-segment intersection test, touching and collinear overlap included
pub fn segments_intersect(p1: &Point2D, p2: &Point2D, q1: &Point2D, q2: &Point2D) -> bool {
    let d1 = q1.cross(q2, p1);
    let d2 = q1.cross(q2, p2);
    let d3 = p1.cross(p2, q1);
    let d4 = p1.cross(p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// `p` is known collinear with `a`-`b`; check it lies within the box
fn on_segment(a: &Point2D, b: &Point2D, p: &Point2D) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}
