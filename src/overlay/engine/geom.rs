use serde::{Deserialize, Serialize};

/// Axis-aligned integer rectangle in image pixels, `x1`/`y1` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Saturates at `i32::MAX` for boxes spanning most of the coordinate range.
    pub fn width(&self) -> i32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> i32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_valid(&self) -> bool {
        self.x0 < self.x1 && self.y0 < self.y1
    }

    pub fn center(&self) -> PointF {
        PointF {
            x: (i64::from(self.x0) + i64::from(self.x1)) as f32 / 2.0,
            y: (i64::from(self.y0) + i64::from(self.y1)) as f32 / 2.0,
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x0, self.y0),
            Point::new(self.x1, self.y0),
            Point::new(self.x1, self.y1),
            Point::new(self.x0, self.y1),
        ]
    }

    /// Bounding rectangle of a point set, `None` when empty.
    pub fn from_points(points: &[Point]) -> Option<Rect> {
        let first = points.first()?;
        let mut rect = Rect::new(first.x, first.y, first.x, first.y);
        for point in &points[1..] {
            rect.x0 = rect.x0.min(point.x);
            rect.y0 = rect.y0.min(point.y);
            rect.x1 = rect.x1.max(point.x);
            rect.y1 = rect.y1.max(point.y);
        }
        Some(rect)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Sub-pixel position inside a block surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Quadrilateral as delivered by OCR providers: either `[[x, y]; 4]` or a flat
/// list of 8 numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawGeometry {
    Points(Vec<[f64; 2]>),
    Flat(Vec<f64>),
}

impl RawGeometry {
    /// Normalises to exactly four rounded integer vertices. Coordinates that
    /// are not finite or do not fit in `i32` make the geometry malformed.
    pub fn vertices(&self) -> Option<[Point; 4]> {
        let pairs: Vec<[f64; 2]> = match self {
            RawGeometry::Points(points) => points.clone(),
            RawGeometry::Flat(values) => {
                if values.len() != 8 {
                    return None;
                }
                values.chunks_exact(2).map(|pair| [pair[0], pair[1]]).collect()
            }
        };
        if pairs.len() != 4 {
            return None;
        }
        let mut out = [Point::new(0, 0); 4];
        for (slot, [x, y]) in out.iter_mut().zip(pairs) {
            *slot = Point::new(to_coordinate(x)?, to_coordinate(y)?);
        }
        Some(out)
    }
}

fn to_coordinate(value: f64) -> Option<i32> {
    let rounded = value.round();
    if rounded.is_finite() && rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX) {
        Some(rounded as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_both_rects() {
        let a = Rect::new(0, 0, 50, 20);
        let b = Rect::new(55, 2, 100, 22);
        assert_eq!(a.union(&b), Rect::new(0, 0, 100, 22));
    }

    #[test]
    fn flat_geometry_normalises_to_pairs() {
        let geometry = RawGeometry::Flat(vec![0.4, 0.0, 10.6, 0.0, 10.0, 5.0, 0.0, 5.0]);
        let vertices = geometry.vertices().expect("four vertices");
        assert_eq!(vertices[0], Point::new(0, 0));
        assert_eq!(vertices[1], Point::new(11, 0));
        assert_eq!(vertices[2], Point::new(10, 5));
    }

    #[test]
    fn malformed_geometry_is_rejected() {
        assert!(RawGeometry::Flat(vec![0.0; 6]).vertices().is_none());
        assert!(RawGeometry::Points(vec![[0.0, 0.0]; 3]).vertices().is_none());
        assert!(RawGeometry::Points(vec![[f64::NAN, 0.0]; 4]).vertices().is_none());
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let huge = RawGeometry::Flat(vec![0.0, 0.0, 3.0e9, 0.0, 3.0e9, 5.0, 0.0, 5.0]);
        assert!(huge.vertices().is_none());
        let negative = RawGeometry::Points(vec![[-1.0e12, 0.0], [4.0, 0.0], [4.0, 2.0], [0.0, 2.0]]);
        assert!(negative.vertices().is_none());
        let edge = RawGeometry::Flat(vec![
            0.0,
            2.0e9,
            4.0,
            2.0e9,
            4.0,
            f64::from(i32::MAX),
            0.0,
            f64::from(i32::MAX),
        ]);
        assert_eq!(edge.vertices().map(|v| v[2].y), Some(i32::MAX));
    }

    #[test]
    fn extents_saturate_instead_of_overflowing() {
        let rect = Rect::new(-2_000_000_000, -2_000_000_000, 2_000_000_000, 2_000_000_000);
        assert_eq!(rect.width(), i32::MAX);
        assert_eq!(rect.height(), i32::MAX);
        assert_eq!(rect.center(), PointF::new(0.0, 0.0));
    }

    #[test]
    fn geometry_deserializes_both_shapes() {
        let pairs: RawGeometry = serde_json::from_str("[[0,0],[4,0],[4,2],[0,2]]").unwrap();
        assert!(matches!(pairs, RawGeometry::Points(_)));
        let flat: RawGeometry = serde_json::from_str("[0,0,4,0,4,2,0,2]").unwrap();
        assert!(matches!(flat, RawGeometry::Flat(_)));
        assert_eq!(pairs.vertices(), flat.vertices());
    }

    #[test]
    fn bounding_rect_of_points() {
        let rect = Rect::from_points(&[Point::new(3, 9), Point::new(1, 2), Point::new(7, 4)]);
        assert_eq!(rect, Some(Rect::new(1, 2, 7, 9)));
        assert_eq!(Rect::from_points(&[]), None);
    }
}
