//! Pure geometry: edge path calculators and path distance math.
//!
//! Each calculator maps two endpoint positions (plus the source socket's
//! side, and the destination side when known) to an ordered list of
//! [`PathSegment`]s a presentation layer can paint directly. The calculators
//! are selected by an edge's [`EdgeStyle`] and are swappable at runtime:
//! changing the style and recomputing yields a new path for the same
//! endpoints.

use crate::edge::EdgeStyle;
use crate::socket::SocketSide;

/// Vertical control-point offset applied when a bezier edge must double
/// back past its source node.
pub const CP_ROUNDNESS: f32 = 100.0;
/// Weight of the square calculator's vertical midpoint between source and
/// destination x.
pub const SQUARE_MID_WEIGHT: f32 = 0.5;
/// Horizontal escape distance the improved calculators keep clear of the
/// node body.
pub const NODE_ESCAPE: f32 = 6.0;
/// Minimum control-point distance for the improved bezier calculator.
pub const MIN_CURVATURE: f32 = 24.0;

/// One drawable step of an edge path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    /// Cubic curve: two control points, then the destination.
    CubicTo((f32, f32), (f32, f32), (f32, f32)),
}

/// Compute the path for an edge style between two endpoints.
///
/// `dest_side` is `None` while the destination end is being dragged.
pub fn calc_path(
    style: EdgeStyle,
    source: (f32, f32),
    dest: (f32, f32),
    source_side: SocketSide,
    dest_side: Option<SocketSide>,
) -> Vec<PathSegment> {
    match style {
        EdgeStyle::Direct => calc_direct(source, dest),
        EdgeStyle::Bezier => calc_bezier(source, dest, source_side),
        EdgeStyle::Square => calc_square(source, dest),
        EdgeStyle::ImprovedSharp => calc_improved_sharp(source, dest, source_side, dest_side),
        EdgeStyle::ImprovedBezier => calc_improved_bezier(source, dest, source_side, dest_side),
    }
}

/// Single straight segment.
pub fn calc_direct(source: (f32, f32), dest: (f32, f32)) -> Vec<PathSegment> {
    vec![
        PathSegment::MoveTo(source.0, source.1),
        PathSegment::LineTo(dest.0, dest.1),
    ]
}

/// One cubic curve with horizontal control points.
///
/// The control-point offset is half the horizontal distance. When the
/// destination sits on the "wrong" side for a straight exit (the curve
/// would otherwise cut back through the node body) the offset flips sign
/// and a vertical component proportional to [`CP_ROUNDNESS`] is added so
/// the curve swings around instead.
pub fn calc_bezier(
    source: (f32, f32),
    dest: (f32, f32),
    source_side: SocketSide,
) -> Vec<PathSegment> {
    let (sx, sy) = source;
    let (dx, dy) = dest;
    let distance = (dx - sx) * 0.5;

    let mut cpx_s = distance;
    let mut cpx_d = -distance;
    let mut cpy_s = 0.0;
    let mut cpy_d = 0.0;

    let wrong_side = (sx > dx && source_side.is_right()) || (sx < dx && source_side.is_left());
    if wrong_side {
        cpx_s = -cpx_s;
        cpx_d = -cpx_d;
        let dy_span = sy - dy;
        // Guard against a division by zero when the endpoints share a y.
        let denom = if dy_span.abs() < 1e-4 { 1e-4 } else { dy_span.abs() };
        cpy_d = dy_span / denom * CP_ROUNDNESS;
        cpy_s = -cpy_d;
    }

    vec![
        PathSegment::MoveTo(sx, sy),
        PathSegment::CubicTo((sx + cpx_s, sy + cpy_s), (dx + cpx_d, dy + cpy_d), (dx, dy)),
    ]
}

/// Three axis-aligned segments through a weighted midpoint x.
pub fn calc_square(source: (f32, f32), dest: (f32, f32)) -> Vec<PathSegment> {
    calc_square_weighted(source, dest, SQUARE_MID_WEIGHT)
}

/// [`calc_square`] with a configurable midpoint weight (0.0 = at source,
/// 1.0 = at destination).
pub fn calc_square_weighted(
    source: (f32, f32),
    dest: (f32, f32),
    weight: f32,
) -> Vec<PathSegment> {
    let (sx, sy) = source;
    let (dx, dy) = dest;
    let mid_x = sx + (dx - sx) * weight;
    vec![
        PathSegment::MoveTo(sx, sy),
        PathSegment::LineTo(mid_x, sy),
        PathSegment::LineTo(mid_x, dy),
        PathSegment::LineTo(dx, dy),
    ]
}

fn escape_offset(side: SocketSide) -> f32 {
    if side.is_right() {
        NODE_ESCAPE
    } else {
        -NODE_ESCAPE
    }
}

/// Horizontal escape segments at each end joined by a straight middle.
///
/// Below the escape threshold the path degrades to a direct line.
pub fn calc_improved_sharp(
    source: (f32, f32),
    dest: (f32, f32),
    source_side: SocketSide,
    dest_side: Option<SocketSide>,
) -> Vec<PathSegment> {
    let (sx, sy) = source;
    let (dx, dy) = dest;
    let span = ((dx - sx).powi(2) + (dy - sy).powi(2)).sqrt();
    if span <= NODE_ESCAPE {
        return calc_direct(source, dest);
    }

    let exit_x = sx + escape_offset(source_side);
    let mut path = vec![PathSegment::MoveTo(sx, sy), PathSegment::LineTo(exit_x, sy)];
    if let Some(side) = dest_side {
        let enter_x = dx + escape_offset(side);
        path.push(PathSegment::LineTo(enter_x, dy));
    }
    path.push(PathSegment::LineTo(dx, dy));
    path
}

/// Same escape segments as [`calc_improved_sharp`], but the middle is a
/// cubic curve whose control-point distance scales with the Euclidean
/// distance between the endpoints, clamped to [`MIN_CURVATURE`].
pub fn calc_improved_bezier(
    source: (f32, f32),
    dest: (f32, f32),
    source_side: SocketSide,
    dest_side: Option<SocketSide>,
) -> Vec<PathSegment> {
    let (sx, sy) = source;
    let (dx, dy) = dest;
    let span = ((dx - sx).powi(2) + (dy - sy).powi(2)).sqrt();
    if span <= NODE_ESCAPE {
        return calc_direct(source, dest);
    }

    let exit = (sx + escape_offset(source_side), sy);
    let enter = match dest_side {
        Some(side) => (dx + escape_offset(side), dy),
        None => (dx, dy),
    };
    let curvature = (span * 0.25).max(MIN_CURVATURE);
    let c1 = (
        exit.0 + curvature * escape_offset(source_side).signum(),
        exit.1,
    );
    let c2 = match dest_side {
        Some(side) => (enter.0 + curvature * escape_offset(side).signum(), enter.1),
        None => enter,
    };

    let mut path = vec![
        PathSegment::MoveTo(sx, sy),
        PathSegment::LineTo(exit.0, exit.1),
        PathSegment::CubicTo(c1, c2, enter),
    ];
    if dest_side.is_some() {
        path.push(PathSegment::LineTo(dx, dy));
    }
    path
}

// ----------------------------------------------------------------------
// Sampling and distance
// ----------------------------------------------------------------------

fn cubic_point(
    p0: (f32, f32),
    p1: (f32, f32),
    p2: (f32, f32),
    p3: (f32, f32),
    t: f32,
) -> (f32, f32) {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    (
        a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
        a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
    )
}

/// Flatten a path into a polyline, sampling each cubic segment
/// `curve_samples` times.
pub fn sample_path(path: &[PathSegment], curve_samples: usize) -> Vec<(f32, f32)> {
    let curve_samples = curve_samples.max(2);
    let mut points = Vec::new();
    let mut cursor = (0.0, 0.0);
    for segment in path {
        match *segment {
            PathSegment::MoveTo(x, y) => {
                cursor = (x, y);
                points.push(cursor);
            }
            PathSegment::LineTo(x, y) => {
                cursor = (x, y);
                points.push(cursor);
            }
            PathSegment::CubicTo(c1, c2, end) => {
                for i in 1..=curve_samples {
                    let t = i as f32 / curve_samples as f32;
                    points.push(cubic_point(cursor, c1, c2, end, t));
                }
                cursor = end;
            }
        }
    }
    points
}

/// Squared distance from a point to the segment `a`–`b`.
pub fn distance_to_segment_sq(point: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (point.0 - a.0, point.1 - a.1);
    let ab_len_sq = ab.0 * ab.0 + ab.1 * ab.1;
    if ab_len_sq < f32::EPSILON {
        return ap.0 * ap.0 + ap.1 * ap.1;
    }
    let t = ((ap.0 * ab.0 + ap.1 * ab.1) / ab_len_sq).clamp(0.0, 1.0);
    let closest = (a.0 + t * ab.0, a.1 + t * ab.1);
    let dx = point.0 - closest.0;
    let dy = point.1 - closest.1;
    dx * dx + dy * dy
}

/// Minimum distance from a point to a path, by sampling.
///
/// Used for edge hover hit-testing and by the drop-to-insert tool.
pub fn distance_to_path(point: (f32, f32), path: &[PathSegment], curve_samples: usize) -> f32 {
    let polyline = sample_path(path, curve_samples);
    let mut min_sq = f32::MAX;
    for pair in polyline.windows(2) {
        let d = distance_to_segment_sq(point, pair[0], pair[1]);
        if d < min_sq {
            min_sq = d;
        }
    }
    if min_sq == f32::MAX {
        return f32::MAX;
    }
    min_sq.sqrt()
}
