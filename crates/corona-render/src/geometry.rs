//! Polar geometry and renderer-agnostic arc paths.
//!
//! Angles are radians measured clockwise from 12 o'clock; `y` grows downward (SVG/canvas space),
//! centered on the chart origin.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt::Write as _;

pub use std::f64::consts::TAU;

/// Tolerance for geometric comparisons.
pub const EPSILON: f64 = 1e-6;

/// Arcs narrower than this (radians) are not emitted.
pub const MIN_ARC_SPAN: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

pub fn polar_to_cartesian(radius: f64, angle: f64) -> Point {
    Point {
        x: radius * angle.sin(),
        y: -radius * angle.cos(),
    }
}

/// Inverse of [`polar_to_cartesian`]; the angle is normalized into `[0, TAU)`.
pub fn cartesian_to_polar(point: Point) -> (f64, f64) {
    let radius = point.x.hypot(point.y);
    let mut angle = point.x.atan2(-point.y);
    if angle < 0.0 {
        angle += TAU;
    }
    if angle >= TAU {
        angle -= TAU;
    }
    (radius, angle)
}

/// Angular (`x0..x1`, radians) and radial (`y0..y1`, pixels) extent of a wedge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcGeometry {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl ArcGeometry {
    pub fn span(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn thickness(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn mid_angle(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        (self.x0 - other.x0).abs() <= EPSILON
            && (self.x1 - other.x1).abs() <= EPSILON
            && (self.y0 - other.y0).abs() <= EPSILON
            && (self.y1 - other.y1).abs() <= EPSILON
    }

    /// Zero-area wedge at this arc's mid angle and inner radius; the starting point of a
    /// radial grow-in.
    pub fn collapsed_at_mid(&self) -> Self {
        let mid = self.mid_angle();
        Self {
            x0: mid,
            x1: mid,
            y0: self.y0,
            y1: self.y0,
        }
    }

    pub fn lerp(&self, to: &Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self {
            x0: mix(self.x0, to.x0),
            x1: mix(self.x1, to.x1),
            y0: mix(self.y0, to.y0),
            y1: mix(self.y1, to.y1),
        }
    }

    pub fn centroid(&self) -> Point {
        polar_to_cartesian((self.y0 + self.y1) / 2.0, self.mid_angle())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// Circular arc to `to`, in SVG elliptical-arc flag terms.
    Arc {
        radius: f64,
        large_arc: bool,
        sweep: bool,
        to: Point,
    },
    Close,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArcPath {
    pub commands: Vec<PathCommand>,
}

impl ArcPath {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn to_svg_path_data(&self) -> String {
        let mut out = String::new();
        for cmd in &self.commands {
            match cmd {
                PathCommand::MoveTo(p) => {
                    let _ = write!(out, "M{},{}", fmt_number(p.x), fmt_number(p.y));
                }
                PathCommand::LineTo(p) => {
                    let _ = write!(out, "L{},{}", fmt_number(p.x), fmt_number(p.y));
                }
                PathCommand::Arc {
                    radius,
                    large_arc,
                    sweep,
                    to,
                } => {
                    let r = fmt_number(*radius);
                    let _ = write!(
                        out,
                        "A{r},{r},0,{},{},{},{}",
                        u8::from(*large_arc),
                        u8::from(*sweep),
                        fmt_number(to.x),
                        fmt_number(to.y)
                    );
                }
                PathCommand::Close => out.push('Z'),
            }
        }
        out
    }
}

/// Describes the outline of an annular sector.
///
/// Degenerate wedges (no span or no thickness) produce an empty path. A full turn is drawn as
/// two half circles per ring, with the inner ring wound the other way so it cuts a hole.
pub fn describe_arc(geom: &ArcGeometry) -> ArcPath {
    let span = geom.span();
    let inner = geom.y0.max(0.0);
    let outer = geom.y1.max(0.0);
    if !(span > 0.0) || !(outer - inner > 0.0) {
        return ArcPath::default();
    }

    let mut commands = Vec::with_capacity(10);

    if span >= TAU - EPSILON {
        let start = geom.x0;
        let half = start + PI;
        commands.push(PathCommand::MoveTo(polar_to_cartesian(outer, start)));
        commands.push(PathCommand::Arc {
            radius: outer,
            large_arc: true,
            sweep: true,
            to: polar_to_cartesian(outer, half),
        });
        commands.push(PathCommand::Arc {
            radius: outer,
            large_arc: true,
            sweep: true,
            to: polar_to_cartesian(outer, start),
        });
        commands.push(PathCommand::Close);
        if inner > EPSILON {
            commands.push(PathCommand::MoveTo(polar_to_cartesian(inner, start)));
            commands.push(PathCommand::Arc {
                radius: inner,
                large_arc: true,
                sweep: false,
                to: polar_to_cartesian(inner, half),
            });
            commands.push(PathCommand::Arc {
                radius: inner,
                large_arc: true,
                sweep: false,
                to: polar_to_cartesian(inner, start),
            });
            commands.push(PathCommand::Close);
        }
        return ArcPath { commands };
    }

    let large_arc = span > PI;
    commands.push(PathCommand::MoveTo(polar_to_cartesian(outer, geom.x0)));
    commands.push(PathCommand::Arc {
        radius: outer,
        large_arc,
        sweep: true,
        to: polar_to_cartesian(outer, geom.x1),
    });
    if inner > EPSILON {
        commands.push(PathCommand::LineTo(polar_to_cartesian(inner, geom.x1)));
        commands.push(PathCommand::Arc {
            radius: inner,
            large_arc,
            sweep: false,
            to: polar_to_cartesian(inner, geom.x0),
        });
    } else {
        commands.push(PathCommand::LineTo(Point { x: 0.0, y: 0.0 }));
    }
    commands.push(PathCommand::Close);
    ArcPath { commands }
}

/// Formats path coordinates with at most 3 decimals, trimming trailing zeros.
pub fn fmt_number(v: f64) -> String {
    if !v.is_finite() || v.abs() < 0.0005 {
        return "0".to_string();
    }
    let mut s = format!("{:.3}", (v * 1000.0).round() / 1000.0);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" { "0".to_string() } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn polar_round_trip_uses_clock_convention() {
        let p = polar_to_cartesian(10.0, 0.0);
        assert!(close(p.x, 0.0) && close(p.y, -10.0), "0 rad points up");
        let p = polar_to_cartesian(10.0, PI / 2.0);
        assert!(close(p.x, 10.0) && close(p.y, 0.0), "quarter turn points right");

        let (r, a) = cartesian_to_polar(polar_to_cartesian(5.0, 4.0));
        assert!(close(r, 5.0));
        assert!(close(a, 4.0));
    }

    #[test]
    fn fmt_number_trims() {
        assert_eq!(fmt_number(1.0), "1");
        assert_eq!(fmt_number(1.25), "1.25");
        assert_eq!(fmt_number(-0.0001), "0");
        assert_eq!(fmt_number(2.0004), "2");
        assert_eq!(fmt_number(f64::NAN), "0");
    }

    #[test]
    fn quarter_annulus_path() {
        let d = describe_arc(&ArcGeometry {
            x0: 0.0,
            x1: PI / 2.0,
            y0: 10.0,
            y1: 20.0,
        })
        .to_svg_path_data();
        assert_eq!(d, "M0,-20A20,20,0,0,1,20,0L10,0A10,10,0,0,0,0,-10Z");
    }

    #[test]
    fn wedge_without_hole_goes_through_center() {
        let path = describe_arc(&ArcGeometry {
            x0: 0.0,
            x1: 4.0,
            y0: 0.0,
            y1: 30.0,
        });
        assert!(matches!(
            path.commands[1],
            PathCommand::Arc {
                large_arc: true,
                ..
            }
        ));
        assert_eq!(path.commands[2], PathCommand::LineTo(Point { x: 0.0, y: 0.0 }));
    }

    #[test]
    fn full_ring_uses_two_sub_paths() {
        let path = describe_arc(&ArcGeometry {
            x0: 0.0,
            x1: TAU,
            y0: 10.0,
            y1: 20.0,
        });
        let moves = path
            .commands
            .iter()
            .filter(|c| matches!(c, PathCommand::MoveTo(_)))
            .count();
        assert_eq!(moves, 2);
        assert_eq!(path.commands.len(), 8);
    }

    #[test]
    fn degenerate_arcs_have_no_path() {
        let g = ArcGeometry {
            x0: 1.0,
            x1: 1.0,
            y0: 0.0,
            y1: 10.0,
        };
        assert!(describe_arc(&g).is_empty());
        assert!(describe_arc(&g.collapsed_at_mid()).is_empty());
    }
}
