//! Mapping strategies — linear index to (circle, segment) cell.
//!
//! Four deterministic strategies place the 1-based index `n` on a polar grid
//! of `C` circles with `S` segments each. Every strategy uses
//! `limit = C × S` and clamps its result into the grid.
//!
//! [`Position::project`] turns a cell into polar and Cartesian coordinates.
//! It depends only on the cell and on `S`, which is what lets a stored
//! dataset be re-projected for a different segment count.
//!
//! # Examples
//!
//! ```
//! use primemap::mapping::{Layout, MappingStrategy, Position};
//!
//! let layout = Layout::new(10, 24);
//! let cell = MappingStrategy::Linear.locate(11, &layout);
//! assert_eq!((cell.circle, cell.segment), (0, 10));
//!
//! let pos = Position::project(cell, 24);
//! assert_eq!(pos.radius, 1);
//! assert!((pos.angle - 150.0).abs() < 1e-12);
//! ```

use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grid dimensions a strategy maps into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    /// Number of concentric circles, `>= 1`.
    pub circle_count: u32,
    /// Segments per circle, `>= 1`.
    pub segments_per_circle: u32,
}

impl Layout {
    /// A grid of `circle_count × segments_per_circle` cells.
    #[inline]
    pub const fn new(circle_count: u32, segments_per_circle: u32) -> Self {
        Self {
            circle_count,
            segments_per_circle,
        }
    }

    /// `circle_count × segments_per_circle`.
    #[inline]
    pub const fn limit(&self) -> u64 {
        self.circle_count as u64 * self.segments_per_circle as u64
    }

    #[inline]
    fn clamp_circle(&self, circle: u64) -> u32 {
        circle.min(u64::from(self.circle_count.saturating_sub(1))) as u32
    }

    #[inline]
    fn clamp_segment(&self, segment: u64) -> u32 {
        segment.min(u64::from(self.segments_per_circle.saturating_sub(1))) as u32
    }
}

/// A grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Circle index, `0..circle_count`.
    pub circle: u32,
    /// Segment index, `0..segments_per_circle`.
    pub segment: u32,
}

/// Polar and Cartesian placement of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// `circle + 1`.
    pub radius: u32,
    /// `segment × 360 / segments_per_circle`, in degrees.
    pub angle: f64,
    /// `radius · cos(angle)`.
    pub x: f64,
    /// `radius · sin(angle)`.
    pub y: f64,
}

impl Position {
    /// Project a cell for a grid with `segments_per_circle` segments.
    pub fn project(cell: Cell, segments_per_circle: u32) -> Self {
        let radius = cell.circle + 1;
        let angle = f64::from(cell.segment) * 360.0 / f64::from(segments_per_circle.max(1));
        let radians = angle.to_radians();
        let r = f64::from(radius);
        Self {
            radius,
            angle,
            x: r * radians.cos(),
            y: r * radians.sin(),
        }
    }
}

/// One way of placing indices on the grid.
pub trait Mapping {
    /// Cell for the 1-based index `n`.
    fn locate(&self, n: u64, layout: &Layout) -> Cell;
}

/// Row-major fill: `n − 1` split into circle and segment.
pub struct LinearMapping;

impl Mapping for LinearMapping {
    #[inline]
    fn locate(&self, n: u64, layout: &Layout) -> Cell {
        let idx = n.saturating_sub(1);
        let s = u64::from(layout.segments_per_circle.max(1));
        Cell {
            circle: layout.clamp_circle(idx / s),
            segment: (idx % s) as u32,
        }
    }
}

/// Logarithmic compression: `ln(n+1) / ln(limit+1)` of the grid.
pub struct LogarithmicMapping;

impl Mapping for LogarithmicMapping {
    #[inline]
    fn locate(&self, n: u64, layout: &Layout) -> Cell {
        let limit = layout.limit() as f64;
        let fraction = ((n as f64) + 1.0).ln() / (limit + 1.0).ln();
        let position = (fraction * limit).floor().max(0.0) as u64;
        let s = u64::from(layout.segments_per_circle.max(1));
        Cell {
            circle: layout.clamp_circle(position / s),
            segment: (position % s) as u32,
        }
    }
}

/// Archimedean spiral: `θ = 2π√(n/limit)`, `r = √(n/limit) · C`.
pub struct ArchimedeanSpiral;

impl Mapping for ArchimedeanSpiral {
    #[inline]
    fn locate(&self, n: u64, layout: &Layout) -> Cell {
        let t = ((n as f64) / layout.limit() as f64).sqrt();
        spiral_cell(TAU * t, t * f64::from(layout.circle_count), layout)
    }
}

/// Golden-angle spiral: `θ = 2πn/φ`, `r = √n/√limit · C`.
pub struct FibonacciSpiral;

/// The golden ratio `(1 + √5) / 2`.
pub const PHI: f64 = 1.618_033_988_749_895;

impl Mapping for FibonacciSpiral {
    #[inline]
    fn locate(&self, n: u64, layout: &Layout) -> Cell {
        let nf = n as f64;
        let theta = 2.0 * PI * nf / PHI;
        let r = nf.sqrt() / (layout.limit() as f64).sqrt() * f64::from(layout.circle_count);
        spiral_cell(theta, r, layout)
    }
}

/// Shared cell derivation for the two spirals.
#[inline]
fn spiral_cell(theta: f64, r: f64, layout: &Layout) -> Cell {
    let turn = theta.rem_euclid(TAU) / TAU;
    let segment = (turn * f64::from(layout.segments_per_circle)).floor().max(0.0) as u64;
    Cell {
        circle: layout.clamp_circle(r.floor().max(0.0) as u64),
        segment: layout.clamp_segment(segment),
    }
}

/// The selectable strategies.
///
/// Canonical names are kebab-case; the Spanish names are accepted as
/// aliases when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingStrategy {
    /// [`LinearMapping`].
    #[serde(alias = "lineal")]
    Linear,
    /// [`LogarithmicMapping`].
    #[serde(alias = "logaritmico")]
    Logarithmic,
    /// [`ArchimedeanSpiral`].
    #[serde(alias = "arquimedes")]
    ArchimedeanSpiral,
    /// [`FibonacciSpiral`].
    #[serde(alias = "fibonacci")]
    FibonacciSpiral,
}

impl MappingStrategy {
    /// Every strategy.
    pub const ALL: [MappingStrategy; 4] = [
        MappingStrategy::Linear,
        MappingStrategy::Logarithmic,
        MappingStrategy::ArchimedeanSpiral,
        MappingStrategy::FibonacciSpiral,
    ];

    /// Canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Logarithmic => "logarithmic",
            Self::ArchimedeanSpiral => "archimedean-spiral",
            Self::FibonacciSpiral => "fibonacci-spiral",
        }
    }

    /// Locate `n` with this strategy.
    #[inline]
    pub fn locate(self, n: u64, layout: &Layout) -> Cell {
        match self {
            Self::Linear => LinearMapping.locate(n, layout),
            Self::Logarithmic => LogarithmicMapping.locate(n, layout),
            Self::ArchimedeanSpiral => ArchimedeanSpiral.locate(n, layout),
            Self::FibonacciSpiral => FibonacciSpiral.locate(n, layout),
        }
    }
}

impl fmt::Display for MappingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned for an unrecognized strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mapping strategy `{0}` (expected linear, logarithmic, archimedean-spiral or fibonacci-spiral)")]
pub struct UnknownStrategy(pub String);

impl FromStr for MappingStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "lineal" => Ok(Self::Linear),
            "logarithmic" | "logaritmico" => Ok(Self::Logarithmic),
            "archimedean-spiral" | "archimedean" | "arquimedes" => Ok(Self::ArchimedeanSpiral),
            "fibonacci-spiral" | "fibonacci" => Ok(Self::FibonacciSpiral),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Layout {
        Layout::new(10, 24)
    }

    #[test]
    fn linear_fills_rows() {
        let l = grid();
        let m = MappingStrategy::Linear;
        assert_eq!(m.locate(1, &l), Cell { circle: 0, segment: 0 });
        assert_eq!(m.locate(11, &l), Cell { circle: 0, segment: 10 });
        assert_eq!(m.locate(24, &l), Cell { circle: 0, segment: 23 });
        assert_eq!(m.locate(25, &l), Cell { circle: 1, segment: 0 });
        assert_eq!(m.locate(240, &l), Cell { circle: 9, segment: 23 });
        // Past the end the circle clamps.
        assert_eq!(m.locate(241, &l).circle, 9);
    }

    #[test]
    fn logarithmic_endpoints() {
        let l = grid();
        let m = MappingStrategy::Logarithmic;
        // ln 2 / ln 241 · 240 ≈ 30.33
        assert_eq!(m.locate(1, &l), Cell { circle: 1, segment: 6 });
        // The last index lands on position 240, clamped onto the outer circle.
        assert_eq!(m.locate(240, &l), Cell { circle: 9, segment: 0 });
    }

    #[test]
    fn archimedean_full_turn_at_limit() {
        let l = grid();
        let m = MappingStrategy::ArchimedeanSpiral;
        // n = limit: θ = 2π wraps to 0, r = C clamps to C − 1.
        assert_eq!(m.locate(240, &l), Cell { circle: 9, segment: 0 });
        // n = limit / 4: t = 0.5, θ = π, r = 5.
        assert_eq!(m.locate(60, &l), Cell { circle: 5, segment: 12 });
    }

    #[test]
    fn fibonacci_radius_grows_with_sqrt() {
        let l = grid();
        let m = MappingStrategy::FibonacciSpiral;
        assert_eq!(m.locate(60, &l).circle, 5);
        assert_eq!(m.locate(240, &l).circle, 9);
        assert_eq!(m.locate(1, &l).circle, 0);
    }

    #[test]
    fn every_strategy_stays_in_grid() {
        for layout in [Layout::new(1, 1), Layout::new(3, 7), Layout::new(10, 24)] {
            for strategy in MappingStrategy::ALL {
                for n in 1..=layout.limit() {
                    let cell = strategy.locate(n, &layout);
                    assert!(cell.circle < layout.circle_count, "{strategy} n={n}");
                    assert!(cell.segment < layout.segments_per_circle, "{strategy} n={n}");
                }
            }
        }
    }

    #[test]
    fn strategies_dispatch_to_their_mapping() {
        let l = Layout::new(7, 13);
        for n in 1..=l.limit() {
            assert_eq!(MappingStrategy::Linear.locate(n, &l), LinearMapping.locate(n, &l));
            assert_eq!(
                MappingStrategy::Logarithmic.locate(n, &l),
                LogarithmicMapping.locate(n, &l)
            );
            assert_eq!(
                MappingStrategy::ArchimedeanSpiral.locate(n, &l),
                ArchimedeanSpiral.locate(n, &l)
            );
            assert_eq!(
                MappingStrategy::FibonacciSpiral.locate(n, &l),
                FibonacciSpiral.locate(n, &l)
            );
        }
    }

    #[test]
    fn projection_quadrants() {
        let p = Position::project(Cell { circle: 1, segment: 6 }, 24);
        assert_eq!(p.radius, 2);
        assert!((p.angle - 90.0).abs() < 1e-12);
        assert!(p.x.abs() < 1e-12);
        assert!((p.y - 2.0).abs() < 1e-12);

        let p = Position::project(Cell { circle: 0, segment: 0 }, 24);
        assert_eq!((p.x, p.y), (1.0, 0.0));
    }

    #[test]
    fn parse_names_and_aliases() {
        assert_eq!("linear".parse(), Ok(MappingStrategy::Linear));
        assert_eq!("lineal".parse(), Ok(MappingStrategy::Linear));
        assert_eq!("Arquimedes".parse(), Ok(MappingStrategy::ArchimedeanSpiral));
        assert_eq!("fibonacci".parse(), Ok(MappingStrategy::FibonacciSpiral));
        assert!("spiral".parse::<MappingStrategy>().is_err());
        let json = serde_json::to_string(&MappingStrategy::ArchimedeanSpiral).unwrap();
        assert_eq!(json, "\"archimedean-spiral\"");
        let alias: MappingStrategy = serde_json::from_str("\"logaritmico\"").unwrap();
        assert_eq!(alias, MappingStrategy::Logarithmic);
    }

    #[test]
    fn zst_sizes() {
        assert_eq!(std::mem::size_of::<LinearMapping>(), 0);
        assert_eq!(std::mem::size_of::<FibonacciSpiral>(), 0);
    }
}
