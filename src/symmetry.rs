//! Symmetry transform: fans one logical stamp position out into the full
//! set of mirrored/radial stamp locations.
//!
//! All geometry is computed in plain canvas space; rasterization backends
//! receive finished positions and mirror flags and must not re-derive any
//! of this math.

use serde::{Deserialize, Serialize};

use crate::geometry::CanvasPoint;

pub const RADIAL_MIN_POINTS: u8 = 3;
pub const RADIAL_MAX_POINTS: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymmetryMode {
    #[default]
    None,
    /// Mirror across the vertical axis through the origin.
    Horizontal,
    /// Mirror across the horizontal axis through the origin.
    Vertical,
    /// 2-fold point reflection through the origin.
    Point,
    /// Repeat the stamp at each configured offset point.
    SetPoints,
    /// N-fold radial repetition about the origin, N in 3..=12.
    Radial(u8),
}

/// The symmetry reference point, plus offset points for [`SymmetryMode::SetPoints`].
///
/// Offsets are stored relative to the primary origin so relocating the
/// origin moves the whole point set coherently.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymmetryOrigin {
    pub center: CanvasPoint,
    pub offsets: Vec<CanvasPoint>,
}

impl SymmetryOrigin {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            center: CanvasPoint::new(x, y),
            offsets: Vec::new(),
        }
    }
}

/// One resolved stamp placement. Mirroring is applied as a horizontal or
/// vertical flip of the brush mask, never as a rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampLocation {
    pub position: CanvasPoint,
    pub mirror_x: bool,
    pub mirror_y: bool,
    /// Extra rotation in degrees for radial repetitions.
    pub rotation_offset: f32,
}

impl StampLocation {
    fn plain(position: CanvasPoint) -> Self {
        Self {
            position,
            mirror_x: false,
            mirror_y: false,
            rotation_offset: 0.0,
        }
    }
}

/// Compute every stamp location for one logical stamp at `base`.
///
/// The base location always comes first; path ordering of the primary
/// stroke is preserved across the fan-out.
pub fn stamp_locations(
    base: CanvasPoint,
    mode: SymmetryMode,
    origin: &SymmetryOrigin,
) -> Vec<StampLocation> {
    let o = origin.center;
    match mode {
        SymmetryMode::None => vec![StampLocation::plain(base)],
        SymmetryMode::Horizontal => vec![
            StampLocation::plain(base),
            StampLocation {
                position: CanvasPoint::new(2.0 * o.x - base.x, base.y),
                mirror_x: true,
                mirror_y: false,
                rotation_offset: 0.0,
            },
        ],
        SymmetryMode::Vertical => vec![
            StampLocation::plain(base),
            StampLocation {
                position: CanvasPoint::new(base.x, 2.0 * o.y - base.y),
                mirror_x: false,
                mirror_y: true,
                rotation_offset: 0.0,
            },
        ],
        SymmetryMode::Point => vec![
            StampLocation::plain(base),
            StampLocation {
                position: CanvasPoint::new(2.0 * o.x - base.x, 2.0 * o.y - base.y),
                mirror_x: true,
                mirror_y: true,
                rotation_offset: 0.0,
            },
        ],
        SymmetryMode::SetPoints => {
            let mut out = Vec::with_capacity(1 + origin.offsets.len());
            out.push(StampLocation::plain(base));
            for off in &origin.offsets {
                out.push(StampLocation::plain(CanvasPoint::new(
                    base.x + off.x,
                    base.y + off.y,
                )));
            }
            out
        }
        SymmetryMode::Radial(n) => {
            let n = n.clamp(RADIAL_MIN_POINTS, RADIAL_MAX_POINTS) as usize;
            let distance = o.distance_to(&base);
            let angle = o.angle_to(&base);
            let step = std::f32::consts::TAU / n as f32;

            (0..n)
                .map(|k| {
                    let a = angle + step * k as f32;
                    StampLocation {
                        position: CanvasPoint::new(
                            o.x + distance * a.cos(),
                            o.y + distance * a.sin(),
                        ),
                        mirror_x: false,
                        mirror_y: false,
                        rotation_offset: (step * k as f32).to_degrees(),
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    #[test]
    fn test_none_is_single_unmirrored() {
        let locs = stamp_locations(
            CanvasPoint::new(10.0, 20.0),
            SymmetryMode::None,
            &SymmetryOrigin::at(0.0, 0.0),
        );
        assert_eq!(locs.len(), 1);
        assert!(!locs[0].mirror_x && !locs[0].mirror_y);
    }

    #[test]
    fn test_horizontal_mirror_positions() {
        let origin = SymmetryOrigin::at(100.0, 100.0);
        let locs = stamp_locations(
            CanvasPoint::new(130.0, 100.0),
            SymmetryMode::Horizontal,
            &origin,
        );
        assert_eq!(locs.len(), 2);
        // Stamp at origin.x + d mirrors to origin.x - d with the same y.
        assert!((locs[1].position.x - 70.0).abs() < EPS);
        assert!((locs[1].position.y - 100.0).abs() < EPS);
        assert!(locs[1].mirror_x && !locs[1].mirror_y);
        assert!(!locs[0].mirror_x);
    }

    #[test]
    fn test_vertical_mirror_positions() {
        let origin = SymmetryOrigin::at(50.0, 50.0);
        let locs = stamp_locations(
            CanvasPoint::new(50.0, 80.0),
            SymmetryMode::Vertical,
            &origin,
        );
        assert_eq!(locs.len(), 2);
        assert!((locs[1].position.y - 20.0).abs() < EPS);
        assert!((locs[1].position.x - 50.0).abs() < EPS);
        assert!(locs[1].mirror_y && !locs[1].mirror_x);
    }

    #[test]
    fn test_point_reflection() {
        let origin = SymmetryOrigin::at(10.0, 10.0);
        let locs = stamp_locations(CanvasPoint::new(15.0, 12.0), SymmetryMode::Point, &origin);
        assert_eq!(locs.len(), 2);
        assert!((locs[1].position.x - 5.0).abs() < EPS);
        assert!((locs[1].position.y - 8.0).abs() < EPS);
        assert!(locs[1].mirror_x && locs[1].mirror_y);
    }

    #[test]
    fn test_set_points_offsets() {
        let mut origin = SymmetryOrigin::at(0.0, 0.0);
        origin.offsets = vec![CanvasPoint::new(10.0, 0.0), CanvasPoint::new(0.0, -5.0)];
        let locs = stamp_locations(
            CanvasPoint::new(3.0, 4.0),
            SymmetryMode::SetPoints,
            &origin,
        );
        assert_eq!(locs.len(), 3);
        assert!((locs[1].position.x - 13.0).abs() < EPS);
        assert!((locs[2].position.y - (-1.0)).abs() < EPS);
        assert!(locs.iter().all(|l| !l.mirror_x && !l.mirror_y));
    }

    #[test]
    fn test_radial_count_spacing_and_distance() {
        let origin = SymmetryOrigin::at(0.0, 0.0);
        for n in RADIAL_MIN_POINTS..=RADIAL_MAX_POINTS {
            let locs = stamp_locations(
                CanvasPoint::new(40.0, 30.0),
                SymmetryMode::Radial(n),
                &origin,
            );
            assert_eq!(locs.len(), n as usize);

            let step = std::f32::consts::TAU / n as f32;
            for (k, loc) in locs.iter().enumerate() {
                // Equal distance from the origin.
                let d = origin.center.distance_to(&loc.position);
                assert!((d - 50.0).abs() < EPS, "n={n} k={k} d={d}");
                // Equally spaced in angle.
                let a = origin.center.angle_to(&loc.position);
                let expected = (origin.center.angle_to(&CanvasPoint::new(40.0, 30.0))
                    + step * k as f32)
                    .rem_euclid(std::f32::consts::TAU);
                let diff = (a.rem_euclid(std::f32::consts::TAU) - expected).abs();
                assert!(diff < EPS || (diff - std::f32::consts::TAU).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_radial_clamps_out_of_range_n() {
        let origin = SymmetryOrigin::at(0.0, 0.0);
        let locs = stamp_locations(
            CanvasPoint::new(10.0, 0.0),
            SymmetryMode::Radial(99),
            &origin,
        );
        assert_eq!(locs.len(), RADIAL_MAX_POINTS as usize);
    }
}
