//! Collision checks between particles and targets
//!
//! Everything is a circle. A slow particle is a blocker and gets an
//! oversized radius, so parked particles form walls that fast ones break on.

use glam::DVec2;

use super::state::Target;
use crate::settings::SimSettings;

/// Whether two circles overlap (touching does not count)
#[inline]
pub fn circles_overlap(a: DVec2, ra: f64, b: DVec2, rb: f64) -> bool {
    let reach = ra + rb;
    a.distance_squared(b) < reach * reach
}

/// Collision radius against other particles
///
/// Half the width when moving at or above the stationary threshold,
/// `blocker_scale * width` below it.
#[inline]
pub fn effective_radius(width: f64, speed: f64, settings: &SimSettings) -> f64 {
    if speed >= settings.stationary_speed {
        width / 2.0
    } else {
        settings.blocker_scale * width
    }
}

/// Whether a particle breaches a target's hit circle
#[inline]
pub fn hits_target(pos: DVec2, width: f64, target: &Target) -> bool {
    circles_overlap(pos, width / 2.0, target.pos, target.radius)
}
