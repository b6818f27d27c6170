//! Arcon - formula-driven spell projectiles
//!
//! Core modules:
//! - `formula`: Spell formula language (lexer, parser, compiler, validator)
//! - `sim`: Deterministic cast scheduling and particle simulation
//! - `spell`: Spell definitions, cooldowns, mana and the replication payload
//! - `settings`: Data-driven simulation tuning

pub mod formula;
pub mod settings;
pub mod sim;
pub mod spell;

pub use formula::{Evaluator, Registry, compile_source, validate};
pub use settings::SimSettings;
pub use sim::{Cast, Particle, ResourceReturns, Simulator, Target};
pub use spell::{CastPayload, CompiledSpell, ManaWallet, Spell};

use glam::DVec2;

/// Game configuration constants
pub mod consts {
    /// Frame length the simulation is tuned for (60 Hz)
    pub const SIM_DT: f64 = 1.0 / 60.0;

    /// Particles die once their lifetime reaches this many seconds
    pub const MAX_LIFETIME: f64 = 5.0;
    /// Slower particles still die on a target but deal no damage
    pub const MIN_DAMAGE_SPEED: f64 = 60.0;
    /// Below this speed a particle counts as a stationary blocker
    pub const STATIONARY_SPEED: f64 = 30.0;
    /// Blocker collision radius, as a multiple of width
    pub const BLOCKER_SCALE: f64 = 2.5;
    /// Guards speed derivation against zero-length frames
    pub const SPEED_EPSILON: f64 = 1e-6;

    /// Arena dimensions
    pub const ARENA_WIDTH: f64 = 1280.0;
    pub const ARENA_HEIGHT: f64 = 720.0;
    /// How far outside the arena a particle may stray before it dies
    pub const BOUNDS_MARGIN: f64 = 64.0;

    /// Particle width defaults
    pub const DEFAULT_WIDTH: f64 = 6.0;
    pub const MIN_WIDTH: f64 = 1.0;
    pub const MAX_WIDTH: f64 = 48.0;

    /// Emit-delay fallback is `i * EMIT_STAGGER` seconds
    pub const EMIT_STAGGER: f64 = 0.02;

    /// Trail points kept per particle for rendering
    pub const TRAIL_LENGTH: usize = 12;
    /// Live particle cap across all owners
    pub const MAX_LIVE_PARTICLES: usize = 2048;

    /// Default hit radius for targets
    pub const TARGET_RADIUS: f64 = 16.0;
}

/// Angle of the direction from `from` to `to`, radians in (-π, π]
#[inline]
pub fn aim_angle(from: DVec2, to: DVec2) -> f64 {
    let d = to - from;
    d.y.atan2(d.x)
}
