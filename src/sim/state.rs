//! Simulation state types
//!
//! Snapshots, particles and targets. A particle's motion is a pure function
//! of its snapshot, index, seed and frame number, which is what lets a peer
//! replay a cast from its payload alone.

use std::sync::Arc;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::aim_angle;
use crate::consts::TARGET_RADIUS;
use crate::formula::{Env, EvalError, Var};
use crate::settings::SimSettings;
use crate::spell::CompiledSpell;

/// Identifies a caster, a target, and the owner of a particle
pub type OwnerId = u32;

/// Caster coordinates fixed at cast time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CasterSnapshot {
    pub id: OwnerId,
    pub pos: DVec2,
    pub cursor: DVec2,
}

/// Target coordinates fixed at cast time
///
/// With an `id`, particles follow that target's live position each frame
/// for as long as it lives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub id: Option<OwnerId>,
    pub pos: DVec2,
}

/// The immutable formula variables of one cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub caster: CasterSnapshot,
    pub target: TargetSnapshot,
    /// Particle count
    pub count: u32,
    pub aim: f64,
    pub enemy_dist: f64,
    pub arena: DVec2,
}

impl Snapshot {
    pub fn new(
        caster: CasterSnapshot,
        target: TargetSnapshot,
        count: u32,
        settings: &SimSettings,
    ) -> Self {
        Self {
            caster,
            target,
            count,
            aim: aim_angle(caster.pos, caster.cursor),
            enemy_dist: caster.pos.distance(target.pos),
            arena: DVec2::new(settings.arena_width, settings.arena_height),
        }
    }

    /// Environment for particle `index` at time `t`
    pub fn env(&self, index: u32, t: f64, dt: f64, enemy: DVec2, seed: u64) -> Env {
        let mut env = Env::new(seed)
            .with(Var::T, t)
            .with(Var::I, index as f64)
            .with(Var::N, self.count as f64)
            .with(Var::PlayerX, self.caster.pos.x)
            .with(Var::PlayerY, self.caster.pos.y)
            .with(Var::CursorX, self.caster.cursor.x)
            .with(Var::CursorY, self.caster.cursor.y)
            .with(Var::Aim, self.aim)
            .with(Var::EnemyX, enemy.x)
            .with(Var::EnemyY, enemy.y)
            .with(Var::EnemyDist, self.enemy_dist)
            .with(Var::ArenaW, self.arena.x)
            .with(Var::ArenaH, self.arena.y)
            .with(Var::Dt, dt);
        env.reseed(seed);
        env
    }
}

/// Seed derivation for casts, particles and frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn with_stream(self, stream: u64) -> Self {
        Self { stream, ..self }
    }

    /// Seed of this stream, well mixed so neighbouring streams are unrelated
    pub fn derive(&self) -> u64 {
        splitmix64(self.seed ^ splitmix64(self.stream))
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Trail point for particle rendering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    pub pos: DVec2,
    pub speed: f64,
}

/// A live spell projectile
#[derive(Debug, Clone)]
pub struct Particle {
    pub owner: OwnerId,
    /// Index within its cast
    pub index: u32,
    pub pos: DVec2,
    pub prev_pos: DVec2,
    /// Seconds since emission
    pub lifetime: f64,
    /// Frames simulated since emission
    pub frame: u64,
    pub width: f64,
    /// Instantaneous speed derived from the last step
    pub speed: f64,
    pub alive: bool,
    pub seed: u64,
    pub snapshot: Snapshot,
    /// Last known position of the snapshot's target
    pub enemy: DVec2,
    pub spell: Arc<CompiledSpell>,
    /// Trail history for rendering (newest first)
    pub trail: Vec<TrailPoint>,
}

impl Particle {
    /// Environment for the current frame
    pub fn env(&self, dt: f64) -> Env {
        let seed = RngState::new(self.seed).with_stream(self.frame).derive();
        self.snapshot.env(self.index, self.lifetime, dt, self.enemy, seed)
    }

    /// Advance one frame and re-evaluate position and width
    ///
    /// On a failing X or Y formula the position is left untouched and the
    /// error is returned; the caller decides the particle's fate.
    pub fn step(&mut self, dt: f64, settings: &SimSettings) -> Result<(), EvalError> {
        self.lifetime += dt;
        self.frame += 1;

        let env = self.env(dt);
        let x = self.spell.x.eval(&env)?;
        let y = self.spell.y.eval(&env)?;

        self.prev_pos = self.pos;
        self.pos = DVec2::new(x, y);
        self.width = self
            .spell
            .width
            .eval(&env)
            .map(|w| settings.clamp_width(w))
            .unwrap_or(settings.default_width);
        self.speed = self.pos.distance(self.prev_pos) / dt.max(settings.speed_epsilon);
        self.record_trail(settings.trail_length);
        Ok(())
    }

    /// Record current position to trail
    pub fn record_trail(&mut self, limit: usize) {
        self.trail.insert(
            0,
            TrailPoint {
                pos: self.pos,
                speed: self.speed,
            },
        );
        self.trail.truncate(limit);
    }
}

/// An opposing entity particles can hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: OwnerId,
    pub pos: DVec2,
    /// Hit radius
    pub radius: f64,
    pub hp: u32,
    /// Temporarily immune to particles
    #[serde(default)]
    pub invulnerable: bool,
    /// Mid-dash, also immune
    #[serde(default)]
    pub dashing: bool,
}

impl Target {
    pub fn new(id: OwnerId, pos: DVec2, hp: u32) -> Self {
        Self {
            id,
            pos,
            radius: TARGET_RADIUS,
            hp,
            invulnerable: false,
            dashing: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn is_immune(&self) -> bool {
        self.invulnerable || self.dashing
    }

    /// Apply one unit of damage
    pub fn damage(&mut self) {
        self.hp = self.hp.saturating_sub(1);
    }
}
