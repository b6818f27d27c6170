//! Cast scheduling
//!
//! A cast holds one pending entry per particle. Emit delays are evaluated
//! once when the cast begins and measured from cast start, so the order in
//! which a caller advances casts and ticks particles does not change when a
//! particle appears.

use std::sync::Arc;

use glam::DVec2;

use super::state::{CasterSnapshot, OwnerId, Particle, RngState, Snapshot, TargetSnapshot};
use crate::settings::SimSettings;
use crate::spell::{CastError, CompiledSpell};

/// A particle waiting for its emit delay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingParticle {
    pub index: u32,
    /// Seconds after cast start
    pub emit_delay: f64,
    pub seed: u64,
    /// Only ever goes from false to true
    pub emitted: bool,
}

/// One invocation of a spell
#[derive(Debug, Clone)]
pub struct Cast {
    pub spell: Arc<CompiledSpell>,
    pub snapshot: Snapshot,
    pub seed: u64,
    pub pending: Vec<PendingParticle>,
    /// Seconds since the cast began
    pub elapsed: f64,
    pub active: bool,
}

/// Refuse a cost that could never fit under the live particle cap
pub fn check_cost(cost: u32, settings: &SimSettings) -> Result<(), CastError> {
    if cost as usize > settings.max_live_particles {
        return Err(CastError::TooManyParticles {
            cost,
            limit: settings.max_live_particles,
        });
    }
    Ok(())
}

/// Start a cast, fixing every particle's emit delay
///
/// A failing emit-delay formula falls back to `i * emit_stagger` for that
/// particle only. Costs above `max_live_particles` are rejected before any
/// pending entry is built.
pub fn begin_cast(
    spell: Arc<CompiledSpell>,
    caster: CasterSnapshot,
    target: TargetSnapshot,
    seed: u64,
    settings: &SimSettings,
) -> Result<Cast, CastError> {
    check_cost(spell.cost, settings)?;
    let snapshot = Snapshot::new(caster, target, spell.cost, settings);
    let rng = RngState::new(seed);

    let pending: Vec<PendingParticle> = (0..spell.cost)
        .map(|index| {
            let seed = rng.with_stream(u64::from(index)).derive();
            let env = snapshot.env(index, 0.0, 0.0, target.pos, frame_zero(seed));
            let emit_delay = spell
                .emit_delay
                .eval(&env)
                .unwrap_or(index as f64 * settings.emit_stagger);
            PendingParticle {
                index,
                emit_delay,
                seed,
                emitted: false,
            }
        })
        .collect();

    log::debug!(
        "Cast '{}' by {} with {} particles",
        spell.name,
        caster.id,
        pending.len()
    );

    Ok(Cast {
        active: !pending.is_empty(),
        spell,
        snapshot,
        seed,
        pending,
        elapsed: 0.0,
    })
}

/// Seed of a particle's emission frame
fn frame_zero(particle_seed: u64) -> u64 {
    RngState::new(particle_seed).with_stream(0).derive()
}

impl Cast {
    pub fn owner(&self) -> OwnerId {
        self.snapshot.caster.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn emitted_count(&self) -> usize {
        self.pending.iter().filter(|p| p.emitted).count()
    }

    /// Advance cast time and emit every particle whose delay has elapsed
    pub fn advance(&mut self, dt: f64, settings: &SimSettings) -> Vec<Particle> {
        if !self.active {
            return Vec::new();
        }
        self.elapsed += dt;

        let mut emitted = Vec::new();
        for pending in self.pending.iter_mut() {
            if pending.emitted || self.elapsed < pending.emit_delay {
                continue;
            }
            pending.emitted = true;
            emitted.push(spawn(&self.spell, &self.snapshot, pending, settings));
        }

        if self.pending.iter().all(|p| p.emitted) {
            self.active = false;
            log::debug!("Cast '{}' by {} fully emitted", self.spell.name, self.owner());
        }
        emitted
    }
}

/// Build a particle at its `t = 0` position, falling back to the caster
fn spawn(
    spell: &Arc<CompiledSpell>,
    snapshot: &Snapshot,
    pending: &PendingParticle,
    settings: &SimSettings,
) -> Particle {
    let env = snapshot.env(
        pending.index,
        0.0,
        0.0,
        snapshot.target.pos,
        frame_zero(pending.seed),
    );
    let pos = match (spell.x.eval(&env), spell.y.eval(&env)) {
        (Ok(x), Ok(y)) => DVec2::new(x, y),
        _ => snapshot.caster.pos,
    };
    let width = spell
        .width
        .eval(&env)
        .map(|w| settings.clamp_width(w))
        .unwrap_or(settings.default_width);

    let mut particle = Particle {
        owner: snapshot.caster.id,
        index: pending.index,
        pos,
        prev_pos: pos,
        lifetime: 0.0,
        frame: 0,
        width,
        speed: 0.0,
        alive: true,
        seed: pending.seed,
        snapshot: *snapshot,
        enemy: snapshot.target.pos,
        spell: Arc::clone(spell),
        trail: Vec::with_capacity(settings.trail_length),
    };
    particle.record_trail(settings.trail_length);
    particle
}
