//! Fixed timestep simulation tick
//!
//! The [`Simulator`] owns the live particle arena and the active casts. One
//! call to [`Simulator::step`] per frame emits due particles, moves every
//! live particle, applies the termination rules in order and returns what
//! each owner gets back.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use glam::DVec2;

use super::arena::{ParticleArena, ParticleHandle};
use super::cast::{Cast, begin_cast, check_cost};
use super::collision::{circles_overlap, effective_radius, hits_target};
use super::resources::{ResourceReturn, ResourceReturns};
use super::state::{CasterSnapshot, OwnerId, Particle, Target, TargetSnapshot, TrailPoint};
use crate::formula::{EvalError, Registry};
use crate::settings::SimSettings;
use crate::spell::{CastError, CastPayload, CompiledSpell, ManaWallet, PayloadError, Spell};

/// Why a particle died
#[derive(Debug, Clone, Copy, PartialEq)]
enum Death {
    Formula(EvalError),
    Lifetime,
    OutOfBounds,
    Target { id: OwnerId, damaged: bool },
    Annihilated,
}

fn kill(particle: &mut Particle, death: Death) {
    particle.alive = false;
    log::trace!(
        "particle {} of owner {} died after {:.3}s: {:?}",
        particle.index,
        particle.owner,
        particle.lifetime,
        death
    );
}

/// Read-only view of a live particle for rendering
#[derive(Debug, Clone, Copy)]
pub struct ParticleView<'a> {
    pub handle: ParticleHandle,
    pub pos: DVec2,
    pub width: f64,
    pub owner: OwnerId,
    /// Newest first
    pub trail: &'a [TrailPoint],
}

/// Cast scheduler plus particle simulator
#[derive(Debug)]
pub struct Simulator {
    settings: SimSettings,
    particles: ParticleArena,
    casts: Vec<Cast>,
    /// Emissions refused at the particle cap, refunded on the next tick
    refused: ResourceReturns,
    subscribers: Vec<Sender<ResourceReturn>>,
    frame: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimSettings::default())
    }
}

impl Simulator {
    pub fn new(settings: SimSettings) -> Self {
        Self {
            settings,
            particles: ParticleArena::new(),
            casts: Vec::new(),
            refused: ResourceReturns::new(),
            subscribers: Vec::new(),
            frame: 0,
        }
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    /// Frames ticked so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn live_count(&self) -> usize {
        self.particles.len()
    }

    pub fn active_casts(&self) -> usize {
        self.casts.len()
    }

    pub fn particle(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.particles.get(handle)
    }

    /// Live particles in slot order
    pub fn view(&self) -> impl Iterator<Item = ParticleView<'_>> {
        self.particles.iter().map(|(handle, p)| ParticleView {
            handle,
            pos: p.pos,
            width: p.width,
            owner: p.owner,
            trail: &p.trail,
        })
    }

    /// Receive one event per owner per tick with a non-zero return
    pub fn subscribe(&mut self) -> Receiver<ResourceReturn> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Start a cast without any cooldown or mana checks
    ///
    /// Fails only when the cost exceeds the live particle cap.
    pub fn begin_cast(
        &mut self,
        spell: Arc<CompiledSpell>,
        caster: CasterSnapshot,
        target: TargetSnapshot,
        seed: u64,
    ) -> Result<(), CastError> {
        let cast = begin_cast(spell, caster, target, seed, &self.settings)?;
        if cast.is_active() {
            self.casts.push(cast);
        }
        Ok(())
    }

    /// Cast a spell from a player's loadout
    ///
    /// Compiles `spell` itself, so the particles, the mana spent and the
    /// returned payload all come from the same definition. Checks the
    /// cooldown, the particle cap and the wallet before spending, then
    /// restarts the cooldown. The returned payload lets peers replay the cast.
    pub fn cast(
        &mut self,
        spell: &mut Spell,
        registry: &Registry,
        wallet: &mut ManaWallet,
        caster: CasterSnapshot,
        target: TargetSnapshot,
        seed: u64,
    ) -> Result<CastPayload, CastError> {
        if !spell.is_ready() {
            return Err(CastError::OnCooldown {
                remaining: spell.current_cooldown,
            });
        }
        let compiled = spell.compile(registry)?;
        check_cost(compiled.cost, &self.settings)?;
        wallet.try_spend(compiled.cost)?;
        spell.trigger_cooldown();
        self.begin_cast(Arc::new(compiled), caster, target, seed)?;
        Ok(CastPayload {
            spell: spell.clone(),
            caster,
            target,
            seed,
        })
    }

    /// Replay a cast received from a peer
    ///
    /// The payload's cost is checked against the live cap before anything
    /// is allocated for it.
    pub fn replicate(
        &mut self,
        payload: &CastPayload,
        registry: &Registry,
    ) -> Result<(), PayloadError> {
        check_cost(payload.spell.cost, &self.settings)?;
        let compiled = payload.compile(registry)?;
        log::info!(
            "Replicating '{}' from caster {} (seed {})",
            payload.spell.name,
            payload.caster.id,
            payload.seed
        );
        self.begin_cast(Arc::new(compiled), payload.caster, payload.target, payload.seed)?;
        Ok(())
    }

    /// Add a particle, refusing it at the live cap
    pub fn spawn(&mut self, particle: Particle) -> Option<ParticleHandle> {
        if self.particles.len() >= self.settings.max_live_particles {
            log::debug!(
                "Particle cap {} reached, refunding owner {}",
                self.settings.max_live_particles,
                particle.owner
            );
            self.refused.add(particle.owner, 1);
            return None;
        }
        Some(self.particles.insert(particle))
    }

    /// Advance every cast and spawn what it emits
    pub fn advance_casts(&mut self, dt: f64) {
        let mut emitted = Vec::new();
        for cast in self.casts.iter_mut() {
            emitted.extend(cast.advance(dt, &self.settings));
        }
        self.casts.retain(Cast::is_active);
        for particle in emitted {
            self.spawn(particle);
        }
    }

    /// Advance casts then particles by one frame
    pub fn step(&mut self, dt: f64, targets: &mut [Target]) -> ResourceReturns {
        self.advance_casts(dt);
        self.tick(dt, targets)
    }

    /// Move every live particle and apply the termination rules
    ///
    /// Rules run in a fixed order: lifetime, world bounds, targets, then
    /// pairwise annihilation. Dead particles are counted per owner and
    /// removed in the same pass; subscribers hear about each owner once.
    pub fn tick(&mut self, dt: f64, targets: &mut [Target]) -> ResourceReturns {
        let settings = &self.settings;
        let handles = self.particles.handles();

        for &handle in &handles {
            let Some(p) = self.particles.get_mut(handle) else {
                continue;
            };

            if let Some(id) = p.snapshot.target.id
                && let Some(target) = targets.iter().find(|t| t.id == id && t.is_alive())
            {
                p.enemy = target.pos;
            }

            if let Err(e) = p.step(dt, settings) {
                kill(p, Death::Formula(e));
                continue;
            }
            if p.lifetime >= settings.max_lifetime {
                kill(p, Death::Lifetime);
                continue;
            }
            if !settings.in_bounds(p.pos) {
                kill(p, Death::OutOfBounds);
                continue;
            }
            for target in targets.iter_mut() {
                if target.id == p.owner || !target.is_alive() || target.is_immune() {
                    continue;
                }
                if hits_target(p.pos, p.width, target) {
                    let damaged = p.speed >= settings.min_damage_speed;
                    if damaged {
                        target.damage();
                    }
                    kill(
                        p,
                        Death::Target {
                            id: target.id,
                            damaged,
                        },
                    );
                    break;
                }
            }
        }

        self.annihilate(&handles);

        let mut returns = std::mem::take(&mut self.refused);
        for handle in handles {
            let dead = self.particles.get(handle).is_some_and(|p| !p.alive);
            if dead && let Some(p) = self.particles.remove(handle) {
                returns.add(p.owner, 1);
            }
        }

        self.notify(&returns);
        self.frame += 1;
        returns
    }

    /// Destroy overlapping pairs of particles with different owners
    ///
    /// Each particle is consumed by at most one pair.
    fn annihilate(&mut self, handles: &[ParticleHandle]) {
        let bodies: Vec<(ParticleHandle, OwnerId, DVec2, f64)> = handles
            .iter()
            .filter_map(|&h| {
                let p = self.particles.get(h).filter(|p| p.alive)?;
                let radius = effective_radius(p.width, p.speed, &self.settings);
                Some((h, p.owner, p.pos, radius))
            })
            .collect();

        let mut dead = vec![false; bodies.len()];
        for a in 0..bodies.len() {
            if dead[a] {
                continue;
            }
            let (_, owner_a, pos_a, r_a) = bodies[a];
            for b in (a + 1)..bodies.len() {
                let (_, owner_b, pos_b, r_b) = bodies[b];
                if dead[b] || owner_a == owner_b {
                    continue;
                }
                if circles_overlap(pos_a, r_a, pos_b, r_b) {
                    dead[a] = true;
                    dead[b] = true;
                    break;
                }
            }
        }

        for (&(handle, ..), _) in bodies.iter().zip(&dead).filter(|(_, d)| **d) {
            if let Some(p) = self.particles.get_mut(handle) {
                kill(p, Death::Annihilated);
            }
        }
    }

    fn notify(&mut self, returns: &ResourceReturns) {
        if returns.is_empty() {
            return;
        }
        let frame = self.frame;
        self.subscribers.retain(|tx| {
            returns.iter().all(|(owner, amount)| {
                tx.send(ResourceReturn {
                    frame,
                    owner,
                    amount,
                })
                .is_ok()
            })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    const P1: OwnerId = 1;
    const P2: OwnerId = 2;

    fn compiled(cost: u32, x: &str, y: &str) -> Arc<CompiledSpell> {
        Arc::new(
            Spell::new("test", cost, x, y)
                .with_emit_delay("0")
                .compile(&Registry::standard())
                .expect("compiles"),
        )
    }

    fn caster(id: OwnerId, x: f64, y: f64) -> CasterSnapshot {
        CasterSnapshot {
            id,
            pos: DVec2::new(x, y),
            cursor: DVec2::new(x + 100.0, y),
        }
    }

    fn nowhere() -> TargetSnapshot {
        TargetSnapshot {
            id: None,
            pos: DVec2::new(640.0, 360.0),
        }
    }

    #[test]
    fn test_lifetime_bound() {
        let mut sim = Simulator::default();
        sim.begin_cast(
            compiled(1, "player.x", "player.y"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");

        for _ in 0..4 {
            let returns = sim.step(1.0, &mut []);
            assert!(returns.is_empty());
        }
        assert_eq!(sim.live_count(), 1);

        let returns = sim.step(1.0, &mut []);
        assert_eq!(sim.live_count(), 0);
        assert_eq!(returns.get(P1), 1);
    }

    #[test]
    fn test_formula_failure_kills_only_that_particle() {
        let mut sim = Simulator::default();
        sim.begin_cast(
            compiled(2, "100 + sqrt(0.5 - i)", "100"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        let returns = sim.step(SIM_DT, &mut []);
        assert_eq!(returns.get(P1), 1);
        assert_eq!(sim.live_count(), 1);
        let survivor = sim.view().next().expect("one left");
        assert!((survivor.pos.x - (100.0 + 0.5f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut sim = Simulator::default();
        sim.begin_cast(
            compiled(1, "player.x - t * 100000", "player.y"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        let returns = sim.step(SIM_DT, &mut []);
        assert_eq!(returns.get(P1), 1);
        assert_eq!(sim.live_count(), 0);
    }

    #[test]
    fn test_fast_hit_damages_target() {
        let mut sim = Simulator::default();
        let mut targets = [Target::new(P2, DVec2::new(300.0, 100.0), 3)];
        sim.begin_cast(
            compiled(1, "250 + t * 3000", "100"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        let returns = sim.step(SIM_DT, &mut targets);
        assert_eq!(returns.get(P1), 1);
        assert_eq!(targets[0].hp, 2);
    }

    #[test]
    fn test_slow_hit_deals_no_damage() {
        let mut sim = Simulator::default();
        let mut targets = [Target::new(P2, DVec2::new(300.0, 100.0), 3)];
        sim.begin_cast(
            compiled(1, "300", "100"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        let returns = sim.step(SIM_DT, &mut targets);
        assert_eq!(returns.get(P1), 1);
        assert_eq!(targets[0].hp, 3);
    }

    #[test]
    fn test_immune_and_own_targets_are_skipped() {
        let mut sim = Simulator::default();
        let mut dashing = Target::new(P2, DVec2::new(300.0, 100.0), 3);
        dashing.dashing = true;
        let own = Target::new(P1, DVec2::new(300.0, 100.0), 3);
        let mut targets = [dashing, own];
        sim.begin_cast(
            compiled(1, "250 + t * 3000", "100"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        let returns = sim.step(SIM_DT, &mut targets);
        assert!(returns.is_empty());
        assert_eq!(sim.live_count(), 1);
        assert_eq!(targets[0].hp, 3);
        assert_eq!(targets[1].hp, 3);
    }

    #[test]
    fn test_dead_target_is_not_hit() {
        let mut sim = Simulator::default();
        let mut targets = [Target::new(P2, DVec2::new(300.0, 100.0), 0)];
        sim.begin_cast(
            compiled(1, "300", "100"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        assert!(sim.step(SIM_DT, &mut targets).is_empty());
    }

    #[test]
    fn test_slow_particles_annihilate_as_blockers() {
        let mut sim = Simulator::default();
        // Widths of 6 put the raw radii 4 units apart
        sim.begin_cast(
            compiled(1, "player.x", "player.y"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        sim.begin_cast(
            compiled(1, "player.x", "player.y"),
            caster(P2, 100.0, 110.0),
            nowhere(),
            2,
        )
        .expect("castable");
        let returns = sim.step(SIM_DT, &mut []);
        assert_eq!(returns.get(P1), 1);
        assert_eq!(returns.get(P2), 1);
        assert_eq!(sim.live_count(), 0);
    }

    #[test]
    fn test_fast_particles_pass_at_same_separation() {
        let mut sim = Simulator::default();
        sim.begin_cast(
            compiled(1, "player.x + t * 600", "player.y"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        sim.begin_cast(
            compiled(1, "player.x + t * 600", "player.y"),
            caster(P2, 100.0, 110.0),
            nowhere(),
            2,
        )
        .expect("castable");
        let returns = sim.step(SIM_DT, &mut []);
        assert!(returns.is_empty());
        assert_eq!(sim.live_count(), 2);
    }

    #[test]
    fn test_same_owner_never_annihilates() {
        let mut sim = Simulator::default();
        sim.begin_cast(
            compiled(3, "player.x", "player.y"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        assert!(sim.step(SIM_DT, &mut []).is_empty());
        assert_eq!(sim.live_count(), 3);
    }

    #[test]
    fn test_annihilation_is_one_for_one() {
        let mut sim = Simulator::default();
        sim.begin_cast(
            compiled(1, "player.x", "player.y"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        sim.begin_cast(
            compiled(2, "player.x", "player.y"),
            caster(P2, 100.0, 105.0),
            nowhere(),
            2,
        )
        .expect("castable");
        let returns = sim.step(SIM_DT, &mut []);
        assert_eq!(returns.get(P1), 1);
        assert_eq!(returns.get(P2), 1);
        let left: Vec<OwnerId> = sim.view().map(|v| v.owner).collect();
        assert_eq!(left, vec![P2]);
    }

    #[test]
    fn test_returns_aggregated_and_notified_once() {
        let mut sim = Simulator::default();
        let rx = sim.subscribe();
        sim.begin_cast(
            compiled(5, "player.x - t * 100000", "player.y"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        let returns = sim.step(SIM_DT, &mut []);
        assert_eq!(returns.get(P1), 5);
        assert_eq!(returns.len(), 1);

        let event = rx.try_recv().expect("notified");
        assert_eq!(event.owner, P1);
        assert_eq!(event.amount, 5);
        assert_eq!(event.frame, 0);
        assert!(rx.try_recv().is_err());

        let mut wallet = ManaWallet::new(P1, 10);
        wallet.mana = 0;
        returns.deliver(&mut wallet);
        assert_eq!(wallet.mana, 5);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut sim = Simulator::default();
        drop(sim.subscribe());
        let rx = sim.subscribe();
        sim.begin_cast(
            compiled(1, "-10000", "0"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        sim.step(SIM_DT, &mut []);
        assert_eq!(sim.subscribers.len(), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_particle_cap_refunds_next_tick() {
        let settings = SimSettings {
            max_live_particles: 2,
            ..Default::default()
        };
        let mut sim = Simulator::new(settings);
        sim.begin_cast(
            compiled(5, "player.x + i * 50", "player.y"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        let returns = sim.step(SIM_DT, &mut []);
        assert_eq!(sim.live_count(), 2);
        assert_eq!(returns.get(P1), 3);
        assert!(sim.step(SIM_DT, &mut []).is_empty());
    }

    #[test]
    fn test_cast_checks_cooldown_and_mana() {
        let registry = Registry::standard();
        let mut sim = Simulator::default();
        let mut spell = Spell::new("bolt", 4, "player.x + t * 100", "player.y").with_cooldown(0.5);
        let mut wallet = ManaWallet::new(P1, 6);
        let at = caster(P1, 100.0, 100.0);

        let payload = sim
            .cast(&mut spell, &registry, &mut wallet, at, nowhere(), 3)
            .expect("castable");
        assert_eq!(payload.seed, 3);
        assert_eq!(wallet.mana, 2);
        assert_eq!(sim.active_casts(), 1);

        let err = sim
            .cast(&mut spell, &registry, &mut wallet, at, nowhere(), 4)
            .unwrap_err();
        assert!(matches!(err, CastError::OnCooldown { .. }));

        spell.tick_cooldown(0.5);
        let err = sim
            .cast(&mut spell, &registry, &mut wallet, at, nowhere(), 5)
            .unwrap_err();
        assert!(matches!(err, CastError::InsufficientMana { needed: 4, available: 2 }));
        assert!(spell.is_ready());
    }

    #[test]
    fn test_cast_and_payload_come_from_one_spell() {
        let registry = Registry::standard();
        let mut spell = Spell::new("push", 3, "player.x + t * 200", "player.y + i * 10")
            .with_emit_delay("0");
        let mut wallet = ManaWallet::new(P1, 10);
        let mut local = Simulator::default();

        let payload = local
            .cast(&mut spell, &registry, &mut wallet, caster(P1, 100.0, 100.0), nowhere(), 9)
            .expect("castable");
        assert_eq!(wallet.mana, 10 - payload.spell.cost);

        let mut peer = Simulator::default();
        peer.replicate(&payload, &registry).expect("replicates");
        for _ in 0..10 {
            local.step(SIM_DT, &mut []);
            peer.step(SIM_DT, &mut []);
        }
        let positions = |sim: &Simulator| sim.view().map(|v| v.pos).collect::<Vec<_>>();
        assert_eq!(positions(&local).len(), 3);
        assert_eq!(positions(&local), positions(&peer));
    }

    #[test]
    fn test_broken_spell_spends_nothing() {
        let registry = Registry::standard();
        let mut spell = Spell::new("broken", 2, "player.x + nope(t)", "player.y");
        let mut wallet = ManaWallet::new(P1, 5);
        let mut sim = Simulator::default();

        let err = sim
            .cast(&mut spell, &registry, &mut wallet, caster(P1, 100.0, 100.0), nowhere(), 1)
            .unwrap_err();
        assert!(matches!(err, CastError::Compile { .. }));
        assert_eq!(wallet.mana, 5);
        assert!(spell.is_ready());
        assert_eq!(sim.active_casts(), 0);
    }

    #[test]
    fn test_cost_over_cap_is_refused() {
        let registry = Registry::standard();
        let settings = SimSettings {
            max_live_particles: 4,
            ..Default::default()
        };
        let mut sim = Simulator::new(settings);

        let mut spell = Spell::new("swarm", 5, "player.x", "player.y");
        let mut wallet = ManaWallet::new(P1, 10);
        let err = sim
            .cast(&mut spell, &registry, &mut wallet, caster(P1, 100.0, 100.0), nowhere(), 1)
            .unwrap_err();
        assert!(matches!(err, CastError::TooManyParticles { cost: 5, limit: 4 }));
        assert_eq!(wallet.mana, 10);

        let err = sim
            .begin_cast(compiled(5, "player.x", "player.y"), caster(P1, 100.0, 100.0), nowhere(), 1)
            .unwrap_err();
        assert!(matches!(err, CastError::TooManyParticles { .. }));
        assert_eq!(sim.active_casts(), 0);
    }

    #[test]
    fn test_replicate_rejects_huge_cost() {
        let wire = r#"{
            "spell": { "name": "flood", "cost": 4294967295, "x": "0", "y": "0" },
            "caster": { "id": 2, "pos": [0.0, 0.0], "cursor": [1.0, 0.0] },
            "target": { "id": null, "pos": [0.0, 0.0] },
            "seed": 1
        }"#;
        let payload = CastPayload::from_json(wire).expect("well formed");
        assert_eq!(payload.spell.cost, u32::MAX);

        let mut sim = Simulator::default();
        let err = sim.replicate(&payload, &Registry::standard()).unwrap_err();
        assert!(matches!(
            err,
            PayloadError::Compile(CastError::TooManyParticles {
                cost: u32::MAX,
                ..
            })
        ));
        assert_eq!(sim.active_casts(), 0);
    }

    #[test]
    fn test_enemy_position_follows_live_target() {
        let mut sim = Simulator::default();
        let target = TargetSnapshot {
            id: Some(P2),
            pos: DVec2::new(600.0, 100.0),
        };
        sim.begin_cast(
            compiled(1, "enemy.x - 200", "enemy.y"),
            caster(P1, 100.0, 100.0),
            target,
            1,
        )
        .expect("castable");
        let mut targets = [Target::new(P2, DVec2::new(700.0, 200.0), 1)];

        sim.step(SIM_DT, &mut targets);
        assert_eq!(sim.view().next().map(|v| v.pos), Some(DVec2::new(500.0, 200.0)));

        targets[0].hp = 0;
        targets[0].pos = DVec2::new(900.0, 300.0);
        sim.step(SIM_DT, &mut targets);
        assert_eq!(sim.view().next().map(|v| v.pos), Some(DVec2::new(500.0, 200.0)));
    }

    #[test]
    fn test_stale_handle_after_death() {
        let mut sim = Simulator::default();
        sim.begin_cast(
            compiled(1, "player.x - t * 100000", "player.y"),
            caster(P1, 100.0, 100.0),
            nowhere(),
            1,
        )
        .expect("castable");
        sim.advance_casts(SIM_DT);
        let handle = sim.view().next().expect("spawned").handle;
        assert!(sim.particle(handle).is_some());
        sim.tick(SIM_DT, &mut []);
        assert!(sim.particle(handle).is_none());
    }

    #[test]
    fn test_determinism() {
        let spell = compiled(6, "player.x + t * 200 + random(-20, 20)", "player.y + rand * 30 * i");
        let run = |seed: u64| {
            let mut sim = Simulator::default();
            sim.begin_cast(
                Arc::clone(&spell),
                caster(P1, 200.0, 300.0),
                nowhere(),
                seed,
            )
            .expect("castable");
            for _ in 0..30 {
                sim.step(SIM_DT, &mut []);
            }
            sim.view().map(|v| v.pos).collect::<Vec<_>>()
        };

        let a = run(77);
        assert_eq!(a.len(), 6);
        assert_eq!(a, run(77));
        assert_ne!(a, run(78));
    }
}
