//! Arcon demo entry point
//!
//! Casts one spell from a fixed caster at a fixed target, replays it on a
//! second simulator the way a peer would, and logs a summary every second.
//!
//! Usage: `arcon [spell.json] [settings.json]` (set `RUST_LOG=info` to see output)

use std::error::Error;
use std::fs;
use std::process::ExitCode;

use glam::DVec2;

use arcon::consts::SIM_DT;
use arcon::sim::{CasterSnapshot, Target, TargetSnapshot};
use arcon::{CastPayload, ManaWallet, Registry, SimSettings, Simulator, Spell};

const CASTER_ID: u32 = 1;
const TARGET_ID: u32 = 2;
const DEMO_SECONDS: u32 = 5;
const DEMO_SEED: u64 = 0xA2C0;

fn beam() -> Spell {
    Spell::new(
        "beam",
        20,
        "player.x + cos(aim) * 300 * (t - i * 0.02)",
        "player.y + sin(aim) * 300 * (t - i * 0.02)",
    )
    .with_emit_delay("i * 0.02")
    .with_width("4 + 2 * sin(t * 10 + i)")
    .with_cooldown(1.5)
}

fn load_spell(path: Option<String>) -> Result<Spell, Box<dyn Error>> {
    match path {
        Some(path) => {
            let spell: Spell = serde_json::from_str(&fs::read_to_string(&path)?)?;
            log::info!("Loaded spell '{}' from {path}", spell.name);
            Ok(spell)
        }
        None => Ok(beam()),
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let mut spell = load_spell(args.next())?;
    let settings = match args.next() {
        Some(path) => SimSettings::load(path)?,
        None => SimSettings::default(),
    };

    let registry = Registry::standard();
    let problems = spell.validate(&registry);
    if !problems.is_empty() {
        for (formula, msg) in &problems {
            log::error!("{} formula rejected: {msg}", formula);
        }
        return Err(format!("spell '{}' failed validation", spell.name).into());
    }

    let caster = CasterSnapshot {
        id: CASTER_ID,
        pos: DVec2::new(200.0, settings.arena_height / 2.0),
        cursor: DVec2::new(1000.0, settings.arena_height / 2.0),
    };
    let target_pos = DVec2::new(1000.0, settings.arena_height / 2.0);
    let snapshot = TargetSnapshot {
        id: Some(TARGET_ID),
        pos: target_pos,
    };

    let mut sim = Simulator::new(settings.clone());
    let mut peer = Simulator::new(settings);
    let returns_rx = sim.subscribe();
    let mut wallet = ManaWallet::new(CASTER_ID, spell.cost.max(1) * 2);
    let mut targets = [Target::new(TARGET_ID, target_pos, 10)];
    let mut peer_targets = targets;

    let mut seed = DEMO_SEED;
    for frame in 0..DEMO_SECONDS * 60 {
        spell.tick_cooldown(SIM_DT);
        if spell.is_ready() {
            match sim.cast(&mut spell, &registry, &mut wallet, caster, snapshot, seed) {
                Ok(payload) => {
                    let wire = payload.to_json()?;
                    log::debug!("Cast payload: {wire}");
                    peer.replicate(&CastPayload::from_json(&wire)?, &registry)?;
                    seed = seed.wrapping_add(1);
                }
                Err(e) => log::debug!("Cast refused: {e}"),
            }
        }

        let returns = sim.step(SIM_DT, &mut targets);
        returns.deliver(&mut wallet);
        peer.step(SIM_DT, &mut peer_targets);

        for event in returns_rx.try_iter() {
            log::debug!(
                "Frame {}: owner {} gets {} back",
                event.frame,
                event.owner,
                event.amount
            );
        }

        if (frame + 1) % 60 == 0 {
            log::info!(
                "t={}s live={} casts={} target_hp={} mana={}/{}",
                (frame + 1) / 60,
                sim.live_count(),
                sim.active_casts(),
                targets[0].hp,
                wallet.mana,
                wallet.max_mana
            );
        }
    }

    let in_sync = sim
        .view()
        .map(|v| v.pos)
        .eq(peer.view().map(|v| v.pos));
    log::info!("Peer replica in sync: {in_sync}");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Arcon demo starting...");
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
