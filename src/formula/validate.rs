//! Authoring-time formula check
//!
//! Runs a formula once against a fully populated dummy environment so that
//! broken or exploding formulas are rejected in the editor instead of
//! silently killing particles mid-fight.

use super::builtins::Registry;
use super::compiler::compile_source;
use super::env::{Env, Var};

/// Seed for the dummy environment's random stream
const DUMMY_SEED: u64 = 0x5EED;

/// The environment every formula is validated against
pub fn dummy_env() -> Env {
    let mut env = Env::new(DUMMY_SEED)
        .with(Var::T, 0.5)
        .with(Var::I, 1.0)
        .with(Var::N, 10.0)
        .with(Var::PlayerX, 400.0)
        .with(Var::PlayerY, 300.0)
        .with(Var::CursorX, 600.0)
        .with(Var::CursorY, 300.0)
        .with(Var::Aim, 0.0)
        .with(Var::EnemyX, 800.0)
        .with(Var::EnemyY, 300.0)
        .with(Var::EnemyDist, 400.0)
        .with(Var::ArenaW, 1280.0)
        .with(Var::ArenaH, 720.0)
        .with(Var::Dt, 1.0 / 60.0);
    env.reseed(DUMMY_SEED);
    env
}

/// Check a formula against the standard registry
///
/// Returns `None` when the formula is acceptable, otherwise a short message
/// for the author.
pub fn validate(source: &str) -> Option<String> {
    validate_with(source, &Registry::standard())
}

/// Check a formula against a specific registry
pub fn validate_with(source: &str, registry: &Registry) -> Option<String> {
    let evaluator = match compile_source(source, registry) {
        Ok(evaluator) => evaluator,
        Err(e) => return Some(e.to_string()),
    };
    match evaluator.eval(&dummy_env()) {
        Ok(_) => None,
        Err(e) => Some(e.to_string()),
    }
}
