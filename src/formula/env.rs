//! Fixed-schema evaluation environment
//!
//! Formula variables are a closed set. Names are resolved to a [`Var`] slot
//! once at compile time; a name outside the schema compiles to a constant 0,
//! which is how "undefined variable reads as 0" is honored without any
//! string lookup during simulation.

use std::cell::RefCell;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Every variable a formula can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Var {
    /// Seconds since the particle was emitted
    T,
    /// Particle index within its cast
    I,
    /// Particle count of the cast
    N,
    Pi,
    E,
    /// Per-frame uniform draw in [0, 1)
    Rand,
    PlayerX,
    PlayerY,
    CursorX,
    CursorY,
    /// Angle from caster to cursor, radians
    Aim,
    EnemyX,
    EnemyY,
    /// Distance from caster to target at cast time
    EnemyDist,
    ArenaW,
    ArenaH,
    /// Length of the current frame
    Dt,
}

impl Var {
    pub const COUNT: usize = 17;

    pub const ALL: [Var; Var::COUNT] = [
        Var::T,
        Var::I,
        Var::N,
        Var::Pi,
        Var::E,
        Var::Rand,
        Var::PlayerX,
        Var::PlayerY,
        Var::CursorX,
        Var::CursorY,
        Var::Aim,
        Var::EnemyX,
        Var::EnemyY,
        Var::EnemyDist,
        Var::ArenaW,
        Var::ArenaH,
        Var::Dt,
    ];

    /// Source-text name of the variable
    pub fn name(self) -> &'static str {
        match self {
            Var::T => "t",
            Var::I => "i",
            Var::N => "n",
            Var::Pi => "pi",
            Var::E => "e",
            Var::Rand => "rand",
            Var::PlayerX => "player.x",
            Var::PlayerY => "player.y",
            Var::CursorX => "cursor.x",
            Var::CursorY => "cursor.y",
            Var::Aim => "aim",
            Var::EnemyX => "enemy.x",
            Var::EnemyY => "enemy.y",
            Var::EnemyDist => "enemy.dist",
            Var::ArenaW => "arena.w",
            Var::ArenaH => "arena.h",
            Var::Dt => "dt",
        }
    }

    /// Resolve a source name. Dotted paths are opaque keys, not nested lookups.
    pub fn from_name(name: &str) -> Option<Var> {
        Var::ALL.iter().copied().find(|v| v.name() == name)
    }

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

/// Variable values for one evaluation, plus the random stream impure
/// builtins draw from
///
/// The stream lives behind a `RefCell` so evaluators only ever need `&Env`.
/// Per-particle environments are rebuilt every frame with a stream seeded
/// from the particle seed and the frame number, which keeps `rand` calls
/// reproducible for anyone holding the same seeds.
#[derive(Debug, Clone)]
pub struct Env {
    slots: [f64; Var::COUNT],
    rng: RefCell<Pcg32>,
}

impl Env {
    /// All variables zero except the math constants
    pub fn new(seed: u64) -> Self {
        let mut slots = [0.0; Var::COUNT];
        slots[Var::Pi.slot()] = std::f64::consts::PI;
        slots[Var::E.slot()] = std::f64::consts::E;
        Self {
            slots,
            rng: RefCell::new(Pcg32::seed_from_u64(seed)),
        }
    }

    #[inline]
    pub fn get(&self, var: Var) -> f64 {
        self.slots[var.slot()]
    }

    #[inline]
    pub fn set(&mut self, var: Var, value: f64) {
        self.slots[var.slot()] = value;
    }

    /// Builder-style setter
    pub fn with(mut self, var: Var, value: f64) -> Self {
        self.set(var, value);
        self
    }

    /// Look a variable up by source name, 0 when the name is not in the schema
    pub fn lookup(&self, name: &str) -> f64 {
        Var::from_name(name).map(|v| self.get(v)).unwrap_or(0.0)
    }

    /// Reseed the random stream and redraw `rand`
    pub fn reseed(&mut self, seed: u64) {
        let mut rng = Pcg32::seed_from_u64(seed);
        self.slots[Var::Rand.slot()] = rng.random::<f64>();
        *self.rng.get_mut() = rng;
    }

    /// Run `f` with exclusive access to the random stream
    pub fn with_rng<R>(&self, f: impl FnOnce(&mut Pcg32) -> R) -> Option<R> {
        self.rng.try_borrow_mut().ok().map(|mut rng| f(&mut rng))
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new(0)
    }
}
