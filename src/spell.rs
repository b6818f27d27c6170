//! Spells, mana and the replication payload
//!
//! A [`Spell`] is authored data: four formula sources plus a cost and a
//! cooldown. It compiles into a [`CompiledSpell`] that casts share through an
//! `Arc`. Peers never exchange compiled evaluators, only a [`CastPayload`]
//! carrying the sources, the snapshot coordinates and the cast seed.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formula::{CompileError, Evaluator, Registry, compile_source, validate_with};
use crate::sim::{CasterSnapshot, OwnerId, ResourceSink, TargetSnapshot};

/// The four formulas a spell is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Formula {
    X,
    Y,
    EmitDelay,
    Width,
}

impl Formula {
    pub const ALL: [Formula; 4] = [Formula::X, Formula::Y, Formula::EmitDelay, Formula::Width];

    pub fn name(self) -> &'static str {
        match self {
            Formula::X => "x",
            Formula::Y => "y",
            Formula::EmitDelay => "emit_delay",
            Formula::Width => "width",
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum CastError {
    #[error("spell is on cooldown for another {remaining:.2}s")]
    OnCooldown { remaining: f64 },
    #[error("not enough mana: need {needed}, have {available}")]
    InsufficientMana { needed: u32, available: u32 },
    #[error("spell costs {cost} particles, more than the live cap of {limit}")]
    TooManyParticles { cost: u32, limit: usize },
    #[error("{formula} formula does not compile: {source}")]
    Compile {
        formula: Formula,
        source: CompileError,
    },
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed cast payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Compile(#[from] CastError),
}

fn default_emit_delay() -> String {
    "i * 0.02".to_string()
}

fn default_width() -> String {
    "6".to_string()
}

/// An authored spell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    pub name: String,
    /// Mana cost, which is also the particle count of a cast
    pub cost: u32,
    pub x: String,
    pub y: String,
    #[serde(default = "default_emit_delay")]
    pub emit_delay: String,
    #[serde(default = "default_width")]
    pub width: String,
    /// Seconds between casts
    #[serde(default)]
    pub cooldown: f64,
    /// Seconds until the spell can be cast again
    #[serde(default)]
    pub current_cooldown: f64,
}

impl Spell {
    pub fn new(name: impl Into<String>, cost: u32, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cost,
            x: x.into(),
            y: y.into(),
            emit_delay: default_emit_delay(),
            width: default_width(),
            cooldown: 0.0,
            current_cooldown: 0.0,
        }
    }

    pub fn with_emit_delay(mut self, source: impl Into<String>) -> Self {
        self.emit_delay = source.into();
        self
    }

    pub fn with_width(mut self, source: impl Into<String>) -> Self {
        self.width = source.into();
        self
    }

    pub fn with_cooldown(mut self, cooldown: f64) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Source text of one formula
    pub fn source(&self, formula: Formula) -> &str {
        match formula {
            Formula::X => &self.x,
            Formula::Y => &self.y,
            Formula::EmitDelay => &self.emit_delay,
            Formula::Width => &self.width,
        }
    }

    /// Compile all four formulas, failing on the first one that does not
    pub fn compile(&self, registry: &Registry) -> Result<CompiledSpell, CastError> {
        let compile = |formula| {
            compile_source(self.source(formula), registry)
                .map_err(|source| CastError::Compile { formula, source })
        };
        Ok(CompiledSpell {
            name: self.name.clone(),
            cost: self.cost,
            x: compile(Formula::X)?,
            y: compile(Formula::Y)?,
            emit_delay: compile(Formula::EmitDelay)?,
            width: compile(Formula::Width)?,
        })
    }

    /// Authoring check of every formula, empty when the spell is acceptable
    pub fn validate(&self, registry: &Registry) -> Vec<(Formula, String)> {
        Formula::ALL
            .into_iter()
            .filter_map(|f| validate_with(self.source(f), registry).map(|msg| (f, msg)))
            .collect()
    }

    pub fn tick_cooldown(&mut self, dt: f64) {
        self.current_cooldown = (self.current_cooldown - dt).max(0.0);
    }

    pub fn is_ready(&self) -> bool {
        self.current_cooldown <= 0.0
    }

    /// Restart the cooldown after a successful cast
    pub fn trigger_cooldown(&mut self) {
        self.current_cooldown = self.cooldown;
    }
}

/// A spell with its formulas lowered to evaluators
#[derive(Debug, Clone)]
pub struct CompiledSpell {
    pub name: String,
    pub cost: u32,
    pub x: Evaluator,
    pub y: Evaluator,
    pub emit_delay: Evaluator,
    pub width: Evaluator,
}

impl CompiledSpell {
    pub fn evaluator(&self, formula: Formula) -> &Evaluator {
        match formula {
            Formula::X => &self.x,
            Formula::Y => &self.y,
            Formula::EmitDelay => &self.emit_delay,
            Formula::Width => &self.width,
        }
    }

    /// Whether any formula draws from the random stream
    pub fn draws_random(&self) -> bool {
        Formula::ALL.into_iter().any(|f| self.evaluator(f).draws_random())
    }
}

/// A caster's mana pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaWallet {
    pub owner: OwnerId,
    pub mana: u32,
    pub max_mana: u32,
}

impl ManaWallet {
    /// A full wallet
    pub fn new(owner: OwnerId, max_mana: u32) -> Self {
        Self {
            owner,
            mana: max_mana,
            max_mana,
        }
    }

    pub fn try_spend(&mut self, cost: u32) -> Result<(), CastError> {
        if cost > self.mana {
            return Err(CastError::InsufficientMana {
                needed: cost,
                available: self.mana,
            });
        }
        self.mana -= cost;
        Ok(())
    }
}

impl ResourceSink for ManaWallet {
    fn credit(&mut self, owner: OwnerId, amount: u32) {
        if owner == self.owner {
            self.mana = self.mana.saturating_add(amount).min(self.max_mana);
        }
    }
}

/// Everything a peer needs to replay a cast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastPayload {
    pub spell: Spell,
    pub caster: CasterSnapshot,
    pub target: TargetSnapshot,
    /// Fixes every per-particle and per-frame random draw of the cast
    pub seed: u64,
}

impl CastPayload {
    pub fn to_json(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn compile(&self, registry: &Registry) -> Result<CompiledSpell, PayloadError> {
        Ok(self.spell.compile(registry)?)
    }
}
