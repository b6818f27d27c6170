//! Deterministic simulation module
//!
//! Casts and particles. Like the formula layer this must stay deterministic:
//! - The caller drives the frame clock
//! - Randomness only comes from seeds carried by casts
//! - Stable iteration order (arena slot order)
//! - No rendering or platform dependencies

pub mod arena;
pub mod cast;
pub mod collision;
pub mod resources;
pub mod state;
pub mod tick;

pub use arena::{Arena, Handle, ParticleArena, ParticleHandle};
pub use cast::{Cast, PendingParticle, begin_cast, check_cost};
pub use collision::{circles_overlap, effective_radius, hits_target};
pub use resources::{ResourceReturn, ResourceReturns, ResourceSink};
pub use state::{
    CasterSnapshot, OwnerId, Particle, RngState, Snapshot, Target, TargetSnapshot, TrailPoint,
};
pub use tick::{ParticleView, Simulator};
