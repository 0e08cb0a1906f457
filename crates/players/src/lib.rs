//! Players: the search-driven learning agent and baseline opponents.
//!
//! - [`Agent`] — Turn controller wiring encoder, search forest, scorer,
//!   and game record together under a per-turn wall-clock budget
//! - [`Rando`] — Uniform random legal play, for warmup opponents and
//!   benchmark floors
mod agent;
mod rando;

pub use agent::*;
pub use rando::*;
