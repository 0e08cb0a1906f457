//! Rules-engine contract and match infrastructure.
//!
//! The search and learning core treats the card-game rules engine as an
//! external collaborator. This crate pins down the capability set that
//! collaborator must provide and ships the glue around it:
//!
//! ## Contract
//!
//! - [`State`] — A queryable game position: legal actions, simulation,
//!   per-side feature views
//! - [`Action`] — An engine action, with turn-ending classification
//! - [`Side`] / [`Seat`] — Relative and absolute player designations
//!
//! ## Views
//!
//! - [`Summary`] — One side's board summary (15 features)
//! - [`Minion`] — One board minion (14 features)
//! - [`CardInfo`] — One hand card (14 features)
//!
//! ## Match Infrastructure
//!
//! - [`Player`] — A decision-making participant
//! - [`play`] — Full-game driver with win and exception accounting
//! - [`GameStats`] — Per-seat outcome summary
//! - [`Skirmish`] — Miniature in-repo game implementing [`State`]
mod duel;
mod skirmish;
mod state;
mod view;

pub use duel::*;
pub use skirmish::*;
pub use state::*;
pub use view::*;
