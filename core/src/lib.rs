//! Engine of a roguelike minesweeper descent.
//!
//! A run climbs ten floors of growing boards. Clearing a floor offers a draft of relics that bend
//! the rules for the rest of the run, and ascension levels stack extra constraints on top. The
//! engine is a pure reducer over [`GameState`]; [`Session`] adds autosave over any [`Storage`].

pub use ascension::*;
pub use board::*;
pub use catalog::*;
pub use cell::*;
pub use config::*;
pub use effects::*;
pub use error::*;
pub use generator::*;
pub use persistence::*;
pub use rng::*;
pub use run::*;
pub use session::*;
pub use state::*;
pub use stats::*;
pub use types::*;

mod ascension;
mod board;
mod catalog;
mod cell;
mod config;
mod effects;
mod error;
mod generator;
mod persistence;
mod rng;
mod run;
mod session;
mod state;
mod stats;
mod types;
