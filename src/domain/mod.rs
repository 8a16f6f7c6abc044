//! Domain layer: pure game rules and the per-game state machine.

pub mod cards;
pub mod deck;
pub mod errors;
pub mod rules;
pub mod scoring;
pub mod state;
pub mod tricks;
pub mod view;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests_props;
#[cfg(test)]
mod tests_state;

/// Stable identity of a seated player; equal to the session id the player's
/// connection is bound to.
pub type PlayerId = uuid::Uuid;

pub use cards::{Card, Rank, Suit};
pub use errors::GameError;
pub use state::{Bid, GameEvent, GameState, Phase, PlayerAction};
