//! Domain-level game errors.
//!
//! These are reported only to the offending session and never mutate game
//! state. The display strings are the client-visible `Error {message}` text.

use thiserror::Error;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Action not allowed in the current phase")]
    WrongPhase,

    #[error("Invalid bid")]
    InvalidBid,

    #[error("Card not in hand")]
    IllegalCard,

    #[error("Must follow suit")]
    MustFollowSuit,

    #[error("Player is not seated in this game")]
    NotSeated,
}
