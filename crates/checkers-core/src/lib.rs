//! Rules engine for the staked checkers service.
//!
//! Everything in this crate is pure: positions go in, positions and move sets
//! come out. Persistence, matchmaking, clocks, and money live in the server
//! crate and treat this one as the single authority on what is legal.

pub mod ai;
pub mod board;
pub mod movegen;
pub mod moves;
pub mod snapshot;

pub use board::{Board, Piece, Player, Position};
pub use moves::{apply_move, AppliedMove, RulesError};
