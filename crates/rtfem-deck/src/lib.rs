//! Deck parsing and problem assembly: a keyword-card lexer plus a builder
//! that turns either cards or direct calls into a runnable `rtfem_solver::Problem`.

pub mod builder;
pub mod card;

pub use builder::{apply_deck, BuildError, ProblemBuilder};
pub use card::{Card, Deck, Parameter, ParseError};
