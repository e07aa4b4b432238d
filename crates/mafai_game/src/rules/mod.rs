//! Game rules for Mafia.
//!
//! Pure functions over a roster snapshot, kept apart from the session so
//! they can be tested and composed on their own.

pub mod win;

pub use win::check_winner;
