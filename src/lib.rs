//! Browse PokeAPI fighters, pick two, and watch them battle.
//!
//! The library exposes the app modules so the binary and the tests share them.

pub mod action;
pub mod api;
pub mod battle;
pub mod effect;
pub mod reducer;
pub mod state;
pub mod ui;
