//! The library components of the countries game. Two players take turns naming countries, each
//! one starting with the last letter of the one before, and every country found is plotted on a
//! world map in the colour of the player who named it.
//!
//! The starting point of the game is the `session` module, whose controller plays turns against
//! three ports: a geocoder, a map surface and a view. The `geocoder`, `map` and `view` modules each
//! hold one of those ports along with the implementation the terminal game uses.

pub mod geocoder;
pub mod map;
pub mod session;
pub mod view;

mod game;
mod input;

pub use game::init;
