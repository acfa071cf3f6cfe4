//! # countries
//!
//! This crate is a two-player game about geography. Players take turns naming countries, and each
//! country has to start with the last letter of the country named before it. Whoever names a
//! country that exists gets a point and a marker on the world map; whoever breaks the chain or
//! names something that can't be found loses a point.
//!
//! Countries are looked up through the OpenStreetMap Nominatim search API, so the game needs a
//! network connection to play.

#![expect(
    unused_crate_dependencies,
    reason = "The dependencies are used in the library crate."
)]

use anyhow::Result;
use countries::init;

fn main() -> Result<()> {
    init()
}
