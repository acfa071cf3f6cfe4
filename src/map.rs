//! This module holds the map the countries get plotted on.
//!
//! The [`MapSurface`] trait is what the controller talks to. [`Atlas`] implements it in memory and
//! renders an equirectangular character grid for the terminal, with one coloured glyph per marker.

use console::{style, Color, StyledObject};

use crate::geocoder::Coordinates;

/// Where the map looks before anything has been plotted.
const HOME: (f64, f64) = (20.0, 0.0);

/// The zoom level at which the whole world fits the grid.
pub const WORLD_ZOOM: u8 = 2;

/// An in-memory world map for the terminal.
#[derive(Debug, Clone)]
pub struct Atlas {
    /// The point the view is centred on.
    center: Coordinates,
    /// The identifier the next marker gets.
    next_id: u64,
    /// Every marker, in the order it was placed.
    pins: Vec<Pin>,
    /// The marker whose label is open.
    popup: Option<MarkerHandle>,
    /// The current zoom level.
    zoom: u8,
}

impl Default for Atlas {
    fn default() -> Self {
        Self::new()
    }
}

impl Atlas {
    /// Creates an empty world map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            center: Coordinates::new(HOME.0, HOME.1),
            next_id: 0,
            pins: Vec::new(),
            popup: None,
            zoom: WORLD_ZOOM,
        }
    }

    /// Every marker, in the order it was placed.
    #[must_use]
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// The marker whose label was bound last.
    #[must_use]
    pub fn popup(&self) -> Option<&Pin> {
        self.popup
            .and_then(|handle| self.pins.iter().find(|pin| pin.handle == handle))
    }

    /// Renders the visible window as `height` lines of `width` characters each.
    #[must_use]
    pub fn render(&self, width: usize, height: usize) -> Vec<String> {
        let view = self.viewport();
        let mut grid = vec![vec![Cell::Blank; width]; height];

        if let Some(row) = cell_index(view.north / view.lat_span, height) {
            if let Some(line) = grid.get_mut(row) {
                line.fill(Cell::Equator);
            }
        }

        if let Some(col) = cell_index(-view.west / view.lon_span, width) {
            for line in &mut grid {
                if let Some(cell) = line.get_mut(col) {
                    *cell = match *cell {
                        Cell::Equator => Cell::Origin,
                        _ => Cell::Meridian,
                    };
                }
            }
        }

        for pin in &self.pins {
            if let Some(cell) = view.cell(pin.at, &mut grid) {
                *cell = Cell::Pin(pin.color, self.popup == Some(pin.handle));
            }
        }

        // the open label always wins its cell, even when newer pins overlap it
        if let Some(pin) = self.popup() {
            if let Some(cell) = view.cell(pin.at, &mut grid) {
                *cell = Cell::Pin(pin.color, true);
            }
        }

        grid.iter().map(|line| draw_line(line)).collect()
    }

    /// The point the view is centred on.
    #[must_use]
    pub const fn view_center(&self) -> Coordinates {
        self.center
    }

    /// Works out the visible window. Every level above [`WORLD_ZOOM`] halves both spans, and the
    /// window is pushed back inside the globe when the centre sits near an edge.
    fn viewport(&self) -> Viewport {
        let scale = 2_f64.powi(i32::from(self.zoom.saturating_sub(WORLD_ZOOM)));
        let lon_span = 360.0 / scale;
        let lat_span = 180.0 / scale;

        Viewport {
            lat_span,
            lon_span,
            north: (self.center.lat() + lat_span / 2.0).clamp(-90.0 + lat_span, 90.0),
            west: (self.center.lon() - lon_span / 2.0).clamp(-180.0, 180.0 - lon_span),
        }
    }

    /// The current zoom level.
    #[must_use]
    pub const fn zoom(&self) -> u8 {
        self.zoom
    }
}

impl MapSurface for Atlas {
    fn add_marker(&mut self, at: Coordinates, color: MarkerColor) -> MarkerHandle {
        let handle = MarkerHandle::new(self.next_id);
        self.next_id += 1;
        self.pins.push(Pin {
            at,
            color,
            handle,
            label: None,
        });

        handle
    }

    fn bind_label(&mut self, marker: MarkerHandle, text: &str) {
        if let Some(pin) = self.pins.iter_mut().find(|pin| pin.handle == marker) {
            pin.label = Some(text.to_owned());
            self.popup = Some(marker);
        }
    }

    fn center(&mut self, at: Coordinates, zoom: u8) {
        self.center = at;
        self.zoom = zoom;
    }

    fn remove_marker(&mut self, marker: MarkerHandle) {
        self.pins.retain(|pin| pin.handle != marker);
        if self.popup == Some(marker) {
            self.popup = None;
        }
    }
}

/// What a single character of the rendered grid shows.
#[derive(Clone, Copy)]
enum Cell {
    /// Open map.
    Blank,
    /// The equator.
    Equator,
    /// The prime meridian.
    Meridian,
    /// Where the equator and the prime meridian cross.
    Origin,
    /// A marker; `true` when it is the one carrying the open label.
    Pin(MarkerColor, bool),
}

/// A surface markers can be placed on.
#[expect(
    clippy::module_name_repetitions,
    reason = "A bare `Surface` would not say what the controller is drawing on."
)]
pub trait MapSurface {
    /// Places a new marker and returns its handle.
    fn add_marker(&mut self, at: Coordinates, color: MarkerColor) -> MarkerHandle;

    /// Attaches a text label to a marker and brings it to the front. Unknown handles are ignored.
    fn bind_label(&mut self, marker: MarkerHandle, text: &str);

    /// Moves the view so that `at` is in the middle, at the given zoom level.
    fn center(&mut self, at: Coordinates, zoom: u8);

    /// Takes a marker off the surface. Unknown handles are ignored.
    fn remove_marker(&mut self, marker: MarkerHandle);
}

/// The colour a marker is drawn with. Each seat owns one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerColor {
    /// The second player's colour.
    Blue,
    /// The first player's colour.
    Red,
}

impl MarkerColor {
    /// The terminal colour the marker and its label are printed in.
    #[must_use]
    pub const fn terminal(self) -> Color {
        match self {
            Self::Blue => Color::Blue,
            Self::Red => Color::Red,
        }
    }
}

/// An opaque reference to a marker placed on a [`MapSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(u64);

impl MarkerHandle {
    /// Wraps a surface specific marker identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// One marker as the atlas keeps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    /// Where the pin sits.
    at: Coordinates,
    /// The pin's colour.
    color: MarkerColor,
    /// The handle given out when the pin was placed.
    handle: MarkerHandle,
    /// The label bound to the pin, if any.
    label: Option<String>,
}

impl Pin {
    /// Where the pin sits.
    #[must_use]
    pub const fn at(&self) -> Coordinates {
        self.at
    }

    /// The pin's colour.
    #[must_use]
    pub const fn color(&self) -> MarkerColor {
        self.color
    }

    /// The label bound to the pin, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// The portion of the globe currently visible, in degrees.
struct Viewport {
    /// Degrees of latitude down the grid.
    lat_span: f64,
    /// Degrees of longitude across the grid.
    lon_span: f64,
    /// Latitude of the top edge.
    north: f64,
    /// Longitude of the left edge.
    west: f64,
}

impl Viewport {
    /// The grid cell `at` falls into, if it is on screen.
    fn cell<'grid>(
        &self,
        at: Coordinates,
        grid: &'grid mut [Vec<Cell>],
    ) -> Option<&'grid mut Cell> {
        let row = cell_index((self.north - at.lat()) / self.lat_span, grid.len())?;
        let line = grid.get_mut(row)?;
        let col = cell_index((at.lon() - self.west) / self.lon_span, line.len())?;

        line.get_mut(col)
    }
}

/// Maps a fraction of the visible span onto one of `cells` grid positions. Fractions outside of
/// `0..=1` are off screen.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "The fraction is checked to lie in 0..=1, so the rounded product is a valid index."
)]
fn cell_index(fraction: f64, cells: usize) -> Option<usize> {
    if cells == 0 || !(0.0..=1.0).contains(&fraction) {
        return None;
    }

    Some((fraction * (cells - 1) as f64).round() as usize)
}

/// Turns a row of cells into a printable, styled line.
fn draw_line(cells: &[Cell]) -> String {
    cells.iter().map(|&cell| glyph(cell).to_string()).collect()
}

/// The styled character a cell is drawn as.
fn glyph(cell: Cell) -> StyledObject<char> {
    match cell {
        Cell::Blank => style('.').dim(),
        Cell::Equator => style('-').dim(),
        Cell::Meridian => style('|').dim(),
        Cell::Origin => style('+').dim(),
        Cell::Pin(color, true) => style('@').bold().fg(color.terminal()),
        Cell::Pin(color, false) => style('o').fg(color.terminal()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The character drawn at `row` and `col`, if the grid reaches that far.
    fn char_at(grid: &[Vec<char>], row: usize, col: usize) -> Option<char> {
        grid.get(row).and_then(|line| line.get(col)).copied()
    }

    /// Renders without colour codes so cells can be compared by character.
    fn plain(atlas: &Atlas, width: usize, height: usize) -> Vec<Vec<char>> {
        atlas
            .render(width, height)
            .iter()
            .map(|line| console::strip_ansi_codes(line).chars().collect())
            .collect()
    }

    #[test]
    fn markers_get_distinct_handles_and_stay_until_removed() {
        let mut atlas = Atlas::new();
        let first = atlas.add_marker(Coordinates::new(48.85, 2.35), MarkerColor::Red);
        let second = atlas.add_marker(Coordinates::new(-15.8, -47.9), MarkerColor::Blue);

        assert_ne!(first, second, "handles are unique");
        assert_eq!(atlas.pins().len(), 2, "both pins are kept");

        atlas.bind_label(second, "Brazil");
        assert_eq!(
            atlas.popup().and_then(Pin::label),
            Some("Brazil"),
            "the labelled pin is open"
        );

        atlas.remove_marker(first);
        assert_eq!(atlas.pins().len(), 1, "only the removed pin is gone");
        assert!(atlas.popup().is_some(), "the other pin keeps its label open");

        atlas.remove_marker(second);
        assert!(atlas.pins().is_empty(), "every pin is gone");
        assert!(atlas.popup().is_none(), "removing the open pin closes the popup");

        let third = atlas.add_marker(Coordinates::new(0.0, 0.0), MarkerColor::Red);
        assert_ne!(third, first, "handles are not reused");
        assert_ne!(third, second, "not even the newest one");
    }

    #[test]
    fn unknown_handles_are_ignored() {
        let mut atlas = Atlas::new();
        let placed = atlas.add_marker(Coordinates::new(0.0, 0.0), MarkerColor::Red);
        atlas.bind_label(MarkerHandle::new(42), "Nowhere");
        atlas.remove_marker(MarkerHandle::new(42));

        assert!(atlas.popup().is_none(), "nothing to open");
        assert_eq!(atlas.pins().len(), 1, "nothing removed");
        assert_ne!(placed, MarkerHandle::new(42), "the placed pin is a different one");
    }

    #[test]
    fn the_world_view_places_markers_by_longitude_and_latitude() {
        let mut atlas = Atlas::new();
        let _ = atlas.add_marker(Coordinates::new(0.0, 0.0), MarkerColor::Red);
        let corner = atlas.add_marker(Coordinates::new(90.0, -180.0), MarkerColor::Blue);
        atlas.bind_label(corner, "Corner");

        let grid = plain(&atlas, 37, 19);

        assert_eq!(grid.len(), 19, "one line per row");
        assert!(grid.iter().all(|line| line.len() == 37), "every row is full width");
        assert_eq!(char_at(&grid, 9, 18), Some('o'), "the origin pin sits in the middle");
        assert_eq!(char_at(&grid, 0, 0), Some('@'), "the open pin sits in the top left corner");
        assert_eq!(char_at(&grid, 9, 0), Some('-'), "the equator crosses the middle row");
        assert_eq!(char_at(&grid, 0, 18), Some('|'), "the meridian runs down the middle column");
    }

    #[test]
    fn zooming_in_narrows_the_window_and_hides_far_markers() {
        let mut atlas = Atlas::new();
        let _ = atlas.add_marker(Coordinates::new(-33.9, 151.2), MarkerColor::Blue);
        let paris = atlas.add_marker(Coordinates::new(48.85, 2.35), MarkerColor::Red);
        atlas.bind_label(paris, "France");
        atlas.center(Coordinates::new(48.85, 2.35), 4);

        let grid = plain(&atlas, 41, 21);
        let glyphs: String = grid.iter().flatten().collect();

        assert_eq!(atlas.zoom(), 4, "zoom is kept");
        assert_eq!(glyphs.matches('@').count(), 1, "the centred pin is visible");
        assert_eq!(glyphs.matches('o').count(), 0, "Sydney is off screen");
        assert_eq!(char_at(&grid, 10, 20), Some('@'), "the centred pin is in the middle");
    }

    #[test]
    fn the_window_stays_inside_the_globe() {
        let mut atlas = Atlas::new();
        atlas.center(Coordinates::new(89.0, 179.0), 3);
        let view = atlas.viewport();

        assert!(view.west.abs() < 1e-9, "pushed back from the date line");
        assert!((view.north - 90.0).abs() < 1e-9, "pushed back from the pole");
    }

    #[test]
    fn off_screen_fractions_have_no_cell() {
        assert_eq!(cell_index(-0.1, 10), None, "left of the grid");
        assert_eq!(cell_index(1.1, 10), None, "right of the grid");
        assert_eq!(cell_index(0.5, 0), None, "an empty grid");
        assert_eq!(cell_index(1.0, 10), Some(9), "the last cell");
    }
}
