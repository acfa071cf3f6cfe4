//! This module contains the render port the controller reports through, and the terminal board
//! that implements it.
//!
//! The board only records what it is told. Drawing happens separately in [`Board::draw`], once per
//! frame, so that a turn with several updates does not flicker.

use std::io;

use console::{pad_str, style, Alignment, Emoji, Term};

use crate::map::Atlas;
use crate::session::{Entry, PerSeat};

/// Shown next to an accepted entry.
static ACCEPTED: Emoji<'static, 'static> = Emoji("\u{2705}", "ok");

/// How many history rows fit under the map before older ones scroll away.
const HISTORY_ROWS: usize = 8;

/// Shown next to a rejected entry.
static REJECTED: Emoji<'static, 'static> = Emoji("\u{274c}", "x");

/// The terminal game board.
#[derive(Debug, Clone, Default)]
pub struct Board {
    /// Messages waiting to be acknowledged.
    alerts: Vec<String>,
    /// Whether a session is running and the controls are on screen.
    controls: bool,
    /// What the country input currently holds.
    draft: String,
    /// Every entry of the session, oldest first.
    history: Vec<Entry>,
    /// One `name: score` cell per player.
    scores: Vec<String>,
    /// Whose turn it is.
    turn: String,
}

impl Board {
    /// Whether the controls have been revealed.
    #[must_use]
    pub const fn controls_visible(&self) -> bool {
        self.controls
    }

    /// What the country input currently holds.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Draws the whole board: title, map, open label, scores, history and the turn line.
    ///
    /// # Errors
    ///
    /// Fails if the terminal cannot be written to.
    pub fn draw(&self, term: &Term, atlas: &Atlas) -> io::Result<()> {
        let (rows, cols) = term.size();
        let cols = usize::from(cols);
        let width = cols.saturating_sub(4).clamp(20, 96);
        let height = (usize::from(rows) / 2).clamp(8, 24);

        let title = format!("{}", style("Countries").bold());
        term.write_line(&pad_str(&title, cols, Alignment::Center, None))?;

        for line in atlas.render(width, height) {
            term.write_line(&pad_str(&line, cols, Alignment::Center, None))?;
        }

        let position = format!(
            "{}",
            style(format!("{} zoom {}", atlas.view_center(), atlas.zoom())).dim()
        );
        term.write_line(&pad_str(&position, cols, Alignment::Center, None))?;

        let popup = atlas.popup().map_or_else(String::new, |pin| {
            let text = format!("{} {}", pin.label().unwrap_or_default(), pin.at());
            style(text).bold().fg(pin.color().terminal()).to_string()
        });
        term.write_line(&pad_str(&popup, cols, Alignment::Center, None))?;
        term.write_line("")?;

        let scores = format!("{}", style(self.score_line()).bold());
        term.write_line(&pad_str(&scores, cols, Alignment::Center, None))?;
        term.write_line("")?;

        self.draw_history(term, cols)?;

        if self.controls {
            term.write_line("")?;
            let turn = format!("{}", style(format!("   {}   ", self.turn)).bold().on_cyan());
            term.write_line(&pad_str(&turn, cols, Alignment::Center, None))?;
        }

        Ok(())
    }

    /// Draws the newest history rows as a table, numbered from the start of the session.
    fn draw_history(&self, term: &Term, cols: usize) -> io::Result<()> {
        let header = format!(
            "{}",
            style(format!(
                "{:>3}  {}  {}  {}",
                "#",
                pad_str("Player", 16, Alignment::Left, None),
                pad_str("Country", 24, Alignment::Left, None),
                "Result"
            ))
            .underlined()
        );
        term.write_line(&pad_str(&header, cols, Alignment::Center, None))?;

        let skip = self.history.len().saturating_sub(HISTORY_ROWS);
        for (number, entry) in self.history.iter().enumerate().skip(skip) {
            let mark = if entry.accepted() {
                style(ACCEPTED).green()
            } else {
                style(REJECTED).red()
            };
            let row = format!(
                "{:>3}  {}  {}  {}",
                number + 1,
                pad_str(entry.player(), 16, Alignment::Left, Some("...")),
                pad_str(entry.country(), 24, Alignment::Left, Some("...")),
                pad_str(&mark.to_string(), 6, Alignment::Left, None)
            );
            term.write_line(&pad_str(&row, cols, Alignment::Center, None))?;
        }

        Ok(())
    }

    /// The rows of the history table.
    #[must_use]
    pub fn history(&self) -> &[Entry] {
        &self.history
    }

    /// Creates an empty board with the controls hidden.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The score row as it is printed.
    #[must_use]
    pub fn score_line(&self) -> String {
        self.scores.join("   ")
    }

    /// Puts text into the country input.
    pub fn set_draft(&mut self, text: &str) {
        text.clone_into(&mut self.draft);
    }

    /// Hands over the pending alerts, oldest first, and forgets them.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    /// The current turn line.
    #[must_use]
    pub fn turn_text(&self) -> &str {
        &self.turn
    }
}

impl View for Board {
    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_owned());
    }

    fn append_history_row(&mut self, entry: &Entry) {
        self.history.push(entry.clone());
    }

    fn clear_entry_input(&mut self) {
        self.draft.clear();
    }

    fn clear_history_display(&mut self) {
        self.history.clear();
    }

    fn render_scores(&mut self, players: &PerSeat<String>, scores: &PerSeat<i32>) {
        self.scores = players
            .iter()
            .zip(scores)
            .map(|((_, name), (_, score))| format!("{name}: {score}"))
            .collect();
    }

    fn reveal_controls(&mut self) {
        self.controls = true;
    }

    fn set_turn_text(&mut self, text: &str) {
        text.clone_into(&mut self.turn);
    }
}

/// Everything the controller needs from a presentation layer.
pub trait View {
    /// Tells the players something went wrong. The message must be acknowledged before play goes
    /// on.
    fn alert(&mut self, message: &str);

    /// Adds one row to the bottom of the history table.
    fn append_history_row(&mut self, entry: &Entry);

    /// Empties the country input so the next player starts fresh.
    fn clear_entry_input(&mut self);

    /// Empties the history table.
    fn clear_history_display(&mut self);

    /// Redraws the score row from scratch.
    fn render_scores(&mut self, players: &PerSeat<String>, scores: &PerSeat<i32>);

    /// Shows the in-game controls. Called once a session starts.
    fn reveal_controls(&mut self);

    /// Replaces the line telling whose turn it is.
    fn set_turn_text(&mut self, text: &str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Seat;

    #[test]
    fn scores_render_as_one_shared_row() {
        let mut board = Board::new();
        let players = PerSeat::new("Ann".to_owned(), "Bo".to_owned());
        board.render_scores(&players, &PerSeat::new(1, -1));

        assert_eq!(board.score_line(), "Ann: 1   Bo: -1", "both players on one row");

        board.render_scores(&players, &PerSeat::new(2, -1));
        assert_eq!(board.score_line(), "Ann: 2   Bo: -1", "the row is replaced, not appended");
    }

    #[test]
    fn history_keeps_every_outcome_in_order() {
        let mut board = Board::new();
        board.append_history_row(&Entry::new("Ann", Seat::First, "France", true));
        board.append_history_row(&Entry::new("Bo", Seat::Second, "Germany", false));

        let countries: Vec<_> = board.history().iter().map(Entry::country).collect();
        assert_eq!(countries, ["France", "Germany"], "one combined table");

        board.clear_history_display();
        assert!(board.history().is_empty(), "a new session starts empty");
    }

    #[test]
    fn alerts_are_handed_over_once() {
        let mut board = Board::new();
        board.alert("first");
        board.alert("second");

        assert_eq!(board.take_alerts(), ["first", "second"], "oldest first");
        assert!(board.take_alerts().is_empty(), "already acknowledged");
    }

    #[test]
    fn clearing_the_input_empties_the_draft() {
        let mut board = Board::new();
        board.set_draft("Peru");
        assert_eq!(board.draft(), "Peru", "draft is kept");

        board.clear_entry_input();
        assert_eq!(board.draft(), "", "draft is gone");
    }

    #[test]
    fn controls_appear_once_a_session_starts() {
        let mut board = Board::new();
        assert!(!board.controls_visible(), "hidden before the first game");

        board.reveal_controls();
        board.set_turn_text("Ann's turn");
        assert!(board.controls_visible(), "shown once a game runs");
        assert_eq!(board.turn_text(), "Ann's turn", "the turn line is kept");
    }
}
