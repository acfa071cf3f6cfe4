//! The session module holds the state of one game and the controller that plays turns against it.
//!
//! A [`Session`] lives from one [`Controller::start`] to the next. Turns go through
//! [`Controller::submit_entry`], which checks the chaining rule, asks the geocoder where the
//! country is, and then scores the player and hands the turn over. Everything the players see is
//! pushed through the [`View`] port and everything plotted goes through the [`MapSurface`] port,
//! so the controller never touches a terminal itself.

use std::array;
use std::fmt;
use std::iter::Zip;

use tracing::{debug, error, info, warn};

use crate::geocoder::{Coordinates, GeocodeError, Geocoder};
use crate::map::{MapSurface, MarkerColor, MarkerHandle, WORLD_ZOOM};
use crate::view::View;

/// Runs the game: owns the live [`Session`] along with the geocoder, the map and the view.
pub struct Controller<G, M, V> {
    /// How many sessions have been started.
    generations: u64,
    /// Finds countries.
    geocoder: G,
    /// Shows where they are.
    map: M,
    /// The running game, if one was started.
    session: Option<Session>,
    /// Shows everything else.
    view: V,
    /// The zoom level used when centring on a found country.
    zoom: u8,
}

impl<G, M, V> fmt::Debug for Controller<G, M, V> {
    #[expect(
        clippy::min_ident_chars,
        reason = "The formatter keeps the name the trait gives it."
    )]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("generations", &self.generations)
            .field("session", &self.session)
            .field("zoom", &self.zoom)
            .finish_non_exhaustive()
    }
}

impl<G, M, V> Controller<G, M, V>
where
    G: Geocoder,
    M: MapSurface,
    V: View,
{
    /// The first half of a turn, up to the point where the country has to be looked up.
    ///
    /// A broken chain is settled here: the player loses a point and the turn passes without any
    /// lookup. Otherwise the session is marked as waiting and the returned [`Submission`] has to
    /// be handed to [`Self::complete_submission`] together with the lookup's result.
    ///
    /// # Errors
    ///
    /// - [`TurnError::NoSession`] before the first [`Self::start`].
    /// - [`TurnError::EmptyCountry`] if `raw` is blank. The turn does not pass.
    /// - [`TurnError::InFlight`] while another lookup is on its way.
    /// - [`TurnError::BrokenChain`] if the chaining rule is broken.
    pub fn begin_submission(&mut self, raw: &str) -> Result<Submission, TurnError> {
        let view = &mut self.view;
        let Some(session) = self.session.as_mut() else {
            return Err(report(view, TurnError::NoSession));
        };

        let country = raw.trim();
        if country.is_empty() {
            return Err(report(view, TurnError::EmptyCountry));
        }

        if let Some(pending) = session.pending() {
            let err = TurnError::InFlight(pending.to_owned());
            return Err(report(view, err));
        }

        if let Err(err) = session.check_chain(country) {
            warn!(player = session.current_player(), country, "chaining rule broken");
            penalize(session, view, country);
            let err = report(view, err);
            advance(session, view);
            return Err(err);
        }

        session.pending = Some(country.to_owned());
        debug!(player = session.current_player(), country, "waiting on lookup");

        Ok(Submission {
            country: country.to_owned(),
            generation: session.generation,
            seat: session.current,
        })
    }

    /// The second half of a turn, once the lookup for `submission` has answered.
    ///
    /// A found country is centred on, marked in the player's colour, labelled, recorded and
    /// scored, and the turn passes. An unknown country costs a point and the turn passes. A
    /// failed lookup changes nothing; the same player goes again.
    ///
    /// # Errors
    ///
    /// - [`TurnError::StaleSubmission`] if a new game started since `submission` was made.
    /// - [`TurnError::NotFound`] if the lookup found nothing.
    /// - [`TurnError::Lookup`] if the lookup failed.
    pub fn complete_submission(
        &mut self,
        submission: Submission,
        lookup: Result<Option<Coordinates>, GeocodeError>,
    ) -> Result<Coordinates, TurnError> {
        let view = &mut self.view;
        let Some(session) = self
            .session
            .as_mut()
            .filter(|session| session.generation == submission.generation)
        else {
            return Err(report(view, TurnError::StaleSubmission));
        };
        session.pending = None;

        let Submission { country, seat, .. } = submission;
        match lookup {
            Err(err) => {
                error!(country = %country, error = %err, "country lookup failed");
                let err = report(view, TurnError::Lookup(err));
                view.set_turn_text(&session.turn_text());
                view.clear_entry_input();
                Err(err)
            }
            Ok(None) => {
                warn!(player = session.player(seat), country = %country, "country not found");
                penalize(session, view, &country);
                let err = report(view, TurnError::NotFound(country));
                advance(session, view);
                Err(err)
            }
            Ok(Some(at)) => {
                self.map.center(at, self.zoom);
                let handle = self.map.add_marker(at, seat.color());
                self.map.bind_label(handle, &country);
                session.markers.get_mut(seat).push(Marker {
                    at,
                    handle,
                    label: country.clone(),
                });

                info!(player = session.player(seat), country = %country, %at, "country accepted");
                let entry = session.record(seat, &country, true);
                view.append_history_row(&entry);
                session.add_score(seat);
                view.render_scores(session.players(), session.scores());
                session.last_country = Some(country);
                advance(session, view);

                Ok(at)
            }
        }
    }

    /// The geocoder.
    pub const fn geocoder(&self) -> &G {
        &self.geocoder
    }

    /// The map surface.
    pub const fn map(&self) -> &M {
        &self.map
    }

    /// Wires a controller to its collaborators. No session runs until [`Self::start`].
    pub const fn new(geocoder: G, map: M, view: V) -> Self {
        Self {
            generations: 0,
            geocoder,
            map,
            session: None,
            view,
            zoom: WORLD_ZOOM,
        }
    }

    /// The running session, if any.
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Starts a fresh game between two players, replacing any game in progress. The markers the
    /// previous game placed are taken off the map.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::MissingPlayers`] if either name is blank. The running game, if any, is
    /// left alone in that case.
    pub fn start(&mut self, first: &str, second: &str) -> Result<(), TurnError> {
        let mut session = match Session::new(first, second) {
            Ok(session) => session,
            Err(err) => return Err(report(&mut self.view, err)),
        };

        self.generations += 1;
        session.generation = self.generations;
        info!(
            first = session.player(Seat::First),
            second = session.player(Seat::Second),
            generation = session.generation,
            "starting a new game"
        );

        if let Some(previous) = self.session.take() {
            for (seat, markers) in &previous.markers {
                debug!(player = previous.player(seat), count = markers.len(), "removing markers");
                for marker in markers {
                    self.map.remove_marker(marker.handle());
                }
            }
        }

        self.view.set_turn_text(&session.turn_text());
        self.view.reveal_controls();
        self.view.clear_history_display();
        self.view.render_scores(session.players(), session.scores());
        self.session = Some(session);

        Ok(())
    }

    /// Plays one turn: checks `raw` against the chaining rule, looks it up, and scores it.
    ///
    /// On success the country's coordinates are returned. Every failure is also reported through
    /// the view.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_submission`] and [`Self::complete_submission`].
    pub fn submit_entry(&mut self, raw: &str) -> Result<Coordinates, TurnError> {
        let submission = self.begin_submission(raw)?;
        let lookup = self.geocoder.lookup(submission.country());

        self.complete_submission(submission, lookup)
    }

    /// Hands the turn to the other player.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::NoSession`] before the first [`Self::start`], and
    /// [`TurnError::InFlight`] while a lookup is on its way.
    pub fn switch_turn(&mut self) -> Result<Seat, TurnError> {
        let view = &mut self.view;
        let Some(session) = self.session.as_mut() else {
            return Err(report(view, TurnError::NoSession));
        };

        if let Some(pending) = session.pending() {
            let err = TurnError::InFlight(pending.to_owned());
            return Err(report(view, err));
        }

        advance(session, view);
        Ok(session.current)
    }

    /// The view.
    pub const fn view(&self) -> &V {
        &self.view
    }

    /// The view, mutably, for front ends that need to feed it input.
    pub const fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Sets the zoom level the map uses when it centres on a found country.
    #[must_use]
    pub const fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }
}

/// One line of the session history: who tried which country, and whether it counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Whether the submission scored.
    accepted: bool,
    /// The country as it was submitted, trimmed.
    country: String,
    /// The name of the player who submitted.
    player: String,
    /// The seat the player sat in.
    seat: Seat,
}

impl Entry {
    /// Whether the submission scored.
    #[must_use]
    pub const fn accepted(&self) -> bool {
        self.accepted
    }

    /// The country as it was submitted.
    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }

    /// Records a submission and its outcome.
    #[must_use]
    pub fn new(player: &str, seat: Seat, country: &str, accepted: bool) -> Self {
        Self {
            accepted,
            country: country.to_owned(),
            player: player.to_owned(),
            seat,
        }
    }

    /// The name of the player who submitted.
    #[must_use]
    pub fn player(&self) -> &str {
        &self.player
    }

    /// The seat the player sat in.
    #[must_use]
    pub const fn seat(&self) -> Seat {
        self.seat
    }
}

/// The broad families of [`TurnError`], which decide what a failed turn costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The geocoder knows no such country. The player loses a point and the turn passes.
    NotFound,
    /// The chaining rule was broken. The player loses a point and the turn passes.
    RuleViolation,
    /// The lookup itself failed. Nothing changes and the same player goes again.
    Transport,
    /// Missing or out of order input. Nothing changes.
    Validation,
}

/// A marker a player earned, as the session remembers it.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Where the country was found.
    at: Coordinates,
    /// The handle the map surface gave out.
    handle: MarkerHandle,
    /// The country the marker stands for.
    label: String,
}

impl Marker {
    /// Where the country was found.
    #[must_use]
    pub const fn at(&self) -> Coordinates {
        self.at
    }

    /// The handle the map surface gave out.
    #[must_use]
    pub const fn handle(&self) -> MarkerHandle {
        self.handle
    }

    /// The country the marker stands for.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A pair of values, one for each [`Seat`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerSeat<T> {
    /// The first seat's value.
    first: T,
    /// The second seat's value.
    second: T,
}

impl<T> PerSeat<T> {
    /// The value belonging to `seat`.
    pub const fn get(&self, seat: Seat) -> &T {
        match seat {
            Seat::First => &self.first,
            Seat::Second => &self.second,
        }
    }

    /// The value belonging to `seat`, mutably.
    pub const fn get_mut(&mut self, seat: Seat) -> &mut T {
        match seat {
            Seat::First => &mut self.first,
            Seat::Second => &mut self.second,
        }
    }

    /// Both values with their seats, in turn order.
    pub fn iter(&self) -> Zip<array::IntoIter<Seat, 2>, array::IntoIter<&T, 2>> {
        Seat::ALL.into_iter().zip([&self.first, &self.second])
    }

    /// Pairs up the two values in seat order.
    pub const fn new(first: T, second: T) -> Self {
        Self { first, second }
    }
}

impl<'seats, T> IntoIterator for &'seats PerSeat<T> {
    type IntoIter = Zip<array::IntoIter<Seat, 2>, array::IntoIter<&'seats T, 2>>;
    type Item = (Seat, &'seats T);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One of the two places at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    /// The player who moves first.
    First,
    /// The player who moves second.
    Second,
}

impl Seat {
    /// Both seats, in turn order.
    pub const ALL: [Self; 2] = [Self::First, Self::Second];

    /// The colour this seat's markers are drawn with.
    #[must_use]
    pub const fn color(self) -> MarkerColor {
        match self {
            Self::First => MarkerColor::Red,
            Self::Second => MarkerColor::Blue,
        }
    }

    /// The seat that plays after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// The state of one game.
#[derive(Debug, Clone)]
pub struct Session {
    /// Whose turn it is.
    current: Seat,
    /// Which `start` created the session. Lookups carry it so that late answers can be told apart.
    generation: u64,
    /// Every submission, oldest first.
    history: Vec<Entry>,
    /// The last accepted country, as submitted.
    last_country: Option<String>,
    /// The markers each player earned.
    markers: PerSeat<Vec<Marker>>,
    /// The country whose lookup is on its way, if any.
    pending: Option<String>,
    /// The players' names, trimmed.
    players: PerSeat<String>,
    /// The players' scores. They can go negative.
    scores: PerSeat<i32>,
}

impl Session {
    /// Gives the player in `seat` a point.
    pub const fn add_score(&mut self, seat: Seat) {
        *self.scores.get_mut(seat) += 1;
    }

    /// Checks `country` against the chaining rule. Anything goes before the first country is
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::BrokenChain`] if `country` does not start with the last letter of the
    /// last accepted country.
    pub fn check_chain(&self, country: &str) -> Result<(), TurnError> {
        match self.last_country.as_deref() {
            Some(previous) if !chains_onto(previous, country) => Err(TurnError::BrokenChain {
                country: country.to_owned(),
                previous: previous.to_owned(),
            }),
            _ => Ok(()),
        }
    }

    /// Whose turn it is.
    #[must_use]
    pub const fn current(&self) -> Seat {
        self.current
    }

    /// The name of the player whose turn it is.
    #[must_use]
    pub fn current_player(&self) -> &str {
        self.player(self.current)
    }

    /// Every submission so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Entry] {
        &self.history
    }

    /// The last accepted country, in the casing it was submitted with.
    #[must_use]
    pub fn last_country(&self) -> Option<&str> {
        self.last_country.as_deref()
    }

    /// The markers the player in `seat` has earned.
    #[must_use]
    pub fn markers(&self, seat: Seat) -> &[Marker] {
        self.markers.get(seat)
    }

    /// Seats two players for a fresh game. Names are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::MissingPlayers`] if either name is blank.
    pub fn new(first: &str, second: &str) -> Result<Self, TurnError> {
        let (first, second) = (first.trim(), second.trim());
        if first.is_empty() || second.is_empty() {
            return Err(TurnError::MissingPlayers);
        }

        Ok(Self {
            current: Seat::First,
            generation: 0,
            history: Vec::new(),
            last_country: None,
            markers: PerSeat::default(),
            pending: None,
            players: PerSeat::new(first.to_owned(), second.to_owned()),
            scores: PerSeat::new(0, 0),
        })
    }

    /// The country being looked up right now, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// The name of the player in `seat`.
    #[must_use]
    pub fn player(&self, seat: Seat) -> &str {
        self.players.get(seat)
    }

    /// The players' names.
    #[must_use]
    pub const fn players(&self) -> &PerSeat<String> {
        &self.players
    }

    /// Appends an entry for the player in `seat` and returns a copy of it.
    fn record(&mut self, seat: Seat, country: &str, accepted: bool) -> Entry {
        let entry = Entry::new(self.player(seat), seat, country, accepted);
        self.history.push(entry.clone());
        entry
    }

    /// The score of the player in `seat`.
    #[must_use]
    pub const fn score(&self, seat: Seat) -> i32 {
        *self.scores.get(seat)
    }

    /// Both scores.
    #[must_use]
    pub const fn scores(&self) -> &PerSeat<i32> {
        &self.scores
    }

    /// Takes a point from the player in `seat`.
    pub const fn subtract_score(&mut self, seat: Seat) {
        *self.scores.get_mut(seat) -= 1;
    }

    /// Hands the turn to the other player and returns the new seat.
    pub const fn switch_turn(&mut self) -> Seat {
        self.current = self.current.next();
        self.current
    }

    /// The line announcing whose turn it is.
    #[must_use]
    pub fn turn_text(&self) -> String {
        format!("{}'s turn", self.current_player())
    }
}

/// A country that passed the chaining rule and now waits for its lookup.
///
/// It can only be made by [`Controller::begin_submission`] and is used up by
/// [`Controller::complete_submission`].
#[derive(Debug, PartialEq, Eq)]
pub struct Submission {
    /// The country, trimmed.
    country: String,
    /// The session the submission was made in.
    generation: u64,
    /// The seat that submitted.
    seat: Seat,
}

impl Submission {
    /// The country to look up.
    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }

    /// The seat that submitted.
    #[must_use]
    pub const fn seat(&self) -> Seat {
        self.seat
    }
}

/// Everything that can stop a turn from scoring.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The country does not start with the last letter of the previous one.
    #[error("{country} must start with the last letter of {previous}. You lose a point.")]
    BrokenChain {
        /// The rejected submission.
        country: String,
        /// The last accepted country.
        previous: String,
    },
    /// The country input was blank.
    #[error("Please enter a country name.")]
    EmptyCountry,
    /// A lookup for this session has not come back yet.
    #[error("Still looking up {0}; wait for it before submitting again.")]
    InFlight(String),
    /// The lookup failed before it could answer.
    #[error("An error occurred looking up the country ({0}). Please try again.")]
    Lookup(#[source] GeocodeError),
    /// A player name was blank.
    #[error("Please enter names for both players.")]
    MissingPlayers,
    /// No session has been started yet.
    #[error("No game is running; start one first.")]
    NoSession,
    /// The geocoder found no such country.
    #[error("{0} was not found. You lose a point.")]
    NotFound(String),
    /// The lookup belongs to a session that has since been replaced.
    #[error("That answer belongs to a game that is no longer running.")]
    StaleSubmission,
}

impl TurnError {
    /// Whether the player was docked a point for it.
    #[must_use]
    pub const fn is_penalty(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::RuleViolation)
    }

    /// Which family the error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match *self {
            Self::BrokenChain { .. } => ErrorKind::RuleViolation,
            Self::Lookup(_) => ErrorKind::Transport,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::EmptyCountry
            | Self::InFlight(_)
            | Self::MissingPlayers
            | Self::NoSession
            | Self::StaleSubmission => ErrorKind::Validation,
        }
    }
}

/// Passes the turn and resets the turn line and the input for the next player.
fn advance<V: View>(session: &mut Session, view: &mut V) {
    let seat = session.switch_turn();
    debug!(player = session.player(seat), "turn passes");
    view.set_turn_text(&session.turn_text());
    view.clear_entry_input();
}

/// Whether `country` may follow `previous`: its first letter has to be the last letter of
/// `previous`, ignoring case.
#[must_use]
pub fn chains_onto(previous: &str, country: &str) -> bool {
    match (previous.chars().next_back(), country.chars().next()) {
        (Some(last), Some(first)) => last.to_lowercase().eq(first.to_lowercase()),
        _ => false,
    }
}

/// Records a rejected entry for the current player and docks them a point.
fn penalize<V: View>(session: &mut Session, view: &mut V, country: &str) {
    let seat = session.current;
    let entry = session.record(seat, country, false);
    view.append_history_row(&entry);
    session.subtract_score(seat);
    view.render_scores(session.players(), session.scores());
}

/// Shows `err` to the players and passes it on.
fn report<V: View>(view: &mut V, err: TurnError) -> TurnError {
    view.alert(&err.to_string());
    err
}
