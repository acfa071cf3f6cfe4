//! This module turns country names into coordinates.
//!
//! The controller only sees the [`Geocoder`] trait. The [`Nominatim`] type implements it against the
//! OpenStreetMap search API, which answers with a JSON array of places whose latitude and longitude
//! come back as decimal strings.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use ureq::Agent;

/// The public OpenStreetMap search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Nominatim refuses requests without an identifying user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("countries/", env!("CARGO_PKG_VERSION"));

/// A point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Degrees north of the equator; negative in the southern hemisphere.
    lat: f64,
    /// Degrees east of the prime meridian; negative in the western hemisphere.
    lon: f64,
}

impl Coordinates {
    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn lon(self) -> f64 {
        self.lon
    }

    /// Builds a point from already validated degrees. Out of range values are clamped onto the
    /// globe.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lon: lon.clamp(-180.0, 180.0),
        }
    }

    /// Parses the decimal strings a geocoder hands back.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Malformed`] if either value is not a finite number or falls outside
    /// the valid range for latitudes and longitudes.
    pub fn parse(lat: &str, lon: &str) -> Result<Self, GeocodeError> {
        let lat = parse_degrees(lat, 90.0)?;
        let lon = parse_degrees(lon, 180.0)?;

        Ok(Self { lat, lon })
    }
}

impl fmt::Display for Coordinates {
    #[expect(
        clippy::min_ident_chars,
        reason = "The formatter keeps the name the trait gives it."
    )]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.lat, self.lon)
    }
}

/// The ways a lookup can fail before it produces an answer. A lookup that succeeds but matches
/// nothing is not an error; it is `Ok(None)`.
///
/// The messages are plain text. Whoever shows them to the players decides how they look.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    /// The service rejected the query itself (HTTP 400).
    #[error("bad request")]
    BadRequest,
    /// The answer arrived but could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// Too many requests in a short time (HTTP 429).
    #[error("rate limited")]
    RateLimited,
    /// The service refused to answer, usually over its usage policy (HTTP 403).
    #[error("request refused")]
    Refused,
    /// Any other non-success status code.
    #[error("unexpected status code {0}")]
    Status(u16),
    /// No answer arrived before the configured timeout.
    #[error("timed out")]
    TimedOut,
    /// The request never completed: DNS, TLS, connection and similar failures.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The service is down or overloaded (HTTP 502, 503 and 504).
    #[error("service unavailable")]
    Unavailable,
}

impl From<ureq::Error> for GeocodeError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(400) => Self::BadRequest,
            ureq::Error::StatusCode(403) => Self::Refused,
            ureq::Error::StatusCode(429) => Self::RateLimited,
            ureq::Error::StatusCode(502..=504) => Self::Unavailable,
            ureq::Error::StatusCode(code) => Self::Status(code),
            ureq::Error::Timeout(_) => Self::TimedOut,
            ureq::Error::Json(err) => Self::Malformed(err.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Something that can place a country on the globe.
pub trait Geocoder {
    /// Looks up the best match for `country`.
    ///
    /// # Errors
    ///
    /// Returns a [`GeocodeError`] when the lookup itself fails. Finding no match is `Ok(None)`.
    fn lookup(&self, country: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

/// A [`Geocoder`] backed by a Nominatim search endpoint.
pub struct Nominatim {
    /// The HTTP agent, configured with the request timeout.
    agent: Agent,
    /// The search URL queries are sent to.
    endpoint: String,
    /// The value sent in the `User-Agent` header.
    user_agent: String,
}

impl Nominatim {
    /// Creates a client for `endpoint` whose requests give up after `timeout`.
    #[must_use]
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        Self {
            agent: Agent::new_with_config(config),
            endpoint: endpoint.to_owned(),
            user_agent: user_agent.to_owned(),
        }
    }
}

impl Geocoder for Nominatim {
    fn lookup(&self, country: &str) -> Result<Option<Coordinates>, GeocodeError> {
        debug!(endpoint = %self.endpoint, country, "searching for country");

        let response = self
            .agent
            .get(self.endpoint.as_str())
            .query("country", country)
            .query("format", "json")
            .query("limit", "1")
            .header("User-Agent", self.user_agent.as_str())
            .call()?;

        let places: Vec<Place> = response.into_body().read_json()?;
        debug!(country, matches = places.len(), "search answered");

        first_match(&places)
    }
}

/// This struct holds the only fields of a Nominatim search result the game cares about.
#[derive(Deserialize)]
struct Place {
    /// Latitude as a decimal string.
    lat: String,
    /// Longitude as a decimal string.
    lon: String,
}

/// Takes the best match out of a search response. Nominatim orders results by importance, so the
/// first place is the one to use.
fn first_match(places: &[Place]) -> Result<Option<Coordinates>, GeocodeError> {
    places
        .first()
        .map(|place| Coordinates::parse(&place.lat, &place.lon))
        .transpose()
}

/// Parses one coordinate component and checks it against `limit` in both directions.
fn parse_degrees(raw: &str, limit: f64) -> Result<f64, GeocodeError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|err| GeocodeError::Malformed(format!("{raw:?} is not a coordinate: {err}")))?;

    if value.is_finite() && (-limit..=limit).contains(&value) {
        Ok(value)
    } else {
        Err(GeocodeError::Malformed(format!(
            "{raw:?} is outside of -{limit}..={limit}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read as _, Write as _};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    const FRANCE: &str = r#"[{"place_id":123,"licence":"Data (c) OpenStreetMap contributors","osm_type":"relation","lat":"46.603354","lon":"1.8883335","class":"boundary","type":"administrative","display_name":"France","importance":0.97}]"#;

    /// Answers a single request on a local port with `body` and hands back the raw request head.
    fn serve_once(body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("a free local port");
        let address = listener.local_addr().expect("the port is bound");

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("the client connects");
            let mut head = Vec::new();
            let mut chunk = [0_u8; 1024];
            while !head.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = stream.read(&mut chunk).expect("the request arrives");
                if read == 0 {
                    break;
                }
                head.extend_from_slice(chunk.get(..read).unwrap_or_default());
            }

            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(reply.as_bytes())
                .expect("the reply is sent");

            String::from_utf8_lossy(&head).into_owned()
        });

        (format!("http://{address}/search"), server)
    }

    #[test]
    fn picks_the_first_place_of_a_search() {
        let places: Vec<Place> = serde_json::from_str(FRANCE).expect("sample should decode");
        let found = first_match(&places)
            .expect("coordinates should parse")
            .expect("one place was returned");

        assert!((found.lat() - 46.603_354).abs() < 1e-9, "latitude kept");
        assert!((found.lon() - 1.888_333_5).abs() < 1e-9, "longitude kept");
    }

    #[test]
    fn an_empty_search_is_not_an_error() {
        let places: Vec<Place> = serde_json::from_str("[]").expect("empty array should decode");

        assert_eq!(first_match(&places), Ok(None), "no match is Ok(None)");
    }

    #[test]
    fn garbage_coordinates_are_malformed() {
        let places: Vec<Place> = serde_json::from_str(r#"[{"lat":"north","lon":"2.35"}]"#)
            .expect("strings should decode");

        assert!(
            matches!(first_match(&places), Err(GeocodeError::Malformed(_))),
            "a non-numeric latitude is rejected"
        );
        assert!(
            matches!(Coordinates::parse("12", "200"), Err(GeocodeError::Malformed(_))),
            "a longitude past 180 is rejected"
        );
        assert!(
            matches!(Coordinates::parse("NaN", "0"), Err(GeocodeError::Malformed(_))),
            "NaN is rejected"
        );
    }

    #[test]
    fn status_codes_map_onto_error_variants() {
        let cases = [
            (400, GeocodeError::BadRequest),
            (403, GeocodeError::Refused),
            (429, GeocodeError::RateLimited),
            (503, GeocodeError::Unavailable),
            (418, GeocodeError::Status(418)),
        ];

        for (code, expected) in cases {
            assert_eq!(
                GeocodeError::from(ureq::Error::StatusCode(code)),
                expected,
                "status {code}"
            );
        }
    }

    #[test]
    fn error_messages_carry_no_terminal_styling() {
        let messages = [
            GeocodeError::BadRequest.to_string(),
            GeocodeError::TimedOut.to_string(),
            GeocodeError::Unavailable.to_string(),
        ];

        assert_eq!(messages, ["bad request", "timed out", "service unavailable"], "plain text");
    }

    #[test]
    fn coordinates_display_with_two_decimals() {
        assert_eq!(
            Coordinates::new(48.8566, 2.3522).to_string(),
            "(48.86, 2.35)",
            "rounded to two places"
        );
        assert_eq!(
            Coordinates::new(120.0, -300.0),
            Coordinates::new(90.0, -180.0),
            "clamped onto the globe"
        );
    }

    #[test]
    fn lookups_send_the_search_query_and_the_user_agent() {
        let (endpoint, server) = serve_once(FRANCE);
        let geocoder = Nominatim::new(&endpoint, "countries-test/1.0", Duration::from_secs(5));

        let found = geocoder.lookup("France").expect("the local server answers");
        let head = server.join().expect("the server thread finishes");
        let request_line = head.lines().next().unwrap_or_default();
        let lowered = head.to_lowercase();

        assert!(found.is_some(), "France is found");
        assert!(request_line.starts_with("GET /search?"), "a search GET: {request_line}");
        assert!(request_line.contains("country=France"), "the country: {request_line}");
        assert!(request_line.contains("format=json"), "JSON asked for: {request_line}");
        assert!(request_line.contains("limit=1"), "one result: {request_line}");
        assert!(
            lowered.contains("user-agent: countries-test/1.0"),
            "the configured user agent: {head}"
        );
    }
}
