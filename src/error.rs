use thiserror::Error;

/// Errors raised by the map adapter and the geo providers behind it.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("user position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("map initialisation failed: {0}")]
    InitFailed(String),

    #[error("no match for address '{0}'")]
    NoMatch(String),

    #[error("geocoder returned invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Dialog input that cannot be saved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill out all fields.")]
    MissingFields,

    #[error("Rating must be between 1 and 5")]
    RateOutOfRange,
}

/// What went wrong during a user interaction; each kind maps to the transient
/// message shown in the status line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    #[error("Cannot get your position")]
    PositionUnavailable,

    #[error("Cannot init map")]
    MapInit,

    #[error("Cannot lookup address")]
    Geocode,

    #[error("{0}")]
    StoreRead(&'static str),

    #[error("{0}")]
    StoreWrite(&'static str),

    #[error("{0}")]
    Validation(ValidationError),
}

impl Failure {
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::PositionUnavailable => "position-unavailable",
            Failure::MapInit => "map-init-failure",
            Failure::Geocode => "geocode-failure",
            Failure::StoreRead(_) => "store-read-failure",
            Failure::StoreWrite(_) => "store-write-failure",
            Failure::Validation(_) => "validation-failure",
        }
    }
}
