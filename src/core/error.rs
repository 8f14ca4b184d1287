use thiserror::Error;

/// Engine-level failure taxonomy. Everything that can go wrong inside the
/// planner, inventory or booking manager maps onto one of these; the HTTP
/// layer decides status codes from the variant.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested station pair is not served in boarding order by the
    /// train, or no itinerary exists at all.
    #[error("no route: {0}")]
    RouteNotFound(String),

    /// One or more requested seats are already held for an overlapping
    /// stop range. Carries every failing seat so the caller can offer
    /// alternatives. Nothing was reserved.
    #[error("seat(s) {seats:?} unavailable for the requested range")]
    SeatConflict { seats: Vec<u32> },

    /// A state transition that the booking lifecycle does not allow, e.g.
    /// cancelling an already-cancelled booking or unblocking a seat that
    /// carries no admin block.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Malformed reference data detected while loading a schedule. Fatal at
    /// load time; never reaches the planner.
    #[error("schedule integrity: {0}")]
    ScheduleIntegrity(String),

    /// A referenced entity (booking, train, station) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request failed boundary validation before touching any state.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
