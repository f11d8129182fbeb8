use thiserror::Error;


/// Errors raised while importing a waypoint document
/// An unreachable destination or an unresolvable reference is a normal
/// outcome, not an error - neither appears here
#[derive(Debug, Error)]
pub enum UploadError {
    /// Document is not valid JSON or does not match the expected shape
    #[error("invalid waypoint document: {0}")]
    Json(#[from] serde_json::Error),

    /// Two waypoints inside one document share an id - nothing is imported
    #[error("duplicate waypoint id in document: {0}")]
    DuplicateId(String),

    /// Incoming waypoints collide with ids already in the store - nothing is merged
    #[error("waypoint ids already present in store: {}", .0.join(", "))]
    IdCollision(Vec<String>),
}

/// Errors from store mutations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation referenced an id that is not in the store
    #[error("no waypoint with id: {0}")]
    UnknownWaypoint(String),

    /// Insert would overwrite a waypoint that already exists
    #[error("waypoint id already in use: {0}")]
    IdInUse(String),
}
