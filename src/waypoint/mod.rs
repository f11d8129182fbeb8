use std::fmt;

use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};

use crate::collections::FxIndexMap;
use crate::errors::{StoreError, UploadError};


/// Waypoint identifier, unique within a store
pub type WaypointId = String;

/// Where a waypoint came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointOrigin {
    Browser,
}

/// Map-plane coordinates of a waypoint
/// The third axis is stored separately as `height`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Descriptive fields of a waypoint
/// `pinned`/`color`/`icon` are passthrough fields from the wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointData {
    pub id: WaypointId,
    pub label: String,
    pub height: f64,
    pub created_time: DateTime<Utc>,
    pub modified_time: DateTime<Utc>,
    pub origin: WaypointOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A named 3d point with an optional teleport partner
/// `connection` holds the partner's id, never a reference - the store
/// resolves it on demand, so serialization is just the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub data: WaypointData,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<WaypointId>,
}

impl Waypoint {
    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// Spatial triple in axis order (x, height, y)
    pub fn triple(&self) -> (f64, f64, f64) {
        (self.position.x, self.data.height, self.position.y)
    }

    /// In-game chat command recreating this waypoint
    /// Unset passthrough fields take the import defaults
    pub fn command(&self) -> String {
        let icon = self.data.icon.as_deref().unwrap_or("circle");
        let color = self.data.color.as_deref().unwrap_or("red");
        let pinned = self.data.pinned.unwrap_or(false);
        format!(
            "/waypoint addati {} {} {} {} {} {} {}",
            icon, self.position.x, self.data.height, self.position.y, pinned, color, self.data.label,
        )
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.data.label, self.position.x, self.data.height, self.position.y,
        )
    }
}

/// Partial update applied by [`WaypointStore::edit`]
/// `connection` is two-level: `Some(None)` clears the link
#[derive(Debug, Default, Clone)]
pub struct WaypointEdit {
    pub label: Option<String>,
    pub position: Option<Position>,
    pub height: Option<f64>,
    pub connection: Option<Option<WaypointId>>,
}

/// The working collection of waypoints plus the source/destination
/// selections and the document-level timestamps
///
/// Every mutation leaves the store consistent: selections always refer
/// to waypoints in the store, and removing a waypoint clears both a
/// matching selection and any partner connection pointing at it.
#[derive(Debug, Default, Clone)]
pub struct WaypointStore {
    waypoints: FxIndexMap<WaypointId, Waypoint>,
    source: Option<WaypointId>,
    destination: Option<WaypointId>,
    created_time: Option<DateTime<Utc>>,
    modified_time: Option<DateTime<Utc>>,
}

impl WaypointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoints in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.values()
    }

    pub fn get(&self, id: &str) -> Option<&Waypoint> {
        self.waypoints.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.waypoints.contains_key(id)
    }

    /// Resolve a waypoint's teleport partner to a live reference
    pub fn connection_of(&self, id: &str) -> Option<&Waypoint> {
        let partner = self.waypoints.get(id)?.connection.as_deref()?;
        self.waypoints.get(partner)
    }

    pub fn source(&self) -> Option<&Waypoint> {
        self.source.as_deref().and_then(|id| self.waypoints.get(id))
    }

    pub fn destination(&self) -> Option<&Waypoint> {
        self.destination.as_deref().and_then(|id| self.waypoints.get(id))
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn destination_id(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created_time
    }

    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        self.modified_time
    }

    /// Adopt document-level timestamps from an uploaded file
    pub fn set_document_times(&mut self, created: DateTime<Utc>, modified: DateTime<Utc>) {
        self.created_time = Some(created);
        self.modified_time = Some(modified);
    }

    /// Create a waypoint with a fresh unique id and both timestamps set to `now`
    pub fn add(&mut self, label: impl Into<String>, position: Position, height: f64, now: DateTime<Utc>) -> &Waypoint {
        let mut id = self.fresh_id(now);
        while self.waypoints.contains_key(&id) {
            id = self.fresh_id(now);
        }

        let waypoint = Waypoint {
            data: WaypointData {
                id: id.clone(),
                label: label.into(),
                height,
                created_time: now,
                modified_time: now,
                origin: WaypointOrigin::Browser,
                pinned: None,
                color: None,
                icon: None,
            },
            position,
            connection: None,
        };
        self.waypoints.entry(id).or_insert(waypoint)
    }

    /// Insert an already-built waypoint, rejecting an id already in use
    pub fn insert(&mut self, waypoint: Waypoint) -> Result<(), StoreError> {
        if self.waypoints.contains_key(waypoint.id()) {
            return Err(StoreError::IdInUse(waypoint.id().to_string()));
        }
        self.waypoints.insert(waypoint.id().to_string(), waypoint);
        Ok(())
    }

    /// Append a batch of waypoints, all or nothing
    /// Any id already in the store (or repeated within the batch)
    /// rejects the whole merge, naming the conflicting ids
    pub fn merge(&mut self, incoming: Vec<Waypoint>) -> Result<usize, UploadError> {
        let mut seen: Vec<&str> = Vec::new();
        let mut conflicts: Vec<String> = Vec::new();
        for waypoint in &incoming {
            let id = waypoint.id();
            if self.waypoints.contains_key(id) || seen.contains(&id) {
                conflicts.push(id.to_string());
            }
            seen.push(id);
        }
        if !conflicts.is_empty() {
            return Err(UploadError::IdCollision(conflicts));
        }

        let count = incoming.len();
        for waypoint in incoming {
            self.waypoints.insert(waypoint.id().to_string(), waypoint);
        }
        Ok(count)
    }

    /// Apply a partial update and bump the modified timestamp
    /// A connection target must be a waypoint currently in the store
    pub fn edit(&mut self, id: &str, edit: WaypointEdit, now: DateTime<Utc>) -> Result<(), StoreError> {
        if !self.waypoints.contains_key(id) {
            return Err(StoreError::UnknownWaypoint(id.to_string()));
        }
        if let Some(Some(target)) = &edit.connection {
            if !self.waypoints.contains_key(target.as_str()) {
                return Err(StoreError::UnknownWaypoint(target.clone()));
            }
        }

        // checked above
        if let Some(waypoint) = self.waypoints.get_mut(id) {
            if let Some(label) = edit.label {
                waypoint.data.label = label;
            }
            if let Some(position) = edit.position {
                waypoint.position = position;
            }
            if let Some(height) = edit.height {
                waypoint.data.height = height;
            }
            if let Some(connection) = edit.connection {
                waypoint.connection = connection;
            }
            waypoint.data.modified_time = now;
        }
        Ok(())
    }

    /// Remove a waypoint, cascade-clearing a matching source/destination
    /// selection and any other waypoint's connection that pointed at it
    pub fn remove(&mut self, id: &str) -> Result<Waypoint, StoreError> {
        let removed = self
            .waypoints
            .shift_remove(id)
            .ok_or_else(|| StoreError::UnknownWaypoint(id.to_string()))?;

        if self.source.as_deref() == Some(id) {
            self.source = None;
        }
        if self.destination.as_deref() == Some(id) {
            self.destination = None;
        }
        for waypoint in self.waypoints.values_mut() {
            if waypoint.connection.as_deref() == Some(id) {
                waypoint.connection = None;
            }
        }
        Ok(removed)
    }

    /// Drop every waypoint and both selections
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.source = None;
        self.destination = None;
    }

    /// Select the routing source; `None` clears it
    pub fn select_source(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        self.source = self.checked_selection(id)?;
        Ok(())
    }

    /// Select the routing destination; `None` clears it
    pub fn select_destination(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        self.destination = self.checked_selection(id)?;
        Ok(())
    }

    fn checked_selection(&self, id: Option<&str>) -> Result<Option<WaypointId>, StoreError> {
        match id {
            Some(id) if !self.waypoints.contains_key(id) => {
                Err(StoreError::UnknownWaypoint(id.to_string()))
            }
            Some(id) => Ok(Some(id.to_string())),
            None => Ok(None),
        }
    }

    /// Id shape: new-<millis>-<count>-<random suffix>
    fn fresh_id(&self, now: DateTime<Utc>) -> WaypointId {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(7)
            .map(char::from)
            .collect();
        format!("new-{}-{}-{}", now.timestamp_millis(), self.waypoints.len(), suffix)
    }
}
