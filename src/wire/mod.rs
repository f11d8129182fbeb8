use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::UploadError;
use crate::notify::{Notify, Severity};
use crate::waypoint::{Waypoint, WaypointStore};


/// File name of a downloaded waypoint document
pub const DOWNLOAD_FILE_NAME: &str = "waypoints.json";

/// Top-level shape of the portable waypoint file
/// Waypoint records reuse the in-memory [`Waypoint`] shape - connections
/// are ids on both sides of the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointDocument {
    pub created_time: DateTime<Utc>,
    pub modified_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub waypoints: Vec<Waypoint>,
}

/// What a successful merge changed
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Number of waypoints appended to the store
    pub added: usize,
    /// Source selection adopted from the document, when it resolved
    pub source: Option<String>,
    /// Destination selection adopted from the document, when it resolved
    pub destination: Option<String>,
}

/// Parse one uploaded file into a document
pub fn parse_document(text: &str) -> Result<WaypointDocument, UploadError> {
    Ok(serde_json::from_str(text)?)
}

/// Build waypoints out of a parsed document
///
/// First pass constructs every record and rejects the whole document on
/// a duplicate id. Second pass resolves connection references against
/// the document's own ids; a reference that does not resolve is logged
/// and left unset rather than aborting the import.
pub fn deserialize_waypoints(document: &WaypointDocument) -> Result<Vec<Waypoint>, UploadError> {
    let mut ids: HashSet<&str> = HashSet::new();
    let mut results: Vec<Waypoint> = Vec::with_capacity(document.waypoints.len());
    for record in &document.waypoints {
        if !ids.insert(record.id()) {
            return Err(UploadError::DuplicateId(record.id().to_string()));
        }
        let mut waypoint = record.clone();
        waypoint.connection = None; // resolved below, once all ids are known
        results.push(waypoint);
    }

    for (record, waypoint) in document.waypoints.iter().zip(results.iter_mut()) {
        let Some(target) = record.connection.as_deref() else {
            continue;
        };
        if ids.contains(target) {
            waypoint.connection = Some(target.to_string());
        } else {
            warn!(
                "connection [{target}] of waypoint [{}] is not in the document, leaving unset",
                record.id(),
            );
        }
    }

    Ok(results)
}

/// Merge a parsed document into the store, all or nothing
///
/// Id collisions between the document and the store reject the merge
/// wholesale. On success the document's timestamps always replace the
/// store's, and the document's source/destination selections are
/// resolved against the newly added waypoints - an id that does not
/// resolve is logged and the current selection left untouched.
pub fn merge_document(store: &mut WaypointStore, document: &WaypointDocument) -> Result<MergeOutcome, UploadError> {
    let incoming = deserialize_waypoints(document)?;
    let new_ids: Vec<String> = incoming.iter().map(|w| w.id().to_string()).collect();
    let added = store.merge(incoming)?;

    store.set_document_times(document.created_time, document.modified_time);

    let mut outcome = MergeOutcome { added, source: None, destination: None };

    if let Some(wanted) = document.source.as_deref() {
        if new_ids.iter().any(|id| id == wanted) && store.select_source(Some(wanted)).is_ok() {
            outcome.source = Some(wanted.to_string());
        } else {
            warn!("source id [{wanted}] not among uploaded waypoints, selection unchanged");
        }
    }
    if let Some(wanted) = document.destination.as_deref() {
        if new_ids.iter().any(|id| id == wanted) && store.select_destination(Some(wanted)).is_ok() {
            outcome.destination = Some(wanted.to_string());
        } else {
            warn!("destination id [{wanted}] not among uploaded waypoints, selection unchanged");
        }
    }

    Ok(outcome)
}

/// Parse and merge a batch of uploaded files
/// Each file stands alone: a failure is surfaced through the
/// notification sink and does not block the remaining files
/// Returns how many files merged
pub fn upload<'a, I>(store: &mut WaypointStore, files: I, notify: &dyn Notify) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let mut merged = 0;
    for text in files {
        match parse_document(text).and_then(|document| merge_document(store, &document)) {
            Ok(outcome) => {
                debug!("uploaded {} waypoints", outcome.added);
                notify.notify("Uploaded WayPoints", Severity::Success, None);
                merged += 1;
            }
            Err(err @ UploadError::IdCollision(_)) => {
                notify.notify(
                    "Failed to Upload WayPoints: Multiple WayPoints share same internal id",
                    Severity::Error,
                    Some(&err.to_string()),
                );
            }
            Err(err) => {
                notify.notify("Failed to Upload WayPoints", Severity::Error, Some(&err.to_string()));
            }
        }
    }
    merged
}

/// Serialize the store to the portable document shape
/// Waypoint timestamps are emitted as stored; the document timestamps
/// fall back to `now` only when no upload ever supplied them
pub fn serialize_waypoints(store: &WaypointStore, now: DateTime<Utc>) -> WaypointDocument {
    WaypointDocument {
        created_time: store.created_time().unwrap_or(now),
        modified_time: store.modified_time().unwrap_or(now),
        source: store.source_id().map(str::to_string),
        destination: store.destination_id().map(str::to_string),
        waypoints: store.iter().cloned().collect(),
    }
}

/// Pretty-printed download payload plus its fixed file name
/// Serializing plain data does not fail in practice; guarded anyway so
/// an export can never take the tool down
pub fn download(store: &WaypointStore, now: DateTime<Utc>, notify: &dyn Notify) -> Option<(String, &'static str)> {
    let document = serialize_waypoints(store, now);
    match serde_json::to_string_pretty(&document) {
        Ok(text) => {
            notify.notify("Downloaded WayPoints", Severity::Success, None);
            Some((text, DOWNLOAD_FILE_NAME))
        }
        Err(err) => {
            notify.notify("Failed to Download WayPoints", Severity::Error, Some(&err.to_string()));
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::waypoint::{Position, WaypointData, WaypointOrigin};
    use chrono::TimeZone;
    use std::cell::RefCell;

    /// Test sink capturing every notification
    #[derive(Default)]
    struct RecordingNotify {
        messages: RefCell<Vec<(String, Severity)>>,
    }

    impl Notify for RecordingNotify {
        fn notify(&self, message: &str, severity: Severity, _detail: Option<&str>) {
            self.messages.borrow_mut().push((message.to_string(), severity));
        }
    }

    impl RecordingNotify {
        fn severities(&self) -> Vec<Severity> {
            self.messages.borrow().iter().map(|(_, s)| *s).collect()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn waypoint(id: &str, x: f64, height: f64, y: f64) -> Waypoint {
        Waypoint {
            data: WaypointData {
                id: id.to_string(),
                label: id.to_uppercase(),
                height,
                created_time: now(),
                modified_time: now(),
                origin: WaypointOrigin::Browser,
                pinned: None,
                color: None,
                icon: None,
            },
            position: Position { x, y },
            connection: None,
        }
    }

    fn document(waypoints: Vec<Waypoint>) -> WaypointDocument {
        WaypointDocument {
            created_time: now(),
            modified_time: now(),
            source: None,
            destination: None,
            waypoints,
        }
    }

    #[test]
    fn test_parse_document_wire_shape() {
        let text = r#"{
            "createdTime": "2024-01-02T03:04:05Z",
            "modifiedTime": "2024-01-02T03:04:05Z",
            "source": "home",
            "waypoints": [
                {
                    "data": {
                        "id": "home",
                        "label": "Home Base",
                        "height": 64.0,
                        "createdTime": "2024-01-01T00:00:00Z",
                        "modifiedTime": "2024-01-01T00:00:00Z",
                        "origin": "browser",
                        "pinned": true,
                        "color": "blue"
                    },
                    "position": { "x": 12.5, "y": -3.0 },
                    "connection": "mine"
                },
                {
                    "data": {
                        "id": "mine",
                        "label": "Copper Mine",
                        "height": -20.0,
                        "createdTime": "2024-01-01T00:00:00Z",
                        "modifiedTime": "2024-01-01T00:00:00Z",
                        "origin": "browser"
                    },
                    "position": { "x": 100.0, "y": 200.0 }
                }
            ]
        }"#;

        let document = parse_document(text).unwrap();
        assert_eq!(document.source.as_deref(), Some("home"));
        assert_eq!(document.destination, None);
        assert_eq!(document.waypoints.len(), 2);

        let home = &document.waypoints[0];
        assert_eq!(home.data.label, "Home Base");
        assert_eq!(home.data.pinned, Some(true));
        assert_eq!(home.data.color.as_deref(), Some("blue"));
        assert_eq!(home.data.icon, None);
        assert_eq!(home.position.x, 12.5);
        assert_eq!(home.connection.as_deref(), Some("mine"));
    }

    #[test]
    fn test_parse_document_rejects_bad_json() {
        assert!(matches!(parse_document("not json at all"), Err(UploadError::Json(_))));
        // schema mismatch: waypoints must be an array
        assert!(matches!(
            parse_document(r#"{"createdTime": "2024-01-01T00:00:00Z", "modifiedTime": "2024-01-01T00:00:00Z", "waypoints": 7}"#),
            Err(UploadError::Json(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_duplicate_ids_wholesale() {
        let result = deserialize_waypoints(&document(vec![
            waypoint("a", 0.0, 0.0, 0.0),
            waypoint("b", 1.0, 0.0, 0.0),
            waypoint("a", 2.0, 0.0, 0.0),
        ]));
        assert!(matches!(result, Err(UploadError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn test_deserialize_drops_unresolvable_connection() {
        let mut a = waypoint("a", 0.0, 0.0, 0.0);
        let mut b = waypoint("b", 1.0, 0.0, 0.0);
        a.connection = Some("b".to_string());
        b.connection = Some("ghost".to_string());

        let waypoints = deserialize_waypoints(&document(vec![a, b])).unwrap();
        assert_eq!(waypoints[0].connection.as_deref(), Some("b"));
        // unresolvable reference is non-fatal, just unset
        assert_eq!(waypoints[1].connection, None);
    }

    #[test]
    fn test_merge_adopts_timestamps_and_selections() {
        let mut store = WaypointStore::new();
        let mut doc = document(vec![waypoint("a", 0.0, 0.0, 0.0), waypoint("b", 3.0, 0.0, 4.0)]);
        doc.source = Some("a".to_string());
        doc.destination = Some("b".to_string());

        let outcome = merge_document(&mut store, &doc).unwrap();

        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.source.as_deref(), Some("a"));
        assert_eq!(outcome.destination.as_deref(), Some("b"));
        assert_eq!(store.created_time(), Some(now()));
        assert_eq!(store.modified_time(), Some(now()));
        assert_eq!(store.source().unwrap().id(), "a");
        assert_eq!(store.destination().unwrap().id(), "b");
    }

    #[test]
    fn test_merge_always_replaces_document_timestamps() {
        let mut store = WaypointStore::new();
        store.set_document_times(now(), now());

        let newer = Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap();
        let mut doc = document(vec![waypoint("a", 0.0, 0.0, 0.0)]);
        doc.created_time = newer;
        doc.modified_time = newer;

        merge_document(&mut store, &doc).unwrap();

        // a successful parse adopts the uploaded timestamps unconditionally
        assert_eq!(store.created_time(), Some(newer));
        assert_eq!(store.modified_time(), Some(newer));
    }

    #[test]
    fn test_merge_unresolved_selection_is_non_fatal() {
        let mut store = WaypointStore::new();
        store.insert(waypoint("old", 0.0, 0.0, 0.0)).unwrap();
        store.select_source(Some("old")).unwrap();

        let mut doc = document(vec![waypoint("a", 0.0, 0.0, 0.0)]);
        doc.source = Some("ghost".to_string());
        // the document may not select waypoints it did not carry
        doc.destination = Some("old".to_string());

        let outcome = merge_document(&mut store, &doc).unwrap();
        assert_eq!(outcome.source, None);
        assert_eq!(outcome.destination, None);
        // prior selection untouched
        assert_eq!(store.source().unwrap().id(), "old");
        assert!(store.destination().is_none());
    }

    #[test]
    fn test_merge_collision_rejects_whole_document() {
        let mut store = WaypointStore::new();
        store.insert(waypoint("a", 0.0, 0.0, 0.0)).unwrap();

        let doc = document(vec![waypoint("fresh", 1.0, 0.0, 0.0), waypoint("a", 2.0, 0.0, 0.0)]);
        let result = merge_document(&mut store, &doc);

        assert!(matches!(result, Err(UploadError::IdCollision(ids)) if ids == vec!["a"]));
        assert_eq!(store.len(), 1);
        assert!(store.get("fresh").is_none());
        // timestamps not adopted from a rejected document
        assert_eq!(store.created_time(), None);
    }

    #[test]
    fn test_upload_bad_file_does_not_block_others() {
        let mut store = WaypointStore::new();
        let notify = RecordingNotify::default();

        let good = serde_json::to_string(&document(vec![waypoint("a", 0.0, 0.0, 0.0)])).unwrap();
        let merged = upload(&mut store, ["{broken", good.as_str()], &notify);

        assert_eq!(merged, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(notify.severities(), vec![Severity::Error, Severity::Success]);
    }

    #[test]
    fn test_upload_bad_json_leaves_state_unchanged() {
        let mut store = WaypointStore::new();
        let notify = RecordingNotify::default();

        let merged = upload(&mut store, ["definitely not json"], &notify);

        assert_eq!(merged, 0);
        assert!(store.is_empty());
        assert_eq!(notify.severities(), vec![Severity::Error]);
    }

    #[test]
    fn test_upload_duplicate_ids_imports_nothing() {
        let mut store = WaypointStore::new();
        let notify = RecordingNotify::default();

        let doc = document(vec![waypoint("dup", 0.0, 0.0, 0.0), waypoint("dup", 1.0, 0.0, 0.0)]);
        let text = serde_json::to_string(&doc).unwrap();
        let merged = upload(&mut store, [text.as_str()], &notify);

        assert_eq!(merged, 0);
        assert!(store.is_empty());
        assert_eq!(notify.severities(), vec![Severity::Error]);
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let mut store = WaypointStore::new();
        let mut a = waypoint("a", 0.5, 64.0, -12.0);
        let b = waypoint("b", 3.0, 0.0, 4.0);
        let c = waypoint("c", -7.0, 10.0, 9.0);
        a.connection = Some("c".to_string());
        store.merge(vec![a, b, c]).unwrap();
        store.select_source(Some("a")).unwrap();
        store.select_destination(Some("b")).unwrap();
        store.set_document_times(now(), now());

        let text = serde_json::to_string_pretty(&serialize_waypoints(&store, now())).unwrap();

        let mut restored = WaypointStore::new();
        let doc = parse_document(&text).unwrap();
        merge_document(&mut restored, &doc).unwrap();

        assert_eq!(restored.len(), store.len());
        for original in store.iter() {
            let copy = restored.get(original.id()).unwrap();
            assert_eq!(copy, original);
        }
        assert_eq!(restored.source_id(), Some("a"));
        assert_eq!(restored.destination_id(), Some("b"));
        assert_eq!(restored.created_time(), Some(now()));
    }

    #[test]
    fn test_round_trip_empty_store() {
        let store = WaypointStore::new();
        let text = serde_json::to_string(&serialize_waypoints(&store, now())).unwrap();

        let mut restored = WaypointStore::new();
        merge_document(&mut restored, &parse_document(&text).unwrap()).unwrap();
        assert!(restored.is_empty());
        assert!(restored.source_id().is_none());
    }

    #[test]
    fn test_serialize_emits_ids_not_objects() {
        let mut store = WaypointStore::new();
        let mut a = waypoint("a", 0.0, 0.0, 0.0);
        a.connection = Some("b".to_string());
        store.merge(vec![a, waypoint("b", 1.0, 0.0, 0.0)]).unwrap();
        store.select_source(Some("b")).unwrap();

        let value = serde_json::to_value(serialize_waypoints(&store, now())).unwrap();

        assert_eq!(value["source"], "b");
        assert_eq!(value.get("destination"), None);
        assert_eq!(value["waypoints"][0]["data"]["id"], "a");
        assert_eq!(value["waypoints"][0]["connection"], "b");
        // unset connection is omitted, not null
        assert_eq!(value["waypoints"][1].get("connection"), None);
    }

    #[test]
    fn test_download_is_pretty_printed() {
        let mut store = WaypointStore::new();
        store.insert(waypoint("a", 0.0, 0.0, 0.0)).unwrap();
        let notify = RecordingNotify::default();

        let (text, name) = download(&store, now(), &notify).unwrap();

        assert_eq!(name, "waypoints.json");
        assert!(text.contains('\n')); // pretty output, not a single line
        assert!(text.contains("\"createdTime\""));
        assert_eq!(notify.severities(), vec![Severity::Success]);
    }
}
