//! Waypoint route planning modules
//!
//! Turns a set of named 3d waypoints - optionally linked in teleport
//! pairs that cost nothing to traverse - into a weighted undirected
//! graph, finds the cheapest route between a selected source and
//! destination, and round-trips the whole set through a portable JSON
//! document.
//!
//! The pieces line up as a pipeline: [`wire`] deserializes uploads into
//! the [`waypoint::WaypointStore`], [`graph`] builds the weighted graph,
//! [`route`] runs the shortest-path search over it, and [`wire`]
//! serializes the store back out for download. All of it is synchronous
//! and pure - state lives in the store the caller owns.

mod collections;
pub mod errors;
pub mod geometry;
pub mod graph;
pub mod graph_algos;
pub mod notify;
pub mod route;
pub mod waypoint;
pub mod wire;
