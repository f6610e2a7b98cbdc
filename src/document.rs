//! Flat JSON documents emitted once per poll.
//!
//! Field declaration order is the serialized key order.

use serde::Serialize;

/// The single document produced by a successful poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputDocument {
    TripUpdate(TripUpdateDocument),
    VehiclePosition(VehiclePositionDocument),
}

impl OutputDocument {
    /// Renders the document the way it is delivered downstream.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn shape(&self) -> &'static str {
        match self {
            OutputDocument::TripUpdate(_) => "trip_update",
            OutputDocument::VehiclePosition(_) => "vehicle_position",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripUpdateDocument {
    pub trip_id: String,
    pub route_id: String,
    pub direction_id: u32,
    pub schedule: &'static str,
    pub date: String,
    pub time: String,
    pub no_stop_updates: usize,
    pub trip_delay: i32,
    pub trip_timestamp: u64,
    pub stop_time_updates: Vec<StopTimeUpdateDocument>,
}

/// One stop of a trip update. `arrival_time` and `departure_time` are in
/// milliseconds; the delays stay in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTimeUpdateDocument {
    pub stop_id: String,
    pub stop_sequence: u32,
    pub schedule: &'static str,
    pub arrival_time: i64,
    pub arrival_delay: i32,
    pub departure_time: i64,
    pub departure_delay: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePositionDocument {
    pub trip_id: String,
    pub route_id: String,
    pub direction_id: u32,
    pub current_stop_sequence: u32,
    pub current_status: &'static str,
    pub timestamp: u64,
    pub stop_id: String,
    pub vehicle_id: String,
    pub vehicle_label: String,
    pub vehicle_license_plate: String,
    pub occupancy_status: &'static str,
    pub lat: f32,
    pub lon: f32,
    pub bearing: f32,
}
