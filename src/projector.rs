//! Projection of GTFS-RT entities into flat output documents.

use tracing::debug;

use crate::document::{
    OutputDocument, StopTimeUpdateDocument, TripUpdateDocument, VehiclePositionDocument,
};
use crate::error::PollError;
use crate::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
use crate::gtfs_rt::{
    FeedMessage, Position, TripDescriptor, TripUpdate, VehicleDescriptor, VehiclePosition,
};

const MILLIS_PER_SECOND: i64 = 1000;

/// Picks the first recognized entity in feed order and projects it.
///
/// Each entity is checked for a trip update first, then for a vehicle
/// position; the walk stops at the first hit. Every later entity is ignored,
/// so a feed should carry a single entity shape.
///
/// # Errors
///
/// Returns [`PollError::UnsupportedContent`] if no entity carries either
/// payload.
pub fn select_and_project(feed: &FeedMessage) -> Result<OutputDocument, PollError> {
    for entity in &feed.entity {
        if let Some(trip_update) = &entity.trip_update {
            debug!(entity_id = %entity.id, "Projecting trip update");
            return Ok(OutputDocument::TripUpdate(project_trip_update(trip_update)));
        }

        if let Some(vehicle) = &entity.vehicle {
            debug!(entity_id = %entity.id, "Projecting vehicle position");
            return Ok(OutputDocument::VehiclePosition(project_vehicle_position(
                vehicle,
            )));
        }
    }

    Err(PollError::UnsupportedContent {
        entities: feed.entity.len(),
    })
}

/// Projects a trip update. Absent fields take their schema defaults.
pub fn project_trip_update(trip_update: &TripUpdate) -> TripUpdateDocument {
    let trip = &trip_update.trip;

    let stop_time_updates: Vec<StopTimeUpdateDocument> = trip_update
        .stop_time_update
        .iter()
        .map(project_stop_time_update)
        .collect();

    TripUpdateDocument {
        trip_id: trip.trip_id().to_string(),
        route_id: trip.route_id().to_string(),
        direction_id: trip.direction_id(),
        schedule: trip.schedule_relationship().as_str_name(),
        date: trip.start_date().to_string(),
        time: trip.start_time().to_string(),
        no_stop_updates: stop_time_updates.len(),
        trip_delay: trip_update.delay(),
        trip_timestamp: trip_update.timestamp(),
        stop_time_updates,
    }
}

fn project_stop_time_update(update: &StopTimeUpdate) -> StopTimeUpdateDocument {
    let no_event = StopTimeEvent::default();
    let arrival = update.arrival.as_ref().unwrap_or(&no_event);
    let departure = update.departure.as_ref().unwrap_or(&no_event);

    StopTimeUpdateDocument {
        stop_id: update.stop_id().to_string(),
        stop_sequence: update.stop_sequence(),
        schedule: update.schedule_relationship().as_str_name(),
        arrival_time: arrival.time().wrapping_mul(MILLIS_PER_SECOND),
        arrival_delay: arrival.delay(),
        departure_time: departure.time().wrapping_mul(MILLIS_PER_SECOND),
        departure_delay: departure.delay(),
    }
}

/// Projects a vehicle position with no unit conversion.
pub fn project_vehicle_position(vehicle_position: &VehiclePosition) -> VehiclePositionDocument {
    let no_trip = TripDescriptor::default();
    let no_vehicle = VehicleDescriptor::default();
    let no_position = Position::default();

    let trip = vehicle_position.trip.as_ref().unwrap_or(&no_trip);
    let vehicle = vehicle_position.vehicle.as_ref().unwrap_or(&no_vehicle);
    let position = vehicle_position.position.as_ref().unwrap_or(&no_position);

    VehiclePositionDocument {
        trip_id: trip.trip_id().to_string(),
        route_id: trip.route_id().to_string(),
        direction_id: trip.direction_id(),
        current_stop_sequence: vehicle_position.current_stop_sequence(),
        current_status: vehicle_position.current_status().as_str_name(),
        timestamp: vehicle_position.timestamp(),
        stop_id: vehicle_position.stop_id().to_string(),
        vehicle_id: vehicle.id().to_string(),
        vehicle_label: vehicle.label().to_string(),
        vehicle_license_plate: vehicle.license_plate().to_string(),
        occupancy_status: vehicle_position.occupancy_status().as_str_name(),
        lat: position.latitude,
        lon: position.longitude,
        bearing: position.bearing(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::trip_descriptor::ScheduleRelationship as TripSchedule;
    use crate::gtfs_rt::trip_update::stop_time_update::ScheduleRelationship as StopSchedule;
    use crate::gtfs_rt::vehicle_position::{OccupancyStatus, VehicleStopStatus};
    use crate::gtfs_rt::{Alert, FeedEntity, FeedHeader};

    fn header() -> FeedHeader {
        FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1700000000),
            ..Default::default()
        }
    }

    fn feed(entity: Vec<FeedEntity>) -> FeedMessage {
        FeedMessage {
            header: header(),
            entity,
        }
    }

    fn stop(stop_id: &str, sequence: u32, arrival: (i64, i32), departure: (i64, i32)) -> StopTimeUpdate {
        StopTimeUpdate {
            stop_id: Some(stop_id.to_string()),
            stop_sequence: Some(sequence),
            schedule_relationship: Some(StopSchedule::Scheduled as i32),
            arrival: Some(StopTimeEvent {
                time: Some(arrival.0),
                delay: Some(arrival.1),
                ..Default::default()
            }),
            departure: Some(StopTimeEvent {
                time: Some(departure.0),
                delay: Some(departure.1),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn trip_update_t1() -> TripUpdate {
        TripUpdate {
            trip: TripDescriptor {
                trip_id: Some("T1".to_string()),
                route_id: Some("R1".to_string()),
                direction_id: Some(0),
                schedule_relationship: Some(TripSchedule::Scheduled as i32),
                start_date: Some("20240101".to_string()),
                start_time: Some("08:00:00".to_string()),
                ..Default::default()
            },
            delay: Some(30),
            timestamp: Some(1700000000),
            stop_time_update: vec![stop("S1", 1, (1700000100, 10), (1700000130, 15))],
            ..Default::default()
        }
    }

    fn vehicle_v9() -> VehiclePosition {
        VehiclePosition {
            trip: Some(TripDescriptor {
                trip_id: Some("T9".to_string()),
                route_id: Some("R9".to_string()),
                direction_id: Some(1),
                ..Default::default()
            }),
            vehicle: Some(VehicleDescriptor {
                id: Some("V9".to_string()),
                label: Some("Bus9".to_string()),
                license_plate: Some("KA01".to_string()),
                ..Default::default()
            }),
            position: Some(Position {
                latitude: 12.34,
                longitude: 56.78,
                bearing: Some(90.0),
                ..Default::default()
            }),
            current_stop_sequence: Some(7),
            stop_id: Some("S7".to_string()),
            current_status: Some(VehicleStopStatus::StoppedAt as i32),
            timestamp: Some(1700000200),
            occupancy_status: Some(OccupancyStatus::ManySeatsAvailable as i32),
            ..Default::default()
        }
    }

    fn trip_entity(id: &str, trip_update: TripUpdate) -> FeedEntity {
        FeedEntity {
            id: id.to_string(),
            trip_update: Some(trip_update),
            ..Default::default()
        }
    }

    fn vehicle_entity(id: &str, vehicle: VehiclePosition) -> FeedEntity {
        FeedEntity {
            id: id.to_string(),
            vehicle: Some(vehicle),
            ..Default::default()
        }
    }

    #[test]
    fn test_trip_update_scenario() {
        let doc = project_trip_update(&trip_update_t1());

        assert_eq!(doc.trip_id, "T1");
        assert_eq!(doc.route_id, "R1");
        assert_eq!(doc.direction_id, 0);
        assert_eq!(doc.schedule, "SCHEDULED");
        assert_eq!(doc.date, "20240101");
        assert_eq!(doc.time, "08:00:00");
        assert_eq!(doc.trip_delay, 30);
        assert_eq!(doc.trip_timestamp, 1700000000);
        assert_eq!(doc.no_stop_updates, 1);

        let stop = &doc.stop_time_updates[0];
        assert_eq!(stop.stop_id, "S1");
        assert_eq!(stop.stop_sequence, 1);
        assert_eq!(stop.schedule, "SCHEDULED");
        assert_eq!(stop.arrival_time, 1700000100000);
        assert_eq!(stop.arrival_delay, 10);
        assert_eq!(stop.departure_time, 1700000130000);
        assert_eq!(stop.departure_delay, 15);
    }

    #[test]
    fn test_stop_count_matches_updates() {
        let mut trip_update = trip_update_t1();
        trip_update.stop_time_update.push(stop("S2", 2, (1700000400, -5), (1700000420, 0)));
        trip_update.stop_time_update.push(StopTimeUpdate {
            stop_id: Some("S3".to_string()),
            stop_sequence: Some(3),
            schedule_relationship: Some(StopSchedule::Skipped as i32),
            ..Default::default()
        });

        let doc = project_trip_update(&trip_update);

        assert_eq!(doc.no_stop_updates, 3);
        assert_eq!(doc.stop_time_updates.len(), doc.no_stop_updates);
        let ids: Vec<&str> = doc.stop_time_updates.iter().map(|s| s.stop_id.as_str()).collect();
        assert_eq!(ids, ["S1", "S2", "S3"]);

        // times scale to milliseconds, delays stay in seconds
        assert_eq!(doc.stop_time_updates[1].arrival_time, 1700000400 * 1000);
        assert_eq!(doc.stop_time_updates[1].arrival_delay, -5);

        let skipped = &doc.stop_time_updates[2];
        assert_eq!(skipped.schedule, "SKIPPED");
        assert_eq!(skipped.arrival_time, 0);
        assert_eq!(skipped.departure_delay, 0);
    }

    #[test]
    fn test_vehicle_scenario() {
        let doc = project_vehicle_position(&vehicle_v9());

        assert_eq!(doc.trip_id, "T9");
        assert_eq!(doc.route_id, "R9");
        assert_eq!(doc.direction_id, 1);
        assert_eq!(doc.current_stop_sequence, 7);
        assert_eq!(doc.current_status, "STOPPED_AT");
        assert_eq!(doc.timestamp, 1700000200);
        assert_eq!(doc.stop_id, "S7");
        assert_eq!(doc.vehicle_id, "V9");
        assert_eq!(doc.vehicle_label, "Bus9");
        assert_eq!(doc.vehicle_license_plate, "KA01");
        assert_eq!(doc.occupancy_status, "MANY_SEATS_AVAILABLE");
        assert_eq!(doc.lat, 12.34);
        assert_eq!(doc.lon, 56.78);
        assert_eq!(doc.bearing, 90.0);
    }

    #[test]
    fn test_empty_payloads_use_schema_defaults() {
        let trip = project_trip_update(&TripUpdate::default());
        assert_eq!(trip.trip_id, "");
        assert_eq!(trip.schedule, "SCHEDULED");
        assert_eq!(trip.trip_delay, 0);
        assert_eq!(trip.no_stop_updates, 0);

        let vehicle = project_vehicle_position(&VehiclePosition::default());
        assert_eq!(vehicle.vehicle_id, "");
        assert_eq!(vehicle.current_status, "IN_TRANSIT_TO");
        assert_eq!(vehicle.occupancy_status, "EMPTY");
        assert_eq!(vehicle.lat, 0.0);
        assert_eq!(vehicle.bearing, 0.0);
    }

    #[test]
    fn test_trip_update_first_wins() {
        let feed = feed(vec![
            trip_entity("tu", trip_update_t1()),
            vehicle_entity("vp", vehicle_v9()),
        ]);

        let doc = select_and_project(&feed).unwrap();
        assert!(matches!(doc, OutputDocument::TripUpdate(ref t) if t.trip_id == "T1"));
    }

    #[test]
    fn test_vehicle_first_wins() {
        let feed = feed(vec![
            vehicle_entity("vp", vehicle_v9()),
            trip_entity("tu", trip_update_t1()),
        ]);

        let doc = select_and_project(&feed).unwrap();
        assert!(matches!(doc, OutputDocument::VehiclePosition(ref v) if v.vehicle_id == "V9"));
    }

    #[test]
    fn test_later_trip_updates_are_ignored() {
        let mut second = trip_update_t1();
        second.trip.trip_id = Some("T2".to_string());
        let feed = feed(vec![
            trip_entity("a", trip_update_t1()),
            trip_entity("b", second),
        ]);

        match select_and_project(&feed).unwrap() {
            OutputDocument::TripUpdate(doc) => assert_eq!(doc.trip_id, "T1"),
            other => panic!("expected trip update, got {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_entities_are_skipped() {
        let feed = feed(vec![
            FeedEntity {
                id: "alert".to_string(),
                alert: Some(Alert::default()),
                ..Default::default()
            },
            vehicle_entity("vp", vehicle_v9()),
        ]);

        let doc = select_and_project(&feed).unwrap();
        assert_eq!(doc.shape(), "vehicle_position");
    }

    #[test]
    fn test_no_recognized_entities() {
        let empty = feed(vec![]);
        assert!(matches!(
            select_and_project(&empty),
            Err(PollError::UnsupportedContent { entities: 0 })
        ));

        let alerts_only = feed(vec![FeedEntity {
            id: "alert".to_string(),
            alert: Some(Alert::default()),
            ..Default::default()
        }]);
        assert!(matches!(
            select_and_project(&alerts_only),
            Err(PollError::UnsupportedContent { entities: 1 })
        ));
    }
}
