//! Protobuf parser for GTFS Realtime feeds.

use prost::Message;

use crate::error::PollError;
use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// prost does not enforce proto2 `required` fields, so a message without a
/// header version (which includes an empty payload) is rejected here.
///
/// # Errors
///
/// Returns [`PollError::Decode`] if the bytes are not valid protobuf for a
/// `FeedMessage`, or [`PollError::MissingField`] if the required header
/// version is absent.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, PollError> {
    let feed = FeedMessage::decode(bytes)?;

    if feed.header.gtfs_realtime_version.is_empty() {
        return Err(PollError::MissingField("header.gtfs_realtime_version"));
    }

    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::{FeedEntity, FeedHeader, TripDescriptor, TripUpdate};

    fn minimal_header() -> FeedHeader {
        FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1234567890),
            incrementality: None,
            feed_version: None,
        }
    }

    #[test]
    fn test_parse_empty_bytes_is_missing_header() {
        let result = parse_feed(&[]);
        assert!(matches!(
            result,
            Err(PollError::MissingField("header.gtfs_realtime_version"))
        ));
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
        let result = parse_feed(&invalid_bytes);
        assert!(matches!(result, Err(PollError::Decode(_))));
    }

    #[test]
    fn test_parse_valid_minimal_feed() {
        let feed = FeedMessage {
            header: minimal_header(),
            entity: vec![],
        };
        let encoded = feed.encode_to_vec();
        let parsed = parse_feed(&encoded).unwrap();

        assert_eq!(parsed.header.gtfs_realtime_version, "2.0");
        assert_eq!(parsed.header.timestamp, Some(1234567890));
        assert!(parsed.entity.is_empty());
    }

    #[test]
    fn test_parse_truncated_mid_record() {
        let feed = FeedMessage {
            header: minimal_header(),
            entity: vec![FeedEntity {
                id: "e1".to_string(),
                trip_update: Some(TripUpdate {
                    trip: TripDescriptor {
                        trip_id: Some("T1".to_string()),
                        route_id: Some("R1".to_string()),
                        ..Default::default()
                    },
                    delay: Some(30),
                    ..Default::default()
                }),
                ..Default::default()
            }],
        };
        let encoded = feed.encode_to_vec();
        let truncated = &encoded[..encoded.len() - 3];

        let result = parse_feed(truncated);
        assert!(matches!(result, Err(PollError::Decode(_))));
    }
}
