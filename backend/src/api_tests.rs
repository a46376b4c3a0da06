use crate::api::{DestinationId, GroupId, TripRefId, UserId};
use std::str::FromStr;

#[test]
fn test_user_id_new() {
    let id = UserId::new(42);
    assert_eq!(id.value(), 42);
}

#[test]
fn test_group_id_ordering() {
    assert!(GroupId::new(1) < GroupId::new(2));
}

#[test]
fn test_destination_id_from_str_trims() {
    assert_eq!(DestinationId::from_str(" 17 ").unwrap(), DestinationId(17));
    assert!(DestinationId::from_str("abc").is_err());
}

#[test]
fn test_ids_serialize_as_bare_numbers() {
    let json = serde_json::to_string(&TripRefId::new(9)).unwrap();
    assert_eq!(json, "9");
    let back: TripRefId = serde_json::from_str("9").unwrap();
    assert_eq!(back, TripRefId(9));
}

#[test]
fn test_id_display_and_conversion() {
    let id: UserId = 5.into();
    assert_eq!(id.to_string(), "5");
    let raw: i64 = id.into();
    assert_eq!(raw, 5);
}
