//! Status enums shared across layers, with Postgres enum mappings.

use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "user_role")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[postgres(name = "customer")]
    Customer,
    #[postgres(name = "owner")]
    Owner,
    #[postgres(name = "admin")]
    Admin,
}

impl Role {
    /// Lowercase wire form, also used inside identity tokens.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Owner => "owner",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer" => Some(Self::Customer),
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Whether a car is free to book or currently held by a confirmed
/// reservation. Maintained by the reservation engine, not by car CRUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "car_status")]
pub enum CarStatus {
    #[postgres(name = "Available")]
    Available,
    #[postgres(name = "Rented")]
    Rented,
}

/// Persisted reservation lifecycle states. "ongoing" is intentionally
/// absent: it is derived from `Confirmed` plus the current date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "reservation_status")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    #[postgres(name = "pending")]
    Pending,
    #[postgres(name = "confirmed")]
    Confirmed,
    #[postgres(name = "completed")]
    Completed,
    #[postgres(name = "cancelled")]
    Cancelled,
}

impl ReservationStatus {
    /// Completed and cancelled permit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Read-time reservation status as shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveStatus {
    Pending,
    Confirmed,
    Ongoing,
    Completed,
    Cancelled,
}

/// Payment attempt states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "payment_status")]
pub enum PaymentStatus {
    #[postgres(name = "Pending")]
    Pending,
    #[postgres(name = "Success")]
    Success,
    #[postgres(name = "Failed")]
    Failed,
}

/// Kind of entity a review points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "review_target")]
pub enum ReviewTarget {
    #[postgres(name = "Car")]
    Car,
    #[postgres(name = "User")]
    User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Customer, Role::Owner, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ReservationStatus::Completed.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(!ReservationStatus::Confirmed.is_terminal());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&ReservationStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let json = serde_json::to_string(&CarStatus::Available).unwrap();
        assert_eq!(json, "\"Available\"");
        let json = serde_json::to_string(&PaymentStatus::Success).unwrap();
        assert_eq!(json, "\"Success\"");
        let json = serde_json::to_string(&EffectiveStatus::Ongoing).unwrap();
        assert_eq!(json, "\"ongoing\"");
    }
}
