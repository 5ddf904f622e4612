//! Domain entities and wire models for the car-rental marketplace.
//!
//! The structs here are the shared vocabulary of the repository, service and
//! HTTP layers: cars, reservations, payments, reviews and the user profiles
//! they reference. Booking arithmetic (day counting, pricing, interval
//! overlap, the derived "ongoing" label) lives in [`booking`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod booking;
pub mod status;

pub use booking::{billed_days, effective_status, intervals_overlap, rental_price};
pub use status::{
    CarStatus, EffectiveStatus, PaymentStatus, ReservationStatus, ReviewTarget, Role,
};

/// User profile as stored locally. Credentials and registration live in the
/// external identity system; this record only carries what the marketplace
/// itself needs (role, approval flag, contact data, optional home location).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_no: Option<String>,
    pub role: Role,
    pub is_approved: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Car listing. `status` is owned by the reservation engine: it must read
/// `Rented` exactly while a confirmed reservation holds the car.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub license_plate: Option<String>,
    /// Daily rate in minor currency units.
    pub daily_rate: i64,
    pub status: CarStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub seats: Option<i32>,
    pub mileage: Option<i32>,
    pub features: Option<String>,
    pub image_url: Option<String>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// A customer's claim on a car for a date range.
///
/// `total_amount` is derived at creation/update time, never user-supplied.
/// `status` only ever stores the four persisted states; "ongoing" is a
/// read-time label (see [`booking::effective_status`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub car_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Derived: `billed_days(start, end) * car.daily_rate`, minor units.
    pub total_amount: i64,
    pub status: ReservationStatus,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Wire representation with the date-derived status applied.
    pub fn view(&self, today: NaiveDate) -> ReservationView {
        ReservationView {
            id: self.id,
            car_id: self.car_id,
            user_id: self.user_id,
            start_date: self.start_date,
            end_date: self.end_date,
            total_amount: self.total_amount,
            status: effective_status(self.status, self.start_date, self.end_date, today),
            payment_id: self.payment_id,
            created_at: self.created_at,
        }
    }
}

/// Reservation as returned to clients: same fields, but the status is the
/// effective one ("ongoing" while a confirmed booking spans today).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    pub id: Uuid,
    pub car_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_amount: i64,
    pub status: EffectiveStatus,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One payment attempt against a reservation. Rows are never deleted; a
/// payment outlives a cancelled reservation for audit purposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub car_id: Uuid,
    pub user_id: Uuid,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    /// Gateway order reference, set at order creation.
    pub order_ref: String,
    /// Placeholder until verification stores the gateway payment id.
    pub transaction_ref: String,
    pub created_at: DateTime<Utc>,
}

/// Rating/comment against a car or a user, identified by the `target` tag
/// plus `target_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub reviewer_id: Uuid,
    pub target_id: Uuid,
    pub target: ReviewTarget,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Contact-level slice of a user, embedded in enriched listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_no: Option<String>,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone_no: user.phone_no.clone(),
            role: user.role,
        }
    }
}

/// Reservation enriched with its car, as returned from creation and
/// customer-facing listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationWithCar {
    #[serde(flatten)]
    pub reservation: ReservationView,
    pub car: Car,
}

/// Reservation enriched with car and customer, for owner/admin views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: ReservationView,
    pub car: Car,
    pub user: UserSummary,
}

/// Admin booking row: reservation, car, customer, and the car owner's
/// contact details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminBooking {
    #[serde(flatten)]
    pub reservation: ReservationView,
    pub car: Car,
    pub customer: UserSummary,
    pub owner: UserSummary,
}

/// Review enriched with its reviewer for listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub review: Review,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<UserSummary>,
}

/// Payment enriched for ledger listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    #[serde(flatten)]
    pub payment: Payment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car: Option<Car>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}
