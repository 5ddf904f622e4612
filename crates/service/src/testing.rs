//! In-memory repository and collaborator fakes for service unit tests.
//!
//! The fakes only implement what tests exercise; the transactional
//! repository methods delegate to their plain counterparts so signatures
//! line up, and `test_pool` builds a pool that never opens a connection —
//! any flow that reaches it fails the test, which is itself an assertion
//! that a code path stays out of the database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use gateway::{GatewayError, GatewayOrder, GatewayPayment, PaymentGateway};
use geo::{Coordinates, GeoError, Geocoder};
use identity::AuthUser;
use model::{
    Car, CarStatus, Payment, PaymentStatus, Reservation, ReservationStatus, Review,
    ReviewTarget, Role, User, intervals_overlap,
};
use repository::{
    CarsRepository, PaymentsRepository, RepositoryError, ReservationsRepository,
    ReviewsRepository, UsersRepository,
};
use tokio_postgres::{Config as PgConfig, NoTls, Transaction};
use uuid::Uuid;

use crate::reservations::ConfirmReservation;

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A pool pointing nowhere; `get()` fails, so tests exercising pure
/// validation paths prove those paths never touch the database.
pub(crate) fn test_pool() -> Pool {
    let cfg: PgConfig = "host=127.0.0.1 port=1 user=test dbname=test"
        .parse()
        .unwrap();
    let mgr = Manager::from_config(
        cfg,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Pool::builder(mgr).max_size(1).build().unwrap()
}

// ---------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------

#[derive(Clone, Default)]
pub(crate) struct InMemoryUsers {
    inner: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl InMemoryUsers {
    pub fn put(&self, user: User) {
        self.inner.lock().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UsersRepository for InMemoryUsers {
    async fn get_by_id(&self, id: Uuid) -> Result<User, RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Clone, Default)]
pub(crate) struct InMemoryCars {
    inner: Arc<Mutex<HashMap<Uuid, Car>>>,
}

impl InMemoryCars {
    pub fn put(&self, car: Car) {
        self.inner.lock().unwrap().insert(car.id, car);
    }

    pub fn get(&self, id: Uuid) -> Car {
        self.inner.lock().unwrap().get(&id).cloned().unwrap()
    }

    fn shared(&self) -> Arc<Mutex<HashMap<Uuid, Car>>> {
        self.inner.clone()
    }
}

#[async_trait]
impl CarsRepository for InMemoryCars {
    async fn insert(&self, car: &Car) -> Result<(), RepositoryError> {
        let mut map = self.inner.lock().unwrap();
        let duplicate_plate = car.license_plate.as_ref().is_some_and(|plate| {
            map.values()
                .any(|existing| existing.license_plate.as_deref() == Some(plate))
        });
        if duplicate_plate {
            return Err(RepositoryError::Conflict);
        }
        map.insert(car.id, car.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Car, RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_by_id_for_update(
        &self,
        _tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Car, RepositoryError> {
        self.get_by_id(id).await
    }

    async fn update(&self, car: &Car) -> Result<(), RepositoryError> {
        let mut map = self.inner.lock().unwrap();
        if !map.contains_key(&car.id) {
            return Err(RepositoryError::NotFound);
        }
        map.insert(car.id, car.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn set_approved(&self, id: Uuid, approved: bool) -> Result<(), RepositoryError> {
        let mut map = self.inner.lock().unwrap();
        let car = map.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        car.approved = approved;
        Ok(())
    }

    async fn set_status_tx(
        &self,
        _tx: &Transaction<'_>,
        id: Uuid,
        status: CarStatus,
    ) -> Result<(), RepositoryError> {
        let mut map = self.inner.lock().unwrap();
        let car = map.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        car.status = status;
        Ok(())
    }

    async fn list_available(&self) -> Result<Vec<Car>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|car| car.status == CarStatus::Available && car.approved)
            .cloned()
            .collect())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Car>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|car| car.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Car>, RepositoryError> {
        Ok(self.inner.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Clone)]
pub(crate) struct InMemoryReservations {
    inner: Arc<Mutex<HashMap<Uuid, Reservation>>>,
    cars: Arc<Mutex<HashMap<Uuid, Car>>>,
}

impl InMemoryReservations {
    fn new(cars: Arc<Mutex<HashMap<Uuid, Car>>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            cars,
        }
    }

    pub fn put(&self, reservation: Reservation) {
        self.inner
            .lock()
            .unwrap()
            .insert(reservation.id, reservation);
    }
}

#[async_trait]
impl ReservationsRepository for InMemoryReservations {
    async fn insert_tx(
        &self,
        _tx: &Transaction<'_>,
        reservation: &Reservation,
    ) -> Result<(), RepositoryError> {
        self.put(reservation.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Reservation, RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_by_id_for_update(
        &self,
        _tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Reservation, RepositoryError> {
        self.get_by_id(id).await
    }

    async fn overlapping_exists_tx(
        &self,
        _tx: &Transaction<'_>,
        car_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepositoryError> {
        Ok(self.inner.lock().unwrap().values().any(|r| {
            r.car_id == car_id
                && Some(r.id) != exclude
                && !r.status.is_terminal()
                && intervals_overlap(r.start_date, r.end_date, start, end)
        }))
    }

    async fn update_status_tx(
        &self,
        _tx: &Transaction<'_>,
        id: Uuid,
        status: ReservationStatus,
        end_date: Option<NaiveDate>,
    ) -> Result<(), RepositoryError> {
        let mut map = self.inner.lock().unwrap();
        let reservation = map.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        reservation.status = status;
        if let Some(end_date) = end_date {
            reservation.end_date = end_date;
        }
        Ok(())
    }

    async fn update_dates_tx(
        &self,
        _tx: &Transaction<'_>,
        id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        total_amount: i64,
    ) -> Result<(), RepositoryError> {
        let mut map = self.inner.lock().unwrap();
        let reservation = map.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        reservation.start_date = start;
        reservation.end_date = end;
        reservation.total_amount = total_amount;
        Ok(())
    }

    async fn delete_tx(&self, _tx: &Transaction<'_>, id: Uuid) -> Result<(), RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Reservation>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_car(&self, car_id: Uuid) -> Result<Vec<Reservation>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.car_id == car_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Reservation>, RepositoryError> {
        Ok(self.inner.lock().unwrap().values().cloned().collect())
    }

    async fn has_completed_for_car(
        &self,
        user_id: Uuid,
        car_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        Ok(self.inner.lock().unwrap().values().any(|r| {
            r.user_id == user_id && r.car_id == car_id && r.status == ReservationStatus::Completed
        }))
    }

    async fn has_completed_between_users(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> Result<bool, RepositoryError> {
        let cars = self.cars.lock().unwrap();
        Ok(self.inner.lock().unwrap().values().any(|r| {
            if r.status != ReservationStatus::Completed {
                return false;
            }
            let Some(car) = cars.get(&r.car_id) else {
                return false;
            };
            (r.user_id == a && car.owner_id == b) || (r.user_id == b && car.owner_id == a)
        }))
    }

    async fn reconcile_car_statuses(&self) -> Result<u64, RepositoryError> {
        let reservations = self.inner.lock().unwrap();
        let mut cars = self.cars.lock().unwrap();
        let mut changed = 0;
        for car in cars.values_mut() {
            let held = reservations
                .values()
                .any(|r| r.car_id == car.id && r.status == ReservationStatus::Confirmed);
            let expected = if held {
                CarStatus::Rented
            } else {
                CarStatus::Available
            };
            if car.status != expected {
                car.status = expected;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[derive(Clone, Default)]
pub(crate) struct InMemoryPayments {
    inner: Arc<Mutex<HashMap<Uuid, Payment>>>,
}

impl InMemoryPayments {
    pub fn put(&self, payment: Payment) {
        self.inner.lock().unwrap().insert(payment.id, payment);
    }

    fn mark(&self, order_ref: &str, transaction_ref: &str) -> Result<Payment, RepositoryError> {
        let mut map = self.inner.lock().unwrap();
        let reservation_of_target = map
            .values()
            .find(|p| p.order_ref == order_ref)
            .map(|p| (p.id, p.reservation_id))
            .ok_or(RepositoryError::NotFound)?;
        let already_settled = map.values().any(|p| {
            p.reservation_id == reservation_of_target.1
                && p.id != reservation_of_target.0
                && p.payment_status == PaymentStatus::Success
        });
        if already_settled {
            return Err(RepositoryError::Conflict);
        }
        let payment = map
            .values_mut()
            .find(|p| p.order_ref == order_ref)
            .ok_or(RepositoryError::NotFound)?;
        payment.payment_status = PaymentStatus::Success;
        payment.transaction_ref = transaction_ref.to_string();
        Ok(payment.clone())
    }
}

#[async_trait]
impl PaymentsRepository for InMemoryPayments {
    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError> {
        let mut map = self.inner.lock().unwrap();
        if map.values().any(|p| p.order_ref == payment.order_ref) {
            return Err(RepositoryError::Conflict);
        }
        map.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get_by_order_ref(&self, order_ref: &str) -> Result<Payment, RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .values()
            .find(|p| p.order_ref == order_ref)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn mark_success(
        &self,
        order_ref: &str,
        transaction_ref: &str,
    ) -> Result<Payment, RepositoryError> {
        self.mark(order_ref, transaction_ref)
    }

    async fn mark_success_tx(
        &self,
        _tx: &Transaction<'_>,
        order_ref: &str,
        transaction_ref: &str,
    ) -> Result<Payment, RepositoryError> {
        self.mark(order_ref, transaction_ref)
    }

    async fn list_by_car(&self, car_id: Uuid) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.car_id == car_id)
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self.inner.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Clone, Default)]
pub(crate) struct InMemoryReviews {
    inner: Arc<Mutex<HashMap<Uuid, Review>>>,
}

#[async_trait]
impl ReviewsRepository for InMemoryReviews {
    async fn insert(&self, review: &Review) -> Result<(), RepositoryError> {
        self.inner.lock().unwrap().insert(review.id, review.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Review, RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_for_target(
        &self,
        target: ReviewTarget,
        target_id: Uuid,
    ) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.target == target && r.target_id == target_id)
            .cloned()
            .collect())
    }

    async fn list_by_reviewer(&self, reviewer_id: Uuid) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.reviewer_id == reviewer_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Review>, RepositoryError> {
        Ok(self.inner.lock().unwrap().values().cloned().collect())
    }
}

// ---------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct StubGateway {
    pub payment_status: String,
    pub unreachable: bool,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(
        &self,
        _amount: i64,
        _currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        if self.unreachable {
            return Err(GatewayError::Unavailable("connection refused".into()));
        }
        Ok(GatewayOrder {
            order_ref: "order_test_1".into(),
        })
    }

    async fn fetch_payment(&self, payment_ref: &str) -> Result<GatewayPayment, GatewayError> {
        if self.unreachable {
            return Err(GatewayError::Unavailable("connection refused".into()));
        }
        Ok(GatewayPayment {
            payment_ref: payment_ref.to_string(),
            order_ref: None,
            status: self.payment_status.clone(),
            amount: None,
        })
    }
}

#[derive(Clone)]
pub(crate) struct StubGeocoder {
    pub coords: Option<Coordinates>,
    pub suggestions: Vec<String>,
    pub unavailable: bool,
}

impl Default for StubGeocoder {
    fn default() -> Self {
        Self {
            coords: Some(Coordinates {
                latitude: 12.9716,
                longitude: 77.5946,
            }),
            suggestions: vec!["MG Road, Bengaluru".into()],
            unavailable: false,
        }
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, _address: &str) -> Result<Option<Coordinates>, GeoError> {
        if self.unavailable {
            return Err(GeoError::Unavailable("connection refused".into()));
        }
        Ok(self.coords)
    }

    async fn suggest(&self, _input: &str) -> Result<Vec<String>, GeoError> {
        if self.unavailable {
            return Err(GeoError::Unavailable("connection refused".into()));
        }
        Ok(self.suggestions.clone())
    }
}

// ---------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------

/// Seeded world: an approved customer, an unapproved customer, an owner
/// with one approved car, an admin, and an unrelated customer.
pub(crate) struct Fixtures {
    pub users: InMemoryUsers,
    pub cars: InMemoryCars,
    pub reservations: InMemoryReservations,
    pub payments: InMemoryPayments,
    pub reviews: InMemoryReviews,
    pub gateway: StubGateway,
    pub car_id: Uuid,
    customer_id: Uuid,
    unapproved_id: Uuid,
    owner_id: Uuid,
    admin_id: Uuid,
    stranger_id: Uuid,
}

impl Fixtures {
    pub fn new() -> Self {
        Self::with_gateway(StubGateway {
            payment_status: "captured".into(),
            unreachable: false,
        })
    }

    pub fn with_gateway_status(status: &str) -> Self {
        Self::with_gateway(StubGateway {
            payment_status: status.into(),
            unreachable: false,
        })
    }

    pub fn with_unreachable_gateway() -> Self {
        Self::with_gateway(StubGateway {
            payment_status: "captured".into(),
            unreachable: true,
        })
    }

    fn with_gateway(gateway: StubGateway) -> Self {
        let users = InMemoryUsers::default();
        let cars = InMemoryCars::default();
        let reservations = InMemoryReservations::new(cars.shared());

        let customer_id = Uuid::new_v4();
        let unapproved_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        let admin_id = Uuid::new_v4();
        let stranger_id = Uuid::new_v4();
        let car_id = Uuid::new_v4();

        users.put(test_user(customer_id, "Asha", Role::Customer, true));
        users.put(test_user(unapproved_id, "Ravi", Role::Customer, false));
        users.put(test_user(owner_id, "Meera", Role::Owner, true));
        users.put(test_user(admin_id, "Admin", Role::Admin, true));
        users.put(test_user(stranger_id, "Kiran", Role::Customer, true));

        cars.put(test_car(car_id, owner_id));

        Self {
            users,
            cars,
            reservations,
            payments: InMemoryPayments::default(),
            reviews: InMemoryReviews::default(),
            gateway,
            car_id,
            customer_id,
            unapproved_id,
            owner_id,
            admin_id,
            stranger_id,
        }
    }

    pub fn customer(&self) -> AuthUser {
        AuthUser {
            user_id: self.customer_id,
            role: Role::Customer,
        }
    }

    pub fn unapproved_customer(&self) -> AuthUser {
        AuthUser {
            user_id: self.unapproved_id,
            role: Role::Customer,
        }
    }

    pub fn owner(&self) -> AuthUser {
        AuthUser {
            user_id: self.owner_id,
            role: Role::Owner,
        }
    }

    pub fn admin(&self) -> AuthUser {
        AuthUser {
            user_id: self.admin_id,
            role: Role::Admin,
        }
    }

    pub fn stranger(&self) -> AuthUser {
        AuthUser {
            user_id: self.stranger_id,
            role: Role::Customer,
        }
    }

    /// Insert a reservation by the approved customer on the fixture car,
    /// 2024-06-01..2024-06-03 at the seeded daily rate.
    pub fn seed_reservation(&self, status: ReservationStatus) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.reservations.put(Reservation {
            id,
            car_id: self.car_id,
            user_id: self.customer_id,
            start_date: date(2024, 6, 1),
            end_date: date(2024, 6, 3),
            total_amount: 3000,
            status,
            payment_id: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// Insert a pending payment row for the given reservation/order pair.
    pub fn seed_payment(&self, reservation_id: Uuid, order_ref: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.payments.put(Payment {
            id,
            reservation_id,
            car_id: self.car_id,
            user_id: self.customer_id,
            amount: 3000,
            currency: "INR".into(),
            payment_status: PaymentStatus::Pending,
            payment_method: Some("card".into()),
            order_ref: order_ref.to_string(),
            transaction_ref: format!("temp_{id}"),
            created_at: Utc::now(),
        });
        id
    }

    /// Confirmation payload carrying a valid signature for the fixture
    /// gateway secret.
    pub fn signed_confirmation(&self, order_ref: &str, payment_ref: &str) -> ConfirmReservation {
        ConfirmReservation {
            order_ref: order_ref.to_string(),
            payment_ref: payment_ref.to_string(),
            signature: gateway::signature::sign(b"rzp_test_secret", order_ref, payment_ref),
        }
    }
}

pub(crate) fn test_user(id: Uuid, name: &str, role: Role, is_approved: bool) -> User {
    User {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone_no: Some("+911234567890".into()),
        role,
        is_approved,
        latitude: None,
        longitude: None,
        address: None,
        created_at: Utc::now(),
    }
}

pub(crate) fn test_car(id: Uuid, owner_id: Uuid) -> Car {
    Car {
        id,
        owner_id,
        name: "Swift".into(),
        make: Some("Maruti".into()),
        model: Some("Swift VXi".into()),
        year: Some(2022),
        license_plate: Some("KA01AB1234".into()),
        daily_rate: 1000,
        status: CarStatus::Available,
        latitude: Some(12.9716),
        longitude: Some(77.5946),
        address: Some("MG Road, Bengaluru".into()),
        transmission: Some("Manual".into()),
        fuel_type: Some("Petrol".into()),
        seats: Some(5),
        mileage: Some(22),
        features: Some("AC, Airbags".into()),
        image_url: None,
        approved: true,
        created_at: Utc::now(),
    }
}
