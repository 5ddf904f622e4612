//! Car catalog service: listing CRUD, admin approval, the proximity
//! availability search that gates what the reservation engine may book
//! against, and address autocomplete for owners.

use async_trait::async_trait;
use chrono::Utc;
use geo::{Coordinates, GeoError, Geocoder, distance_meters};
use identity::AuthUser;
use model::{Car, CarStatus, Role};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::ServiceError;

/// New listing as submitted by an owner. Coordinates are resolved from
/// the address; the image, if any, is a URL produced by the external
/// storage collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCar {
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub license_plate: Option<String>,
    pub daily_rate: i64,
    pub address: String,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub seats: Option<i32>,
    pub mileage: Option<i32>,
    pub features: Option<String>,
    pub image_url: Option<String>,
}

/// Partial listing update; absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCar {
    pub name: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub license_plate: Option<String>,
    pub daily_rate: Option<i64>,
    pub address: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub seats: Option<i32>,
    pub mileage: Option<i32>,
    pub features: Option<String>,
    pub image_url: Option<String>,
}

#[async_trait]
pub trait CarService: Send + Sync {
    /// Create a listing (owners only). Enters the catalog unapproved.
    async fn create(&self, actor: AuthUser, req: CreateCar) -> Result<Car, ServiceError>;

    /// Fetch one listing; customers only see approved cars.
    async fn get(&self, actor: AuthUser, id: Uuid) -> Result<Car, ServiceError>;

    /// Edit a listing (its owner only). Any edit drops the approval flag
    /// until an admin re-approves.
    async fn update(&self, actor: AuthUser, id: Uuid, req: UpdateCar) -> Result<Car, ServiceError>;

    /// Remove a listing (its owner or an admin; never customers).
    async fn delete(&self, actor: AuthUser, id: Uuid) -> Result<(), ServiceError>;

    /// Admin approval.
    async fn approve(&self, actor: AuthUser, id: Uuid) -> Result<Car, ServiceError>;

    /// Bookable inventory near the caller: available, approved, within
    /// the configured radius. Cars without coordinates are excluded.
    async fn list_available(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<Car>, ServiceError>;

    /// The calling owner's listings.
    async fn list_owner(&self, actor: AuthUser) -> Result<Vec<Car>, ServiceError>;

    /// Every listing, approved or not (admin).
    async fn list_all(&self) -> Result<Vec<Car>, ServiceError>;

    /// Autocomplete suggestions for a partial address.
    async fn address_suggestions(&self, input: &str) -> Result<Vec<String>, ServiceError>;
}

/// Async implementation of [`CarService`].
pub struct CarServiceImpl<R, G> {
    cars_repo: R,
    geocoder: G,
    search_radius_m: f64,
}

impl<R, G> CarServiceImpl<R, G>
where
    R: repository::CarsRepository,
    G: Geocoder,
{
    pub fn new(cars_repo: R, geocoder: G, search_radius_m: f64) -> Self {
        Self {
            cars_repo,
            geocoder,
            search_radius_m,
        }
    }

    async fn resolve_address(&self, address: &str) -> Result<Coordinates, ServiceError> {
        let resolved = self.geocoder.geocode(address).await.map_err(|err| match err {
            GeoError::Unavailable(msg) => ServiceError::GatewayUnavailable(msg),
            other => ServiceError::Unexpected(other.to_string()),
        })?;
        resolved.ok_or_else(|| ServiceError::Validation("invalid address provided".into()))
    }
}

#[async_trait]
impl<R, G> CarService for CarServiceImpl<R, G>
where
    R: repository::CarsRepository,
    G: Geocoder,
{
    #[instrument(skip(self, req))]
    async fn create(&self, actor: AuthUser, req: CreateCar) -> Result<Car, ServiceError> {
        if actor.role != Role::Owner {
            return Err(ServiceError::Authorization(
                "only owners can create cars".into(),
            ));
        }
        if req.name.trim().is_empty() {
            return Err(ServiceError::Validation("car name is required".into()));
        }
        if req.daily_rate <= 0 {
            return Err(ServiceError::Validation(
                "daily rate must be greater than zero".into(),
            ));
        }

        let coords = self.resolve_address(&req.address).await?;

        let car = Car {
            id: Uuid::new_v4(),
            owner_id: actor.user_id,
            name: req.name,
            make: req.make,
            model: req.model,
            year: req.year,
            license_plate: req.license_plate,
            daily_rate: req.daily_rate,
            status: CarStatus::Available,
            latitude: Some(coords.latitude),
            longitude: Some(coords.longitude),
            address: Some(req.address),
            transmission: req.transmission,
            fuel_type: req.fuel_type,
            seats: req.seats,
            mileage: req.mileage,
            features: req.features,
            image_url: req.image_url,
            // New and edited listings wait for admin approval.
            approved: false,
            created_at: Utc::now(),
        };

        self.cars_repo.insert(&car).await.map_err(|err| match err {
            repository::RepositoryError::Conflict => {
                ServiceError::Conflict("license plate already exists".into())
            }
            other => other.into(),
        })?;

        Ok(car)
    }

    #[instrument(skip(self))]
    async fn get(&self, actor: AuthUser, id: Uuid) -> Result<Car, ServiceError> {
        let car = self
            .cars_repo
            .get_by_id(id)
            .await
            .map_err(ServiceError::on_missing("car"))?;
        if actor.role == Role::Customer && !car.approved {
            return Err(ServiceError::Authorization("access denied".into()));
        }
        Ok(car)
    }

    #[instrument(skip(self, req))]
    async fn update(&self, actor: AuthUser, id: Uuid, req: UpdateCar) -> Result<Car, ServiceError> {
        let mut car = self
            .cars_repo
            .get_by_id(id)
            .await
            .map_err(ServiceError::on_missing("car"))?;
        if car.owner_id != actor.user_id {
            return Err(ServiceError::Authorization(
                "you can only edit your own cars".into(),
            ));
        }
        if let Some(rate) = req.daily_rate {
            if rate <= 0 {
                return Err(ServiceError::Validation(
                    "daily rate must be greater than zero".into(),
                ));
            }
            car.daily_rate = rate;
        }
        if let Some(name) = req.name {
            car.name = name;
        }
        if req.make.is_some() {
            car.make = req.make;
        }
        if req.model.is_some() {
            car.model = req.model;
        }
        if req.year.is_some() {
            car.year = req.year;
        }
        if req.license_plate.is_some() {
            car.license_plate = req.license_plate;
        }
        if req.transmission.is_some() {
            car.transmission = req.transmission;
        }
        if req.fuel_type.is_some() {
            car.fuel_type = req.fuel_type;
        }
        if req.seats.is_some() {
            car.seats = req.seats;
        }
        if req.mileage.is_some() {
            car.mileage = req.mileage;
        }
        if req.features.is_some() {
            car.features = req.features;
        }
        if req.image_url.is_some() {
            car.image_url = req.image_url;
        }
        if let Some(address) = req.address {
            if car.address.as_deref() != Some(address.as_str()) {
                let coords = self.resolve_address(&address).await?;
                car.latitude = Some(coords.latitude);
                car.longitude = Some(coords.longitude);
            }
            car.address = Some(address);
        }

        // Edits re-enter the approval queue.
        car.approved = false;

        self.cars_repo.update(&car).await.map_err(|err| match err {
            repository::RepositoryError::Conflict => {
                ServiceError::Conflict("license plate already exists".into())
            }
            other => ServiceError::on_missing("car")(other),
        })?;

        Ok(car)
    }

    #[instrument(skip(self))]
    async fn delete(&self, actor: AuthUser, id: Uuid) -> Result<(), ServiceError> {
        if actor.role == Role::Customer {
            return Err(ServiceError::Authorization(
                "customers cannot delete cars".into(),
            ));
        }
        let car = self
            .cars_repo
            .get_by_id(id)
            .await
            .map_err(ServiceError::on_missing("car"))?;
        if car.owner_id != actor.user_id && !actor.is_admin() {
            return Err(ServiceError::Authorization("access denied".into()));
        }
        self.cars_repo
            .delete(id)
            .await
            .map_err(ServiceError::on_missing("car"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn approve(&self, actor: AuthUser, id: Uuid) -> Result<Car, ServiceError> {
        if !actor.is_admin() {
            return Err(ServiceError::Authorization("access denied".into()));
        }
        self.cars_repo
            .set_approved(id, true)
            .await
            .map_err(ServiceError::on_missing("car"))?;
        self.cars_repo
            .get_by_id(id)
            .await
            .map_err(ServiceError::on_missing("car"))
    }

    #[instrument(skip(self))]
    async fn list_available(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<Car>, ServiceError> {
        let caller = Coordinates {
            latitude,
            longitude,
        };
        let cars = self.cars_repo.list_available().await?;
        Ok(cars
            .into_iter()
            .filter(|car| match (car.latitude, car.longitude) {
                (Some(lat), Some(lng)) => {
                    let location = Coordinates {
                        latitude: lat,
                        longitude: lng,
                    };
                    distance_meters(caller, location) <= self.search_radius_m
                }
                _ => false,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_owner(&self, actor: AuthUser) -> Result<Vec<Car>, ServiceError> {
        Ok(self.cars_repo.list_by_owner(actor.user_id).await?)
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Car>, ServiceError> {
        Ok(self.cars_repo.list_all().await?)
    }

    #[instrument(skip(self))]
    async fn address_suggestions(&self, input: &str) -> Result<Vec<String>, ServiceError> {
        if input.trim().is_empty() {
            return Err(ServiceError::Validation("input is required".into()));
        }
        self.geocoder.suggest(input).await.map_err(|err| match err {
            GeoError::Unavailable(msg) => ServiceError::GatewayUnavailable(msg),
            other => ServiceError::Unexpected(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn sample_request() -> CreateCar {
        CreateCar {
            name: "Polo".into(),
            make: Some("Volkswagen".into()),
            model: Some("Polo GT".into()),
            year: Some(2021),
            license_plate: Some("KA05XY9999".into()),
            daily_rate: 1500,
            address: "Indiranagar, Bengaluru".into(),
            transmission: Some("Automatic".into()),
            fuel_type: Some("Petrol".into()),
            seats: Some(5),
            mileage: Some(18),
            features: None,
            image_url: None,
        }
    }

    fn service(fixtures: &Fixtures, geocoder: StubGeocoder) -> CarServiceImpl<InMemoryCars, StubGeocoder> {
        CarServiceImpl::new(fixtures.cars.clone(), geocoder, 5000.0)
    }

    #[tokio::test]
    async fn test_create_requires_owner_role() {
        let fixtures = Fixtures::new();
        let svc = service(&fixtures, StubGeocoder::default());
        let err = svc
            .create(fixtures.customer(), sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_create_geocodes_and_enters_unapproved() {
        let fixtures = Fixtures::new();
        let svc = service(&fixtures, StubGeocoder::default());
        let car = svc
            .create(fixtures.owner(), sample_request())
            .await
            .unwrap();
        assert!(!car.approved);
        assert_eq!(car.status, CarStatus::Available);
        assert_eq!(car.latitude, Some(12.9716));
        assert_eq!(car.longitude, Some(77.5946));
    }

    #[tokio::test]
    async fn test_create_rejects_unresolvable_address() {
        let fixtures = Fixtures::new();
        let geocoder = StubGeocoder {
            coords: None,
            ..StubGeocoder::default()
        };
        let svc = service(&fixtures, geocoder);
        let err = svc
            .create(fixtures.owner(), sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_maps_unreachable_geocoder() {
        let fixtures = Fixtures::new();
        let geocoder = StubGeocoder {
            unavailable: true,
            ..StubGeocoder::default()
        };
        let svc = service(&fixtures, geocoder);
        let err = svc
            .create(fixtures.owner(), sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::GatewayUnavailable(_)));
    }

    #[tokio::test]
    async fn test_customer_cannot_see_unapproved_car() {
        let fixtures = Fixtures::new();
        let svc = service(&fixtures, StubGeocoder::default());
        let car = svc
            .create(fixtures.owner(), sample_request())
            .await
            .unwrap();

        let err = svc.get(fixtures.customer(), car.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
        assert!(svc.get(fixtures.owner(), car.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_resets_approval_and_is_owner_only() {
        let fixtures = Fixtures::new();
        let svc = service(&fixtures, StubGeocoder::default());

        let err = svc
            .update(
                fixtures.admin(),
                fixtures.car_id,
                UpdateCar {
                    name: Some("Hacked".into()),
                    ..UpdateCar::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));

        let updated = svc
            .update(
                fixtures.owner(),
                fixtures.car_id,
                UpdateCar {
                    daily_rate: Some(2000),
                    ..UpdateCar::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.daily_rate, 2000);
        assert!(!updated.approved);
    }

    #[tokio::test]
    async fn test_delete_denies_customers() {
        let fixtures = Fixtures::new();
        let svc = service(&fixtures, StubGeocoder::default());
        let err = svc
            .delete(fixtures.customer(), fixtures.car_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
        assert!(svc.delete(fixtures.admin(), fixtures.car_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_approve_is_admin_only() {
        let fixtures = Fixtures::new();
        let svc = service(&fixtures, StubGeocoder::default());
        let err = svc
            .approve(fixtures.owner(), fixtures.car_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));

        let car = svc.approve(fixtures.admin(), fixtures.car_id).await.unwrap();
        assert!(car.approved);
    }

    #[tokio::test]
    async fn test_list_available_filters_by_radius() {
        let fixtures = Fixtures::new();
        let svc = service(&fixtures, StubGeocoder::default());

        // A second approved car ~12 km away, and one with no coordinates.
        let far_id = Uuid::new_v4();
        let mut far = test_car(far_id, fixtures.owner().user_id);
        far.latitude = Some(13.08);
        far.longitude = Some(77.59);
        fixtures.cars.put(far);

        let unmapped_id = Uuid::new_v4();
        let mut unmapped = test_car(unmapped_id, fixtures.owner().user_id);
        unmapped.latitude = None;
        unmapped.longitude = None;
        fixtures.cars.put(unmapped);

        let nearby = svc.list_available(12.9716, 77.5946).await.unwrap();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].id, fixtures.car_id);
    }

    #[tokio::test]
    async fn test_address_suggestions_require_input() {
        let fixtures = Fixtures::new();
        let svc = service(&fixtures, StubGeocoder::default());
        let err = svc.address_suggestions("  ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let suggestions = svc.address_suggestions("MG").await.unwrap();
        assert_eq!(suggestions, vec!["MG Road, Bengaluru".to_string()]);
    }
}
