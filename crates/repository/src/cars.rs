//! Repository for car listings.

use std::sync::Arc;

use async_trait::async_trait;
use model::{Car, CarStatus};
use tokio_postgres::{Client, Row, Transaction};
use uuid::Uuid;

use crate::RepositoryError;

#[async_trait]
pub trait CarsRepository: Send + Sync {
    /// Insert a new listing.
    async fn insert(&self, car: &Car) -> Result<(), RepositoryError>;

    /// Get a car by id.
    async fn get_by_id(&self, id: Uuid) -> Result<Car, RepositoryError>;

    /// Get a car by id inside a transaction, locking the row. Reservation
    /// flows use this to serialize the overlap-check-then-insert sequence
    /// per car.
    async fn get_by_id_for_update(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Car, RepositoryError>;

    /// Overwrite the mutable listing attributes.
    async fn update(&self, car: &Car) -> Result<(), RepositoryError>;

    /// Delete a listing.
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Flip the admin approval flag.
    async fn set_approved(&self, id: Uuid, approved: bool) -> Result<(), RepositoryError>;

    /// Set the Available/Rented flag in a transaction.
    async fn set_status_tx(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
        status: CarStatus,
    ) -> Result<(), RepositoryError>;

    /// All approved, available listings (bookable inventory).
    async fn list_available(&self) -> Result<Vec<Car>, RepositoryError>;

    /// Listings belonging to one owner.
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Car>, RepositoryError>;

    /// Every listing, including unapproved ones (admin view).
    async fn list_all(&self) -> Result<Vec<Car>, RepositoryError>;
}

/// PostgreSQL implementation of the [`CarsRepository`] trait.
#[derive(Clone)]
pub struct PgCarsRepository {
    db: Arc<Client>,
}

impl PgCarsRepository {
    pub fn new(db: Client) -> Self {
        Self { db: Arc::new(db) }
    }
}

const CAR_COLUMNS: &str = "id, owner_id, name, make, model, year, license_plate, daily_rate, \
     status, latitude, longitude, address, transmission, fuel_type, seats, mileage, \
     features, image_url, approved, created_at";

pub(crate) fn car_from_row(row: &Row) -> Car {
    Car {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        make: row.get("make"),
        model: row.get("model"),
        year: row.get("year"),
        license_plate: row.get("license_plate"),
        daily_rate: row.get("daily_rate"),
        status: row.get("status"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        address: row.get("address"),
        transmission: row.get("transmission"),
        fuel_type: row.get("fuel_type"),
        seats: row.get("seats"),
        mileage: row.get("mileage"),
        features: row.get("features"),
        image_url: row.get("image_url"),
        approved: row.get("approved"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl CarsRepository for PgCarsRepository {
    async fn insert(&self, car: &Car) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO cars (
                id, owner_id, name, make, model, year, license_plate, daily_rate,
                status, latitude, longitude, address, transmission, fuel_type,
                seats, mileage, features, image_url, approved, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20)
        "#;
        self.db
            .execute(
                query,
                &[
                    &car.id,
                    &car.owner_id,
                    &car.name,
                    &car.make,
                    &car.model,
                    &car.year,
                    &car.license_plate,
                    &car.daily_rate,
                    &car.status,
                    &car.latitude,
                    &car.longitude,
                    &car.address,
                    &car.transmission,
                    &car.fuel_type,
                    &car.seats,
                    &car.mileage,
                    &car.features,
                    &car.image_url,
                    &car.approved,
                    &car.created_at,
                ],
            )
            .await
            .map_err(crate::map_write_err)?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Car, RepositoryError> {
        let query = format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = $1");
        let row = self.db.query_opt(&query, &[&id]).await?;
        match row {
            Some(row) => Ok(car_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn get_by_id_for_update(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Car, RepositoryError> {
        let query = format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = $1 FOR UPDATE");
        let row = tx.query_opt(&query, &[&id]).await?;
        match row {
            Some(row) => Ok(car_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn update(&self, car: &Car) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE cars SET
                name = $2, make = $3, model = $4, year = $5, license_plate = $6,
                daily_rate = $7, latitude = $8, longitude = $9, address = $10,
                transmission = $11, fuel_type = $12, seats = $13, mileage = $14,
                features = $15, image_url = $16, approved = $17
            WHERE id = $1
        "#;
        let updated = self
            .db
            .execute(
                query,
                &[
                    &car.id,
                    &car.name,
                    &car.make,
                    &car.model,
                    &car.year,
                    &car.license_plate,
                    &car.daily_rate,
                    &car.latitude,
                    &car.longitude,
                    &car.address,
                    &car.transmission,
                    &car.fuel_type,
                    &car.seats,
                    &car.mileage,
                    &car.features,
                    &car.image_url,
                    &car.approved,
                ],
            )
            .await
            .map_err(crate::map_write_err)?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let deleted = self.db.execute("DELETE FROM cars WHERE id = $1", &[&id]).await?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_approved(&self, id: Uuid, approved: bool) -> Result<(), RepositoryError> {
        let updated = self
            .db
            .execute("UPDATE cars SET approved = $2 WHERE id = $1", &[&id, &approved])
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_status_tx(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
        status: CarStatus,
    ) -> Result<(), RepositoryError> {
        let updated = tx
            .execute("UPDATE cars SET status = $2 WHERE id = $1", &[&id, &status])
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_available(&self) -> Result<Vec<Car>, RepositoryError> {
        let query = format!(
            "SELECT {CAR_COLUMNS} FROM cars WHERE status = 'Available' AND approved ORDER BY created_at DESC"
        );
        let rows = self.db.query(&query, &[]).await?;
        Ok(rows.iter().map(car_from_row).collect())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Car>, RepositoryError> {
        let query =
            format!("SELECT {CAR_COLUMNS} FROM cars WHERE owner_id = $1 ORDER BY created_at DESC");
        let rows = self.db.query(&query, &[&owner_id]).await?;
        Ok(rows.iter().map(car_from_row).collect())
    }

    async fn list_all(&self) -> Result<Vec<Car>, RepositoryError> {
        let query = format!("SELECT {CAR_COLUMNS} FROM cars ORDER BY created_at DESC");
        let rows = self.db.query(&query, &[]).await?;
        Ok(rows.iter().map(car_from_row).collect())
    }
}
