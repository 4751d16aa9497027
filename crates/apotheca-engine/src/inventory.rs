//! # Inventory Service
//!
//! Catalog management and the stock operations staff perform directly
//! (settlement deducts through its own transaction path).

use chrono::{NaiveDate, Utc};
use tracing::info;

use apotheca_core::validation::validate_name;
use apotheca_core::{CoreError, Medicine};
use apotheca_db::repository::medicine::{generate_medicine_id, DeductOutcome};
use apotheca_db::Database;

use crate::context::SessionContext;
use crate::error::{EngineError, EngineResult};

/// Input for adding a medicine to the catalog.
#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub name: String,
    pub quantity: i64,
    pub reorder_level: i64,
    pub unit_price_cents: i64,
    pub expiry_date: Option<NaiveDate>,
}

/// Inventory ledger orchestration.
#[derive(Debug, Clone)]
pub struct InventoryService {
    db: Database,
}

impl InventoryService {
    pub fn new(db: Database) -> Self {
        InventoryService { db }
    }

    /// Adds a medicine to the catalog.
    pub async fn add_medicine(
        &self,
        ctx: &SessionContext,
        input: NewMedicine,
    ) -> EngineResult<Medicine> {
        ctx.require_staff("add medicine")?;
        validate_name("name", &input.name).map_err(CoreError::from)?;
        if input.quantity < 0 || input.reorder_level < 0 {
            return Err(CoreError::InvalidQuantity {
                requested: input.quantity.min(input.reorder_level),
            }
            .into());
        }

        let now = Utc::now();
        let medicine = Medicine {
            id: generate_medicine_id(),
            name: input.name.trim().to_string(),
            quantity: input.quantity,
            reorder_level: input.reorder_level,
            unit_price_cents: input.unit_price_cents,
            expiry_date: input.expiry_date,
            created_at: now,
            updated_at: now,
        };
        self.db.medicines().insert(&medicine).await?;

        info!(id = %medicine.id, name = %medicine.name, "Medicine added");
        Ok(medicine)
    }

    /// Increases stock. Negative quantities are refused before any
    /// state changes.
    pub async fn restock(
        &self,
        ctx: &SessionContext,
        medicine_id: &str,
        quantity: i64,
    ) -> EngineResult<i64> {
        ctx.require_staff("restock")?;
        if quantity < 0 {
            return Err(CoreError::InvalidQuantity {
                requested: quantity,
            }
            .into());
        }

        let new_quantity = self.db.medicines().restock(medicine_id, quantity).await?;
        info!(id = %medicine_id, quantity, new_quantity, "Restocked");
        Ok(new_quantity)
    }

    /// Deducts stock outside settlement (damage, manual correction).
    ///
    /// Refuses with `InsufficientStock` rather than going negative.
    pub async fn deduct(
        &self,
        ctx: &SessionContext,
        medicine_id: &str,
        quantity: i64,
    ) -> EngineResult<i64> {
        ctx.require_staff("deduct")?;
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                requested: quantity,
            }
            .into());
        }

        match self.db.medicines().deduct(medicine_id, quantity).await? {
            DeductOutcome::Deducted { new_quantity } => {
                info!(id = %medicine_id, quantity, new_quantity, "Stock deducted");
                Ok(new_quantity)
            }
            DeductOutcome::Insufficient { available } => Err(CoreError::InsufficientStock {
                medicine_id: medicine_id.to_string(),
                available,
                requested: quantity,
            }
            .into()),
        }
    }

    /// Gets a medicine by id.
    pub async fn get(&self, medicine_id: &str) -> EngineResult<Medicine> {
        self.db
            .medicines()
            .get_by_id(medicine_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Medicine", medicine_id))
    }

    /// Medicines at or below their reorder level, most urgent first.
    pub async fn list_low_stock(&self) -> EngineResult<Vec<Medicine>> {
        Ok(self.db.medicines().list_below_reorder().await?)
    }

    /// Medicines expiring within the next `days` days, soonest first.
    /// Untracked expiry dates are excluded.
    pub async fn list_expiring_within(&self, days: i64) -> EngineResult<Vec<Medicine>> {
        let today = Utc::now().date_naive();
        Ok(self.db.medicines().list_expiring_within(today, days).await?)
    }
}
