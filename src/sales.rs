use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{SALES, SALE_INSERT_COLUMNS};
use crate::error::{StoreError, StoreResult};
use crate::pagination::Pagination;
use crate::schema::sales;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = sales, primary_key(sale_id), check_for_backend(diesel::pg::Pg))]
pub struct Sale {
    pub sale_id: i32,
    pub product_id: Option<i32>,
    pub customer_id: Option<i32>,
    pub sale_date: DateTime<Utc>,
    pub quantity: i32,
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert record. Without `sale_date` the row is stamped with the insertion time.
#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = sales)]
pub struct NewSale {
    pub sale_id: i32,
    #[serde(default)]
    pub product_id: Option<i32>,
    #[serde(default)]
    pub customer_id: Option<i32>,
    #[serde(default)]
    pub sale_date: Option<DateTime<Utc>>,
    pub quantity: i32,
    #[serde(deserialize_with = "crate::amount::deserialize")]
    pub total_amount: BigDecimal,
}

impl NewSale {
    pub fn new(sale_id: i32, quantity: i32, total_amount: BigDecimal) -> Self {
        NewSale {
            sale_id,
            product_id: None,
            customer_id: None,
            sale_date: None,
            quantity,
            total_amount,
        }
    }

    pub fn for_product(mut self, product_id: i32) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn for_customer(mut self, customer_id: i32) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        validation::positive("quantity", self.quantity)?;
        validation::non_negative_amount("total_amount", &self.total_amount)
    }
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = sales)]
pub struct SaleChanges {
    pub product_id: Option<Option<i32>>,
    pub customer_id: Option<Option<i32>>,
    pub sale_date: Option<DateTime<Utc>>,
    pub quantity: Option<i32>,
    pub total_amount: Option<BigDecimal>,
}

impl SaleChanges {
    pub fn is_empty(&self) -> bool {
        self.product_id.is_none()
            && self.customer_id.is_none()
            && self.sale_date.is_none()
            && self.quantity.is_none()
            && self.total_amount.is_none()
    }

    pub fn validate(&self) -> StoreResult<()> {
        if let Some(quantity) = self.quantity {
            validation::positive("quantity", quantity)?;
        }
        if let Some(amount) = &self.total_amount {
            validation::non_negative_amount("total_amount", amount)?;
        }
        Ok(())
    }
}

pub fn insert(conn: &mut PgConnection, new: &NewSale) -> StoreResult<Sale> {
    new.validate()?;

    let sale = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::insert_into(sales::table)
            .values(new)
            .returning(Sale::as_returning())
            .get_result(conn)
    })?;

    debug!("inserted sale {}", sale.sale_id);
    Ok(sale)
}

pub fn insert_batch(
    conn: &mut PgConnection,
    rows: &[NewSale],
    batch_size: usize,
) -> StoreResult<usize> {
    let chunk_len = validation::chunk_len(batch_size, SALE_INSERT_COLUMNS)?;
    for row in rows {
        row.validate()?;
    }

    let inserted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let mut inserted = 0;
        for chunk in rows.chunks(chunk_len) {
            inserted += diesel::insert_into(sales::table)
                .values(chunk)
                .execute(conn)?;
        }
        Ok(inserted)
    })?;

    debug!("inserted {} sales", inserted);
    Ok(inserted)
}

pub fn find(conn: &mut PgConnection, sale_id: i32) -> StoreResult<Option<Sale>> {
    let sale = sales::table
        .find(sale_id)
        .select(Sale::as_select())
        .first(conn)
        .optional()?;
    Ok(sale)
}

pub fn get(conn: &mut PgConnection, sale_id: i32) -> StoreResult<Sale> {
    find(conn, sale_id)?.ok_or(StoreError::NotFound {
        table: SALES,
        id: sale_id,
    })
}

pub fn list(conn: &mut PgConnection, page: &Pagination) -> StoreResult<Vec<Sale>> {
    let items = sales::table
        .order(sales::sale_id.asc())
        .limit(page.limit())
        .offset(page.offset())
        .select(Sale::as_select())
        .load(conn)?;
    Ok(items)
}

/// Sales of one product, oldest first.
pub fn for_product(conn: &mut PgConnection, product_id: i32) -> StoreResult<Vec<Sale>> {
    let items = sales::table
        .filter(sales::product_id.eq(product_id))
        .order((sales::sale_date.asc(), sales::sale_id.asc()))
        .select(Sale::as_select())
        .load(conn)?;
    Ok(items)
}

/// Sales of one customer, oldest first.
pub fn for_customer(conn: &mut PgConnection, customer_id: i32) -> StoreResult<Vec<Sale>> {
    let items = sales::table
        .filter(sales::customer_id.eq(customer_id))
        .order((sales::sale_date.asc(), sales::sale_id.asc()))
        .select(Sale::as_select())
        .load(conn)?;
    Ok(items)
}

pub fn update(conn: &mut PgConnection, sale_id: i32, changes: &SaleChanges) -> StoreResult<Sale> {
    if changes.is_empty() {
        return get(conn, sale_id);
    }
    changes.validate()?;

    let updated = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::update(sales::table.find(sale_id))
            .set(changes)
            .returning(Sale::as_returning())
            .get_result(conn)
            .optional()
    })?;

    updated.ok_or(StoreError::NotFound {
        table: SALES,
        id: sale_id,
    })
}

pub fn delete(conn: &mut PgConnection, sale_id: i32) -> StoreResult<()> {
    let deleted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(sales::table.find(sale_id)).execute(conn)
    })?;

    if deleted == 0 {
        return Err(StoreError::NotFound {
            table: SALES,
            id: sale_id,
        });
    }
    debug!("deleted sale {}", sale_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_must_be_positive() {
        let sale = NewSale::new(1, 0, BigDecimal::from(10));
        let err = sale.validate().unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "quantity", .. }));
        assert!(NewSale::new(1, 2, BigDecimal::from(0)).validate().is_ok());
    }

    #[test]
    fn builder_sets_references() {
        let sale = NewSale::new(5, 1, BigDecimal::from(3))
            .for_product(10)
            .for_customer(20);
        assert_eq!(sale.product_id, Some(10));
        assert_eq!(sale.customer_id, Some(20));
        assert_eq!(sale.sale_date, None);
    }

    #[test]
    fn changes_validate_only_what_is_set() {
        assert!(SaleChanges::default().is_empty());
        let changes = SaleChanges {
            quantity: Some(-1),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        assert!(changes.validate().is_err());
    }
}
