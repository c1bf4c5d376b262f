use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{PRODUCTS, PRODUCT_INSERT_COLUMNS};
use crate::error::{StoreError, StoreResult};
use crate::pagination::Pagination;
use crate::schema::products;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = products, primary_key(product_id), check_for_backend(diesel::pg::Pg))]
pub struct Product {
    pub product_id: i32,
    /// Optional back-reference to a single sale.
    pub sale_id: Option<i32>,
    pub product_name: String,
    pub description: Option<String>,
    pub sku_number: Option<String>,
    pub category: Option<String>,
    pub price: BigDecimal,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert record. `None` columns take their table default
/// (`stock_quantity` becomes 0, the nullable ones NULL).
#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub product_id: i32,
    #[serde(default)]
    pub sale_id: Option<i32>,
    pub product_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sku_number: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(deserialize_with = "crate::amount::deserialize")]
    pub price: BigDecimal,
    #[serde(default)]
    pub stock_quantity: Option<i32>,
}

impl NewProduct {
    pub fn new(product_id: i32, product_name: impl Into<String>, price: BigDecimal) -> Self {
        NewProduct {
            product_id,
            sale_id: None,
            product_name: product_name.into(),
            description: None,
            sku_number: None,
            category: None,
            price,
            stock_quantity: None,
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        validation::not_blank("product_name", &self.product_name)?;
        validation::max_len("description", self.description.as_deref(), 500)?;
        validation::max_len("category", self.category.as_deref(), 100)?;
        validation::max_len("sku_number", self.sku_number.as_deref(), 100)?;
        validation::non_negative_amount("price", &self.price)?;
        if let Some(stock) = self.stock_quantity {
            validation::non_negative("stock_quantity", stock)?;
        }
        Ok(())
    }
}

/// Partial update. Outer `None` leaves a column alone, `Some(None)` clears a
/// nullable one.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductChanges {
    pub sale_id: Option<Option<i32>>,
    pub product_name: Option<String>,
    pub description: Option<Option<String>>,
    pub sku_number: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub price: Option<BigDecimal>,
    pub stock_quantity: Option<i32>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.sale_id.is_none()
            && self.product_name.is_none()
            && self.description.is_none()
            && self.sku_number.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.stock_quantity.is_none()
    }

    pub fn validate(&self) -> StoreResult<()> {
        if let Some(name) = &self.product_name {
            validation::not_blank("product_name", name)?;
        }
        validation::max_len("description", validation::new_text(&self.description), 500)?;
        validation::max_len("category", validation::new_text(&self.category), 100)?;
        validation::max_len("sku_number", validation::new_text(&self.sku_number), 100)?;
        if let Some(price) = &self.price {
            validation::non_negative_amount("price", price)?;
        }
        if let Some(stock) = self.stock_quantity {
            validation::non_negative("stock_quantity", stock)?;
        }
        Ok(())
    }
}

pub fn insert(conn: &mut PgConnection, new: &NewProduct) -> StoreResult<Product> {
    new.validate()?;

    let product = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::insert_into(products::table)
            .values(new)
            .returning(Product::as_returning())
            .get_result(conn)
    })?;

    debug!("inserted product {}", product.product_id);
    Ok(product)
}

/// Inserts all rows or none, at most `batch_size` rows per statement.
pub fn insert_batch(
    conn: &mut PgConnection,
    rows: &[NewProduct],
    batch_size: usize,
) -> StoreResult<usize> {
    let chunk_len = validation::chunk_len(batch_size, PRODUCT_INSERT_COLUMNS)?;
    for row in rows {
        row.validate()?;
    }

    let inserted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let mut inserted = 0;
        for chunk in rows.chunks(chunk_len) {
            inserted += diesel::insert_into(products::table)
                .values(chunk)
                .execute(conn)?;
        }
        Ok(inserted)
    })?;

    debug!("inserted {} products", inserted);
    Ok(inserted)
}

pub fn find(conn: &mut PgConnection, product_id: i32) -> StoreResult<Option<Product>> {
    let product = products::table
        .find(product_id)
        .select(Product::as_select())
        .first(conn)
        .optional()?;
    Ok(product)
}

pub fn get(conn: &mut PgConnection, product_id: i32) -> StoreResult<Product> {
    find(conn, product_id)?.ok_or(StoreError::NotFound {
        table: PRODUCTS,
        id: product_id,
    })
}

pub fn find_by_sku(conn: &mut PgConnection, sku: &str) -> StoreResult<Option<Product>> {
    let product = products::table
        .filter(products::sku_number.eq(sku))
        .select(Product::as_select())
        .first(conn)
        .optional()?;
    Ok(product)
}

pub fn list(conn: &mut PgConnection, page: &Pagination) -> StoreResult<Vec<Product>> {
    let items = products::table
        .order(products::product_id.asc())
        .limit(page.limit())
        .offset(page.offset())
        .select(Product::as_select())
        .load(conn)?;
    Ok(items)
}

/// Applies `changes`; the table trigger refreshes `updated_at`.
pub fn update(
    conn: &mut PgConnection,
    product_id: i32,
    changes: &ProductChanges,
) -> StoreResult<Product> {
    if changes.is_empty() {
        return get(conn, product_id);
    }
    changes.validate()?;

    let updated = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::update(products::table.find(product_id))
            .set(changes)
            .returning(Product::as_returning())
            .get_result(conn)
            .optional()
    })?;

    updated.ok_or(StoreError::NotFound {
        table: PRODUCTS,
        id: product_id,
    })
}

/// Fails with `ReferentialIntegrity` while a sale still points at the product.
pub fn delete(conn: &mut PgConnection, product_id: i32) -> StoreResult<()> {
    let deleted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(products::table.find(product_id))
            .execute(conn)
    })?;

    if deleted == 0 {
        return Err(StoreError::NotFound {
            table: PRODUCTS,
            id: product_id,
        });
    }
    debug!("deleted product {}", product_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn price(v: &str) -> BigDecimal {
        BigDecimal::from_str(v).unwrap()
    }

    fn rejected_field(p: &NewProduct) -> &'static str {
        match p.validate() {
            Err(StoreError::Validation { field, .. }) => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn new_product_leaves_defaults_to_storage() {
        let p = NewProduct::new(1, "Widget", price("9.99"));
        assert_eq!(p.stock_quantity, None);
        assert_eq!(p.sku_number, None);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn negative_price_or_stock_is_rejected() {
        let mut p = NewProduct::new(1, "Widget", price("-1.00"));
        assert_eq!(rejected_field(&p), "price");

        p.price = price("0");
        p.stock_quantity = Some(-3);
        assert_eq!(rejected_field(&p), "stock_quantity");
    }

    #[test]
    fn oversized_text_is_rejected() {
        let mut p = NewProduct::new(1, "Widget", price("1"));
        p.sku_number = Some("x".repeat(101));
        assert_eq!(rejected_field(&p), "sku_number");
    }

    #[test]
    fn price_beyond_cents_is_rejected() {
        let mut p = NewProduct::new(1, "Widget", price("9.999"));
        assert_eq!(rejected_field(&p), "price");

        p.price = price("9.990");
        assert!(p.validate().is_ok());

        let changes = ProductChanges {
            price: Some(price("0.001")),
            ..Default::default()
        };
        assert!(changes.validate().is_err());
    }

    #[test]
    fn changes_track_emptiness() {
        assert!(ProductChanges::default().is_empty());

        let clear_sku = ProductChanges {
            sku_number: Some(None),
            ..Default::default()
        };
        assert!(!clear_sku.is_empty());
        assert!(clear_sku.validate().is_ok());
    }

    #[test]
    fn deserializes_insert_records() {
        let rows: Vec<NewProduct> = serde_json::from_str(
            r#"[{"product_id": 7, "product_name": "Lamp", "price": "12.50", "sku_number": "LMP-7"}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].product_id, 7);
        assert_eq!(rows[0].price, price("12.50"));
        assert_eq!(rows[0].stock_quantity, None);
        assert_eq!(rows[0].sku_number.as_deref(), Some("LMP-7"));
    }
}
