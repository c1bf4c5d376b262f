use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{CUSTOMERS, CUSTOMER_INSERT_COLUMNS};
use crate::error::{StoreError, StoreResult};
use crate::schema::customers;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = customers, primary_key(customer_id), check_for_backend(diesel::pg::Pg))]
pub struct Customer {
    pub customer_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = customers)]
pub struct NewCustomer {
    pub customer_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewCustomer {
    pub fn new(
        customer_id: i32,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        NewCustomer {
            customer_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            phone_number: None,
            address: None,
            city: None,
            is_active: None,
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        validation::not_blank("first_name", &self.first_name)?;
        validation::not_blank("last_name", &self.last_name)?;
        validate_email(&self.email)?;
        validation::max_len("phone_number", self.phone_number.as_deref(), 20)?;
        validation::max_len("address", self.address.as_deref(), 255)?;
        validation::max_len("city", self.city.as_deref(), 100)
    }
}

fn validate_email(email: &str) -> StoreResult<()> {
    validation::max_len("email", Some(email), 255)?;
    if !email.contains('@') {
        return Err(StoreError::validation("email", "missing `@`"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = customers)]
pub struct CustomerChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl CustomerChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.is_active.is_none()
    }

    pub fn validate(&self) -> StoreResult<()> {
        if let Some(name) = &self.first_name {
            validation::not_blank("first_name", name)?;
        }
        if let Some(name) = &self.last_name {
            validation::not_blank("last_name", name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        validation::max_len("phone_number", validation::new_text(&self.phone_number), 20)?;
        validation::max_len("address", validation::new_text(&self.address), 255)?;
        validation::max_len("city", validation::new_text(&self.city), 100)
    }
}

pub fn insert(conn: &mut PgConnection, new: &NewCustomer) -> StoreResult<Customer> {
    new.validate()?;

    let customer = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::insert_into(customers::table)
            .values(new)
            .returning(Customer::as_returning())
            .get_result(conn)
    })?;

    debug!("inserted customer {}", customer.customer_id);
    Ok(customer)
}

pub fn insert_batch(
    conn: &mut PgConnection,
    rows: &[NewCustomer],
    batch_size: usize,
) -> StoreResult<usize> {
    let chunk_len = validation::chunk_len(batch_size, CUSTOMER_INSERT_COLUMNS)?;
    for row in rows {
        row.validate()?;
    }

    let inserted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let mut inserted = 0;
        for chunk in rows.chunks(chunk_len) {
            inserted += diesel::insert_into(customers::table)
                .values(chunk)
                .execute(conn)?;
        }
        Ok(inserted)
    })?;

    debug!("inserted {} customers", inserted);
    Ok(inserted)
}

pub fn find(conn: &mut PgConnection, customer_id: i32) -> StoreResult<Option<Customer>> {
    let customer = customers::table
        .find(customer_id)
        .select(Customer::as_select())
        .first(conn)
        .optional()?;
    Ok(customer)
}

pub fn get(conn: &mut PgConnection, customer_id: i32) -> StoreResult<Customer> {
    find(conn, customer_id)?.ok_or(StoreError::NotFound {
        table: CUSTOMERS,
        id: customer_id,
    })
}

pub fn update(
    conn: &mut PgConnection,
    customer_id: i32,
    changes: &CustomerChanges,
) -> StoreResult<Customer> {
    if changes.is_empty() {
        return get(conn, customer_id);
    }
    changes.validate()?;

    let updated = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::update(customers::table.find(customer_id))
            .set(changes)
            .returning(Customer::as_returning())
            .get_result(conn)
            .optional()
    })?;

    updated.ok_or(StoreError::NotFound {
        table: CUSTOMERS,
        id: customer_id,
    })
}

pub fn delete(conn: &mut PgConnection, customer_id: i32) -> StoreResult<()> {
    let deleted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(customers::table.find(customer_id))
            .execute(conn)
    })?;

    if deleted == 0 {
        return Err(StoreError::NotFound {
            table: CUSTOMERS,
            id: customer_id,
        });
    }
    debug!("deleted customer {}", customer_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_needs_an_at_sign() {
        let c = NewCustomer::new(1, "Ada", "Lovelace", "ada.example.com");
        let err = c.validate().unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "email", .. }));

        let ok = NewCustomer::new(1, "Ada", "Lovelace", "ada@example.com");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn long_phone_number_is_rejected() {
        let changes = CustomerChanges {
            phone_number: Some(Some("0".repeat(21))),
            ..Default::default()
        };
        assert!(changes.validate().is_err());
    }
}
