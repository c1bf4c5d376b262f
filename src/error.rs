use diesel::r2d2::PoolError;
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::constants::PRODUCTS_SKU_UNIQUE;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate primary key in `{table}`: {message}")]
    DuplicateKey { table: String, message: String },

    #[error("sku_number already in use: {message}")]
    DuplicateSku { message: String },

    #[error("unique constraint `{constraint}` violated: {message}")]
    UniqueViolation { constraint: String, message: String },

    #[error("referential integrity violated ({constraint}): {message}")]
    ReferentialIntegrity { constraint: String, message: String },

    #[error("no row in `{table}` with id {id}")]
    NotFound { table: &'static str, id: i32 },

    #[error("invalid `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("connection pool: {0}")]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(DieselError),
}

impl StoreError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicateKey { .. }
                | StoreError::DuplicateSku { .. }
                | StoreError::UniqueViolation { .. }
                | StoreError::ReferentialIntegrity { .. }
        )
    }
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(kind, info) => match classify(&kind, &*info) {
                Some(classified) => classified,
                None => StoreError::Database(DieselError::DatabaseError(kind, info)),
            },
            other => StoreError::Database(other),
        }
    }
}

fn classify(kind: &DatabaseErrorKind, info: &dyn DatabaseErrorInformation) -> Option<StoreError> {
    let constraint = info.constraint_name().unwrap_or_default().to_string();
    let message = info.message().to_string();

    match kind {
        DatabaseErrorKind::UniqueViolation if constraint.ends_with("_pkey") => {
            let table = info
                .table_name()
                .map(str::to_string)
                .unwrap_or_else(|| constraint.trim_end_matches("_pkey").to_string());
            Some(StoreError::DuplicateKey { table, message })
        }
        DatabaseErrorKind::UniqueViolation if constraint == PRODUCTS_SKU_UNIQUE => {
            Some(StoreError::DuplicateSku { message })
        }
        DatabaseErrorKind::UniqueViolation => Some(StoreError::UniqueViolation {
            constraint,
            message,
        }),
        DatabaseErrorKind::ForeignKeyViolation => Some(StoreError::ReferentialIntegrity {
            constraint,
            message,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeInfo {
        table: Option<&'static str>,
        constraint: Option<&'static str>,
    }

    impl DatabaseErrorInformation for FakeInfo {
        fn message(&self) -> &str {
            "constraint failed"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            self.table
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn db_error(
        kind: DatabaseErrorKind,
        table: Option<&'static str>,
        constraint: Option<&'static str>,
    ) -> StoreError {
        DieselError::DatabaseError(kind, Box::new(FakeInfo { table, constraint })).into()
    }

    #[test]
    fn primary_key_collision_is_duplicate_key() {
        let err = db_error(
            DatabaseErrorKind::UniqueViolation,
            Some("products"),
            Some("products_pkey"),
        );
        match err {
            StoreError::DuplicateKey { table, .. } => assert_eq!(table, "products"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn table_falls_back_to_constraint_prefix() {
        let err = db_error(DatabaseErrorKind::UniqueViolation, None, Some("sales_pkey"));
        assert!(matches!(err, StoreError::DuplicateKey { ref table, .. } if table == "sales"));
    }

    #[test]
    fn sku_collision_is_duplicate_sku() {
        let err = db_error(
            DatabaseErrorKind::UniqueViolation,
            Some("products"),
            Some(PRODUCTS_SKU_UNIQUE),
        );
        assert!(matches!(err, StoreError::DuplicateSku { .. }));
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn other_unique_constraints_keep_their_name() {
        let err = db_error(
            DatabaseErrorKind::UniqueViolation,
            Some("customers"),
            Some("customers_email_key"),
        );
        assert!(matches!(
            err,
            StoreError::UniqueViolation { ref constraint, .. }
                if constraint == "customers_email_key"
        ));
    }

    #[test]
    fn foreign_key_violation_is_referential_integrity() {
        let err = db_error(
            DatabaseErrorKind::ForeignKeyViolation,
            Some("sales"),
            Some("sales_product_id_fkey"),
        );
        assert!(matches!(
            err,
            StoreError::ReferentialIntegrity { ref constraint, .. }
                if constraint == "sales_product_id_fkey"
        ));
    }

    #[test]
    fn unrelated_errors_pass_through() {
        let err: StoreError = DieselError::NotFound.into();
        assert!(matches!(err, StoreError::Database(DieselError::NotFound)));
        assert!(!err.is_constraint_violation());

        let err = db_error(DatabaseErrorKind::SerializationFailure, None, None);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
