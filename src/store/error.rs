use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Phone number already registered")]
    DuplicatePhone,

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::DuplicatePhone => "Conflict",
            _ => "Internal",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            StoreError::DuplicatePhone => 409,
            StoreError::Unavailable(_) => 503,
            StoreError::Database(_) | StoreError::Corrupt(_) => 500,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error()
            && db_err.is_unique_violation()
            && db_err.constraint() == Some(super::postgres::schema::DRIVER_PHONE_INDEX)
        {
            return StoreError::DuplicatePhone;
        }
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(e.to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(err.http_status(), 503);
    }

    #[test]
    fn test_row_not_found_is_database() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(_)));
        assert_eq!(err.code(), "Internal");
    }

    #[test]
    fn test_duplicate_phone_maps_to_conflict() {
        assert_eq!(StoreError::DuplicatePhone.code(), "Conflict");
        assert_eq!(StoreError::DuplicatePhone.http_status(), 409);
    }
}
