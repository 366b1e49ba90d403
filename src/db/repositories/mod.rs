pub mod agent;
pub mod billing_event;
pub mod schedule;
pub mod usage;

use sea_orm::{DbErr, SqlErr};

/// True when `err` is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
