// Row -> Record decoding for both stores.
//
// Columns are decoded by their reported type name. Anything unrecognized is
// read as text; a column that cannot even be read as text is a decode error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::types::Uuid;
use sqlx::{Column, Row, TypeInfo};

use ent_reconcile::{Record, StoreError, StoreKind, Value};

fn midnight(d: NaiveDate) -> Option<NaiveDateTime> {
    d.and_hms_opt(0, 0, 0)
}

fn decode_error(store: StoreKind, column: &str, type_name: &str, e: sqlx::Error) -> StoreError {
    StoreError::Decode {
        store,
        message: format!("column '{column}' ({type_name}): {e}"),
    }
}

pub fn decode_pg_row(row: &PgRow) -> Result<Record, StoreError> {
    let mut fields = Vec::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let type_name = column.type_info().name();
        let value = match type_name {
            "BOOL" => row.try_get::<Option<bool>, _>(idx).map(Value::from),
            "INT2" => row
                .try_get::<Option<i16>, _>(idx)
                .map(|v| Value::from(v.map(i64::from))),
            "INT4" => row.try_get::<Option<i32>, _>(idx).map(Value::from),
            "INT8" => row.try_get::<Option<i64>, _>(idx).map(Value::from),
            "TIMESTAMP" => row.try_get::<Option<NaiveDateTime>, _>(idx).map(Value::from),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)
                .map(|v| Value::from(v.map(|ts| ts.naive_utc()))),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(idx)
                .map(|v| Value::from(v.and_then(midnight))),
            "UUID" => row
                .try_get::<Option<Uuid>, _>(idx)
                .map(|v| Value::from(v.map(|u| u.simple().to_string()))),
            _ => row.try_get::<Option<String>, _>(idx).map(Value::from),
        }
        .map_err(|e| decode_error(StoreKind::Analytics, column.name(), type_name, e))?;
        fields.push((column.name().to_string(), value));
    }
    Ok(fields.into_iter().collect())
}

pub fn decode_mysql_row(row: &MySqlRow) -> Result<Record, StoreError> {
    let mut fields = Vec::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let type_name = column.type_info().name();
        let value = match type_name {
            // TINYINT(1)
            "BOOLEAN" => row.try_get::<Option<bool>, _>(idx).map(Value::from),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                row.try_get::<Option<i64>, _>(idx).map(Value::from)
            }
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => row
                .try_get::<Option<u32>, _>(idx)
                .map(|v| Value::from(v.map(i64::from))),
            "BIGINT UNSIGNED" => {
                let raw = row
                    .try_get::<Option<u64>, _>(idx)
                    .map_err(|e| decode_error(StoreKind::Transactional, column.name(), type_name, e))?;
                match raw.map(i64::try_from).transpose() {
                    Ok(v) => Ok(Value::from(v)),
                    Err(_) => {
                        return Err(StoreError::Decode {
                            store: StoreKind::Transactional,
                            message: format!("column '{}' overflows i64", column.name()),
                        })
                    }
                }
            }
            "DATETIME" => row.try_get::<Option<NaiveDateTime>, _>(idx).map(Value::from),
            "TIMESTAMP" => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)
                .map(|v| Value::from(v.map(|ts| ts.naive_utc()))),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(idx)
                .map(|v| Value::from(v.and_then(midnight))),
            _ => row.try_get::<Option<String>, _>(idx).map(Value::from),
        }
        .map_err(|e| decode_error(StoreKind::Transactional, column.name(), type_name, e))?;
        fields.push((column.name().to_string(), value));
    }
    Ok(fields.into_iter().collect())
}
