//! TDS values to JSON

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};
use tiberius::{ColumnData, FromSql, Row};

/// Convert every cell of a row
pub fn row_to_json(row: Row) -> Vec<Value> {
    row.into_iter().map(|cell| cell_to_json(&cell)).collect()
}

/// Convert one TDS value
///
/// Decimals stay strings to avoid float rounding; date and time types are
/// ISO-8601; binary payloads are summarised rather than dumped.
pub fn cell_to_json(data: &ColumnData<'static>) -> Value {
    match data {
        ColumnData::U8(v) => json!(v),
        ColumnData::I16(v) => json!(v),
        ColumnData::I32(v) => json!(v),
        ColumnData::I64(v) => json!(v),
        ColumnData::F32(v) => json!(v),
        ColumnData::F64(v) => json!(v),
        ColumnData::Bit(v) => json!(v),
        ColumnData::String(v) => v
            .as_ref()
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Guid(v) => v
            .as_ref()
            .map(|g| Value::String(g.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Numeric(v) => v
            .as_ref()
            .map(|n| Value::String(n.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Binary(v) => v
            .as_ref()
            .map(|b| Value::String(format!("<binary {} bytes>", b.len())))
            .unwrap_or(Value::Null),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|x| Value::String((**x).clone().into_string()))
            .unwrap_or(Value::Null),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            render::<NaiveDateTime>(data, |dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }
        ColumnData::Date(_) => render::<NaiveDate>(data, |d| d.format("%Y-%m-%d").to_string()),
        ColumnData::Time(_) => render::<NaiveTime>(data, |t| t.format("%H:%M:%S%.f").to_string()),
        ColumnData::DateTimeOffset(_) => {
            render::<DateTime<FixedOffset>>(data, |dt| dt.to_rfc3339())
        }
        #[allow(unreachable_patterns)]
        _ => Value::Null,
    }
}

fn render<'a, T>(data: &'a ColumnData<'static>, f: impl Fn(T) -> String) -> Value
where
    T: FromSql<'a>,
{
    match T::from_sql(data) {
        Ok(Some(value)) => Value::String(f(value)),
        Ok(None) => Value::Null,
        Err(e) => {
            tracing::debug!("could not convert temporal value: {}", e);
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use tiberius::{IntoSql, Uuid};

    #[test]
    fn test_scalars() {
        assert_eq!(cell_to_json(&ColumnData::I32(Some(42))), json!(42));
        assert_eq!(cell_to_json(&ColumnData::I64(None)), Value::Null);
        assert_eq!(cell_to_json(&ColumnData::Bit(Some(true))), json!(true));
        assert_eq!(cell_to_json(&ColumnData::F64(Some(1.5))), json!(1.5));
        assert_eq!(
            cell_to_json(&ColumnData::String(Some(Cow::Borrowed("Contoso")))),
            json!("Contoso")
        );
    }

    #[test]
    fn test_guid_and_binary() {
        let id = Uuid::nil();
        assert_eq!(
            cell_to_json(&ColumnData::Guid(Some(id))),
            json!("00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(
            cell_to_json(&ColumnData::Binary(Some(Cow::Owned(vec![0u8; 16])))),
            json!("<binary 16 bytes>")
        );
    }

    #[test]
    fn test_datetime2() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let data = dt.into_sql();
        assert_eq!(cell_to_json(&data), json!("2024-03-01T12:30:00"));
    }

    #[test]
    fn test_date() {
        let data = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap().into_sql();
        assert_eq!(cell_to_json(&data), json!("2023-12-31"));
    }
}
