use crate::error::{KintreeError, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// Wire format for dates of birth.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Payload for POST /persons
#[derive(Debug, Deserialize)]
pub struct CreatePersonRequest {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    /// `YYYY-MM-DD`; validated by the handler, not by serde.
    pub dob: String,
}

/// Payload for PUT /persons/{id}; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePersonRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
}

/// Payload for POST /relations and DELETE /relations
#[derive(Debug, Deserialize)]
pub struct RelationRequest {
    pub parent_id: i64,
    pub child_id: i64,
}

/// Parse a date-of-birth string from a request payload
pub fn parse_dob(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
        KintreeError::InvalidInput("Invalid date format, use YYYY-MM-DD".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dob_valid() {
        let dob = parse_dob("1984-02-29").unwrap();
        assert_eq!(dob, NaiveDate::from_ymd_opt(1984, 2, 29).unwrap());
    }

    #[test]
    fn test_parse_dob_rejects_bad_format() {
        assert!(parse_dob("29/02/1984").is_err());
        assert!(parse_dob("not-a-date").is_err());
        // 2023 is not a leap year
        assert!(parse_dob("2023-02-29").is_err());
    }
}
