//! Condition parsing
//!
//! Parses JSON condition lists (as sent in tool arguments) with size limits.

use crate::core::constants::{MAX_CONDITIONS, MAX_CONDITION_JSON_SIZE};
use crate::data::error::StoreError;

use super::types::FilterCondition;

/// Parse conditions from a JSON array string
pub fn parse_conditions(json_str: &str) -> Result<Vec<FilterCondition>, StoreError> {
    if json_str.len() > MAX_CONDITION_JSON_SIZE {
        return Err(StoreError::FilterJsonTooLarge {
            max_bytes: MAX_CONDITION_JSON_SIZE,
        });
    }

    let conditions: Vec<FilterCondition> =
        serde_json::from_str(json_str).map_err(|e| StoreError::InvalidFilterJson(e.to_string()))?;

    check_condition_count(&conditions)?;
    Ok(conditions)
}

pub fn check_condition_count(conditions: &[FilterCondition]) -> Result<(), StoreError> {
    if conditions.len() > MAX_CONDITIONS {
        return Err(StoreError::TooManyConditions {
            max: MAX_CONDITIONS,
        });
    }
    Ok(())
}
