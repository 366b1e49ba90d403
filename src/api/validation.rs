use std::str::FromStr;

use super::ApiError;
use crate::domain::{InsuranceFocus, PostId, ScheduleId, Tone, parse_focus_list};

pub fn validate_schedule_id(id: i32) -> Result<ScheduleId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid schedule ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(ScheduleId::new(id))
}

pub fn validate_post_id(id: i32) -> Result<PostId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid post ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(PostId::new(id))
}

pub fn validate_focus_list(values: &[String]) -> Result<Vec<InsuranceFocus>, ApiError> {
    parse_focus_list(values).map_err(|e| ApiError::validation(e.to_string()))
}

pub fn validate_tone(value: &str) -> Result<Tone, ApiError> {
    Tone::from_str(value.trim()).map_err(|e| ApiError::validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ids() {
        assert_eq!(validate_schedule_id(4).unwrap(), ScheduleId::new(4));
        assert!(validate_schedule_id(0).is_err());
        assert!(validate_post_id(-1).is_err());
        assert_eq!(validate_post_id(9).unwrap(), PostId::new(9));
    }

    #[test]
    fn test_validate_enums() {
        assert_eq!(validate_tone(" urgent ").unwrap(), Tone::Urgent);
        assert!(validate_tone("grumpy").is_err());

        let parsed = validate_focus_list(&["annuities".to_string()]).unwrap();
        assert_eq!(parsed, vec![InsuranceFocus::Annuities]);
        let err = validate_focus_list(&["pet_insurance".to_string()]).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }
}
