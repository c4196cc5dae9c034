//! Validation of client-supplied payloads.
//!
//! The entry description is a tagged value: with prompts configured it must
//! be a JSON array of responses, and without prompts it must be free text
//! that could not be mistaken for the other shape. Validation picks the
//! representation from the queue configuration and refuses the ambiguous
//! cases outright.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::policy::{HALF_HOURS_PER_DAY, SLOT_CLOSED, SLOT_OPEN, SLOT_PRIORITY};

/// Maximum character limits for queue entry fields.
pub const MAX_DESCRIPTION_LENGTH: usize = 1500;
pub const MAX_LOCATION_LENGTH: usize = 300;

/// Number of schedule day strings in a week upload.
pub const DAYS_PER_WEEK: usize = 7;

/// Validate an entry description against the configured prompts.
pub fn validate_description(description: &str, prompts: &[String]) -> Result<(), CoreError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "description is too long (max {MAX_DESCRIPTION_LENGTH} characters)"
        )));
    }

    let as_responses: Result<Vec<String>, _> = serde_json::from_str(description);

    if !prompts.is_empty() {
        let responses = as_responses.map_err(|_| {
            CoreError::Validation(
                "got description in an unexpected format; try clearing your cache and refreshing"
                    .to_string(),
            )
        })?;

        if responses.len() != prompts.len() {
            return Err(CoreError::Validation(format!(
                "wrong number of prompt responses: expected {}, got {}",
                prompts.len(),
                responses.len()
            )));
        }

        for (i, response) in responses.iter().enumerate() {
            if response.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "empty response for prompt #{}: {}",
                    i + 1,
                    prompts[i]
                )));
            }
        }

        return Ok(());
    }

    // Free-text mode: refuse anything that parses as the prompt shape, or as
    // a JSON object, so the two representations stay unambiguous.
    if as_responses.is_ok() {
        return Err(CoreError::Validation(
            "a JSON array is not allowed as a description".to_string(),
        ));
    }
    if serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(description).is_ok() {
        return Err(CoreError::Validation(
            "a JSON object is not allowed as a description".to_string(),
        ));
    }

    Ok(())
}

/// Enforce the location length cap. Content is not checked; it may be a
/// free-form map position.
pub fn validate_location(location: &str) -> Result<(), CoreError> {
    if location.chars().count() > MAX_LOCATION_LENGTH {
        return Err(CoreError::Validation(format!(
            "location is too long (max {MAX_LOCATION_LENGTH} characters)"
        )));
    }
    Ok(())
}

/// Parse the stored prompts column into the configured prompt list.
pub fn parse_prompts(prompts: &serde_json::Value) -> Result<Vec<String>, CoreError> {
    serde_json::from_value(prompts.clone())
        .map_err(|_| CoreError::Validation("invalid prompts format".to_string()))
}

/// Validate a prompts value uploaded as part of a configuration update:
/// it must be a list of strings with no duplicates.
pub fn validate_prompts(prompts: &serde_json::Value) -> Result<Vec<String>, CoreError> {
    let list = parse_prompts(prompts)?;

    let unique: HashSet<&String> = list.iter().collect();
    if unique.len() != list.len() {
        return Err(CoreError::Validation(
            "prompts contain duplicates".to_string(),
        ));
    }

    Ok(list)
}

/// Validate a full-week schedule upload: seven strings of 48 slot
/// characters each.
pub fn validate_schedule_week(days: &[String]) -> Result<(), CoreError> {
    if days.len() != DAYS_PER_WEEK {
        return Err(CoreError::Validation(format!(
            "expected {DAYS_PER_WEEK} schedule days, got {}",
            days.len()
        )));
    }

    for (day, schedule) in days.iter().enumerate() {
        if schedule.len() != HALF_HOURS_PER_DAY {
            return Err(CoreError::Validation(format!(
                "schedule for day {day} must be {HALF_HOURS_PER_DAY} characters long"
            )));
        }
        if schedule
            .bytes()
            .any(|c| !matches!(c, SLOT_OPEN | SLOT_CLOSED | SLOT_PRIORITY))
        {
            return Err(CoreError::Validation(format!(
                "schedule for day {day} may only contain 'o', 'c', and 'p'"
            )));
        }
    }

    Ok(())
}

/// Validate a groups upload: no email may appear in two groups.
pub fn validate_groups(groups: &[Vec<String>]) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for group in groups {
        for email in group {
            if !seen.insert(email.as_str()) {
                return Err(CoreError::Validation(format!(
                    "{email} appears in more than one group"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // -- Free-text mode ----------------------------------------------------

    #[test]
    fn free_text_passes_without_prompts() {
        assert!(validate_description("segfault in part 3", &[]).is_ok());
    }

    #[test]
    fn free_text_may_look_numeric() {
        // Parses as JSON, but not as an array or object, so it is fine.
        assert!(validate_description("42", &[]).is_ok());
    }

    #[test]
    fn json_array_rejected_without_prompts() {
        assert!(validate_description(r#"["a", "b"]"#, &[]).is_err());
    }

    #[test]
    fn json_object_rejected_without_prompts() {
        assert!(validate_description(r#"{"q": "a"}"#, &[]).is_err());
    }

    #[test]
    fn mixed_type_array_is_treated_as_free_text() {
        // Not a string array, so it cannot be confused for prompt responses.
        assert!(validate_description(r#"["a", 1]"#, &[]).is_ok());
    }

    // -- Prompt mode -------------------------------------------------------

    #[test]
    fn matching_responses_pass() {
        let p = prompts(&["What?", "Where?"]);
        assert!(validate_description(r#"["it crashes", "lab 4"]"#, &p).is_ok());
    }

    #[test]
    fn wrong_response_count_names_expected_and_got() {
        let p = prompts(&["A", "B"]);
        let err = validate_description(r#"["only one"]"#, &p).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected 2"), "message was: {msg}");
        assert!(msg.contains("got 1"), "message was: {msg}");
    }

    #[test]
    fn blank_response_names_the_prompt() {
        let p = prompts(&["What?", "Where?"]);
        let err = validate_description(r#"["fine", "   "]"#, &p).unwrap_err();
        assert!(err.to_string().contains("prompt #2"));
        assert!(err.to_string().contains("Where?"));
    }

    #[test]
    fn non_array_rejected_with_prompts() {
        let p = prompts(&["What?"]);
        assert!(validate_description("just text", &p).is_err());
    }

    #[test]
    fn prompt_responses_round_trip() {
        let p = prompts(&["a", "b", "c"]);
        let responses = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let encoded = serde_json::to_string(&responses).unwrap();

        assert!(validate_description(&encoded, &p).is_ok());
        let decoded: Vec<String> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, responses);
    }

    // -- Length caps -------------------------------------------------------

    #[test]
    fn overlong_description_rejected() {
        let long = "x".repeat(MAX_DESCRIPTION_LENGTH + 1);
        assert!(validate_description(&long, &[]).is_err());
    }

    #[test]
    fn description_at_the_cap_passes() {
        let exact = "x".repeat(MAX_DESCRIPTION_LENGTH);
        assert!(validate_description(&exact, &[]).is_ok());
    }

    #[test]
    fn overlong_location_rejected() {
        let long = "x".repeat(MAX_LOCATION_LENGTH + 1);
        assert!(validate_location(&long).is_err());
        assert!(validate_location("desk 12").is_ok());
    }

    // -- Prompts configuration ---------------------------------------------

    #[test]
    fn duplicate_prompts_rejected() {
        let value = serde_json::json!(["What?", "What?"]);
        assert!(validate_prompts(&value).is_err());
    }

    #[test]
    fn distinct_prompts_accepted() {
        let value = serde_json::json!(["What?", "Where?"]);
        assert_eq!(validate_prompts(&value).unwrap().len(), 2);
    }

    #[test]
    fn non_list_prompts_rejected() {
        let value = serde_json::json!({"not": "a list"});
        assert!(validate_prompts(&value).is_err());
    }

    // -- Schedule ----------------------------------------------------------

    #[test]
    fn valid_week_passes() {
        let week = vec!["c".repeat(48); 7];
        assert!(validate_schedule_week(&week).is_ok());
    }

    #[test]
    fn wrong_day_count_rejected() {
        let week = vec!["c".repeat(48); 6];
        assert!(validate_schedule_week(&week).is_err());
    }

    #[test]
    fn wrong_length_rejected() {
        let mut week = vec!["c".repeat(48); 7];
        week[3] = "c".repeat(47);
        assert!(validate_schedule_week(&week).is_err());
    }

    #[test]
    fn unknown_slot_character_rejected() {
        let mut week = vec!["c".repeat(48); 7];
        week[0] = format!("x{}", "c".repeat(47));
        assert!(validate_schedule_week(&week).is_err());
    }

    // -- Groups ------------------------------------------------------------

    #[test]
    fn disjoint_groups_pass() {
        let groups = vec![
            vec!["a@x.edu".to_string(), "b@x.edu".to_string()],
            vec!["c@x.edu".to_string()],
        ];
        assert!(validate_groups(&groups).is_ok());
    }

    #[test]
    fn email_in_two_groups_rejected() {
        let groups = vec![
            vec!["a@x.edu".to_string()],
            vec!["b@x.edu".to_string(), "a@x.edu".to_string()],
        ];
        assert!(validate_groups(&groups).is_err());
    }
}
