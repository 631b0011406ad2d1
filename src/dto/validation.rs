//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::tournament::Settings;

const MAX_IDENTIFIER_LEN: usize = 64;

/// Validates tournament settings: between 1 and 99 rounds per match, and a correct answer
/// must be worth at least one point so a match can always be decided.
pub fn validate_settings(settings: &Settings) -> Result<(), ValidationError> {
    if settings.best_of == 0 || settings.best_of > 99 {
        let mut err = ValidationError::new("best_of_range");
        err.message = Some("bestOf must be between 1 and 99".into());
        return Err(err);
    }

    if settings.scoring.per_correct == 0 {
        let mut err = ValidationError::new("per_correct_zero");
        err.message = Some("scoring.perCorrect must be at least 1".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a match or team identifier: non-blank, at most 64 characters, no control
/// characters.
///
/// # Examples
///
/// ```ignore
/// validate_identifier("sf1")        // Ok
/// validate_identifier("   ")        // Err - blank
/// validate_identifier("g1\n")       // Err - control character
/// ```
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("identifier_blank");
        err.message = Some("Identifier must not be blank".into());
        return Err(err);
    }

    if id.chars().count() > MAX_IDENTIFIER_LEN {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some(
            format!("Identifier must be at most {MAX_IDENTIFIER_LEN} characters").into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_control) {
        let mut err = ValidationError::new("identifier_format");
        err.message = Some("Identifier must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a sound cue name such as `correct`, `round:win` or `buzzer_2`.
pub fn validate_sfx_event(event: &str) -> Result<(), ValidationError> {
    if event.is_empty() || event.len() > 32 {
        let mut err = ValidationError::new("sfx_length");
        err.message = Some("Sound cue must be between 1 and 32 characters".into());
        return Err(err);
    }

    if !event
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | ':'))
    {
        let mut err = ValidationError::new("sfx_format");
        err.message =
            Some("Sound cue may only use lowercase letters, digits, `_`, `-` and `:`".into());
        return Err(err);
    }

    Ok(())
}
