use switchboard_channels::{Error, Result};

/// Normalize a phone number for the Graph API: digits only.
///
/// `"+55 11 9 9999-9999"` → `"5511999999999"`. An input with no digits at
/// all is a validation error, not an empty send target.
pub fn normalize_phone(input: &str) -> Result<String> {
    let cleaned: String = input.chars().filter(char::is_ascii_digit).collect();
    if cleaned.is_empty() {
        return Err(Error::invalid_input(format!(
            "invalid phone number format: {input:?}"
        )));
    }
    Ok(cleaned)
}

/// Human-readable rendering of a normalized number.
///
/// `"5511999999999"` → `"+55 11 99999-9999"`; anything of unexpected
/// length just gets a `+` prefix.
#[must_use]
pub fn format_phone_display(phone: &str) -> String {
    let cleaned: String = phone.chars().filter(char::is_ascii_digit).collect();
    if cleaned.len() == 13 {
        format!(
            "+{} {} {}-{}",
            &cleaned[0..2],
            &cleaned[2..4],
            &cleaned[4..9],
            &cleaned[9..]
        )
    } else {
        format!("+{cleaned}")
    }
}
