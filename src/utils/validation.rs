use crate::utils::error::{BridgeError, Result};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

static BIRTH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0[1-9]|1[0-2])/([0-2][0-9]|3[01])/\d{4}$").expect("birth date pattern")
});
static MOBILE_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d{3}\) \d{3}-\d{4}$").expect("phone pattern"));
static COUNTRY_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("country pattern"));
static POSTAL_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}$").expect("postal code pattern"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email pattern")
});

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(BridgeError::validation(field_name, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(BridgeError::validation(
                field_name,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(BridgeError::validation(
            field_name,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BridgeError::validation(
            field_name,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(BridgeError::validation(
            field_name,
            format!("Value {} must be between {} and {}", value, min, max),
        ));
    }
    Ok(())
}

fn validate_pattern(field_name: &str, value: &str, re: &Regex, expected: &str) -> Result<()> {
    if !re.is_match(value) {
        return Err(BridgeError::validation(
            field_name,
            format!("'{}' does not match the expected format {}", value, expected),
        ));
    }
    Ok(())
}

pub fn validate_birth_date(field_name: &str, value: &str) -> Result<()> {
    validate_pattern(field_name, value, &BIRTH_DATE_RE, "MM/DD/YYYY")
}

pub fn validate_mobile_phone(field_name: &str, value: &str) -> Result<()> {
    validate_pattern(field_name, value, &MOBILE_PHONE_RE, "(XXX) XXX-XXXX")
}

pub fn validate_country_code(field_name: &str, value: &str) -> Result<()> {
    validate_pattern(field_name, value, &COUNTRY_CODE_RE, "of a 3-letter country code")
}

pub fn validate_postal_code(field_name: &str, value: &str) -> Result<()> {
    validate_pattern(field_name, value, &POSTAL_CODE_RE, "of a 5-digit postal code")
}

pub fn validate_email(field_name: &str, value: &str) -> Result<()> {
    validate_pattern(field_name, value, &EMAIL_RE, "of an e-mail address")
}

/// Practice Fusion identifiers are 36 characters with four hyphens.
pub fn is_guid(value: &str) -> bool {
    value.len() == 36 && value.matches('-').count() == 4
}
