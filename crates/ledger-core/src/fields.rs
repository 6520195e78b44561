use crate::error::CoreError;

/// ISO-4217 alpha-3 currency codes are exactly three uppercase ASCII letters.
/// We do not maintain the registry of *valid* codes — only the shape — since
/// currency conversion and registry upkeep are both explicitly out of scope.
pub fn validate_currency(code: &str) -> Result<(), CoreError> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(CoreError::InvalidCurrency(code.to_string()))
    }
}

pub fn validate_non_empty(field: &'static str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        Err(CoreError::EmptyField(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_shape() {
        assert!(validate_currency("USD").is_ok());
        assert!(validate_currency("usd").is_err());
        assert!(validate_currency("US").is_err());
        assert!(validate_currency("US1").is_err());
    }
}
