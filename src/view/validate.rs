use crate::catalog::{Catalog, Destination};
use crate::error::ValidationError;

/// Exact-name lookup in the destination catalog.
pub fn validate_destination<'a>(
    value: &str,
    catalog: &'a Catalog,
) -> Result<&'a Destination, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::DestinationMissing);
    }
    catalog
        .destination(value)
        .ok_or_else(|| ValidationError::UnknownDestination(value.to_string()))
}

/// Non-negative whole number; `0` is the only value allowed to start with a zero.
pub fn validate_price(value: &str) -> Result<u32, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::PriceMissing);
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::PriceNotNumber);
    }
    if value.len() > 1 && value.starts_with('0') {
        return Err(ValidationError::PriceLeadingZero);
    }
    value
        .parse::<u32>()
        .map_err(|_| ValidationError::PriceTooLarge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_rules() {
        assert_eq!(validate_price("0"), Ok(0));
        assert_eq!(validate_price("150"), Ok(150));
        assert_eq!(validate_price("007"), Err(ValidationError::PriceLeadingZero));
        assert_eq!(validate_price("00"), Err(ValidationError::PriceLeadingZero));
        assert_eq!(validate_price("-5"), Err(ValidationError::PriceNotNumber));
        assert_eq!(validate_price("1.5"), Err(ValidationError::PriceNotNumber));
        assert_eq!(validate_price(" 5"), Err(ValidationError::PriceNotNumber));
        assert_eq!(validate_price(""), Err(ValidationError::PriceMissing));
        assert_eq!(
            validate_price("99999999999"),
            Err(ValidationError::PriceTooLarge)
        );
    }

    #[test]
    fn destination_rules() {
        let catalog = Catalog::builtin();
        assert_eq!(
            validate_destination("Geneva", &catalog).map(|d| d.name.as_str()),
            Ok("Geneva")
        );
        assert_eq!(
            validate_destination("", &catalog).map(|d| d.name.as_str()),
            Err(ValidationError::DestinationMissing)
        );
        assert_eq!(
            validate_destination("geneva", &catalog).map(|d| d.name.as_str()),
            Err(ValidationError::UnknownDestination("geneva".to_string()))
        );
    }
}
