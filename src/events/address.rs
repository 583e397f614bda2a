use crate::appresult::{DataError, DataResult};

pub const COUNTRY_MIN_CHARS: usize = 2;
pub const COUNTRY_MAX_CHARS: usize = 50;
pub const CITY_MIN_CHARS: usize = 2;
pub const CITY_MAX_CHARS: usize = 50;
pub const STREET_MIN_CHARS: usize = 3;
pub const STREET_MAX_CHARS: usize = 100;

/// Street address of an offline event. Street is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub country: String,
    pub city: String,
    pub street: String,
}

fn check(field: &str, value: &str, min: usize, max: usize, allowed: impl Fn(char) -> bool) -> DataResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(DataError::Invalid(format!("{field} must be {min}-{max} characters")));
    }
    if let Some(c) = value.chars().find(|c| !allowed(*c)) {
        return Err(DataError::Invalid(format!("{field} may not contain {c:?}")));
    }
    Ok(())
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.country.is_empty() && self.city.is_empty() && self.street.is_empty()
    }

    pub fn validate(&self) -> DataResult<()> {
        let letters = |c: char| c.is_alphabetic() || c == ' ';
        check("country", &self.country, COUNTRY_MIN_CHARS, COUNTRY_MAX_CHARS, letters)?;
        check("city", &self.city, CITY_MIN_CHARS, CITY_MAX_CHARS, letters)?;
        if !self.street.is_empty() {
            check("street", &self.street, STREET_MIN_CHARS, STREET_MAX_CHARS, |c| {
                c.is_alphanumeric() || c == ' ' || c == '.'
            })?;
        }
        Ok(())
    }

    /// `street, city, country`, skipping a missing street.
    pub fn to_location(&self) -> String {
        [self.street.as_str(), self.city.as_str(), self.country.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Static hint text shown next to each field.
    pub fn hints() -> [(&'static str, String); 3] {
        [
            ("country", format!("{COUNTRY_MIN_CHARS}-{COUNTRY_MAX_CHARS} chars | upper-/lowercase | space")),
            ("city", format!("{CITY_MIN_CHARS}-{CITY_MAX_CHARS} chars | upper-/lowercase | space")),
            ("street", format!("{STREET_MIN_CHARS}-{STREET_MAX_CHARS} chars | upper-/lowercase | digits | space | dot")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(country: &str, city: &str, street: &str) -> Address {
        Address { country: country.into(), city: city.into(), street: street.into() }
    }

    #[test]
    fn accepts_well_formed_addresses() {
        address("Bulgaria", "Sofia", "Vitosha Blvd. 12").validate().unwrap();
        address("Côte dIvoire", "Abidjan", "").validate().unwrap();
    }

    #[test]
    fn enforces_lengths_and_characters() {
        assert!(address("B", "Sofia", "").validate().is_err());
        assert!(address("Bulgaria", "Sofia 1", "").validate().is_err());
        assert!(address("Bulgaria", "Sofia", "No#5").validate().is_err());
        assert!(address("Bulgaria", "Sofia", &"a".repeat(STREET_MAX_CHARS + 1)).validate().is_err());
    }

    #[test]
    fn location_skips_missing_street() {
        assert_eq!(address("Bulgaria", "Sofia", "").to_location(), "Sofia, Bulgaria");
        assert_eq!(address("Bulgaria", "Sofia", "Main St. 1").to_location(), "Main St. 1, Sofia, Bulgaria");
    }
}
