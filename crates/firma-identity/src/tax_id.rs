//! Tax id validation, normalization and masking

use crate::ValidationError;
use chrono::NaiveDate;
use std::fmt;

const TAX_ID_DIGITS: usize = 11;
/// Digits left visible at the start and end of a masked tax id.
const MASK_PREFIX: usize = 3;
const MASK_SUFFIX: usize = 2;

/// An 11-digit tax id that passed both check digits.
///
/// Construction goes through [`validate_tax_id`], so holding one is proof
/// the id is syntactically valid. It is still never logged or serialized
/// unmasked outside the signatory record itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedTaxId(String);

impl NormalizedTaxId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn masked(&self) -> String {
        mask_tax_id(&self.0)
    }
}

impl fmt::Display for NormalizedTaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

/// Strip separators and run the two-pass weighted-modulo-11 check.
///
/// The checksum runs before any comparison against registry data: a
/// syntactically invalid id is rejected without touching stored values.
pub fn validate_tax_id(raw: &str) -> Result<NormalizedTaxId, ValidationError> {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != TAX_ID_DIGITS {
        return Err(ValidationError::TaxIdLength);
    }
    if digits.iter().all(|&d| d == digits[0]) {
        // All-repeated sequences satisfy the arithmetic but are reserved
        // invalid ids.
        return Err(ValidationError::TaxIdRepeatedDigits);
    }
    if check_digit(&digits[..9], 10) != digits[9] || check_digit(&digits[..10], 11) != digits[10] {
        return Err(ValidationError::TaxIdChecksum);
    }

    Ok(NormalizedTaxId(
        digits.iter().map(|d| char::from_digit(*d, 10).unwrap_or('0')).collect(),
    ))
}

/// Weighted-modulo-11 check digit: weights descend from `initial_weight`
/// to 2; remainder below 2 maps to 0, otherwise 11 minus remainder.
fn check_digit(digits: &[u32], initial_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (initial_weight - i as u32))
        .sum();
    match sum % 11 {
        rem if rem < 2 => 0,
        rem => 11 - rem,
    }
}

/// Mask a tax id for audit payloads and public projections.
///
/// Exactly the first 3 and last 2 digits stay visible regardless of the
/// input formatting; the middle is replaced with `*`. Inputs too short to
/// mask meaningfully are fully starred.
pub fn mask_tax_id(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= MASK_PREFIX + MASK_SUFFIX {
        return "*".repeat(digits.len());
    }
    format!(
        "{}{}{}",
        &digits[..MASK_PREFIX],
        "*".repeat(digits.len() - MASK_PREFIX - MASK_SUFFIX),
        &digits[digits.len() - MASK_SUFFIX..]
    )
}

/// Canonicalize a birth date to ISO `YYYY-MM-DD` regardless of the input
/// locale ordering.
pub fn normalize_birth_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(ValidationError::BirthDateFormat(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_valid_id_with_separators() {
        let id = validate_tax_id("529.982.247-25").unwrap();
        assert_eq!(id.as_str(), "52998224725");
    }

    #[test]
    fn accepts_valid_bare_id() {
        assert!(validate_tax_id("52998224725").is_ok());
    }

    #[test]
    fn rejects_repeated_digit_sequences() {
        for d in 0..=9 {
            let id = d.to_string().repeat(11);
            assert_eq!(
                validate_tax_id(&id),
                Err(ValidationError::TaxIdRepeatedDigits),
                "{id} must be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_check_digits() {
        // First check digit off by one
        assert_eq!(
            validate_tax_id("52998224735"),
            Err(ValidationError::TaxIdChecksum)
        );
        // Second check digit off by one
        assert_eq!(
            validate_tax_id("52998224726"),
            Err(ValidationError::TaxIdChecksum)
        );
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(validate_tax_id("1234"), Err(ValidationError::TaxIdLength));
        assert_eq!(
            validate_tax_id("529982247251"),
            Err(ValidationError::TaxIdLength)
        );
    }

    #[test]
    fn masks_first_three_last_two() {
        assert_eq!(mask_tax_id("52998224725"), "529******25");
        assert_eq!(mask_tax_id("529.982.247-25"), "529******25");
    }

    #[test]
    fn masks_short_inputs_entirely() {
        assert_eq!(mask_tax_id("12345"), "*****");
        assert_eq!(mask_tax_id(""), "");
    }

    #[test]
    fn birth_dates_normalize_across_locales() {
        let expected = NaiveDate::from_ymd_opt(1990, 5, 10).unwrap();
        assert_eq!(normalize_birth_date("1990-05-10").unwrap(), expected);
        assert_eq!(normalize_birth_date("10/05/1990").unwrap(), expected);
        assert_eq!(normalize_birth_date("10-05-1990").unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_date_format() {
        assert!(matches!(
            normalize_birth_date("May 10th 1990"),
            Err(ValidationError::BirthDateFormat(_))
        ));
    }

    proptest! {
        /// Masking always reveals exactly the first 3 and last 2 digits of
        /// an 11-digit id, however the input is formatted.
        #[test]
        fn mask_reveals_fixed_window(digits in "[0-9]{11}", dotted in any::<bool>()) {
            let input = if dotted {
                format!(
                    "{}.{}.{}-{}",
                    &digits[..3], &digits[3..6], &digits[6..9], &digits[9..]
                )
            } else {
                digits.clone()
            };
            let masked = mask_tax_id(&input);
            prop_assert_eq!(masked.len(), 11);
            prop_assert_eq!(&masked[..3], &digits[..3]);
            prop_assert_eq!(&masked[3..9], "******");
            prop_assert_eq!(&masked[9..], &digits[9..]);
        }

        /// Corrupting either check digit is always caught.
        #[test]
        fn checksum_rejects_corrupted_check_digits(
            body in proptest::collection::vec(0u32..10, 9),
            bump in 1u32..10,
            which in any::<bool>(),
        ) {
            let d10 = super::check_digit(&body, 10);
            let mut full = body.clone();
            full.push(d10);
            let d11 = super::check_digit(&full, 11);
            full.push(d11);

            let idx = if which { 9 } else { 10 };
            full[idx] = (full[idx] + bump) % 10;

            let id: String = full
                .iter()
                .map(|d| char::from_digit(*d, 10).unwrap())
                .collect();
            prop_assert!(validate_tax_id(&id).is_err());
        }
    }
}
