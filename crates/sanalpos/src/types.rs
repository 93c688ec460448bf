//! Amount units and conversions.
//!
//! `MinorUnit` is the canonical in-core representation; every gateway-facing
//! rendering is derived from it through an [`AmountConvertor`], so the
//! outbound request and any hash re-derivation share a single formatting
//! path.

use serde::{Deserialize, Serialize};

use crate::{
    enums::Currency,
    errors::{CustomResult, PosError},
};

/// This Unit struct represents MinorUnit in which core amount works
#[derive(
    Default, Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct MinorUnit(i64);

impl MinorUnit {
    /// Forms a new minor unit from an amount in the currency's smallest
    /// denomination
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Gets the amount as an i64 value
    pub fn get_amount_as_i64(self) -> i64 {
        self.0
    }

    /// Convert the amount to its major denomination and render it as a
    /// decimal string with two fractional digits
    fn to_major_unit_as_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let value = self.0.abs();
        format!("{}{}.{:02}", sign, value / 100, value % 100)
    }
}

impl std::fmt::Display for MinorUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount rendered as a major-denomination decimal string (`"100.25"`)
#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StringMajorUnit(String);

impl StringMajorUnit {
    /// Forms a new major unit from an already rendered amount
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// The rendered wire value
    pub fn get_amount_as_string(&self) -> &str {
        &self.0
    }

    fn to_minor_unit(&self) -> CustomResult<MinorUnit, PosError> {
        let (major, minor) = match self.0.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (self.0.as_str(), ""),
        };
        let major = major
            .parse::<i64>()
            .map_err(|_| PosError::InvalidDataFormat {
                field_name: "amount",
            })?;
        let minor = match minor.len() {
            0 => 0,
            1 | 2 => {
                let parsed = minor
                    .parse::<i64>()
                    .map_err(|_| PosError::InvalidDataFormat {
                        field_name: "amount",
                    })?;
                if minor.len() == 1 {
                    parsed * 10
                } else {
                    parsed
                }
            }
            _ => {
                return Err(PosError::InvalidDataFormat {
                    field_name: "amount",
                }
                .into())
            }
        };
        Ok(MinorUnit::new(major * 100 + minor))
    }
}

/// Amount rendered as a minor-unit integer string (`"10025"`)
#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StringMinorUnit(String);

impl StringMinorUnit {
    /// Forms a new minor unit string from an already rendered amount
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// The rendered wire value
    pub fn get_amount_as_string(&self) -> &str {
        &self.0
    }

    fn to_minor_unit(&self) -> CustomResult<MinorUnit, PosError> {
        let value = self
            .0
            .parse::<i64>()
            .map_err(|_| PosError::InvalidDataFormat {
                field_name: "amount",
            })?;
        Ok(MinorUnit::new(value))
    }
}

/// Converts between the canonical `MinorUnit` and a gateway's wire rendering.
///
/// Implementations are total for the supported currency set; all implemented
/// gateways use two-decimal currencies.
pub trait AmountConvertor: Send + Sync {
    /// The gateway-facing rendering
    type Output;

    /// Render the canonical amount for the wire
    fn convert(&self, amount: MinorUnit, currency: Currency)
        -> CustomResult<Self::Output, PosError>;

    /// Recover the canonical amount from a wire rendering
    fn convert_back(
        &self,
        amount: Self::Output,
        currency: Currency,
    ) -> CustomResult<MinorUnit, PosError>;
}

/// Renders amounts as decimal major-unit strings (EST, Akbank)
#[derive(Debug, Clone, Copy)]
pub struct StringMajorUnitForGateway;

impl AmountConvertor for StringMajorUnitForGateway {
    type Output = StringMajorUnit;

    fn convert(
        &self,
        amount: MinorUnit,
        _currency: Currency,
    ) -> CustomResult<Self::Output, PosError> {
        Ok(StringMajorUnit::new(amount.to_major_unit_as_string()))
    }

    fn convert_back(
        &self,
        amount: Self::Output,
        _currency: Currency,
    ) -> CustomResult<MinorUnit, PosError> {
        amount.to_minor_unit()
    }
}

/// Renders amounts as integer minor-unit strings (Garanti, Posnet, Kuveyt)
#[derive(Debug, Clone, Copy)]
pub struct StringMinorUnitForGateway;

impl AmountConvertor for StringMinorUnitForGateway {
    type Output = StringMinorUnit;

    fn convert(
        &self,
        amount: MinorUnit,
        _currency: Currency,
    ) -> CustomResult<Self::Output, PosError> {
        Ok(StringMinorUnit::new(amount.get_amount_as_i64().to_string()))
    }

    fn convert_back(
        &self,
        amount: Self::Output,
        _currency: Currency,
    ) -> CustomResult<MinorUnit, PosError> {
        amount.to_minor_unit()
    }
}

/// Installment count with the gateway-equivalence rule applied at the edge:
/// `0`, `1` and "not specified" all mean a single payment and are
/// indistinguishable downstream.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Installment(u8);

impl Installment {
    /// Normalizing constructor
    pub fn new(count: u8) -> Self {
        if count < 2 {
            Self(0)
        } else {
            Self(count)
        }
    }

    /// No installment, the single-payment default
    pub fn none() -> Self {
        Self(0)
    }

    /// Whether the order is paid in installments at all
    pub fn is_installment(self) -> bool {
        self.0 >= 2
    }

    /// The normalized count; `None` for single payments
    pub fn count(self) -> Option<u8> {
        self.is_installment().then_some(self.0)
    }
}

impl From<u8> for Installment {
    fn from(count: u8) -> Self {
        Self::new(count)
    }
}

impl std::str::FromStr for Installment {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::none());
        }
        s.trim()
            .parse::<u8>()
            .map(Self::new)
            .map_err(|_| PosError::InvalidDataFormat {
                field_name: "installment",
            })
    }
}

impl<'de> Deserialize<'de> for Installment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(Self::none()),
            serde_json::Value::Number(number) => number
                .as_u64()
                .and_then(|count| u8::try_from(count).ok())
                .map(Self::new)
                .ok_or_else(|| D::Error::custom("installment count out of range")),
            serde_json::Value::String(raw) => raw
                .parse::<Self>()
                .map_err(|_| D::Error::custom("installment count is not numeric")),
            _ => Err(D::Error::custom("invalid installment representation")),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn minor_unit_renders_decimal_string() {
        let converted = StringMajorUnitForGateway
            .convert(MinorUnit::new(10025), Currency::TRY)
            .unwrap();

        assert_eq!(converted.get_amount_as_string(), "100.25");
    }

    #[test]
    fn minor_unit_renders_integer_string() {
        let converted = StringMinorUnitForGateway
            .convert(MinorUnit::new(10025), Currency::TRY)
            .unwrap();

        assert_eq!(converted.get_amount_as_string(), "10025");
    }

    #[test]
    fn amount_formatting_round_trips() {
        let amount = MinorUnit::new(10025);

        let major = StringMajorUnitForGateway
            .convert(amount, Currency::TRY)
            .unwrap();
        assert_eq!(
            StringMajorUnitForGateway
                .convert_back(major, Currency::TRY)
                .unwrap(),
            amount
        );

        let minor = StringMinorUnitForGateway
            .convert(amount, Currency::TRY)
            .unwrap();
        assert_eq!(
            StringMinorUnitForGateway
                .convert_back(minor, Currency::TRY)
                .unwrap(),
            amount
        );
    }

    #[test]
    fn reformatting_a_formatted_value_is_a_noop() {
        let rendered = StringMajorUnit::new("100.25".to_string());
        let round_tripped = StringMajorUnitForGateway
            .convert(
                StringMajorUnitForGateway
                    .convert_back(rendered.clone(), Currency::TRY)
                    .unwrap(),
                Currency::TRY,
            )
            .unwrap();

        assert_eq!(round_tripped, rendered);
    }

    #[test]
    fn whole_amounts_keep_two_fractional_digits() {
        let converted = StringMajorUnitForGateway
            .convert(MinorUnit::new(10000), Currency::TRY)
            .unwrap();

        assert_eq!(converted.get_amount_as_string(), "100.00");
    }

    #[test]
    fn installment_zero_one_and_absent_are_equivalent() {
        assert_eq!(Installment::new(0), Installment::none());
        assert_eq!(Installment::new(1), Installment::none());
        assert_eq!("".parse::<Installment>().unwrap(), Installment::none());
        assert_eq!("0".parse::<Installment>().unwrap(), Installment::none());
        assert_eq!("1".parse::<Installment>().unwrap(), Installment::none());
        assert!(Installment::none().count().is_none());
    }

    #[test]
    fn installment_string_and_integer_inputs_normalize_identically() {
        let from_str: Installment = "2".parse().unwrap();
        let from_int = Installment::new(2);

        assert_eq!(from_str, from_int);
        assert_eq!(from_int.count(), Some(2));

        let from_json_int: Installment = serde_json::from_value(serde_json::json!(2)).unwrap();
        let from_json_str: Installment =
            serde_json::from_value(serde_json::json!("2")).unwrap();
        assert_eq!(from_json_int, from_json_str);
    }
}
