//! Helpers shared by the gateway adapters.

use masking::PeekInterface;
use serde::de::DeserializeOwned;

use crate::{
    domain::{CallbackParams, Card, FormFields},
    errors::{CustomResult, PosError},
};

/// Card expiry renderings the gateways ask for.
pub trait CardData {
    /// Zero-padded two digit month, `"03"`
    fn get_expiry_month_2_digit(&self) -> CustomResult<masking::Secret<String>, PosError>;
    /// Two digit year, `"26"`
    fn get_expiry_year_2_digit(&self) -> CustomResult<masking::Secret<String>, PosError>;
    /// Four digit year, `"2026"`
    fn get_expiry_year_4_digit(&self) -> CustomResult<masking::Secret<String>, PosError>;
    /// `"MMYY"`
    fn get_expiry_date_as_mmyy(&self) -> CustomResult<masking::Secret<String>, PosError>;
    /// `"YYMM"`
    fn get_expiry_date_as_yymm(&self) -> CustomResult<masking::Secret<String>, PosError>;
    /// `"MM/YY"`
    fn get_expiry_date_as_mm_slash_yy(&self) -> CustomResult<masking::Secret<String>, PosError>;
}

impl CardData for Card {
    fn get_expiry_month_2_digit(&self) -> CustomResult<masking::Secret<String>, PosError> {
        let month = self
            .exp_month
            .peek()
            .trim()
            .parse::<u8>()
            .map_err(|_| PosError::InvalidDataFormat {
                field_name: "card.exp_month",
            })?;
        if !(1..=12).contains(&month) {
            return Err(PosError::InvalidDataFormat {
                field_name: "card.exp_month",
            }
            .into());
        }
        Ok(masking::Secret::new(format!("{month:02}")))
    }

    fn get_expiry_year_2_digit(&self) -> CustomResult<masking::Secret<String>, PosError> {
        let year = self.exp_year.peek().trim();
        let two_digit = match year.len() {
            2 => year.to_string(),
            4 => year.get(2..).unwrap_or_default().to_string(),
            _ => {
                return Err(PosError::InvalidDataFormat {
                    field_name: "card.exp_year",
                }
                .into())
            }
        };
        Ok(masking::Secret::new(two_digit))
    }

    fn get_expiry_year_4_digit(&self) -> CustomResult<masking::Secret<String>, PosError> {
        let year = self.exp_year.peek().trim();
        let four_digit = match year.len() {
            4 => year.to_string(),
            2 => format!("20{year}"),
            _ => {
                return Err(PosError::InvalidDataFormat {
                    field_name: "card.exp_year",
                }
                .into())
            }
        };
        Ok(masking::Secret::new(four_digit))
    }

    fn get_expiry_date_as_mmyy(&self) -> CustomResult<masking::Secret<String>, PosError> {
        let month = self.get_expiry_month_2_digit()?;
        let year = self.get_expiry_year_2_digit()?;
        Ok(masking::Secret::new(format!(
            "{}{}",
            month.peek(),
            year.peek()
        )))
    }

    fn get_expiry_date_as_yymm(&self) -> CustomResult<masking::Secret<String>, PosError> {
        let month = self.get_expiry_month_2_digit()?;
        let year = self.get_expiry_year_2_digit()?;
        Ok(masking::Secret::new(format!(
            "{}{}",
            year.peek(),
            month.peek()
        )))
    }

    fn get_expiry_date_as_mm_slash_yy(&self) -> CustomResult<masking::Secret<String>, PosError> {
        let month = self.get_expiry_month_2_digit()?;
        let year = self.get_expiry_year_2_digit()?;
        Ok(masking::Secret::new(format!(
            "{}/{}",
            month.peek(),
            year.peek()
        )))
    }
}

/// Parsing helpers on raw response bodies.
pub trait BytesExt {
    /// Parse a JSON body into `T`, reporting the struct name on failure.
    fn parse_struct<T>(&self, type_name: &'static str) -> CustomResult<T, PosError>
    where
        T: DeserializeOwned;

    /// Parse an XML body into `T`, reporting the struct name on failure.
    fn parse_xml<T>(&self, type_name: &'static str) -> CustomResult<T, PosError>
    where
        T: DeserializeOwned;
}

impl BytesExt for [u8] {
    fn parse_struct<T>(&self, type_name: &'static str) -> CustomResult<T, PosError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(self).map_err(|error| {
            tracing::debug!(%type_name, %error, "failed to deserialize gateway response");
            error_stack::Report::new(PosError::ResponseDeserializationFailed)
        })
    }

    fn parse_xml<T>(&self, type_name: &'static str) -> CustomResult<T, PosError>
    where
        T: DeserializeOwned,
    {
        let body = std::str::from_utf8(self)
            .map_err(|_| PosError::ResponseDeserializationFailed)?;
        quick_xml::de::from_str(body).map_err(|error| {
            tracing::debug!(%type_name, %error, "failed to deserialize gateway response");
            error_stack::Report::new(PosError::ResponseDeserializationFailed)
        })
    }
}

/// Parse an `application/x-www-form-urlencoded` body into callback params.
pub fn parse_url_encoded(body: &[u8]) -> CustomResult<CallbackParams, PosError> {
    serde_urlencoded::from_bytes(body)
        .map_err(|_| PosError::ResponseDeserializationFailed.into())
}

/// Value of a form field; a missing field participates in hashes as the
/// empty string, it is never omitted.
pub fn form_field<'a>(fields: &'a FormFields, name: &str) -> &'a str {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .unwrap_or_default()
}

/// Value of a callback param; absent means empty, exactly as for form fields.
pub fn callback_param<'a>(params: &'a CallbackParams, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or_default()
}

/// A callback param that must be present for a flow to continue.
pub fn require_callback_param<'a>(
    params: &'a CallbackParams,
    key: &'static str,
) -> CustomResult<&'a str, PosError> {
    params
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| PosError::MissingCallbackPayload { field_name: key }.into())
}

/// Canonical wire-string rendering of a JSON value, so that `949` and
/// `"949"` participate in hashes identically.
pub fn wire_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(inner) => inner.clone(),
        serde_json::Value::Bool(inner) => inner.to_string(),
        serde_json::Value::Number(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

/// Flatten a JSON callback payload into string params using [`wire_string`].
pub fn callback_params_from_json(value: &serde_json::Value) -> CallbackParams {
    value
        .as_object()
        .map(|object| {
            object
                .iter()
                .map(|(key, val)| (key.clone(), wire_string(val)))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use masking::Secret;

    use super::*;

    fn test_card() -> Card {
        Card::new(
            masking::StrongSecret::new("4355084355084358".to_string()),
            Secret::new("3".to_string()),
            Secret::new("2026".to_string()),
            Secret::new("123".to_string()),
        )
    }

    #[test]
    fn expiry_renderings() {
        let card = test_card();

        assert_eq!(card.get_expiry_month_2_digit().unwrap().peek(), "03");
        assert_eq!(card.get_expiry_year_2_digit().unwrap().peek(), "26");
        assert_eq!(card.get_expiry_year_4_digit().unwrap().peek(), "2026");
        assert_eq!(card.get_expiry_date_as_mmyy().unwrap().peek(), "0326");
        assert_eq!(card.get_expiry_date_as_yymm().unwrap().peek(), "2603");
        assert_eq!(card.get_expiry_date_as_mm_slash_yy().unwrap().peek(), "03/26");
    }

    #[test]
    fn invalid_expiry_month_is_rejected() {
        let card = Card::new(
            masking::StrongSecret::new("4355084355084358".to_string()),
            Secret::new("13".to_string()),
            Secret::new("26".to_string()),
            Secret::new("123".to_string()),
        );

        assert!(card.get_expiry_month_2_digit().is_err());
    }

    #[test]
    fn url_encoded_callback_bodies_parse_into_params() {
        let params =
            parse_url_encoded(b"mdStatus=1&oid=order222&HASH=S7UxUAohxaxzl35WxHyDfuQx0sg%3D")
                .unwrap();

        assert_eq!(params.get("mdStatus").map(String::as_str), Some("1"));
        assert_eq!(
            params.get("HASH").map(String::as_str),
            Some("S7UxUAohxaxzl35WxHyDfuQx0sg=")
        );
    }

    #[test]
    fn numeric_and_string_json_values_render_identically() {
        assert_eq!(wire_string(&serde_json::json!(949)), "949");
        assert_eq!(wire_string(&serde_json::json!("949")), "949");
        assert_eq!(wire_string(&serde_json::json!(null)), "");
    }
}
