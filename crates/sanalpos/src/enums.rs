//! Gateway-agnostic enumerations.

use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, PosError};

/// Identifier of a gateway family in the adapter registry.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GatewayKind {
    /// Payten EST family, legacy SHA-1 hash version
    Estpos,
    /// Payten EST family, ver3 SHA-512 hash version
    EstposV3,
    /// Garanti BBVA GVPS
    Garanti,
    /// Yapı Kredi Posnet
    Posnet,
    /// Kuveyt Türk TDV2 virtual POS
    Kuveyt,
    /// Akbank JSON virtual POS
    Akbank,
}

/// The browser-redirect authentication model chosen by the caller at
/// initiation. The orchestrator forks on this value, never on response shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentModel {
    /// Direct server-to-server authorization, no redirect
    NonSecure,
    /// Redirect plus a finalizing server-to-server leg
    ThreeDSecure,
    /// Redirect only; the verified callback is the settlement
    ThreeDPay,
    /// Bank-hosted card entry page; the verified callback is the settlement
    ThreeDHost,
}

/// Canonical transaction types accepted by the mapping tables.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionType {
    Auth,
    PreAuth,
    PostAuth,
    Cancel,
    Refund,
    RefundPartial,
    Status,
    OrderHistory,
    History,
}

/// Operation being performed, used for endpoint and method selection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Payment,
    ThreeDPayment,
    ThreeDEnrollment,
    PostAuth,
    Cancel,
    Refund,
    Status,
    OrderHistory,
    History,
}

/// Normalized outcome of a gateway operation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionStatus {
    /// Request was built but no gateway decision has been observed
    #[default]
    Started,
    /// Redirect handed to the browser, awaiting the bank callback
    AuthenticationPending,
    /// 3-D hash verification or authentication failed; terminal
    AuthenticationFailed,
    /// Pre-authorization placed, waiting for capture
    Authorized,
    /// Funds captured
    Charged,
    /// Transaction cancelled on the same day
    Voided,
    /// Funds returned
    Refunded,
    /// Gateway accepted the request but has not settled it
    Pending,
    /// Gateway declined or errored; terminal
    Failure,
}

impl TransactionStatus {
    /// Whether this is a successful terminal state.
    pub fn is_approved(self) -> bool {
        matches!(
            self,
            Self::Authorized | Self::Charged | Self::Voided | Self::Refunded
        )
    }
}

/// ISO-4217 currencies accepted by the implemented gateways.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum Currency {
    TRY,
    USD,
    EUR,
    GBP,
    JPY,
    RUB,
    CHF,
}

impl Currency {
    /// The ISO-4217 numeric code, zero-padded to three digits.
    pub fn iso_numeric(self) -> &'static str {
        match self {
            Self::TRY => "949",
            Self::USD => "840",
            Self::EUR => "978",
            Self::GBP => "826",
            Self::JPY => "392",
            Self::RUB => "643",
            Self::CHF => "756",
        }
    }

    /// Resolve a numeric ISO-4217 code back to the currency.
    pub fn from_iso_numeric(code: &str) -> CustomResult<Self, PosError> {
        use strum::IntoEnumIterator;

        Self::iter()
            .find(|currency| currency.iso_numeric() == code)
            .ok_or_else(|| {
                PosError::NotSupported {
                    message: format!("currency code {code}"),
                    gateway: "sanalpos",
                }
                .into()
            })
    }
}

/// Interface languages the gateways render their hosted pages in.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    #[default]
    Tr,
    En,
}

/// Unit of a recurring schedule's billing cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecurringCycleUnit {
    Day,
    Week,
    Month,
    Year,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn currency_numeric_codes_round_trip() {
        for currency in Currency::iter() {
            assert_eq!(
                Currency::from_iso_numeric(currency.iso_numeric()).unwrap(),
                currency
            );
        }
    }

    #[test]
    fn unknown_currency_code_is_unsupported() {
        let error = Currency::from_iso_numeric("000").unwrap_err();

        assert!(matches!(
            error.current_context(),
            PosError::NotSupported { .. }
        ));
    }

    #[test]
    fn gateway_kind_parses_from_snake_case() {
        assert_eq!(
            "estpos_v3".parse::<GatewayKind>().unwrap(),
            GatewayKind::EstposV3
        );
        assert_eq!("garanti".parse::<GatewayKind>().unwrap(), GatewayKind::Garanti);
    }
}
