//! Canonical, gateway-agnostic transaction model.

use std::collections::HashMap;

use masking::{Secret, StrongSecret};
use time::PrimitiveDateTime;

use crate::{
    enums::{Currency, GatewayKind, Language, RecurringCycleUnit, TransactionStatus},
    errors::{CustomResult, PosError},
    request::Method,
    types::{Installment, MinorUnit},
};

/// Ordered form fields, e.g. the inputs of a 3-D redirect form. Order is hash
/// order.
pub type FormFields = Vec<(String, String)>;

/// The bank's redirect-callback parameters, keyed by field name.
pub type CallbackParams = HashMap<String, String>;

/// Observer invoked on the about-to-be-hashed field set immediately before
/// hash computation, for last-mile customization without forking a formatter.
pub type FormFieldsHook<'a> = &'a dyn Fn(&mut FormFields);

/// Immutable credential bundle for one gateway terminal.
///
/// Different gateways populate different subsets; absence of a field is
/// itself meaningful and is validated by the per-gateway auth conversions.
#[derive(Clone, Debug)]
pub struct GatewayAccount {
    pub gateway: GatewayKind,
    /// Merchant number at the bank
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
    /// Signing key issued separately from the login password
    pub store_key: Option<Secret<String>>,
    pub terminal_id: Option<String>,
    pub sub_merchant_id: Option<String>,
    /// Garanti issues distinct credentials for refund provisioning
    pub refund_username: Option<String>,
    pub refund_password: Option<Secret<String>>,
    pub lang: Language,
}

impl GatewayAccount {
    /// A new account bundle for `gateway` with all optional credentials unset.
    pub fn new(gateway: GatewayKind, client_id: impl Into<String>) -> Self {
        Self {
            gateway,
            client_id: client_id.into(),
            username: None,
            password: None,
            store_key: None,
            terminal_id: None,
            sub_merchant_id: None,
            refund_username: None,
            refund_password: None,
            lang: Language::default(),
        }
    }

    /// Attach API login credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: Secret<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password);
        self
    }

    /// Attach the gateway-issued signing key.
    pub fn with_store_key(mut self, store_key: Secret<String>) -> Self {
        self.store_key = Some(store_key);
        self
    }

    /// Attach the terminal identifier.
    pub fn with_terminal_id(mut self, terminal_id: impl Into<String>) -> Self {
        self.terminal_id = Some(terminal_id.into());
        self
    }

    /// Attach a sub-merchant identifier.
    pub fn with_sub_merchant_id(mut self, sub_merchant_id: impl Into<String>) -> Self {
        self.sub_merchant_id = Some(sub_merchant_id.into());
        self
    }

    /// Attach the separate refund provisioning credentials.
    pub fn with_refund_credentials(
        mut self,
        username: impl Into<String>,
        password: Secret<String>,
    ) -> Self {
        self.refund_username = Some(username.into());
        self.refund_password = Some(password);
        self
    }

    /// Set the hosted-page language.
    pub fn with_lang(mut self, lang: Language) -> Self {
        self.lang = lang;
        self
    }

    /// Guard against an account of the wrong gateway family reaching a
    /// gateway-specific signer or formatter. This is a programmer error, not
    /// a data error.
    pub fn ensure_kind(&self, accepted: &[GatewayKind]) -> CustomResult<(), PosError> {
        if accepted.contains(&self.gateway) {
            Ok(())
        } else {
            Err(PosError::FailedToObtainAuthType.into())
        }
    }
}

/// References to a previously processed transaction, used to address capture,
/// cancel and refund requests. Each gateway selects its single valid
/// addressing mode from which fields are present.
#[derive(Clone, Debug, Default)]
pub struct LinkedReferences {
    /// The order id the gateway assigned, where it differs from ours
    pub remote_order_id: Option<String>,
    /// Retrieval reference number / host log key
    pub ref_ret_num: Option<String>,
    pub auth_code: Option<String>,
    pub transaction_id: Option<String>,
    /// Recurring-plan identifier for plan-level queries
    pub recurring_id: Option<String>,
}

/// Recurring payment schedule attached to an order.
#[derive(Clone, Copy, Debug)]
pub struct RecurringSchedule {
    /// Repeat every `cycle_interval` `cycle_unit`s
    pub cycle_interval: u8,
    pub cycle_unit: RecurringCycleUnit,
    /// Total number of payments, the initial one included
    pub payment_count: u8,
}

/// A single order as the merchant application sees it. The core never
/// persists orders; the caller mutates this between operations.
#[derive(Clone, Debug)]
pub struct Order {
    pub id: String,
    pub amount: MinorUnit,
    pub currency: Currency,
    pub installment: Installment,
    pub success_url: Option<url::Url>,
    pub fail_url: Option<url::Url>,
    pub client_ip: Option<String>,
    pub email: Option<String>,
    pub linked: LinkedReferences,
    pub recurring: Option<RecurringSchedule>,
}

impl Order {
    /// A minimal order; URLs, IP and linked references start unset.
    pub fn new(id: impl Into<String>, amount: MinorUnit, currency: Currency) -> Self {
        Self {
            id: id.into(),
            amount,
            currency,
            installment: Installment::none(),
            success_url: None,
            fail_url: None,
            client_ip: None,
            email: None,
            linked: LinkedReferences::default(),
            recurring: None,
        }
    }

    pub(crate) fn success_url_str(&self) -> CustomResult<&str, PosError> {
        self.success_url
            .as_ref()
            .map(url::Url::as_str)
            .ok_or_else(|| {
                PosError::MissingRequiredField {
                    field_name: "success_url",
                }
                .into()
            })
    }

    pub(crate) fn fail_url_str(&self) -> CustomResult<&str, PosError> {
        self.fail_url
            .as_ref()
            .map(url::Url::as_str)
            .ok_or_else(|| {
                PosError::MissingRequiredField {
                    field_name: "fail_url",
                }
                .into()
            })
    }
}

/// Card data for a single request. Ephemeral; the core never retains it
/// beyond the request being built, and the PAN is wiped on drop.
#[derive(Clone, Debug)]
pub struct Card {
    pub number: StrongSecret<String>,
    /// One- or two-digit month as entered
    pub exp_month: Secret<String>,
    /// Two- or four-digit year as entered
    pub exp_year: Secret<String>,
    pub cvv: Secret<String>,
    pub holder_name: Option<Secret<String>>,
}

impl Card {
    /// A new card; PAN validation belongs to the caller's card value object.
    pub fn new(
        number: StrongSecret<String>,
        exp_month: Secret<String>,
        exp_year: Secret<String>,
        cvv: Secret<String>,
    ) -> Self {
        Self {
            number,
            exp_month,
            exp_year,
            cvv,
            holder_name: None,
        }
    }

    /// Attach the cardholder name.
    pub fn with_holder_name(mut self, holder_name: Secret<String>) -> Self {
        self.holder_name = Some(holder_name);
        self
    }
}

/// Date range for gateway-wide history queries.
#[derive(Clone, Copy, Debug)]
pub struct HistoryQuery {
    pub start: time::Date,
    pub end: time::Date,
    pub page: Option<u32>,
}

/// The explicitly-injected nonce and clock reading a request builder needs.
///
/// Builders never read the RNG or the wall clock themselves; this is the
/// only non-deterministic constructor and it runs outside every pure path,
/// which keeps request building reproducible under test.
#[derive(Clone, Debug)]
pub struct RequestEnv {
    /// Random nonce carried by 3-D form fields (`rnd`)
    pub rnd: String,
    pub timestamp: PrimitiveDateTime,
}

impl RequestEnv {
    /// Sample the RNG and the system clock.
    pub fn generate() -> Self {
        let now = time::OffsetDateTime::now_utc();
        Self {
            rnd: crate::crypto::generate_random_string(crate::consts::RND_LENGTH),
            timestamp: PrimitiveDateTime::new(now.date(), now.time()),
        }
    }

    /// Fixed values, for deterministic request building.
    pub fn fixed(rnd: impl Into<String>, timestamp: PrimitiveDateTime) -> Self {
        Self {
            rnd: rnd.into(),
            timestamp,
        }
    }
}

/// Reference numbers a gateway returned for a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceNumbers {
    /// Retrieval reference number / host log key
    pub host_ref_num: Option<String>,
    pub transaction_id: Option<String>,
    /// The order id as the gateway knows it
    pub remote_order_id: Option<String>,
    pub batch_id: Option<String>,
}

/// 3-D Secure authentication proof forwarded by the bank.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreeDSecureData {
    pub md_status: Option<String>,
    pub eci: Option<String>,
    pub cavv: Option<String>,
    pub xid: Option<String>,
    pub md: Option<String>,
}

/// Canonical transaction outcome produced by a response normalizer.
/// Immutable once produced.
#[derive(Clone, Debug, Default)]
pub struct TransactionResult {
    pub status: TransactionStatus,
    /// The gateway's own return code, e.g. `"00"`
    pub gateway_return_code: Option<String>,
    pub auth_code: Option<String>,
    pub refs: ReferenceNumbers,
    pub three_d: Option<ThreeDSecureData>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    /// Every parsed wire field, for callers that need gateway-specific data
    pub raw: serde_json::Value,
}

impl TransactionResult {
    /// Whether the gateway approved the operation.
    pub fn approved(&self) -> bool {
        self.status.is_approved()
    }
}

/// The artifact the caller renders as an auto-submitting browser form.
///
/// Input ordering and exact string formatting are what the signing strategy
/// hashed; any mutation after this struct is produced invalidates the
/// bank-side signature check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreeDFormData {
    pub gateway_url: String,
    pub method: Method,
    pub inputs: FormFields,
}
