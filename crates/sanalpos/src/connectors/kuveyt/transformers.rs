//! Wire types and signing for the Kuveyt Türk TDV2 gateway.

use base64::Engine;
use masking::{PeekInterface, Secret, StrongSecret};
use serde::{Deserialize, Serialize};

use crate::{
    api::GatewayCrypt,
    crypto::{GenerateDigest, Sha1},
    domain::{
        CallbackParams, Card, FormFields, GatewayAccount, Order, ReferenceNumbers,
        ThreeDSecureData, TransactionResult,
    },
    enums::{GatewayKind, PaymentModel, TransactionStatus},
    errors::{CustomResult, PosError},
    utils::{self, CardData},
};

pub const API_VERSION: &str = "TDV2.0.0";

pub struct KuveytAuthType {
    pub(super) merchant_id: String,
    /// The bank's customer number, carried in the sub-merchant slot
    pub(super) customer_id: String,
    pub(super) username: Secret<String>,
}

impl TryFrom<&GatewayAccount> for KuveytAuthType {
    type Error = error_stack::Report<PosError>;

    fn try_from(account: &GatewayAccount) -> Result<Self, Self::Error> {
        account.ensure_kind(&[GatewayKind::Kuveyt])?;
        match (&account.username, &account.sub_merchant_id) {
            (Some(username), Some(customer_id)) => Ok(Self {
                merchant_id: account.client_id.clone(),
                customer_id: customer_id.clone(),
                username: Secret::new(username.clone()),
            }),
            _ => Err(PosError::FailedToObtainAuthType)?,
        }
    }
}

/// SHA-1 strategy whose signing secret is the *hashed* API password:
/// `HashedPassword = Base64(SHA-1(password))`.
pub struct KuveytCrypt;

impl KuveytCrypt {
    fn b64_sha1(plain: &str) -> CustomResult<String, PosError> {
        let digest = Sha1
            .generate_digest(plain.as_bytes())
            .map_err(|_| PosError::RequestEncodingFailed)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(digest))
    }

    fn hashed_password(account: &GatewayAccount) -> CustomResult<String, PosError> {
        let password = account
            .password
            .as_ref()
            .ok_or(PosError::FailedToObtainAuthType)?;
        Self::b64_sha1(password.peek())
    }

    fn username(account: &GatewayAccount) -> CustomResult<&str, PosError> {
        account
            .username
            .as_deref()
            .ok_or_else(|| PosError::FailedToObtainAuthType.into())
    }
}

impl GatewayCrypt for KuveytCrypt {
    /// Provision-leg hash: merchant id, order id, amount, username, hashed
    /// password.
    fn create_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError> {
        account.ensure_kind(&[GatewayKind::Kuveyt])?;
        let hashed_password = Self::hashed_password(account)?;
        Self::b64_sha1(&format!(
            "{}{}{}{}{}",
            account.client_id,
            utils::form_field(data, "merchant_order_id"),
            utils::form_field(data, "amount"),
            Self::username(account)?,
            hashed_password,
        ))
    }

    /// Enrollment-leg hash additionally binds the redirect URLs.
    fn create_3d_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError> {
        account.ensure_kind(&[GatewayKind::Kuveyt])?;
        let hashed_password = Self::hashed_password(account)?;
        Self::b64_sha1(&format!(
            "{}{}{}{}{}{}{}",
            account.client_id,
            utils::form_field(data, "merchant_order_id"),
            utils::form_field(data, "amount"),
            utils::form_field(data, "ok_url"),
            utils::form_field(data, "fail_url"),
            Self::username(account)?,
            hashed_password,
        ))
    }

    fn check_3d_hash(
        &self,
        account: &GatewayAccount,
        params: &CallbackParams,
    ) -> CustomResult<bool, PosError> {
        account.ensure_kind(&[GatewayKind::Kuveyt])?;
        let Some(received) = params.get("HashData") else {
            return Ok(false);
        };
        let hashed_password = Self::hashed_password(account)?;
        let actual = Self::b64_sha1(&format!(
            "{}{}{}{}{}",
            account.client_id,
            utils::callback_param(params, "MerchantOrderId"),
            utils::callback_param(params, "ResponseCode"),
            Self::username(account)?,
            hashed_password,
        ))?;
        Ok(&actual == received)
    }
}

#[derive(Debug, Serialize)]
pub struct KuveytAdditionalDataEntry {
    #[serde(rename = "Key")]
    pub key: &'static str,
    #[serde(rename = "Data")]
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct KuveytAdditionalData {
    #[serde(rename = "AdditionalData")]
    pub additional_data: KuveytAdditionalDataEntry,
}

/// The TDV2 request envelope. Element order is the wire order.
#[derive(Debug, Serialize)]
#[serde(rename = "KuveytTurkVPosMessage")]
pub struct KuveytVPosMessage {
    #[serde(rename = "APIVersion")]
    pub api_version: &'static str,
    #[serde(rename = "OkUrl", skip_serializing_if = "Option::is_none")]
    pub ok_url: Option<String>,
    #[serde(rename = "FailUrl", skip_serializing_if = "Option::is_none")]
    pub fail_url: Option<String>,
    #[serde(rename = "HashData")]
    pub hash_data: String,
    #[serde(rename = "MerchantId")]
    pub merchant_id: String,
    #[serde(rename = "CustomerId")]
    pub customer_id: String,
    #[serde(rename = "UserName")]
    pub user_name: Secret<String>,
    #[serde(rename = "CardNumber", skip_serializing_if = "Option::is_none")]
    pub card_number: Option<StrongSecret<String>>,
    #[serde(rename = "CardExpireDateYear", skip_serializing_if = "Option::is_none")]
    pub card_expire_date_year: Option<Secret<String>>,
    #[serde(rename = "CardExpireDateMonth", skip_serializing_if = "Option::is_none")]
    pub card_expire_date_month: Option<Secret<String>>,
    #[serde(rename = "CardCVV2", skip_serializing_if = "Option::is_none")]
    pub card_cvv2: Option<Secret<String>>,
    #[serde(rename = "CardHolderName", skip_serializing_if = "Option::is_none")]
    pub card_holder_name: Option<Secret<String>>,
    #[serde(rename = "BatchID")]
    pub batch_id: &'static str,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "InstallmentCount")]
    pub installment_count: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "DisplayAmount")]
    pub display_amount: String,
    #[serde(rename = "CurrencyCode")]
    pub currency_code: String,
    #[serde(rename = "MerchantOrderId")]
    pub merchant_order_id: String,
    #[serde(rename = "TransactionSecurity")]
    pub transaction_security: &'static str,
    #[serde(
        rename = "KuveytTurkVPosAdditionalData",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_data: Option<KuveytAdditionalData>,
}

pub struct KuveytRequestInput<'a> {
    pub auth: &'a KuveytAuthType,
    pub order: &'a Order,
    pub tx_type: String,
    pub amount: String,
    pub currency: String,
    pub installment: String,
}

impl KuveytVPosMessage {
    fn base(input: &KuveytRequestInput<'_>, hash_data: String) -> Self {
        Self {
            api_version: API_VERSION,
            ok_url: None,
            fail_url: None,
            hash_data,
            merchant_id: input.auth.merchant_id.clone(),
            customer_id: input.auth.customer_id.clone(),
            user_name: input.auth.username.clone(),
            card_number: None,
            card_expire_date_year: None,
            card_expire_date_month: None,
            card_cvv2: None,
            card_holder_name: None,
            batch_id: "0",
            transaction_type: input.tx_type.clone(),
            installment_count: input.installment.clone(),
            amount: input.amount.clone(),
            display_amount: input.amount.clone(),
            currency_code: input.currency.clone(),
            merchant_order_id: input.order.id.clone(),
            transaction_security: "3",
            additional_data: None,
        }
    }

    /// First leg of the 3-D flow, posted server-side to the pay gate; the
    /// bank answers with the HTML the caller renders to the browser.
    pub fn enrollment(
        crypt: &KuveytCrypt,
        account: &GatewayAccount,
        input: &KuveytRequestInput<'_>,
        card: &Card,
    ) -> CustomResult<Self, PosError> {
        let ok_url = input.order.success_url_str()?.to_string();
        let fail_url = input.order.fail_url_str()?.to_string();
        let hash_data = crypt.create_3d_hash(
            account,
            &vec![
                (
                    "merchant_order_id".to_string(),
                    input.order.id.clone(),
                ),
                ("amount".to_string(), input.amount.clone()),
                ("ok_url".to_string(), ok_url.clone()),
                ("fail_url".to_string(), fail_url.clone()),
            ],
        )?;
        let mut message = Self::base(input, hash_data);
        message.ok_url = Some(ok_url);
        message.fail_url = Some(fail_url);
        message.card_number = Some(card.number.clone());
        message.card_expire_date_year = Some(card.get_expiry_year_2_digit()?);
        message.card_expire_date_month = Some(card.get_expiry_month_2_digit()?);
        message.card_cvv2 = Some(card.cvv.clone());
        message.card_holder_name = card.holder_name.clone();
        Ok(message)
    }

    /// Direct non-secure sale: the card rides in the message and the hash
    /// does not bind redirect URLs.
    pub fn payment(
        crypt: &KuveytCrypt,
        account: &GatewayAccount,
        input: &KuveytRequestInput<'_>,
        card: &Card,
    ) -> CustomResult<Self, PosError> {
        let hash_data = crypt.create_hash(
            account,
            &vec![
                (
                    "merchant_order_id".to_string(),
                    input.order.id.clone(),
                ),
                ("amount".to_string(), input.amount.clone()),
            ],
        )?;
        let mut message = Self::base(input, hash_data);
        message.card_number = Some(card.number.clone());
        message.card_expire_date_year = Some(card.get_expiry_year_2_digit()?);
        message.card_expire_date_month = Some(card.get_expiry_month_2_digit()?);
        message.card_cvv2 = Some(card.cvv.clone());
        message.card_holder_name = card.holder_name.clone();
        Ok(message)
    }

    /// Provision leg carrying the `MD` token returned in the callback.
    pub fn provision(
        crypt: &KuveytCrypt,
        account: &GatewayAccount,
        input: &KuveytRequestInput<'_>,
        callback: &CallbackParams,
    ) -> CustomResult<Self, PosError> {
        let md = utils::require_callback_param(callback, "MD")?.to_string();
        let hash_data = crypt.create_hash(
            account,
            &vec![
                (
                    "merchant_order_id".to_string(),
                    input.order.id.clone(),
                ),
                ("amount".to_string(), input.amount.clone()),
            ],
        )?;
        let mut message = Self::base(input, hash_data);
        message.additional_data = Some(KuveytAdditionalData {
            additional_data: KuveytAdditionalDataEntry {
                key: "MD",
                data: md,
            },
        });
        Ok(message)
    }

    /// Card-less management message for cancel, refund and status, sent to
    /// the separate query API.
    pub fn management(
        crypt: &KuveytCrypt,
        account: &GatewayAccount,
        input: &KuveytRequestInput<'_>,
    ) -> CustomResult<Self, PosError> {
        let hash_data = crypt.create_hash(
            account,
            &vec![
                (
                    "merchant_order_id".to_string(),
                    input.order.id.clone(),
                ),
                ("amount".to_string(), input.amount.clone()),
            ],
        )?;
        Ok(Self::base(input, hash_data))
    }
}

#[derive(Debug, Deserialize)]
pub struct KuveytResponseContract {
    #[serde(rename = "ResponseCode")]
    pub response_code: Option<String>,
    #[serde(rename = "ResponseMessage")]
    pub response_message: Option<String>,
    #[serde(rename = "OrderId")]
    pub order_id: Option<String>,
    #[serde(rename = "MerchantOrderId")]
    pub merchant_order_id: Option<String>,
    #[serde(rename = "ProvisionNumber")]
    pub provision_number: Option<String>,
    #[serde(rename = "RRN")]
    pub rrn: Option<String>,
    #[serde(rename = "Stan")]
    pub stan: Option<String>,
    #[serde(rename = "MD")]
    pub md: Option<String>,
}

impl KuveytResponseContract {
    pub fn approved(&self) -> bool {
        self.response_code.as_deref() == Some(crate::consts::APPROVED_PROC_CODE)
    }

    pub fn into_result(self, on_approval: TransactionStatus) -> TransactionResult {
        let approved = self.approved();
        TransactionResult {
            status: if approved {
                on_approval
            } else {
                TransactionStatus::Failure
            },
            gateway_return_code: self.response_code.clone(),
            auth_code: self.provision_number,
            refs: ReferenceNumbers {
                host_ref_num: self.rrn,
                transaction_id: self.stan,
                remote_order_id: self.order_id,
                batch_id: None,
            },
            three_d: None,
            error_code: if approved { None } else { self.response_code },
            error_message: if approved { None } else { self.response_message },
            raw: serde_json::Value::Null,
        }
    }
}

/// Normalize the bank's authentication callback after hash verification.
pub fn callback_to_result(
    verified: bool,
    model: PaymentModel,
    params: &CallbackParams,
) -> TransactionResult {
    let raw = serde_json::to_value(params).unwrap_or_default();
    let response_code = utils::callback_param(params, "ResponseCode").to_string();
    let authenticated = response_code == crate::consts::APPROVED_PROC_CODE;
    let three_d = ThreeDSecureData {
        md_status: Some(response_code.clone()),
        eci: None,
        cavv: None,
        xid: None,
        md: params.get("MD").cloned(),
    };

    let status = if !verified || !authenticated {
        TransactionStatus::AuthenticationFailed
    } else if model == PaymentModel::ThreeDSecure {
        TransactionStatus::AuthenticationPending
    } else {
        TransactionStatus::Failure
    };

    TransactionResult {
        status,
        gateway_return_code: Some(response_code),
        auth_code: None,
        refs: ReferenceNumbers {
            host_ref_num: None,
            transaction_id: None,
            remote_order_id: params.get("MerchantOrderId").cloned(),
            batch_id: None,
        },
        three_d: Some(three_d),
        error_code: None,
        error_message: params.get("ResponseMessage").cloned(),
        raw,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use masking::Secret;

    use super::*;
    use crate::{enums::Currency, types::MinorUnit};

    fn account() -> GatewayAccount {
        GatewayAccount::new(GatewayKind::Kuveyt, "80")
            .with_credentials("apiuser", Secret::new("api123".to_string()))
            .with_sub_merchant_id("400235")
    }

    fn order() -> Order {
        let mut order = Order::new("order222", MinorUnit::new(10025), Currency::TRY);
        order.success_url = Some(url::Url::parse("https://domain.com/success").unwrap());
        order.fail_url = Some(url::Url::parse("https://domain.com/fail_url").unwrap());
        order
    }

    fn card() -> Card {
        Card::new(
            masking::StrongSecret::new("4155650100416111".to_string()),
            Secret::new("1".to_string()),
            Secret::new("25".to_string()),
            Secret::new("123".to_string()),
        )
        .with_holder_name(Secret::new("John Doe".to_string()))
    }

    #[test]
    fn enrollment_hash_matches_known_vector() {
        let data = vec![
            ("merchant_order_id".to_string(), "order222".to_string()),
            ("amount".to_string(), "10025".to_string()),
            ("ok_url".to_string(), "https://domain.com/success".to_string()),
            (
                "fail_url".to_string(),
                "https://domain.com/fail_url".to_string(),
            ),
        ];

        let hash = KuveytCrypt.create_3d_hash(&account(), &data).unwrap();

        assert_eq!(hash, "PUijMr7Jo2FDK8Uc3APyW3wkd1A=");
    }

    #[test]
    fn provision_hash_matches_known_vector() {
        let data = vec![
            ("merchant_order_id".to_string(), "order222".to_string()),
            ("amount".to_string(), "10025".to_string()),
        ];

        let hash = KuveytCrypt.create_hash(&account(), &data).unwrap();

        assert_eq!(hash, "JHJAR+M4vkK6W5oM3qYTGMrnbqw=");
    }

    fn callback() -> CallbackParams {
        let mut params = CallbackParams::new();
        params.insert("ResponseCode".to_string(), "00".to_string());
        params.insert("ResponseMessage".to_string(), "Kart doğrulandı.".to_string());
        params.insert("MerchantOrderId".to_string(), "order222".to_string());
        params.insert("MD".to_string(), "67YtBfBRTZ0XBKnAHi8c/A==".to_string());
        params.insert(
            "HashData".to_string(),
            "X6noDXSE8JHFeE855grO2u9S2eo=".to_string(),
        );
        params
    }

    #[test]
    fn callback_verifies_and_fails_closed() {
        let account = account();
        assert!(KuveytCrypt.check_3d_hash(&account, &callback()).unwrap());

        let mut altered = callback();
        altered.insert("ResponseCode".to_string(), "05".to_string());
        assert!(!KuveytCrypt.check_3d_hash(&account, &altered).unwrap());

        let mut missing = callback();
        missing.remove("HashData");
        assert!(!KuveytCrypt.check_3d_hash(&account, &missing).unwrap());
    }

    #[test]
    fn wrong_account_family_is_a_misuse_error() {
        let foreign = GatewayAccount::new(GatewayKind::Estpos, "80");

        let error = KuveytCrypt.check_3d_hash(&foreign, &callback()).unwrap_err();

        assert!(matches!(
            error.current_context(),
            PosError::FailedToObtainAuthType
        ));
    }

    #[test]
    fn enrollment_message_renders_envelope_in_wire_order() {
        let account = account();
        let auth = KuveytAuthType::try_from(&account).unwrap();
        let order = order();
        let input = KuveytRequestInput {
            auth: &auth,
            order: &order,
            tx_type: "Sale".to_string(),
            amount: "10025".to_string(),
            currency: "0949".to_string(),
            installment: "0".to_string(),
        };

        let message =
            KuveytVPosMessage::enrollment(&KuveytCrypt, &account, &input, &card()).unwrap();
        let xml = quick_xml::se::to_string(&message).unwrap();

        assert!(xml.starts_with("<KuveytTurkVPosMessage>"));
        assert!(xml.contains("<APIVersion>TDV2.0.0</APIVersion>"));
        assert!(xml.contains("<HashData>PUijMr7Jo2FDK8Uc3APyW3wkd1A=</HashData>"));
        assert!(xml.contains("<CardExpireDateYear>25</CardExpireDateYear>"));
        assert!(xml.contains("<CardExpireDateMonth>01</CardExpireDateMonth>"));
        assert!(xml.contains("<CurrencyCode>0949</CurrencyCode>"));
        assert!(xml.contains("<TransactionSecurity>3</TransactionSecurity>"));
        assert!(xml.find("<OkUrl>").unwrap() < xml.find("<MerchantId>").unwrap());
    }

    #[test]
    fn provision_message_carries_the_md_token() {
        let account = account();
        let auth = KuveytAuthType::try_from(&account).unwrap();
        let order = order();
        let input = KuveytRequestInput {
            auth: &auth,
            order: &order,
            tx_type: "Sale".to_string(),
            amount: "10025".to_string(),
            currency: "0949".to_string(),
            installment: "0".to_string(),
        };

        let message =
            KuveytVPosMessage::provision(&KuveytCrypt, &account, &input, &callback()).unwrap();
        let xml = quick_xml::se::to_string(&message).unwrap();

        assert!(xml.contains("<Key>MD</Key>"));
        assert!(xml.contains("<Data>67YtBfBRTZ0XBKnAHi8c/A==</Data>"));
        assert!(!xml.contains("<CardNumber>"));
    }

    #[test]
    fn provision_response_parses_and_normalizes() {
        use crate::utils::BytesExt;

        let body = br#"<VPosTransactionResponseContract>
            <ResponseCode>00</ResponseCode>
            <ResponseMessage>OTORIZASYON VERILDI</ResponseMessage>
            <OrderId>660723</OrderId>
            <MerchantOrderId>order222</MerchantOrderId>
            <ProvisionNumber>896626</ProvisionNumber>
            <RRN>904115005554</RRN>
            <Stan>005554</Stan>
        </VPosTransactionResponseContract>"#;

        let response: KuveytResponseContract =
            body.as_slice().parse_xml("KuveytResponseContract").unwrap();
        let result = response.into_result(TransactionStatus::Charged);

        assert!(result.approved());
        assert_eq!(result.auth_code.as_deref(), Some("896626"));
        assert_eq!(result.refs.host_ref_num.as_deref(), Some("904115005554"));
        assert_eq!(result.refs.transaction_id.as_deref(), Some("005554"));
    }

    #[test]
    fn missing_response_code_is_a_decline() {
        use crate::utils::BytesExt;

        let body = br#"<VPosTransactionResponseContract>
            <MerchantOrderId>order222</MerchantOrderId>
        </VPosTransactionResponseContract>"#;

        let response: KuveytResponseContract =
            body.as_slice().parse_xml("KuveytResponseContract").unwrap();

        assert!(!response.approved());
        assert_eq!(
            response.into_result(TransactionStatus::Charged).status,
            TransactionStatus::Failure
        );
    }
}
