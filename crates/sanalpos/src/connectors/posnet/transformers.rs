//! Wire types and signing for the Yapı Kredi Posnet gateway.

use base64::Engine;
use masking::{PeekInterface, Secret, StrongSecret};
use serde::{Deserialize, Serialize};

use crate::{
    api::GatewayCrypt,
    crypto::{GenerateDigest, Sha256},
    domain::{
        CallbackParams, Card, FormFields, GatewayAccount, Order, ReferenceNumbers,
        ThreeDSecureData, TransactionResult,
    },
    enums::{GatewayKind, PaymentModel, TransactionStatus},
    errors::{CustomResult, PosError},
    utils::{self, CardData},
};

/// Posnet pads the OOS transaction id to twenty digits.
pub const XID_LENGTH: usize = 20;

pub struct PosnetAuthType {
    pub(super) merchant_id: String,
    pub(super) terminal_id: String,
    /// Posnet-id of the storefront, carried in the sub-merchant slot
    pub(super) posnet_id: String,
}

impl TryFrom<&GatewayAccount> for PosnetAuthType {
    type Error = error_stack::Report<PosError>;

    fn try_from(account: &GatewayAccount) -> Result<Self, Self::Error> {
        account.ensure_kind(&[GatewayKind::Posnet])?;
        match (&account.terminal_id, &account.sub_merchant_id) {
            (Some(terminal_id), Some(posnet_id)) => Ok(Self {
                merchant_id: account.client_id.clone(),
                terminal_id: terminal_id.clone(),
                posnet_id: posnet_id.clone(),
            }),
            _ => Err(PosError::FailedToObtainAuthType)?,
        }
    }
}

/// Zero-pad an order id into the fixed-width OOS transaction id.
pub fn format_xid(order_id: &str) -> String {
    format!("{order_id:0>width$}", width = XID_LENGTH)
}

/// Two-level `;`-delimited MAC:
/// `MAC = HASH(xid;amount;currency;merchant;HASH(storeKey;terminal))` with
/// `HASH(x) = Base64(SHA-256(x))`.
pub struct PosnetCrypt;

impl PosnetCrypt {
    fn hash(plain: &str) -> CustomResult<String, PosError> {
        let digest = Sha256
            .generate_digest(plain.as_bytes())
            .map_err(|_| PosError::RequestEncodingFailed)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(digest))
    }

    fn first_hash(account: &GatewayAccount) -> CustomResult<String, PosError> {
        let enc_key = account
            .store_key
            .as_ref()
            .ok_or(PosError::FailedToObtainAuthType)?;
        let terminal_id = account
            .terminal_id
            .as_ref()
            .ok_or(PosError::FailedToObtainAuthType)?;
        Self::hash(&format!("{};{}", enc_key.peek(), terminal_id))
    }

    fn mac(
        account: &GatewayAccount,
        xid: &str,
        amount: &str,
        currency: &str,
    ) -> CustomResult<String, PosError> {
        let first_hash = Self::first_hash(account)?;
        Self::hash(&format!(
            "{xid};{amount};{currency};{};{first_hash}",
            account.client_id
        ))
    }
}

impl GatewayCrypt for PosnetCrypt {
    fn create_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError> {
        account.ensure_kind(&[GatewayKind::Posnet])?;
        Self::mac(
            account,
            utils::form_field(data, "xid"),
            utils::form_field(data, "amount"),
            utils::form_field(data, "currency"),
        )
    }

    fn create_3d_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError> {
        self.create_hash(account, data)
    }

    fn check_3d_hash(
        &self,
        account: &GatewayAccount,
        params: &CallbackParams,
    ) -> CustomResult<bool, PosError> {
        account.ensure_kind(&[GatewayKind::Posnet])?;
        let Some(received) = params.get("mac") else {
            return Ok(false);
        };
        let first_hash = Self::first_hash(account)?;
        let actual = Self::hash(&format!(
            "{};{};{};{};{};{first_hash}",
            utils::callback_param(params, "mdStatus"),
            utils::callback_param(params, "xid"),
            utils::callback_param(params, "amount"),
            utils::callback_param(params, "currency"),
            account.client_id,
        ))?;
        Ok(&actual == received)
    }
}

#[derive(Debug, Serialize)]
pub struct OosRequestData {
    pub posnetid: String,
    #[serde(rename = "XID")]
    pub xid: String,
    pub amount: String,
    #[serde(rename = "currencyCode")]
    pub currency_code: String,
    pub installment: String,
    #[serde(rename = "tranType")]
    pub tran_type: String,
    #[serde(rename = "cardHolderName", skip_serializing_if = "Option::is_none")]
    pub card_holder_name: Option<Secret<String>>,
    pub ccno: StrongSecret<String>,
    #[serde(rename = "expDate")]
    pub exp_date: Secret<String>,
    pub cvc: Secret<String>,
}

#[derive(Debug, Serialize)]
pub struct PosnetSale {
    #[serde(rename = "orderID")]
    pub order_id: String,
    pub amount: String,
    #[serde(rename = "currencyCode")]
    pub currency_code: String,
    pub installment: String,
    pub ccno: StrongSecret<String>,
    #[serde(rename = "expDate")]
    pub exp_date: Secret<String>,
    pub cvc: Secret<String>,
}

#[derive(Debug, Serialize)]
pub struct PosnetCapture {
    #[serde(rename = "hostLogKey")]
    pub host_log_key: String,
    #[serde(rename = "authCode", skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    pub amount: String,
    #[serde(rename = "currencyCode")]
    pub currency_code: String,
    pub installment: String,
}

#[derive(Debug, Serialize)]
pub struct PosnetReverse {
    pub transaction: &'static str,
    #[serde(rename = "hostLogKey")]
    pub host_log_key: String,
    #[serde(rename = "authCode", skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PosnetReturn {
    pub amount: String,
    #[serde(rename = "currencyCode")]
    pub currency_code: String,
    #[serde(rename = "hostLogKey")]
    pub host_log_key: String,
}

#[derive(Debug, Serialize)]
pub struct PosnetAgreement {
    #[serde(rename = "orderID")]
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct OosResolveMerchantData {
    #[serde(rename = "bankData")]
    pub bank_data: String,
    #[serde(rename = "merchantData")]
    pub merchant_data: String,
    pub sign: String,
    pub mac: String,
}

#[derive(Debug, Serialize)]
pub struct OosTranData {
    #[serde(rename = "bankData")]
    pub bank_data: String,
    pub mac: String,
    #[serde(rename = "wpAmount")]
    pub wp_amount: &'static str,
}

/// The Posnet request envelope; exactly one operation block is populated.
#[derive(Debug, Serialize)]
#[serde(rename = "posnetRequest")]
pub struct PosnetRequest {
    pub mid: String,
    pub tid: String,
    #[serde(rename = "tranDateRequired", skip_serializing_if = "Option::is_none")]
    pub tran_date_required: Option<&'static str>,
    #[serde(rename = "oosRequestData", skip_serializing_if = "Option::is_none")]
    pub oos_request_data: Option<OosRequestData>,
    #[serde(rename = "oosResolveMerchantData", skip_serializing_if = "Option::is_none")]
    pub oos_resolve_merchant_data: Option<OosResolveMerchantData>,
    #[serde(rename = "oosTranData", skip_serializing_if = "Option::is_none")]
    pub oos_tran_data: Option<OosTranData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale: Option<PosnetSale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<PosnetSale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capt: Option<PosnetCapture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<PosnetReverse>,
    #[serde(rename = "return", skip_serializing_if = "Option::is_none")]
    pub return_op: Option<PosnetReturn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<PosnetAgreement>,
}

impl PosnetRequest {
    fn base(auth: &PosnetAuthType) -> Self {
        Self {
            mid: auth.merchant_id.clone(),
            tid: auth.terminal_id.clone(),
            tran_date_required: Some("1"),
            oos_request_data: None,
            oos_resolve_merchant_data: None,
            oos_tran_data: None,
            sale: None,
            auth: None,
            capt: None,
            reverse: None,
            return_op: None,
            agreement: None,
        }
    }

    pub fn payment(
        auth: &PosnetAuthType,
        order: &Order,
        card: &Card,
        pre_auth: bool,
        amount: String,
        currency: String,
        installment: String,
    ) -> CustomResult<Self, PosError> {
        let mut request = Self::base(auth);
        let sale = PosnetSale {
            order_id: format_xid(&order.id),
            amount,
            currency_code: currency,
            installment,
            ccno: card.number.clone(),
            exp_date: card.get_expiry_date_as_yymm()?,
            cvc: card.cvv.clone(),
        };
        if pre_auth {
            request.auth = Some(sale);
        } else {
            request.sale = Some(sale);
        }
        Ok(request)
    }

    pub fn enrollment(
        auth: &PosnetAuthType,
        order: &Order,
        card: &Card,
        tran_type: String,
        amount: String,
        currency: String,
        installment: String,
    ) -> CustomResult<Self, PosError> {
        let mut request = Self::base(auth);
        request.tran_date_required = None;
        request.oos_request_data = Some(OosRequestData {
            posnetid: auth.posnet_id.clone(),
            xid: format_xid(&order.id),
            amount,
            currency_code: currency,
            installment,
            tran_type,
            card_holder_name: card.holder_name.clone(),
            ccno: card.number.clone(),
            exp_date: card.get_expiry_date_as_yymm()?,
            cvc: card.cvv.clone(),
        });
        Ok(request)
    }

    /// Finalize leg of the OOS flow: the bank packet plus our MAC.
    pub fn three_d_payment(
        account: &GatewayAccount,
        auth: &PosnetAuthType,
        order: &Order,
        amount: String,
        currency: String,
        callback: &CallbackParams,
    ) -> CustomResult<Self, PosError> {
        let bank_data = utils::require_callback_param(callback, "BankPacket")?.to_string();
        let mac = PosnetCrypt::mac(account, &format_xid(&order.id), &amount, &currency)?;
        let mut request = Self::base(auth);
        request.oos_tran_data = Some(OosTranData {
            bank_data,
            mac,
            wp_amount: "0",
        });
        Ok(request)
    }

    pub fn capture(
        auth: &PosnetAuthType,
        order: &Order,
        amount: String,
        currency: String,
        installment: String,
    ) -> CustomResult<Self, PosError> {
        let host_log_key =
            order
                .linked
                .ref_ret_num
                .clone()
                .ok_or(PosError::MissingRequiredField {
                    field_name: "linked.ref_ret_num",
                })?;
        let mut request = Self::base(auth);
        request.capt = Some(PosnetCapture {
            host_log_key,
            auth_code: order.linked.auth_code.clone(),
            amount,
            currency_code: currency,
            installment,
        });
        Ok(request)
    }

    pub fn cancel(auth: &PosnetAuthType, order: &Order) -> CustomResult<Self, PosError> {
        let host_log_key =
            order
                .linked
                .ref_ret_num
                .clone()
                .ok_or(PosError::MissingRequiredField {
                    field_name: "linked.ref_ret_num",
                })?;
        let mut request = Self::base(auth);
        request.reverse = Some(PosnetReverse {
            transaction: "sale",
            host_log_key,
            auth_code: order.linked.auth_code.clone(),
        });
        Ok(request)
    }

    pub fn refund(
        auth: &PosnetAuthType,
        order: &Order,
        amount: String,
        currency: String,
    ) -> CustomResult<Self, PosError> {
        let host_log_key =
            order
                .linked
                .ref_ret_num
                .clone()
                .ok_or(PosError::MissingRequiredField {
                    field_name: "linked.ref_ret_num",
                })?;
        let mut request = Self::base(auth);
        request.return_op = Some(PosnetReturn {
            amount,
            currency_code: currency,
            host_log_key,
        });
        Ok(request)
    }

    pub fn status(auth: &PosnetAuthType, order: &Order) -> Self {
        let mut request = Self::base(auth);
        request.agreement = Some(PosnetAgreement {
            order_id: format_xid(&order.id),
        });
        request
    }
}

/// The redirect form for the OOS gateway, built from the enrollment
/// response's `data1`/`data2`/`sign` tokens.
pub fn three_d_form_fields(
    auth: &PosnetAuthType,
    order: &Order,
    bank_data: &CallbackParams,
    lang: crate::enums::Language,
) -> CustomResult<FormFields, PosError> {
    Ok(vec![
        ("mid".to_string(), auth.merchant_id.clone()),
        ("posnetID".to_string(), auth.posnet_id.clone()),
        (
            "posnetData".to_string(),
            utils::require_callback_param(bank_data, "data1")?.to_string(),
        ),
        (
            "posnetData2".to_string(),
            utils::require_callback_param(bank_data, "data2")?.to_string(),
        ),
        (
            "digest".to_string(),
            utils::require_callback_param(bank_data, "sign")?.to_string(),
        ),
        (
            "merchantReturnURL".to_string(),
            order.success_url_str()?.to_string(),
        ),
        ("lang".to_string(), lang.to_string()),
        ("openANewWindow".to_string(), "0".to_string()),
    ])
}

#[derive(Debug, Deserialize)]
pub struct OosRequestDataResponse {
    pub data1: Option<String>,
    pub data2: Option<String>,
    pub sign: Option<String>,
}

/// The Posnet response envelope. `approved` is a boolean-like string
/// (`"1"`/`"0"`), one of the failure-signalling shapes the normalizer must
/// tolerate.
#[derive(Debug, Deserialize)]
#[serde(rename = "posnetResponse")]
pub struct PosnetResponse {
    pub approved: Option<String>,
    #[serde(rename = "respCode")]
    pub resp_code: Option<String>,
    #[serde(rename = "respText")]
    pub resp_text: Option<String>,
    #[serde(rename = "hostlogkey")]
    pub host_log_key: Option<String>,
    #[serde(rename = "authCode")]
    pub auth_code: Option<String>,
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    #[serde(rename = "yourIP")]
    pub your_ip: Option<String>,
    #[serde(rename = "oosRequestDataResponse")]
    pub oos_request_data_response: Option<OosRequestDataResponse>,
}

impl PosnetResponse {
    pub fn approved(&self) -> bool {
        self.approved.as_deref() == Some("1")
    }

    pub fn into_result(self, on_approval: TransactionStatus) -> TransactionResult {
        let approved = self.approved();
        TransactionResult {
            status: if approved {
                on_approval
            } else {
                TransactionStatus::Failure
            },
            gateway_return_code: self.resp_code.clone(),
            auth_code: self.auth_code,
            refs: ReferenceNumbers {
                host_ref_num: self.host_log_key,
                transaction_id: None,
                remote_order_id: self.order_id,
                batch_id: None,
            },
            three_d: None,
            error_code: if approved { None } else { self.resp_code },
            error_message: if approved { None } else { self.resp_text },
            raw: serde_json::Value::Null,
        }
    }

    pub fn into_enrollment_tokens(self) -> CustomResult<CallbackParams, PosError> {
        if !self.approved() {
            return Err(
                error_stack::Report::new(PosError::ProcessingStepFailed(None)).attach_printable(
                    format!("oos enrollment declined: {:?}", self.resp_text),
                ),
            );
        }
        let data = self
            .oos_request_data_response
            .ok_or(PosError::ResponseDeserializationFailed)?;
        let mut tokens = CallbackParams::new();
        tokens.insert(
            "data1".to_string(),
            data.data1.ok_or(PosError::ResponseDeserializationFailed)?,
        );
        tokens.insert(
            "data2".to_string(),
            data.data2.ok_or(PosError::ResponseDeserializationFailed)?,
        );
        tokens.insert(
            "sign".to_string(),
            data.sign.ok_or(PosError::ResponseDeserializationFailed)?,
        );
        Ok(tokens)
    }
}

fn md_status_authenticated(md_status: &str) -> bool {
    md_status == "1"
}

/// Normalize the resolved OOS callback after MAC verification.
pub fn callback_to_result(
    verified: bool,
    model: PaymentModel,
    params: &CallbackParams,
) -> TransactionResult {
    let raw = serde_json::to_value(params).unwrap_or_default();
    let md_status = utils::callback_param(params, "mdStatus").to_string();
    let three_d = ThreeDSecureData {
        md_status: Some(md_status.clone()),
        eci: None,
        cavv: None,
        xid: params.get("xid").cloned(),
        md: params.get("BankPacket").cloned(),
    };

    let status = if !verified || !md_status_authenticated(&md_status) {
        TransactionStatus::AuthenticationFailed
    } else if model == PaymentModel::ThreeDSecure {
        TransactionStatus::AuthenticationPending
    } else {
        TransactionStatus::Failure
    };

    TransactionResult {
        status,
        gateway_return_code: None,
        auth_code: None,
        refs: ReferenceNumbers {
            host_ref_num: None,
            transaction_id: params.get("xid").cloned(),
            remote_order_id: None,
            batch_id: None,
        },
        three_d: Some(three_d),
        error_code: None,
        error_message: params.get("mdErrorMessage").cloned(),
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
        GatewayAccount::new(GatewayKind::Posnet, "6706598320")
            .with_terminal_id("67005551")
            .with_sub_merchant_id("9644")
            .with_store_key(Secret::new("10,10,10,10,10,10,10,10".to_string()))
    }

    fn order() -> Order {
        let mut order = Order::new("order222", MinorUnit::new(10025), Currency::TRY);
        order.success_url = Some(url::Url::parse("https://domain.com/success").unwrap());
        order.fail_url = Some(url::Url::parse("https://domain.com/fail_url").unwrap());
        order
    }

    fn card() -> Card {
        Card::new(
            masking::StrongSecret::new("4355084355084358".to_string()),
            Secret::new("12".to_string()),
            Secret::new("26".to_string()),
            Secret::new("123".to_string()),
        )
    }

    #[test]
    fn xid_is_zero_padded_to_twenty() {
        assert_eq!(format_xid("order222"), "000000000000order222");
        assert_eq!(format_xid("order222").len(), XID_LENGTH);
    }

    #[test]
    fn mac_layers_the_terminal_hash() {
        let data = vec![
            ("xid".to_string(), format_xid("order222")),
            ("amount".to_string(), "10025".to_string()),
            ("currency".to_string(), "TL".to_string()),
        ];

        let mac = PosnetCrypt.create_hash(&account(), &data).unwrap();

        assert_eq!(mac, "kffokQISDXvLl4xY6FFD8nRT7bDzujpKNS/89ugkwSA=");
    }

    #[test]
    fn mac_is_deterministic() {
        let data = vec![
            ("xid".to_string(), format_xid("order222")),
            ("amount".to_string(), "10025".to_string()),
            ("currency".to_string(), "TL".to_string()),
        ];
        let account = account();

        assert_eq!(
            PosnetCrypt.create_hash(&account, &data).unwrap(),
            PosnetCrypt.create_hash(&account, &data).unwrap()
        );
    }

    fn resolve_params() -> CallbackParams {
        let mut params = CallbackParams::new();
        params.insert("mdStatus".to_string(), "1".to_string());
        params.insert("xid".to_string(), format_xid("order222"));
        params.insert("amount".to_string(), "10025".to_string());
        params.insert("currency".to_string(), "TL".to_string());
        params.insert("BankPacket".to_string(), "F61E1A68...".to_string());
        params.insert(
            "mac".to_string(),
            "F0f0OJH5QphM/pKAOvjMqGs0cHbmPQ9SALTP/kcf3hA=".to_string(),
        );
        params
    }

    #[test]
    fn resolve_mac_verifies_and_fails_closed() {
        let account = account();
        assert!(PosnetCrypt.check_3d_hash(&account, &resolve_params()).unwrap());

        let mut blanked = resolve_params();
        blanked.insert("mdStatus".to_string(), String::new());
        assert!(!PosnetCrypt.check_3d_hash(&account, &blanked).unwrap());

        let mut missing = resolve_params();
        missing.remove("mac");
        assert!(!PosnetCrypt.check_3d_hash(&account, &missing).unwrap());
    }

    #[test]
    fn enrollment_request_renders_oos_block() {
        let account = account();
        let auth = PosnetAuthType::try_from(&account).unwrap();
        let request = PosnetRequest::enrollment(
            &auth,
            &order(),
            &card(),
            "Sale".to_string(),
            "10025".to_string(),
            "TL".to_string(),
            "00".to_string(),
        )
        .unwrap();

        let xml = quick_xml::se::to_string(&request).unwrap();
        assert!(xml.starts_with("<posnetRequest>"));
        assert!(xml.contains("<mid>6706598320</mid>"));
        assert!(xml.contains("<posnetid>9644</posnetid>"));
        assert!(xml.contains("<XID>000000000000order222</XID>"));
        assert!(xml.contains("<expDate>2612</expDate>"));
        assert!(!xml.contains("tranDateRequired"));
    }

    #[test]
    fn cancel_addresses_by_host_log_key_only() {
        let account = account();
        let auth = PosnetAuthType::try_from(&account).unwrap();
        let error = PosnetRequest::cancel(&auth, &order()).unwrap_err();
        assert!(matches!(
            error.current_context(),
            PosError::MissingRequiredField {
                field_name: "linked.ref_ret_num"
            }
        ));

        let mut addressed = order();
        addressed.linked.ref_ret_num = Some("0000000002P0806031".to_string());
        let request = PosnetRequest::cancel(&auth, &addressed).unwrap();
        let xml = quick_xml::se::to_string(&request).unwrap();
        assert!(xml.contains("<hostLogKey>0000000002P0806031</hostLogKey>"));
        assert!(xml.contains("<transaction>sale</transaction>"));
    }

    #[test]
    fn enrollment_response_yields_redirect_tokens() {
        use crate::utils::BytesExt;

        let body = br#"<posnetResponse>
            <approved>1</approved>
            <respCode></respCode>
            <respText></respText>
            <oosRequestDataResponse>
                <data1>AEFE78BFC852867FF57078B723E284D1</data1>
                <data2>69D04861340091B7014B15B0017D14AF</data2>
                <sign>9998F61E1D0C0FB6EC5203A748124F30</sign>
            </oosRequestDataResponse>
        </posnetResponse>"#;

        let response: PosnetResponse = body.as_slice().parse_xml("PosnetResponse").unwrap();
        let tokens = response.into_enrollment_tokens().unwrap();

        assert_eq!(
            tokens.get("data1").map(String::as_str),
            Some("AEFE78BFC852867FF57078B723E284D1")
        );

        let account = account();
        let auth = PosnetAuthType::try_from(&account).unwrap();
        let fields =
            three_d_form_fields(&auth, &order(), &tokens, crate::enums::Language::Tr).unwrap();
        assert_eq!(fields[0], ("mid".to_string(), "6706598320".to_string()));
        assert!(fields
            .iter()
            .any(|(name, value)| name == "digest" && value == "9998F61E1D0C0FB6EC5203A748124F30"));
    }

    #[test]
    fn declined_payment_response_surfaces_resp_text() {
        use crate::utils::BytesExt;

        let body = br#"<posnetResponse>
            <approved>0</approved>
            <respCode>0127</respCode>
            <respText>ORDERID DAHA ONCE KULLANILMIS</respText>
        </posnetResponse>"#;

        let response: PosnetResponse = body.as_slice().parse_xml("PosnetResponse").unwrap();
        let result = response.into_result(TransactionStatus::Charged);

        assert_eq!(result.status, TransactionStatus::Failure);
        assert_eq!(
            result.error_message.as_deref(),
            Some("ORDERID DAHA ONCE KULLANILMIS")
        );
    }

    #[test]
    fn unverified_resolve_is_rejected() {
        let result = callback_to_result(false, PaymentModel::ThreeDSecure, &resolve_params());
        assert_eq!(result.status, TransactionStatus::AuthenticationFailed);
    }
}
