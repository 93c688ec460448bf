//! Wire types and signing for the Akbank JSON virtual POS.

use base64::Engine;
use masking::{PeekInterface, Secret, StrongSecret};
use serde::{Deserialize, Serialize};

use crate::{
    api::GatewayCrypt,
    crypto::{HmacSha512, SignMessage},
    domain::{
        CallbackParams, Card, FormFields, GatewayAccount, HistoryQuery, Order, ReferenceNumbers,
        RequestEnv, ThreeDSecureData, TransactionResult,
    },
    enums::{GatewayKind, PaymentModel, TransactionStatus},
    errors::{CustomResult, PosError},
    utils::{self, CardData},
};

pub const API_VERSION: &str = "1.00";

/// Response code the API returns for a successful call.
pub const APPROVED_RESPONSE_CODE: &str = "VPS-0000";

/// `requestDateTime` layout, local time with milliseconds and no offset.
const REQUEST_DATE_TIME_FORMAT: &[time::format_description::FormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]");

pub struct AkbankAuthType {
    pub(super) merchant_safe_id: String,
    pub(super) terminal_safe_id: String,
    pub(super) sub_merchant_id: Option<String>,
}

impl TryFrom<&GatewayAccount> for AkbankAuthType {
    type Error = error_stack::Report<PosError>;

    fn try_from(account: &GatewayAccount) -> Result<Self, Self::Error> {
        account.ensure_kind(&[GatewayKind::Akbank])?;
        match (&account.terminal_id, &account.store_key) {
            (Some(terminal_safe_id), Some(_secret_key)) => Ok(Self {
                merchant_safe_id: account.client_id.clone(),
                terminal_safe_id: terminal_safe_id.clone(),
                sub_merchant_id: account.sub_merchant_id.clone(),
            }),
            _ => Err(PosError::FailedToObtainAuthType)?,
        }
    }
}

pub fn format_request_date_time(
    timestamp: time::PrimitiveDateTime,
) -> CustomResult<String, PosError> {
    timestamp
        .format(REQUEST_DATE_TIME_FORMAT)
        .map_err(|_| PosError::RequestEncodingFailed.into())
}

/// HMAC-SHA-512 strategy, Base64 output, keyed with the terminal's secret
/// key. Request bodies are signed whole; redirect forms over the declared
/// ordered field list; callbacks over the response-supplied `hashParams`
/// list (`+`-separated).
pub struct AkbankCrypt;

impl AkbankCrypt {
    fn secret_key(account: &GatewayAccount) -> CustomResult<Secret<String>, PosError> {
        account
            .store_key
            .clone()
            .ok_or_else(|| PosError::FailedToObtainAuthType.into())
    }

    fn hmac(key: &Secret<String>, plain: &[u8]) -> CustomResult<String, PosError> {
        let mac = HmacSha512
            .sign_message(key.peek().as_bytes(), plain)
            .map_err(|_| PosError::RequestEncodingFailed)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(mac))
    }

    /// MAC over a serialized request body, carried in the `auth-hash`
    /// header.
    pub fn sign_body(account: &GatewayAccount, body: &str) -> CustomResult<String, PosError> {
        account.ensure_kind(&[GatewayKind::Akbank])?;
        Self::hmac(&Self::secret_key(account)?, body.as_bytes())
    }
}

impl GatewayCrypt for AkbankCrypt {
    fn create_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError> {
        self.create_3d_hash(account, data)
    }

    /// Concatenates every field value in the order given; the formatter owns
    /// the declared ordering.
    fn create_3d_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError> {
        account.ensure_kind(&[GatewayKind::Akbank])?;
        let plain: String = data.iter().map(|(_, value)| value.as_str()).collect();
        Self::hmac(&Self::secret_key(account)?, plain.as_bytes())
    }

    fn check_3d_hash(
        &self,
        account: &GatewayAccount,
        params: &CallbackParams,
    ) -> CustomResult<bool, PosError> {
        account.ensure_kind(&[GatewayKind::Akbank])?;
        let (Some(hash_params), Some(received)) = (params.get("hashParams"), params.get("hash"))
        else {
            return Ok(false);
        };
        let mut plain = String::new();
        for name in hash_params.split('+').filter(|name| !name.is_empty()) {
            plain.push_str(utils::callback_param(params, name));
        }
        let actual = Self::hmac(&Self::secret_key(account)?, plain.as_bytes())?;
        Ok(&actual == received)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankTerminal {
    pub merchant_safe_id: String,
    pub terminal_safe_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankSubMerchant {
    pub sub_merchant_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankCard {
    pub card_number: StrongSecret<String>,
    pub cvv2: Secret<String>,
    pub expire_date: Secret<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankTransaction {
    pub amount: String,
    pub currency_code: i64,
    pub moto_ind: i64,
    pub install_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankOrder {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankCustomer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankSecure {
    pub secure_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_ecom_ind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankReport {
    pub start_date_time: String,
    pub end_date_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

/// The process-API request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankProcessRequest {
    pub version: &'static str,
    pub txn_code: String,
    pub request_date_time: String,
    pub random_number: String,
    pub terminal: AkbankTerminal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_merchant: Option<AkbankSubMerchant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<AkbankCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<AkbankOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<AkbankTransaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<AkbankCustomer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<AkbankSecure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AkbankReport>,
}

pub struct AkbankRequestInput<'a> {
    pub auth: &'a AkbankAuthType,
    pub order: &'a Order,
    pub txn_code: String,
    pub amount: String,
    pub currency: i64,
    pub install_count: i64,
}

impl AkbankProcessRequest {
    fn base(
        auth: &AkbankAuthType,
        txn_code: String,
        env: &RequestEnv,
    ) -> CustomResult<Self, PosError> {
        Ok(Self {
            version: API_VERSION,
            txn_code,
            request_date_time: format_request_date_time(env.timestamp)?,
            random_number: env.rnd.clone(),
            terminal: AkbankTerminal {
                merchant_safe_id: auth.merchant_safe_id.clone(),
                terminal_safe_id: auth.terminal_safe_id.clone(),
            },
            sub_merchant: auth.sub_merchant_id.clone().map(|sub_merchant_id| {
                AkbankSubMerchant { sub_merchant_id }
            }),
            card: None,
            order: None,
            transaction: None,
            customer: None,
            secure: None,
            report: None,
        })
    }

    pub fn payment(
        input: &AkbankRequestInput<'_>,
        card: &Card,
        env: &RequestEnv,
    ) -> CustomResult<Self, PosError> {
        let mut request = Self::base(input.auth, input.txn_code.clone(), env)?;
        request.card = Some(AkbankCard {
            card_number: card.number.clone(),
            cvv2: card.cvv.clone(),
            expire_date: card.get_expiry_date_as_mmyy()?,
        });
        request.order = Some(AkbankOrder {
            order_id: input.order.id.clone(),
        });
        request.transaction = Some(AkbankTransaction {
            amount: input.amount.clone(),
            currency_code: input.currency,
            moto_ind: 0,
            install_count: input.install_count,
        });
        request.customer = customer(input.order);
        Ok(request)
    }

    pub fn three_d_payment(
        input: &AkbankRequestInput<'_>,
        callback: &CallbackParams,
        env: &RequestEnv,
    ) -> CustomResult<Self, PosError> {
        let mut request = Self::base(input.auth, input.txn_code.clone(), env)?;
        request.order = Some(AkbankOrder {
            order_id: input.order.id.clone(),
        });
        request.transaction = Some(AkbankTransaction {
            amount: input.amount.clone(),
            currency_code: input.currency,
            moto_ind: 0,
            install_count: input.install_count,
        });
        request.secure = Some(AkbankSecure {
            secure_id: utils::require_callback_param(callback, "secureId")?.to_string(),
            secure_ecom_ind: callback.get("secureEcomInd").cloned(),
        });
        request.customer = customer(input.order);
        Ok(request)
    }

    /// Capture, cancel and refund address the original transaction by order
    /// id alone.
    pub fn management(
        input: &AkbankRequestInput<'_>,
        with_amount: bool,
        env: &RequestEnv,
    ) -> CustomResult<Self, PosError> {
        let mut request = Self::base(input.auth, input.txn_code.clone(), env)?;
        request.order = Some(AkbankOrder {
            order_id: input.order.id.clone(),
        });
        if with_amount {
            request.transaction = Some(AkbankTransaction {
                amount: input.amount.clone(),
                currency_code: input.currency,
                moto_ind: 0,
                install_count: input.install_count,
            });
        }
        Ok(request)
    }

    pub fn history(
        auth: &AkbankAuthType,
        txn_code: String,
        query: &HistoryQuery,
        env: &RequestEnv,
    ) -> CustomResult<Self, PosError> {
        let mut request = Self::base(auth, txn_code, env)?;
        let start = time::PrimitiveDateTime::new(query.start, time::Time::MIDNIGHT);
        let end = time::PrimitiveDateTime::new(
            query.end,
            time::Time::from_hms_milli(23, 59, 59, 999)
                .map_err(|_| PosError::RequestEncodingFailed)?,
        );
        request.report = Some(AkbankReport {
            start_date_time: format_request_date_time(start)?,
            end_date_time: format_request_date_time(end)?,
            page_number: query.page,
        });
        Ok(request)
    }
}

fn customer(order: &Order) -> Option<AkbankCustomer> {
    if order.email.is_none() && order.client_ip.is_none() {
        return None;
    }
    Some(AkbankCustomer {
        email_address: order.email.clone(),
        ip_address: order.client_ip.clone(),
    })
}

/// The declared, ordered field list of the redirect form; exactly these
/// participate in the hash. Card fields are appended separately, outside
/// the hash.
#[allow(clippy::too_many_arguments)]
pub fn three_d_form_fields(
    auth: &AkbankAuthType,
    order: &Order,
    model: PaymentModel,
    amount: String,
    currency: i64,
    install_count: i64,
    env: &RequestEnv,
    lang: crate::enums::Language,
) -> CustomResult<FormFields, PosError> {
    let payment_model = match model {
        PaymentModel::ThreeDSecure => "3D",
        PaymentModel::ThreeDPay => "3D_PAY",
        PaymentModel::ThreeDHost => "3D_HOST",
        PaymentModel::NonSecure => {
            return Err(PosError::NotSupported {
                message: "a redirect form for the non-secure model".to_string(),
                gateway: "akbank",
            }
            .into())
        }
    };
    let mut fields: FormFields = vec![
        ("paymentModel".to_string(), payment_model.to_string()),
        ("txnCode".to_string(), "3000".to_string()),
        (
            "merchantSafeId".to_string(),
            auth.merchant_safe_id.clone(),
        ),
        (
            "terminalSafeId".to_string(),
            auth.terminal_safe_id.clone(),
        ),
        ("orderId".to_string(), order.id.clone()),
        ("lang".to_string(), lang.to_string().to_uppercase()),
        ("amount".to_string(), amount),
        ("currencyCode".to_string(), currency.to_string()),
        ("installCount".to_string(), install_count.to_string()),
        ("okUrl".to_string(), order.success_url_str()?.to_string()),
        ("failUrl".to_string(), order.fail_url_str()?.to_string()),
        ("randomNumber".to_string(), env.rnd.clone()),
        (
            "requestDateTime".to_string(),
            format_request_date_time(env.timestamp)?,
        ),
    ];
    if let Some(sub_merchant_id) = &auth.sub_merchant_id {
        fields.push(("subMerchantId".to_string(), sub_merchant_id.clone()));
    }
    Ok(fields)
}

/// Card entry fields of the merchant-collected models, appended after hash
/// computation.
pub fn append_card_fields(fields: &mut FormFields, card: &Card) -> CustomResult<(), PosError> {
    fields.push(("creditCard".to_string(), card.number.peek().clone()));
    fields.push((
        "expiredDate".to_string(),
        card.get_expiry_date_as_mmyy()?.peek().clone(),
    ));
    fields.push(("cvv".to_string(), card.cvv.peek().clone()));
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankResponseTransaction {
    pub auth_code: Option<String>,
    pub rrn: Option<String>,
    pub batch_number: Option<i64>,
    pub stan: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankResponseOrder {
    pub order_id: Option<String>,
}

/// The process-API response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankProcessResponse {
    pub txn_code: Option<String>,
    pub response_code: Option<String>,
    pub response_message: Option<String>,
    pub host_response_code: Option<String>,
    pub host_message: Option<String>,
    pub order: Option<AkbankResponseOrder>,
    pub transaction: Option<AkbankResponseTransaction>,
}

impl AkbankProcessResponse {
    pub fn approved(&self) -> bool {
        self.response_code.as_deref() == Some(APPROVED_RESPONSE_CODE)
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
            auth_code: self
                .transaction
                .as_ref()
                .and_then(|transaction| transaction.auth_code.clone()),
            refs: ReferenceNumbers {
                host_ref_num: self
                    .transaction
                    .as_ref()
                    .and_then(|transaction| transaction.rrn.clone()),
                transaction_id: self
                    .transaction
                    .as_ref()
                    .and_then(|transaction| transaction.stan.map(|stan| stan.to_string())),
                remote_order_id: self.order.as_ref().and_then(|order| order.order_id.clone()),
                batch_id: self
                    .transaction
                    .as_ref()
                    .and_then(|transaction| transaction.batch_number.map(|n| n.to_string())),
            },
            three_d: None,
            error_code: if approved { None } else { self.response_code },
            error_message: if approved {
                None
            } else {
                self.response_message.or(self.host_message)
            },
            raw: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankHistoryResponse {
    pub response_code: Option<String>,
    pub response_message: Option<String>,
    #[serde(default)]
    pub txn_detail_list: Vec<AkbankTxnDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AkbankTxnDetail {
    pub order_id: Option<String>,
    pub txn_code: Option<String>,
    pub response_code: Option<String>,
    pub auth_code: Option<String>,
    pub rrn: Option<String>,
    pub amount: Option<serde_json::Value>,
}

impl AkbankHistoryResponse {
    pub fn into_results(self) -> Vec<TransactionResult> {
        self.txn_detail_list
            .into_iter()
            .map(|detail| {
                let approved = detail.response_code.as_deref() == Some(APPROVED_RESPONSE_CODE);
                TransactionResult {
                    status: if approved {
                        TransactionStatus::Charged
                    } else {
                        TransactionStatus::Failure
                    },
                    gateway_return_code: detail.response_code,
                    auth_code: detail.auth_code,
                    refs: ReferenceNumbers {
                        host_ref_num: detail.rrn,
                        transaction_id: None,
                        remote_order_id: detail.order_id,
                        batch_id: None,
                    },
                    three_d: None,
                    error_code: None,
                    error_message: None,
                    raw: serde_json::Value::Null,
                }
            })
            .collect()
    }
}

/// Normalize the redirect callback after hash verification.
pub fn callback_to_result(
    verified: bool,
    model: PaymentModel,
    params: &CallbackParams,
) -> TransactionResult {
    let raw = serde_json::to_value(params).unwrap_or_default();
    let response_code = utils::callback_param(params, "responseCode").to_string();
    let authenticated = response_code == APPROVED_RESPONSE_CODE;
    let three_d = ThreeDSecureData {
        md_status: Some(response_code.clone()),
        eci: params.get("secureEcomInd").cloned(),
        cavv: None,
        xid: None,
        md: params.get("secureId").cloned(),
    };

    let status = if !verified || !authenticated {
        TransactionStatus::AuthenticationFailed
    } else {
        match model {
            PaymentModel::ThreeDSecure => TransactionStatus::AuthenticationPending,
            _ => TransactionStatus::Charged,
        }
    };

    TransactionResult {
        status,
        gateway_return_code: Some(response_code),
        auth_code: params.get("authCode").cloned(),
        refs: ReferenceNumbers {
            host_ref_num: params.get("rrn").cloned(),
            transaction_id: None,
            remote_order_id: params.get("orderId").cloned(),
            batch_id: None,
        },
        three_d: Some(three_d),
        error_code: None,
        error_message: params.get("responseMessage").cloned(),
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
        GatewayAccount::new(GatewayKind::Akbank, "2023090417500272654BD9A49CF07574")
            .with_terminal_id("2023090417500284633D137A249DBBEB")
            .with_store_key(Secret::new("3230323t3theSt0r3K3y9973t323".to_string()))
    }

    fn order() -> Order {
        let mut order = Order::new("order222", MinorUnit::new(10025), Currency::TRY);
        order.success_url = Some(url::Url::parse("https://domain.com/success").unwrap());
        order.fail_url = Some(url::Url::parse("https://domain.com/fail_url").unwrap());
        order
    }

    fn env() -> RequestEnv {
        RequestEnv::fixed(
            "42BA16A7843FEC85AB2D2E0C7E5ECC01",
            time::macros::datetime!(2024-04-23 15:10:55),
        )
    }

    fn card() -> Card {
        Card::new(
            masking::StrongSecret::new("4355093000315232".to_string()),
            Secret::new("11".to_string()),
            Secret::new("40".to_string()),
            Secret::new("665".to_string()),
        )
    }

    #[test]
    fn request_date_time_uses_millisecond_layout() {
        assert_eq!(
            format_request_date_time(time::macros::datetime!(2024-04-23 15:10:55)).unwrap(),
            "2024-04-23T15:10:55.000"
        );
    }

    #[test]
    fn form_hash_matches_known_vector() {
        let account = account();
        let auth = AkbankAuthType::try_from(&account).unwrap();
        let fields = three_d_form_fields(
            &auth,
            &order(),
            PaymentModel::ThreeDSecure,
            "100.25".to_string(),
            949,
            1,
            &env(),
            crate::enums::Language::Tr,
        )
        .unwrap();

        let hash = AkbankCrypt.create_3d_hash(&account, &fields).unwrap();

        assert_eq!(
            hash,
            "jp2nfMxMwFR3odlOcaYL0YvpeJbNDtnP0zkDBejwxo6NojazvfzRSV56HfbQ2pRQzAhllK7a0Ppv8+but1ToMg=="
        );
    }

    fn callback() -> CallbackParams {
        let mut params = CallbackParams::new();
        params.insert("responseCode".to_string(), "VPS-0000".to_string());
        params.insert("responseMessage".to_string(), "BAŞARILI".to_string());
        params.insert("orderId".to_string(), "order222".to_string());
        params.insert("authCode".to_string(), "064716".to_string());
        params.insert("rrn".to_string(), "404804561987".to_string());
        params.insert("secureId".to_string(), "mAoArM7VgmcDVFPo3GTi".to_string());
        params.insert("secureEcomInd".to_string(), "02".to_string());
        params.insert(
            "hashParams".to_string(),
            "responseCode+responseMessage+orderId+authCode+rrn+secureId+secureEcomInd".to_string(),
        );
        params.insert(
            "hash".to_string(),
            "eJPA9HgLt45FO5Ax+m+4hCnHDxYHTUzxIaT71hcQ/lC6vfnJPxwnDTPM+Rbvn7k84gsSLR0e0dtdv/haS205yA=="
                .to_string(),
        );
        params
    }

    #[test]
    fn callback_verifies_via_hash_params() {
        assert!(AkbankCrypt.check_3d_hash(&account(), &callback()).unwrap());
    }

    #[test]
    fn altered_callback_fails_closed() {
        let account = account();

        let mut altered = callback();
        altered.insert("authCode".to_string(), "000000".to_string());
        assert!(!AkbankCrypt.check_3d_hash(&account, &altered).unwrap());

        let mut missing = callback();
        missing.remove("hashParams");
        assert!(!AkbankCrypt.check_3d_hash(&account, &missing).unwrap());
    }

    #[test]
    fn payment_request_serializes_in_camel_case() {
        let account = account();
        let auth = AkbankAuthType::try_from(&account).unwrap();
        let order = order();
        let input = AkbankRequestInput {
            auth: &auth,
            order: &order,
            txn_code: "1000".to_string(),
            amount: "100.25".to_string(),
            currency: 949,
            install_count: 1,
        };

        let request = AkbankProcessRequest::payment(&input, &card(), &env()).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["version"], "1.00");
        assert_eq!(body["txnCode"], "1000");
        assert_eq!(body["requestDateTime"], "2024-04-23T15:10:55.000");
        assert_eq!(
            body["terminal"]["merchantSafeId"],
            "2023090417500272654BD9A49CF07574"
        );
        assert_eq!(body["card"]["expireDate"], "1140");
        assert_eq!(body["transaction"]["currencyCode"], 949);
        assert!(body.get("subMerchant").is_none());
    }

    #[test]
    fn body_mac_is_deterministic() {
        let account = account();
        let body = r#"{"version":"1.00","txnCode":"1000"}"#;

        assert_eq!(
            AkbankCrypt::sign_body(&account, body).unwrap(),
            AkbankCrypt::sign_body(&account, body).unwrap()
        );
    }

    #[test]
    fn payment_response_parses_and_normalizes() {
        use crate::utils::BytesExt;

        let body = r#"{
            "txnCode": "1000",
            "responseCode": "VPS-0000",
            "responseMessage": "BAŞARILI",
            "hostResponseCode": "00",
            "order": {"orderId": "order222"},
            "transaction": {"authCode": "064716", "rrn": "404804561987", "batchNumber": 102, "stan": 38}
        }"#
        .as_bytes();

        let response: AkbankProcessResponse =
            body.parse_struct("AkbankProcessResponse").unwrap();
        let result = response.into_result(TransactionStatus::Charged);

        assert!(result.approved());
        assert_eq!(result.auth_code.as_deref(), Some("064716"));
        assert_eq!(result.refs.transaction_id.as_deref(), Some("38"));
        assert_eq!(result.refs.batch_id.as_deref(), Some("102"));
    }

    #[test]
    fn declined_response_surfaces_the_message() {
        use crate::utils::BytesExt;

        let body = r#"{
            "txnCode": "1000",
            "responseCode": "VPS-1073",
            "responseMessage": "İşlem onaylanmadı"
        }"#
        .as_bytes();

        let response: AkbankProcessResponse =
            body.parse_struct("AkbankProcessResponse").unwrap();
        let result = response.into_result(TransactionStatus::Charged);

        assert_eq!(result.status, TransactionStatus::Failure);
        assert_eq!(result.error_code.as_deref(), Some("VPS-1073"));
    }

    #[test]
    fn history_response_collects_details() {
        use crate::utils::BytesExt;

        let body = br#"{
            "responseCode": "VPS-0000",
            "txnDetailList": [
                {"orderId": "order222", "txnCode": "1000", "responseCode": "VPS-0000", "authCode": "064716", "rrn": "404804561987", "amount": 100.25},
                {"orderId": "order223", "txnCode": "1000", "responseCode": "VPS-1073", "amount": "50.00"}
            ]
        }"#;

        let response: AkbankHistoryResponse =
            body.as_slice().parse_struct("AkbankHistoryResponse").unwrap();
        let results = response.into_results();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, TransactionStatus::Charged);
        assert_eq!(results[1].status, TransactionStatus::Failure);
    }

    #[test]
    fn json_callback_params_normalize_numeric_values() {
        let params = utils::callback_params_from_json(&serde_json::json!({
            "responseCode": "VPS-0000",
            "batchNumber": 102
        }));

        assert_eq!(params.get("batchNumber").map(String::as_str), Some("102"));
    }
}
