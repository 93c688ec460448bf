//! Wire types and signing for the Payten EST family.

use base64::Engine;
use masking::{PeekInterface, Secret, StrongSecret};
use serde::{Deserialize, Serialize};

use crate::{
    api::GatewayCrypt,
    crypto::{GenerateDigest, Sha1, Sha512},
    domain::{
        CallbackParams, Card, FormFields, GatewayAccount, Order, RequestEnv, TransactionResult,
    },
    enums::{GatewayKind, PaymentModel, TransactionStatus},
    errors::{CustomResult, PosError},
    utils::{self, CardData},
};

const ACCEPTED_KINDS: [GatewayKind; 2] = [GatewayKind::Estpos, GatewayKind::EstposV3];

pub struct EstposAuthType {
    pub(super) client_id: String,
    pub(super) username: Secret<String>,
    pub(super) password: Secret<String>,
}

impl TryFrom<&GatewayAccount> for EstposAuthType {
    type Error = error_stack::Report<PosError>;

    fn try_from(account: &GatewayAccount) -> Result<Self, Self::Error> {
        account.ensure_kind(&ACCEPTED_KINDS)?;
        match (&account.username, &account.password) {
            (Some(username), Some(password)) => Ok(Self {
                client_id: account.client_id.clone(),
                username: Secret::new(username.clone()),
                password: password.clone(),
            }),
            _ => Err(PosError::FailedToObtainAuthType)?,
        }
    }
}

fn store_key(account: &GatewayAccount) -> CustomResult<String, PosError> {
    account.ensure_kind(&ACCEPTED_KINDS)?;
    account
        .store_key
        .as_ref()
        .map(|key| key.peek().clone())
        .ok_or_else(|| PosError::FailedToObtainAuthType.into())
}

/// Legacy hash version: SHA-1 over a fixed field list, Base64 encoded.
/// Callback verification is data-driven through `HASHPARAMS`.
pub struct EstposCrypt;

impl EstposCrypt {
    const HASH_FIELDS: [&'static str; 8] = [
        "clientid", "oid", "amount", "okUrl", "failUrl", "islemtipi", "taksit", "rnd",
    ];
}

impl GatewayCrypt for EstposCrypt {
    fn create_hash(
        &self,
        _account: &GatewayAccount,
        _data: &FormFields,
    ) -> CustomResult<String, PosError> {
        // The EST server-to-server API authenticates with credentials only.
        Err(PosError::flow_not_supported("request hash", "estpos").into())
    }

    fn create_3d_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError> {
        let key = store_key(account)?;
        let mut plain = String::new();
        for name in Self::HASH_FIELDS {
            plain.push_str(utils::form_field(data, name));
        }
        plain.push_str(&key);
        let digest = Sha1
            .generate_digest(plain.as_bytes())
            .map_err(|_| PosError::RequestEncodingFailed)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(digest))
    }

    fn check_3d_hash(
        &self,
        account: &GatewayAccount,
        params: &CallbackParams,
    ) -> CustomResult<bool, PosError> {
        let key = store_key(account)?;
        let (Some(hash_params), Some(received)) = (params.get("HASHPARAMS"), params.get("HASH"))
        else {
            return Ok(false);
        };

        // The field list to hash is itself response data.
        let mut params_val = String::new();
        for name in hash_params.split(':').filter(|name| !name.is_empty()) {
            params_val.push_str(utils::callback_param(params, name));
        }
        if let Some(reported_val) = params.get("HASHPARAMSVAL") {
            if reported_val != &params_val {
                return Ok(false);
            }
        }

        let digest = Sha1
            .generate_digest(format!("{params_val}{key}").as_bytes())
            .map_err(|_| PosError::RequestEncodingFailed)?;
        let actual = base64::engine::general_purpose::STANDARD.encode(digest);
        Ok(&actual == received)
    }
}

/// Ver3 hash version: SHA-512 over every field sorted case-insensitively,
/// `\` and `|` escaped, `|`-joined, store key appended, Base64 encoded.
pub struct EstposV3Crypt;

fn escape_ver3(value: &str) -> String {
    value.replace('\\', "\\\\").replace('|', "\\|")
}

fn ver3_hash(key: &str, pairs: &[(String, String)]) -> CustomResult<String, PosError> {
    let mut sorted: Vec<&(String, String)> = pairs
        .iter()
        .filter(|(name, _)| {
            let lowered = name.to_lowercase();
            lowered != "hash" && lowered != "encoding"
        })
        .collect();
    sorted.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

    let mut plain = sorted
        .iter()
        .map(|(_, value)| escape_ver3(value))
        .collect::<Vec<_>>()
        .join("|");
    plain.push('|');
    plain.push_str(&escape_ver3(key));

    let digest = Sha512
        .generate_digest(plain.as_bytes())
        .map_err(|_| PosError::RequestEncodingFailed)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(digest))
}

impl GatewayCrypt for EstposV3Crypt {
    fn create_hash(
        &self,
        _account: &GatewayAccount,
        _data: &FormFields,
    ) -> CustomResult<String, PosError> {
        Err(PosError::flow_not_supported("request hash", "estpos_v3").into())
    }

    fn create_3d_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError> {
        let key = store_key(account)?;
        ver3_hash(&key, data)
    }

    fn check_3d_hash(
        &self,
        account: &GatewayAccount,
        params: &CallbackParams,
    ) -> CustomResult<bool, PosError> {
        let key = store_key(account)?;
        let Some(received) = params.get("HASH") else {
            return Ok(false);
        };
        let pairs: FormFields = params
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Ok(&ver3_hash(&key, &pairs)? == received)
    }
}

#[derive(Debug, Serialize)]
pub struct PbOrder {
    #[serde(rename = "OrderType")]
    order_type: &'static str,
    #[serde(rename = "OrderFrequencyInterval")]
    frequency_interval: String,
    #[serde(rename = "OrderFrequencyCycle")]
    frequency_cycle: &'static str,
    #[serde(rename = "TotalNumberPayments")]
    total_payments: String,
}

#[derive(Debug, Default, Serialize)]
pub struct Cc5RequestExtra {
    #[serde(rename = "ORDERSTATUS", skip_serializing_if = "Option::is_none")]
    order_status: Option<&'static str>,
    #[serde(rename = "RECURRINGID", skip_serializing_if = "Option::is_none")]
    recurring_id: Option<String>,
}

/// The EST server-to-server request envelope. Element order is the wire
/// order.
#[derive(Debug, Serialize)]
#[serde(rename = "CC5Request")]
pub struct Cc5Request {
    #[serde(rename = "Name")]
    name: Secret<String>,
    #[serde(rename = "Password")]
    password: Secret<String>,
    #[serde(rename = "ClientId")]
    client_id: String,
    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    tx_type: Option<String>,
    #[serde(rename = "IPAddress", skip_serializing_if = "Option::is_none")]
    ip_address: Option<String>,
    #[serde(rename = "Email", skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(rename = "OrderId")]
    order_id: String,
    #[serde(rename = "Total", skip_serializing_if = "Option::is_none")]
    total: Option<String>,
    #[serde(rename = "Currency", skip_serializing_if = "Option::is_none")]
    currency: Option<String>,
    #[serde(rename = "Taksit", skip_serializing_if = "Option::is_none")]
    taksit: Option<String>,
    #[serde(rename = "Number", skip_serializing_if = "Option::is_none")]
    number: Option<StrongSecret<String>>,
    #[serde(rename = "Expires", skip_serializing_if = "Option::is_none")]
    expires: Option<Secret<String>>,
    #[serde(rename = "Cvv2Val", skip_serializing_if = "Option::is_none")]
    cvv2: Option<Secret<String>>,
    #[serde(rename = "PayerTxnId", skip_serializing_if = "Option::is_none")]
    payer_txn_id: Option<String>,
    #[serde(rename = "PayerSecurityLevel", skip_serializing_if = "Option::is_none")]
    payer_security_level: Option<String>,
    #[serde(
        rename = "PayerAuthenticationCode",
        skip_serializing_if = "Option::is_none"
    )]
    payer_authentication_code: Option<String>,
    #[serde(
        rename = "CardholderPresentCode",
        skip_serializing_if = "Option::is_none"
    )]
    cardholder_present_code: Option<&'static str>,
    #[serde(rename = "Mode", skip_serializing_if = "Option::is_none")]
    mode: Option<&'static str>,
    #[serde(rename = "PbOrder", skip_serializing_if = "Option::is_none")]
    pb_order: Option<PbOrder>,
    #[serde(rename = "Extra", skip_serializing_if = "Option::is_none")]
    extra: Option<Cc5RequestExtra>,
}

impl Cc5Request {
    fn base(auth: &EstposAuthType, order_id: String) -> Self {
        Self {
            name: auth.username.clone(),
            password: auth.password.clone(),
            client_id: auth.client_id.clone(),
            tx_type: None,
            ip_address: None,
            email: None,
            order_id,
            total: None,
            currency: None,
            taksit: None,
            number: None,
            expires: None,
            cvv2: None,
            payer_txn_id: None,
            payer_security_level: None,
            payer_authentication_code: None,
            cardholder_present_code: None,
            mode: None,
            pb_order: None,
            extra: None,
        }
    }

    pub fn payment(
        auth: &EstposAuthType,
        order: &Order,
        card: &Card,
        tx_type: String,
        amount: String,
        currency: String,
        installment: String,
    ) -> CustomResult<Self, PosError> {
        let mut request = Self::base(auth, order.id.clone());
        request.tx_type = Some(tx_type);
        request.ip_address = order.client_ip.clone();
        request.email = order.email.clone();
        request.total = Some(amount);
        request.currency = Some(currency);
        request.taksit = Some(installment);
        request.number = Some(card.number.clone());
        request.expires = Some(card.get_expiry_date_as_mm_slash_yy()?);
        request.cvv2 = Some(card.cvv.clone());
        request.pb_order = order.recurring.map(|schedule| PbOrder {
            order_type: "0",
            frequency_interval: schedule.cycle_interval.to_string(),
            frequency_cycle: map_recurring_cycle(schedule.cycle_unit),
            total_payments: schedule.payment_count.to_string(),
        });
        Ok(request)
    }

    pub fn three_d_payment(
        auth: &EstposAuthType,
        order: &Order,
        tx_type: String,
        amount: String,
        currency: String,
        installment: String,
        callback: &CallbackParams,
    ) -> CustomResult<Self, PosError> {
        let mut request = Self::base(auth, order.id.clone());
        request.tx_type = Some(tx_type);
        request.ip_address = order.client_ip.clone();
        request.email = order.email.clone();
        request.total = Some(amount);
        request.currency = Some(currency);
        request.taksit = Some(installment);
        request.payer_txn_id = Some(utils::require_callback_param(callback, "xid")?.to_string());
        request.payer_security_level =
            Some(utils::require_callback_param(callback, "eci")?.to_string());
        request.payer_authentication_code =
            Some(utils::require_callback_param(callback, "cavv")?.to_string());
        request.cardholder_present_code = Some("13");
        request.mode = Some("P");
        Ok(request)
    }

    pub fn postauth(auth: &EstposAuthType, order: &Order) -> Self {
        let mut request = Self::base(auth, order.id.clone());
        request.tx_type = Some("PostAuth".to_string());
        request
    }

    pub fn cancel(auth: &EstposAuthType, order: &Order) -> Self {
        let mut request = Self::base(auth, order.id.clone());
        request.tx_type = Some("Void".to_string());
        request
    }

    pub fn refund(
        auth: &EstposAuthType,
        order: &Order,
        amount: Option<String>,
        currency: String,
    ) -> Self {
        let mut request = Self::base(auth, order.id.clone());
        request.tx_type = Some("Credit".to_string());
        request.total = amount;
        request.currency = Some(currency);
        request
    }

    pub fn status(auth: &EstposAuthType, order: &Order) -> Self {
        let mut request = Self::base(auth, order.id.clone());
        request.extra = Some(Cc5RequestExtra {
            order_status: Some("QUERY"),
            recurring_id: order.linked.recurring_id.clone(),
        });
        request
    }
}

pub fn map_recurring_cycle(unit: crate::enums::RecurringCycleUnit) -> &'static str {
    match unit {
        crate::enums::RecurringCycleUnit::Day => "D",
        crate::enums::RecurringCycleUnit::Week => "W",
        crate::enums::RecurringCycleUnit::Month => "M",
        crate::enums::RecurringCycleUnit::Year => "Y",
    }
}

pub fn map_storetype(model: PaymentModel) -> CustomResult<&'static str, PosError> {
    match model {
        PaymentModel::ThreeDSecure => Ok("3d"),
        PaymentModel::ThreeDPay => Ok("3d_pay"),
        PaymentModel::ThreeDHost => Ok("3d_host"),
        PaymentModel::NonSecure => Err(PosError::NotSupported {
            message: "a redirect form for the non-secure model".to_string(),
            gateway: "estpos",
        }
        .into()),
    }
}

/// The browser-redirect form. Field order is also the legacy hash order for
/// the fields that participate.
#[allow(clippy::too_many_arguments)]
pub fn three_d_form_fields(
    account: &GatewayAccount,
    order: &Order,
    model: PaymentModel,
    tx_type: String,
    card: Option<&Card>,
    amount: String,
    currency: String,
    installment: String,
    env: &RequestEnv,
) -> CustomResult<FormFields, PosError> {
    let mut fields: FormFields = vec![
        ("clientid".to_string(), account.client_id.clone()),
        ("storetype".to_string(), map_storetype(model)?.to_string()),
        ("amount".to_string(), amount),
        ("oid".to_string(), order.id.clone()),
        ("okUrl".to_string(), order.success_url_str()?.to_string()),
        ("failUrl".to_string(), order.fail_url_str()?.to_string()),
        ("rnd".to_string(), env.rnd.clone()),
        ("lang".to_string(), account.lang.to_string()),
        ("currency".to_string(), currency),
        ("taksit".to_string(), installment),
        ("islemtipi".to_string(), tx_type),
    ];
    if model == PaymentModel::ThreeDSecure {
        let card = card.ok_or(PosError::MissingRequiredField { field_name: "card" })?;
        fields.push(("pan".to_string(), card.number.peek().clone()));
        fields.push((
            "Ecom_Payment_Card_ExpDate_Month".to_string(),
            card.get_expiry_month_2_digit()?.peek().clone(),
        ));
        fields.push((
            "Ecom_Payment_Card_ExpDate_Year".to_string(),
            card.get_expiry_year_2_digit()?.peek().clone(),
        ));
        fields.push(("cv2".to_string(), card.cvv.peek().clone()));
    }
    Ok(fields)
}

#[derive(Debug, Default, Deserialize)]
pub struct Cc5ResponseExtra {
    #[serde(rename = "TRANS_STAT")]
    pub trans_stat: Option<String>,
    #[serde(rename = "ORD_ID")]
    pub ord_id: Option<String>,
    #[serde(rename = "AUTH_CODE")]
    pub auth_code: Option<String>,
    #[serde(rename = "HOST_REF_NUM")]
    pub host_ref_num: Option<String>,
    #[serde(rename = "PROC_RET_CD")]
    pub proc_ret_cd: Option<String>,
    #[serde(rename = "TRANS_ID")]
    pub trans_id: Option<String>,
    #[serde(rename = "CAPTURE_AMT")]
    pub capture_amt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "CC5Response")]
pub struct Cc5Response {
    #[serde(rename = "OrderId")]
    pub order_id: Option<String>,
    #[serde(rename = "GroupId")]
    pub group_id: Option<String>,
    #[serde(rename = "Response")]
    pub response: Option<String>,
    #[serde(rename = "AuthCode")]
    pub auth_code: Option<String>,
    #[serde(rename = "HostRefNum")]
    pub host_ref_num: Option<String>,
    #[serde(rename = "ProcReturnCode")]
    pub proc_return_code: Option<String>,
    #[serde(rename = "TransId")]
    pub trans_id: Option<String>,
    #[serde(rename = "ErrMsg")]
    pub err_msg: Option<String>,
    #[serde(rename = "Extra")]
    pub extra: Option<Cc5ResponseExtra>,
}

impl Cc5Response {
    fn approved(&self) -> bool {
        self.proc_return_code.as_deref() == Some(crate::consts::APPROVED_PROC_CODE)
    }

    /// Normalize with `on_approval` as the status of an approved response.
    pub fn into_result(self, on_approval: TransactionStatus) -> TransactionResult {
        let approved = self.approved();
        let raw = serde_json::json!({
            "OrderId": self.order_id,
            "GroupId": self.group_id,
            "Response": self.response,
            "AuthCode": self.auth_code,
            "HostRefNum": self.host_ref_num,
            "ProcReturnCode": self.proc_return_code,
            "TransId": self.trans_id,
            "ErrMsg": self.err_msg,
        });
        TransactionResult {
            status: if approved {
                on_approval
            } else {
                TransactionStatus::Failure
            },
            gateway_return_code: self.proc_return_code,
            auth_code: self.auth_code,
            refs: crate::domain::ReferenceNumbers {
                host_ref_num: self.host_ref_num,
                transaction_id: self.trans_id,
                remote_order_id: self.order_id,
                batch_id: self.group_id,
            },
            three_d: None,
            error_code: None,
            error_message: if approved { None } else { self.err_msg },
            raw,
        }
    }

    /// Normalize a status query, deriving the state from `TRANS_STAT`.
    pub fn into_status_result(self) -> TransactionResult {
        let status = match self
            .extra
            .as_ref()
            .and_then(|extra| extra.trans_stat.as_deref())
        {
            Some("A") => TransactionStatus::Authorized,
            Some("C") => TransactionStatus::Charged,
            Some("V") => TransactionStatus::Voided,
            Some("PN") => TransactionStatus::Pending,
            // A missing or unknown state never reads as an approval.
            _ => TransactionStatus::Failure,
        };
        let extra = self.extra.unwrap_or_default();
        let raw = serde_json::json!({
            "TRANS_STAT": extra.trans_stat,
            "ORD_ID": extra.ord_id,
            "AUTH_CODE": extra.auth_code,
            "HOST_REF_NUM": extra.host_ref_num,
            "PROC_RET_CD": extra.proc_ret_cd,
            "TRANS_ID": extra.trans_id,
            "CAPTURE_AMT": extra.capture_amt,
        });
        TransactionResult {
            status,
            gateway_return_code: extra.proc_ret_cd,
            auth_code: extra.auth_code,
            refs: crate::domain::ReferenceNumbers {
                host_ref_num: extra.host_ref_num,
                transaction_id: extra.trans_id,
                remote_order_id: extra.ord_id,
                batch_id: None,
            },
            three_d: None,
            error_code: None,
            error_message: None,
            raw,
        }
    }
}

fn md_status_authenticated(md_status: &str) -> bool {
    matches!(md_status, "1" | "2" | "3" | "4")
}

/// Normalize the bank's redirect callback after hash verification.
pub fn callback_to_result(
    verified: bool,
    model: PaymentModel,
    params: &CallbackParams,
) -> TransactionResult {
    let raw = serde_json::to_value(params).unwrap_or_default();
    let md_status = utils::callback_param(params, "mdStatus").to_string();
    let three_d = crate::domain::ThreeDSecureData {
        md_status: Some(md_status.clone()),
        eci: params.get("eci").cloned(),
        cavv: params.get("cavv").cloned(),
        xid: params.get("xid").cloned(),
        md: params.get("md").cloned(),
    };
    let proc_return_code = params.get("ProcReturnCode").cloned();

    let status = if !verified || !md_status_authenticated(&md_status) {
        TransactionStatus::AuthenticationFailed
    } else {
        match model {
            PaymentModel::ThreeDSecure => TransactionStatus::AuthenticationPending,
            _ if proc_return_code.as_deref() == Some(crate::consts::APPROVED_PROC_CODE) => {
                TransactionStatus::Charged
            }
            _ => TransactionStatus::Failure,
        }
    };

    TransactionResult {
        status,
        gateway_return_code: proc_return_code,
        auth_code: params.get("AuthCode").cloned(),
        refs: crate::domain::ReferenceNumbers {
            host_ref_num: params.get("HostRefNum").cloned(),
            transaction_id: params.get("TransId").cloned(),
            remote_order_id: params.get("oid").cloned(),
            batch_id: None,
        },
        three_d: Some(three_d),
        error_code: params.get("ErrCode").cloned(),
        error_message: params.get("ErrMsg").cloned(),
        raw,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use masking::Secret;

    use super::*;
    use crate::{enums::Currency, types::MinorUnit};

    fn account(kind: GatewayKind) -> GatewayAccount {
        GatewayAccount::new(kind, "700655000200")
            .with_credentials("ISBANKAPI", Secret::new("ISBANK07".to_string()))
            .with_store_key(Secret::new("TRPS0200".to_string()))
    }

    fn order() -> Order {
        let mut order = Order::new("order222", MinorUnit::new(10025), Currency::TRY);
        order.success_url = Some(url::Url::parse("https://domain.com/success").unwrap());
        order.fail_url = Some(url::Url::parse("https://domain.com/fail_url").unwrap());
        order
    }

    fn legacy_form_fields(rnd: &str) -> FormFields {
        vec![
            ("clientid".to_string(), "700655000200".to_string()),
            ("oid".to_string(), "order222".to_string()),
            ("amount".to_string(), "100.25".to_string()),
            ("okUrl".to_string(), "https://domain.com/success".to_string()),
            (
                "failUrl".to_string(),
                "https://domain.com/fail_url".to_string(),
            ),
            ("islemtipi".to_string(), "Auth".to_string()),
            ("taksit".to_string(), String::new()),
            ("rnd".to_string(), rnd.to_string()),
        ]
    }

    #[test]
    fn legacy_3d_hash_matches_known_vector() {
        let hash = EstposCrypt
            .create_3d_hash(&account(GatewayKind::Estpos), &legacy_form_fields("rand"))
            .unwrap();

        assert_eq!(hash, "S7UxUAohxaxzl35WxHyDfuQx0sg=");
    }

    #[test]
    fn legacy_3d_hash_is_deterministic() {
        let account = account(GatewayKind::Estpos);
        let fields = legacy_form_fields("rand");

        assert_eq!(
            EstposCrypt.create_3d_hash(&account, &fields).unwrap(),
            EstposCrypt.create_3d_hash(&account, &fields).unwrap()
        );
    }

    #[test]
    fn legacy_missing_field_hashes_as_empty_string() {
        let account = account(GatewayKind::Estpos);
        let mut without_taksit = legacy_form_fields("rand");
        without_taksit.retain(|(name, _)| name != "taksit");

        assert_eq!(
            EstposCrypt.create_3d_hash(&account, &without_taksit).unwrap(),
            "S7UxUAohxaxzl35WxHyDfuQx0sg="
        );
    }

    #[test]
    fn wrong_account_family_is_a_misuse_error() {
        let foreign = GatewayAccount::new(GatewayKind::Garanti, "700655000200");

        let error = EstposCrypt
            .create_3d_hash(&foreign, &legacy_form_fields("rand"))
            .unwrap_err();

        assert!(matches!(
            error.current_context(),
            PosError::FailedToObtainAuthType
        ));
    }

    fn legacy_callback() -> CallbackParams {
        let mut params = CallbackParams::new();
        params.insert("clientid".to_string(), "700655000200".to_string());
        params.insert("oid".to_string(), "order222".to_string());
        params.insert("mdStatus".to_string(), "1".to_string());
        params.insert(
            "cavv".to_string(),
            "BwAQAhZYRQNkAARjBlhFEE9iWDY=".to_string(),
        );
        params.insert("eci".to_string(), "05".to_string());
        params.insert(
            "md".to_string(),
            "435508:9716234382f9d9de5d0c023f84be99d8".to_string(),
        );
        params.insert("rnd".to_string(), "rand0000rand0000".to_string());
        params.insert(
            "HASHPARAMS".to_string(),
            "clientid:oid:mdStatus:cavv:eci:md:rnd".to_string(),
        );
        params.insert(
            "HASHPARAMSVAL".to_string(),
            "700655000200order2221BwAQAhZYRQNkAARjBlhFEE9iWDY=05435508:9716234382f9d9de5d0c023f84be99d8rand0000rand0000"
                .to_string(),
        );
        params.insert("HASH".to_string(), "0tKh8l9O05Jxv15zSFwF1NMlIbU=".to_string());
        params
    }

    #[test]
    fn legacy_callback_verifies() {
        let verified = EstposCrypt
            .check_3d_hash(&account(GatewayKind::Estpos), &legacy_callback())
            .unwrap();

        assert!(verified);
    }

    #[test]
    fn blanked_md_status_fails_verification() {
        let mut params = legacy_callback();
        params.insert("mdStatus".to_string(), String::new());

        let verified = EstposCrypt
            .check_3d_hash(&account(GatewayKind::Estpos), &params)
            .unwrap();

        assert!(!verified);
    }

    #[test]
    fn missing_hash_params_fails_closed() {
        let mut params = legacy_callback();
        params.remove("HASHPARAMS");

        assert!(!EstposCrypt
            .check_3d_hash(&account(GatewayKind::Estpos), &params)
            .unwrap());
    }

    fn ver3_fields() -> FormFields {
        vec![
            ("clientid".to_string(), "700655000200".to_string()),
            ("storetype".to_string(), "3d_pay".to_string()),
            ("amount".to_string(), "100.25".to_string()),
            ("oid".to_string(), "order222".to_string()),
            ("okUrl".to_string(), "https://domain.com/success".to_string()),
            (
                "failUrl".to_string(),
                "https://domain.com/fail_url".to_string(),
            ),
            ("rnd".to_string(), "12345".to_string()),
            ("lang".to_string(), "tr".to_string()),
            ("currency".to_string(), "949".to_string()),
            ("taksit".to_string(), String::new()),
            ("islemtipi".to_string(), "Auth".to_string()),
        ]
    }

    #[test]
    fn ver3_hash_matches_known_vector() {
        let hash = EstposV3Crypt
            .create_3d_hash(&account(GatewayKind::EstposV3), &ver3_fields())
            .unwrap();

        assert_eq!(
            hash,
            "ClcNw5aYITRZDDARFbLJnah6Knb9I6q3oApjvzwZdxJ3Et2mlRptqyw7+NbLAhNaFloj8AiNVadWuNAW146kRw=="
        );
    }

    #[test]
    fn ver3_hash_is_insensitive_to_numeric_source_types() {
        // A nonce or currency arriving as a JSON number must hash exactly as
        // its string rendering.
        let mut from_numbers = ver3_fields();
        for (name, value) in &mut from_numbers {
            if name == "rnd" {
                *value = utils::wire_string(&serde_json::json!(12345));
            }
            if name == "currency" {
                *value = utils::wire_string(&serde_json::json!(949));
            }
        }

        assert_eq!(
            EstposV3Crypt
                .create_3d_hash(&account(GatewayKind::EstposV3), &from_numbers)
                .unwrap(),
            EstposV3Crypt
                .create_3d_hash(&account(GatewayKind::EstposV3), &ver3_fields())
                .unwrap()
        );
    }

    #[test]
    fn ver3_callback_verifies_and_fails_closed() {
        let mut params: CallbackParams = ver3_fields().into_iter().collect();
        params.insert("mdStatus".to_string(), "1".to_string());
        params.insert("ProcReturnCode".to_string(), "00".to_string());
        params.insert("AuthCode".to_string(), "P58154".to_string());
        params.insert("HostRefNum".to_string(), "230508236560".to_string());
        params.insert(
            "HASH".to_string(),
            "mcuch8MsDo3x2ddPeP7bZ5TJmAjktX3j+wI+1Vf/HgiTt5SsH6KeAcvxSe34tKbh8cRvmL6+FhgU82NQ2gGFnQ=="
                .to_string(),
        );

        let account = account(GatewayKind::EstposV3);
        assert!(EstposV3Crypt.check_3d_hash(&account, &params).unwrap());

        let mut tampered = params.clone();
        tampered.insert("amount".to_string(), "1.00".to_string());
        assert!(!EstposV3Crypt.check_3d_hash(&account, &tampered).unwrap());
    }

    #[test]
    fn payment_request_renders_cc5_envelope() {
        let auth = EstposAuthType::try_from(&account(GatewayKind::Estpos)).unwrap();
        let card = Card::new(
            masking::StrongSecret::new("4355084355084358".to_string()),
            Secret::new("12".to_string()),
            Secret::new("26".to_string()),
            Secret::new("123".to_string()),
        );
        let request = Cc5Request::payment(
            &auth,
            &order(),
            &card,
            "Auth".to_string(),
            "100.25".to_string(),
            "949".to_string(),
            String::new(),
        )
        .unwrap();

        let xml = quick_xml::se::to_string(&request).unwrap();
        assert!(xml.starts_with("<CC5Request>"));
        assert!(xml.contains("<Name>ISBANKAPI</Name>"));
        assert!(xml.contains("<OrderId>order222</OrderId>"));
        assert!(xml.contains("<Total>100.25</Total>"));
        assert!(xml.contains("<Expires>12/26</Expires>"));
        // Credentials precede the order payload on the wire.
        assert!(
            xml.find("<Password>").unwrap() < xml.find("<OrderId>").unwrap()
        );
    }

    #[test]
    fn payment_response_parses_and_normalizes() {
        use crate::utils::BytesExt;

        let body = br#"<CC5Response>
            <OrderId>order222</OrderId>
            <GroupId>order222</GroupId>
            <Response>Approved</Response>
            <AuthCode>P58154</AuthCode>
            <HostRefNum>230508236560</HostRefNum>
            <ProcReturnCode>00</ProcReturnCode>
            <TransId>23128TOga13668</TransId>
            <ErrMsg></ErrMsg>
        </CC5Response>"#;

        let response: Cc5Response = body.as_slice().parse_xml("Cc5Response").unwrap();
        let result = response.into_result(TransactionStatus::Charged);

        assert!(result.approved());
        assert_eq!(result.auth_code.as_deref(), Some("P58154"));
        assert_eq!(result.refs.host_ref_num.as_deref(), Some("230508236560"));
        assert_eq!(result.gateway_return_code.as_deref(), Some("00"));
    }

    #[test]
    fn declined_payment_response_is_failure() {
        use crate::utils::BytesExt;

        let body = br#"<CC5Response>
            <OrderId>order222</OrderId>
            <Response>Declined</Response>
            <ProcReturnCode>99</ProcReturnCode>
            <ErrMsg>Genel Hata</ErrMsg>
        </CC5Response>"#;

        let response: Cc5Response = body.as_slice().parse_xml("Cc5Response").unwrap();
        let result = response.into_result(TransactionStatus::Charged);

        assert_eq!(result.status, TransactionStatus::Failure);
        assert_eq!(result.error_message.as_deref(), Some("Genel Hata"));
    }

    #[test]
    fn status_response_maps_transaction_state() {
        use crate::utils::BytesExt;

        let body = br#"<CC5Response>
            <Response>Approved</Response>
            <ProcReturnCode>00</ProcReturnCode>
            <Extra>
                <TRANS_STAT>C</TRANS_STAT>
                <ORD_ID>order222</ORD_ID>
                <AUTH_CODE>P58154</AUTH_CODE>
                <HOST_REF_NUM>230508236560</HOST_REF_NUM>
                <PROC_RET_CD>00</PROC_RET_CD>
                <TRANS_ID>23128TOga13668</TRANS_ID>
                <CAPTURE_AMT>100.25</CAPTURE_AMT>
            </Extra>
        </CC5Response>"#;

        let response: Cc5Response = body.as_slice().parse_xml("Cc5Response").unwrap();
        let result = response.into_status_result();

        assert_eq!(result.status, TransactionStatus::Charged);
        assert_eq!(result.refs.remote_order_id.as_deref(), Some("order222"));
    }

    #[test]
    fn three_d_secure_callback_owes_a_finalize_leg() {
        let result = callback_to_result(true, PaymentModel::ThreeDSecure, &legacy_callback());

        assert_eq!(result.status, TransactionStatus::AuthenticationPending);
        assert_eq!(
            result.three_d.as_ref().and_then(|d| d.eci.as_deref()),
            Some("05")
        );
    }

    #[test]
    fn unverified_callback_is_rejected_regardless_of_fields() {
        let result = callback_to_result(false, PaymentModel::ThreeDPay, &legacy_callback());

        assert_eq!(result.status, TransactionStatus::AuthenticationFailed);
    }
}
