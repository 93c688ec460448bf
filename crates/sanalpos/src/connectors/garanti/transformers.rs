//! Wire types and signing for the Garanti BBVA GVPS gateway.

use masking::{PeekInterface, Secret, StrongSecret};
use serde::{Deserialize, Serialize};

use crate::{
    api::GatewayCrypt,
    crypto::{GenerateDigest, Sha1, Sha512},
    domain::{
        CallbackParams, Card, FormFields, GatewayAccount, Order, ReferenceNumbers, RequestEnv,
        ThreeDSecureData, TransactionResult,
    },
    enums::{GatewayKind, PaymentModel, TransactionStatus},
    errors::{CustomResult, PosError},
    utils::{self, CardData},
};

pub const API_VERSION: &str = "v0.01";

pub struct GarantiAuthType {
    pub(super) merchant_id: String,
    pub(super) terminal_id: String,
    pub(super) username: Secret<String>,
    pub(super) password: Secret<String>,
    pub(super) refund_username: Option<Secret<String>>,
    pub(super) refund_password: Option<Secret<String>>,
}

impl TryFrom<&GatewayAccount> for GarantiAuthType {
    type Error = error_stack::Report<PosError>;

    fn try_from(account: &GatewayAccount) -> Result<Self, Self::Error> {
        account.ensure_kind(&[GatewayKind::Garanti])?;
        match (&account.username, &account.password, &account.terminal_id) {
            (Some(username), Some(password), Some(terminal_id)) => Ok(Self {
                merchant_id: account.client_id.clone(),
                terminal_id: terminal_id.clone(),
                username: Secret::new(username.clone()),
                password: password.clone(),
                refund_username: account.refund_username.clone().map(Secret::new),
                refund_password: account.refund_password.clone(),
            }),
            _ => Err(PosError::FailedToObtainAuthType)?,
        }
    }
}

impl GarantiAuthType {
    /// Refund and cancel provisioning run under the separate refund user
    /// where the merchant has one.
    fn provision_user(&self, refund_operation: bool) -> (Secret<String>, Secret<String>) {
        if refund_operation {
            if let (Some(username), Some(password)) =
                (self.refund_username.clone(), self.refund_password.clone())
            {
                return (username, password);
            }
        }
        (self.username.clone(), self.password.clone())
    }
}

/// SHA-512 strategy, uppercase hex output. The provisioning password never
/// participates directly: it is first folded into `SecurityData` =
/// `SHA1(password + terminal id zero-padded to nine digits)`.
pub struct GarantiCrypt;

impl GarantiCrypt {
    fn security_data(
        password: &Secret<String>,
        terminal_id: &str,
    ) -> CustomResult<String, PosError> {
        let padded = format!("{terminal_id:0>9}");
        let digest = Sha1
            .generate_digest(format!("{}{padded}", password.peek()).as_bytes())
            .map_err(|_| PosError::RequestEncodingFailed)?;
        Ok(hex::encode_upper(digest))
    }

    fn sha512_upper(plain: &str) -> CustomResult<String, PosError> {
        let digest = Sha512
            .generate_digest(plain.as_bytes())
            .map_err(|_| PosError::RequestEncodingFailed)?;
        Ok(hex::encode_upper(digest))
    }

    fn store_key(account: &GatewayAccount) -> CustomResult<String, PosError> {
        account
            .store_key
            .as_ref()
            .map(|key| key.peek().clone())
            .ok_or_else(|| PosError::FailedToObtainAuthType.into())
    }
}

impl GatewayCrypt for GarantiCrypt {
    fn create_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError> {
        account.ensure_kind(&[GatewayKind::Garanti])?;
        let password = utils::form_field(data, "provisionpassword");
        let terminal_id = utils::form_field(data, "terminalid");
        let security_data =
            Self::security_data(&Secret::new(password.to_string()), terminal_id)?;
        let plain = format!(
            "{}{}{}{}{}{}",
            utils::form_field(data, "orderid"),
            terminal_id,
            utils::form_field(data, "cardnumber"),
            utils::form_field(data, "amount"),
            utils::form_field(data, "currency"),
            security_data,
        );
        Self::sha512_upper(&plain)
    }

    fn create_3d_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError> {
        account.ensure_kind(&[GatewayKind::Garanti])?;
        let store_key = Self::store_key(account)?;
        let password = account
            .password
            .clone()
            .ok_or(PosError::FailedToObtainAuthType)?;
        let terminal_id = utils::form_field(data, "terminalid");
        let security_data = Self::security_data(&password, terminal_id)?;
        let plain = format!(
            "{}{}{}{}{}{}{}{}{}{}",
            terminal_id,
            utils::form_field(data, "orderid"),
            utils::form_field(data, "txnamount"),
            utils::form_field(data, "txncurrencycode"),
            utils::form_field(data, "successurl"),
            utils::form_field(data, "errorurl"),
            utils::form_field(data, "txntype"),
            utils::form_field(data, "txninstallmentcount"),
            store_key,
            security_data,
        );
        Self::sha512_upper(&plain)
    }

    fn check_3d_hash(
        &self,
        account: &GatewayAccount,
        params: &CallbackParams,
    ) -> CustomResult<bool, PosError> {
        account.ensure_kind(&[GatewayKind::Garanti])?;
        let store_key = Self::store_key(account)?;
        let (Some(hash_params), Some(received)) = (params.get("hashparams"), params.get("hash"))
        else {
            return Ok(false);
        };

        let mut params_val = String::new();
        for name in hash_params.split(':').filter(|name| !name.is_empty()) {
            params_val.push_str(utils::callback_param(params, name));
        }
        if let Some(reported_val) = params.get("hashparamsval") {
            if reported_val != &params_val {
                return Ok(false);
            }
        }

        let actual = Self::sha512_upper(&format!("{params_val}{store_key}"))?;
        Ok(&actual == received)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GarantiTerminal {
    pub prov_user_i_d: Secret<String>,
    pub hash_data: String,
    pub user_i_d: Secret<String>,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "MerchantID")]
    pub merchant_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GarantiCustomer {
    #[serde(rename = "IPAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GarantiCard {
    pub number: StrongSecret<String>,
    pub expire_date: Secret<String>,
    #[serde(rename = "CVV2")]
    pub cvv2: Secret<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GarantiOrder {
    #[serde(rename = "OrderID")]
    pub order_id: String,
    #[serde(rename = "GroupID", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GarantiTransaction {
    #[serde(rename = "Type")]
    pub tx_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_cnt: Option<String>,
    pub amount: String,
    pub currency_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardholder_present_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moto_ind: Option<&'static str>,
    #[serde(rename = "OriginalRetrefNum", skip_serializing_if = "Option::is_none")]
    pub original_retref_num: Option<String>,
}

/// Authentication proof forwarded into the finalize leg of the 3-D Secure
/// model.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GarantiSecure3D {
    pub authentication_code: String,
    pub security_level: String,
    #[serde(rename = "TxnID", skip_serializing_if = "Option::is_none")]
    pub txn_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md: Option<String>,
}

/// The GVPS request envelope. Element order is the wire order.
#[derive(Debug, Serialize)]
#[serde(rename = "GVPSRequest")]
#[serde(rename_all = "PascalCase")]
pub struct GvpsRequest {
    pub mode: &'static str,
    pub version: &'static str,
    pub terminal: GarantiTerminal,
    pub customer: GarantiCustomer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<GarantiCard>,
    pub order: GarantiOrder,
    pub transaction: GarantiTransaction,
    #[serde(rename = "Secure3D", skip_serializing_if = "Option::is_none")]
    pub secure_3d: Option<GarantiSecure3D>,
}

pub fn mode(test_mode: bool) -> &'static str {
    if test_mode {
        "TEST"
    } else {
        "PROD"
    }
}

pub struct GvpsRequestInput<'a> {
    pub auth: &'a GarantiAuthType,
    pub order: &'a Order,
    pub tx_type: String,
    pub amount: String,
    pub currency: String,
    pub installment: Option<String>,
    pub test_mode: bool,
}

impl GvpsRequest {
    /// Non-secure payment provisioning, card present.
    pub fn payment(
        crypt: &GarantiCrypt,
        account: &GatewayAccount,
        input: &GvpsRequestInput<'_>,
        card: &Card,
    ) -> CustomResult<Self, PosError> {
        let hash_data = crypt.create_hash(
            account,
            &vec![
                ("orderid".to_string(), input.order.id.clone()),
                ("terminalid".to_string(), input.auth.terminal_id.clone()),
                ("cardnumber".to_string(), card.number.peek().clone()),
                ("amount".to_string(), input.amount.clone()),
                ("currency".to_string(), input.currency.clone()),
                (
                    "provisionpassword".to_string(),
                    input.auth.password.peek().clone(),
                ),
            ],
        )?;
        Ok(Self {
            mode: mode(input.test_mode),
            version: API_VERSION,
            terminal: GarantiTerminal {
                prov_user_i_d: input.auth.username.clone(),
                hash_data,
                user_i_d: input.auth.username.clone(),
                id: input.auth.terminal_id.clone(),
                merchant_id: input.auth.merchant_id.clone(),
            },
            customer: GarantiCustomer {
                ip_address: input.order.client_ip.clone(),
                email_address: input.order.email.clone(),
            },
            card: Some(GarantiCard {
                number: card.number.clone(),
                expire_date: card.get_expiry_date_as_mmyy()?,
                cvv2: card.cvv.clone(),
            }),
            order: GarantiOrder {
                order_id: input.order.id.clone(),
                group_id: None,
            },
            transaction: GarantiTransaction {
                tx_type: input.tx_type.clone(),
                installment_cnt: input.installment.clone(),
                amount: input.amount.clone(),
                currency_code: input.currency.clone(),
                cardholder_present_code: Some("0"),
                moto_ind: Some("N"),
                original_retref_num: None,
            },
            secure_3d: None,
        })
    }

    /// The finalize leg of the 3-D Secure model: card data replaced by the
    /// authentication proof carried in the provision payload.
    pub fn three_d_payment(
        crypt: &GarantiCrypt,
        account: &GatewayAccount,
        input: &GvpsRequestInput<'_>,
        callback: &CallbackParams,
    ) -> CustomResult<Self, PosError> {
        let mut request = Self::management(crypt, account, input, "13")?;
        request.secure_3d = Some(GarantiSecure3D {
            authentication_code: utils::require_callback_param(callback, "cavv")?.to_string(),
            security_level: utils::require_callback_param(callback, "eci")?.to_string(),
            txn_id: callback.get("xid").cloned(),
            md: callback.get("md").cloned(),
        });
        Ok(request)
    }

    /// Card-less provisioning shared by capture, cancel, refund, queries.
    pub fn management(
        crypt: &GarantiCrypt,
        account: &GatewayAccount,
        input: &GvpsRequestInput<'_>,
        cardholder_present_code: &'static str,
    ) -> CustomResult<Self, PosError> {
        let refund_operation = matches!(input.tx_type.as_str(), "refund" | "void");
        let (username, password) = input.auth.provision_user(refund_operation);
        let hash_data = crypt.create_hash(
            account,
            &vec![
                ("orderid".to_string(), input.order.id.clone()),
                ("terminalid".to_string(), input.auth.terminal_id.clone()),
                ("amount".to_string(), input.amount.clone()),
                ("currency".to_string(), input.currency.clone()),
                ("provisionpassword".to_string(), password.peek().clone()),
            ],
        )?;
        let original_retref_num = if refund_operation {
            Some(input.order.linked.ref_ret_num.clone().ok_or(
                PosError::MissingRequiredField {
                    field_name: "linked.ref_ret_num",
                },
            )?)
        } else {
            None
        };
        Ok(Self {
            mode: mode(input.test_mode),
            version: API_VERSION,
            terminal: GarantiTerminal {
                prov_user_i_d: username.clone(),
                hash_data,
                user_i_d: username,
                id: input.auth.terminal_id.clone(),
                merchant_id: input.auth.merchant_id.clone(),
            },
            customer: GarantiCustomer {
                ip_address: input.order.client_ip.clone(),
                email_address: input.order.email.clone(),
            },
            card: None,
            order: GarantiOrder {
                order_id: input.order.id.clone(),
                group_id: None,
            },
            transaction: GarantiTransaction {
                tx_type: input.tx_type.clone(),
                installment_cnt: input.installment.clone(),
                amount: input.amount.clone(),
                currency_code: input.currency.clone(),
                cardholder_present_code: Some(cardholder_present_code),
                moto_ind: Some("N"),
                original_retref_num,
            },
            secure_3d: None,
        })
    }
}

/// The browser-redirect form for the 3-D models. Lower-case field names are
/// the GVPS OOS convention; order matters only for readability, the hash
/// covers the declared list.
#[allow(clippy::too_many_arguments)]
pub fn three_d_form_fields(
    auth: &GarantiAuthType,
    order: &Order,
    model: PaymentModel,
    tx_type: String,
    card: Option<&Card>,
    amount: String,
    currency: String,
    installment: String,
    test_mode: bool,
    env: &RequestEnv,
    lang: crate::enums::Language,
) -> CustomResult<FormFields, PosError> {
    let secure_level = match model {
        PaymentModel::ThreeDSecure => "3D",
        PaymentModel::ThreeDPay => "3D_PAY",
        _ => {
            return Err(PosError::NotSupported {
                message: format!("payment model {model}"),
                gateway: "garanti",
            }
            .into())
        }
    };
    let mut fields: FormFields = vec![
        ("secure3dsecuritylevel".to_string(), secure_level.to_string()),
        ("mode".to_string(), mode(test_mode).to_string()),
        ("apiversion".to_string(), API_VERSION.to_string()),
        ("terminalprovuserid".to_string(), auth.username.peek().clone()),
        ("terminaluserid".to_string(), auth.username.peek().clone()),
        ("terminalid".to_string(), auth.terminal_id.clone()),
        ("terminalmerchantid".to_string(), auth.merchant_id.clone()),
        ("orderid".to_string(), order.id.clone()),
        ("txntype".to_string(), tx_type),
        ("txnamount".to_string(), amount),
        ("txncurrencycode".to_string(), currency),
        ("txninstallmentcount".to_string(), installment),
        ("successurl".to_string(), order.success_url_str()?.to_string()),
        ("errorurl".to_string(), order.fail_url_str()?.to_string()),
        ("customeripaddress".to_string(), order.client_ip.clone().unwrap_or_default()),
        ("customeremailaddress".to_string(), order.email.clone().unwrap_or_default()),
        ("rnd".to_string(), env.rnd.clone()),
        ("lang".to_string(), lang.to_string()),
    ];
    if model == PaymentModel::ThreeDSecure {
        let card = card.ok_or(PosError::MissingRequiredField { field_name: "card" })?;
        fields.push(("cardnumber".to_string(), card.number.peek().clone()));
        fields.push((
            "cardexpiredatemonth".to_string(),
            card.get_expiry_month_2_digit()?.peek().clone(),
        ));
        fields.push((
            "cardexpiredateyear".to_string(),
            card.get_expiry_year_2_digit()?.peek().clone(),
        ));
        fields.push(("cardcvv2".to_string(), card.cvv.peek().clone()));
    }
    Ok(fields)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GvpsResponseTransaction {
    pub response: Option<GvpsInnerResponse>,
    #[serde(rename = "RetrefNum")]
    pub retref_num: Option<String>,
    pub auth_code: Option<String>,
    pub batch_num: Option<String>,
    pub provision_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GvpsInnerResponse {
    pub source: Option<String>,
    pub code: Option<String>,
    pub reason_code: Option<String>,
    pub message: Option<String>,
    pub error_msg: Option<String>,
    pub sys_err_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GvpsResponseOrder {
    #[serde(rename = "OrderID")]
    pub order_id: Option<String>,
    #[serde(rename = "GroupID")]
    pub group_id: Option<String>,
    pub order_inq_result: Option<GvpsOrderInqResult>,
    pub order_hist_inq_result: Option<GvpsOrderHistInqResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GvpsOrderInqResult {
    pub status: Option<String>,
    pub auth_code: Option<String>,
    pub retref_num: Option<String>,
    pub remaining_b_n_s_amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GvpsOrderHistInqResult {
    #[serde(rename = "OrderTxnList")]
    pub order_txn_list: Option<GvpsOrderTxnList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GvpsOrderTxnList {
    #[serde(rename = "OrderTxn", default)]
    pub order_txn: Vec<GvpsOrderTxn>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GvpsOrderTxn {
    #[serde(rename = "Type")]
    pub tx_type: Option<String>,
    pub status: Option<String>,
    pub auth_code: Option<String>,
    pub retref_num: Option<String>,
    pub amount: Option<String>,
}

/// The GVPS response envelope.
#[derive(Debug, Deserialize)]
#[serde(rename = "GVPSResponse")]
#[serde(rename_all = "PascalCase")]
pub struct GvpsResponse {
    pub transaction: Option<GvpsResponseTransaction>,
    pub order: Option<GvpsResponseOrder>,
}

impl GvpsResponse {
    fn reason_and_message(&self) -> (Option<String>, Option<String>) {
        match self
            .transaction
            .as_ref()
            .and_then(|transaction| transaction.response.as_ref())
        {
            Some(inner) => (
                inner.reason_code.clone(),
                inner
                    .error_msg
                    .clone()
                    .filter(|msg| !msg.is_empty())
                    .or_else(|| inner.sys_err_msg.clone()),
            ),
            None => (None, None),
        }
    }

    pub fn approved(&self) -> bool {
        // The decision code sits nested two levels down; absence is a
        // decline.
        self.transaction
            .as_ref()
            .and_then(|transaction| transaction.response.as_ref())
            .and_then(|inner| inner.code.as_deref())
            == Some(crate::consts::APPROVED_PROC_CODE)
    }

    pub fn into_result(self, on_approval: TransactionStatus) -> TransactionResult {
        let approved = self.approved();
        let (reason_code, error_message) = self.reason_and_message();
        let transaction = self.transaction;
        let order = self.order;
        let code = transaction
            .as_ref()
            .and_then(|t| t.response.as_ref())
            .and_then(|inner| inner.code.clone());
        TransactionResult {
            status: if approved {
                on_approval
            } else {
                TransactionStatus::Failure
            },
            gateway_return_code: code,
            auth_code: transaction.as_ref().and_then(|t| t.auth_code.clone()),
            refs: ReferenceNumbers {
                host_ref_num: transaction.as_ref().and_then(|t| t.retref_num.clone()),
                transaction_id: None,
                remote_order_id: order.as_ref().and_then(|o| o.order_id.clone()),
                batch_id: transaction.as_ref().and_then(|t| t.batch_num.clone()),
            },
            three_d: None,
            error_code: if approved { None } else { reason_code },
            error_message: if approved { None } else { error_message },
            raw: serde_json::Value::Null,
        }
    }

    pub fn into_status_result(self) -> TransactionResult {
        let inq = self
            .order
            .as_ref()
            .and_then(|order| order.order_inq_result.as_ref());
        let status = match inq.and_then(|inq| inq.status.as_deref()) {
            Some("APPROVED") => TransactionStatus::Charged,
            Some("PREAUTH") => TransactionStatus::Authorized,
            Some("VOID") => TransactionStatus::Voided,
            Some("REFUNDED") => TransactionStatus::Refunded,
            Some("WAITINGPOSTAUTH") => TransactionStatus::Authorized,
            _ => TransactionStatus::Failure,
        };
        let auth_code = inq.and_then(|inq| inq.auth_code.clone());
        let retref_num = inq.and_then(|inq| inq.retref_num.clone());
        TransactionResult {
            status,
            gateway_return_code: None,
            auth_code,
            refs: ReferenceNumbers {
                host_ref_num: retref_num,
                transaction_id: None,
                remote_order_id: self.order.as_ref().and_then(|o| o.order_id.clone()),
                batch_id: None,
            },
            three_d: None,
            error_code: None,
            error_message: None,
            raw: serde_json::Value::Null,
        }
    }

    pub fn into_history_results(self) -> Vec<TransactionResult> {
        let order_id = self.order.as_ref().and_then(|o| o.order_id.clone());
        self.order
            .and_then(|order| order.order_hist_inq_result)
            .and_then(|hist| hist.order_txn_list)
            .map(|list| list.order_txn)
            .unwrap_or_default()
            .into_iter()
            .map(|txn| {
                let status = match txn.status.as_deref() {
                    Some("APPROVED") => TransactionStatus::Charged,
                    Some("VOID") => TransactionStatus::Voided,
                    Some("REFUNDED") => TransactionStatus::Refunded,
                    _ => TransactionStatus::Failure,
                };
                TransactionResult {
                    status,
                    gateway_return_code: None,
                    auth_code: txn.auth_code,
                    refs: ReferenceNumbers {
                        host_ref_num: txn.retref_num,
                        transaction_id: None,
                        remote_order_id: order_id.clone(),
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

fn md_status_authenticated(md_status: &str) -> bool {
    matches!(md_status, "1" | "2" | "3" | "4")
}

/// Normalize the OOS callback after hash verification.
pub fn callback_to_result(
    verified: bool,
    model: PaymentModel,
    params: &CallbackParams,
) -> TransactionResult {
    let raw = serde_json::to_value(params).unwrap_or_default();
    let md_status = utils::callback_param(params, "mdstatus").to_string();
    let proc_return_code = params.get("procreturncode").cloned();
    let three_d = ThreeDSecureData {
        md_status: Some(md_status.clone()),
        eci: params.get("eci").cloned(),
        cavv: params.get("cavv").cloned(),
        xid: params.get("xid").cloned(),
        md: params.get("md").cloned(),
    };

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
        auth_code: params.get("authcode").cloned(),
        refs: ReferenceNumbers {
            host_ref_num: params.get("hostrefnum").cloned(),
            transaction_id: params.get("transid").cloned(),
            remote_order_id: params.get("oid").cloned(),
            batch_id: None,
        },
        three_d: Some(three_d),
        error_code: params.get("mderrormessage").cloned(),
        error_message: params.get("errmsg").cloned(),
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
        GatewayAccount::new(GatewayKind::Garanti, "7000679")
            .with_credentials("PROVAUT", Secret::new("123qweASD/".to_string()))
            .with_store_key(Secret::new("12345678".to_string()))
            .with_terminal_id("30691298")
    }

    fn order() -> Order {
        let mut order = Order::new("order222", MinorUnit::new(10025), Currency::TRY);
        order.success_url = Some(url::Url::parse("https://domain.com/success").unwrap());
        order.fail_url = Some(url::Url::parse("https://domain.com/fail_url").unwrap());
        order
    }

    #[test]
    fn security_data_folds_the_padded_terminal_id() {
        let security =
            GarantiCrypt::security_data(&Secret::new("123qweASD/".to_string()), "30691298")
                .unwrap();

        assert_eq!(security, "1639636D00AB5EF0B3CE073BB222BFAAC2C2C38D");
    }

    #[test]
    fn api_hash_matches_known_vector() {
        let data = vec![
            ("orderid".to_string(), "order222".to_string()),
            ("terminalid".to_string(), "30691298".to_string()),
            ("cardnumber".to_string(), "4355084355084358".to_string()),
            ("amount".to_string(), "10025".to_string()),
            ("currency".to_string(), "949".to_string()),
            ("provisionpassword".to_string(), "123qweASD/".to_string()),
        ];

        let hash = GarantiCrypt.create_hash(&account(), &data).unwrap();

        assert_eq!(
            hash,
            "20ED0798A2BA4854F6181EFC24B9FABA21AB1E4845E4C31CC126A39F5935B64C3F8B3955C9A9286040D8355175CEF0E7DE91AE668E280A84680D3D129B183F72"
        );
    }

    #[test]
    fn card_less_api_hash_treats_the_pan_as_empty() {
        let data = vec![
            ("orderid".to_string(), "order222".to_string()),
            ("terminalid".to_string(), "30691298".to_string()),
            ("amount".to_string(), "10025".to_string()),
            ("currency".to_string(), "949".to_string()),
            ("provisionpassword".to_string(), "123qweASD/".to_string()),
        ];

        let hash = GarantiCrypt.create_hash(&account(), &data).unwrap();

        assert_eq!(
            hash,
            "0CFE09F107274C6A07292DA061A4EECAB0F5F0CF87F831F2D3626A3346A941126C52D1D95A3B77ADF5AC348B3D25C76BA5D8D98A29557D087D3367BFFACCD25C"
        );
    }

    #[test]
    fn three_d_hash_matches_known_vector() {
        let data = vec![
            ("terminalid".to_string(), "30691298".to_string()),
            ("orderid".to_string(), "order222".to_string()),
            ("txnamount".to_string(), "10025".to_string()),
            ("txncurrencycode".to_string(), "949".to_string()),
            ("successurl".to_string(), "https://domain.com/success".to_string()),
            ("errorurl".to_string(), "https://domain.com/fail_url".to_string()),
            ("txntype".to_string(), "sales".to_string()),
            ("txninstallmentcount".to_string(), String::new()),
        ];

        let hash = GarantiCrypt.create_3d_hash(&account(), &data).unwrap();

        assert_eq!(
            hash,
            "372D6CB20B2B699D0A6667DFF46E3AA8CF3F9D8C2BB69A7C411895151FFCFAAB5277CCFE3B3A06035FEEFBFBFD40C79DBE51DBF867D0A24B37335A28F0CEFDE2"
        );
    }

    fn callback() -> CallbackParams {
        let mut params = CallbackParams::new();
        params.insert("mdstatus".to_string(), "1".to_string());
        params.insert("mderrormessage".to_string(), String::new());
        params.insert("errmsg".to_string(), String::new());
        params.insert("clientid".to_string(), "7000679".to_string());
        params.insert("oid".to_string(), "order222".to_string());
        params.insert("authcode".to_string(), "12345".to_string());
        params.insert("procreturncode".to_string(), "00".to_string());
        params.insert("response".to_string(), "Approved".to_string());
        params.insert("rnd".to_string(), "rand012345".to_string());
        params.insert(
            "hashparams".to_string(),
            "clientid:oid:authcode:procreturncode:response:mdstatus:rnd".to_string(),
        );
        params.insert(
            "hashparamsval".to_string(),
            "7000679order2221234500Approved1rand012345".to_string(),
        );
        params.insert(
            "hash".to_string(),
            "BD4175024A7E4B7A22F999ABD34D165F0E60A606ACA00D52DF78A897A2C8795F715A3F51D830E77526AEBA4EFA19145BC15A1C29A5DBFB5899A55F01888BFC4C"
                .to_string(),
        );
        params
    }

    #[test]
    fn callback_verifies_and_fails_closed() {
        let account = account();
        assert!(GarantiCrypt.check_3d_hash(&account, &callback()).unwrap());

        let mut blanked = callback();
        blanked.insert("mdstatus".to_string(), String::new());
        assert!(!GarantiCrypt.check_3d_hash(&account, &blanked).unwrap());

        let mut missing = callback();
        missing.remove("hash");
        assert!(!GarantiCrypt.check_3d_hash(&account, &missing).unwrap());
    }

    #[test]
    fn payment_request_renders_gvps_envelope() {
        let account = account();
        let auth = GarantiAuthType::try_from(&account).unwrap();
        let order = order();
        let card = Card::new(
            masking::StrongSecret::new("4355084355084358".to_string()),
            Secret::new("12".to_string()),
            Secret::new("26".to_string()),
            Secret::new("123".to_string()),
        );
        let input = GvpsRequestInput {
            auth: &auth,
            order: &order,
            tx_type: "sales".to_string(),
            amount: "10025".to_string(),
            currency: "949".to_string(),
            installment: None,
            test_mode: true,
        };

        let request = GvpsRequest::payment(&GarantiCrypt, &account, &input, &card).unwrap();
        let xml = quick_xml::se::to_string(&request).unwrap();

        assert!(xml.starts_with("<GVPSRequest>"));
        assert!(xml.contains("<Mode>TEST</Mode>"));
        assert!(xml.contains("<MerchantID>7000679</MerchantID>"));
        assert!(xml.contains("<Amount>10025</Amount>"));
        assert!(xml.contains("<ExpireDate>1226</ExpireDate>"));
        // Terminal block precedes the transaction block on the wire.
        assert!(xml.find("<Terminal>").unwrap() < xml.find("<Transaction>").unwrap());
    }

    #[test]
    fn refund_without_linked_reference_is_rejected() {
        let account = account();
        let auth = GarantiAuthType::try_from(&account).unwrap();
        let order = order();
        let input = GvpsRequestInput {
            auth: &auth,
            order: &order,
            tx_type: "refund".to_string(),
            amount: "10025".to_string(),
            currency: "949".to_string(),
            installment: None,
            test_mode: true,
        };

        let error = GvpsRequest::management(&GarantiCrypt, &account, &input, "0").unwrap_err();

        assert!(matches!(
            error.current_context(),
            PosError::MissingRequiredField {
                field_name: "linked.ref_ret_num"
            }
        ));
    }

    #[test]
    fn payment_response_parses_nested_decision_code() {
        use crate::utils::BytesExt;

        let body = br#"<GVPSResponse>
            <Transaction>
                <Response>
                    <Source>HOST</Source>
                    <Code>00</Code>
                    <ReasonCode>00</ReasonCode>
                    <Message>Approved</Message>
                    <ErrorMsg></ErrorMsg>
                    <SysErrMsg></SysErrMsg>
                </Response>
                <RetrefNum>207008394585</RetrefNum>
                <AuthCode>306784</AuthCode>
                <BatchNum>000001</BatchNum>
                <ProvisionStatus>APPROVED</ProvisionStatus>
            </Transaction>
            <Order>
                <OrderID>order222</OrderID>
                <GroupID></GroupID>
            </Order>
        </GVPSResponse>"#;

        let response: GvpsResponse = body.as_slice().parse_xml("GvpsResponse").unwrap();
        let result = response.into_result(TransactionStatus::Charged);

        assert!(result.approved());
        assert_eq!(result.auth_code.as_deref(), Some("306784"));
        assert_eq!(result.refs.host_ref_num.as_deref(), Some("207008394585"));
    }

    #[test]
    fn declined_response_surfaces_the_error_message() {
        use crate::utils::BytesExt;

        let body = br#"<GVPSResponse>
            <Transaction>
                <Response>
                    <Source>GVPS</Source>
                    <Code>92</Code>
                    <ReasonCode>0002</ReasonCode>
                    <Message>Declined</Message>
                    <ErrorMsg>Islem yapilamadi</ErrorMsg>
                    <SysErrMsg></SysErrMsg>
                </Response>
            </Transaction>
        </GVPSResponse>"#;

        let response: GvpsResponse = body.as_slice().parse_xml("GvpsResponse").unwrap();
        let result = response.into_result(TransactionStatus::Charged);

        assert_eq!(result.status, TransactionStatus::Failure);
        assert_eq!(result.error_code.as_deref(), Some("0002"));
        assert_eq!(result.error_message.as_deref(), Some("Islem yapilamadi"));
    }

    #[test]
    fn order_history_collects_the_transaction_list() {
        use crate::utils::BytesExt;

        let body = br#"<GVPSResponse>
            <Order>
                <OrderID>order222</OrderID>
                <OrderHistInqResult>
                    <OrderTxnList>
                        <OrderTxn>
                            <Type>sales</Type>
                            <Status>APPROVED</Status>
                            <AuthCode>306784</AuthCode>
                            <RetrefNum>207008394585</RetrefNum>
                            <Amount>10025</Amount>
                        </OrderTxn>
                        <OrderTxn>
                            <Type>refund</Type>
                            <Status>REFUNDED</Status>
                            <AuthCode>306785</AuthCode>
                            <RetrefNum>207008394586</RetrefNum>
                            <Amount>10025</Amount>
                        </OrderTxn>
                    </OrderTxnList>
                </OrderHistInqResult>
            </Order>
        </GVPSResponse>"#;

        let response: GvpsResponse = body.as_slice().parse_xml("GvpsResponse").unwrap();
        let results = response.into_history_results();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, TransactionStatus::Charged);
        assert_eq!(results[1].status, TransactionStatus::Refunded);
    }

    #[test]
    fn verified_three_d_pay_callback_settles() {
        let result = callback_to_result(true, PaymentModel::ThreeDPay, &callback());

        assert_eq!(result.status, TransactionStatus::Charged);
        assert_eq!(result.auth_code.as_deref(), Some("12345"));
    }
}
