pub mod transformers;

use transformers as posnet;

use crate::{
    api::{GatewayCrypt, PosConnector},
    configs::GatewayParams,
    domain::{
        CallbackParams, Card, FormFieldsHook, GatewayAccount, Order, RequestEnv, ThreeDFormData,
        TransactionResult,
    },
    enums::{Currency, GatewayKind, PaymentModel, TransactionStatus, TransactionType},
    errors::{CustomResult, PosError},
    request::{Method, RequestContent},
    types::{AmountConvertor, Installment, MinorUnit, StringMinorUnitForGateway},
    utils::BytesExt,
};

/// The Posnet API consumes its XML envelope inside an
/// `xmldata=`-form-encoded body.
#[derive(Debug, serde::Serialize)]
pub struct XmlDataForm {
    pub xmldata: String,
}

/// Yapı Kredi Posnet adapter.
#[derive(Clone)]
pub struct Posnet {
    amount_converter: &'static dyn AmountConvertor<Output = crate::types::StringMinorUnit>,
}

impl Posnet {
    pub fn new() -> &'static Self {
        &Self {
            amount_converter: &StringMinorUnitForGateway,
        }
    }

    fn form_body(request: &posnet::PosnetRequest) -> CustomResult<RequestContent, PosError> {
        let xmldata =
            quick_xml::se::to_string(request).map_err(|_| PosError::RequestEncodingFailed)?;
        Ok(RequestContent::FormUrlEncoded(Box::new(XmlDataForm {
            xmldata,
        })))
    }
}

impl PosConnector for Posnet {
    fn id(&self) -> &'static str {
        "posnet"
    }

    fn kind(&self) -> GatewayKind {
        GatewayKind::Posnet
    }

    fn crypt(&self) -> &'static dyn GatewayCrypt {
        &posnet::PosnetCrypt
    }

    fn map_currency(&self, currency: Currency) -> CustomResult<String, PosError> {
        let mapped = match currency {
            Currency::TRY => "TL",
            Currency::USD => "US",
            Currency::EUR => "EU",
            Currency::GBP => "GB",
            Currency::JPY => "JP",
            Currency::RUB => "RU",
            Currency::CHF => "SF",
        };
        Ok(mapped.to_string())
    }

    fn map_installment(&self, installment: Installment) -> String {
        match installment.count() {
            Some(count) => format!("{count:02}"),
            None => "00".to_string(),
        }
    }

    fn map_tx_type(&self, tx_type: TransactionType) -> CustomResult<String, PosError> {
        let mapped = match tx_type {
            TransactionType::Auth => "Sale",
            TransactionType::PreAuth => "Auth",
            TransactionType::PostAuth => "Capt",
            _ => {
                return Err(PosError::NotSupported {
                    message: format!("transaction type {tx_type}"),
                    gateway: self.id(),
                }
                .into())
            }
        };
        Ok(mapped.to_string())
    }

    fn format_amount(
        &self,
        amount: MinorUnit,
        currency: Currency,
    ) -> CustomResult<String, PosError> {
        Ok(self
            .amount_converter
            .convert(amount, currency)?
            .get_amount_as_string()
            .to_string())
    }

    fn build_payment_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        card: &Card,
        tx_type: TransactionType,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let pre_auth = match tx_type {
            TransactionType::Auth => false,
            TransactionType::PreAuth => true,
            _ => {
                return Err(PosError::NotSupported {
                    message: format!("transaction type {tx_type} for payment"),
                    gateway: self.id(),
                }
                .into())
            }
        };
        let auth = posnet::PosnetAuthType::try_from(account)?;
        let request = posnet::PosnetRequest::payment(
            &auth,
            order,
            card,
            pre_auth,
            self.format_amount(order.amount, order.currency)?,
            self.map_currency(order.currency)?,
            self.map_installment(order.installment),
        )?;
        Self::form_body(&request)
    }

    fn build_3d_enrollment_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        card: &Card,
        tx_type: TransactionType,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = posnet::PosnetAuthType::try_from(account)?;
        let request = posnet::PosnetRequest::enrollment(
            &auth,
            order,
            card,
            self.map_tx_type(tx_type)?,
            self.format_amount(order.amount, order.currency)?,
            self.map_currency(order.currency)?,
            self.map_installment(order.installment),
        )?;
        Self::form_body(&request)
    }

    fn build_3d_form_data(
        &self,
        account: &GatewayAccount,
        order: &Order,
        model: PaymentModel,
        _tx_type: TransactionType,
        _card: Option<&Card>,
        params: &GatewayParams,
        bank_data: Option<&CallbackParams>,
        _env: &RequestEnv,
        hook: Option<FormFieldsHook<'_>>,
    ) -> CustomResult<ThreeDFormData, PosError> {
        if model != PaymentModel::ThreeDSecure {
            return Err(PosError::NotSupported {
                message: format!("payment model {model}"),
                gateway: self.id(),
            }
            .into());
        }
        let auth = posnet::PosnetAuthType::try_from(account)?;
        let bank_data = bank_data.ok_or(PosError::MissingRequiredField {
            field_name: "bank_data",
        })?;
        let mut fields = posnet::three_d_form_fields(&auth, order, bank_data, account.lang)?;
        // The redirect tokens are bank-signed; the hook may only append
        // merchant-side presentation fields.
        if let Some(hook) = hook {
            hook(&mut fields);
        }
        Ok(ThreeDFormData {
            gateway_url: params.gateway_3d.to_string(),
            method: Method::Post,
            inputs: fields,
        })
    }

    fn build_3d_payment_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _tx_type: TransactionType,
        callback: &CallbackParams,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = posnet::PosnetAuthType::try_from(account)?;
        let request = posnet::PosnetRequest::three_d_payment(
            account,
            &auth,
            order,
            self.format_amount(order.amount, order.currency)?,
            self.map_currency(order.currency)?,
            callback,
        )?;
        Self::form_body(&request)
    }

    fn build_postauth_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = posnet::PosnetAuthType::try_from(account)?;
        let request = posnet::PosnetRequest::capture(
            &auth,
            order,
            self.format_amount(order.amount, order.currency)?,
            self.map_currency(order.currency)?,
            self.map_installment(order.installment),
        )?;
        Self::form_body(&request)
    }

    fn build_cancel_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = posnet::PosnetAuthType::try_from(account)?;
        let request = posnet::PosnetRequest::cancel(&auth, order)?;
        Self::form_body(&request)
    }

    fn build_refund_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _tx_type: TransactionType,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = posnet::PosnetAuthType::try_from(account)?;
        let request = posnet::PosnetRequest::refund(
            &auth,
            order,
            self.format_amount(order.amount, order.currency)?,
            self.map_currency(order.currency)?,
        )?;
        Self::form_body(&request)
    }

    fn build_status_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = posnet::PosnetAuthType::try_from(account)?;
        Self::form_body(&posnet::PosnetRequest::status(&auth, order))
    }

    fn parse_payment_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: posnet::PosnetResponse = body.parse_xml("PosnetResponse")?;
        Ok(response.into_result(TransactionStatus::Charged))
    }

    fn parse_enrollment_response(&self, body: &[u8]) -> CustomResult<CallbackParams, PosError> {
        let response: posnet::PosnetResponse = body.parse_xml("PosnetResponse")?;
        response.into_enrollment_tokens()
    }

    fn parse_3d_callback(
        &self,
        account: &GatewayAccount,
        model: PaymentModel,
        params: &CallbackParams,
    ) -> CustomResult<TransactionResult, PosError> {
        let verified = self.crypt().check_3d_hash(account, params)?;
        if !verified {
            tracing::warn!(gateway = self.id(), "OOS resolve failed MAC verification");
        }
        Ok(posnet::callback_to_result(verified, model, params))
    }

    fn parse_postauth_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: posnet::PosnetResponse = body.parse_xml("PosnetResponse")?;
        Ok(response.into_result(TransactionStatus::Charged))
    }

    fn parse_cancel_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: posnet::PosnetResponse = body.parse_xml("PosnetResponse")?;
        Ok(response.into_result(TransactionStatus::Voided))
    }

    fn parse_refund_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: posnet::PosnetResponse = body.parse_xml("PosnetResponse")?;
        Ok(response.into_result(TransactionStatus::Refunded))
    }

    fn parse_status_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: posnet::PosnetResponse = body.parse_xml("PosnetResponse")?;
        Ok(response.into_result(TransactionStatus::Charged))
    }
}
