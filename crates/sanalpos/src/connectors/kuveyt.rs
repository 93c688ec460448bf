pub mod transformers;

use transformers as kuveyt;

use crate::{
    api::{GatewayCrypt, PosConnector},
    configs::GatewayParams,
    domain::{
        CallbackParams, Card, FormFieldsHook, GatewayAccount, Order, RequestEnv, ThreeDFormData,
        TransactionResult,
    },
    enums::{Currency, GatewayKind, Operation, PaymentModel, TransactionStatus, TransactionType},
    errors::{CustomResult, PosError},
    request::RequestContent,
    types::{AmountConvertor, Installment, MinorUnit, StringMinorUnitForGateway},
    utils::BytesExt,
};

/// Kuveyt Türk TDV2 adapter.
///
/// The 3-D redirect step is bank-rendered: the enrollment call returns the
/// HTML page the caller serves to the browser, so there is no merchant-built
/// redirect form for this family.
#[derive(Clone)]
pub struct Kuveyt {
    amount_converter: &'static dyn AmountConvertor<Output = crate::types::StringMinorUnit>,
}

impl Kuveyt {
    pub fn new() -> &'static Self {
        &Self {
            amount_converter: &StringMinorUnitForGateway,
        }
    }

    fn request_input<'a>(
        &self,
        auth: &'a kuveyt::KuveytAuthType,
        order: &'a Order,
        tx_type: TransactionType,
    ) -> CustomResult<kuveyt::KuveytRequestInput<'a>, PosError> {
        Ok(kuveyt::KuveytRequestInput {
            auth,
            order,
            tx_type: self.map_tx_type(tx_type)?,
            amount: self.format_amount(order.amount, order.currency)?,
            currency: self.map_currency(order.currency)?,
            installment: self.map_installment(order.installment),
        })
    }
}

impl PosConnector for Kuveyt {
    fn id(&self) -> &'static str {
        "kuveyt"
    }

    fn kind(&self) -> GatewayKind {
        GatewayKind::Kuveyt
    }

    fn crypt(&self) -> &'static dyn GatewayCrypt {
        &kuveyt::KuveytCrypt
    }

    fn map_currency(&self, currency: Currency) -> CustomResult<String, PosError> {
        // Four-digit zero-padded ISO numeric codes.
        let mapped = match currency {
            Currency::TRY => "0949",
            Currency::USD => "0840",
            Currency::EUR => "0978",
            Currency::GBP => "0826",
            _ => {
                return Err(PosError::NotSupported {
                    message: format!("currency {currency}"),
                    gateway: self.id(),
                }
                .into())
            }
        };
        Ok(mapped.to_string())
    }

    fn map_installment(&self, installment: Installment) -> String {
        installment
            .count()
            .map(|count| count.to_string())
            .unwrap_or_else(|| "0".to_string())
    }

    fn map_tx_type(&self, tx_type: TransactionType) -> CustomResult<String, PosError> {
        let mapped = match tx_type {
            TransactionType::Auth => "Sale",
            TransactionType::Cancel => "SaleReversal",
            TransactionType::Refund => "Drawback",
            TransactionType::RefundPartial => "PartialDrawback",
            TransactionType::Status => "GetMerchantOrderDetail",
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

    fn endpoint(
        &self,
        params: &GatewayParams,
        operation: Operation,
    ) -> CustomResult<String, PosError> {
        match operation {
            Operation::ThreeDEnrollment => Ok(params.gateway_3d.to_string()),
            Operation::Cancel | Operation::Refund | Operation::Status => params
                .query_api
                .as_ref()
                .map(|url| url.to_string())
                .ok_or_else(|| {
                    PosError::MissingRequiredField {
                        field_name: "query_api",
                    }
                    .into()
                }),
            _ => Ok(params.payment_api.to_string()),
        }
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
        if tx_type != TransactionType::Auth {
            return Err(PosError::NotSupported {
                message: format!("transaction type {tx_type} for payment"),
                gateway: self.id(),
            }
            .into());
        }
        let auth = kuveyt::KuveytAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, tx_type)?;
        let message =
            kuveyt::KuveytVPosMessage::payment(&kuveyt::KuveytCrypt, account, &input, card)?;
        Ok(RequestContent::Xml(Box::new(message)))
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
        let auth = kuveyt::KuveytAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, tx_type)?;
        let message =
            kuveyt::KuveytVPosMessage::enrollment(&kuveyt::KuveytCrypt, account, &input, card)?;
        Ok(RequestContent::Xml(Box::new(message)))
    }

    fn build_3d_form_data(
        &self,
        _account: &GatewayAccount,
        _order: &Order,
        _model: PaymentModel,
        _tx_type: TransactionType,
        _card: Option<&Card>,
        _params: &GatewayParams,
        _bank_data: Option<&CallbackParams>,
        _env: &RequestEnv,
        _hook: Option<FormFieldsHook<'_>>,
    ) -> CustomResult<ThreeDFormData, PosError> {
        // The pay gate answers the enrollment call with the full redirect
        // page; there is nothing for the merchant to assemble.
        Err(PosError::flow_not_supported("3D form data", self.id()).into())
    }

    fn build_3d_payment_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        tx_type: TransactionType,
        callback: &CallbackParams,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = kuveyt::KuveytAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, tx_type)?;
        let message =
            kuveyt::KuveytVPosMessage::provision(&kuveyt::KuveytCrypt, account, &input, callback)?;
        Ok(RequestContent::Xml(Box::new(message)))
    }

    fn build_cancel_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = kuveyt::KuveytAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, TransactionType::Cancel)?;
        let message = kuveyt::KuveytVPosMessage::management(&kuveyt::KuveytCrypt, account, &input)?;
        Ok(RequestContent::Xml(Box::new(message)))
    }

    fn build_refund_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        tx_type: TransactionType,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = kuveyt::KuveytAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, tx_type)?;
        let message = kuveyt::KuveytVPosMessage::management(&kuveyt::KuveytCrypt, account, &input)?;
        Ok(RequestContent::Xml(Box::new(message)))
    }

    fn build_status_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = kuveyt::KuveytAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, TransactionType::Status)?;
        let message = kuveyt::KuveytVPosMessage::management(&kuveyt::KuveytCrypt, account, &input)?;
        Ok(RequestContent::Xml(Box::new(message)))
    }

    fn parse_payment_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: kuveyt::KuveytResponseContract =
            body.parse_xml("KuveytResponseContract")?;
        Ok(response.into_result(TransactionStatus::Charged))
    }

    fn parse_enrollment_response(&self, body: &[u8]) -> CustomResult<CallbackParams, PosError> {
        // The response is the bank's own auto-submitting HTML page.
        let html = std::str::from_utf8(body)
            .map_err(|_| PosError::ResponseDeserializationFailed)?
            .to_string();
        let mut tokens = CallbackParams::new();
        tokens.insert("gateway_html".to_string(), html);
        Ok(tokens)
    }

    fn parse_3d_callback(
        &self,
        account: &GatewayAccount,
        model: PaymentModel,
        params: &CallbackParams,
    ) -> CustomResult<TransactionResult, PosError> {
        let verified = self.crypt().check_3d_hash(account, params)?;
        if !verified {
            tracing::warn!(gateway = self.id(), "3-D callback failed hash verification");
        }
        Ok(kuveyt::callback_to_result(verified, model, params))
    }

    fn parse_cancel_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: kuveyt::KuveytResponseContract =
            body.parse_xml("KuveytResponseContract")?;
        Ok(response.into_result(TransactionStatus::Voided))
    }

    fn parse_refund_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: kuveyt::KuveytResponseContract =
            body.parse_xml("KuveytResponseContract")?;
        Ok(response.into_result(TransactionStatus::Refunded))
    }

    fn parse_status_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: kuveyt::KuveytResponseContract =
            body.parse_xml("KuveytResponseContract")?;
        Ok(response.into_result(TransactionStatus::Charged))
    }
}
