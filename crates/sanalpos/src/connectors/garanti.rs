pub mod transformers;

use transformers as garanti;

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

/// Garanti BBVA GVPS adapter.
#[derive(Clone)]
pub struct Garanti {
    amount_converter: &'static dyn AmountConvertor<Output = crate::types::StringMinorUnit>,
}

impl Garanti {
    pub fn new() -> &'static Self {
        &Self {
            amount_converter: &StringMinorUnitForGateway,
        }
    }

    fn request_input<'a>(
        &self,
        auth: &'a garanti::GarantiAuthType,
        order: &'a Order,
        tx_type: TransactionType,
        params: &GatewayParams,
    ) -> CustomResult<garanti::GvpsRequestInput<'a>, PosError> {
        Ok(garanti::GvpsRequestInput {
            auth,
            order,
            tx_type: self.map_tx_type(tx_type)?,
            amount: self.format_amount(order.amount, order.currency)?,
            currency: self.map_currency(order.currency)?,
            installment: order.installment.count().map(|count| count.to_string()),
            test_mode: params.test_mode,
        })
    }
}

impl PosConnector for Garanti {
    fn id(&self) -> &'static str {
        "garanti"
    }

    fn kind(&self) -> GatewayKind {
        GatewayKind::Garanti
    }

    fn crypt(&self) -> &'static dyn GatewayCrypt {
        &garanti::GarantiCrypt
    }

    fn map_currency(&self, currency: Currency) -> CustomResult<String, PosError> {
        Ok(currency.iso_numeric().to_string())
    }

    fn map_installment(&self, installment: Installment) -> String {
        installment
            .count()
            .map(|count| count.to_string())
            .unwrap_or_default()
    }

    fn map_tx_type(&self, tx_type: TransactionType) -> CustomResult<String, PosError> {
        let mapped = match tx_type {
            TransactionType::Auth => "sales",
            TransactionType::PreAuth => "preauth",
            TransactionType::PostAuth => "postauth",
            TransactionType::Cancel => "void",
            TransactionType::Refund | TransactionType::RefundPartial => "refund",
            TransactionType::Status => "orderinq",
            TransactionType::OrderHistory => "orderhistoryinq",
            TransactionType::History => {
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
        params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        if !matches!(tx_type, TransactionType::Auth | TransactionType::PreAuth) {
            return Err(PosError::NotSupported {
                message: format!("transaction type {tx_type} for payment"),
                gateway: self.id(),
            }
            .into());
        }
        let auth = garanti::GarantiAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, tx_type, params)?;
        let request = garanti::GvpsRequest::payment(&garanti::GarantiCrypt, account, &input, card)?;
        Ok(RequestContent::Xml(Box::new(request)))
    }

    fn build_3d_form_data(
        &self,
        account: &GatewayAccount,
        order: &Order,
        model: PaymentModel,
        tx_type: TransactionType,
        card: Option<&Card>,
        params: &GatewayParams,
        _bank_data: Option<&CallbackParams>,
        env: &RequestEnv,
        hook: Option<FormFieldsHook<'_>>,
    ) -> CustomResult<ThreeDFormData, PosError> {
        let auth = garanti::GarantiAuthType::try_from(account)?;
        let mut fields = garanti::three_d_form_fields(
            &auth,
            order,
            model,
            self.map_tx_type(tx_type)?,
            card,
            self.format_amount(order.amount, order.currency)?,
            self.map_currency(order.currency)?,
            self.map_installment(order.installment),
            params.test_mode,
            env,
            account.lang,
        )?;
        if let Some(hook) = hook {
            hook(&mut fields);
        }
        let hash = self.crypt().create_3d_hash(account, &fields)?;
        fields.push(("secure3dhash".to_string(), hash));

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
        tx_type: TransactionType,
        callback: &CallbackParams,
        params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = garanti::GarantiAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, tx_type, params)?;
        let request = garanti::GvpsRequest::three_d_payment(
            &garanti::GarantiCrypt,
            account,
            &input,
            callback,
        )?;
        Ok(RequestContent::Xml(Box::new(request)))
    }

    fn build_postauth_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = garanti::GarantiAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, TransactionType::PostAuth, params)?;
        let request =
            garanti::GvpsRequest::management(&garanti::GarantiCrypt, account, &input, "0")?;
        Ok(RequestContent::Xml(Box::new(request)))
    }

    fn build_cancel_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = garanti::GarantiAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, TransactionType::Cancel, params)?;
        let request =
            garanti::GvpsRequest::management(&garanti::GarantiCrypt, account, &input, "0")?;
        Ok(RequestContent::Xml(Box::new(request)))
    }

    fn build_refund_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        tx_type: TransactionType,
        params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = garanti::GarantiAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, tx_type, params)?;
        let request =
            garanti::GvpsRequest::management(&garanti::GarantiCrypt, account, &input, "0")?;
        Ok(RequestContent::Xml(Box::new(request)))
    }

    fn build_status_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = garanti::GarantiAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, TransactionType::Status, params)?;
        let request =
            garanti::GvpsRequest::management(&garanti::GarantiCrypt, account, &input, "0")?;
        Ok(RequestContent::Xml(Box::new(request)))
    }

    fn build_order_history_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = garanti::GarantiAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, TransactionType::OrderHistory, params)?;
        let request =
            garanti::GvpsRequest::management(&garanti::GarantiCrypt, account, &input, "0")?;
        Ok(RequestContent::Xml(Box::new(request)))
    }

    fn parse_payment_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: garanti::GvpsResponse = body.parse_xml("GvpsResponse")?;
        Ok(response.into_result(TransactionStatus::Charged))
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
        Ok(garanti::callback_to_result(verified, model, params))
    }

    fn parse_postauth_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: garanti::GvpsResponse = body.parse_xml("GvpsResponse")?;
        Ok(response.into_result(TransactionStatus::Charged))
    }

    fn parse_cancel_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: garanti::GvpsResponse = body.parse_xml("GvpsResponse")?;
        Ok(response.into_result(TransactionStatus::Voided))
    }

    fn parse_refund_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: garanti::GvpsResponse = body.parse_xml("GvpsResponse")?;
        Ok(response.into_result(TransactionStatus::Refunded))
    }

    fn parse_status_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: garanti::GvpsResponse = body.parse_xml("GvpsResponse")?;
        Ok(response.into_status_result())
    }

    fn parse_order_history_response(
        &self,
        body: &[u8],
    ) -> CustomResult<Vec<TransactionResult>, PosError> {
        let response: garanti::GvpsResponse = body.parse_xml("GvpsResponse")?;
        Ok(response.into_history_results())
    }
}
