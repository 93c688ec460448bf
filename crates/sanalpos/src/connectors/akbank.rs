pub mod transformers;

use masking::Mask;
use transformers as akbank;

use crate::{
    api::{GatewayCrypt, PosConnector},
    configs::GatewayParams,
    consts::headers,
    domain::{
        CallbackParams, Card, FormFieldsHook, GatewayAccount, HistoryQuery, Order, RequestEnv,
        ThreeDFormData, TransactionResult,
    },
    enums::{Currency, GatewayKind, PaymentModel, TransactionStatus, TransactionType},
    errors::{CustomResult, PosError},
    request::{Headers, Method, RequestContent},
    types::{AmountConvertor, Installment, MinorUnit, StringMajorUnitForGateway},
    utils::BytesExt,
};

/// Akbank JSON virtual POS adapter.
#[derive(Clone)]
pub struct Akbank {
    amount_converter: &'static dyn AmountConvertor<Output = crate::types::StringMajorUnit>,
}

impl Akbank {
    pub fn new() -> &'static Self {
        &Self {
            amount_converter: &StringMajorUnitForGateway,
        }
    }

    fn currency_code(&self, currency: Currency) -> CustomResult<i64, PosError> {
        self.map_currency(currency)?
            .parse::<i64>()
            .map_err(|_| PosError::RequestEncodingFailed.into())
    }

    fn install_count(&self, installment: Installment) -> i64 {
        installment.count().map(i64::from).unwrap_or(1)
    }

    fn request_input<'a>(
        &self,
        auth: &'a akbank::AkbankAuthType,
        order: &'a Order,
        tx_type: TransactionType,
    ) -> CustomResult<akbank::AkbankRequestInput<'a>, PosError> {
        Ok(akbank::AkbankRequestInput {
            auth,
            order,
            txn_code: self.map_tx_type(tx_type)?,
            amount: self.format_amount(order.amount, order.currency)?,
            currency: self.currency_code(order.currency)?,
            install_count: self.install_count(order.installment),
        })
    }
}

impl PosConnector for Akbank {
    fn id(&self) -> &'static str {
        "akbank"
    }

    fn kind(&self) -> GatewayKind {
        GatewayKind::Akbank
    }

    fn crypt(&self) -> &'static dyn GatewayCrypt {
        &akbank::AkbankCrypt
    }

    fn map_currency(&self, currency: Currency) -> CustomResult<String, PosError> {
        Ok(currency.iso_numeric().to_string())
    }

    fn map_installment(&self, installment: Installment) -> String {
        self.install_count(installment).to_string()
    }

    fn map_tx_type(&self, tx_type: TransactionType) -> CustomResult<String, PosError> {
        let mapped = match tx_type {
            TransactionType::Auth => "1000",
            TransactionType::PreAuth => "1004",
            TransactionType::PostAuth => "1005",
            TransactionType::Refund | TransactionType::RefundPartial => "1002",
            TransactionType::Cancel => "1003",
            TransactionType::History => "1009",
            TransactionType::OrderHistory => "1010",
            TransactionType::Status => {
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

    fn headers(
        &self,
        account: &GatewayAccount,
        content: &RequestContent,
    ) -> CustomResult<Headers, PosError> {
        use masking::ExposeInterface;

        let body = content.encode_to_string()?.expose();
        let auth_hash = akbank::AkbankCrypt::sign_body(account, &body)?;
        Ok(vec![
            (
                headers::CONTENT_TYPE.to_string(),
                content.content_type().to_string().into(),
            ),
            (headers::AUTH_HASH.to_string(), auth_hash.into_masked()),
        ])
    }

    fn build_payment_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        card: &Card,
        tx_type: TransactionType,
        _params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        if !matches!(tx_type, TransactionType::Auth | TransactionType::PreAuth) {
            return Err(PosError::NotSupported {
                message: format!("transaction type {tx_type} for payment"),
                gateway: self.id(),
            }
            .into());
        }
        let auth = akbank::AkbankAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, tx_type)?;
        let request = akbank::AkbankProcessRequest::payment(&input, card, env)?;
        Ok(RequestContent::Json(Box::new(request)))
    }

    fn build_3d_form_data(
        &self,
        account: &GatewayAccount,
        order: &Order,
        model: PaymentModel,
        _tx_type: TransactionType,
        card: Option<&Card>,
        params: &GatewayParams,
        _bank_data: Option<&CallbackParams>,
        env: &RequestEnv,
        hook: Option<FormFieldsHook<'_>>,
    ) -> CustomResult<ThreeDFormData, PosError> {
        let auth = akbank::AkbankAuthType::try_from(account)?;
        let mut fields = akbank::three_d_form_fields(
            &auth,
            order,
            model,
            self.format_amount(order.amount, order.currency)?,
            self.currency_code(order.currency)?,
            self.install_count(order.installment),
            env,
            account.lang,
        )?;
        if let Some(hook) = hook {
            hook(&mut fields);
        }
        let hash = self.crypt().create_3d_hash(account, &fields)?;
        if model != PaymentModel::ThreeDHost {
            let card = card.ok_or(PosError::MissingRequiredField { field_name: "card" })?;
            akbank::append_card_fields(&mut fields, card)?;
        }
        fields.push(("hash".to_string(), hash));

        let gateway_url = if model == PaymentModel::ThreeDHost {
            params
                .gateway_3d_host
                .as_ref()
                .unwrap_or(&params.gateway_3d)
        } else {
            &params.gateway_3d
        };
        Ok(ThreeDFormData {
            gateway_url: gateway_url.to_string(),
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
        _params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = akbank::AkbankAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, tx_type)?;
        let request = akbank::AkbankProcessRequest::three_d_payment(&input, callback, env)?;
        Ok(RequestContent::Json(Box::new(request)))
    }

    fn build_postauth_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = akbank::AkbankAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, TransactionType::PostAuth)?;
        let request = akbank::AkbankProcessRequest::management(&input, true, env)?;
        Ok(RequestContent::Json(Box::new(request)))
    }

    fn build_cancel_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = akbank::AkbankAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, TransactionType::Cancel)?;
        let request = akbank::AkbankProcessRequest::management(&input, false, env)?;
        Ok(RequestContent::Json(Box::new(request)))
    }

    fn build_refund_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        tx_type: TransactionType,
        _params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = akbank::AkbankAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, tx_type)?;
        let request = akbank::AkbankProcessRequest::management(&input, true, env)?;
        Ok(RequestContent::Json(Box::new(request)))
    }

    fn build_order_history_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = akbank::AkbankAuthType::try_from(account)?;
        let input = self.request_input(&auth, order, TransactionType::OrderHistory)?;
        let request = akbank::AkbankProcessRequest::management(&input, false, env)?;
        Ok(RequestContent::Json(Box::new(request)))
    }

    fn build_history_request(
        &self,
        account: &GatewayAccount,
        query: &HistoryQuery,
        _params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = akbank::AkbankAuthType::try_from(account)?;
        let request = akbank::AkbankProcessRequest::history(
            &auth,
            self.map_tx_type(TransactionType::History)?,
            query,
            env,
        )?;
        Ok(RequestContent::Json(Box::new(request)))
    }

    fn parse_payment_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: akbank::AkbankProcessResponse =
            body.parse_struct("AkbankProcessResponse")?;
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
        Ok(akbank::callback_to_result(verified, model, params))
    }

    fn parse_postauth_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: akbank::AkbankProcessResponse =
            body.parse_struct("AkbankProcessResponse")?;
        Ok(response.into_result(TransactionStatus::Charged))
    }

    fn parse_cancel_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: akbank::AkbankProcessResponse =
            body.parse_struct("AkbankProcessResponse")?;
        Ok(response.into_result(TransactionStatus::Voided))
    }

    fn parse_refund_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: akbank::AkbankProcessResponse =
            body.parse_struct("AkbankProcessResponse")?;
        Ok(response.into_result(TransactionStatus::Refunded))
    }

    fn parse_order_history_response(
        &self,
        body: &[u8],
    ) -> CustomResult<Vec<TransactionResult>, PosError> {
        let response: akbank::AkbankHistoryResponse =
            body.parse_struct("AkbankHistoryResponse")?;
        Ok(response.into_results())
    }

    fn parse_history_response(
        &self,
        body: &[u8],
    ) -> CustomResult<Vec<TransactionResult>, PosError> {
        let response: akbank::AkbankHistoryResponse =
            body.parse_struct("AkbankHistoryResponse")?;
        Ok(response.into_results())
    }
}
