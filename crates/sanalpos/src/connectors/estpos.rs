pub mod transformers;

use transformers as estpos;

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
    types::{AmountConvertor, Installment, MinorUnit, StringMajorUnitForGateway},
    utils::BytesExt,
};

/// Payten EST family adapter. `new` serves terminals still on the legacy
/// SHA-1 hash version, `new_v3` the ver3 SHA-512 version; everything but the
/// signing strategy is shared.
#[derive(Clone)]
pub struct Estpos {
    amount_converter: &'static dyn AmountConvertor<Output = crate::types::StringMajorUnit>,
    crypt: &'static dyn GatewayCrypt,
    kind: GatewayKind,
}

impl Estpos {
    pub fn new() -> &'static Self {
        &Self {
            amount_converter: &StringMajorUnitForGateway,
            crypt: &estpos::EstposCrypt,
            kind: GatewayKind::Estpos,
        }
    }

    pub fn new_v3() -> &'static Self {
        &Self {
            amount_converter: &StringMajorUnitForGateway,
            crypt: &estpos::EstposV3Crypt,
            kind: GatewayKind::EstposV3,
        }
    }

    fn payment_tx_type(&self, tx_type: TransactionType) -> CustomResult<String, PosError> {
        match tx_type {
            TransactionType::Auth | TransactionType::PreAuth => self.map_tx_type(tx_type),
            _ => Err(PosError::NotSupported {
                message: format!("transaction type {tx_type} for payment"),
                gateway: self.id(),
            }
            .into()),
        }
    }
}

impl PosConnector for Estpos {
    fn id(&self) -> &'static str {
        match self.kind {
            GatewayKind::EstposV3 => "estpos_v3",
            _ => "estpos",
        }
    }

    fn kind(&self) -> GatewayKind {
        self.kind
    }

    fn crypt(&self) -> &'static dyn GatewayCrypt {
        self.crypt
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
            TransactionType::Auth => "Auth",
            TransactionType::PreAuth => "PreAuth",
            TransactionType::PostAuth => "PostAuth",
            TransactionType::Cancel => "Void",
            TransactionType::Refund | TransactionType::RefundPartial => "Credit",
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
        let auth = estpos::EstposAuthType::try_from(account)?;
        let request = estpos::Cc5Request::payment(
            &auth,
            order,
            card,
            self.payment_tx_type(tx_type)?,
            self.format_amount(order.amount, order.currency)?,
            self.map_currency(order.currency)?,
            self.map_installment(order.installment),
        )?;
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
        let mut fields = estpos::three_d_form_fields(
            account,
            order,
            model,
            self.payment_tx_type(tx_type)?,
            card,
            self.format_amount(order.amount, order.currency)?,
            self.map_currency(order.currency)?,
            self.map_installment(order.installment),
            env,
        )?;
        if let Some(hook) = hook {
            hook(&mut fields);
        }
        let hash = self.crypt.create_3d_hash(account, &fields)?;
        if self.kind == GatewayKind::EstposV3 {
            fields.push(("hashAlgorithm".to_string(), "ver3".to_string()));
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
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = estpos::EstposAuthType::try_from(account)?;
        let request = estpos::Cc5Request::three_d_payment(
            &auth,
            order,
            self.payment_tx_type(tx_type)?,
            self.format_amount(order.amount, order.currency)?,
            self.map_currency(order.currency)?,
            self.map_installment(order.installment),
            callback,
        )?;
        Ok(RequestContent::Xml(Box::new(request)))
    }

    fn build_postauth_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = estpos::EstposAuthType::try_from(account)?;
        Ok(RequestContent::Xml(Box::new(estpos::Cc5Request::postauth(
            &auth, order,
        ))))
    }

    fn build_cancel_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = estpos::EstposAuthType::try_from(account)?;
        Ok(RequestContent::Xml(Box::new(estpos::Cc5Request::cancel(
            &auth, order,
        ))))
    }

    fn build_refund_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        tx_type: TransactionType,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = estpos::EstposAuthType::try_from(account)?;
        let amount = match tx_type {
            // A full refund omits the amount; the gateway returns the
            // captured total.
            TransactionType::Refund => None,
            _ => Some(self.format_amount(order.amount, order.currency)?),
        };
        Ok(RequestContent::Xml(Box::new(estpos::Cc5Request::refund(
            &auth,
            order,
            amount,
            self.map_currency(order.currency)?,
        ))))
    }

    fn build_status_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        _params: &GatewayParams,
        _env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let auth = estpos::EstposAuthType::try_from(account)?;
        Ok(RequestContent::Xml(Box::new(estpos::Cc5Request::status(
            &auth, order,
        ))))
    }

    fn parse_payment_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: estpos::Cc5Response = body.parse_xml("Cc5Response")?;
        Ok(response.into_result(TransactionStatus::Charged))
    }

    fn parse_3d_callback(
        &self,
        account: &GatewayAccount,
        model: PaymentModel,
        params: &CallbackParams,
    ) -> CustomResult<TransactionResult, PosError> {
        let verified = self.crypt.check_3d_hash(account, params)?;
        if !verified {
            tracing::warn!(gateway = self.id(), "3-D callback failed hash verification");
        }
        Ok(estpos::callback_to_result(verified, model, params))
    }

    fn parse_postauth_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: estpos::Cc5Response = body.parse_xml("Cc5Response")?;
        Ok(response.into_result(TransactionStatus::Charged))
    }

    fn parse_cancel_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: estpos::Cc5Response = body.parse_xml("Cc5Response")?;
        Ok(response.into_result(TransactionStatus::Voided))
    }

    fn parse_refund_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: estpos::Cc5Response = body.parse_xml("Cc5Response")?;
        Ok(response.into_result(TransactionStatus::Refunded))
    }

    fn parse_status_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let response: estpos::Cc5Response = body.parse_xml("Cc5Response")?;
        Ok(response.into_status_result())
    }
}
