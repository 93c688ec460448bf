//! Transaction orchestration: the payment-model state machine on top of the
//! per-gateway adapters.
//!
//! The orchestrator sequences request formatter, transport and response
//! normalizer. It holds no per-transaction state: across the browser
//! redirect, all re-entrant state travels inside the bank's own callback
//! payload, so the callback may be served by a different process than the
//! one that built the redirect.

use crate::{
    api::PosConnector,
    configs::{GatewayParams, Gateways},
    connectors::{Akbank, Estpos, Garanti, Kuveyt, Posnet},
    domain::{
        CallbackParams, Card, FormFieldsHook, GatewayAccount, HistoryQuery, Order, RequestEnv,
        ThreeDFormData, TransactionResult,
    },
    enums::{GatewayKind, Operation, PaymentModel, TransactionStatus, TransactionType},
    errors::{CustomResult, PosError},
    request::{Request, RequestBuilder, RequestContent},
};

/// Adapter registry: gateway identifier to its statically allocated adapter.
pub fn connector_for(kind: GatewayKind) -> &'static dyn PosConnector {
    match kind {
        GatewayKind::Estpos => Estpos::new(),
        GatewayKind::EstposV3 => Estpos::new_v3(),
        GatewayKind::Garanti => Garanti::new(),
        GatewayKind::Posnet => Posnet::new(),
        GatewayKind::Kuveyt => Kuveyt::new(),
        GatewayKind::Akbank => Akbank::new(),
    }
}

/// Transport collaborator the caller implements around the core. Given a
/// fully described request it performs the HTTP call and returns the raw
/// response body; upstream failures are propagated unmodified as
/// [`PosError::ProcessingStepFailed`].
pub trait Transport {
    /// Execute `request` and hand back the raw response body.
    fn send(&self, request: Request) -> CustomResult<bytes::Bytes, PosError>;
}

/// One gateway terminal, ready to process transactions.
pub struct PosGateway {
    account: GatewayAccount,
    params: GatewayParams,
    connector: &'static dyn PosConnector,
}

impl PosGateway {
    /// Resolve the adapter and endpoint entry for `account`'s gateway.
    pub fn new(account: GatewayAccount, gateways: &Gateways) -> CustomResult<Self, PosError> {
        let params = gateways.params(account.gateway)?.clone();
        Ok(Self {
            connector: connector_for(account.gateway),
            account,
            params,
        })
    }

    /// The adapter in use, for feature detection and direct access to the
    /// pure mapping functions.
    pub fn connector(&self) -> &'static dyn PosConnector {
        self.connector
    }

    /// The account this gateway was constructed with.
    pub fn account(&self) -> &GatewayAccount {
        &self.account
    }

    fn execute(
        &self,
        transport: &dyn Transport,
        operation: Operation,
        content: RequestContent,
    ) -> CustomResult<bytes::Bytes, PosError> {
        let url = self.connector.endpoint(&self.params, operation)?;
        tracing::debug!(gateway = self.connector.id(), ?operation, %url, "dispatching gateway call");
        let headers = self.connector.headers(&self.account, &content)?;
        let request = RequestBuilder::new()
            .method(self.connector.http_method())
            .url(&url)
            .headers(headers)
            .set_body(content)
            .build();
        transport.send(request)
    }

    /// Non-secure payment: a single server-to-server authorization (`Auth`)
    /// or pre-authorization (`PreAuth`) with the card present.
    pub fn payment(
        &self,
        transport: &dyn Transport,
        order: &Order,
        card: &Card,
        tx_type: TransactionType,
    ) -> CustomResult<TransactionResult, PosError> {
        if !matches!(tx_type, TransactionType::Auth | TransactionType::PreAuth) {
            return Err(PosError::NotSupported {
                message: format!("transaction type {tx_type} for payment"),
                gateway: self.connector.id(),
            }
            .into());
        }
        let env = RequestEnv::generate();
        let content = self
            .connector
            .build_payment_request(&self.account, order, card, tx_type, &self.params, &env)?;
        let body = self.execute(transport, Operation::Payment, content)?;
        self.connector.parse_payment_response(&body)
    }

    /// Capture a prior pre-authorization.
    pub fn capture(
        &self,
        transport: &dyn Transport,
        order: &Order,
    ) -> CustomResult<TransactionResult, PosError> {
        let env = RequestEnv::generate();
        let content = self
            .connector
            .build_postauth_request(&self.account, order, &self.params, &env)?;
        let body = self.execute(transport, Operation::PostAuth, content)?;
        self.connector.parse_postauth_response(&body)
    }

    /// Same-day cancellation of a prior transaction.
    pub fn cancel(
        &self,
        transport: &dyn Transport,
        order: &Order,
    ) -> CustomResult<TransactionResult, PosError> {
        let env = RequestEnv::generate();
        let content = self
            .connector
            .build_cancel_request(&self.account, order, &self.params, &env)?;
        let body = self.execute(transport, Operation::Cancel, content)?;
        self.connector.parse_cancel_response(&body)
    }

    /// Refund a prior transaction; `order.amount` is the amount to return
    /// and `tx_type` selects between `Refund` and `RefundPartial`.
    pub fn refund(
        &self,
        transport: &dyn Transport,
        order: &Order,
        tx_type: TransactionType,
    ) -> CustomResult<TransactionResult, PosError> {
        if !matches!(
            tx_type,
            TransactionType::Refund | TransactionType::RefundPartial
        ) {
            return Err(PosError::NotSupported {
                message: format!("transaction type {tx_type} for refund"),
                gateway: self.connector.id(),
            }
            .into());
        }
        let env = RequestEnv::generate();
        let content = self
            .connector
            .build_refund_request(&self.account, order, tx_type, &self.params, &env)?;
        let body = self.execute(transport, Operation::Refund, content)?;
        self.connector.parse_refund_response(&body)
    }

    /// Single-order status query.
    pub fn status(
        &self,
        transport: &dyn Transport,
        order: &Order,
    ) -> CustomResult<TransactionResult, PosError> {
        let env = RequestEnv::generate();
        let content = self
            .connector
            .build_status_request(&self.account, order, &self.params, &env)?;
        let body = self.execute(transport, Operation::Status, content)?;
        self.connector.parse_status_response(&body)
    }

    /// Transaction list of one order.
    pub fn order_history(
        &self,
        transport: &dyn Transport,
        order: &Order,
    ) -> CustomResult<Vec<TransactionResult>, PosError> {
        let env = RequestEnv::generate();
        let content = self
            .connector
            .build_order_history_request(&self.account, order, &self.params, &env)?;
        let body = self.execute(transport, Operation::OrderHistory, content)?;
        self.connector.parse_order_history_response(&body)
    }

    /// Gateway-wide history over a date range.
    pub fn history(
        &self,
        transport: &dyn Transport,
        query: &HistoryQuery,
    ) -> CustomResult<Vec<TransactionResult>, PosError> {
        let env = RequestEnv::generate();
        let content = self
            .connector
            .build_history_request(&self.account, query, &self.params, &env)?;
        let body = self.execute(transport, Operation::History, content)?;
        self.connector.parse_history_response(&body)
    }

    /// Server-side 3-D enrollment check, for families whose redirect tokens
    /// come from a prior API call (Posnet oos, Kuveyt). Returns the token
    /// map to feed into [`Self::three_d_form`].
    pub fn three_d_enrollment(
        &self,
        transport: &dyn Transport,
        order: &Order,
        card: &Card,
        tx_type: TransactionType,
    ) -> CustomResult<CallbackParams, PosError> {
        let env = RequestEnv::generate();
        let content = self
            .connector
            .build_3d_enrollment_request(&self.account, order, card, tx_type, &self.params, &env)?;
        let body = self.execute(transport, Operation::ThreeDEnrollment, content)?;
        self.connector.parse_enrollment_response(&body)
    }

    /// Build the redirect payload (`REDIRECT_BUILT`). After handing this to
    /// the caller the orchestrator holds no further state; the flow resumes
    /// from the bank's callback alone.
    pub fn three_d_form(
        &self,
        order: &Order,
        model: PaymentModel,
        tx_type: TransactionType,
        card: Option<&Card>,
        bank_data: Option<&CallbackParams>,
        hook: Option<FormFieldsHook<'_>>,
    ) -> CustomResult<ThreeDFormData, PosError> {
        if model == PaymentModel::NonSecure {
            return Err(PosError::NotSupported {
                message: "a redirect form for the non-secure model".to_string(),
                gateway: self.connector.id(),
            }
            .into());
        }
        let env = RequestEnv::generate();
        self.connector.build_3d_form_data(
            &self.account,
            order,
            model,
            tx_type,
            card,
            &self.params,
            bank_data,
            &env,
            hook,
        )
    }

    /// Resume the flow from the bank's callback (`CALLBACK_RECEIVED`).
    ///
    /// The callback hash is verified first; on integrity failure the result
    /// is terminal `AuthenticationFailed` and no further call is made. The
    /// fork is selected from the payment model supplied by the caller: the
    /// 3-D Secure model owes one more server-to-server leg carrying the
    /// bank's authentication proof, while 3-D Pay and 3-D Host treat the
    /// verified callback as the settlement.
    pub fn complete_three_d(
        &self,
        transport: &dyn Transport,
        order: &Order,
        model: PaymentModel,
        tx_type: TransactionType,
        params: &CallbackParams,
    ) -> CustomResult<TransactionResult, PosError> {
        if model == PaymentModel::NonSecure {
            return Err(PosError::NotSupported {
                message: "completing a redirect for the non-secure model".to_string(),
                gateway: self.connector.id(),
            }
            .into());
        }
        let callback = self
            .connector
            .parse_3d_callback(&self.account, model, params)?;

        match model {
            PaymentModel::ThreeDSecure
                if callback.status == TransactionStatus::AuthenticationPending =>
            {
                let env = RequestEnv::generate();
                let content = self.connector.build_3d_payment_request(
                    &self.account,
                    order,
                    tx_type,
                    params,
                    &self.params,
                    &env,
                )?;
                let body = self.execute(transport, Operation::ThreeDPayment, content)?;
                self.connector.parse_payment_response(&body)
            }
            _ => Ok(callback),
        }
    }
}

impl std::fmt::Debug for PosGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosGateway")
            .field("gateway", &self.connector.id())
            .field("client_id", &self.account.client_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn registry_resolves_every_kind() {
        use strum::IntoEnumIterator;

        for kind in GatewayKind::iter() {
            assert_eq!(connector_for(kind).kind(), kind);
        }
    }

    /// Fails the test if the orchestrator reaches for the network.
    struct NoTransport;

    impl Transport for NoTransport {
        fn send(&self, _request: Request) -> CustomResult<bytes::Bytes, PosError> {
            Err(PosError::ProcessingStepFailed(None).into())
        }
    }

    #[test]
    fn completing_a_non_secure_model_is_rejected() {
        let account = GatewayAccount::new(GatewayKind::Garanti, "7000679");
        let gateway = PosGateway::new(account, &Gateways::sandbox()).unwrap();
        let order = Order::new(
            "order-1",
            crate::types::MinorUnit::new(100),
            crate::enums::Currency::TRY,
        );

        let error = gateway
            .complete_three_d(
                &NoTransport,
                &order,
                PaymentModel::NonSecure,
                TransactionType::Auth,
                &CallbackParams::new(),
            )
            .unwrap_err();

        assert!(matches!(
            error.current_context(),
            PosError::NotSupported { .. }
        ));
    }

    fn est_v3_account() -> GatewayAccount {
        use masking::Secret;

        GatewayAccount::new(GatewayKind::EstposV3, "700655000200")
            .with_credentials("ISBANKAPI", Secret::new("ISBANK07".to_string()))
            .with_store_key(Secret::new("TRPS0200".to_string()))
    }

    fn est_v3_pay_callback() -> CallbackParams {
        let fields = [
            ("clientid", "700655000200"),
            ("storetype", "3d_pay"),
            ("amount", "100.25"),
            ("oid", "order222"),
            ("okUrl", "https://domain.com/success"),
            ("failUrl", "https://domain.com/fail_url"),
            ("rnd", "12345"),
            ("lang", "tr"),
            ("currency", "949"),
            ("taksit", ""),
            ("islemtipi", "Auth"),
            ("mdStatus", "1"),
            ("ProcReturnCode", "00"),
            ("AuthCode", "P58154"),
            ("HostRefNum", "230508236560"),
            (
                "HASH",
                "mcuch8MsDo3x2ddPeP7bZ5TJmAjktX3j+wI+1Vf/HgiTt5SsH6KeAcvxSe34tKbh8cRvmL6+FhgU82NQ2gGFnQ==",
            ),
        ];
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn verified_three_d_pay_callback_settles_without_a_finalize_call() {
        let gateway = PosGateway::new(est_v3_account(), &Gateways::sandbox()).unwrap();
        let order = Order::new(
            "order222",
            crate::types::MinorUnit::new(10025),
            crate::enums::Currency::TRY,
        );

        let result = gateway
            .complete_three_d(
                &NoTransport,
                &order,
                PaymentModel::ThreeDPay,
                TransactionType::Auth,
                &est_v3_pay_callback(),
            )
            .unwrap();

        assert_eq!(result.status, TransactionStatus::Charged);
        assert!(result.approved());
    }

    #[test]
    fn tampered_callback_moves_to_rejected() {
        let gateway = PosGateway::new(est_v3_account(), &Gateways::sandbox()).unwrap();
        let order = Order::new(
            "order222",
            crate::types::MinorUnit::new(10025),
            crate::enums::Currency::TRY,
        );
        let mut params = est_v3_pay_callback();
        params.insert("amount".to_string(), "1.00".to_string());

        let result = gateway
            .complete_three_d(
                &NoTransport,
                &order,
                PaymentModel::ThreeDPay,
                TransactionType::Auth,
                &params,
            )
            .unwrap();

        assert_eq!(result.status, TransactionStatus::AuthenticationFailed);
        assert!(!result.approved());
    }

    #[test]
    fn three_d_form_is_refused_for_the_non_secure_model() {
        let gateway = PosGateway::new(est_v3_account(), &Gateways::sandbox()).unwrap();
        let order = Order::new(
            "order222",
            crate::types::MinorUnit::new(10025),
            crate::enums::Currency::TRY,
        );

        assert!(gateway
            .three_d_form(
                &order,
                PaymentModel::NonSecure,
                TransactionType::Auth,
                None,
                None,
                None,
            )
            .is_err());
    }
}
