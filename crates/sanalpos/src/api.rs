//! The uniform operation surface every gateway adapter implements.
//!
//! One `{signer, request formatter, response normalizer}` triple per gateway,
//! selected through the registry in [`crate::gateway`]. Shared mapping logic
//! (amount formatting, installment mapping) lives in free functions and the
//! [`crate::types::AmountConvertor`] implementations rather than base-class
//! style dispatch.

use crate::{
    configs::GatewayParams,
    domain::{
        CallbackParams, Card, FormFields, FormFieldsHook, GatewayAccount, HistoryQuery, Order,
        RequestEnv, ThreeDFormData, TransactionResult,
    },
    enums::{Currency, GatewayKind, Operation, PaymentModel, TransactionType},
    errors::{CustomResult, PosError},
    request::{Method, RequestContent},
    types::{Installment, MinorUnit},
};

/// Message-integrity strategy of one gateway family.
///
/// All three methods are deterministic pure functions. `check_3d_hash`
/// distinguishes the two failure classes: tampered or incomplete response
/// data yields `Ok(false)`, while an account of the wrong gateway family is
/// a programmer error and yields `Err(FailedToObtainAuthType)`.
pub trait GatewayCrypt: Send + Sync {
    /// Integrity hash of a server-to-server request. `data` is the complete
    /// candidate field set in wire-string form; the strategy selects and
    /// orders the fields itself, treating absent ones as empty strings.
    fn create_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError>;

    /// Integrity hash of the 3-D redirect form fields.
    fn create_3d_hash(
        &self,
        account: &GatewayAccount,
        data: &FormFields,
    ) -> CustomResult<String, PosError>;

    /// Verify the bank's hash over a 3-D callback. Fail-closed: any missing
    /// or altered hash-relevant field must yield `Ok(false)`.
    fn check_3d_hash(
        &self,
        account: &GatewayAccount,
        params: &CallbackParams,
    ) -> CustomResult<bool, PosError>;
}

/// One gateway adapter: request formatter and response normalizer on top of
/// a [`GatewayCrypt`].
///
/// Every method is a pure transformation of its inputs. Operations a family
/// does not offer keep the default body, which raises
/// [`PosError::FlowNotSupported`] so callers can feature-detect per gateway.
pub trait PosConnector: Send + Sync {
    /// Registry identifier, e.g. `"garanti"`.
    fn id(&self) -> &'static str;

    /// The gateway kind this adapter serves.
    fn kind(&self) -> GatewayKind;

    /// The signing strategy of this family.
    fn crypt(&self) -> &'static dyn GatewayCrypt;

    /// Gateway rendering of a currency.
    fn map_currency(&self, currency: Currency) -> CustomResult<String, PosError>;

    /// Gateway rendering of an installment count.
    fn map_installment(&self, installment: Installment) -> String;

    /// Gateway rendering of a transaction type; unmapped types are an
    /// Unsupported-value error, raised before any hashing.
    fn map_tx_type(&self, tx_type: TransactionType) -> CustomResult<String, PosError>;

    /// Gateway rendering of an amount.
    fn format_amount(&self, amount: MinorUnit, currency: Currency)
        -> CustomResult<String, PosError>;

    /// Endpoint serving `operation`.
    fn endpoint(
        &self,
        params: &GatewayParams,
        operation: Operation,
    ) -> CustomResult<String, PosError> {
        let _ = operation;
        Ok(params.payment_api.to_string())
    }

    /// HTTP method of the server-to-server API.
    fn http_method(&self) -> Method {
        Method::Post
    }

    /// Headers of a server-to-server call. The default carries the content
    /// type; families that sign the serialized body add their MAC header
    /// here.
    fn headers(
        &self,
        account: &GatewayAccount,
        content: &RequestContent,
    ) -> CustomResult<crate::request::Headers, PosError> {
        let _ = account;
        Ok(vec![(
            crate::consts::headers::CONTENT_TYPE.to_string(),
            content.content_type().to_string().into(),
        )])
    }

    // Request formatters

    /// Direct server-to-server authorization (or pre-authorization) with the
    /// card present.
    fn build_payment_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        card: &Card,
        tx_type: TransactionType,
        params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError>;

    /// The browser-redirect payload. `bank_data` carries tokens returned by
    /// a preceding enrollment call for the families that require one; `hook`
    /// runs on the field set immediately before hash computation.
    fn build_3d_form_data(
        &self,
        account: &GatewayAccount,
        order: &Order,
        model: PaymentModel,
        tx_type: TransactionType,
        card: Option<&Card>,
        params: &GatewayParams,
        bank_data: Option<&CallbackParams>,
        env: &RequestEnv,
        hook: Option<FormFieldsHook<'_>>,
    ) -> CustomResult<ThreeDFormData, PosError>;

    /// Server-side 3-D enrollment check, for the families whose redirect
    /// tokens come from a prior API call.
    fn build_3d_enrollment_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        card: &Card,
        tx_type: TransactionType,
        params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let _ = (account, order, card, tx_type, params, env);
        Err(PosError::flow_not_supported("3D enrollment", self.id()).into())
    }

    /// The finalizing server-to-server leg of the 3-D Secure model, carrying
    /// the bank-returned authentication proof instead of the raw card.
    fn build_3d_payment_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        tx_type: TransactionType,
        callback: &CallbackParams,
        params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let _ = (account, order, tx_type, callback, params, env);
        Err(PosError::flow_not_supported("3D payment", self.id()).into())
    }

    /// Capture of a prior pre-authorization.
    fn build_postauth_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let _ = (account, order, params, env);
        Err(PosError::flow_not_supported("post auth", self.id()).into())
    }

    /// Same-day cancellation of a prior transaction.
    fn build_cancel_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError>;

    /// Full or partial refund of a prior transaction.
    fn build_refund_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        tx_type: TransactionType,
        params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError>;

    /// Single-order status query.
    fn build_status_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let _ = (account, order, params, env);
        Err(PosError::flow_not_supported("status", self.id()).into())
    }

    /// Transaction list of a single order.
    fn build_order_history_request(
        &self,
        account: &GatewayAccount,
        order: &Order,
        params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let _ = (account, order, params, env);
        Err(PosError::flow_not_supported("order history", self.id()).into())
    }

    /// Gateway-wide history over a date range.
    fn build_history_request(
        &self,
        account: &GatewayAccount,
        query: &HistoryQuery,
        params: &GatewayParams,
        env: &RequestEnv,
    ) -> CustomResult<RequestContent, PosError> {
        let _ = (account, query, params, env);
        Err(PosError::flow_not_supported("history", self.id()).into())
    }

    // Response normalizers

    /// Normalize a payment (or 3-D finalize leg) response.
    fn parse_payment_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError>;

    /// Normalize the enrollment response into the token map consumed by
    /// [`Self::build_3d_form_data`].
    fn parse_enrollment_response(&self, body: &[u8]) -> CustomResult<CallbackParams, PosError> {
        let _ = body;
        Err(PosError::flow_not_supported("3D enrollment", self.id()).into())
    }

    /// Verify and normalize the bank's redirect callback. Always verifies the
    /// hash before trusting any 3-D-sourced field; integrity failure maps to
    /// `TransactionStatus::AuthenticationFailed`, never to an approval. Under
    /// the 3-D Secure model a verified callback normalizes to
    /// `AuthenticationPending` (the finalize leg is still owed); under 3-D
    /// Pay and 3-D Host the callback itself settles the payment.
    fn parse_3d_callback(
        &self,
        account: &GatewayAccount,
        model: PaymentModel,
        params: &CallbackParams,
    ) -> CustomResult<TransactionResult, PosError>;

    /// Normalize a capture response.
    fn parse_postauth_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let _ = body;
        Err(PosError::flow_not_supported("post auth", self.id()).into())
    }

    /// Normalize a cancel response.
    fn parse_cancel_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError>;

    /// Normalize a refund response.
    fn parse_refund_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError>;

    /// Normalize a status response.
    fn parse_status_response(&self, body: &[u8]) -> CustomResult<TransactionResult, PosError> {
        let _ = body;
        Err(PosError::flow_not_supported("status", self.id()).into())
    }

    /// Normalize an order-history response.
    fn parse_order_history_response(
        &self,
        body: &[u8],
    ) -> CustomResult<Vec<TransactionResult>, PosError> {
        let _ = body;
        Err(PosError::flow_not_supported("order history", self.id()).into())
    }

    /// Normalize a date-range history response.
    fn parse_history_response(
        &self,
        body: &[u8],
    ) -> CustomResult<Vec<TransactionResult>, PosError> {
        let _ = body;
        Err(PosError::flow_not_supported("history", self.id()).into())
    }
}
