#![forbid(unsafe_code)]

//! Protocol adapters for Turkish bank virtual POS gateways.
//!
//! Every bank exposes its own wire protocol, field layout, amount encoding
//! and message-integrity signature scheme. This crate translates one
//! canonical transaction model into each gateway's exact wire format and
//! back, computes and verifies the per-family integrity hashes, and
//! sequences the 3-D Secure redirect flows, behind one uniform interface.
//!
//! The crate itself performs no I/O: every formatter, normalizer and signing
//! call is a deterministic pure function, and all network transport runs
//! through the caller-implemented [`gateway::Transport`] collaborator.

pub mod api;
pub mod configs;
pub mod connectors;
pub mod consts;
pub mod crypto;
pub mod domain;
pub mod enums;
pub mod errors;
pub mod gateway;
pub mod request;
pub mod types;
pub mod utils;

pub use api::{GatewayCrypt, PosConnector};
pub use domain::{
    Card, GatewayAccount, Order, RequestEnv, ThreeDFormData, TransactionResult,
};
pub use enums::{Currency, GatewayKind, PaymentModel, TransactionStatus, TransactionType};
pub use errors::{CustomResult, PosError};
pub use gateway::{connector_for, PosGateway, Transport};
