//! Static endpoint configuration.
//!
//! A per-gateway table of base URLs, selected by gateway identifier and
//! environment. Loaded once at application configuration time and passed to
//! the orchestrator; nothing in here is consulted by the pure mapping layer.

use serde::Deserialize;
use url::Url;

use crate::{
    enums::GatewayKind,
    errors::{CustomResult, PosError},
};

/// Endpoints of one gateway.
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayParams {
    /// Server-to-server payment / provisioning API
    pub payment_api: Url,
    /// The 3-D redirect gateway the browser form posts to
    pub gateway_3d: Url,
    /// Hosted-page variant of the redirect gateway, where offered
    pub gateway_3d_host: Option<Url>,
    /// Separate query/history API, where the bank runs one
    pub query_api: Option<Url>,
    /// Whether these endpoints belong to the bank's test environment; some
    /// wire formats carry the flag inside the payload
    #[serde(default)]
    pub test_mode: bool,
}

impl GatewayParams {
    #[allow(clippy::expect_used)]
    fn new(payment_api: &str, gateway_3d: &str) -> Self {
        Self {
            payment_api: Url::parse(payment_api).expect("static gateway URL"),
            gateway_3d: Url::parse(gateway_3d).expect("static gateway URL"),
            gateway_3d_host: None,
            query_api: None,
            test_mode: false,
        }
    }

    fn with_test_mode(mut self) -> Self {
        self.test_mode = true;
        self
    }

    #[allow(clippy::expect_used)]
    fn with_host_gateway(mut self, gateway_3d_host: &str) -> Self {
        self.gateway_3d_host = Some(Url::parse(gateway_3d_host).expect("static gateway URL"));
        self
    }

    #[allow(clippy::expect_used)]
    fn with_query_api(mut self, query_api: &str) -> Self {
        self.query_api = Some(Url::parse(query_api).expect("static gateway URL"));
        self
    }
}

/// The full endpoint table, one entry per gateway family.
#[derive(Clone, Debug, Deserialize)]
pub struct Gateways {
    pub estpos: GatewayParams,
    pub garanti: GatewayParams,
    pub posnet: GatewayParams,
    pub kuveyt: GatewayParams,
    pub akbank: GatewayParams,
}

impl Gateways {
    /// The banks' test environments.
    pub fn sandbox() -> Self {
        Self {
            estpos: GatewayParams::new(
                "https://entegrasyon.asseco-see.com.tr/fim/api",
                "https://entegrasyon.asseco-see.com.tr/fim/est3Dgate",
            )
            .with_test_mode(),
            garanti: GatewayParams::new(
                "https://sanalposprovtest.garantibbva.com.tr/VPServlet",
                "https://sanalposprovtest.garantibbva.com.tr/servlet/gt3dengine",
            )
            .with_test_mode(),
            posnet: GatewayParams::new(
                "https://setmpos.ykb.com/PosnetWebService/XML",
                "https://setmpos.ykb.com/3DSWebService/YKBPaymentService",
            )
            .with_test_mode(),
            kuveyt: GatewayParams::new(
                "https://boatest.kuveytturk.com.tr/boa.virtualpos.services/Home/ThreeDModelProvisionGate",
                "https://boatest.kuveytturk.com.tr/boa.virtualpos.services/Home/ThreeDModelPayGate",
            )
            .with_query_api(
                "https://boatest.kuveytturk.com.tr/BOA.Integration.WCFService/BOA.Integration.VirtualPos/VirtualPosService.svc",
            )
            .with_test_mode(),
            akbank: GatewayParams::new(
                "https://apipre.akbank.com/api/v1/payment/virtualpos/transaction/process",
                "https://virtualpospaymentgatewaypre.akbank.com/securepay",
            )
            .with_host_gateway("https://virtualpospaymentgatewaypre.akbank.com/payhosting")
            .with_test_mode(),
        }
    }

    /// The banks' production environments.
    pub fn production() -> Self {
        Self {
            estpos: GatewayParams::new(
                "https://www.sanalakpos.com/fim/api",
                "https://www.sanalakpos.com/fim/est3Dgate",
            ),
            garanti: GatewayParams::new(
                "https://sanalposprov.garanti.com.tr/VPServlet",
                "https://sanalposprov.garanti.com.tr/servlet/gt3dengine",
            ),
            posnet: GatewayParams::new(
                "https://posnet.yapikredi.com.tr/PosnetWebService/XML",
                "https://posnet.yapikredi.com.tr/3DSWebService/YKBPaymentService",
            ),
            kuveyt: GatewayParams::new(
                "https://sanalpos.kuveytturk.com.tr/ServiceGateWay/Home/ThreeDModelProvisionGate",
                "https://sanalpos.kuveytturk.com.tr/ServiceGateWay/Home/ThreeDModelPayGate",
            )
            .with_query_api(
                "https://boa.kuveytturk.com.tr/BOA.Integration.WCFService/BOA.Integration.VirtualPos/VirtualPosService.svc",
            ),
            akbank: GatewayParams::new(
                "https://api.akbank.com/api/v1/payment/virtualpos/transaction/process",
                "https://virtualpospaymentgateway.akbank.com/securepay",
            )
            .with_host_gateway("https://virtualpospaymentgateway.akbank.com/payhosting"),
        }
    }

    /// The endpoint entry serving `kind`. The two EST hash versions share
    /// one terminal infrastructure.
    pub fn params(&self, kind: GatewayKind) -> CustomResult<&GatewayParams, PosError> {
        match kind {
            GatewayKind::Estpos | GatewayKind::EstposV3 => Ok(&self.estpos),
            GatewayKind::Garanti => Ok(&self.garanti),
            GatewayKind::Posnet => Ok(&self.posnet),
            GatewayKind::Kuveyt => Ok(&self.kuveyt),
            GatewayKind::Akbank => Ok(&self.akbank),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_resolves_to_an_endpoint_entry() {
        use strum::IntoEnumIterator;

        let gateways = Gateways::sandbox();
        for kind in GatewayKind::iter() {
            assert!(gateways.params(kind).is_ok());
        }
    }

    #[test]
    fn table_deserializes_from_config() {
        let gateways: Gateways = serde_json::from_value(serde_json::json!({
            "estpos": {
                "payment_api": "https://entegrasyon.asseco-see.com.tr/fim/api",
                "gateway_3d": "https://entegrasyon.asseco-see.com.tr/fim/est3Dgate"
            },
            "garanti": {
                "payment_api": "https://sanalposprovtest.garantibbva.com.tr/VPServlet",
                "gateway_3d": "https://sanalposprovtest.garantibbva.com.tr/servlet/gt3dengine"
            },
            "posnet": {
                "payment_api": "https://setmpos.ykb.com/PosnetWebService/XML",
                "gateway_3d": "https://setmpos.ykb.com/3DSWebService/YKBPaymentService"
            },
            "kuveyt": {
                "payment_api": "https://boatest.kuveytturk.com.tr/boa.virtualpos.services/Home/ThreeDModelProvisionGate",
                "gateway_3d": "https://boatest.kuveytturk.com.tr/boa.virtualpos.services/Home/ThreeDModelPayGate"
            },
            "akbank": {
                "payment_api": "https://apipre.akbank.com/api/v1/payment/virtualpos/transaction/process",
                "gateway_3d": "https://virtualpospaymentgatewaypre.akbank.com/securepay"
            }
        }))
        .expect("endpoint table deserializes");

        assert!(gateways.akbank.gateway_3d_host.is_none());
    }
}
