#![allow(clippy::unwrap_used)]

use masking::{ExposeInterface, Mask, Maskable, PeekInterface, Secret, StrongSecret};

#[derive(Clone, Debug, serde::Serialize, PartialEq, Eq)]
struct Composite {
    api_password: Secret<String>,
    terminal_id: String,
}

#[test]
fn debug_output_masks_the_secret() {
    let composite = Composite {
        api_password: Secret::new("ISBANK07".to_string()),
        terminal_id: "30691298".to_string(),
    };

    let got = format!("{composite:?}");

    assert!(!got.contains("ISBANK07"));
    assert!(got.contains("terminal_id: \"30691298\""));
}

#[test]
fn serialization_exposes_the_secret() {
    let composite = Composite {
        api_password: Secret::new("ISBANK07".to_string()),
        terminal_id: "30691298".to_string(),
    };

    let got = serde_json::to_string(&composite).unwrap();

    assert_eq!(
        got,
        "{\"api_password\":\"ISBANK07\",\"terminal_id\":\"30691298\"}"
    );
}

#[test]
fn peek_and_expose() {
    let secret = Secret::<String>::new("TRPS0200".to_string());

    assert_eq!(secret.peek(), "TRPS0200");
    assert_eq!(secret.expose(), "TRPS0200");
}

#[test]
fn strong_secret_compares_in_constant_time_and_masks_debug() {
    let pan: StrongSecret<String> = "4355084355084358".to_string().into();
    let same: StrongSecret<String> = "4355084355084358".to_string().into();
    let other: StrongSecret<String> = "4111111111111111".to_string().into();

    assert_eq!(pan, same);
    assert_ne!(pan, other);
    assert!(!format!("{pan:?}").contains("4355"));
}

#[test]
fn maskable_wraps_header_values() {
    let masked: Maskable<String> = "secret-token".to_string().into_masked();
    let normal: Maskable<String> = "application/json".into();

    assert!(!format!("{masked:?}").contains("secret-token"));
    assert_eq!(normal.into_inner(), "application/json");
    assert_eq!(masked.into_inner(), "secret-token");
}
