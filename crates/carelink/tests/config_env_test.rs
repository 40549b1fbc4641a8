//! Integration tests for environment-based configuration

#![cfg(feature = "env")]

use std::time::Duration;

use carelink::{Client, ClientConfig, ErrorKind, TransportKind};
use secrecy::ExposeSecret;

const VARS: [&str; 7] = [
    "CARELINK_API_KEY_ID",
    "CARELINK_API_KEY_SECRET",
    "CARELINK_USER_TOKEN",
    "CARELINK_LIVE_MODE",
    "CARELINK_BASE_URL",
    "CARELINK_TIMEOUT",
    "CARELINK_TRANSPORT",
];

/// Run `f` with exactly `set` defined among the Carelink variables.
fn with_env<R>(set: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let vars: Vec<(&str, Option<&str>)> = VARS
        .iter()
        .map(|name| {
            let value = set.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
            (*name, value)
        })
        .collect();
    temp_env::with_vars(vars, f)
}

#[test]
fn test_from_env_api_key() {
    let config = with_env(
        &[
            ("CARELINK_API_KEY_ID", "key_env"),
            ("CARELINK_API_KEY_SECRET", "sk_env"),
            ("CARELINK_BASE_URL", "https://sandbox.carelink.health"),
            ("CARELINK_TIMEOUT", "15"),
            ("CARELINK_TRANSPORT", "socket"),
        ],
        ClientConfig::from_env,
    )
    .unwrap();

    let (id, secret) = config.authentication.as_api_key().unwrap();
    assert_eq!(id, "key_env");
    assert_eq!(secret.expose_secret(), "sk_env");
    assert_eq!(config.base_url.as_deref(), Some("https://sandbox.carelink.health"));
    assert_eq!(config.timeout, Duration::from_secs(15));
    assert_eq!(config.transport, TransportKind::Socket);
}

#[test]
fn test_from_env_user_session() {
    let config = with_env(
        &[
            ("CARELINK_USER_TOKEN", "sess_env"),
            ("CARELINK_LIVE_MODE", "true"),
        ],
        ClientConfig::from_env,
    )
    .unwrap();

    assert_eq!(config.authentication.name(), "user_session");
    let headers = config.authentication.create_headers().unwrap();
    assert_eq!(headers["authorization"], "Bearer sess_env");
    assert_eq!(headers[carelink::auth::LIVE_MODE_HEADER], "true");
}

#[test]
fn test_from_env_defaults() {
    let config = with_env(&[], ClientConfig::from_env).unwrap();

    assert_eq!(config.authentication.name(), "anonymous");
    assert_eq!(config.base_url, None);
    assert_eq!(config.timeout, carelink::DEFAULT_TIMEOUT);
    assert_eq!(config.transport, TransportKind::Fetch);
}

#[test]
fn test_from_env_rejects_bad_values() {
    let cases: [&[(&str, &str)]; 4] = [
        &[("CARELINK_API_KEY_ID", "key_only")],
        &[("CARELINK_TIMEOUT", "soon")],
        &[("CARELINK_TRANSPORT", "pigeon")],
        &[("CARELINK_USER_TOKEN", "s"), ("CARELINK_LIVE_MODE", "maybe")],
    ];

    for set in cases {
        let error = with_env(set, ClientConfig::from_env).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration, "{set:?}");
    }
}

#[test]
fn test_client_from_env() {
    let client = with_env(
        &[
            ("CARELINK_API_KEY_ID", "key_env"),
            ("CARELINK_API_KEY_SECRET", "sk_env"),
            ("CARELINK_TRANSPORT", "socket"),
        ],
        Client::from_env,
    )
    .unwrap();

    assert_eq!(client.pipeline().transport().name(), "socket");
    assert_eq!(
        client.pipeline().base_url().as_str(),
        "https://api.carelink.health/"
    );
}
