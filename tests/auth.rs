// ABOUTME: Tests for the authentication method chain.
// ABOUTME: Verifies key order, lazy signing and the password fallback.

mod support;

use scpu::auth::{AuthMethod, auth_methods, authenticate};
use scpu::ssh::Error;
use std::sync::Arc;
use support::{AgentCall, MockAgent, MockTransport, Offer};

#[test]
fn methods_are_public_key_then_password() {
    let methods = auth_methods(Arc::new(MockAgent::with_keys(1)), "glenda", "cpu");
    let names: Vec<_> = methods.iter().map(AuthMethod::name).collect();
    assert_eq!(names, ["publickey", "password"]);
}

#[test]
fn password_method_carries_service_descriptor() {
    let methods = auth_methods(Arc::new(MockAgent::with_keys(0)), "glenda", "cpu");
    let AuthMethod::Password(password) = &methods[1] else {
        panic!("second method should be password");
    };
    assert_eq!(password.descriptor().server, "cpu");
    assert_eq!(password.descriptor().user, "glenda");
}

#[tokio::test]
async fn every_key_is_signed_in_order_before_password() {
    support::init_tracing();
    let agent = MockAgent::with_keys(3).with_password("hunter2");
    let calls = agent.calls();
    let methods = auth_methods(Arc::new(agent), "glenda", "cpu");
    let mut transport = MockTransport {
        challenge_keys: true,
        accept_password: Some("hunter2".to_string()),
        ..Default::default()
    };

    let method = authenticate(&mut transport, "glenda", &methods).await.unwrap();

    assert_eq!(method, "password");
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            AgentCall::List,
            AgentCall::Sign(0),
            AgentCall::Sign(1),
            AgentCall::Sign(2),
            AgentCall::Password(
                "proto=pass service=ssh role=client server=cpu user=glenda".to_string()
            ),
        ]
    );
    assert_eq!(
        transport.offers,
        vec![
            Offer::PublicKey(0),
            Offer::PublicKey(1),
            Offer::PublicKey(2),
            Offer::Password("hunter2".to_string()),
        ]
    );
}

#[tokio::test]
async fn accepted_key_stops_the_chain() {
    let agent = MockAgent::with_keys(3).with_password("hunter2");
    let calls = agent.calls();
    let methods = auth_methods(Arc::new(agent), "glenda", "cpu");
    let mut transport = MockTransport {
        challenge_keys: true,
        accept_key: Some(1),
        ..Default::default()
    };

    let method = authenticate(&mut transport, "glenda", &methods).await.unwrap();

    assert_eq!(method, "publickey");
    assert_eq!(
        *calls.lock().unwrap(),
        vec![AgentCall::List, AgentCall::Sign(0), AgentCall::Sign(1)]
    );
}

#[tokio::test]
async fn unavailable_agent_still_tries_password() {
    let agent = MockAgent::unavailable().with_password("hunter2");
    let calls = agent.calls();
    let methods = auth_methods(Arc::new(agent), "glenda", "cpu");
    let mut transport = MockTransport {
        accept_password: Some("hunter2".to_string()),
        ..Default::default()
    };

    let method = authenticate(&mut transport, "glenda", &methods).await.unwrap();

    assert_eq!(method, "password");
    assert!(matches!(calls.lock().unwrap()[1], AgentCall::Password(_)));
    assert_eq!(transport.offers, vec![Offer::Password("hunter2".to_string())]);
}

#[tokio::test]
async fn signing_waits_for_a_challenge() {
    let agent = MockAgent::with_keys(2);
    let calls = agent.calls();
    let methods = auth_methods(Arc::new(agent), "glenda", "cpu");
    // Keys are offered but never challenged.
    let mut transport = MockTransport::default();

    let result = authenticate(&mut transport, "glenda", &methods).await;

    assert!(matches!(result, Err(Error::AuthenticationFailed)));
    assert!(
        !calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, AgentCall::Sign(_))),
        "no signature without a challenge"
    );
    assert_eq!(
        &transport.offers[..2],
        &[Offer::PublicKey(0), Offer::PublicKey(1)]
    );
}

#[tokio::test]
async fn missing_password_exhausts_methods() {
    let methods = auth_methods(Arc::new(MockAgent::unavailable()), "glenda", "cpu");
    let mut transport = MockTransport::default();

    let result = authenticate(&mut transport, "glenda", &methods).await;

    assert!(matches!(result, Err(Error::AuthenticationFailed)));
    assert!(transport.offers.is_empty(), "nothing to offer");
}
