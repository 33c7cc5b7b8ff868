mod common;

use std::sync::Arc;

use common::{catalog, filter_matches, plain_topics, stub_rf, LoopbackTransport, Published};
use pretty_assertions::assert_eq;
use rc433::device::{CodeDevice, Device};
use rc433::mqtt::{MqttTransport, QoS};
use rc433::state::{DeviceState, MqttState};
use rc433::DeviceRegistry;
use serde_json::json;

fn registry_on(transport: Arc<LoopbackTransport>) -> (DeviceRegistry, Arc<common::StubRadio>) {
    let (rf, radio) = stub_rf();
    let state = MqttState::new(transport, plain_topics());
    let registry = DeviceRegistry::new(
        Box::new(catalog(json!({
            "device1": {"code_on": 12345, "code_off": 23456},
            "device2": {"code_on": 1, "code_off": 2},
        }))),
        Box::new(state),
        rf,
    )
    .unwrap();
    (registry, radio)
}

#[test]
fn the_broker_filter_matcher_handles_wildcards() {
    assert!(filter_matches("rc433/+/state", "rc433/device1/state"));
    assert!(!filter_matches("rc433/+/state", "rc433/a/b/state"));
    assert!(!filter_matches("rc433/+/state", "rc433/device1/set"));
    assert!(filter_matches("rc433/#", "rc433/a/b/state"));
}

#[test]
fn listener_starts_once_seeding_is_done() {
    let transport = LoopbackTransport::new();
    let (_registry, _radio) = registry_on(transport.clone());

    assert_eq!(transport.filters(), vec!["rc433/+/state".to_string()]);
}

#[test]
fn bus_state_is_absorbed_without_transmitting() {
    let transport = LoopbackTransport::new();
    let (registry, radio) = registry_on(transport.clone());
    registry.switch("device1", true).unwrap();
    let sent_before = radio.sent().len();
    transport.clear_published();

    let routed = transport.inject("rc433/device1/state", b"off");

    assert_eq!(routed, 1);
    assert!(!registry.lookup("device1").unwrap().state);
    assert_eq!(radio.sent().len(), sent_before);
    assert!(transport.published().is_empty(), "absorbed state must not be echoed");
}

#[test]
fn payloads_are_case_insensitive() {
    let transport = LoopbackTransport::new();
    let (registry, _radio) = registry_on(transport.clone());

    transport.inject("rc433/device2/state", b" ON ");
    assert!(registry.lookup("device2").unwrap().state);

    transport.inject("rc433/device2/state", b"garbage");
    assert!(!registry.lookup("device2").unwrap().state);
}

#[test]
fn switches_are_mirrored_retained_at_qos0() {
    let transport = LoopbackTransport::new();
    let (registry, _radio) = registry_on(transport.clone());

    registry.switch("device1", true).unwrap();
    registry.switch("device1", false).unwrap();

    assert_eq!(
        transport.published(),
        vec![
            Published {
                topic: "rc433/device1/state".to_string(),
                payload: "on".to_string(),
                retain: true,
                qos: QoS::AtMostOnce,
            },
            Published {
                topic: "rc433/device1/state".to_string(),
                payload: "off".to_string(),
                retain: true,
                qos: QoS::AtMostOnce,
            },
        ]
    );
}

#[test]
fn refused_transmission_publishes_nothing() {
    let transport = LoopbackTransport::new();
    let (registry, radio) = registry_on(transport.clone());

    radio.set_acknowledging(false);
    assert!(!registry.switch("device1", true).unwrap());
    assert!(transport.published().is_empty());
}

#[test]
fn publish_failures_do_not_reach_the_caller() {
    let transport = LoopbackTransport::new();
    let (registry, _radio) = registry_on(transport.clone());

    transport.set_failing(true);
    assert!(registry.switch("device1", true).unwrap());
    assert!(registry.lookup("device1").unwrap().state);
    assert!(transport.published().is_empty());
}

#[test]
fn malformed_messages_do_not_stop_the_listener() {
    let transport = LoopbackTransport::new();
    let (registry, _radio) = registry_on(transport.clone());

    transport.inject("rc433/not a device/state", b"on");
    transport.inject("rc433/device1/state", &[0xff, 0xfe]);
    transport.inject("rc433/device1/state", b"on");

    assert!(registry.lookup("device1").unwrap().state);
}

#[test]
fn init_done_twice_starts_one_listener() {
    let transport = LoopbackTransport::new();
    let shared: Arc<dyn MqttTransport> = transport.clone();
    let state = MqttState::new(shared, plain_topics());

    state.init_done().unwrap();
    state.init_done().unwrap();

    assert!(state.is_listening());
    assert_eq!(transport.filters().len(), 1);
}

#[test]
fn unseeded_devices_default_to_off() {
    let transport = LoopbackTransport::new();
    let state = MqttState::new(transport, plain_topics());

    assert!(!state.lookup("never_seen"));
}

#[test]
fn states_of_unconfigured_devices_are_ignored() {
    let transport = LoopbackTransport::new();
    let state = MqttState::new(transport.clone(), plain_topics());
    state.init_device(&Device::from(CodeDevice::new("device1", 1, 2)));
    state.init_done().unwrap();

    transport.inject("rc433/stranger/state", b"on");
    transport.inject("rc433/device1/state", b"on");

    assert!(!state.lookup("stranger"));
    assert!(state.lookup("device1"));
}
