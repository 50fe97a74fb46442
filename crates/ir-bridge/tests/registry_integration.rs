//! Integration tests for startup: configuration text in, populated registry
//! out.
//!
//! These go through the same path as the binary (`parse_config` followed by
//! `build_registry`) with the in-memory `MockController` standing in for the
//! network.

use std::net::IpAddr;
use std::sync::Arc;

use ir_bridge::application::bootstrap::build_registry;
use ir_bridge::domain::BridgeError;
use ir_bridge::infrastructure::controller::mock::MockController;
use ir_bridge::infrastructure::storage::parse_config;

const CONFIG: &str = r#"
[commands]
power = "JgAEABAgECANBQAA"
mute = "0000 006D 0000 0001 0010 0020"

[devices]
living-room = "192.168.1.20"
bedroom = "192.168.1.21"

[discovery]
timeout = 2
"#;

fn controller() -> MockController {
    MockController::new()
        .with_device("192.168.1.20", IpAddr::from([192, 168, 1, 20]), [1, 2, 3, 4, 5, 6])
        .with_device("192.168.1.21", IpAddr::from([192, 168, 1, 21]), [1, 2, 3, 4, 5, 7])
        .with_discoverable_device("192.168.1.30", IpAddr::from([192, 168, 1, 30]), [1, 2, 3, 4, 5, 8])
}

#[test]
fn test_startup_registers_commands_devices_and_discoveries() {
    // Arrange
    let config = parse_config(CONFIG).expect("valid config");
    let controller = controller();

    // Act
    let registry = build_registry(&config, Arc::new(controller.clone())).expect("bootstrap");

    // Assert: commands in file order, configured devices first
    assert_eq!(registry.command_names(), vec!["power", "mute"]);
    assert_eq!(registry.commands()[1].1, registry.command("mute").expect("mute"));
    let hosts: Vec<String> = registry
        .devices()
        .iter()
        .map(|device| device.host().to_string())
        .collect();
    assert_eq!(hosts, vec!["192.168.1.20", "192.168.1.21", "192.168.1.30"]);
    assert_eq!(controller.discover_count(), 1);
}

#[test]
fn test_every_lookup_form_reaches_the_same_device() {
    let config = parse_config(CONFIG).expect("valid config");
    let registry = build_registry(&config, Arc::new(controller())).expect("bootstrap");

    let by_alias = registry.resolve("bedroom").expect("alias");
    for id in ["192.168.1.21", "01:02:03:04:05:07", "01-02-03-04-05-07", "010203040507"] {
        let device = registry.resolve(id).expect("lookup");
        assert!(Arc::ptr_eq(&device, &by_alias), "{id} resolved elsewhere");
    }
}

#[test]
fn test_default_is_the_first_configured_device() {
    let config = parse_config(CONFIG).expect("valid config");
    let controller = controller();
    let registry = build_registry(&config, Arc::new(controller.clone())).expect("bootstrap");

    // Act
    registry.transmit("default", b"power", None).expect("transmit");

    // Assert
    assert_eq!(controller.sent_packets("192.168.1.20").len(), 1);
    assert!(controller.sent_packets("192.168.1.21").is_empty());
}

#[test]
fn test_device_that_comes_back_is_used_again() {
    // Arrange: the bedroom blaster is down at startup
    let config = parse_config(CONFIG).expect("valid config");
    let controller = controller();
    controller.set_reachable("192.168.1.21", false);
    let registry = build_registry(&config, Arc::new(controller.clone())).expect("bootstrap");
    assert!(!registry.resolve("bedroom").expect("still registered").is_connected());

    // Act: it comes back before the next request
    controller.set_reachable("192.168.1.21", true);
    registry.transmit("bedroom", b"mute", Some(1)).expect("transmit");

    // Assert
    assert_eq!(controller.sent_packets("192.168.1.21").len(), 1);
}

#[test]
fn test_invalid_configured_command_stops_startup() {
    let config = parse_config("[commands]\npower = \"not a code!\"\n").expect("valid TOML");

    let err = build_registry(&config, Arc::new(MockController::new()))
        .err()
        .expect("invalid command must stop startup");

    assert_eq!(err.name, "power");
    assert!(matches!(err.source, BridgeError::InvalidCode(_)));
}

#[test]
fn test_unknown_device_is_not_found() {
    let config = parse_config("[discovery]\ntimeout = 0\n").expect("valid config");
    let registry = build_registry(&config, Arc::new(MockController::new())).expect("bootstrap");

    assert!(matches!(
        registry.transmit("10.0.0.99", b"JgAEABAgECANBQAA", None),
        Err(BridgeError::NotFound(id)) if id == "10.0.0.99"
    ));
}

#[test]
fn test_default_is_not_found_before_any_device_exists() {
    // Arrange: discovery finds nothing and no device is configured
    let config = parse_config("[discovery]\ntimeout = 1\n").expect("valid config");
    let controller = MockController::new().with_device(
        "default",
        IpAddr::from([192, 168, 1, 99]),
        [1, 2, 3, 4, 5, 9],
    );
    let registry = build_registry(&config, Arc::new(controller.clone())).expect("bootstrap");

    // Act
    let result = registry.transmit("default", b"JgAEABAgECANBQAA", None);

    // Assert: no host called "default" is ever contacted
    assert!(matches!(result, Err(BridgeError::NotFound(_))));
    assert_eq!(controller.handshake_count("default"), 0);
}

#[test]
fn test_unreachable_device_reports_connection_failure() {
    let config = parse_config(CONFIG).expect("valid config");
    let controller = controller();
    let registry = build_registry(&config, Arc::new(controller.clone())).expect("bootstrap");
    controller.set_send_fails("192.168.1.21", true);

    let result = registry.transmit("bedroom", b"power", None);

    assert!(matches!(result, Err(BridgeError::ConnectionFailed(_))));
}
