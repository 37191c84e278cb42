use std::sync::Arc;
use std::time::Duration;

use application::DobissSystem;
use async_trait::async_trait;
use domain::driver::{ConnectionState, ControllerLink};
use domain::{DiscoveredModule, DomainError, Module, ModuleType, Output, OutputType};
use infrastructure::drivers::{Fault, LinkOp, MockController};
use mockall::mock;

fn system_with(controller: &MockController) -> Arc<DobissSystem> {
    Arc::new(DobissSystem::new(Box::new(controller.clone())))
}

fn write(module: u8, index: u8, level: u8) -> LinkOp {
    LinkOp::WriteLevel {
        module,
        index,
        level,
    }
}

// --- Import ---

#[tokio::test]
async fn test_import_builds_topology() {
    let controller = MockController::demo();
    let system = system_with(&controller);

    let topology = system.import_full_installation().await.unwrap();

    assert_eq!(topology.modules().len(), 2);
    assert_eq!(topology.outputs().len(), 10);
    assert_eq!(system.lights().len(), 4);
    assert_eq!(system.fans().len(), 1);
    assert_eq!(system.switches().len(), 1);

    let covers = system.covers();
    let ids: Vec<&str> = covers.iter().map(|c| c.unique_id.as_str()).collect();
    assert_eq!(ids, vec!["1.U4.D5", "1.U6.D7"]);
    assert_eq!(covers[1].name, "Kitchen");
    assert!(!controller.session_open());
}

#[tokio::test]
async fn test_failed_import_keeps_previous_topology() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    let before = system.import_full_installation().await.unwrap();

    controller.add_module(4, ModuleType::Relay, vec![(OutputType::Relay, 0, "Shed")]);
    controller.inject(Fault::ListOutputs(4));
    let result = system.import_full_installation().await;

    assert!(matches!(result, Err(DomainError::Protocol(_))));
    assert_eq!(*system.topology(), *before);
    assert!(system.topology().module(4).is_none());
    assert!(!controller.session_open());
}

#[tokio::test]
async fn test_reimport_drops_stale_snapshot_rows() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();
    controller.set_level(1, 0, 100);
    system.request_all_status().await.unwrap();

    controller.remove_module(2);
    system.import_full_installation().await.unwrap();

    let values = system.values();
    assert!(values.module_levels(2).is_none());
    assert_eq!(values.module_levels(1).map(<[u8]>::len), Some(8));
}

// --- Poll ---

#[tokio::test]
async fn test_poll_publishes_snapshot() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    let mut values_rx = system.subscribe_values();
    system.import_full_installation().await.unwrap();

    controller.set_level(2, 1, 35);
    let snapshot = system.request_all_status().await.unwrap();

    assert_eq!(snapshot.module_levels(2), Some(&[0, 35][..]));
    assert!(snapshot.taken_at().is_some());
    assert!(values_rx.has_changed().unwrap());
    assert_eq!(*values_rx.borrow_and_update(), snapshot);
}

#[tokio::test]
async fn test_failed_poll_keeps_previous_values() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();
    controller.set_level(1, 0, 100);
    let before = system.request_all_status().await.unwrap();

    controller.set_level(1, 0, 0);
    controller.inject(Fault::ReadLevels(2));
    let result = system.request_all_status().await;

    assert!(matches!(result, Err(DomainError::Connection(_))));
    assert_eq!(system.values(), before);
    assert!(!controller.session_open());
}

#[tokio::test]
async fn test_short_status_is_protocol_error() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();
    let before = system.values();

    controller.inject(Fault::ShortStatus(1));
    let result = system.request_all_status().await;

    assert!(matches!(result, Err(DomainError::Protocol(_))));
    assert_eq!(system.values(), before);
}

#[tokio::test]
async fn test_extra_status_channels_are_ignored() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();
    controller.set_level(2, 1, 70);

    controller.inject(Fault::LongStatus(2));
    let snapshot = system.request_all_status().await.unwrap();

    assert_eq!(snapshot.module_levels(2), Some(&[0, 70][..]));
    assert_eq!(system.values(), snapshot);
}

#[tokio::test]
async fn test_poll_cancelled_by_timeout_releases_session() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();

    controller.set_read_delay(Duration::from_millis(500));
    let result =
        tokio::time::timeout(Duration::from_millis(20), system.request_all_status()).await;

    assert!(result.is_err());
    assert!(!controller.session_open());
    assert_eq!(controller.ops().last(), Some(&LinkOp::Disconnect));
    assert!(system.check_connection().await.is_ok());
}

// --- Commands ---

#[tokio::test]
async fn test_set_off_matches_set_level_zero_on_the_wire() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();

    controller.clear_ops();
    system.set_level(2, 0, 0).await.unwrap();
    let by_level = controller.ops();

    controller.clear_ops();
    system.set_off(2, 0).await.unwrap();
    let by_off = controller.ops();

    assert_eq!(by_level, by_off);
    assert_eq!(
        by_off,
        vec![LinkOp::Connect, write(2, 0, 0), LinkOp::Disconnect]
    );
}

#[tokio::test]
async fn test_relay_outputs_switch_fully_on() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();
    controller.clear_ops();

    system.set_level(1, 0, 40).await.unwrap();
    system.set_level(2, 0, 40).await.unwrap();
    system.set_on(2, 1).await.unwrap();

    assert_eq!(
        controller.writes(),
        vec![write(1, 0, 100), write(2, 0, 40), write(2, 1, 100)]
    );
    assert_eq!(controller.level(1, 0), Some(100));
    assert_eq!(controller.level(2, 0), Some(40));
}

#[tokio::test]
async fn test_unknown_output_never_touches_transport() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();
    controller.clear_ops();

    let result = system.set_on(1, 42).await;
    assert_eq!(
        result,
        Err(DomainError::UnknownOutput {
            module: 1,
            index: 42
        })
    );

    let result = system.set_on(9, 0).await;
    assert!(matches!(result, Err(DomainError::UnknownOutput { .. })));
    assert!(controller.ops().is_empty());
}

#[tokio::test]
async fn test_level_above_hundred_rejected() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();
    controller.clear_ops();

    let result = system.set_level(2, 0, 101).await;

    assert_eq!(result, Err(DomainError::InvalidLevel(101)));
    assert!(controller.ops().is_empty());
}

#[tokio::test]
async fn test_failed_command_releases_session() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();

    controller.inject(Fault::WriteLevel);
    let result = system.set_on(1, 1).await;

    assert!(result.is_err());
    assert!(!controller.session_open());
    assert_eq!(controller.ops().last(), Some(&LinkOp::Disconnect));

    // A competing client gets the controller right away
    let mut other = controller.clone();
    assert!(other.connect().await.is_ok());
    other.disconnect();
}

#[tokio::test]
async fn test_poll_and_command_never_interleave() {
    let controller = MockController::demo();
    let system = system_with(&controller);
    system.import_full_installation().await.unwrap();
    controller.set_read_delay(Duration::from_millis(10));
    controller.clear_ops();

    let poller = system.clone();
    let commander = system.clone();
    let (poll, command) = tokio::join!(
        tokio::spawn(async move { poller.request_all_status().await }),
        tokio::spawn(async move { commander.set_on(2, 0).await }),
    );
    poll.unwrap().unwrap();
    command.unwrap().unwrap();

    // Every session is Connect, only reads or only one write, Disconnect
    let ops = controller.ops();
    let sessions: Vec<&[LinkOp]> = ops.split(|op| *op == LinkOp::Disconnect).collect();
    let sessions: Vec<&[LinkOp]> = sessions.into_iter().filter(|s| !s.is_empty()).collect();
    assert_eq!(sessions.len(), 2);
    for session in sessions {
        assert_eq!(session[0], LinkOp::Connect);
        let body = &session[1..];
        let reads = body
            .iter()
            .all(|op| matches!(op, LinkOp::ReadLevels(_)));
        let single_write = body.len() == 1 && matches!(body[0], LinkOp::WriteLevel { .. });
        assert!(reads || single_write, "interleaved session: {:?}", body);
    }
}

// --- Connect failures through a mocked link ---

mock! {
    Link {}

    #[async_trait]
    impl ControllerLink for Link {
        async fn connect(&mut self) -> Result<(), DomainError>;
        fn disconnect(&mut self);
        fn is_connected(&self) -> bool;
        fn connection_state(&self) -> ConnectionState;
        fn endpoint(&self) -> &str;
        async fn list_modules(&mut self) -> Result<Vec<DiscoveredModule>, DomainError>;
        async fn list_outputs(&mut self, module: &DiscoveredModule) -> Result<Vec<Output>, DomainError>;
        async fn read_levels(&mut self, module: &Module) -> Result<Vec<u8>, DomainError>;
        async fn write_level(&mut self, module: &Module, index: u8, level: u8) -> Result<(), DomainError>;
    }
}

#[tokio::test]
async fn test_connect_failure_still_disconnects() {
    let mut link = MockLink::new();
    link.expect_endpoint()
        .return_const("10.0.0.9:10001".to_string());
    link.expect_connect()
        .times(2)
        .returning(|| Err(DomainError::connection("connection refused")));
    link.expect_disconnect().times(2).return_const(());
    link.expect_list_modules().never();
    link.expect_read_levels().never();

    let system = DobissSystem::new(Box::new(link));

    let import = system.import_full_installation().await;
    assert!(matches!(import, Err(DomainError::Connection(_))));
    assert!(system.topology().is_empty());

    let poll = system.request_all_status().await;
    assert!(matches!(poll, Err(DomainError::Connection(_))));
    assert!(system.values().is_empty());
}

#[tokio::test]
async fn test_import_protocol_error_from_link() {
    let mut link = MockLink::new();
    link.expect_endpoint()
        .return_const("10.0.0.9:10001".to_string());
    link.expect_connect().returning(|| Ok(()));
    link.expect_disconnect().times(1).return_const(());
    link.expect_list_modules().returning(|| {
        Ok(vec![
            DiscoveredModule {
                address: 1,
                module_type: ModuleType::Relay,
            },
            DiscoveredModule {
                address: 1,
                module_type: ModuleType::Dimmer,
            },
        ])
    });
    link.expect_list_outputs()
        .returning(|module| Ok(vec![Output::new(module.address, 0, OutputType::Relay, 0, "Lamp")]));

    let system = DobissSystem::new(Box::new(link));
    let result = system.import_full_installation().await;

    // Two modules on the same address
    assert!(matches!(result, Err(DomainError::Protocol(_))));
    assert!(system.topology().is_empty());
}
