//! Controller tests against the mock transport.
//!
//! These run on a paused tokio clock, so the post-write grace period costs
//! no wall time and its length can be asserted exactly.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout};

use switchbot_core::{
    BotController, CompletionNotifier, ControlCapability, ControllerConfig, DISCONNECT_DELAY,
    Error, GattStatus, LinkEvent, MemoryLog, MockOperation, MockTransport, MockTransportBuilder,
    ServiceInfo, TransportCall, TransportEvent,
};
use switchbot_types::uuid::{COMMUNICATION_SERVICE, SEND_COMMAND};
use switchbot_types::{Command, ConnectionState, PeripheralIdentity};

const CAPABILITY: ControlCapability = ControlCapability {
    service: COMMUNICATION_SERVICE,
    characteristic: SEND_COMMAND,
};

fn kitchen() -> PeripheralIdentity {
    PeripheralIdentity::new("AA:BB:CC:DD:EE:FF", "Kitchen").unwrap()
}

fn start(
    transport: Arc<MockTransport>,
    events: switchbot_core::EventReceiver,
) -> (
    BotController,
    tokio::sync::oneshot::Receiver<bool>,
    Arc<MemoryLog>,
) {
    let log = Arc::new(MemoryLog::new());
    let (notifier, done) = CompletionNotifier::channel();
    let controller =
        BotController::new(kitchen(), transport, events, log.clone(), notifier).unwrap();
    (controller, done, log)
}

fn write(command: Command) -> TransportCall {
    TransportCall::Write {
        capability: CAPABILITY,
        payload: command.payload(),
    }
}

fn discovered() -> TransportEvent {
    TransportEvent::ServicesDiscovered {
        status: GattStatus::SUCCESS,
        services: MockTransport::bot_services(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_press_end_to_end() {
    let (mock, events) = MockTransport::responsive();
    let (controller, done, log) = start(mock.clone(), events);

    controller.press().unwrap();
    assert_eq!(done.await, Ok(true));

    mock.wait_for_calls(4).await;
    assert_eq!(
        mock.calls(),
        vec![
            TransportCall::Connect,
            TransportCall::DiscoverServices,
            write(Command::Press),
            TransportCall::Disconnect,
        ]
    );
    assert_eq!(mock.writes(), vec![[0x57, 0x01, 0x00]]);
    assert_eq!(
        log.messages(),
        vec!["command sent to 'Kitchen', status: 0".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_turn_on_and_off_payloads() {
    for (command, payload) in [
        (Command::TurnOn, [0x57, 0x01, 0x01]),
        (Command::TurnOff, [0x57, 0x01, 0x02]),
    ] {
        let (mock, events) = MockTransport::responsive();
        let (controller, done, _log) = start(mock.clone(), events);

        match command {
            Command::TurnOn => controller.turn_on().unwrap(),
            _ => controller.turn_off().unwrap(),
        }
        assert_eq!(done.await, Ok(true));
        assert_eq!(mock.writes(), vec![payload]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_success_waits_for_disconnect_delay() {
    let (mock, events) = MockTransport::new();
    let (controller, mut done, _log) = start(mock.clone(), events);

    controller.press().unwrap();
    mock.wait_for_calls(1).await;
    mock.emit(TransportEvent::ConnectionStateChanged(LinkEvent::Connected));
    mock.wait_for_calls(2).await;
    mock.emit(discovered());
    mock.wait_for_calls(3).await;

    let acked_at = Instant::now();
    mock.emit(TransportEvent::CharacteristicWriteComplete {
        status: GattStatus::SUCCESS,
    });

    let early = timeout(DISCONNECT_DELAY - Duration::from_millis(1), &mut done).await;
    assert!(early.is_err(), "completed before the grace period");
    assert_eq!(mock.calls().len(), 3, "disconnected before the grace period");

    assert_eq!(done.await, Ok(true));
    assert!(acked_at.elapsed() >= DISCONNECT_DELAY);

    mock.wait_for_calls(4).await;
    assert_eq!(mock.calls()[3], TransportCall::Disconnect);
}

#[tokio::test(start_paused = true)]
async fn test_custom_disconnect_delay() {
    let (mock, events) = MockTransport::responsive();
    let (notifier, done) = CompletionNotifier::channel();
    let config = ControllerConfig::new().disconnect_delay(Duration::from_millis(500));
    let controller = BotController::with_config(
        kitchen(),
        mock,
        events,
        Arc::new(MemoryLog::new()),
        notifier,
        config,
    )
    .unwrap();

    let started = Instant::now();
    controller.press().unwrap();
    assert_eq!(done.await, Ok(true));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < DISCONNECT_DELAY);
}

#[tokio::test]
async fn test_zero_delay_is_rejected() {
    let (mock, events) = MockTransport::new();
    let config = ControllerConfig::new().disconnect_delay(Duration::ZERO);
    let result = BotController::with_config(
        kitchen(),
        mock,
        events,
        Arc::new(MemoryLog::new()),
        CompletionNotifier::noop(),
        config,
    );
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[tokio::test(start_paused = true)]
async fn test_link_drop_before_connect_fails() {
    let (mock, events) = MockTransport::new();
    let (controller, done, log) = start(mock.clone(), events);

    controller.press().unwrap();
    mock.wait_for_calls(1).await;
    mock.emit(TransportEvent::ConnectionStateChanged(
        LinkEvent::Disconnected,
    ));

    assert_eq!(done.await, Ok(false));
    assert!(mock.writes().is_empty());
    assert!(log.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_link_drop_during_discovery_fails_without_write() {
    let (mock, events) = MockTransport::new();
    let (controller, done, _log) = start(mock.clone(), events);

    controller.press().unwrap();
    mock.wait_for_calls(1).await;
    mock.emit(TransportEvent::ConnectionStateChanged(LinkEvent::Connected));
    mock.wait_for_calls(2).await;
    mock.emit(TransportEvent::ConnectionStateChanged(
        LinkEvent::Disconnected,
    ));
    mock.emit(discovered());

    assert_eq!(done.await, Ok(false));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(mock.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_connect_error_fails() {
    let (mock, events) = MockTransportBuilder::new()
        .auto_respond(true)
        .fail_on(MockOperation::Connect)
        .build();
    let (controller, done, _log) = start(mock.clone(), events);

    controller.press().unwrap();
    assert_eq!(done.await, Ok(false));
    assert_eq!(mock.calls(), vec![TransportCall::Connect]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_characteristic_fails_and_disconnects() {
    let (mock, events) = MockTransportBuilder::new()
        .auto_respond(true)
        .services(vec![ServiceInfo::new(COMMUNICATION_SERVICE, [])])
        .build();
    let (controller, done, log) = start(mock.clone(), events);

    controller.press().unwrap();
    assert_eq!(done.await, Ok(false));

    mock.wait_for_calls(3).await;
    assert_eq!(
        mock.calls(),
        vec![
            TransportCall::Connect,
            TransportCall::DiscoverServices,
            TransportCall::Disconnect,
        ]
    );
    let messages = log.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("discovery failed for 'Kitchen'"));
}

#[tokio::test(start_paused = true)]
async fn test_discovery_error_fails() {
    let (mock, events) = MockTransportBuilder::new()
        .auto_respond(true)
        .fail_on(MockOperation::DiscoverServices)
        .build();
    let (controller, done, _log) = start(mock.clone(), events);

    controller.press().unwrap();
    assert_eq!(done.await, Ok(false));
    assert!(mock.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_write_error_status_still_succeeds() {
    let (mock, events) = MockTransportBuilder::new()
        .auto_respond(true)
        .write_status(GattStatus(0x01))
        .build();
    let (controller, done, log) = start(mock, events);

    controller.press().unwrap();
    assert_eq!(done.await, Ok(true));
    assert_eq!(
        log.messages(),
        vec!["command sent to 'Kitchen', status: 1".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_call_fails_and_disconnects() {
    let (mock, events) = MockTransportBuilder::new()
        .auto_respond(true)
        .fail_on(MockOperation::Write)
        .build();
    let (controller, done, log) = start(mock.clone(), events);

    let started = Instant::now();
    controller.press().unwrap();
    assert_eq!(done.await, Ok(false));
    assert!(started.elapsed() < DISCONNECT_DELAY);

    mock.wait_for_calls(4).await;
    assert_eq!(
        mock.calls(),
        vec![
            TransportCall::Connect,
            TransportCall::DiscoverServices,
            write(Command::Press),
            TransportCall::Disconnect,
        ]
    );
    assert!(log.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_requests_reach_transport_in_issue_order() {
    let (mock, events) = MockTransportBuilder::new()
        .auto_respond(true)
        .latency(MockOperation::Write, Duration::from_secs(2))
        .build();
    let (controller, done, _log) = start(mock.clone(), events);

    controller.press().unwrap();
    mock.wait_for_calls(3).await;

    // A second command inside the grace period is still in flight when the
    // first command's disconnect comes due.
    tokio::time::sleep(Duration::from_secs(2)).await;
    controller.turn_on().unwrap();
    assert_eq!(done.await, Ok(true));

    mock.wait_for_calls(5).await;
    assert_eq!(
        mock.calls(),
        vec![
            TransportCall::Connect,
            TransportCall::DiscoverServices,
            write(Command::Press),
            write(Command::TurnOn),
            TransportCall::Disconnect,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_capability_cached_across_reconnect() {
    let (mock, events) = MockTransport::responsive();
    let (controller, done, _log) = start(mock.clone(), events);

    controller.press().unwrap();
    assert_eq!(done.await, Ok(true));
    mock.wait_for_calls(4).await;

    let mut state = controller.watch_state();
    state
        .wait_for(|s| *s == ConnectionState::Disconnected)
        .await
        .unwrap();

    controller.turn_off().unwrap();
    mock.wait_for_calls(6).await;

    let calls = mock.calls();
    assert_eq!(
        &calls[4..6],
        &[TransportCall::Reconnect, write(Command::TurnOff)]
    );
    let discoveries = calls
        .iter()
        .filter(|c| **c == TransportCall::DiscoverServices)
        .count();
    assert_eq!(discoveries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_last_scheduled_command_wins() {
    let (mock, events) = MockTransport::new();
    let (controller, done, _log) = start(mock.clone(), events);

    controller.press().unwrap();
    controller.turn_on().unwrap();
    controller.turn_off().unwrap();
    mock.wait_for_calls(1).await;

    mock.emit(TransportEvent::ConnectionStateChanged(LinkEvent::Connected));
    mock.wait_for_calls(2).await;
    mock.emit(discovered());
    mock.wait_for_calls(3).await;
    mock.emit(TransportEvent::CharacteristicWriteComplete {
        status: GattStatus::SUCCESS,
    });

    assert_eq!(done.await, Ok(true));
    assert_eq!(mock.writes(), vec![Command::TurnOff.payload()]);
    assert_eq!(
        mock.calls()
            .iter()
            .filter(|c| **c == TransportCall::Connect)
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_state_follows_link() {
    let (mock, events) = MockTransport::new();
    let (controller, _done, _log) = start(mock.clone(), events);
    let mut state = controller.watch_state();
    assert_eq!(controller.state(), ConnectionState::Disconnected);

    controller.press().unwrap();
    state
        .wait_for(|s| *s == ConnectionState::Connecting)
        .await
        .unwrap();

    mock.emit(TransportEvent::ConnectionStateChanged(LinkEvent::Connected));
    state
        .wait_for(|s| *s == ConnectionState::Connected)
        .await
        .unwrap();
    assert_eq!(controller.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_pending_callback() {
    let (mock, events) = MockTransport::new();
    let (controller, done, _log) = start(mock.clone(), events);

    controller.press().unwrap();
    mock.wait_for_calls(1).await;
    mock.emit(TransportEvent::ConnectionStateChanged(LinkEvent::Connected));
    mock.wait_for_calls(2).await;
    mock.emit(discovered());
    mock.wait_for_calls(3).await;
    mock.emit(TransportEvent::CharacteristicWriteComplete {
        status: GattStatus::SUCCESS,
    });
    let mut state = controller.watch_state();
    state
        .wait_for(|s| *s == ConnectionState::Connected)
        .await
        .unwrap();

    drop(controller);

    // The notifier is dropped unused, and the live link is torn down.
    assert!(done.await.is_err());
    mock.wait_for_calls(4).await;
    assert_eq!(mock.calls()[3], TransportCall::Disconnect);
}

#[tokio::test(start_paused = true)]
async fn test_controllers_for_same_address_are_independent() {
    let (first_mock, first_events) = MockTransport::responsive();
    let (second_mock, second_events) = MockTransport::responsive();
    let (first, first_done, _) = start(first_mock.clone(), first_events);
    let (second, second_done, _) = start(second_mock.clone(), second_events);
    assert_eq!(first.identity(), second.identity());

    first.turn_on().unwrap();
    second.turn_off().unwrap();

    assert_eq!(first_done.await, Ok(true));
    assert_eq!(second_done.await, Ok(true));
    assert_eq!(first_mock.writes(), vec![Command::TurnOn.payload()]);
    assert_eq!(second_mock.writes(), vec![Command::TurnOff.payload()]);
}

#[tokio::test(start_paused = true)]
async fn test_callback_fires_once_across_commands() {
    let (mock, events) = MockTransport::responsive();
    let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = calls.clone();
    let notifier = CompletionNotifier::new(move |_| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });
    let controller = BotController::new(
        kitchen(),
        mock.clone(),
        events,
        Arc::new(MemoryLog::new()),
        notifier,
    )
    .unwrap();

    controller.press().unwrap();
    mock.wait_for_calls(4).await;
    controller
        .watch_state()
        .wait_for(|s| *s == ConnectionState::Disconnected)
        .await
        .unwrap();
    controller.press().unwrap();
    mock.wait_for_calls(7).await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(mock.writes().len(), 2);
}
