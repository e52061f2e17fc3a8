use application::printer::{ConnectionManager, ConnectionSettings, Trailer};
use async_trait::async_trait;
use domain::error::{DeviceError, DeviceErrorStatus, DisconnectStage};
use domain::event::{EventPublisher, PublishError};
use domain::printer::{
    CallbackCode, ConnectionState, CutMode, ImageBlock, PrintOperation, PrinterDevice,
    PrinterDeviceFactory, PrinterSeries, PrinterStatusSnapshot, PrinterTarget, ReceiveEvent,
    ReceiveListener, StatusFlag, TextStyle,
};
use domain::{DomainEvent, PrinterError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

// --- Scripted device with shared recorder ---

#[derive(Default)]
struct DeviceLog {
    created: usize,
    calls: Vec<String>,
    staged: Vec<String>,
    sent: Vec<Vec<String>>,
    status: Option<PrinterStatusSnapshot>,
    listeners: Vec<Arc<ReceiveListener>>,
    active_listener: Option<usize>,
    fail_begin: bool,
    fail_end: bool,
    fail_close: bool,
    fail_add: bool,
    fail_send: bool,
}

#[derive(Clone)]
struct Script(Arc<Mutex<DeviceLog>>);

impl Script {
    fn new() -> Self {
        let log = DeviceLog {
            status: Some(PrinterStatusSnapshot::ready()),
            ..Default::default()
        };
        Self(Arc::new(Mutex::new(log)))
    }

    fn log(&self) -> MutexGuard<'_, DeviceLog> {
        self.0.lock().unwrap()
    }

    fn count(&self, call: &str) -> usize {
        self.log().calls.iter().filter(|c| c.as_str() == call).count()
    }

    /// Deliver a completion signal through the currently registered listener
    fn fire(&self, code: CallbackCode) -> bool {
        let listener = {
            let log = self.log();
            log.active_listener.map(|i| log.listeners[i].clone())
        };
        match listener {
            Some(listener) => {
                listener(event(code));
                true
            }
            None => false,
        }
    }

    /// Deliver a signal through a listener of an earlier connection
    fn fire_stale(&self, index: usize, code: CallbackCode) {
        let listener = self.log().listeners[index].clone();
        listener(event(code));
    }
}

fn event(code: CallbackCode) -> ReceiveEvent {
    ReceiveEvent {
        code,
        status: PrinterStatusSnapshot::ready(),
        device_job_id: None,
    }
}

struct ScriptedDevice {
    script: Script,
}

impl ScriptedDevice {
    fn record(&self, call: impl Into<String>) {
        self.script.log().calls.push(call.into());
    }

    fn outcome(&self, call: &str, fail: bool) -> Result<(), DeviceError> {
        self.record(call);
        if fail {
            return Err(DeviceError::new(
                DeviceErrorStatus::Failure,
                format!("{} failed", call),
            ));
        }
        Ok(())
    }

    fn stage(&self, entry: String) -> Result<(), DeviceError> {
        let fail = self.script.log().fail_add;
        self.outcome("add", fail)?;
        self.script.log().staged.push(entry);
        Ok(())
    }
}

#[async_trait]
impl PrinterDevice for ScriptedDevice {
    async fn connect(&mut self, target: &PrinterTarget, _timeout: Duration) -> Result<(), DeviceError> {
        self.record(format!("connect:{}", target));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DeviceError> {
        let fail = self.script.log().fail_close;
        self.outcome("close", fail)
    }

    async fn begin_transaction(&mut self) -> Result<(), DeviceError> {
        let fail = self.script.log().fail_begin;
        self.outcome("begin", fail)
    }

    async fn end_transaction(&mut self) -> Result<(), DeviceError> {
        let fail = self.script.log().fail_end;
        self.outcome("end", fail)
    }

    fn add_text_style(&mut self, _style: &TextStyle) -> Result<(), DeviceError> {
        self.stage("style".to_string())
    }

    fn add_text(&mut self, text: &str) -> Result<(), DeviceError> {
        self.stage(format!("text:{}", text))
    }

    fn add_feed_line(&mut self, lines: u8) -> Result<(), DeviceError> {
        self.stage(format!("feed:{}", lines))
    }

    fn add_image(&mut self, image: &ImageBlock) -> Result<(), DeviceError> {
        self.stage(format!("image:{}x{}", image.bitmap.width(), image.bitmap.height()))
    }

    fn add_cut(&mut self, mode: CutMode) -> Result<(), DeviceError> {
        self.stage(format!("cut:{:?}", mode))
    }

    async fn send_data(&mut self, _timeout: Duration) -> Result<(), DeviceError> {
        let fail = self.script.log().fail_send;
        self.outcome("send", fail)?;
        let mut log = self.script.log();
        let job = log.staged.clone();
        log.sent.push(job);
        Ok(())
    }

    fn clear_buffer(&mut self) {
        self.script.log().staged.clear();
    }

    fn status(&self) -> Option<PrinterStatusSnapshot> {
        self.script.log().status
    }

    fn set_receive_listener(&mut self, listener: Option<ReceiveListener>) {
        let mut log = self.script.log();
        match listener {
            Some(listener) => {
                log.listeners.push(Arc::new(listener));
                log.active_listener = Some(log.listeners.len() - 1);
            }
            None => log.active_listener = None,
        }
    }
}

struct ScriptedFactory {
    script: Script,
}

impl PrinterDeviceFactory for ScriptedFactory {
    fn create(&self, _series: PrinterSeries) -> Result<Box<dyn PrinterDevice>, DeviceError> {
        self.script.log().created += 1;
        Ok(Box::new(ScriptedDevice {
            script: self.script.clone(),
        }))
    }
}

// --- Mock Event Publisher ---

struct ChannelEventPublisher {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl ChannelEventPublisher {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        let _ = self.tx.send(event);
        Ok(())
    }
}

// --- Helpers ---

fn target() -> PrinterTarget {
    PrinterTarget::new("TCP:192.168.0.10").unwrap()
}

fn setup() -> (
    ConnectionManager,
    Script,
    mpsc::UnboundedReceiver<DomainEvent>,
) {
    let script = Script::new();
    let (publisher, events) = ChannelEventPublisher::new();
    let settings = ConnectionSettings {
        default_series: PrinterSeries::TmT88,
        trailer: Trailer::default(),
        job_timeout: Some(Duration::from_secs(5)),
        connect_timeout: Duration::from_secs(1),
        send_timeout: Duration::from_secs(1),
    };
    let manager = ConnectionManager::new(
        Arc::new(ScriptedFactory {
            script: script.clone(),
        }),
        publisher,
        settings,
    );
    (manager, script, events)
}

async fn connected() -> (
    ConnectionManager,
    Script,
    mpsc::UnboundedReceiver<DomainEvent>,
) {
    let (manager, script, events) = setup();
    manager
        .ensure_connected(target(), PrinterSeries::TmT88)
        .await
        .unwrap();
    (manager, script, events)
}

fn text(content: &str) -> PrintOperation {
    PrintOperation::text(content, TextStyle::default())
}

// --- Tests ---

#[tokio::test]
async fn test_print_hello_succeeds() {
    let (manager, script, mut events) = connected().await;

    manager.append(text("Hello")).await.unwrap();
    let ticket = manager.submit().await.unwrap();
    assert!(manager.has_pending_job().await);

    assert!(script.fire(CallbackCode::Success));
    let receipt = ticket.wait().await.unwrap();

    assert_eq!(receipt.status, PrinterStatusSnapshot::ready());
    assert_eq!(
        script.log().sent,
        vec![vec![
            "style".to_string(),
            "text:Hello".to_string(),
            "feed:3".to_string(),
            "cut:Feed".to_string()
        ]]
    );
    assert!(!manager.has_pending_job().await);
    assert_eq!(manager.state().await, ConnectionState::InTransaction);
    assert_eq!(manager.buffered_operations().await, 0);

    let status = manager.status().await.unwrap();
    assert_eq!(status.online, StatusFlag::True);
    assert_eq!(status.connection, StatusFlag::True);

    assert!(matches!(
        events.recv().await.unwrap(),
        DomainEvent::PrinterConnected { .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        DomainEvent::JobSubmitted { operations: 3, .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        DomainEvent::JobCompleted { success: true, .. }
    ));
}

#[tokio::test]
async fn test_ensure_connected_is_idempotent() {
    let (manager, script, _events) = setup();

    manager
        .ensure_connected(target(), PrinterSeries::TmT88)
        .await
        .unwrap();
    manager
        .ensure_connected(target(), PrinterSeries::TmT88)
        .await
        .unwrap();

    assert_eq!(script.log().created, 1);
    assert_eq!(script.count("connect:TCP:192.168.0.10"), 1);
    assert_eq!(script.count("begin"), 1);
}

#[tokio::test]
async fn test_other_target_is_rejected_while_connected() {
    let (manager, _script, _events) = connected().await;

    let err = manager
        .ensure_connected(
            PrinterTarget::new("BT:00:01:90:AA:BB:CC").unwrap(),
            PrinterSeries::TmP80,
        )
        .await
        .unwrap_err();

    assert_eq!(err, PrinterError::AlreadyConnected { current: target() });
    assert_eq!(err.code(), "0x00011");
}

#[tokio::test]
async fn test_any_target_binds_after_disconnect() {
    let (manager, script, _events) = connected().await;
    manager.disconnect().await.unwrap();

    let other = PrinterTarget::new("BT:00:01:90:AA:BB:CC").unwrap();
    manager
        .ensure_connected(other.clone(), PrinterSeries::TmP80)
        .await
        .unwrap();

    assert_eq!(manager.target().await, Some(other));
    assert_eq!(script.log().created, 2);
}

#[tokio::test]
async fn test_second_submit_while_pending_fails_without_device_calls() {
    let (manager, script, _events) = connected().await;

    manager.append(text("first")).await.unwrap();
    let _ticket = manager.submit().await.unwrap();
    let calls_before = script.log().calls.len();

    let err = manager.submit().await.unwrap_err();

    assert_eq!(err, PrinterError::JobAlreadyPending);
    assert_eq!(script.log().calls.len(), calls_before);
}

#[tokio::test]
async fn test_not_printable_disconnects_without_send() {
    let (manager, script, _events) = connected().await;
    script.log().status = Some(PrinterStatusSnapshot {
        connection: StatusFlag::False,
        ..PrinterStatusSnapshot::ready()
    });

    manager.append(text("Hello")).await.unwrap();
    let err = manager.submit().await.unwrap_err();

    assert!(matches!(err, PrinterError::PrinterNotReady { status: Some(_) }));
    assert_eq!(err.code(), "0x00050");
    assert_eq!(script.count("send"), 0);
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_missing_status_is_not_printable() {
    let (manager, script, _events) = connected().await;
    script.log().status = None;

    let err = manager.submit().await.unwrap_err();

    assert_eq!(err, PrinterError::PrinterNotReady { status: None });
    assert_eq!(script.count("send"), 0);
}

#[tokio::test]
async fn test_append_failure_forces_recovery_even_if_close_fails() {
    let (manager, script, mut events) = connected().await;
    {
        let mut log = script.log();
        log.fail_add = true;
        log.fail_close = true;
    }

    let err = manager.append(text("Hello")).await.unwrap_err();

    assert!(matches!(err, PrinterError::BufferAppend(_)));
    assert_eq!(err.code(), "0x00030");
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
    assert_eq!(script.count("close"), 1);
    // Forced recovery never ends the transaction
    assert_eq!(script.count("end"), 0);

    let _connected = events.recv().await.unwrap();
    assert!(matches!(
        events.recv().await.unwrap(),
        DomainEvent::PrinterDisconnected { forced: true, .. }
    ));
}

#[tokio::test]
async fn test_send_failure_forces_recovery_and_drops_late_signal() {
    let (manager, script, _events) = connected().await;
    script.log().fail_send = true;

    manager.append(text("Hello")).await.unwrap();
    let err = manager.submit().await.unwrap_err();

    assert!(matches!(err, PrinterError::SendFailed(_)));
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
    assert!(!manager.has_pending_job().await);
    // Listener detached during recovery
    assert!(!script.fire(CallbackCode::Success));
    assert!(script.log().staged.is_empty());
}

#[tokio::test]
async fn test_failure_code_resolves_print_job_failed() {
    let (manager, script, _events) = connected().await;

    let ticket = manager.submit().await.unwrap();
    script.fire(CallbackCode::ErrCoverOpen);

    let err = ticket.wait().await.unwrap_err();
    assert_eq!(
        err,
        PrinterError::PrintJobFailed {
            code: CallbackCode::ErrCoverOpen
        }
    );
    // Printer reported the failure itself; the connection stays usable
    assert_eq!(manager.state().await, ConnectionState::InTransaction);
    assert!(manager.submit().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_missing_signal_times_out_and_recovers() {
    let (manager, script, _events) = connected().await;

    let ticket = manager.submit().await.unwrap();
    let err = ticket.wait().await.unwrap_err();

    assert_eq!(err, PrinterError::JobTimeout(Duration::from_secs(5)));
    assert_eq!(err.code(), "0x00054");
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
    assert!(!manager.has_pending_job().await);
    assert_eq!(script.count("close"), 1);
}

#[tokio::test]
async fn test_signal_without_pending_job_is_ignored() {
    let (manager, script, _events) = connected().await;

    assert!(script.fire(CallbackCode::Success));
    tokio::task::yield_now().await;

    let ticket = manager.submit().await.unwrap();
    script.fire(CallbackCode::Success);
    assert!(ticket.wait().await.is_ok());
}

#[tokio::test]
async fn test_signal_from_previous_connection_does_not_resolve_new_job() {
    let (manager, script, _events) = connected().await;
    manager.force_recover("test").await;
    manager.ensure_ready().await.unwrap();

    let ticket = manager.submit().await.unwrap();
    script.fire_stale(0, CallbackCode::ErrEmpty);
    tokio::task::yield_now().await;
    assert!(manager.has_pending_job().await);

    script.fire(CallbackCode::Success);
    assert!(ticket.wait().await.is_ok());
}

#[tokio::test]
async fn test_disconnect_resolves_pending_job() {
    let (manager, script, mut events) = connected().await;

    let ticket = manager.submit().await.unwrap();
    manager.disconnect().await.unwrap();

    assert_eq!(ticket.wait().await.unwrap_err(), PrinterError::NotConnected);
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
    assert_eq!(script.count("end"), 1);
    assert_eq!(script.count("close"), 1);

    let mut saw_disconnect = false;
    while let Ok(event) = events.try_recv() {
        if let DomainEvent::PrinterDisconnected { forced, .. } = event {
            assert!(!forced);
            saw_disconnect = true;
        }
    }
    assert!(saw_disconnect);
}

#[tokio::test]
async fn test_disconnect_when_disconnected_is_noop() {
    let (manager, script, _events) = setup();

    manager.disconnect().await.unwrap();

    assert!(script.log().calls.is_empty());
}

#[tokio::test]
async fn test_disconnect_reports_failing_stage() {
    let (manager, script, _events) = connected().await;
    script.log().fail_end = true;

    let err = manager.disconnect().await.unwrap_err();
    assert!(matches!(
        err,
        PrinterError::Disconnect {
            stage: DisconnectStage::EndTransaction,
            ..
        }
    ));
    // Remaining steps were skipped
    assert_eq!(script.count("close"), 0);
    assert_eq!(manager.state().await, ConnectionState::InTransaction);

    {
        let mut log = script.log();
        log.fail_end = false;
        log.fail_close = true;
    }
    let err = manager.disconnect().await.unwrap_err();
    assert_eq!(err.code(), "0x00021");
    assert_eq!(manager.state().await, ConnectionState::Connected);

    // Retrying resumes at the close step
    script.log().fail_close = false;
    manager.disconnect().await.unwrap();
    assert_eq!(script.count("end"), 2);
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_failed_transaction_closes_transport() {
    let (manager, script, _events) = setup();
    script.log().fail_begin = true;

    let err = manager
        .ensure_connected(target(), PrinterSeries::TmT88)
        .await
        .unwrap_err();

    assert!(matches!(err, PrinterError::Transaction(_)));
    assert_eq!(script.count("close"), 1);
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_append_requires_transaction() {
    let (manager, script, _events) = setup();

    let err = manager.append(text("Hello")).await.unwrap_err();

    assert_eq!(err, PrinterError::NotConnected);
    assert!(script.log().calls.is_empty());
}

#[tokio::test]
async fn test_ensure_ready_reconnects_to_last_target() {
    let (manager, script, _events) = setup();
    assert_eq!(manager.ensure_ready().await, Err(PrinterError::NotConnected));

    manager
        .ensure_connected(target(), PrinterSeries::TmM30)
        .await
        .unwrap();
    manager.force_recover("test").await;
    assert_eq!(manager.state().await, ConnectionState::Disconnected);

    manager.ensure_ready().await.unwrap();

    assert_eq!(manager.state().await, ConnectionState::InTransaction);
    assert_eq!(script.count("connect:TCP:192.168.0.10"), 2);
}

#[tokio::test]
async fn test_concurrent_appends_are_not_lost() {
    let (manager, script, _events) = connected().await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.append(text(&format!("line {}", i))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let ticket = manager.submit().await.unwrap();
    script.fire(CallbackCode::Success);
    ticket.wait().await.unwrap();

    let sent = script.log().sent[0].clone();
    assert_eq!(sent.len(), 22);
    for i in 0..10 {
        assert!(sent.contains(&format!("text:line {}", i)));
    }
    assert_eq!(sent[20], "feed:3");
    assert_eq!(sent[21], "cut:Feed");
}

#[tokio::test]
async fn test_append_batch_submits_whole_batch() {
    let (manager, script, _events) = connected().await;

    let ticket = manager
        .append_batch(vec![text("one"), text("two")], true)
        .await
        .unwrap()
        .expect("batch was submitted");
    script.fire(CallbackCode::Success);
    ticket.wait().await.unwrap();

    assert_eq!(
        script.log().sent,
        vec![vec![
            "style".to_string(),
            "text:one".to_string(),
            "style".to_string(),
            "text:two".to_string(),
            "feed:3".to_string(),
            "cut:Feed".to_string()
        ]]
    );
}

#[tokio::test]
async fn test_append_batch_reconnects_first() {
    let (manager, script, _events) = connected().await;
    manager.force_recover("test").await;

    let ticket = manager.append_batch(vec![text("again")], false).await.unwrap();

    assert!(ticket.is_none());
    assert_eq!(manager.state().await, ConnectionState::InTransaction);
    assert_eq!(manager.buffered_operations().await, 1);
    assert_eq!(script.log().created, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches_stay_contiguous() {
    let (manager, script, _events) = connected().await;

    let mut handles = Vec::new();
    for prefix in ["a", "b", "c"] {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let batch = (0..200).map(|i| text(&format!("{}{}", prefix, i))).collect();
            manager.append_batch(batch, false).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let ticket = manager.submit().await.unwrap();
    script.fire(CallbackCode::Success);
    ticket.wait().await.unwrap();

    let prefixes: Vec<char> = script.log().sent[0]
        .iter()
        .filter_map(|entry| entry.strip_prefix("text:"))
        .filter_map(|content| content.chars().next())
        .collect();
    assert_eq!(prefixes.len(), 600);
    let switches = prefixes.windows(2).filter(|pair| pair[0] != pair[1]).count();
    assert_eq!(switches, 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_ticket_still_times_out() {
    let (manager, script, mut events) = connected().await;

    drop(manager.submit().await.unwrap());
    assert!(manager.has_pending_job().await);

    tokio::time::sleep(Duration::from_secs(6)).await;

    assert!(!manager.has_pending_job().await);
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
    assert_eq!(script.count("close"), 1);

    let mut forced = false;
    while let Ok(event) = events.try_recv() {
        if let DomainEvent::PrinterDisconnected { forced: true, .. } = event {
            forced = true;
        }
    }
    assert!(forced);

    // The slot is free again once the printer is back
    manager.ensure_ready().await.unwrap();
    assert!(manager.submit().await.is_ok());
}

#[tokio::test]
async fn test_print_waits_for_completion() {
    let (manager, script, _events) = connected().await;

    let printing = tokio::spawn({
        let manager = manager.clone();
        async move { manager.print().await }
    });
    while !manager.has_pending_job().await {
        tokio::task::yield_now().await;
    }
    script.fire(CallbackCode::Success);

    assert!(printing.await.unwrap().is_ok());
}
