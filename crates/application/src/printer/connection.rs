use std::sync::{Arc, Weak};
use std::time::Duration;

use domain::error::{DeviceError, DeviceErrorStatus, DisconnectStage, Result};
use domain::event::EventPublisher;
use domain::printer::{
    ConnectionState, PrintOperation, PrinterDevice, PrinterDeviceFactory, PrinterSeries,
    PrinterStatusSnapshot, PrinterTarget, ReceiveEvent, is_printable,
};
use domain::{DomainEvent, PrinterError};
use infrastructure::config::PrinterConfig;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::buffer::{CommandBuffer, Trailer};
use super::job::{JobReceipt, JobTicket, PendingJob};

/// Tunables for a [`ConnectionManager`]
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Series used when the caller names no model, or an unknown one
    pub default_series: PrinterSeries,
    pub trailer: Trailer,
    /// `None` waits for the completion signal forever
    pub job_timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from(&PrinterConfig::default())
    }
}

impl From<&PrinterConfig> for ConnectionSettings {
    fn from(config: &PrinterConfig) -> Self {
        Self {
            default_series: config.default_series(),
            trailer: Trailer {
                feed_lines: config.trailer_feed_lines,
                cut: config.cut_mode,
            },
            job_timeout: config.job_timeout(),
            connect_timeout: config.connect_timeout(),
            send_timeout: config.send_timeout(),
        }
    }
}

struct ConnectionInner {
    state: ConnectionState,
    device: Option<Box<dyn PrinterDevice>>,
    /// Last bound target and series, kept across disconnects for lazy reconnect
    target: Option<PrinterTarget>,
    series: PrinterSeries,
    buffer: CommandBuffer,
    pending: Option<PendingJob>,
    /// Bumped on every successful connect; completion signals carry it
    epoch: u64,
    listener: Option<CancellationToken>,
}

impl ConnectionInner {
    fn detach_listener(&mut self) {
        if let Some(device) = self.device.as_mut() {
            device.set_receive_listener(None);
        }
        if let Some(token) = self.listener.take() {
            token.cancel();
        }
    }

    fn fail_pending(&mut self) {
        if let Some(job) = self.pending.take() {
            warn!(job_id = %job.id, "Pending job abandoned by disconnect");
            job.resolve(Err(PrinterError::NotConnected));
        }
    }

    /// Best-effort close that always ends in `Disconnected`
    async fn force_recover(&mut self, reason: &str) -> Option<DomainEvent> {
        let was_bound = self.device.is_some() || self.state.is_connected();

        self.detach_listener();
        if let Some(mut device) = self.device.take() {
            device.clear_buffer();
            if let Err(e) = device.disconnect().await {
                warn!(error = %e, "Close failed during forced recovery, dropping device");
            }
        }
        self.buffer.clear();
        self.fail_pending();
        self.state = self.state.to_disconnected();

        if !was_bound {
            return None;
        }
        warn!(reason, "🔌 Printer connection force-recovered");
        self.target
            .clone()
            .map(|target| DomainEvent::printer_disconnected(target, true, reason))
    }
}

/// Owns the connection state machine, command buffer and pending job for one
/// printer. Every operation runs under a single lock, so concurrent callers
/// never interleave device sub-steps.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Mutex<ConnectionInner>>,
    factory: Arc<dyn PrinterDeviceFactory>,
    publisher: Arc<dyn EventPublisher>,
    settings: ConnectionSettings,
}

impl ConnectionManager {
    pub fn new(
        factory: Arc<dyn PrinterDeviceFactory>,
        publisher: Arc<dyn EventPublisher>,
        settings: ConnectionSettings,
    ) -> Self {
        let inner = ConnectionInner {
            state: ConnectionState::Disconnected,
            device: None,
            target: None,
            series: settings.default_series,
            buffer: CommandBuffer::new(settings.trailer),
            pending: None,
            epoch: 0,
            listener: None,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            factory,
            publisher,
            settings,
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Resolve a model name, falling back to the default series
    pub fn resolve_series(&self, model: Option<&str>) -> PrinterSeries {
        match model {
            None => self.settings.default_series,
            Some(name) => PrinterSeries::from_model_name(name).unwrap_or_else(|| {
                warn!(model = %name, fallback = ?self.settings.default_series, "Unknown printer model");
                self.settings.default_series
            }),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Target of the current or most recent connection
    pub async fn target(&self) -> Option<PrinterTarget> {
        self.inner.lock().await.target.clone()
    }

    pub async fn has_pending_job(&self) -> bool {
        self.inner.lock().await.pending.is_some()
    }

    pub async fn buffered_operations(&self) -> usize {
        self.inner.lock().await.buffer.len()
    }

    /// Cached device status, `None` while disconnected
    pub async fn status(&self) -> Option<PrinterStatusSnapshot> {
        let inner = self.inner.lock().await;
        inner.device.as_ref().and_then(|device| device.status())
    }

    /// Open the transport and begin a transaction. Idempotent for the bound target.
    pub async fn ensure_connected(
        &self,
        target: PrinterTarget,
        series: PrinterSeries,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if inner.state.is_connected() {
            return match &inner.target {
                Some(current) if *current == target && inner.state.accepts_content() => {
                    debug!(printer = %target, "Already connected");
                    Ok(())
                }
                Some(current) => Err(PrinterError::AlreadyConnected {
                    current: current.clone(),
                }),
                None => Err(PrinterError::NotConnected),
            };
        }

        let event = self.connect_locked(&mut inner, target, series).await?;
        drop(inner);

        self.publish(event).await;
        Ok(())
    }

    /// Make sure a transaction is open, reconnecting to the last target when
    /// a previous connection was torn down.
    pub async fn ensure_ready(&self) -> Result<()> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.ready_locked(&mut inner, &mut events).await
        };
        self.publish_all(events).await;
        result
    }

    async fn ready_locked(
        &self,
        inner: &mut ConnectionInner,
        events: &mut Vec<DomainEvent>,
    ) -> Result<()> {
        if inner.state.accepts_content() {
            return Ok(());
        }
        let target = match (&inner.target, inner.state) {
            (Some(target), ConnectionState::Disconnected) => target.clone(),
            _ => return Err(PrinterError::NotConnected),
        };

        info!(printer = %target, "🔄 Reconnecting to last printer");
        let series = inner.series;
        events.push(self.connect_locked(inner, target, series).await?);
        Ok(())
    }

    async fn connect_locked(
        &self,
        inner: &mut ConnectionInner,
        target: PrinterTarget,
        series: PrinterSeries,
    ) -> Result<DomainEvent> {
        let mut device = self
            .factory
            .create(series)
            .map_err(PrinterError::DeviceCreation)?;

        info!(printer = %target, series = ?series, "🔌 Connecting to printer...");
        device
            .connect(&target, self.settings.connect_timeout)
            .await
            .map_err(|e| {
                error!(printer = %target, error = %e, "❌ Connection failed");
                PrinterError::Connect(e)
            })?;
        inner.state = inner
            .state
            .to_connected()
            .map_err(|reason| PrinterError::Connect(illegal(reason)))?;

        if let Err(e) = device.begin_transaction().await {
            error!(printer = %target, error = %e, "❌ Beginning transaction failed");
            if let Err(close) = device.disconnect().await {
                warn!(error = %close, "Close after failed transaction also failed");
            }
            inner.state = inner.state.to_disconnected();
            return Err(PrinterError::Transaction(e));
        }
        inner.state = inner
            .state
            .to_in_transaction()
            .map_err(|reason| PrinterError::Transaction(illegal(reason)))?;

        inner.epoch += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        device.set_receive_listener(Some(Box::new(move |event| {
            // Receiver gone means the connection was torn down
            let _ = tx.send(event);
        })));
        let token = CancellationToken::new();
        tokio::spawn(completion_listener(
            Arc::downgrade(&self.inner),
            self.publisher.clone(),
            inner.epoch,
            rx,
            token.clone(),
        ));

        device.clear_buffer();
        inner.device = Some(device);
        inner.listener = Some(token);
        inner.target = Some(target.clone());
        inner.series = series;
        inner.buffer.clear();

        info!(printer = %target, epoch = inner.epoch, "✅ Printer connected");
        Ok(DomainEvent::printer_connected(target))
    }

    /// End the transaction and close the transport.
    ///
    /// A failing step aborts the remaining ones; the call may be retried.
    pub async fn disconnect(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let Some(device) = inner.device.as_mut() else {
            inner.state = inner.state.to_disconnected();
            return Ok(());
        };

        if inner.state.accepts_content() {
            device
                .end_transaction()
                .await
                .map_err(|error| PrinterError::Disconnect {
                    stage: DisconnectStage::EndTransaction,
                    error,
                })?;
            inner.state = inner
                .state
                .to_transaction_ended()
                .map_err(|reason| PrinterError::Disconnect {
                    stage: DisconnectStage::EndTransaction,
                    error: illegal(reason),
                })?;
        }

        device
            .disconnect()
            .await
            .map_err(|error| PrinterError::Disconnect {
                stage: DisconnectStage::Close,
                error,
            })?;

        device.clear_buffer();
        inner.detach_listener();
        inner.device = None;
        inner.buffer.clear();
        inner.fail_pending();
        inner.state = inner.state.to_disconnected();

        let event = inner
            .target
            .clone()
            .map(|target| DomainEvent::printer_disconnected(target, false, "requested"));
        drop(guard);

        info!("🔌 Printer disconnected");
        if let Some(event) = event {
            self.publish(event).await;
        }
        Ok(())
    }

    /// Tear the connection down after a fatal device error. Always ends in
    /// `Disconnected`, even when closing the transport fails.
    pub async fn force_recover(&self, reason: &str) {
        let event = self.inner.lock().await.force_recover(reason).await;
        if let Some(event) = event {
            self.publish(event).await;
        }
    }

    /// Stage one operation on the device and in the command buffer
    pub async fn append(&self, operation: PrintOperation) -> Result<()> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.append_locked(&mut inner, operation, &mut events).await
        };
        self.publish_all(events).await;
        result
    }

    /// Reconnect if needed, stage a whole batch and optionally submit it,
    /// without releasing the lock in between. Concurrent batches never
    /// interleave, and no other submit can send half of one.
    pub async fn append_batch(
        &self,
        operations: Vec<PrintOperation>,
        submit: bool,
    ) -> Result<Option<JobTicket>> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.batch_locked(&mut inner, operations, submit, &mut events)
                .await
        };
        self.publish_all(events).await;
        result
    }

    async fn batch_locked(
        &self,
        inner: &mut ConnectionInner,
        operations: Vec<PrintOperation>,
        submit: bool,
        events: &mut Vec<DomainEvent>,
    ) -> Result<Option<JobTicket>> {
        self.ready_locked(inner, events).await?;
        for operation in operations {
            self.append_locked(inner, operation, events).await?;
        }
        if !submit {
            return Ok(None);
        }
        self.submit_locked(inner, events).await.map(Some)
    }

    async fn append_locked(
        &self,
        inner: &mut ConnectionInner,
        operation: PrintOperation,
        events: &mut Vec<DomainEvent>,
    ) -> Result<()> {
        if !inner.state.accepts_content() {
            return Err(PrinterError::NotConnected);
        }
        let device = inner.device.as_mut().ok_or(PrinterError::NotConnected)?;

        if let Err(e) = device.add_operation(&operation) {
            error!(operation = operation.kind(), error = %e, "❌ Device rejected print data");
            events.extend(inner.force_recover("add operation failed").await);
            return Err(PrinterError::BufferAppend(e));
        }

        inner.buffer.append(operation);
        Ok(())
    }

    /// Send the buffered job. Immediate failures are returned here; the device
    /// outcome is delivered through the returned ticket.
    pub async fn submit(&self) -> Result<JobTicket> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.submit_locked(&mut inner, &mut events).await
        };
        self.publish_all(events).await;
        result
    }

    async fn submit_locked(
        &self,
        inner: &mut ConnectionInner,
        events: &mut Vec<DomainEvent>,
    ) -> Result<JobTicket> {
        if !inner.state.accepts_content() {
            return Err(PrinterError::NotConnected);
        }
        if inner.pending.is_some() {
            return Err(PrinterError::JobAlreadyPending);
        }
        let device = inner.device.as_mut().ok_or(PrinterError::NotConnected)?;

        let status = device.status();
        if !is_printable(status.as_ref()) {
            warn!(status = ?status, "⚠️ Printer not ready, dropping connection");
            events.extend(inner.force_recover("printer not ready").await);
            return Err(PrinterError::PrinterNotReady { status });
        }

        let job = inner.buffer.drain_for_submission();
        let sent = send_job(device.as_mut(), &job, self.settings.send_timeout).await;
        device.clear_buffer();

        if let Err(e) = sent {
            error!(error = %e, "❌ Failed to send print job");
            events.extend(inner.force_recover("send failed").await);
            return Err(PrinterError::SendFailed(e));
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        let (pending, rx) = PendingJob::new(job_id.clone());
        inner.pending = Some(pending);

        // Armed here rather than in the ticket, so a dropped ticket cannot
        // hold the pending slot forever
        if let Some(limit) = self.settings.job_timeout {
            tokio::spawn(job_timer(
                Arc::downgrade(&self.inner),
                self.publisher.clone(),
                job_id.clone(),
                limit,
            ));
        }

        info!(job_id = %job_id, operations = job.len(), "🖨️ Print job sent");
        events.push(DomainEvent::job_submitted(job_id.clone(), job.len()));
        Ok(JobTicket::new(job_id, rx))
    }

    /// Submit and wait for the device outcome
    pub async fn print(&self) -> Result<JobReceipt> {
        self.submit().await?.wait().await
    }

    async fn publish(&self, event: DomainEvent) {
        publish_event(self.publisher.as_ref(), event).await;
    }

    async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(event).await;
        }
    }
}

async fn send_job(
    device: &mut dyn PrinterDevice,
    job: &[PrintOperation],
    timeout: Duration,
) -> std::result::Result<(), DeviceError> {
    device.clear_buffer();
    for operation in job {
        device.add_operation(operation)?;
    }
    device.send_data(timeout).await
}

fn illegal(reason: &str) -> DeviceError {
    DeviceError::new(DeviceErrorStatus::Illegal, reason)
}

async fn publish_event(publisher: &dyn EventPublisher, event: DomainEvent) {
    if let Err(e) = publisher.publish(event).await {
        warn!(error = %e, "Failed to publish printer event");
    }
}

/// Correlates completion signals of one connection epoch with the pending job
async fn completion_listener(
    inner: Weak<Mutex<ConnectionInner>>,
    publisher: Arc<dyn EventPublisher>,
    epoch: u64,
    mut rx: mpsc::UnboundedReceiver<ReceiveEvent>,
    token: CancellationToken,
) {
    debug!(epoch, "Completion listener started");
    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let Some(shared) = inner.upgrade() else {
            break;
        };
        let mut guard = shared.lock().await;
        if guard.epoch != epoch {
            debug!(epoch, current = guard.epoch, code = %event.code, "Ignoring signal from stale connection");
            continue;
        }
        let Some(job) = guard.pending.take() else {
            warn!(code = %event.code, "Completion signal with no pending job, ignored");
            continue;
        };
        drop(guard);

        let job_id = job.id.clone();
        let code = event.code;
        if code.is_success() {
            info!(job_id = %job_id, "✅ Print job completed");
        } else {
            error!(job_id = %job_id, code = %code, "❌ Print job failed");
        }
        job.complete(event);
        publish_event(publisher.as_ref(), DomainEvent::job_completed(job_id, code)).await;
    }
    debug!(epoch, "Completion listener stopped");
}

/// Expires a job that got no completion signal within `limit`
async fn job_timer(
    inner: Weak<Mutex<ConnectionInner>>,
    publisher: Arc<dyn EventPublisher>,
    job_id: String,
    limit: Duration,
) {
    tokio::time::sleep(limit).await;

    let Some(shared) = inner.upgrade() else {
        return;
    };
    let mut guard = shared.lock().await;
    let Some(job) = guard.pending.take_if(|job| job.id == job_id) else {
        return;
    };

    error!(job_id = %job_id, timeout = ?limit, "⏰ Print job timed out");
    job.resolve(Err(PrinterError::JobTimeout(limit)));
    let event = guard.force_recover("job timed out").await;
    drop(guard);

    if let Some(event) = event {
        publish_event(publisher.as_ref(), event).await;
    }
}
