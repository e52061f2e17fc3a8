use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use domain::error::{DeviceError, DeviceErrorStatus};
use domain::printer::{
    CallbackCode, CutMode, Halftone, ImageBlock, ImageMode, PrinterDevice, PrinterDeviceFactory,
    PrinterSeries, PrinterStatusSnapshot, PrinterTarget, ReceiveEvent, ReceiveListener,
    TextStyle,
};

/// Device call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Create,
    Connect,
    BeginTransaction,
    EndTransaction,
    Disconnect,
    AddContent,
    Send,
}

/// One primitive content call as staged in the device buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedCommand {
    Style(TextStyle),
    Text(String),
    Feed(u8),
    Image {
        width: u32,
        height: u32,
        mode: ImageMode,
        halftone: Halftone,
    },
    Cut(CutMode),
}

#[derive(Debug)]
struct SimulatorState {
    faults: HashMap<FaultPoint, DeviceErrorStatus>,
    status: Option<PrinterStatusSnapshot>,
    completion_code: CallbackCode,
    completion_enabled: bool,
    latency: Duration,
    created: Vec<PrinterSeries>,
    connects: Vec<PrinterTarget>,
    disconnects: usize,
    connected: Option<PrinterTarget>,
    in_transaction: bool,
    staged: Vec<SimulatedCommand>,
    sent: Vec<Vec<SimulatedCommand>>,
    jobs_sent: u64,
}

impl Default for SimulatorState {
    fn default() -> Self {
        Self {
            faults: HashMap::new(),
            status: Some(PrinterStatusSnapshot::ready()),
            completion_code: CallbackCode::Success,
            completion_enabled: true,
            latency: Duration::from_millis(200),
            created: Vec::new(),
            connects: Vec::new(),
            disconnects: 0,
            connected: None,
            in_transaction: false,
            staged: Vec::new(),
            sent: Vec::new(),
            jobs_sent: 0,
        }
    }
}

/// Shared control surface over every device created by a [`SimulatedPrinterFactory`].
///
/// Used by the agent's simulated mode and by tests to inject faults and to
/// inspect what reached the "hardware".
#[derive(Clone, Default)]
pub struct SimulatorHandle {
    state: Arc<Mutex<SimulatorState>>,
}

impl SimulatorHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        let handle = Self::new();
        handle.lock().latency = latency;
        handle
    }

    fn lock(&self) -> MutexGuard<'_, SimulatorState> {
        // A panicking test thread must not wedge the simulator
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every call at `point` fail with `status` until cleared
    pub fn inject_fault(&self, point: FaultPoint, status: DeviceErrorStatus) {
        self.lock().faults.insert(point, status);
    }

    pub fn clear_fault(&self, point: FaultPoint) {
        self.lock().faults.remove(&point);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Status reported while connected; `None` simulates a device that never
    /// delivered a status update
    pub fn set_status(&self, status: Option<PrinterStatusSnapshot>) {
        self.lock().status = status;
    }

    pub fn set_completion_code(&self, code: CallbackCode) {
        self.lock().completion_code = code;
    }

    /// When disabled, sent jobs never produce a completion signal
    pub fn set_completion_enabled(&self, enabled: bool) {
        self.lock().completion_enabled = enabled;
    }

    pub fn created_series(&self) -> Vec<PrinterSeries> {
        self.lock().created.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects.len()
    }

    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnects
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected.is_some()
    }

    pub fn in_transaction(&self) -> bool {
        self.lock().in_transaction
    }

    /// Commands currently staged in the device buffer
    pub fn staged(&self) -> Vec<SimulatedCommand> {
        self.lock().staged.clone()
    }

    /// Buffers handed to `send_data`, oldest first
    pub fn sent_jobs(&self) -> Vec<Vec<SimulatedCommand>> {
        self.lock().sent.clone()
    }

    fn check(&self, point: FaultPoint) -> Result<(), DeviceError> {
        match self.lock().faults.get(&point) {
            Some(status) => Err(DeviceError::new(
                *status,
                format!("Simulated {:?} failure", point),
            )),
            None => Ok(()),
        }
    }
}

/// In-memory printer honoring the device capability contract
pub struct SimulatedPrinter {
    series: PrinterSeries,
    handle: SimulatorHandle,
    target: Option<PrinterTarget>,
    listener: Option<Arc<ReceiveListener>>,
}

impl SimulatedPrinter {
    pub fn new(series: PrinterSeries, handle: SimulatorHandle) -> Self {
        Self {
            series,
            handle,
            target: None,
            listener: None,
        }
    }

    pub fn series(&self) -> PrinterSeries {
        self.series
    }

    fn require_connected(&self) -> Result<(), DeviceError> {
        if self.target.is_none() {
            return Err(DeviceError::new(
                DeviceErrorStatus::Illegal,
                "Printer is not connected",
            ));
        }
        Ok(())
    }

    fn stage(&mut self, command: SimulatedCommand) -> Result<(), DeviceError> {
        self.handle.check(FaultPoint::AddContent)?;
        self.handle.lock().staged.push(command);
        Ok(())
    }
}

#[async_trait]
impl PrinterDevice for SimulatedPrinter {
    async fn connect(
        &mut self,
        target: &PrinterTarget,
        _timeout: Duration,
    ) -> Result<(), DeviceError> {
        if self.target.is_some() {
            return Err(DeviceError::new(
                DeviceErrorStatus::Illegal,
                "Device already opened",
            ));
        }
        self.handle.check(FaultPoint::Connect)?;

        let mut state = self.handle.lock();
        state.connects.push(target.clone());
        state.connected = Some(target.clone());
        drop(state);

        self.target = Some(target.clone());
        tracing::info!(printer = %target, series = ?self.series, "Simulated printer connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DeviceError> {
        self.handle.check(FaultPoint::Disconnect)?;

        let mut state = self.handle.lock();
        state.disconnects += 1;
        state.connected = None;
        state.in_transaction = false;
        drop(state);

        if let Some(target) = self.target.take() {
            tracing::info!(printer = %target, "Simulated printer disconnected");
        }
        Ok(())
    }

    async fn begin_transaction(&mut self) -> Result<(), DeviceError> {
        self.require_connected()?;
        self.handle.check(FaultPoint::BeginTransaction)?;
        self.handle.lock().in_transaction = true;
        Ok(())
    }

    async fn end_transaction(&mut self) -> Result<(), DeviceError> {
        self.require_connected()?;
        self.handle.check(FaultPoint::EndTransaction)?;
        self.handle.lock().in_transaction = false;
        Ok(())
    }

    fn add_text_style(&mut self, style: &TextStyle) -> Result<(), DeviceError> {
        self.stage(SimulatedCommand::Style(*style))
    }

    fn add_text(&mut self, text: &str) -> Result<(), DeviceError> {
        self.stage(SimulatedCommand::Text(text.to_string()))
    }

    fn add_feed_line(&mut self, lines: u8) -> Result<(), DeviceError> {
        self.stage(SimulatedCommand::Feed(lines))
    }

    fn add_image(&mut self, image: &ImageBlock) -> Result<(), DeviceError> {
        self.stage(SimulatedCommand::Image {
            width: image.bitmap.width(),
            height: image.bitmap.height(),
            mode: image.mode,
            halftone: image.halftone,
        })
    }

    fn add_cut(&mut self, mode: CutMode) -> Result<(), DeviceError> {
        self.stage(SimulatedCommand::Cut(mode))
    }

    async fn send_data(&mut self, _timeout: Duration) -> Result<(), DeviceError> {
        self.require_connected()?;
        self.handle.check(FaultPoint::Send)?;

        let (job_id, event, latency) = {
            let mut state = self.handle.lock();
            let job = state.staged.clone();
            state.sent.push(job);
            state.jobs_sent += 1;

            let event = ReceiveEvent {
                code: state.completion_code,
                status: state.status.unwrap_or_default(),
                device_job_id: Some(format!("sim-{}", state.jobs_sent)),
            };
            (state.jobs_sent, state.completion_enabled.then_some(event), state.latency)
        };

        tracing::debug!(job_id, "Simulated printer accepted job");

        if let (Some(event), Some(listener)) = (event, self.listener.clone()) {
            tokio::spawn(async move {
                tokio::time::sleep(latency).await;
                listener(event);
            });
        }
        Ok(())
    }

    fn clear_buffer(&mut self) {
        self.handle.lock().staged.clear();
    }

    fn status(&self) -> Option<PrinterStatusSnapshot> {
        self.target.as_ref()?;
        self.handle.lock().status
    }

    fn set_receive_listener(&mut self, listener: Option<ReceiveListener>) {
        self.listener = listener.map(Arc::new);
    }
}

/// Creates [`SimulatedPrinter`] instances that share one [`SimulatorHandle`]
#[derive(Clone, Default)]
pub struct SimulatedPrinterFactory {
    handle: SimulatorHandle,
}

impl SimulatedPrinterFactory {
    pub fn new(handle: SimulatorHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> SimulatorHandle {
        self.handle.clone()
    }
}

impl PrinterDeviceFactory for SimulatedPrinterFactory {
    fn create(&self, series: PrinterSeries) -> Result<Box<dyn PrinterDevice>, DeviceError> {
        self.handle.check(FaultPoint::Create)?;
        self.handle.lock().created.push(series);
        Ok(Box::new(SimulatedPrinter::new(series, self.handle.clone())))
    }
}
