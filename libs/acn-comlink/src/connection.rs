//! ACN Connection Management
//!
//! [`Connection`] owns the master for one serial port and keeps the logical
//! session alive across link drops. It is a single-task state machine:
//! requests and lifecycle transitions happen on the caller's task, and
//! [`Connection::next_event`] drives transport events and the reconnect
//! timer.
//!
//! At most one reconnect timer exists at a time. It is started when an open
//! session is lost and taken exactly once, on the reopen that succeeds.

use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::command::{
    ping_payload, scan_payload, Command, CommandReply, PingReply, ScanType, SlaveId, UNLOCK_KEY,
};
use crate::config::AcnConfig;
use crate::error::{AcnError, Result};
use crate::logger::PortLogger;
use crate::map::RegisterMap;
use crate::objects::{decode_scan_result, FactoryConfig, NetworkStatus, ObjectValue, ScanEntry};
use crate::register::{AddressSpace, Register};
use crate::state::{ConnectionEvent, ConnectionState, Diagnostics};
use crate::transport::{AcnMaster, MasterRequest, MasterResponse, TransportEvent};

/// Default reopen interval
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(1000);

/// FIFO holding firmware debug text
const DEBUG_FIFO: u8 = 0;
const DEBUG_FIFO_MAX: u8 = 50;

/// Capacity of the front-end notification channel
const EVENT_CAPACITY: usize = 64;

/// Per-connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub port_name: String,
    pub reconnect_interval: Duration,
}

impl ConnectionOptions {
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }
}

impl From<&AcnConfig> for ConnectionOptions {
    fn from(config: &AcnConfig) -> Self {
        Self::new(config.port.name.clone())
            .with_reconnect_interval(Duration::from_millis(config.reconnect_interval_ms))
    }
}

/// What woke the driver loop
enum Wake {
    Transport(Option<TransportEvent>),
    Tick,
}

async fn recv_event(rx: &mut Option<mpsc::UnboundedReceiver<TransportEvent>>) -> Option<TransportEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        },
        None => std::future::pending().await,
    }
}

/// Logical session with one ACN device
pub struct Connection<M: AcnMaster> {
    master: M,
    options: ConnectionOptions,
    state: ConnectionState,
    transport_events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    reconnect_timer: Option<Interval>,
    notify: broadcast::Sender<ConnectionEvent>,
    map: RegisterMap,
    diagnostics: Diagnostics,
    logger: PortLogger,
}

impl<M: AcnMaster> Connection<M> {
    pub fn new(master: M, options: ConnectionOptions) -> Self {
        let (notify, _) = broadcast::channel(EVENT_CAPACITY);
        let logger = PortLogger::new(options.port_name.clone());
        Self {
            master,
            options,
            state: ConnectionState::Closed,
            transport_events: None,
            reconnect_timer: None,
            notify,
            map: RegisterMap::acn(),
            diagnostics: Diagnostics::default(),
            logger,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.options.port_name
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// True while a reconnect timer is running
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    /// Registers holding the last values read or written
    pub fn map(&self) -> &RegisterMap {
        &self.map
    }

    /// Receive lifecycle notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.notify.subscribe()
    }

    pub fn master(&self) -> &M {
        &self.master
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn set_state(&mut self, new_state: ConnectionState, reason: &str) {
        if self.state != new_state {
            self.logger.log_status(self.state, new_state, reason);
            self.state = new_state;
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        // No receivers is fine
        let _ = self.notify.send(event);
    }

    fn record_error(&mut self, err: &AcnError) {
        self.diagnostics.errors += 1;
        self.diagnostics.last_error = Some(err.to_string());
    }

    /// Open the port and attach to its events
    ///
    /// Fails with `InvalidState` unless the connection is `Closed`.
    pub async fn open(&mut self) -> Result<()> {
        if self.state != ConnectionState::Closed {
            return Err(AcnError::invalid_state(format!(
                "open() while {}",
                self.state
            )));
        }

        self.set_state(ConnectionState::Opening, "open requested");
        self.logger.log_connect("opening");
        self.transport_events = Some(self.master.subscribe());

        match self.master.open().await {
            Ok(()) => {
                self.set_state(ConnectionState::Open, "port opened");
                self.emit(ConnectionEvent::Connected);
                Ok(())
            },
            Err(e) => {
                error!("Open {}: {}", self.options.port_name, e);
                self.transport_events = None;
                self.set_state(ConnectionState::Closed, "open failed");
                self.record_error(&e);
                self.emit(ConnectionEvent::Error(e.to_string()));
                Err(match e {
                    AcnError::Open(_) => e,
                    other => AcnError::open(other.to_string()),
                })
            },
        }
    }

    /// Close the port; the session moves to `Reconnecting`
    pub async fn close(&mut self) -> Result<()> {
        if !self.state.is_open() {
            return Err(AcnError::invalid_state(format!(
                "close() while {}",
                self.state
            )));
        }
        if let Err(e) = self.master.close().await {
            warn!("Close {}: {}", self.options.port_name, e);
        }
        self.begin_reconnect("closed").await;
        Ok(())
    }

    /// Tear down: timer cleared, transport closed, terminal `Closed`
    pub async fn shutdown(&mut self) {
        self.clear_reconnect_timer();
        let was = self.state;
        if was.is_open() {
            if let Err(e) = self.master.close().await {
                warn!("Close {}: {}", self.options.port_name, e);
            }
        }
        self.transport_events = None;
        self.set_state(ConnectionState::Closed, "shutdown");
        if was != ConnectionState::Closed {
            self.emit(ConnectionEvent::Disconnected);
        }
    }

    /// Wait for the next lifecycle change
    ///
    /// Handles transport events and reconnect ticks, returning the event
    /// broadcast to front-ends. Returns `None` once there is nothing left to
    /// wait for (closed, no transport attached).
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        loop {
            if self.transport_events.is_none() && self.reconnect_timer.is_none() {
                return None;
            }

            let wake = tokio::select! {
                biased;
                event = recv_event(&mut self.transport_events) => Wake::Transport(event),
                _ = tick(&mut self.reconnect_timer) => Wake::Tick,
            };

            let produced = match wake {
                Wake::Transport(Some(event)) => self.handle_transport_event(event).await,
                Wake::Transport(None) => {
                    debug!("Transport events closed: {}", self.options.port_name);
                    self.transport_events = None;
                    if self.state.is_open() {
                        self.begin_reconnect("transport gone").await;
                        Some(ConnectionEvent::Disconnected)
                    } else {
                        None
                    }
                },
                Wake::Tick => Some(self.attempt_reopen().await),
            };

            if produced.is_some() {
                return produced;
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) -> Option<ConnectionEvent> {
        debug!("Transport {}: {}", self.options.port_name, event);
        match event {
            TransportEvent::Open => None,
            TransportEvent::Error(msg) => {
                self.record_error(&AcnError::transport(msg.clone()));
                let event = ConnectionEvent::Error(msg);
                self.emit(event.clone());
                Some(event)
            },
            TransportEvent::Close | TransportEvent::Disconnected => {
                if !self.state.is_open() {
                    // already reconnecting, or never opened
                    return None;
                }
                self.begin_reconnect(&event.to_string()).await;
                Some(ConnectionEvent::Disconnected)
            },
        }
    }

    /// Open session lost: notify, re-attach to the transport, start the timer
    async fn begin_reconnect(&mut self, reason: &str) {
        self.set_state(ConnectionState::Reconnecting, reason);
        self.emit(ConnectionEvent::Disconnected);

        // let the transport settle its new physical handle first
        tokio::task::yield_now().await;
        self.transport_events = Some(self.master.subscribe());

        if self.reconnect_timer.is_none() {
            let period = self.options.reconnect_interval;
            let mut timer = time::interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.reconnect_timer = Some(timer);
            self.diagnostics.reconnect_timers_started += 1;
            info!(
                "Reconnect {} every {}ms",
                self.options.port_name,
                period.as_millis()
            );
        }
    }

    fn clear_reconnect_timer(&mut self) {
        if self.reconnect_timer.take().is_some() {
            self.diagnostics.reconnect_timers_cleared += 1;
        }
    }

    async fn attempt_reopen(&mut self) -> ConnectionEvent {
        self.diagnostics.reopen_attempts += 1;
        self.emit(ConnectionEvent::Reopening);
        self.logger.log_retry(
            self.diagnostics.reopen_attempts,
            self.options.reconnect_interval.as_millis() as u64,
            "reopening",
        );

        match self.master.open().await {
            Ok(()) => {
                self.clear_reconnect_timer();
                if self.transport_events.is_none() {
                    // the stream ended while reconnecting
                    self.transport_events = Some(self.master.subscribe());
                }
                self.set_state(ConnectionState::Open, "reopened");
                self.emit(ConnectionEvent::Connected);
                ConnectionEvent::Connected
            },
            Err(e) => {
                debug!("Reopen {}: {}", self.options.port_name, e);
                ConnectionEvent::Reopening
            },
        }
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Issue exactly one transaction and normalize exceptions into errors
    async fn transact(&mut self, request: MasterRequest) -> Result<MasterResponse> {
        if !self.state.is_open() {
            return Err(AcnError::NotConnected);
        }

        let kind = request.kind();
        self.diagnostics.requests += 1;
        self.logger.log_tx(kind, request.payload());

        let result = match self.master.request(request).await {
            Ok(MasterResponse {
                exception_code: Some(code),
                ..
            }) => Err(AcnError::Exception { code }),
            other => other,
        };

        match &result {
            Ok(response) => {
                self.logger
                    .log_rx(kind, response.values.as_deref().unwrap_or_default());
            },
            Err(e) => {
                warn!("{} {}: {}", kind, self.options.port_name, e);
                self.record_error(e);
            },
        }
        result
    }

    fn values_of(response: MasterResponse) -> Result<Bytes> {
        response
            .values
            .ok_or_else(|| AcnError::data_integrity("Response carried no values"))
    }

    /// Device identity
    pub async fn get_slave_id(&mut self) -> Result<SlaveId> {
        let response = self.transact(MasterRequest::ReportSlaveId).await?;
        SlaveId::decode(&Self::values_of(response)?)
    }

    /// Firmware debug text
    pub async fn get_debug(&mut self) -> Result<String> {
        let response = self
            .transact(MasterRequest::ReadFifo8 {
                id: DEBUG_FIFO,
                max: DEBUG_FIFO_MAX,
            })
            .await?;
        let values = Self::values_of(response)?;
        Ok(String::from_utf8_lossy(&values)
            .trim_end_matches('\0')
            .to_string())
    }

    /// Read a register or object by name, populating its stored value
    pub async fn read(&mut self, name: &str) -> Result<&Register> {
        let (space, address, length) = {
            let reg = self.lookup(name)?;
            (reg.space(), reg.address(), reg.length())
        };

        let request = match space {
            AddressSpace::Holding => MasterRequest::ReadRegisters {
                address,
                count: length,
            },
            AddressSpace::Object => MasterRequest::ReadObject { id: address as u8 },
        };
        let values = Self::values_of(self.transact(request).await?)?;

        let decoded = self.lookup_mut(name)?.from_buffer(&values);
        if let Err(e) = decoded {
            self.record_error(&e);
            return Err(e);
        }
        self.lookup(name)
    }

    /// Encode a host value into a register and write it to the device
    ///
    /// Validation happens before anything is sent. The stored value only
    /// changes when the device accepts the write.
    pub async fn write(&mut self, name: &str, value: &Value) -> Result<&Register> {
        let reg = self.lookup_mut(name)?;
        if !reg.is_writable() {
            return Err(AcnError::ReadOnly(name.to_string()));
        }
        let previous = reg.clone();
        reg.unformat(value)?;
        let (space, address) = (reg.space(), reg.address());
        let buffer = match reg.to_buffer() {
            Ok(buffer) => Bytes::from(buffer),
            Err(e) => {
                *reg = previous;
                return Err(e);
            },
        };

        let request = match space {
            AddressSpace::Holding => MasterRequest::WriteRegisters {
                address,
                values: buffer,
            },
            AddressSpace::Object => MasterRequest::WriteObject {
                id: address as u8,
                values: buffer,
            },
        };
        let outcome = self
            .transact(request)
            .await
            .and_then(|response| Self::check_status(&response));
        if let Err(e) = outcome {
            if let Some(reg) = self.map.get_mut(name) {
                *reg = previous;
            }
            return Err(e);
        }
        self.lookup(name)
    }

    fn check_status(response: &MasterResponse) -> Result<()> {
        match response.status {
            Some(status) if status != 0 => Err(AcnError::WriteRejected { status }),
            _ => Ok(()),
        }
    }

    fn lookup(&self, name: &str) -> Result<&Register> {
        self.map
            .get(name)
            .ok_or_else(|| AcnError::invalid_argument(format!("Unknown register '{}'", name)))
    }

    fn lookup_mut(&mut self, name: &str) -> Result<&mut Register> {
        self.map
            .get_mut(name)
            .ok_or_else(|| AcnError::invalid_argument(format!("Unknown register '{}'", name)))
    }

    /// Factory identity; `None` when the device is unprogrammed
    pub async fn get_factory_config(&mut self) -> Result<Option<FactoryConfig>> {
        match self.read("factoryConfig").await?.object_value() {
            Some(ObjectValue::Factory(config)) => Ok(config.clone()),
            _ => Err(AcnError::data_integrity("Unexpected factory object")),
        }
    }

    /// Program factory identity into non-volatile memory
    pub async fn set_factory_config(&mut self, config: &FactoryConfig) -> Result<()> {
        let value = serde_json::to_value(config)?;
        self.write("factoryConfig", &value).await?;
        info!("Factory config written: {}", config.mac_address);
        Ok(())
    }

    pub async fn get_network_status(&mut self) -> Result<NetworkStatus> {
        match self.read("networkStatus").await?.object_value() {
            Some(ObjectValue::Network(status)) => Ok(status.clone()),
            _ => Err(AcnError::data_integrity("Unexpected network status object")),
        }
    }

    /// Resolve a command name and send it
    pub async fn command(&mut self, name: &str, payload: &[u8]) -> Result<CommandReply> {
        let command: Command = name.parse()?;
        self.send_command(command, payload).await
    }

    pub async fn send_command(&mut self, command: Command, payload: &[u8]) -> Result<CommandReply> {
        let response = self
            .transact(MasterRequest::Command {
                code: command.code(),
                payload: Bytes::copy_from_slice(payload),
            })
            .await?;
        Ok(CommandReply {
            command,
            values: response.values.unwrap_or_default(),
        })
    }

    /// Run a network scan; the reply carries scan-result entries
    pub async fn scan(&mut self, scan_type: ScanType, duration: u8) -> Result<Vec<ScanEntry>> {
        let reply = self
            .send_command(Command::Scan, &scan_payload(scan_type, duration))
            .await?;
        if let Some(reg) = self.map.get_mut("scanResult") {
            reg.from_buffer(&reply.values)?;
        }
        Ok(decode_scan_result(&reply.values))
    }

    /// Ping a remote station by short address
    pub async fn ping(&mut self, address: u16) -> Result<PingReply> {
        let reply = self
            .send_command(Command::Ping, &ping_payload(address))
            .await?;
        PingReply::decode(&reply.values)
    }

    pub async fn unlock(&mut self) -> Result<CommandReply> {
        self.send_command(Command::Unlock, &UNLOCK_KEY).await
    }

    pub async fn reset(&mut self) -> Result<CommandReply> {
        self.send_command(Command::Reset, &[]).await
    }

    pub async fn save(&mut self) -> Result<CommandReply> {
        self.send_command(Command::Save, &[]).await
    }

    pub async fn restore(&mut self) -> Result<CommandReply> {
        self.send_command(Command::Restore, &[]).await
    }

    pub async fn pair(&mut self) -> Result<CommandReply> {
        self.send_command(Command::Pair, &[]).await
    }

    pub async fn clear(&mut self) -> Result<CommandReply> {
        self.send_command(Command::Clear, &[]).await
    }

    pub async fn broadcast(&mut self, payload: &[u8]) -> Result<CommandReply> {
        self.send_command(Command::Broadcast, payload).await
    }
}
