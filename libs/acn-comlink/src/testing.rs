//! Mock master for testing
//!
//! Provides a scriptable [`AcnMaster`] without a serial port. The test keeps a
//! [`MockHandle`] to queue results, raise transport events and inspect what
//! was sent after the master has moved into a [`Connection`](crate::Connection).

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{AcnError, Result};
use crate::transport::{AcnMaster, MasterRequest, MasterResponse, TransportEvent};

#[derive(Debug, Default)]
struct MockState {
    /// Results for successive `open()` calls (empty = success)
    open_results: VecDeque<Result<()>>,
    /// Results for successive requests (empty = timeout)
    responses: VecDeque<Result<MasterResponse>>,
    requests: Vec<MasterRequest>,
    open_calls: u32,
    close_calls: u32,
    subscribe_calls: u32,
    event_tx: Option<mpsc::UnboundedSender<TransportEvent>>,
}

/// Scriptable master
#[derive(Debug)]
pub struct MockMaster {
    state: Arc<Mutex<MockState>>,
}

/// Test-side view of a [`MockMaster`]
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockMaster {
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHandle { state },
        )
    }
}

#[async_trait]
impl AcnMaster for MockMaster {
    async fn open(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.open_calls += 1;
        state.open_results.pop_front().unwrap_or(Ok(()))
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().close_calls += 1;
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TransportEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.subscribe_calls += 1;
        state.event_tx = Some(tx);
        rx
    }

    async fn request(&mut self, request: MasterRequest) -> Result<MasterResponse> {
        let mut state = self.state.lock();
        debug!("Mock request: {:?}", request);
        state.requests.push(request);
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(AcnError::timeout("No mock response queued")))
    }
}

impl MockHandle {
    /// Make the next `n` opens fail
    pub fn queue_open_failures(&self, n: usize) {
        let mut state = self.state.lock();
        for _ in 0..n {
            state
                .open_results
                .push_back(Err(AcnError::open("Port unavailable")));
        }
    }

    pub fn queue_response(&self, response: MasterResponse) {
        self.state.lock().responses.push_back(Ok(response));
    }

    pub fn queue_values(&self, values: impl Into<Bytes>) {
        self.queue_response(MasterResponse::with_values(values));
    }

    pub fn queue_exception(&self, code: u8) {
        self.queue_response(MasterResponse::exception(code));
    }

    pub fn queue_error(&self, error: AcnError) {
        self.state.lock().responses.push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<MasterRequest> {
        self.state.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    pub fn open_calls(&self) -> u32 {
        self.state.lock().open_calls
    }

    pub fn close_calls(&self) -> u32 {
        self.state.lock().close_calls
    }

    pub fn subscribe_calls(&self) -> u32 {
        self.state.lock().subscribe_calls
    }

    /// Raise a transport event on the current handle
    ///
    /// Returns false when nobody is listening.
    pub fn emit(&self, event: TransportEvent) -> bool {
        match &self.state.lock().event_tx {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Drop the physical link
    pub fn disconnect(&self) -> bool {
        self.emit(TransportEvent::Disconnected)
    }

    /// Drop the event sender, as a master does when its handle goes away
    pub fn drop_events(&self) {
        self.state.lock().event_tx = None;
    }
}
