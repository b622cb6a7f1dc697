//! In-memory control plane that replays a fixed script of upstream payloads.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::Notify;

use crate::control::{ControlPlane, ControlPlaneError, ControlResult};

type CloseHook = Box<dyn Fn() -> bool + Send>;

#[derive(Default)]
struct Script {
    upstream: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    drain: bool,
    closed: bool,
    remote_closed: bool,
    close_hook: Option<CloseHook>,
    closed_with: Option<bool>,
}

/// Clones share state, so a test keeps one as a probe after handing the
/// other to the code under test.
#[derive(Clone, Default)]
pub(crate) struct ScriptedControlPlane {
    script: Arc<Mutex<Script>>,
    wake: Arc<Notify>,
}

impl ScriptedControlPlane {
    pub(crate) fn new(upstream: impl IntoIterator<Item = Vec<u8>>) -> Self {
        let plane = Self::default();
        plane.lock().upstream.extend(upstream);
        plane
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    pub(crate) fn is_draining(&self) -> bool {
        self.lock().drain
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Run `hook` when `close` is called and keep what it returned.
    pub(crate) fn on_close(&self, hook: impl Fn() -> bool + Send + 'static) {
        self.lock().close_hook = Some(Box::new(hook));
    }

    /// What the close hook returned, if `close` ran with one installed.
    pub(crate) fn closed_with(&self) -> Option<bool> {
        self.lock().closed_with
    }

    /// Simulate the controller hanging up once the script runs out.
    pub(crate) fn close_remote(&self) {
        self.lock().remote_closed = true;
        self.wake.notify_waiters();
    }
}

impl ControlPlane for ScriptedControlPlane {
    async fn send(&mut self, payload: Vec<u8>) -> ControlResult<()> {
        let mut script = self.lock();
        if script.closed {
            return Err(ControlPlaneError::Closed);
        }
        script.sent.push(payload);
        Ok(())
    }

    async fn recv(&mut self) -> ControlResult<Bytes> {
        loop {
            let wake = self.wake.notified();
            {
                let mut script = self.lock();
                if script.closed {
                    return Err(ControlPlaneError::Closed);
                }
                if let Some(payload) = script.upstream.pop_front() {
                    return Ok(Bytes::from(payload));
                }
                if script.remote_closed {
                    return Err(ControlPlaneError::Closed);
                }
            }
            wake.await;
        }
    }

    fn set_drain_mode(&mut self, drain: bool) {
        self.lock().drain = drain;
    }

    async fn close(&mut self) -> ControlResult<()> {
        let mut script = self.lock();
        let observed = script.close_hook.as_ref().map(|hook| hook());
        if observed.is_some() {
            script.closed_with = observed;
        }
        script.closed = true;
        drop(script);
        self.wake.notify_waiters();
        Ok(())
    }
}
