use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::{Credentials, OperationResult, Turn, UpstreamClient};

enum Behaviour {
    Reply(OperationResult),
    Fault,
    Panic,
}

/// Upstream stand-in that records every call and answers with a fixed reply.
pub struct RecordingUpstream {
    behaviour: Behaviour,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, Vec<Turn>)>>,
}

impl RecordingUpstream {
    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: OperationResult) -> Self {
        Self::with_behaviour(Behaviour::Reply(reply))
    }

    /// Every call returns an unexpected fault.
    pub fn faulting() -> Self {
        Self::with_behaviour(Behaviour::Fault)
    }

    /// Every call panics inside the request handler.
    pub fn panicking() -> Self {
        Self::with_behaviour(Behaviour::Panic)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(String, Vec<Turn>)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamClient for RecordingUpstream {
    async fn converse(
        &self,
        message: &str,
        history: &[Turn],
        _credentials: &Credentials,
    ) -> Result<OperationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((message.to_string(), history.to_vec()));
        match &self.behaviour {
            Behaviour::Reply(reply) => Ok(reply.clone()),
            Behaviour::Fault => Err(Error::platform("connection pool poisoned")),
            Behaviour::Panic => panic!("upstream stand-in panicked"),
        }
    }

    fn get_provider_name(&self) -> &str {
        "recording"
    }
}
