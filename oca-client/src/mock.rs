//! Mock transport for testing and offline development.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::{ClientError, Result};
use crate::transport::{CallArg, Transport};

/// A call seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: String,
    pub args: Vec<CallArg>,
}

/// Mock transport.
///
/// Responses are scripted per method name and consumed in order; the last
/// response of a method is repeated once its queue is down to one. Every
/// call is recorded so tests can assert on method names and argument order.
pub struct MockTransport {
    responses: RwLock<HashMap<String, VecDeque<Result<String>>>>,
    calls: RwLock<Vec<RecordedCall>>,
}

impl MockTransport {
    /// Create a mock with no scripted responses.
    pub fn new() -> Self {
        info!("Creating mock transport");
        Self {
            responses: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Script a successful body for `method`.
    pub fn respond(&self, method: &str, body: impl Into<String>) -> &Self {
        self.push(method, Ok(body.into()));
        self
    }

    /// Script a fault for `method`.
    pub fn fail(&self, method: &str, message: impl Into<String>) -> &Self {
        self.push(method, Err(ClientError::Transport(message.into())));
        self
    }

    fn push(&self, method: &str, response: Result<String>) {
        let mut responses = self.responses.write().unwrap_or_else(|poisoned| {
            warn!(method = %method, "Response script lock poisoned, recovering");
            poisoned.into_inner()
        });
        responses
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// The most recent call.
    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.read().ok().and_then(|c| c.last().cloned())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    #[instrument(skip(self, args), fields(method = %method, args = args.len()))]
    async fn call(&self, method: &str, args: Vec<CallArg>) -> Result<String> {
        debug!("Mock call");

        self.calls
            .write()
            .map_err(|_| ClientError::Transport("Lock poisoned".to_string()))?
            .push(RecordedCall {
                method: method.to_string(),
                args,
            });

        let mut responses = self
            .responses
            .write()
            .map_err(|_| ClientError::Transport("Lock poisoned".to_string()))?;

        let queue = responses.get_mut(method).ok_or_else(|| {
            ClientError::Transport(format!("[{}] no response scripted", method))
        })?;

        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().map(clone_response)
        };

        response.unwrap_or_else(|| {
            Err(ClientError::Transport(format!(
                "[{}] no response scripted",
                method
            )))
        })
    }
}

fn clone_response(response: &Result<String>) -> Result<String> {
    match response {
        Ok(body) => Ok(body.clone()),
        Err(ClientError::Transport(message)) => Err(ClientError::Transport(message.clone())),
        Err(e) => Err(ClientError::Transport(e.to_string())),
    }
}
