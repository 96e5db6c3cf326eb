use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::detect::engine::{InferenceEngine, Observation, ScaleMode};
use crate::frame::ImageHandle;

enum Reply {
    Observations(Vec<Observation>),
    Error(String),
    Panic(String),
}

/// Engine that replays canned replies in order.
///
/// Once the script runs out, every call returns no observations.
pub struct ScriptedEngine {
    replies: VecDeque<Reply>,
    warm_up_error: Option<String>,
    scale_log: Arc<Mutex<Vec<ScaleMode>>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            replies: VecDeque::new(),
            warm_up_error: None,
            scale_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn then_observations(mut self, observations: Vec<Observation>) -> Self {
        self.replies.push_back(Reply::Observations(observations));
        self
    }

    pub fn then_error<S: Into<String>>(mut self, message: S) -> Self {
        self.replies.push_back(Reply::Error(message.into()));
        self
    }

    /// Make the matching call panic, as a buggy engine would.
    pub fn then_panic<S: Into<String>>(mut self, message: S) -> Self {
        self.replies.push_back(Reply::Panic(message.into()));
        self
    }

    pub fn failing_warm_up<S: Into<String>>(mut self, message: S) -> Self {
        self.warm_up_error = Some(message.into());
        self
    }

    /// Shared record of the scale mode requested on each call.
    pub fn scale_log(&self) -> Arc<Mutex<Vec<ScaleMode>>> {
        self.scale_log.clone()
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn infer(&mut self, _image: &ImageHandle, scale: ScaleMode) -> Result<Vec<Observation>> {
        self.scale_log
            .lock()
            .map_err(|_| anyhow!("scale log lock poisoned"))?
            .push(scale);

        match self.replies.pop_front() {
            Some(Reply::Observations(observations)) => Ok(observations),
            Some(Reply::Error(message)) => Err(anyhow!(message)),
            Some(Reply::Panic(message)) => panic!("{}", message),
            None => Ok(Vec::new()),
        }
    }

    fn warm_up(&mut self) -> Result<()> {
        match &self.warm_up_error {
            Some(message) => Err(anyhow!("warm-up failed: {}", message)),
            None => Ok(()),
        }
    }
}
