//! The AI fill workflow: one background request at a time, results handed
//! back to whichever thread owns the answer area.

use crate::libmondai::ai::{parse_reply, AiError, AiReply, VisionClient, VisionRequest};
use crate::libmondai::kotae::AnswerArea;
use log::{debug, info, warn};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiFillState {
    Idle,
    Requesting,
    Succeeded,
    Failed,
}

/// Reasons a fill cannot even start. None of them touch the network.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AiFillError {
    #[error("An AI request is already running")]
    Busy,
    #[error("Please enter an AI key")]
    MissingCredential,
    #[error("This problem has no image, AI answering is unavailable")]
    NoImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiFillOutcome {
    Filled(AiReply),
    NoUsableAnswer,
    ParseFailed(String),
    CallFailed(String),
}

impl AiFillOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AiFillOutcome::Filled(_))
    }

    pub fn notice(&self) -> String {
        match self {
            AiFillOutcome::Filled(_) => {
                String::from("AI answering complete, press Confirm to save the answers")
            }
            AiFillOutcome::NoUsableAnswer => String::from("The AI returned no usable answer"),
            AiFillOutcome::ParseFailed(detail) => {
                format!("Failed to parse the AI reply: {detail}")
            }
            AiFillOutcome::CallFailed(detail) => format!("AI answering failed: {detail}"),
        }
    }
}

pub struct AiFill<C: VisionClient> {
    client: Arc<C>,
    state: AiFillState,
    pending: Option<Receiver<Result<AiReply, AiError>>>,
}

impl<C: VisionClient> AiFill<C> {
    pub fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
            state: AiFillState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> AiFillState {
        self.state
    }

    pub fn is_requesting(&self) -> bool {
        self.state == AiFillState::Requesting
    }

    pub fn reset(&mut self) {
        if !self.is_requesting() {
            self.state = AiFillState::Idle;
        }
    }

    /// Spawns the worker for one request. `on_complete` runs on the worker
    /// after the result has been posted, so a UI can wake up and `poll`.
    pub fn start<F>(
        &mut self,
        credential: &str,
        image: Option<&Path>,
        on_complete: F,
    ) -> Result<(), AiFillError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_requesting() {
            return Err(AiFillError::Busy);
        }
        if credential.is_empty() {
            return Err(AiFillError::MissingCredential);
        }
        let image = match image {
            Some(path) if path.exists() => path.to_path_buf(),
            _ => {
                info!("[AI] No usable image, skipping request");
                return Err(AiFillError::NoImage);
            }
        };

        let request = VisionRequest {
            credential: credential.to_string(),
            image,
        };
        let client = Arc::clone(&self.client);
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            debug!("[AI] Worker asking about {:?}", request.image);
            let result = client.ask(&request).and_then(|text| parse_reply(&text));
            if tx.send(result).is_err() {
                debug!("[AI] Dialog went away before the reply arrived, dropping it");
            }
            on_complete();
        });

        self.pending = Some(rx);
        self.state = AiFillState::Requesting;
        info!("[AI] Request started");
        Ok(())
    }

    /// Non-blocking check for a finished request. Applies a reply to `area`
    /// and settles the state when one is there.
    pub fn poll(&mut self, area: Option<&mut AnswerArea>) -> Option<AiFillOutcome> {
        let rx = self.pending.as_ref()?;
        let message = match rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => None,
        };
        Some(self.settle(message, area))
    }

    /// Blocks until the running request finishes.
    pub fn wait(&mut self, area: Option<&mut AnswerArea>) -> Option<AiFillOutcome> {
        let rx = self.pending.as_ref()?;
        let message = rx.recv().ok();
        Some(self.settle(message, area))
    }

    fn settle(
        &mut self,
        message: Option<Result<AiReply, AiError>>,
        area: Option<&mut AnswerArea>,
    ) -> AiFillOutcome {
        self.pending = None;
        let outcome = match message {
            Some(Ok(reply)) => apply_reply(reply, area),
            Some(Err(AiError::ReplyParse(err))) => AiFillOutcome::ParseFailed(err.to_string()),
            Some(Err(err)) => AiFillOutcome::CallFailed(err.to_string()),
            None => AiFillOutcome::CallFailed(String::from("the AI worker stopped unexpectedly")),
        };
        self.state = if outcome.is_success() {
            AiFillState::Succeeded
        } else {
            AiFillState::Failed
        };
        match &outcome {
            AiFillOutcome::Filled(reply) => info!("[AI] Filled answer {:?}", reply.answer),
            other => warn!("[AI] {}", other.notice()),
        }
        outcome
    }
}

fn apply_reply(reply: AiReply, area: Option<&mut AnswerArea>) -> AiFillOutcome {
    if reply.answer.is_empty() {
        return AiFillOutcome::NoUsableAnswer;
    }
    match area {
        Some(area) => match area.apply_candidate(&reply.answer) {
            Ok(()) => AiFillOutcome::Filled(reply),
            Err(_) => AiFillOutcome::NoUsableAnswer,
        },
        None => {
            debug!("[AI] No answer area to fill");
            AiFillOutcome::Filled(reply)
        }
    }
}
