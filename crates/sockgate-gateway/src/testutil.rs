//! Shared fixtures for lifecycle unit tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sockgate_core::{CloseReason, EndpointError, GatewayError, UpgradeContext};

use crate::endpoint::{EndpointTemplate, SocketEndpoint};
use crate::session::Session;

pub(crate) fn test_context() -> UpgradeContext {
    let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
    UpgradeContext::new(addr, "/echo")
}

/// Template producing endpoints that append every callback to a shared log.
pub(crate) struct RecordingTemplate {
    path: String,
    log: Arc<Mutex<Vec<String>>>,
    open_error: Option<String>,
    message_error: Option<String>,
    echo: bool,
}

impl RecordingTemplate {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            log: Arc::new(Mutex::new(Vec::new())),
            open_error: None,
            message_error: None,
            echo: false,
        }
    }

    pub(crate) fn with_open_error(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_owned());
        self
    }

    pub(crate) fn with_message_error(mut self, message: &str) -> Self {
        self.message_error = Some(message.to_owned());
        self
    }

    pub(crate) fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl EndpointTemplate for RecordingTemplate {
    fn path(&self) -> &str {
        &self.path
    }

    fn connect(&self) -> Box<dyn SocketEndpoint> {
        Box::new(RecordingEndpoint {
            log: self.log.clone(),
            open_error: self.open_error.clone(),
            message_error: self.message_error.clone(),
            echo: self.echo,
        })
    }
}

pub(crate) struct RecordingEndpoint {
    log: Arc<Mutex<Vec<String>>>,
    open_error: Option<String>,
    message_error: Option<String>,
    echo: bool,
}

impl RecordingEndpoint {
    fn record(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }
}

#[async_trait]
impl SocketEndpoint for RecordingEndpoint {
    async fn on_open(&mut self, _session: &Session) -> Result<(), EndpointError> {
        self.record("open".to_string());
        match &self.open_error {
            Some(message) => Err(EndpointError::new(message.clone())),
            None => Ok(()),
        }
    }

    async fn on_message(&mut self, session: &Session, text: &str) -> Result<(), EndpointError> {
        self.record(format!("message:{text}"));
        if let Some(message) = &self.message_error {
            return Err(EndpointError::new(message.clone()));
        }
        if self.echo {
            session
                .write_text(text)
                .await
                .map_err(|err| EndpointError::new(err.to_string()))?;
        }
        Ok(())
    }

    async fn on_close(&mut self, reason: CloseReason, text: &str) -> Result<(), EndpointError> {
        self.record(format!("close:{reason}:{text}"));
        Ok(())
    }

    async fn on_error(&mut self, _session: &Session, error: &GatewayError) {
        self.record(format!("error:{error}"));
    }

    async fn on_ping(&mut self, payload: &str) -> Result<(), EndpointError> {
        self.record(format!("ping:{payload}"));
        Ok(())
    }

    async fn on_pong(&mut self, payload: &str) -> Result<(), EndpointError> {
        self.record(format!("pong:{payload}"));
        Ok(())
    }
}
