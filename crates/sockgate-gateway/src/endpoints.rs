//! Endpoint registry and pre-upgrade filters.
//!
//! The registry is populated before serving begins and is read-only
//! afterwards, so it needs no synchronization; all concurrency lives in the
//! connection table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use sockgate_core::{RegistryError, UpgradeContext};

use crate::endpoint::EndpointTemplate;

/// A filter consulted before the protocol upgrade, in registration order.
///
/// Filters may enrich the [`UpgradeContext`] (attach values for the eventual
/// session) or reject the request, in which case the upgrade never happens
/// and the rejection becomes the HTTP response.
#[async_trait]
pub trait UpgradeFilter: Send + Sync {
    async fn apply(&self, context: &mut UpgradeContext) -> Result<(), FilterRejection>;
}

/// An HTTP-level rejection produced by an [`UpgradeFilter`].
#[derive(Debug, Clone)]
pub struct FilterRejection {
    pub status: StatusCode,
    pub message: String,
}

impl FilterRejection {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Convenience constructor for the common 403 case.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }
}

impl IntoResponse for FilterRejection {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// One registered endpoint: the template plus its ordered filter chain.
pub(crate) struct EndpointEntry {
    pub(crate) template: Arc<dyn EndpointTemplate>,
    pub(crate) filters: Vec<Arc<dyn UpgradeFilter>>,
}

/// Startup table mapping endpoint paths to templates.
#[derive(Default)]
pub(crate) struct EndpointRegistry {
    entries: HashMap<String, Arc<EndpointEntry>>,
}

impl EndpointRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a template with its filter chain. Fails on a duplicate path
    /// (the first registration wins) or on a path the router cannot mount.
    pub(crate) fn register(
        &mut self,
        template: Arc<dyn EndpointTemplate>,
        filters: Vec<Arc<dyn UpgradeFilter>>,
    ) -> Result<(), RegistryError> {
        let path = template.path().to_owned();
        if path.is_empty() {
            return Err(RegistryError::InvalidEndpoint {
                reason: "endpoint path is empty".to_string(),
            });
        }
        if !path.starts_with('/') {
            return Err(RegistryError::InvalidEndpoint {
                reason: format!("endpoint path {path:?} must start with '/'"),
            });
        }
        if self.entries.contains_key(&path) {
            return Err(RegistryError::DuplicatePath { path });
        }
        self.entries
            .insert(path, Arc::new(EndpointEntry { template, filters }));
        Ok(())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<EndpointEntry>> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
