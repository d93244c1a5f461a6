//! The relay facade.

use crate::auth::Authenticator;
use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::handler::{HandlerContext, RequestHandler};
use chatsync_protocol::UserId;
use chatsync_storage::{Clock, InMemoryStore, KeyValueStore, SystemClock};
use std::sync::Arc;

/// The sync relay.
///
/// Owns the request handler and, optionally, the authenticator that turns
/// bearer tokens into owner ids. A transport authenticates each request
/// with [`SyncServer::authenticate`] and passes the result to the handler.
///
/// # Example
///
/// ```
/// use chatsync_server::{EngineConfig, SyncServer};
/// use uuid::Uuid;
///
/// let server = SyncServer::new(EngineConfig::default());
/// let owner = Uuid::new_v4();
///
/// let changes = server.handler().changes_since(Some(owner), None).unwrap();
/// assert!(changes.is_snapshot());
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl SyncServer {
    /// Creates a relay over a fresh in-memory store.
    pub fn new(config: EngineConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(
            InMemoryStore::with_clock(Arc::clone(&clock)).with_sweep_interval(config.sweep_interval),
        );
        Self::with_store(config, store, clock)
    }

    /// Creates a relay over an existing store.
    pub fn with_store(
        config: EngineConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let context = Arc::new(HandlerContext::new(config, store, clock));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self {
            handler,
            context,
            authenticator: None,
        }
    }

    /// Sets the authenticator for bearer tokens.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Resolves a bearer token to the owner it was issued to.
    pub fn authenticate(&self, token: &[u8]) -> SyncResult<UserId> {
        match &self.authenticator {
            Some(authenticator) => authenticator.authenticate(token),
            None => Err(SyncError::NotAuthenticated(
                "no authenticator configured".into(),
            )),
        }
    }

    /// Returns the request handler.
    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// Returns the shared handler context.
    pub fn context(&self) -> &Arc<HandlerContext> {
        &self.context
    }
}
