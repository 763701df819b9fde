//! In-memory session partition
//!
//! Each session sits behind its own mutex, so turns on one session run one
//! at a time while different sessions proceed in parallel. The map lock is
//! only held long enough to look a session up.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::domain::{SessionId, SessionState};
use crate::driver::{Driver, DriverError, Session, TurnOutcome};

pub struct SessionHub {
    driver: Arc<Driver>,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl SessionHub {
    pub fn new(driver: Arc<Driver>) -> Self {
        Self {
            driver,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a new session and return its id
    pub async fn create(&self) -> SessionId {
        let session = Session::new();
        let id = session.id();
        self.sessions.write().await.insert(id, Arc::new(Mutex::new(session)));
        info!(%id, "SessionHub: session created");
        id
    }

    async fn get(&self, id: SessionId) -> Result<Arc<Mutex<Session>>, DriverError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DriverError::UnknownSession(id))
    }

    /// Process one human turn on a session
    pub async fn process_turn(&self, id: SessionId, text: &str) -> Result<TurnOutcome, DriverError> {
        debug!(%id, "SessionHub::process_turn: called");
        let session = self.get(id).await?;
        let mut session = session.lock().await;
        Ok(self.driver.process_turn(&mut session, text).await)
    }

    /// Copy of a session's current state
    pub async fn snapshot(&self, id: SessionId) -> Result<SessionState, DriverError> {
        let session = self.get(id).await?;
        let session = session.lock().await;
        Ok(session.state.clone())
    }

    /// Drop a session, returning whether it existed
    pub async fn close(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        info!(%id, removed, "SessionHub: session closed");
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
