//! Chat session management for the HTTP front-end
//!
//! Each session owns one agent behind an async mutex, so a conversation's
//! history is never touched by two requests at once. Different sessions run
//! independently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::agent::{AgentFactory, BioAgent};

pub type SharedAgent = Arc<Mutex<BioAgent>>;

struct SessionEntry {
    agent: SharedAgent,
    created_at: DateTime<Utc>,
    last_used: DateTime<Utc>,
}

/// Snapshot for listings
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

pub struct SessionManager {
    factory: AgentFactory,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    max_sessions: usize,
}

impl SessionManager {
    pub fn new(factory: AgentFactory) -> Self {
        Self::with_max_sessions(factory, 100)
    }

    pub fn with_max_sessions(factory: AgentFactory, max_sessions: usize) -> Self {
        Self {
            factory,
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn factory(&self) -> &AgentFactory {
        &self.factory
    }

    /// Look up a session, creating it when the id is absent or unknown.
    ///
    /// `model` only applies to newly created sessions.
    pub async fn get_or_create(
        &self,
        session_id: Option<String>,
        model: Option<&str>,
    ) -> (String, SharedAgent) {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();

        if let Some(ref id) = session_id {
            if let Some(entry) = sessions.get_mut(id) {
                entry.last_used = now;
                return (id.clone(), entry.agent.clone());
            }
        }

        // Evict least recently used session if at capacity
        if sessions.len() >= self.max_sessions {
            if let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| id.clone())
            {
                debug!("Evicting chat session {}", oldest);
                sessions.remove(&oldest);
            }
        }

        let id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let agent = Arc::new(Mutex::new(self.factory.create(model)));
        sessions.insert(
            id.clone(),
            SessionEntry {
                agent: agent.clone(),
                created_at: now,
                last_used: now,
            },
        );
        info!("Created chat session {}", id);
        (id, agent)
    }

    pub async fn get(&self, session_id: &str) -> Option<SharedAgent> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|e| e.agent.clone())
    }

    /// Remove a session; returns whether it existed
    pub async fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            info!("Deleted chat session {}", session_id);
        }
        removed
    }

    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut infos: Vec<SessionInfo> = sessions
            .iter()
            .map(|(id, e)| SessionInfo {
                id: id.clone(),
                created_at: e.created_at,
                last_used: e.last_used,
            })
            .collect();
        infos.sort_by_key(|i| i.created_at);
        infos
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
