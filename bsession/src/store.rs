//! Session table with per-session TTL supervision.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use bcommon::SessionId;
use tokio::sync::{Notify, mpsc};

use crate::{ChatError, ConversationHistory, TurnOrchestrator};

/// Idle sessions below this lifetime are not worth supervising; the public
/// constructor clamps up to it.
pub const MIN_SESSION_TTL: Duration = Duration::from_secs(2 * 60);

pub const DEFAULT_MAX_TURNS: usize = 10;

/// One live session: its identifier, its bounded history, and the signals its
/// supervisor listens on. Owned by the store; handed out as `Arc`.
pub struct SessionHandle {
    id: SessionId,
    history: ConversationHistory,
    activity: mpsc::Sender<()>,
    close: Notify,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Notifies the supervisor that the session is in use, extending its
    /// deadline. Fire-and-forget: a full channel means a signal is already
    /// pending, which is just as good.
    pub fn touch(&self) {
        let _ = self.activity.try_send(());
    }

    /// Requests explicit termination. Idempotent.
    pub fn close(&self) {
        self.close.notify_one();
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("turns", &self.history.len())
            .finish()
    }
}

/// Keeps at most one live session per id and expires idle ones.
///
/// Each created session gets a supervisor task holding a resettable deadline.
/// Activity resets it; the deadline elapsing or an explicit close removes the
/// session from the table exactly once and ends the task. Lookups take the
/// table read lock only; nothing holds it across an await.
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
    orchestrator: TurnOrchestrator,
    system_prompt: Option<String>,
    max_turns: usize,
    ttl: Duration,
}

impl SessionStore {
    /// Must be called from within a tokio runtime; supervisors are spawned
    /// from `get_or_create`.
    pub fn new(
        orchestrator: TurnOrchestrator,
        system_prompt: Option<String>,
        max_turns: usize,
        ttl: Duration,
    ) -> Self {
        Self::with_raw_ttl(orchestrator, system_prompt, max_turns, ttl.max(MIN_SESSION_TTL))
    }

    /// Skips the TTL floor so expiry can be exercised on a test clock.
    pub(crate) fn with_raw_ttl(
        orchestrator: TurnOrchestrator,
        system_prompt: Option<String>,
        max_turns: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                sessions: RwLock::new(HashMap::new()),
                orchestrator,
                system_prompt,
                max_turns: max_turns.max(1),
                ttl,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Returns the live session for `id`, creating it and spawning its
    /// supervisor on first sight.
    pub fn get_or_create(&self, id: impl Into<SessionId>) -> Arc<SessionHandle> {
        let id = id.into();

        if let Some(handle) = self.inner.read_sessions().get(id.as_str()) {
            return Arc::clone(handle);
        }

        let mut sessions = self.inner.write_sessions();
        // another caller may have created it between the two locks
        if let Some(handle) = sessions.get(id.as_str()) {
            return Arc::clone(handle);
        }

        let (activity_tx, activity_rx) = mpsc::channel(1);
        let handle = Arc::new(SessionHandle {
            id: id.clone(),
            history: ConversationHistory::new(
                self.inner.system_prompt.clone(),
                self.inner.max_turns,
            ),
            activity: activity_tx,
            close: Notify::new(),
        });

        sessions.insert(id.to_string(), Arc::clone(&handle));
        tracing::info!(session = %id, "session created");

        tokio::spawn(supervise(
            Arc::downgrade(&self.inner),
            Arc::clone(&handle),
            activity_rx,
            self.inner.ttl,
        ));

        handle
    }

    pub fn get(&self, id: &str) -> Option<Arc<SessionHandle>> {
        self.inner.read_sessions().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read_sessions().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read_sessions().is_empty()
    }

    /// Fires the termination signal for `id`. Removal happens in the
    /// session's supervisor; closing an unknown id is a no-op.
    pub fn close(&self, id: &str) {
        if let Some(handle) = self.get(id) {
            handle.close();
        }
    }

    /// Runs one turn on the named session, creating it if needed. The talk
    /// itself counts as activity.
    pub async fn talk_by_id(&self, id: &str, content: &str) -> Result<String, ChatError> {
        let handle = self.get_or_create(id);
        handle.touch();
        self.inner.orchestrator.run(handle.history(), content).await
    }
}

impl StoreInner {
    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<SessionHandle>>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<SessionHandle>>> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Per-session supervisor. Waits on the deadline, activity, and the close
/// signal; activity slides the deadline forward, anything else ends the
/// session. Removal runs once because only this task removes the entry.
async fn supervise(
    store: Weak<StoreInner>,
    handle: Arc<SessionHandle>,
    mut activity: mpsc::Receiver<()>,
    ttl: Duration,
) {
    let deadline = tokio::time::sleep(ttl);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = handle.close.notified() => {
                tracing::debug!(session = %handle.id, "session closed");
                break;
            }
            _ = &mut deadline => {
                tracing::debug!(session = %handle.id, "session ttl expired");
                break;
            }
            received = activity.recv() => {
                match received {
                    Some(()) => deadline.as_mut().reset(tokio::time::Instant::now() + ttl),
                    // every sender is gone, so nothing can extend the session
                    None => break,
                }
            }
        }
    }

    if let Some(inner) = store.upgrade()
        && inner.write_sessions().remove(handle.id.as_str()).is_some()
    {
        tracing::info!(session = %handle.id, "session removed");
    }
}
