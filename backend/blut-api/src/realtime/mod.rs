//! Real-time chat over WebSocket.
//!
//! `ChatHub` is the in-process presence map (`user -> sessions`) plus the
//! conversation rooms (`conversation -> sessions`). Each session owns an
//! unbounded channel; the actor in [`session`] drains it into the socket.
//! State lives only in this process.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;
pub mod route;
pub mod session;

pub use events::{ClientEvent, ServerEvent};

/// Unique identifier for one WebSocket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

struct SessionEntry {
    user_id: Uuid,
    sender: UnboundedSender<String>,
    rooms: HashSet<Uuid>,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<SessionId, SessionEntry>,
    users: HashMap<Uuid, HashSet<SessionId>>,
    rooms: HashMap<Uuid, HashSet<SessionId>>,
}

impl HubState {
    /// Drop a session from every index. Returns the user id when this was
    /// their last session.
    fn remove_session(&mut self, session_id: SessionId) -> Option<Uuid> {
        let entry = self.sessions.remove(&session_id)?;

        for room in &entry.rooms {
            if let Some(members) = self.rooms.get_mut(room) {
                members.remove(&session_id);
                if members.is_empty() {
                    self.rooms.remove(room);
                }
            }
        }

        let went_offline = match self.users.get_mut(&entry.user_id) {
            Some(sessions) => {
                sessions.remove(&session_id);
                sessions.is_empty()
            }
            None => true,
        };

        if went_offline {
            self.users.remove(&entry.user_id);
            Some(entry.user_id)
        } else {
            None
        }
    }

    /// Send to each target; sessions whose receiver is gone are pruned and
    /// their users announced offline.
    fn deliver(&mut self, targets: impl IntoIterator<Item = SessionId>, payload: &str) {
        let mut dead = Vec::new();
        for session_id in targets {
            if let Some(entry) = self.sessions.get(&session_id) {
                if entry.sender.send(payload.to_string()).is_err() {
                    dead.push(session_id);
                }
            }
        }

        if dead.is_empty() {
            return;
        }

        tracing::debug!(count = dead.len(), "pruning dead WebSocket senders");
        let offline: Vec<Uuid> = dead
            .into_iter()
            .filter_map(|session_id| self.remove_session(session_id))
            .collect();
        for user_id in offline {
            self.announce(user_id, &ServerEvent::UserOffline { user_id });
        }
    }

    /// Presence change for `user_id`, sent to everybody else.
    fn announce(&mut self, user_id: Uuid, event: &ServerEvent) {
        let targets: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, entry)| entry.user_id != user_id)
            .map(|(id, _)| *id)
            .collect();
        self.deliver(targets, &event.to_json());
    }
}

/// Connection registry shared by the WebSocket sessions and the REST layer
#[derive(Default, Clone)]
pub struct ChatHub {
    inner: Arc<RwLock<HubState>>,
}

/// What a new session gets back from [`ChatHub::register`]
pub struct Registration {
    pub session_id: SessionId,
    pub receiver: UnboundedReceiver<String>,
    pub online_users: Vec<Uuid>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session for `user_id`. Other users hear `user_online` only when
    /// this is the user's first session.
    pub async fn register(&self, user_id: Uuid) -> Registration {
        let (tx, rx) = unbounded_channel();
        let session_id = SessionId::new();

        let mut state = self.inner.write().await;
        state.sessions.insert(
            session_id,
            SessionEntry {
                user_id,
                sender: tx,
                rooms: HashSet::new(),
            },
        );

        let sessions = state.users.entry(user_id).or_default();
        sessions.insert(session_id);
        let first_session = sessions.len() == 1;

        if first_session {
            state.announce(user_id, &ServerEvent::UserOnline { user_id });
        }

        let online_users = state.users.keys().copied().collect();

        tracing::debug!(%user_id, ?session_id, first_session, "WebSocket session registered");

        Registration {
            session_id,
            receiver: rx,
            online_users,
        }
    }

    /// Remove a session. `user_offline` goes out when it was the user's last.
    /// Unknown (already pruned) sessions are ignored.
    pub async fn unregister(&self, session_id: SessionId) {
        let mut state = self.inner.write().await;
        if let Some(user_id) = state.remove_session(session_id) {
            tracing::debug!(%user_id, "last WebSocket session closed");
            state.announce(user_id, &ServerEvent::UserOffline { user_id });
        }
    }

    pub async fn join_room(&self, session_id: SessionId, conversation_id: Uuid) -> bool {
        let mut state = self.inner.write().await;
        match state.sessions.get_mut(&session_id) {
            Some(entry) => {
                entry.rooms.insert(conversation_id);
                state
                    .rooms
                    .entry(conversation_id)
                    .or_default()
                    .insert(session_id);
                true
            }
            None => false,
        }
    }

    pub async fn leave_room(&self, session_id: SessionId, conversation_id: Uuid) {
        let mut state = self.inner.write().await;
        if let Some(entry) = state.sessions.get_mut(&session_id) {
            entry.rooms.remove(&conversation_id);
        }
        if let Some(members) = state.rooms.get_mut(&conversation_id) {
            members.remove(&session_id);
            if members.is_empty() {
                state.rooms.remove(&conversation_id);
            }
        }
    }

    pub async fn send_to_session(&self, session_id: SessionId, event: &ServerEvent) {
        let mut state = self.inner.write().await;
        state.deliver([session_id], &event.to_json());
    }

    /// Every open session of `user_id`
    pub async fn send_to_user(&self, user_id: Uuid, event: &ServerEvent) {
        let mut state = self.inner.write().await;
        let targets: Vec<SessionId> = state
            .users
            .get(&user_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        state.deliver(targets, &event.to_json());
    }

    /// Sessions joined to the room, optionally skipping the originator
    pub async fn send_to_room(
        &self,
        conversation_id: Uuid,
        event: &ServerEvent,
        except: Option<SessionId>,
    ) {
        let mut state = self.inner.write().await;
        let targets: Vec<SessionId> = state
            .rooms
            .get(&conversation_id)
            .map(|s| s.iter().copied().filter(|id| Some(*id) != except).collect())
            .unwrap_or_default();
        state.deliver(targets, &event.to_json());
    }

    /// Room members plus every session of `user_id`, each at most once.
    pub async fn fan_out(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        event: &ServerEvent,
        except: Option<SessionId>,
    ) {
        let mut state = self.inner.write().await;
        let mut targets: HashSet<SessionId> = state
            .rooms
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default();
        if let Some(sessions) = state.users.get(&user_id) {
            targets.extend(sessions.iter().copied());
        }
        if let Some(except) = except {
            targets.remove(&except);
        }
        state.deliver(targets, &event.to_json());
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.read().await.users.contains_key(&user_id)
    }

    pub async fn online_users(&self) -> Vec<Uuid> {
        self.inner.read().await.users.keys().copied().collect()
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn room_size(&self, conversation_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(&conversation_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            out.push(serde_json::from_str(&raw).unwrap());
        }
        out
    }

    fn types(events: &[serde_json::Value]) -> Vec<String> {
        events
            .iter()
            .map(|e| e["type"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_online_fires_once_per_user() {
        let hub = ChatHub::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut bob_reg = hub.register(bob).await;
        let _a1 = hub.register(alice).await;
        let _a2 = hub.register(alice).await;

        let events = drain(&mut bob_reg.receiver);
        assert_eq!(types(&events), vec!["user_online"]);
        assert_eq!(events[0]["user_id"], alice.to_string());
    }

    #[tokio::test]
    async fn test_offline_fires_on_last_session() {
        let hub = ChatHub::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut bob_reg = hub.register(bob).await;
        let a1 = hub.register(alice).await;
        let a2 = hub.register(alice).await;
        drain(&mut bob_reg.receiver);

        hub.unregister(a1.session_id).await;
        assert!(drain(&mut bob_reg.receiver).is_empty());
        assert!(hub.is_online(alice).await);

        hub.unregister(a2.session_id).await;
        assert_eq!(types(&drain(&mut bob_reg.receiver)), vec!["user_offline"]);
        assert!(!hub.is_online(alice).await);

        // Second unregister of the same session is a no-op.
        hub.unregister(a2.session_id).await;
        assert!(drain(&mut bob_reg.receiver).is_empty());
    }

    #[tokio::test]
    async fn test_register_reports_online_users() {
        let hub = ChatHub::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        hub.register(alice).await;
        let reg = hub.register(bob).await;
        assert_eq!(reg.online_users.len(), 2);
        assert!(reg.online_users.contains(&alice));
    }

    #[tokio::test]
    async fn test_room_broadcast_skips_originator() {
        let hub = ChatHub::new();
        let conversation = Uuid::new_v4();
        let mut a = hub.register(Uuid::new_v4()).await;
        let mut b = hub.register(Uuid::new_v4()).await;
        drain(&mut a.receiver);
        drain(&mut b.receiver);

        assert!(hub.join_room(a.session_id, conversation).await);
        assert!(hub.join_room(b.session_id, conversation).await);

        let event = ServerEvent::UserTyping {
            conversation_id: conversation,
            user_id: Uuid::new_v4(),
        };
        hub.send_to_room(conversation, &event, Some(a.session_id)).await;

        assert!(drain(&mut a.receiver).is_empty());
        assert_eq!(types(&drain(&mut b.receiver)), vec!["user_typing"]);

        hub.leave_room(b.session_id, conversation).await;
        assert_eq!(hub.room_size(conversation).await, 1);
    }

    #[tokio::test]
    async fn test_fan_out_delivers_once() {
        let hub = ChatHub::new();
        let conversation = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let mut r = hub.register(recipient).await;
        drain(&mut r.receiver);
        hub.join_room(r.session_id, conversation).await;

        hub.fan_out(conversation, recipient, &ServerEvent::Pong, None)
            .await;
        assert_eq!(drain(&mut r.receiver).len(), 1);
    }

    #[tokio::test]
    async fn test_dead_sender_is_pruned() {
        let hub = ChatHub::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut bob_reg = hub.register(bob).await;
        let alice_reg = hub.register(alice).await;
        drain(&mut bob_reg.receiver);

        drop(alice_reg.receiver);
        hub.send_to_user(alice, &ServerEvent::Pong).await;

        assert_eq!(hub.session_count().await, 1);
        assert!(!hub.is_online(alice).await);
        assert_eq!(types(&drain(&mut bob_reg.receiver)), vec!["user_offline"]);

        // The actor's own cleanup afterwards must not announce again.
        hub.unregister(alice_reg.session_id).await;
        assert!(drain(&mut bob_reg.receiver).is_empty());
    }
}
