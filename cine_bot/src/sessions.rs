//! What the bot remembers about each chat between updates. Lost on restart,
//! which is fine: it's the plan someone is about to pay for and the last
//! search results they're paging through.

use std::{num::NonZeroUsize, sync::Arc};

use lru::LruCache;
use teloxide::types::UserId;
use tokio::sync::Mutex;

use crate::{database::Movie, types::Plan};

const CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(x) => x,
    None => panic!("capacity must not be zero"),
};

#[derive(Debug, Clone)]
pub struct LastSearch {
    pub query: String,
    pub results: Arc<Vec<Movie>>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    /// Plan picked from the menu, which the next photo pays for.
    pub chosen_plan: Option<Plan>,
    pub last_search: Option<LastSearch>,
}

pub struct ChatSessions {
    sessions: Mutex<LruCache<UserId, ChatSession>>,
}

impl Default for ChatSessions {
    fn default() -> Self {
        ChatSessions {
            sessions: Mutex::new(LruCache::new(CAPACITY)),
        }
    }
}

impl ChatSessions {
    pub async fn get(&self, user: UserId) -> ChatSession {
        self.sessions
            .lock()
            .await
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }

    async fn update(&self, user: UserId, f: impl FnOnce(&mut ChatSession)) {
        let mut sessions = self.sessions.lock().await;
        f(sessions.get_or_insert_mut(user, ChatSession::default));
    }

    pub async fn choose_plan(&self, user: UserId, plan: Plan) {
        self.update(user, |s| s.chosen_plan = Some(plan)).await;
    }

    /// Forget the chosen plan, returning it.
    pub async fn take_plan(&self, user: UserId) -> Option<Plan> {
        let mut sessions = self.sessions.lock().await;
        sessions.get_mut(&user).and_then(|s| s.chosen_plan.take())
    }

    pub async fn remember_search(&self, user: UserId, query: String, results: Arc<Vec<Movie>>) {
        self.update(user, |s| s.last_search = Some(LastSearch { query, results }))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plan_is_taken_once() {
        let sessions = ChatSessions::default();
        assert!(sessions.get(UserId(1)).await.chosen_plan.is_none());

        sessions.choose_plan(UserId(1), Plan::Premium).await;
        assert_eq!(sessions.get(UserId(1)).await.chosen_plan, Some(Plan::Premium));
        assert!(sessions.get(UserId(2)).await.chosen_plan.is_none());

        assert_eq!(sessions.take_plan(UserId(1)).await, Some(Plan::Premium));
        assert_eq!(sessions.take_plan(UserId(1)).await, None);
    }

    #[tokio::test]
    async fn search_is_kept_alongside_plan() {
        let sessions = ChatSessions::default();
        sessions.choose_plan(UserId(1), Plan::Classic).await;
        sessions
            .remember_search(UserId(1), "dune".to_string(), Arc::new(Vec::new()))
            .await;

        let session = sessions.get(UserId(1)).await;
        assert_eq!(session.chosen_plan, Some(Plan::Classic));
        assert_eq!(session.last_search.unwrap().query, "dune");
    }
}
