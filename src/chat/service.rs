//! Chat orchestration: message persistence, binding cache, rollback.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::backend::{AssistantBackend, Binding};
use super::ChatError;
use crate::db::repository::{animal, chat_message};
use crate::db::Database;
use crate::models::enums::MessageRole;
use crate::models::{Animal, ChatMessage};

/// Reply served when the animal has no knowledge base yet.
pub const NO_KNOWLEDGE_BASE_NOTICE: &str = "Для цієї тварини ще не створено базу знань. \
     Спочатку додайте метрики здоров'я через OCR сканування або вручну.";

/// Bindings are backend resources, so the cache is bounded: past the
/// capacity the least recently used binding is destroyed. A destroyed
/// binding costs one re-creation on the next question, nothing more.
const BINDING_CACHE_CAPACITY: usize = 64;

struct BindingCache {
    capacity: usize,
    entries: HashMap<Uuid, Binding>,
    order: VecDeque<Uuid>,
}

impl BindingCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&mut self, animal_id: &Uuid) -> Option<Binding> {
        let binding = self.entries.get(animal_id)?.clone();
        self.touch(animal_id);
        Some(binding)
    }

    /// Inserts and returns the evicted binding, if the cache was full.
    fn insert(&mut self, animal_id: Uuid, binding: Binding) -> Option<(Uuid, Binding)> {
        let evicted = if self.entries.len() >= self.capacity && !self.entries.contains_key(&animal_id)
        {
            self.order.pop_front().and_then(|old| {
                self.entries.remove(&old).map(|binding| (old, binding))
            })
        } else {
            None
        };
        self.entries.insert(animal_id, binding);
        self.touch(&animal_id);
        evicted
    }

    fn remove(&mut self, animal_id: &Uuid) -> Option<Binding> {
        self.order.retain(|id| id != animal_id);
        self.entries.remove(animal_id)
    }

    fn touch(&mut self, animal_id: &Uuid) {
        self.order.retain(|id| id != animal_id);
        self.order.push_back(*animal_id);
    }
}

/// A chat answer; the notice variant never reached the backend.
#[derive(Debug)]
pub enum Answer {
    Grounded(ChatMessage),
    NoKnowledgeBase(ChatMessage),
}

impl Answer {
    pub fn message(&self) -> &ChatMessage {
        match self {
            Answer::Grounded(m) | Answer::NoKnowledgeBase(m) => m,
        }
    }
}

pub struct ChatService {
    db: Database,
    backend: Arc<dyn AssistantBackend>,
    cache: Mutex<BindingCache>,
}

impl ChatService {
    pub fn new(db: Database, backend: Arc<dyn AssistantBackend>) -> Self {
        Self {
            db,
            backend,
            cache: Mutex::new(BindingCache::new(BINDING_CACHE_CAPACITY)),
        }
    }

    /// Answers a question about the animal. The user message is
    /// persisted first and rolled back if the backend fails, so the
    /// stored history never contains an unanswered question.
    pub async fn ask(&self, animal_id: &Uuid, question: &str) -> Result<Answer, ChatError> {
        let animal = self.load_animal(animal_id)?;

        let user_message = {
            let conn = self.db.conn();
            chat_message::insert_chat_message(&conn, animal_id, MessageRole::User, question)?
        };

        let Some(index_id) = animal.knowledge_base_id.clone() else {
            let notice = {
                let conn = self.db.conn();
                chat_message::insert_chat_message(
                    &conn,
                    animal_id,
                    MessageRole::Assistant,
                    NO_KNOWLEDGE_BASE_NOTICE,
                )?
            };
            return Ok(Answer::NoKnowledgeBase(notice));
        };

        let reply = match self.ask_backend(&animal, &index_id, question).await {
            Ok(reply) => reply,
            Err(err) => {
                let conn = self.db.conn();
                if let Err(db_err) = chat_message::delete_chat_message(&conn, &user_message.id) {
                    warn!(%db_err, "failed to roll back user message");
                }
                return Err(err);
            }
        };

        let saved = {
            let conn = self.db.conn();
            chat_message::insert_chat_message(&conn, animal_id, MessageRole::Assistant, &reply)?
        };
        Ok(Answer::Grounded(saved))
    }

    pub fn history(&self, animal_id: &Uuid) -> Result<Vec<ChatMessage>, ChatError> {
        // Ensure a 404 for unknown animals instead of an empty list.
        self.load_animal(animal_id)?;
        let conn = self.db.conn();
        Ok(chat_message::get_chat_messages_by_animal(&conn, animal_id)?)
    }

    /// Drops the animal's binding and destroys its backend resources.
    /// Best-effort: the backend may have expired them already.
    pub async fn forget_animal(&self, animal_id: &Uuid) {
        let binding = self.cache.lock().await.remove(animal_id);
        if let Some(binding) = binding {
            if let Err(err) = self.backend.destroy_binding(&binding).await {
                warn!(%animal_id, %err, "failed to destroy chat binding");
            }
        }
    }

    async fn ask_backend(
        &self,
        animal: &Animal,
        index_id: &str,
        question: &str,
    ) -> Result<String, ChatError> {
        let binding = self.binding_for(animal, index_id).await?;
        match self.backend.ask(&binding, question).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                // The binding may be stale (deleted server-side).
                // Retry once on a fresh one.
                warn!(animal_id = %animal.id, %err, "chat ask failed, rebinding");
                self.cache.lock().await.remove(&animal.id);
                let binding = self.binding_for(animal, index_id).await?;
                self.backend.ask(&binding, question).await
            }
        }
    }

    async fn binding_for(&self, animal: &Animal, index_id: &str) -> Result<Binding, ChatError> {
        if let Some(binding) = self.cache.lock().await.get(&animal.id) {
            return Ok(binding);
        }
        let binding = self.backend.create_binding(animal, index_id).await?;
        info!(animal_id = %animal.id, "created chat binding");
        let evicted = self.cache.lock().await.insert(animal.id, binding.clone());
        if let Some((evicted_id, evicted_binding)) = evicted {
            if let Err(err) = self.backend.destroy_binding(&evicted_binding).await {
                warn!(animal_id = %evicted_id, %err, "failed to destroy evicted binding");
            }
        }
        Ok(binding)
    }

    fn load_animal(&self, animal_id: &Uuid) -> Result<Animal, ChatError> {
        let conn = self.db.conn();
        animal::get_animal(&conn, animal_id)?
            .ok_or_else(|| ChatError::AnimalNotFound(animal_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::owner;
    use crate::models::enums::{Sex, Species};
    use crate::models::{NewAnimal, NewOwner};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockBackend {
        reply: String,
        fail: AtomicBool,
        bindings_created: AtomicUsize,
        bindings_destroyed: AtomicUsize,
    }

    impl MockBackend {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                fail: AtomicBool::new(false),
                bindings_created: AtomicUsize::new(0),
                bindings_destroyed: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AssistantBackend for MockBackend {
        async fn create_binding(
            &self,
            animal: &Animal,
            _index_id: &str,
        ) -> Result<Binding, ChatError> {
            let n = self.bindings_created.fetch_add(1, Ordering::SeqCst);
            Ok(Binding {
                assistant_id: format!("asst_{}_{n}", animal.id),
                thread_id: format!("thread_{}_{n}", animal.id),
            })
        }

        async fn ask(&self, _binding: &Binding, _question: &str) -> Result<String, ChatError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(ChatError::RunFailed("failed".into()))
            } else {
                Ok(self.reply.clone())
            }
        }

        async fn destroy_binding(&self, _binding: &Binding) -> Result<(), ChatError> {
            self.bindings_destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn setup(with_index: bool) -> (ChatService, Arc<MockBackend>, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let animal_id = {
            let conn = db.conn();
            let o = owner::insert_owner(
                &conn,
                &NewOwner {
                    first_name: "Ivan".into(),
                    last_name: "Petrenko".into(),
                    email: "ivan@example.com".into(),
                    phone: None,
                    city: None,
                    preferred_language: "uk".into(),
                },
            )
            .unwrap();
            let a = animal::insert_animal(
                &conn,
                &NewAnimal {
                    owner_id: o.id,
                    name: "Рекс".into(),
                    species: Species::Dog,
                    breed: "Лабрадор".into(),
                    sex: Sex::Male,
                    date_of_birth: None,
                    weight_kg: None,
                },
            )
            .unwrap();
            if with_index {
                animal::set_knowledge_base_id(&conn, &a.id, Some("vs_1")).unwrap();
            }
            a.id
        };
        let backend = Arc::new(MockBackend::replying("Все гаразд."));
        let service = ChatService::new(db, backend.clone());
        (service, backend, animal_id)
    }

    #[tokio::test]
    async fn grounded_answer_persists_both_messages() {
        let (service, _backend, animal_id) = setup(true);
        let answer = service.ask(&animal_id, "Як справи у Рекса?").await.unwrap();
        assert!(matches!(answer, Answer::Grounded(_)));
        assert_eq!(answer.message().content, "Все гаразд.");

        let history = service.history(&animal_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn missing_knowledge_base_returns_notice_without_backend() {
        let (service, backend, animal_id) = setup(false);
        let answer = service.ask(&animal_id, "Питання").await.unwrap();
        assert!(matches!(answer, Answer::NoKnowledgeBase(_)));
        assert_eq!(answer.message().content, NO_KNOWLEDGE_BASE_NOTICE);
        assert_eq!(backend.bindings_created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_failure_rolls_back_user_message() {
        let (service, backend, animal_id) = setup(true);
        backend.fail.store(true, Ordering::SeqCst);

        let err = service.ask(&animal_id, "Питання").await.unwrap_err();
        assert!(matches!(err, ChatError::RunFailed(_)));
        assert!(service.history(&animal_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn binding_reused_across_questions() {
        let (service, backend, animal_id) = setup(true);
        service.ask(&animal_id, "Перше").await.unwrap();
        service.ask(&animal_id, "Друге").await.unwrap();
        assert_eq!(backend.bindings_created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forget_destroys_binding() {
        let (service, backend, animal_id) = setup(true);
        service.ask(&animal_id, "Питання").await.unwrap();
        service.forget_animal(&animal_id).await;
        assert_eq!(backend.bindings_destroyed.load(Ordering::SeqCst), 1);

        // Next question needs a fresh binding.
        service.ask(&animal_id, "Ще питання").await.unwrap();
        assert_eq!(backend.bindings_created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_animal_rejected() {
        let (service, _backend, _) = setup(true);
        let err = service.ask(&Uuid::new_v4(), "Питання").await.unwrap_err();
        assert!(matches!(err, ChatError::AnimalNotFound(_)));
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let mut cache = BindingCache::new(2);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let binding = |s: &str| Binding {
            assistant_id: s.into(),
            thread_id: s.into(),
        };

        assert!(cache.insert(a, binding("a")).is_none());
        assert!(cache.insert(b, binding("b")).is_none());
        // Touch a so b becomes the eviction candidate.
        cache.get(&a);
        let evicted = cache.insert(c, binding("c")).unwrap();
        assert_eq!(evicted.0, b);
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
    }
}
