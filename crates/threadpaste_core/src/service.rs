//! Paste workflows shared by HTTP handlers.
//!
//! Handlers build a [`RequestContext`] and call into [`PasteService`]; the
//! service owns validation, the create-then-notify ordering and authorization.

use crate::context::RequestContext;
use crate::db::Database;
use crate::error::AppError;
use crate::models::paste::{NewPaste, Paste, PastePage, Thread};
use crate::models::user::{ProviderIdentity, User};
use crate::notify::ReplyNotifier;
use std::sync::Arc;

/// Entry point for paste and user operations.
#[derive(Clone)]
pub struct PasteService {
    db: Arc<Database>,
    notifier: ReplyNotifier,
    max_paste_size: usize,
    page_size: usize,
}

impl PasteService {
    pub fn new(
        db: Arc<Database>,
        notifier: ReplyNotifier,
        max_paste_size: usize,
        page_size: usize,
    ) -> Self {
        Self {
            db,
            notifier,
            max_paste_size,
            page_size: page_size.max(1),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    fn validate_content(&self, content: &str) -> Result<(), AppError> {
        if content.is_empty() {
            return Err(AppError::ValidationFailed(
                "Paste content must not be empty".to_string(),
            ));
        }
        if content.len() > self.max_paste_size {
            return Err(AppError::BadRequest(format!(
                "Paste size exceeds maximum of {} bytes",
                self.max_paste_size
            )));
        }
        Ok(())
    }

    /// Store a new paste for the caller and notify watchers when it is a reply.
    ///
    /// The paste is committed before any notification is published; a failed
    /// publish never undoes the write.
    ///
    /// # Arguments
    /// - `ctx`: Caller context; anonymous callers create authorless pastes.
    /// - `content`: Paste text, must be non-empty.
    /// - `reply_to`: Parent paste id, if this is a reply.
    ///
    /// # Returns
    /// The stored paste.
    ///
    /// # Errors
    /// [`AppError::ValidationFailed`] for empty content, [`AppError::BadRequest`]
    /// for oversize content, [`AppError::NotFound`] for a missing parent.
    pub fn submit(
        &self,
        ctx: &RequestContext,
        content: String,
        reply_to: Option<u64>,
    ) -> Result<Paste, AppError> {
        self.validate_content(&content)?;

        let parent = match reply_to {
            Some(parent_id) => Some(self.db.pastes.get(parent_id)?.ok_or(AppError::NotFound)?),
            None => None,
        };

        let draft = NewPaste::new(ctx.user.as_ref(), content, parent.as_ref().map(|p| p.id));
        let paste = self.db.pastes.create(draft)?;
        tracing::info!(
            paste_id = paste.id,
            parent_id = ?paste.parent_id,
            author_id = ?paste.author_id(),
            "Created paste"
        );

        if let Some(parent) = parent.as_ref() {
            self.notifier.notify_reply(parent, &paste);
        }
        Ok(paste)
    }

    /// Fetch a single paste.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when the paste does not exist.
    pub fn paste(&self, id: u64) -> Result<Paste, AppError> {
        self.db.pastes.get(id)?.ok_or(AppError::NotFound)
    }

    /// Fetch a paste with its direct replies.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when the paste does not exist.
    pub fn thread(&self, id: u64) -> Result<Thread, AppError> {
        self.db.pastes.get_thread(id)?.ok_or(AppError::NotFound)
    }

    /// Delete a paste owned by the caller.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when missing, [`AppError::Unauthorized`] unless
    /// the caller is the paste's author.
    pub fn delete(&self, ctx: &RequestContext, id: u64) -> Result<(), AppError> {
        let detached = self.db.pastes.delete_as(id, ctx.user_id())?;
        tracing::info!(
            paste_id = id,
            detached_replies = detached.len(),
            "Deleted paste"
        );
        Ok(())
    }

    /// List one page of the caller's pastes, newest first.
    ///
    /// # Errors
    /// [`AppError::Unauthorized`] for anonymous callers.
    pub fn list_mine(&self, ctx: &RequestContext, page: usize) -> Result<PastePage, AppError> {
        let user_id = ctx.user_id().ok_or(AppError::Unauthorized)?;
        self.db.pastes.list_by_author(user_id, page, self.page_size)
    }

    /// Record a successful OAuth login.
    ///
    /// # Returns
    /// The existing user with a refreshed display name, or a new user.
    pub fn login(&self, identity: &ProviderIdentity) -> Result<User, AppError> {
        let user = self.db.users.upsert_by_provider(identity)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok(user)
    }

    /// Resolve a user id (typically from a session) to a user.
    pub fn user(&self, id: u64) -> Result<Option<User>, AppError> {
        self.db.users.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::PasteService;
    use crate::context::RequestContext;
    use crate::models::user::ProviderIdentity;
    use crate::notify::ReplyNotifier;
    use crate::test_support::{setup_temp_db, FailingPublisher, RecordingPublisher};
    use crate::AppError;
    use std::sync::Arc;

    fn service_with(
        publisher: Arc<dyn crate::Publisher>,
    ) -> (PasteService, tempfile::TempDir) {
        let (db, dir) = setup_temp_db();
        let service = PasteService::new(Arc::new(db), ReplyNotifier::new(publisher), 1024, 2);
        (service, dir)
    }

    fn login(service: &PasteService, provider_id: &str, name: &str) -> RequestContext {
        let user = service
            .login(&ProviderIdentity {
                provider_id: provider_id.to_string(),
                display_name: name.to_string(),
            })
            .expect("login");
        RequestContext::for_user(user)
    }

    #[test]
    fn anonymous_parent_reply_scenario_publishes_thread_only() {
        let recorder = Arc::new(RecordingPublisher::default());
        let (service, _dir) = service_with(recorder.clone());
        let bob = login(&service, "wb-bob", "Bob");

        let a = service
            .submit(&RequestContext::anonymous(), "hello".to_string(), None)
            .expect("create A");
        let b = service
            .submit(&bob, "world".to_string(), Some(a.id))
            .expect("create B");

        let thread = service.thread(a.id).expect("thread");
        assert_eq!(thread.paste.content, "hello");
        assert_eq!(thread.children, vec![b.clone()]);
        assert_eq!(b.parent_id, Some(a.id));

        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, format!("thread:{}", a.id));
        assert_eq!(events[0].1["author"], "Bob");
    }

    #[test]
    fn reply_to_authored_paste_notifies_personal_channel() {
        let recorder = Arc::new(RecordingPublisher::default());
        let (service, _dir) = service_with(recorder.clone());
        let alice = login(&service, "wb-alice", "Alice");
        let bob = login(&service, "wb-bob", "Bob");

        let parent = service
            .submit(&alice, "question".to_string(), None)
            .expect("parent");
        let reply = service
            .submit(&bob, "answer".to_string(), Some(parent.id))
            .expect("reply");

        let channels: Vec<String> = recorder.events().into_iter().map(|(c, _)| c).collect();
        assert_eq!(
            channels,
            vec![
                format!("thread:{}", parent.id),
                format!("user:{}", alice.user_id().expect("alice id")),
            ]
        );
        assert!(recorder
            .events()
            .iter()
            .all(|(_, payload)| payload["replyId"] == reply.id));
    }

    #[test]
    fn top_level_paste_publishes_nothing() {
        let recorder = Arc::new(RecordingPublisher::default());
        let (service, _dir) = service_with(recorder.clone());

        service
            .submit(&RequestContext::anonymous(), "solo".to_string(), None)
            .expect("create");
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn publish_failure_keeps_the_reply() {
        let (service, _dir) = service_with(Arc::new(FailingPublisher));
        let parent = service
            .submit(&RequestContext::anonymous(), "p".to_string(), None)
            .expect("parent");
        let reply = service
            .submit(&RequestContext::anonymous(), "r".to_string(), Some(parent.id))
            .expect("reply survives publish failure");

        assert_eq!(service.paste(reply.id).expect("stored").parent_id, Some(parent.id));
    }

    #[test]
    fn submit_rejects_empty_oversize_and_orphan_replies() {
        let recorder = Arc::new(RecordingPublisher::default());
        let (service, _dir) = service_with(recorder.clone());
        let anon = RequestContext::anonymous();

        assert!(matches!(
            service.submit(&anon, String::new(), None),
            Err(AppError::ValidationFailed(_))
        ));
        assert!(matches!(
            service.submit(&anon, "x".repeat(2048), None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.submit(&anon, "reply".to_string(), Some(999)),
            Err(AppError::NotFound)
        ));
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn delete_requires_exact_author() {
        let (service, _dir) = service_with(Arc::new(RecordingPublisher::default()));
        let alice = login(&service, "wb-alice", "Alice");
        let bob = login(&service, "wb-bob", "Bob");
        let anon = RequestContext::anonymous();

        let owned = service.submit(&alice, "mine".to_string(), None).expect("owned");
        let orphan = service.submit(&anon, "nobody's".to_string(), None).expect("anon");

        assert!(matches!(service.delete(&bob, owned.id), Err(AppError::Unauthorized)));
        assert!(matches!(service.delete(&anon, owned.id), Err(AppError::Unauthorized)));
        assert!(matches!(service.delete(&alice, orphan.id), Err(AppError::Unauthorized)));
        assert!(matches!(service.delete(&anon, orphan.id), Err(AppError::Unauthorized)));

        service.delete(&alice, owned.id).expect("author delete");
        assert!(matches!(service.paste(owned.id), Err(AppError::NotFound)));
        assert!(matches!(service.delete(&alice, owned.id), Err(AppError::NotFound)));
    }

    #[test]
    fn list_mine_pages_newest_first() {
        let (service, _dir) = service_with(Arc::new(RecordingPublisher::default()));
        let alice = login(&service, "wb-alice", "Alice");
        let ids: Vec<u64> = (0..3)
            .map(|n| {
                service
                    .submit(&alice, format!("paste {}", n), None)
                    .expect("create")
                    .id
            })
            .collect();

        let first = service.list_mine(&alice, 1).expect("page 1");
        assert_eq!(first.total, 3);
        assert_eq!(first.pages(), 2);
        assert_eq!(
            first.items.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![ids[2], ids[1]]
        );

        let second = service.list_mine(&alice, 2).expect("page 2");
        assert_eq!(second.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ids[0]]);
        assert!(!second.has_next());

        assert!(service.list_mine(&alice, 3).expect("page 3").is_out_of_range());
        assert!(matches!(
            service.list_mine(&RequestContext::anonymous(), 1),
            Err(AppError::Unauthorized)
        ));
    }
}
