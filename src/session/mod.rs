use crate::storage::KeyValueStorage;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
}

/// Owner of the API token.
///
/// Cloning yields another handle to the same session; the router, the
/// request pipeline and the views all read through these handles, and
/// `save`/`delete` are the only writers.
#[derive(Clone)]
pub struct SessionStore {
    session: Rc<RefCell<Session>>,
    storage: Rc<dyn KeyValueStorage>,
    key: String,
}

impl SessionStore {
    pub fn new(storage: impl KeyValueStorage + 'static, key: impl Into<String>) -> Self {
        Self {
            session: Rc::new(RefCell::new(Session::default())),
            storage: Rc::new(storage),
            key: key.into(),
        }
    }

    /// Creates the store and pulls any persisted token into memory.
    pub fn open(storage: impl KeyValueStorage + 'static, key: impl Into<String>) -> Self {
        let store = Self::new(storage, key);
        store.load();
        store
    }

    /// Absence of a stored token is the normal logged-out state.
    pub fn load(&self) {
        let token = self
            .storage
            .get(&self.key)
            .filter(|t| !t.trim().is_empty());
        if token.is_some() {
            log::debug!("restored session token from storage");
        }
        self.session.borrow_mut().token = token;
    }

    pub fn save(&self, token: Option<String>) {
        match &token {
            Some(t) => {
                self.storage.set(&self.key, t);
                log::info!("session authenticated");
            }
            None => {
                self.storage.remove(&self.key);
                log::info!("session cleared");
            }
        }
        self.session.borrow_mut().token = token;
    }

    pub fn delete(&self) {
        self.save(None);
    }

    pub fn authenticated(&self) -> bool {
        self.session.borrow().token.is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.session.borrow().token.clone()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &self.key)
            .field("authenticated", &self.authenticated())
            .finish()
    }
}
