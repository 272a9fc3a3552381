use crate::api::{ApiClient, ApiError, ApiErrorKind, ApiResult};
use crate::collections::{Collections, ReadinessGate};
use crate::config::AppConfig;
use crate::forms::FormData;
use crate::models::{Sprint, Task};
use crate::session::SessionStore;
use crate::views::{View, ViewLifecycleManager};
use leptos::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Services shared by the router and every view.
///
/// Cheap to clone; all clones point at the same session, pipeline, gate and
/// collections.
#[derive(Clone)]
pub(crate) struct AppState {
    pub config: Rc<AppConfig>,
    pub session: SessionStore,
    pub client: ApiClient,
    pub gate: ReadinessGate,
    pub collections: Rc<RefCell<Option<Collections>>>,
    pub views: Rc<RefCell<ViewLifecycleManager>>,
    reroute: Rc<RefCell<Option<Rc<dyn Fn()>>>>,
}

impl AppState {
    pub fn new(config: AppConfig, session: SessionStore, client: ApiClient) -> Self {
        let state = Self {
            config: Rc::new(config),
            session,
            client,
            gate: ReadinessGate::new(),
            collections: Rc::new(RefCell::new(None)),
            views: Rc::new(RefCell::new(ViewLifecycleManager::new())),
            reroute: Rc::new(RefCell::new(None)),
        };
        state.install_collections();
        state
    }

    /// First readiness subscriber: builds the shared collections so every
    /// later subscriber finds them in place.
    fn install_collections(&self) {
        let slot = self.collections.clone();
        self.gate.on_ready(move |urls| match Collections::from_urls(urls) {
            Ok(collections) => *slot.borrow_mut() = Some(collections),
            Err(e) => log::error!("{e}"),
        });
    }

    /// Starts the one-time API root request.
    pub async fn bootstrap(&self) -> ApiResult<()> {
        let client = self.client.clone();
        let api_root = self.config.api_root.clone();
        self.gate
            .bootstrap(move || async move { client.fetch_api_root(&api_root).await })
            .await
    }

    pub fn show(&self, view: Box<dyn View>) {
        self.views.borrow_mut().show(view);
    }

    /// Hook that routes the current location again.
    pub fn set_reroute(&self, reroute: impl Fn() + 'static) {
        *self.reroute.borrow_mut() = Some(Rc::new(reroute));
    }

    /// A 401 means the stored token is no longer accepted: drop it and route
    /// again so the login form comes up. Returns false for any other error.
    pub fn recover(&self, err: &ApiError) -> bool {
        if err.kind != ApiErrorKind::Unauthorized {
            return false;
        }
        log::info!("token rejected, logging out: {err}");
        self.session.delete();

        let reroute = self.reroute.borrow().clone();
        match reroute {
            Some(reroute) => reroute(),
            None => log::warn!("no router to send the session back to login"),
        }
        true
    }

    /// Waits for readiness, then returns the base URL of collection `name`.
    async fn collection_url(&self, name: &str) -> ApiResult<String> {
        self.gate.ready().await;
        let collections = self.collections.borrow();
        let url = collections.as_ref().and_then(|c| match name {
            "sprints" => Some(c.sprints.url()),
            "tasks" => Some(c.tasks.url()),
            "users" => Some(c.users.url()),
            _ => None,
        });
        url.map(str::to_string)
            .ok_or_else(|| ApiError::missing_collection(name))
    }

    pub async fn fetch_sprints(&self) -> ApiResult<Vec<Sprint>> {
        let url = self.collection_url("sprints").await?;
        let page = self.client.fetch_page::<Sprint>(&url).await?;

        let mut collections = self.collections.borrow_mut();
        let Some(collections) = collections.as_mut() else {
            return Ok(page.results);
        };
        collections.sprints.apply_page(page);
        Ok(collections.sprints.items().to_vec())
    }

    pub async fn create_sprint(&self, attributes: &FormData) -> ApiResult<Sprint> {
        let url = self.collection_url("sprints").await?;
        let sprint: Sprint = self.client.create(&url, attributes).await?;

        if let Some(collections) = self.collections.borrow_mut().as_mut() {
            collections.sprints.insert(sprint.clone());
        }
        Ok(sprint)
    }

    pub async fn fetch_sprint(&self, id: &str) -> ApiResult<Sprint> {
        let url = {
            let base = self.collection_url("sprints").await?;
            let collections = self.collections.borrow();
            collections
                .as_ref()
                .and_then(|c| c.sprints.find(id).and_then(|s| c.sprints.url_of(s)))
                .unwrap_or_else(|| crate::models::member_url(&base, id))
        };
        self.client.fetch_resource(&url).await
    }

    /// Tasks linked from a sprint's `tasks` link.
    pub async fn fetch_sprint_tasks(&self, sprint: &Sprint) -> ApiResult<Vec<Task>> {
        let url = match sprint.links.related("tasks") {
            Some(url) => url.to_string(),
            None => {
                let base = self.collection_url("tasks").await?;
                format!("{base}?sprint={}", sprint.id.unwrap_or_default())
            }
        };
        Ok(self.client.fetch_page::<Task>(&url).await?.results)
    }
}

/// `AppState` handle that can cross into Leptos closures.
#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub StoredValue<AppState, LocalStorage>);

impl AppContext {
    pub fn new(state: AppState) -> Self {
        Self(StoredValue::new_local(state))
    }

    pub fn get(&self) -> AppState {
        self.0.get_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::CollectionUrls;
    use crate::storage::MemoryStorage;
    use std::cell::Cell;

    fn state() -> AppState {
        let page = reqwest::Url::parse("http://localhost:8000/").expect("page url");
        AppState::new(
            AppConfig::default(),
            SessionStore::open(MemoryStorage::new(), "apiToken"),
            ApiClient::new(page),
        )
    }

    fn urls(names: &[&str]) -> CollectionUrls {
        names
            .iter()
            .map(|n| (n.to_string(), format!("/api/{n}/")))
            .collect()
    }

    #[test]
    fn test_collections_installed_before_other_subscribers() {
        let state = state();
        let seen = Rc::new(RefCell::new(None));

        let (slot, s) = (state.collections.clone(), seen.clone());
        state.gate.on_ready(move |_| {
            *s.borrow_mut() = slot.borrow().as_ref().map(|c| c.sprints.url().to_string());
        });

        assert!(state.gate.begin());
        state.gate.resolve(urls(&["sprints", "tasks", "users"]));
        assert_eq!(seen.borrow().as_deref(), Some("/api/sprints/"));
    }

    #[test]
    fn test_rejected_token_logs_out_and_reroutes() {
        let state = state();
        state.session.save(Some("stale".to_string()));
        let reroutes = Rc::new(Cell::new(0));
        let r = reroutes.clone();
        state.set_reroute(move || r.set(r.get() + 1));

        let err = ApiError::from_response(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"detail": "Invalid token."}"#,
            "GET /api/sprints/",
        );
        assert!(state.recover(&err));
        assert!(!state.session.authenticated());
        assert_eq!(reroutes.get(), 1);
    }

    #[test]
    fn test_other_errors_leave_session_alone() {
        let state = state();
        state.session.save(Some("abc".to_string()));
        let reroutes = Rc::new(Cell::new(0));
        let r = reroutes.clone();
        state.set_reroute(move || r.set(r.get() + 1));

        let err = ApiError::from_response(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "",
            "GET /api/sprints/",
        );
        assert!(!state.recover(&err));
        assert!(state.session.authenticated());
        assert_eq!(reroutes.get(), 0);
    }

    #[test]
    fn test_incomplete_api_root_leaves_collections_unset() {
        let state = state();
        state.gate.begin();
        state.gate.resolve(urls(&["sprints"]));
        assert!(state.gate.is_ready());
        assert!(state.collections.borrow().is_none());
    }
}
