use super::CollectionUrls;
use crate::api::{ApiError, ApiResult};
use futures::channel::oneshot;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ReadinessState {
    #[default]
    NotStarted,
    Pending,
    Ready(CollectionUrls),
}

type Subscriber = Box<dyn FnOnce(&CollectionUrls)>;

#[derive(Default)]
struct GateInner {
    state: ReadinessState,
    subscribers: VecDeque<Subscriber>,
    /// Error of the bootstrap request, once it has failed.
    failure: Option<ApiError>,
    /// Later `bootstrap` callers waiting on the first call's outcome.
    outcomes: Vec<oneshot::Sender<ApiResult<()>>>,
}

/// One-shot signal that the collection URLs are known.
///
/// `NotStarted -> Pending` happens on the first [`ReadinessGate::bootstrap`],
/// `Pending -> Ready` at most once. Subscribers queued before resolution run
/// in FIFO order when it happens; later subscribers run immediately. Every
/// subscriber runs exactly once. Clones share the same gate.
#[derive(Clone, Default)]
pub struct ReadinessGate {
    inner: Rc<RefCell<GateInner>>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReadinessState {
        self.inner.borrow().state.clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.inner.borrow().state, ReadinessState::Ready(_))
    }

    pub fn urls(&self) -> Option<CollectionUrls> {
        match &self.inner.borrow().state {
            ReadinessState::Ready(urls) => Some(urls.clone()),
            _ => None,
        }
    }

    /// Claims the bootstrap. Only the first caller gets `true`.
    pub fn begin(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.state == ReadinessState::NotStarted {
            inner.state = ReadinessState::Pending;
            true
        } else {
            false
        }
    }

    /// Moves to `Ready` and drains the queue. Later calls are ignored.
    pub fn resolve(&self, urls: CollectionUrls) {
        let (queued, outcomes) = {
            let mut inner = self.inner.borrow_mut();
            if matches!(inner.state, ReadinessState::Ready(_)) {
                log::warn!("readiness gate resolved twice, ignoring");
                return;
            }
            inner.state = ReadinessState::Ready(urls.clone());
            (
                std::mem::take(&mut inner.subscribers),
                std::mem::take(&mut inner.outcomes),
            )
        };
        for tx in outcomes {
            let _ = tx.send(Ok(()));
        }

        log::debug!(
            "collections ready ({} endpoints, {} waiting)",
            urls.len(),
            queued.len()
        );
        // Subscribers may subscribe again; the state is already Ready so
        // those run inline instead of re-entering the queue.
        for subscriber in queued {
            subscriber(&urls);
        }
    }

    pub fn on_ready(&self, callback: impl FnOnce(&CollectionUrls) + 'static) {
        let urls = {
            let mut inner = self.inner.borrow_mut();
            match &inner.state {
                ReadinessState::Ready(urls) => urls.clone(),
                _ => {
                    inner.subscribers.push_back(Box::new(callback));
                    return;
                }
            }
        };
        callback(&urls);
    }

    /// Future flavour of [`ReadinessGate::on_ready`].
    ///
    /// Never completes while the gate is stuck in `Pending`.
    pub fn ready(&self) -> impl Future<Output = CollectionUrls> {
        let (tx, rx) = oneshot::channel();
        self.on_ready(move |urls| {
            let _ = tx.send(urls.clone());
        });
        async move {
            match rx.await {
                Ok(urls) => urls,
                // The sender lives in the subscriber queue, which is only
                // dropped together with the gate.
                Err(_) => futures::future::pending().await,
            }
        }
    }

    /// Single-flight bootstrap: runs `fetch` only for the first caller.
    ///
    /// Every caller gets the outcome of that one request. Later callers wait
    /// for it while it is in flight. On failure the gate stays `Pending` for
    /// good and the recorded error is handed to every caller, now and later.
    pub async fn bootstrap<F, Fut>(&self, fetch: F) -> ApiResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<CollectionUrls>>,
    {
        if !self.begin() {
            return self.outcome().await;
        }

        match fetch().await {
            Ok(urls) => {
                self.resolve(urls);
                Ok(())
            }
            Err(e) => {
                let err = ApiError::bootstrap(&e);
                log::error!("{err}; views waiting on collections will not load");
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    fn fail(&self, err: ApiError) {
        let outcomes = {
            let mut inner = self.inner.borrow_mut();
            inner.failure = Some(err.clone());
            std::mem::take(&mut inner.outcomes)
        };
        for tx in outcomes {
            let _ = tx.send(Err(err.clone()));
        }
    }

    /// Outcome of the bootstrap some other caller started.
    fn outcome(&self) -> impl Future<Output = ApiResult<()>> {
        let rx = {
            let mut inner = self.inner.borrow_mut();
            let settled = match (&inner.state, &inner.failure) {
                (ReadinessState::Ready(_), _) => Some(Ok(())),
                (_, Some(err)) => Some(Err(err.clone())),
                _ => None,
            };
            match settled {
                Some(result) => Err(result),
                None => {
                    let (tx, rx) = oneshot::channel();
                    inner.outcomes.push(tx);
                    Ok(rx)
                }
            }
        };
        async move {
            match rx {
                Err(settled) => settled,
                Ok(rx) => {
                    log::debug!("bootstrap already in flight, waiting for it");
                    match rx.await {
                        Ok(result) => result,
                        Err(_) => futures::future::pending().await,
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ReadinessGate")
            .field("state", &inner.state)
            .field("waiting", &inner.subscribers.len())
            .field("failure", &inner.failure)
            .finish()
    }
}
