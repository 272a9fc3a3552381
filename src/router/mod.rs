//! Hash router whose every handler runs behind an authentication check.
//!
//! Handlers are wrapped by [`AuthGuard`] when the route table is built. An
//! anonymous navigation hides the content region, captures the handler and
//! its arguments as a [`PendingLogin`], and presents the login form; the
//! form's completion event restores the page and replays the capture.

mod pattern;

pub use pattern::RoutePattern;

use crate::forms::Completion;
use crate::session::SessionStore;
use std::cell::RefCell;
use std::rc::Rc;

pub type Handler<C> = Rc<dyn Fn(&C, &[String])>;

/// Handler returned by [`AuthGuard::wrap`].
pub type GuardedHandler<C> = Rc<dyn Fn(&C, &[String]) -> Navigation>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteRequest {
    pub path: String,
    pub handler_name: String,
    pub args: Vec<String>,
}

/// Where a navigation attempt ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// The handler ran.
    Resumed,
    /// The handler is parked until the login form completes.
    AwaitingLogin,
    /// No route matched; nothing ran.
    Unmatched,
}

/// Page chrome the guard drives while a login is pending.
pub trait LoginFlow {
    fn hide_content(&self);
    fn show_content(&self);
    /// Re-renders chrome that depends on the auth state (the header).
    fn render_chrome(&self);
    /// Mounts a login form next to the hidden content and returns its
    /// completion event.
    fn present_login(&self) -> Completion;
    /// Removes a login form that will never complete.
    fn dismiss_login(&self);
}

pub struct PendingLogin<C> {
    ctx: C,
    handler: Handler<C>,
    args: Vec<String>,
}

impl<C> PendingLogin<C> {
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

struct GuardState<C> {
    pending: Option<PendingLogin<C>>,
    login: Option<Completion>,
}

/// Wraps handlers so they only run for an authenticated session.
pub struct AuthGuard<C> {
    session: SessionStore,
    flow: Rc<dyn LoginFlow>,
    state: Rc<RefCell<GuardState<C>>>,
}

impl<C> Clone for AuthGuard<C> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            flow: self.flow.clone(),
            state: self.state.clone(),
        }
    }
}

impl<C: Clone + 'static> AuthGuard<C> {
    pub fn new(session: SessionStore, flow: Rc<dyn LoginFlow>) -> Self {
        Self {
            session,
            flow,
            state: Rc::new(RefCell::new(GuardState {
                pending: None,
                login: None,
            })),
        }
    }

    pub fn wrap(&self, handler: Handler<C>) -> GuardedHandler<C> {
        let guard = self.clone();
        Rc::new(move |ctx: &C, args: &[String]| {
            if guard.session.authenticated() {
                handler(ctx, args);
                Navigation::Resumed
            } else {
                guard.suspend(ctx.clone(), handler.clone(), args.to_vec());
                Navigation::AwaitingLogin
            }
        })
    }

    pub fn is_awaiting_login(&self) -> bool {
        self.state.borrow().pending.is_some()
    }

    fn suspend(&self, ctx: C, handler: Handler<C>, args: Vec<String>) {
        self.flow.hide_content();

        let already_presented = {
            let mut state = self.state.borrow_mut();
            // Latest navigation wins; the earlier capture is released.
            state.pending = Some(PendingLogin { ctx, handler, args });
            state.login.as_ref().is_some_and(|c| !c.is_done())
        };
        if already_presented {
            log::debug!("login already presented, replacing pending navigation");
            return;
        }

        log::debug!("anonymous navigation, presenting login");
        let completion = self.flow.present_login();
        let guard = self.clone();
        completion.on_done(move || guard.resume());
        self.state.borrow_mut().login = Some(completion);
    }

    fn resume(&self) {
        let pending = {
            let mut state = self.state.borrow_mut();
            state.login = None;
            state.pending.take()
        };
        let Some(pending) = pending else {
            return;
        };

        log::debug!("login complete, resuming navigation");
        self.flow.render_chrome();
        self.flow.show_content();
        (pending.handler)(&pending.ctx, &pending.args);
    }

    /// Drops the pending navigation and removes the login form.
    pub fn cancel(&self) -> bool {
        let (pending, login) = {
            let mut state = self.state.borrow_mut();
            (state.pending.take(), state.login.take())
        };
        if pending.is_none() && login.is_none() {
            return false;
        }

        log::debug!("pending login cancelled");
        self.flow.dismiss_login();
        self.flow.show_content();
        true
    }
}

struct Route<C> {
    pattern: RoutePattern,
    name: String,
    handler: GuardedHandler<C>,
}

/// Route table mapping hash fragments to guarded handlers.
///
/// The first registered pattern that matches wins.
pub struct Router<C> {
    routes: Vec<Route<C>>,
    guard: AuthGuard<C>,
}

impl<C: Clone + 'static> Router<C> {
    pub fn new(session: SessionStore, flow: Rc<dyn LoginFlow>) -> Self {
        Self {
            routes: Vec::new(),
            guard: AuthGuard::new(session, flow),
        }
    }

    pub fn route(
        mut self,
        pattern: &str,
        name: &str,
        handler: impl Fn(&C, &[String]) + 'static,
    ) -> Self {
        self.routes.push(Route {
            pattern: RoutePattern::parse(pattern),
            name: name.to_string(),
            handler: self.guard.wrap(Rc::new(handler)),
        });
        self
    }

    pub fn recognize(&self, path: &str) -> Option<RouteRequest> {
        self.routes.iter().find_map(|route| {
            route.pattern.matches(path).map(|args| RouteRequest {
                path: path.to_string(),
                handler_name: route.name.clone(),
                args,
            })
        })
    }

    /// Routes `path`. Leaving for an unmatched path while a login is
    /// pending abandons that login.
    pub fn dispatch(&self, ctx: &C, path: &str) -> Navigation {
        match self.recognize(path) {
            Some(request) => self.run(ctx, request),
            None => {
                log::debug!("no route for {path:?}");
                self.cancel_pending_login();
                Navigation::Unmatched
            }
        }
    }

    /// Runs the guarded handler named by `request`.
    pub fn run(&self, ctx: &C, request: RouteRequest) -> Navigation {
        let Some(route) = self.routes.iter().find(|r| r.name == request.handler_name) else {
            log::debug!("no handler named {}", request.handler_name);
            return Navigation::Unmatched;
        };
        log::debug!("dispatch {:?} -> {}", request.path, route.name);
        (route.handler)(ctx, &request.args)
    }

    pub fn is_awaiting_login(&self) -> bool {
        self.guard.is_awaiting_login()
    }

    pub fn cancel_pending_login(&self) -> bool {
        self.guard.cancel()
    }
}
