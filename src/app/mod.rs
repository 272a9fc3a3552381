use crate::api::{ApiClient, AuthInterceptor, DocumentCookies};
use crate::config::AppConfig;
use crate::dom::{self, DomLoginFlow, MountedView};
use crate::pages::{HeaderView, HomepageView, SprintView};
use crate::router::Router;
use crate::session::SessionStore;
use crate::state::{AppContext, AppState};
use crate::storage::BrowserStorage;
use crate::views::ViewLifecycleManager;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

/// What every route handler receives.
#[derive(Clone)]
pub(crate) struct RouteContext {
    pub ctx: AppContext,
    pub content: HtmlElement,
}

fn home(page: &RouteContext, _args: &[String]) {
    let ctx = page.ctx;
    let view = MountedView::boxed(page.content.clone(), move || {
        view! { <HomepageView ctx=ctx /> }.into_any()
    });
    ctx.get().show(view);
}

fn sprint(page: &RouteContext, args: &[String]) {
    let ctx = page.ctx;
    let id = args.first().cloned().unwrap_or_default();
    let view = MountedView::boxed(page.content.clone(), move || {
        view! { <SprintView ctx=ctx id=id.clone() /> }.into_any()
    });
    ctx.get().show(view);
}

fn page_url(window: &web_sys::Window) -> Option<reqwest::Url> {
    let href = window.location().href().ok()?;
    reqwest::Url::parse(&href).ok()
}

fn mount_header(ctx: AppContext) -> Rc<RefCell<ViewLifecycleManager>> {
    let chrome = Rc::new(RefCell::new(ViewLifecycleManager::new()));

    let header = dom::document().and_then(|d| {
        let header = d.create_element("header").ok()?;
        d.body()?.prepend_with_node_1(&header).ok()?;
        header.dyn_into::<HtmlElement>().ok()
    });
    match header {
        Some(header) => chrome.borrow_mut().show(MountedView::boxed(header, move || {
            view! { <HeaderView ctx=ctx /> }.into_any()
        })),
        None => log::warn!("cannot create page header"),
    }
    chrome
}

fn current_hash(window: &web_sys::Window) -> String {
    window.location().hash().unwrap_or_default()
}

/// Wires the services together and routes the current location.
pub fn start() {
    let config = AppConfig::load();
    let Some(window) = web_sys::window() else {
        log::error!("no window, nothing to start");
        return;
    };
    let Some(page_url) = page_url(&window) else {
        log::error!("cannot read page location");
        return;
    };
    let Some(content) = dom::query(&config.content_selector) else {
        log::error!("content element {} not found", config.content_selector);
        return;
    };

    let session = SessionStore::open(BrowserStorage, config.token_key.clone());
    let interceptor = AuthInterceptor::new(
        session.clone(),
        DocumentCookies,
        page_url.clone(),
        &config.csrf_cookie,
        &config.csrf_header,
    );
    let client = ApiClient::new(page_url).with_middleware(interceptor);
    let state = AppState::new(config, session.clone(), client);
    let ctx = AppContext::new(state.clone());

    spawn_local(async move {
        // Failure is already logged; dependent views keep waiting.
        let _ = state.bootstrap().await;
    });

    let chrome = mount_header(ctx);
    let flow = Rc::new(DomLoginFlow::new(ctx, content.clone(), chrome));
    let router = Rc::new(
        Router::new(session, flow)
            .route("", "home", home)
            .route("sprint/:id", "sprint", sprint),
    );
    let page = RouteContext { ctx, content };

    ctx.get().set_reroute({
        let router = router.clone();
        let page = page.clone();
        move || {
            if let Some(w) = web_sys::window() {
                router.dispatch(&page, &current_hash(&w));
            }
        }
    });

    let on_hashchange = {
        let router = router.clone();
        let page = page.clone();
        Closure::wrap(Box::new(move |_: web_sys::Event| {
            if let Some(w) = web_sys::window() {
                router.dispatch(&page, &current_hash(&w));
            }
        }) as Box<dyn FnMut(web_sys::Event)>)
    };
    if window
        .add_event_listener_with_callback("hashchange", on_hashchange.as_ref().unchecked_ref())
        .is_err()
    {
        log::warn!("cannot listen for hashchange");
    }
    on_hashchange.forget();

    router.dispatch(&page, &current_hash(&window));
}
