use crate::session::SessionStore;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Request, Url};
use std::rc::Rc;

/// Hook run on every outgoing request before it is sent.
pub trait RequestMiddleware {
    fn before_send(&self, req: &mut Request);
}

/// Read access to the page's cookies.
pub trait CookieSource {
    fn cookie(&self, name: &str) -> Option<String>;
}

/// Cookies of the current document.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentCookies;

impl CookieSource for DocumentCookies {
    fn cookie(&self, name: &str) -> Option<String> {
        use wasm_bindgen::JsCast;

        let document = web_sys::window()?
            .document()?
            .dyn_into::<web_sys::HtmlDocument>()
            .ok()?;
        let header = document.cookie().ok()?;
        parse_cookie(&header, name)
    }
}

/// Finds `name` in a `document.cookie` style string and percent-decodes it.
pub fn parse_cookie(header: &str, name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }

    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key != name {
            return None;
        }
        Some(
            urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string()),
        )
    })
}

/// HTTP methods that never carry the CSRF header.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Attaches the CSRF header (unsafe, same-origin requests) and the
/// `Authorization: Token <value>` header (while authenticated).
///
/// Only headers are added; nothing is ever blocked here.
pub struct AuthInterceptor {
    session: SessionStore,
    cookies: Rc<dyn CookieSource>,
    page_url: Url,
    csrf_cookie: String,
    csrf_header: HeaderName,
}

impl AuthInterceptor {
    pub fn new(
        session: SessionStore,
        cookies: impl CookieSource + 'static,
        page_url: Url,
        csrf_cookie: &str,
        csrf_header: &str,
    ) -> Self {
        let csrf_header = HeaderName::from_bytes(csrf_header.as_bytes()).unwrap_or_else(|_| {
            log::warn!("invalid CSRF header name {csrf_header:?}, using X-CSRFToken");
            HeaderName::from_static("x-csrftoken")
        });

        Self {
            session,
            cookies: Rc::new(cookies),
            page_url,
            csrf_cookie: csrf_cookie.to_string(),
            csrf_header,
        }
    }

    fn same_origin(&self, url: &Url) -> bool {
        url.origin() == self.page_url.origin()
    }

    fn attach_csrf(&self, req: &mut Request) {
        if is_safe_method(req.method()) || !self.same_origin(req.url()) {
            return;
        }

        let Some(token) = self.cookies.cookie(&self.csrf_cookie) else {
            log::debug!("no {} cookie for {} {}", self.csrf_cookie, req.method(), req.url());
            return;
        };

        match HeaderValue::from_str(&token) {
            Ok(value) => {
                req.headers_mut().insert(self.csrf_header.clone(), value);
            }
            Err(_) => log::warn!("CSRF cookie holds a value unusable as a header"),
        }
    }

    fn attach_token(&self, req: &mut Request) {
        let Some(token) = self.session.token() else {
            return;
        };

        match HeaderValue::from_str(&format!("Token {token}")) {
            Ok(value) => {
                req.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => log::warn!("session token is not a valid header value"),
        }
    }
}

impl RequestMiddleware for AuthInterceptor {
    fn before_send(&self, req: &mut Request) {
        self.attach_csrf(req);
        self.attach_token(req);
    }
}
