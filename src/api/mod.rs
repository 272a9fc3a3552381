mod error;
mod interceptor;

pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use interceptor::{
    is_safe_method, parse_cookie, AuthInterceptor, CookieSource, DocumentCookies,
    RequestMiddleware,
};

use crate::collections::{CollectionUrls, Page};
use crate::forms::FormData;
use reqwest::{Method, Request, Url};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LoginResponse {
    pub token: String,
}

/// Request pipeline shared by every view.
///
/// All traffic goes through [`ApiClient::send`], which runs the registered
/// middleware in order before handing the request to reqwest.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    page_url: Url,
    middleware: Vec<Rc<dyn RequestMiddleware>>,
}

impl ApiClient {
    pub fn new(page_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            page_url,
            middleware: Vec::new(),
        }
    }

    pub fn with_middleware(mut self, middleware: impl RequestMiddleware + 'static) -> Self {
        self.middleware.push(Rc::new(middleware));
        self
    }

    /// Resolves a possibly relative URL against the page location.
    pub fn resolve(&self, url: &str) -> ApiResult<Url> {
        self.page_url.join(url).map_err(ApiError::parse)
    }

    /// Builds a request with the middleware already applied.
    pub fn prepare(
        &self,
        method: Method,
        url: &str,
        body: RequestBody<'_>,
    ) -> ApiResult<Request> {
        let url = self.resolve(url)?;
        let mut builder = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");

        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(form) => builder.form(form),
        };

        let mut req = builder.build().map_err(ApiError::network)?;
        for hook in &self.middleware {
            hook.before_send(&mut req);
        }
        Ok(req)
    }

    pub async fn send(&self, req: Request) -> ApiResult<reqwest::Response> {
        let method = req.method().clone();
        let url = req.url().clone();
        log::debug!("{method} {url}");

        let res = self.http.execute(req).await.map_err(ApiError::network)?;
        if res.status().is_success() {
            Ok(res)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::from_response(
                status,
                &body,
                &format!("{method} {url} failed"),
            ))
        }
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: RequestBody<'_>,
    ) -> ApiResult<T> {
        let req = self.prepare(method, url, body)?;
        let res = self.send(req).await?;
        res.json().await.map_err(ApiError::parse)
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        self.request(Method::GET, url, RequestBody::Empty).await
    }

    /// Reads the API root, which lists the base URL of every collection.
    pub async fn fetch_api_root(&self, api_root: &str) -> ApiResult<CollectionUrls> {
        self.get_json(api_root).await
    }

    /// Exchanges form-encoded credentials for an API token.
    pub async fn login(&self, login_url: &str, credentials: &FormData) -> ApiResult<LoginResponse> {
        self.request(Method::POST, login_url, RequestBody::Form(credentials))
            .await
    }

    pub async fn fetch_page<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<Page<T>> {
        self.get_json(url).await
    }

    pub async fn fetch_resource<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        self.get_json(url).await
    }

    /// POSTs `attributes` to a collection and returns the stored entity.
    pub async fn create<T, B>(&self, collection_url: &str, attributes: &B) -> ApiResult<T>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize,
    {
        let body = serde_json::to_value(attributes).map_err(ApiError::parse)?;
        self.request(Method::POST, collection_url, RequestBody::Json(&body))
            .await
    }
}

pub enum RequestBody<'a> {
    Empty,
    Json(&'a serde_json::Value),
    Form(&'a FormData),
}
