use serde::{Deserialize, Serialize};

const DEFAULT_API_ROOT: &str = "/api/";
const DEFAULT_API_LOGIN: &str = "/api/token/";

/// Runtime configuration of the board client.
///
/// The Django template ships it as JSON inside `<script id="config">`; a
/// `window.ENV` object is accepted as a fallback for static deployments.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub api_root: String,
    pub api_login: String,
    pub csrf_cookie: String,
    pub csrf_header: String,
    pub token_key: String,
    pub content_selector: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            api_login: DEFAULT_API_LOGIN.to_string(),
            csrf_cookie: "csrftoken".to_string(),
            csrf_header: "X-CSRFToken".to_string(),
            token_key: "apiToken".to_string(),
            content_selector: "#content".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Reads the embedded config block, then `window.ENV`, then defaults.
    pub fn load() -> Self {
        if let Some(config) = Self::from_config_element() {
            return config;
        }
        if let Some(config) = Self::from_window_env() {
            return config;
        }
        log::debug!("no embedded config found, using defaults");
        Self::default()
    }

    fn from_config_element() -> Option<Self> {
        let text = web_sys::window()?
            .document()?
            .get_element_by_id("config")?
            .text_content()?;

        match Self::from_json(&text) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("ignoring malformed #config block: {e}");
                None
            }
        }
    }

    fn from_window_env() -> Option<Self> {
        let env = web_sys::window()?.get("ENV")?;
        if env.is_undefined() || !env.is_object() {
            return None;
        }

        // Both the upper-case and snake_case spellings are in use.
        let read = |keys: &[&str]| {
            keys.iter().find_map(|k| {
                js_sys::Reflect::get(&env, &(*k).into())
                    .ok()
                    .and_then(|v| v.as_string())
            })
        };

        let mut config = Self::default();
        let mut found = false;
        if let Some(root) = read(&["API_ROOT", "api_root"]) {
            config.api_root = root;
            found = true;
        }
        if let Some(login) = read(&["API_LOGIN", "api_login"]) {
            config.api_login = login;
            found = true;
        }
        found.then_some(config)
    }
}
