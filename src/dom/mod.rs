//! web-sys bindings for the view and login machinery.

use crate::forms::{Completion, FormData, FormSurface};
use crate::pages::LoginView;
use crate::router::LoginFlow;
use crate::state::AppContext;
use crate::views::{Renderable, View, ViewLifecycleManager};
use leptos::mount::mount_to;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, HtmlFormElement};

const CONTROLS: &str = "input[name], select[name], textarea[name]";
const ERROR_SELECTOR: &str = "span.error";

pub fn document() -> Option<web_sys::Document> {
    web_sys::window().and_then(|w| w.document())
}

pub fn query(selector: &str) -> Option<HtmlElement> {
    document()?
        .query_selector(selector)
        .ok()
        .flatten()
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
}

fn elements(root: &Element, selector: &str) -> Vec<Element> {
    let Ok(list) = root.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

fn prop(el: &Element, name: &str) -> wasm_bindgen::JsValue {
    js_sys::Reflect::get(el, &name.into()).unwrap_or(wasm_bindgen::JsValue::UNDEFINED)
}

fn attr_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A `<form>` element as a [`FormSurface`].
#[derive(Clone)]
pub struct HtmlFormSurface {
    form: HtmlFormElement,
}

impl HtmlFormSurface {
    pub fn new(form: HtmlFormElement) -> Self {
        Self { form }
    }

    /// The form that dispatched `ev`.
    pub fn from_event(ev: &web_sys::SubmitEvent) -> Option<Self> {
        ev.target()
            .and_then(|t| t.dyn_into::<HtmlFormElement>().ok())
            .map(Self::new)
    }
}

impl FormSurface for HtmlFormSurface {
    type Label = Element;

    fn values(&self) -> FormData {
        let mut data = FormData::new();
        for control in elements(&self.form, CONTROLS) {
            if control.has_attribute("disabled") {
                continue;
            }
            let kind = control.get_attribute("type").unwrap_or_default().to_lowercase();
            match kind.as_str() {
                "submit" | "button" | "reset" | "file" | "image" => continue,
                "checkbox" | "radio" if !prop(&control, "checked").is_truthy() => continue,
                _ => {}
            }
            let Some(name) = control.get_attribute("name") else {
                continue;
            };
            let value = prop(&control, "value").as_string().unwrap_or_default();
            data.insert(name, value);
        }
        data
    }

    fn label_for(&self, field: &str) -> Option<Element> {
        let control = self
            .form
            .query_selector(&format!("[name=\"{}\"]", attr_value(field)))
            .ok()
            .flatten()?;
        let id = control.id();
        if id.is_empty() {
            return None;
        }
        self.form
            .query_selector(&format!("label[for=\"{}\"]", attr_value(&id)))
            .ok()
            .flatten()
    }

    fn first_label(&self) -> Option<Element> {
        self.form.query_selector("label").ok().flatten()
    }

    fn annotate(&self, label: &Element, message: &str) {
        let Some(document) = document() else {
            return;
        };
        let Ok(span) = document.create_element("span") else {
            log::warn!("cannot create error annotation");
            return;
        };
        span.set_class_name("error");
        span.set_text_content(Some(message));
        if label.before_with_node_1(&span).is_err() {
            log::warn!("cannot place error annotation");
        }
    }

    fn clear_annotations(&self) {
        for el in elements(&self.form, ERROR_SELECTOR) {
            el.remove();
        }
    }
}

/// A Leptos view mounted on a fixed container element.
///
/// Every render remounts from `build`; teardown drops the reactive owner and
/// empties the container.
pub struct MountedView {
    container: HtmlElement,
    build: Rc<dyn Fn() -> AnyView>,
    handle: Option<Box<dyn Any>>,
}

impl MountedView {
    pub fn new(container: HtmlElement, build: impl Fn() -> AnyView + 'static) -> Self {
        Self {
            container,
            build: Rc::new(build),
            handle: None,
        }
    }

    pub fn boxed(container: HtmlElement, build: impl Fn() -> AnyView + 'static) -> Box<dyn View> {
        Box::new(Self::new(container, build))
    }
}

impl Renderable for MountedView {
    fn render(&mut self) {
        self.handle = None;
        self.container.set_inner_html("");
        let build = self.build.clone();
        let handle = mount_to(self.container.clone(), move || build());
        self.handle = Some(Box::new(handle));
    }
}

impl View for MountedView {
    fn teardown(&mut self) {
        self.handle = None;
        self.container.set_inner_html("");
    }
}

struct MountedLogin {
    holder: Element,
    _handle: Box<dyn Any>,
}

/// Login flow over the real page: hides the content element and mounts a
/// `LoginView` in a sibling `div#login`.
pub struct DomLoginFlow {
    ctx: AppContext,
    content: HtmlElement,
    chrome: Rc<RefCell<ViewLifecycleManager>>,
    login: Rc<RefCell<Option<MountedLogin>>>,
}

impl DomLoginFlow {
    pub fn new(
        ctx: AppContext,
        content: HtmlElement,
        chrome: Rc<RefCell<ViewLifecycleManager>>,
    ) -> Self {
        Self {
            ctx,
            content,
            chrome,
            login: Rc::new(RefCell::new(None)),
        }
    }

    fn remove(slot: &RefCell<Option<MountedLogin>>) {
        if let Some(login) = slot.borrow_mut().take() {
            login.holder.remove();
        }
    }
}

impl LoginFlow for DomLoginFlow {
    fn hide_content(&self) {
        self.content.set_hidden(true);
    }

    fn show_content(&self) {
        self.content.set_hidden(false);
    }

    fn render_chrome(&self) {
        self.chrome.borrow_mut().refresh();
    }

    fn present_login(&self) -> Completion {
        let completion = Completion::new();
        Self::remove(&self.login);

        let holder = document()
            .and_then(|d| d.create_element("div").ok())
            .and_then(|el| el.dyn_into::<HtmlElement>().ok());
        let Some(holder) = holder else {
            log::warn!("cannot create login container");
            return completion;
        };
        holder.set_id("login");
        if self.content.after_with_node_1(&holder).is_err() {
            log::warn!("cannot place login container");
            return completion;
        }

        let ctx = self.ctx;
        let for_view = completion.clone();
        let handle = mount_to(holder.clone(), move || {
            let completion = StoredValue::new_local(for_view);
            view! { <LoginView ctx=ctx completion=completion /> }
        });
        *self.login.borrow_mut() = Some(MountedLogin {
            holder: holder.into(),
            _handle: Box::new(handle),
        });

        // The form emits from inside its own submit task; unmount afterwards.
        let slot = self.login.clone();
        completion.set_detach(move || {
            spawn_local(async move { Self::remove(&slot) });
        });
        completion
    }

    fn dismiss_login(&self) {
        Self::remove(&self.login);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use crate::forms::ErrorDisplaying;
    use crate::forms::FieldErrors;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn login_form() -> HtmlFormSurface {
        let document = document().expect("document");
        let form = document
            .create_element("form")
            .expect("form")
            .dyn_into::<HtmlFormElement>()
            .expect("form element");
        form.set_inner_html(
            r#"<label for="id_username">Username</label>
               <input id="id_username" name="username" value="ann">
               <label for="id_password">Password</label>
               <input id="id_password" name="password" type="password" value="pw">
               <input type="checkbox" name="remember">
               <button type="submit" name="go">Go</button>"#,
        );
        HtmlFormSurface::new(form)
    }

    #[wasm_bindgen_test]
    fn values_skip_buttons_and_unchecked_boxes() {
        let values = login_form().values();
        assert_eq!(values.get("username").map(String::as_str), Some("ann"));
        assert_eq!(values.get("password").map(String::as_str), Some("pw"));
        assert!(!values.contains_key("remember"));
        assert!(!values.contains_key("go"));
    }

    #[wasm_bindgen_test]
    fn errors_render_before_label_and_clear() {
        let form = login_form();
        let mut errors = FieldErrors::new();
        errors.push("username", "This field is required.");
        errors.push("detail", "Bad request");

        form.show_errors(&errors);
        let spans = elements(&form.form, ERROR_SELECTOR);
        assert_eq!(spans.len(), 2);
        assert!(spans
            .iter()
            .all(|s| s.next_element_sibling().map(|l| l.tag_name()).as_deref() == Some("LABEL")));

        form.show_errors(&errors);
        assert_eq!(elements(&form.form, ERROR_SELECTOR).len(), 2);

        form.clear_errors();
        assert!(elements(&form.form, ERROR_SELECTOR).is_empty());
    }
}
