//! Form submission contract shared by every interactive form.
//!
//! A form surface only knows how to read its fields, find labels and place
//! annotations; [`FormSync`] layers the submit/failure/done protocol on top
//! of any surface.

use crate::api::{ApiError, LoginResponse};
use crate::session::SessionStore;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Flat field name to value mapping captured from a form.
pub type FormData = BTreeMap<String, String>;

/// Server-reported messages keyed by field name, in the order the server
/// listed the fields.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, Vec<String>>);

impl FieldErrors {
    /// Key under which request-wide messages are reported. No control
    /// carries this name, so these messages land on the first label.
    pub const GENERIC_FIELD: &'static str = "non_field_errors";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn generic(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(Self::GENERIC_FIELD, message);
        errors
    }

    /// Parses an error body. Fields may map to a list of messages or a
    /// single message; anything else is stringified.
    pub fn from_body(body: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        let object = value.as_object()?;

        let mut errors = Self::new();
        for (field, messages) in object {
            match messages {
                serde_json::Value::Array(items) => {
                    for item in items {
                        errors.push(field, message_text(item));
                    }
                }
                other => errors.push(field, message_text(other)),
            }
        }
        Some(errors)
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn message_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Anything that carries a cancellable default action.
pub trait PreventDefault {
    fn prevent_default(&self);
}

impl PreventDefault for web_sys::Event {
    fn prevent_default(&self) {
        web_sys::Event::prevent_default(self);
    }
}

impl PreventDefault for web_sys::SubmitEvent {
    fn prevent_default(&self) {
        web_sys::Event::prevent_default(self);
    }
}

/// The rendered form a submission came from.
pub trait FormSurface {
    type Label;

    fn values(&self) -> FormData;

    /// Label whose `for` points at the control named `field`.
    fn label_for(&self, field: &str) -> Option<Self::Label>;

    fn first_label(&self) -> Option<Self::Label>;

    /// Inserts an inline message immediately before `label`.
    fn annotate(&self, label: &Self::Label, message: &str);

    fn clear_annotations(&self);
}

/// Inline rendering of [`FieldErrors`] on a form surface.
pub trait ErrorDisplaying {
    fn clear_errors(&self);
    fn show_errors(&self, errors: &FieldErrors);
}

impl<S: FormSurface> ErrorDisplaying for S {
    fn clear_errors(&self) {
        self.clear_annotations();
    }

    fn show_errors(&self, errors: &FieldErrors) {
        self.clear_annotations();
        for (field, messages) in errors.iter() {
            // Unmatched fields still get shown, on the first label.
            let Some(label) = self.label_for(field).or_else(|| self.first_label()) else {
                log::warn!("form has no label to attach `{field}` errors to");
                continue;
            };
            for message in messages {
                self.annotate(&label, message);
            }
        }
    }
}

/// One-shot completion event of a form view.
///
/// Listeners run once, in registration order, followed by the detach hook.
#[derive(Clone, Default)]
pub struct Completion {
    inner: Rc<RefCell<CompletionInner>>,
}

#[derive(Default)]
struct CompletionInner {
    fired: bool,
    listeners: Vec<Box<dyn FnOnce()>>,
    detach: Option<Box<dyn FnOnce()>>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_done(&self, listener: impl FnOnce() + 'static) {
        self.inner.borrow_mut().listeners.push(Box::new(listener));
    }

    /// Hook that removes the view once listeners have run.
    pub fn set_detach(&self, detach: impl FnOnce() + 'static) {
        self.inner.borrow_mut().detach = Some(Box::new(detach));
    }

    pub fn is_done(&self) -> bool {
        self.inner.borrow().fired
    }

    /// Returns false if the event had already been emitted.
    pub fn emit(&self) -> bool {
        let (listeners, detach) = {
            let mut inner = self.inner.borrow_mut();
            if inner.fired {
                return false;
            }
            inner.fired = true;
            (std::mem::take(&mut inner.listeners), inner.detach.take())
        };

        for listener in listeners {
            listener();
        }
        if let Some(detach) = detach {
            detach();
        }
        true
    }
}

/// Submit/failure/done protocol over a concrete surface.
pub struct FormSync<S: FormSurface> {
    surface: S,
    completion: Completion,
}

impl<S: FormSurface> FormSync<S> {
    pub fn new(surface: S, completion: Completion) -> Self {
        Self {
            surface,
            completion,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Cancels the browser submission, captures the field values and wipes
    /// errors left over from the previous attempt.
    pub fn submit(&self, event: &impl PreventDefault) -> FormData {
        event.prevent_default();
        self.surface.clear_errors();
        self.surface.values()
    }

    pub fn failure(&self, err: &ApiError) {
        log::debug!("form submission rejected: {err}");
        self.surface.show_errors(&err.field_errors());
    }

    pub fn done(&self, event: Option<&dyn PreventDefault>) {
        if let Some(event) = event {
            event.prevent_default();
        }
        self.completion.emit();
    }

    /// Stores the issued token, then completes the form. Listeners of the
    /// completion event already see an authenticated session.
    pub fn login_succeeded(&self, session: &SessionStore, response: LoginResponse) {
        session.save(Some(response.token));
        self.done(None);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;

    /// In-memory form: controls are `(name, id)`, labels are `for` targets.
    #[derive(Default)]
    pub(crate) struct FakeForm {
        pub controls: Vec<(String, String, String)>,
        pub labels: Vec<String>,
        pub annotations: RefCell<Vec<(usize, String)>>,
    }

    impl FakeForm {
        pub(crate) fn login() -> Self {
            Self {
                controls: vec![
                    ("username".into(), "id_username".into(), "".into()),
                    ("password".into(), "id_password".into(), "".into()),
                ],
                labels: vec!["id_username".into(), "id_password".into()],
                annotations: RefCell::new(Vec::new()),
            }
        }

        pub(crate) fn with_values(mut self, values: &[(&str, &str)]) -> Self {
            for (name, value) in values {
                if let Some(c) = self.controls.iter_mut().find(|c| c.0 == *name) {
                    c.2 = value.to_string();
                }
            }
            self
        }
    }

    impl FormSurface for FakeForm {
        type Label = usize;

        fn values(&self) -> FormData {
            self.controls
                .iter()
                .map(|(name, _, value)| (name.clone(), value.clone()))
                .collect()
        }

        fn label_for(&self, field: &str) -> Option<usize> {
            let (_, id, _) = self.controls.iter().find(|c| c.0 == field)?;
            self.labels.iter().position(|l| l == id)
        }

        fn first_label(&self) -> Option<usize> {
            (!self.labels.is_empty()).then_some(0)
        }

        fn annotate(&self, label: &usize, message: &str) {
            self.annotations
                .borrow_mut()
                .push((*label, message.to_string()));
        }

        fn clear_annotations(&self) {
            self.annotations.borrow_mut().clear();
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeEvent {
        pub prevented: Cell<bool>,
    }

    impl PreventDefault for FakeEvent {
        fn prevent_default(&self) {
            self.prevented.set(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FakeEvent, FakeForm};
    use super::*;
    use std::cell::Cell;

    fn validation_error(body: &str) -> ApiError {
        ApiError::from_response(reqwest::StatusCode::BAD_REQUEST, body, "Login failed")
    }

    #[test]
    fn test_field_errors_parse_lists_and_single_messages() {
        let errors = FieldErrors::from_body(
            r#"{"username": ["This field is required."], "end": "End date cannot be in the past."}"#,
        )
        .expect("object body should parse");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("username").map(|m| m.len()), Some(1));
        assert_eq!(
            errors.get("end"),
            Some(&["End date cannot be in the past.".to_string()][..])
        );
    }

    #[test]
    fn test_errors_render_in_server_field_order() {
        let form = FakeForm::login();
        let errors = FieldErrors::from_body(
            r#"{"password": ["Too short."], "non_field_errors": ["Try again."], "username": ["Taken."]}"#,
        )
        .expect("object body should parse");
        let fields: Vec<&str> = errors.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, vec!["password", "non_field_errors", "username"]);

        form.show_errors(&errors);
        assert_eq!(
            *form.annotations.borrow(),
            vec![
                (1, "Too short.".to_string()),
                (0, "Try again.".to_string()),
                (0, "Taken.".to_string()),
            ]
        );
    }

    #[test]
    fn test_field_errors_reject_non_object_body() {
        assert!(FieldErrors::from_body(r#"["nope"]"#).is_none());
        assert!(FieldErrors::from_body("").is_none());
    }

    #[test]
    fn test_submit_prevents_default_and_captures_values() {
        let form = FormSync::new(
            FakeForm::login().with_values(&[("username", "ann"), ("password", "pw")]),
            Completion::new(),
        );
        let ev = FakeEvent::default();

        let data = form.submit(&ev);
        assert!(ev.prevented.get());
        assert_eq!(data.get("username").map(String::as_str), Some("ann"));
        assert_eq!(data.get("password").map(String::as_str), Some("pw"));
    }

    #[test]
    fn test_required_username_renders_one_error_before_its_label() {
        let form = FormSync::new(FakeForm::login(), Completion::new());
        form.submit(&FakeEvent::default());
        form.failure(&validation_error(r#"{"username": ["This field is required."]}"#));

        let annotations = form.surface().annotations.borrow();
        assert_eq!(
            *annotations,
            vec![(0, "This field is required.".to_string())]
        );
    }

    #[test]
    fn test_resubmit_clears_previous_errors_first() {
        let form = FormSync::new(FakeForm::login(), Completion::new());
        form.submit(&FakeEvent::default());
        form.failure(&validation_error(r#"{"username": ["This field is required."]}"#));

        form.submit(&FakeEvent::default());
        assert!(form.surface().annotations.borrow().is_empty());

        form.failure(&validation_error(r#"{"password": ["Wrong password."]}"#));
        assert_eq!(
            *form.surface().annotations.borrow(),
            vec![(1, "Wrong password.".to_string())]
        );
    }

    #[test]
    fn test_unmatched_field_falls_back_to_first_label() {
        let form = FormSync::new(FakeForm::login(), Completion::new());
        form.failure(&validation_error(
            r#"{"non_field_errors": ["Unable to log in with provided credentials."]}"#,
        ));
        assert_eq!(
            *form.surface().annotations.borrow(),
            vec![(0, "Unable to log in with provided credentials.".to_string())]
        );
    }

    #[test]
    fn test_show_errors_is_idempotent() {
        let form = FakeForm::login();
        let errors = FieldErrors::from_body(r#"{"username": ["a", "b"]}"#).expect("errors");
        form.show_errors(&errors);
        form.show_errors(&errors);
        assert_eq!(form.annotations.borrow().len(), 2);
    }

    #[test]
    fn test_generic_failure_still_shown() {
        let form = FormSync::new(FakeForm::login(), Completion::new());
        form.failure(&ApiError::from_response(
            reqwest::StatusCode::BAD_GATEWAY,
            "",
            "Login failed",
        ));
        let annotations = form.surface().annotations.borrow();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].0, 0);
    }

    #[test]
    fn test_form_without_labels_shows_nothing() {
        let form = FakeForm::default();
        form.show_errors(&FieldErrors::generic("boom"));
        assert!(form.annotations.borrow().is_empty());
    }

    #[test]
    fn test_done_emits_once_then_detaches() {
        let completion = Completion::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        completion.on_done(move || o.borrow_mut().push("listener"));
        let o = order.clone();
        completion.set_detach(move || o.borrow_mut().push("detach"));

        let form = FormSync::new(FakeForm::login(), completion.clone());
        let ev = FakeEvent::default();
        form.done(Some(&ev));
        form.done(None);

        assert!(ev.prevented.get());
        assert!(completion.is_done());
        assert_eq!(*order.borrow(), vec!["listener", "detach"]);
    }

    #[test]
    fn test_done_without_event() {
        let completion = Completion::new();
        let fired = Rc::new(Cell::new(0));
        let f = fired.clone();
        completion.on_done(move || f.set(f.get() + 1));

        FormSync::new(FakeForm::login(), completion).done(None);
        assert_eq!(fired.get(), 1);
    }
}
