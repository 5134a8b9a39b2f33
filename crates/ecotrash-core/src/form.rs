// ── Form state controller ──
//
// Owns the field values of one mounted form, decides when each field's
// error becomes visible, and merges server-side messages into the same
// result the validator produces.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ecotrash_api::FieldErrors;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::validate::{
    FieldKind, FieldValue, FormSchema, FormState, ValidationResult, parse_number,
};

/// When a field's own error message starts being shown.
///
/// A submit attempt always validates every field, and from then on every
/// field re-validates on change regardless of the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    OnChange,
    /// Shown on blur, hidden again while the field is being edited.
    OnBlur,
    OnSubmit,
    /// Validate on first blur, then on every change.
    #[default]
    OnBlurThenChange,
}

/// Values, touched/dirty flags and visible errors of one form instance.
pub struct FormController {
    schema: Arc<FormSchema>,
    trigger: Trigger,
    state: FormState,
    /// Fields whose errors are currently shown.
    active: HashSet<String>,
    /// Messages returned by the server for the last submission.
    server: ValidationResult,
    result: ValidationResult,
    submitted: bool,
}

impl FormController {
    pub fn new(schema: Arc<FormSchema>) -> Self {
        let state = schema.initial_state();
        Self {
            schema,
            trigger: Trigger::default(),
            state,
            active: HashSet::new(),
            server: ValidationResult::default(),
            result: ValidationResult::default(),
            submitted: false,
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn schema(&self) -> &Arc<FormSchema> {
        &self.schema
    }

    /// Wrap in a shared handle for field registration and submission.
    pub fn into_handle(self) -> FormHandle {
        FormHandle {
            inner: Arc::new(Mutex::new(self)),
        }
    }

    // ── Input events ────────────────────────────────────────────────

    /// Store a new value (invalid input is stored as-is) and mark the
    /// field dirty. Unknown field names are ignored.
    pub fn set_value(&mut self, field: &str, value: impl Into<FieldValue>) {
        let Some(slot) = self.state.field_mut(field) else {
            debug!(form = %self.schema.name, field, "ignoring change to unknown field");
            return;
        };
        slot.value = value.into();
        slot.dirty = true;
        let touched = slot.touched;

        self.server.fields.shift_remove(field);
        let show = self.submitted
            || match self.trigger {
                Trigger::OnChange => true,
                Trigger::OnBlurThenChange => touched,
                Trigger::OnBlur | Trigger::OnSubmit => false,
            };
        if show {
            self.active.insert(field.to_owned());
        } else if self.trigger == Trigger::OnBlur {
            self.active.remove(field);
        }
        self.recompute();
    }

    /// Mark a field as touched (the user left it).
    pub fn set_touched(&mut self, field: &str) {
        let Some(slot) = self.state.field_mut(field) else {
            debug!(form = %self.schema.name, field, "ignoring blur of unknown field");
            return;
        };
        slot.touched = true;

        if self.submitted || matches!(self.trigger, Trigger::OnBlur | Trigger::OnBlurThenChange) {
            self.active.insert(field.to_owned());
        }
        self.recompute();
    }

    /// Start a submit attempt: show every field's error and report whether
    /// the form passes local validation. Stale server messages are dropped.
    pub fn begin_submit(&mut self) -> bool {
        self.submitted = true;
        self.server = ValidationResult::default();
        self.active = self.schema.fields().iter().map(|f| f.name.clone()).collect();
        self.recompute();
        self.result.is_valid()
    }

    /// Merge a rejected write's messages so they render like local errors.
    /// Messages for fields this form does not declare become form-level.
    pub fn apply_server_errors(&mut self, errors: &FieldErrors) {
        for (field, messages) in &errors.fields {
            let Some(first) = messages.first() else {
                continue;
            };
            if self.schema.get(field).is_some() {
                self.server.fields.insert(field.clone(), first.clone());
            } else {
                self.server.form.push(format!("{field}: {first}"));
            }
        }
        self.server.form.extend(errors.non_field.iter().cloned());
        self.recompute();
    }

    /// Show a message that belongs to the whole form (e.g. a server fault).
    pub fn apply_form_error(&mut self, message: impl Into<String>) {
        self.server.form.push(message.into());
        self.recompute();
    }

    /// Restore initial values and clear all interaction state.
    pub fn reset<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        self.state = self.schema.initial_state();
        for (name, value) in values {
            if let Some(slot) = self.state.field_mut(name.as_ref()) {
                slot.value = value.into();
            }
        }
        self.active.clear();
        self.server = ValidationResult::default();
        self.submitted = false;
        self.recompute();
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn snapshot(&self) -> FormState {
        self.state.clone()
    }

    pub fn value(&self, field: &str) -> &FieldValue {
        self.state.value(field)
    }

    /// Visible errors: local messages of active fields, then server messages.
    pub fn result(&self) -> &ValidationResult {
        &self.result
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.result.error(field)
    }

    pub fn is_dirty(&self) -> bool {
        self.state.iter().any(|(_, f)| f.dirty)
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Build the JSON request body from the current values.
    ///
    /// Number fields become JSON numbers, boolean fields JSON booleans.
    /// An empty optional field is omitted unless the user cleared it, in
    /// which case it is sent as `""` (or `null` for numbers) so a partial
    /// update erases the stored value.
    pub fn payload(&self) -> Value {
        let mut body = Map::new();
        for field in self.schema.fields() {
            let value = self.state.value(&field.name);
            if value.is_empty() {
                let cleared = self.state.field(&field.name).is_some_and(|f| f.dirty);
                if field.is_required() || (cleared && field.kind == FieldKind::Number) {
                    body.insert(field.name.clone(), Value::Null);
                } else if cleared {
                    body.insert(field.name.clone(), Value::String(String::new()));
                }
                continue;
            }
            body.insert(field.name.clone(), to_json(field.kind, value));
        }
        Value::Object(body)
    }

    fn recompute(&mut self) {
        let full = self.schema.validate(&self.state);
        let mut visible = ValidationResult::default();
        for field in self.schema.fields() {
            let local = full
                .error(&field.name)
                .filter(|_| self.active.contains(&field.name));
            if let Some(message) = local.or_else(|| self.server.error(&field.name)) {
                visible.fields.insert(field.name.clone(), message.to_owned());
            }
        }
        visible.form.clone_from(&self.server.form);
        self.result = visible;
    }
}

fn to_json(kind: FieldKind, value: &FieldValue) -> Value {
    match (kind, value) {
        (_, FieldValue::Bool(b)) => Value::Bool(*b),
        (FieldKind::Number, FieldValue::Text(text)) => {
            let text = text.trim();
            if let Ok(n) = text.parse::<i64>() {
                Value::Number(n.into())
            } else {
                parse_number(text)
                    .and_then(Number::from_f64)
                    .map_or_else(|| Value::String(text.to_owned()), Value::Number)
            }
        }
        (FieldKind::Boolean, FieldValue::Text(text)) => match text.trim() {
            "true" | "yes" | "1" => Value::Bool(true),
            "false" | "no" | "0" => Value::Bool(false),
            other => Value::String(other.to_owned()),
        },
        (_, FieldValue::Text(text)) => Value::String(text.clone()),
        (_, FieldValue::Null) => Value::Null,
    }
}

// ── Shared handles ──────────────────────────────────────────────────

/// Shared, lockable form controller. The lock is never held across an
/// `.await`.
#[derive(Clone)]
pub struct FormHandle {
    inner: Arc<Mutex<FormController>>,
}

impl FormHandle {
    /// Run `f` with exclusive access to the controller.
    pub fn with<R>(&self, f: impl FnOnce(&mut FormController) -> R) -> R {
        let mut guard = self.inner.lock().expect("form lock poisoned");
        f(&mut guard)
    }

    /// Register a field for input. Returns `None` for undeclared fields.
    pub fn register(&self, field: &str) -> Option<FieldHandle> {
        self.with(|form| form.schema.get(field).is_some())
            .then(|| FieldHandle {
                form: self.clone(),
                name: field.to_owned(),
            })
    }

    pub fn snapshot(&self) -> FormState {
        self.with(|form| form.snapshot())
    }

    pub fn result(&self) -> ValidationResult {
        self.with(|form| form.result().clone())
    }

    pub fn payload(&self) -> Value {
        self.with(|form| form.payload())
    }

    pub fn reset<I, K, V>(&self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        self.with(|form| form.reset(values));
    }
}

/// Input binding for one registered field.
#[derive(Clone)]
pub struct FieldHandle {
    form: FormHandle,
    name: String,
}

impl FieldHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> FieldValue {
        self.form.with(|form| form.value(&self.name).clone())
    }

    pub fn change(&self, value: impl Into<FieldValue>) {
        let value = value.into();
        self.form.with(|form| form.set_value(&self.name, value));
    }

    pub fn blur(&self) {
        self.form.with(|form| form.set_touched(&self.name));
    }

    pub fn error(&self) -> Option<String> {
        self.form.with(|form| form.error(&self.name).map(str::to_owned))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::validate::FieldSchema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Arc<FormSchema> {
        Arc::new(
            FormSchema::new("signup")
                .field(
                    FieldSchema::text("name", "Name")
                        .required("Name is required")
                        .min_length(3, "Name is too short"),
                )
                .field(
                    FieldSchema::password("password", "Password")
                        .required("Password is required")
                        .min_length(8, "Password is too short"),
                )
                .field(
                    FieldSchema::password("password2", "Confirm")
                        .required("Confirm your password")
                        .matches("password", "Passwords do not match"),
                )
                .field(
                    FieldSchema::number("exterior_number", "Exterior number")
                        .numeric("Not a number"),
                )
                .field(FieldSchema::text("notes", "Notes")),
        )
    }

    #[test]
    fn blur_then_change_is_the_default() {
        let mut form = FormController::new(schema());

        form.set_value("name", "ab");
        assert_eq!(form.error("name"), None, "hidden until blur");

        form.set_touched("name");
        assert_eq!(form.error("name"), Some("Name is too short"));

        form.set_value("name", "abc");
        assert_eq!(form.error("name"), None, "re-validates on change after blur");
    }

    #[test]
    fn on_blur_hides_errors_while_editing() {
        let mut form = FormController::new(schema()).with_trigger(Trigger::OnBlur);
        form.set_value("name", "ab");
        form.set_touched("name");
        assert_eq!(form.error("name"), Some("Name is too short"));

        form.set_value("name", "a");
        assert_eq!(form.error("name"), None);
        form.set_touched("name");
        assert_eq!(form.error("name"), Some("Name is too short"));
    }

    #[test]
    fn on_change_shows_errors_immediately() {
        let mut form = FormController::new(schema()).with_trigger(Trigger::OnChange);
        form.set_value("name", "ab");
        assert_eq!(form.error("name"), Some("Name is too short"));
    }

    #[test]
    fn on_submit_waits_for_the_first_attempt() {
        let mut form = FormController::new(schema()).with_trigger(Trigger::OnSubmit);
        form.set_value("name", "ab");
        form.set_touched("name");
        assert!(form.result().is_valid());

        assert!(!form.begin_submit());
        assert_eq!(form.error("name"), Some("Name is too short"));
        assert_eq!(form.error("password"), Some("Password is required"));

        form.set_value("name", "abcd");
        assert_eq!(form.error("name"), None, "every field re-validates after submit");
    }

    #[test]
    fn confirmation_tracks_primary_field() {
        let mut form = FormController::new(schema()).with_trigger(Trigger::OnChange);
        form.set_value("password", "Secret123!");
        form.set_value("password2", "Secret12");
        assert_eq!(form.error("password2"), Some("Passwords do not match"));

        form.set_value("password2", "Secret123!");
        assert_eq!(form.error("password2"), None);

        form.set_value("password", "Changed456!");
        assert_eq!(form.error("password2"), Some("Passwords do not match"));
    }

    #[test]
    fn dirty_until_reset_and_unknown_fields_ignored() {
        let mut form = FormController::new(schema());
        assert!(!form.is_dirty());
        form.set_value("nickname", "x");
        assert!(!form.is_dirty());
        assert!(!form.snapshot().contains("nickname"));

        form.set_value("name", "abc");
        assert!(form.is_dirty());

        form.reset([("name", "Initial")]);
        assert!(!form.is_dirty());
        assert!(!form.is_submitted());
        assert_eq!(form.value("name"), &FieldValue::from("Initial"));
        assert_eq!(form.value("password"), &FieldValue::Null);
    }

    #[test]
    fn server_errors_merge_and_clear_on_change() {
        let mut form = FormController::new(schema());
        let mut errors = FieldErrors::default();
        errors.fields.insert("name".into(), vec!["Name already taken".into()]);
        errors.fields.insert("username".into(), vec!["Username taken".into()]);
        errors.non_field.push("Try again".into());

        form.apply_server_errors(&errors);
        assert_eq!(form.error("name"), Some("Name already taken"));
        assert_eq!(
            form.result().form_errors(),
            ["username: Username taken".to_owned(), "Try again".to_owned()]
        );

        form.set_value("name", "Another");
        assert_eq!(form.error("name"), None);
    }

    #[test]
    fn payload_types_numbers_and_omits_empty_optionals() {
        let mut form = FormController::new(schema());
        form.set_value("name", "Depot");
        form.set_value("password", "Secret123!");
        form.set_value("password2", "Secret123!");
        form.set_value("exterior_number", "120");

        assert_eq!(
            form.payload(),
            json!({
                "name": "Depot",
                "password": "Secret123!",
                "password2": "Secret123!",
                "exterior_number": 120
            })
        );
    }

    #[test]
    fn clearing_an_optional_field_sends_an_empty_value() {
        let mut form = FormController::new(schema());
        form.reset([
            ("name", "Depot"),
            ("password", "Secret123!"),
            ("password2", "Secret123!"),
            ("exterior_number", "120"),
            ("notes", "gate code 44"),
        ]);
        form.set_value("notes", "");
        form.set_value("exterior_number", "  ");

        let body = form.payload();
        assert_eq!(body["notes"], json!(""));
        assert_eq!(body["exterior_number"], Value::Null);

        // Untouched empty optionals stay out of the body.
        form.reset([("name", "Depot")]);
        let body = form.payload();
        assert!(body.get("notes").is_none());
        assert!(body.get("exterior_number").is_none());
    }

    #[test]
    fn field_handles_drive_the_controller() {
        let handle = FormController::new(schema()).into_handle();
        assert!(handle.register("nickname").is_none());

        let name = handle.register("name").unwrap();
        name.change("ab");
        assert_eq!(name.error(), None);
        name.blur();
        assert_eq!(name.error().as_deref(), Some("Name is too short"));
        assert_eq!(name.value(), FieldValue::from("ab"));
        assert_eq!(name.name(), "name");
    }
}
