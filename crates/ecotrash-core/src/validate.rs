// ── Schema validation ──
//
// Declarative per-field rules evaluated against a whole-form snapshot.
// Validation is pure: the same `FormState` always yields the same
// `ValidationResult`, and every pass recomputes the result from scratch.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use strum::Display;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Absent fields read as this value.
static NULL: FieldValue = FieldValue::Null;

// ── Values & state ──────────────────────────────────────────────────

/// Kind of input a field collects. Drives prompting and payload typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    Text,
    Email,
    Password,
    Number,
    Boolean,
    Enum,
}

/// Raw user input for one field. Numbers are kept as typed text and only
/// converted when a request payload is built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// `Null`, empty text and whitespace-only text count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Bool(_) => false,
        }
    }

    /// Text form used by length and pattern checks.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Text(s) => Cow::Borrowed(s),
            Self::Bool(b) => Cow::Owned(b.to_string()),
        }
    }

    /// Convert a JSON value from a server record into form input.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::String(s) => Self::Text(s.clone()),
            Value::Number(n) => Self::Text(n.to_string()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Per-field interaction state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldState {
    pub value: FieldValue,
    pub touched: bool,
    pub dirty: bool,
}

/// Ordered snapshot of every field in one form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    fields: IndexMap<String, FieldState>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `name`; absent fields read as `Null`.
    pub fn value(&self, name: &str) -> &FieldValue {
        self.fields.get(name).map_or(&NULL, |f| &f.value)
    }

    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldState)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut FieldState> {
        self.fields.get_mut(name)
    }

    pub(crate) fn insert(&mut self, name: String, value: FieldValue) {
        self.fields.insert(
            name,
            FieldState {
                value,
                ..FieldState::default()
            },
        );
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FormState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (name, value) in iter {
            state.insert(name.into(), value.into());
        }
        state
    }
}

// ── Rules ───────────────────────────────────────────────────────────

/// Predicate over a field value and the whole form. `true` means valid.
pub type Predicate = Arc<dyn Fn(&FieldValue, &FormState) -> bool + Send + Sync>;

/// A single constraint on a field.
#[derive(Clone)]
pub enum Check {
    /// Not `Null`, empty or whitespace-only.
    Required,
    /// At least this many characters.
    MinLength(usize),
    /// At most this many characters.
    MaxLength(usize),
    Pattern(Regex),
    Email,
    /// Parses as a finite number.
    Number,
    /// Parses as a number no smaller than the bound.
    Min(f64),
    OneOf(Vec<String>),
    /// Equal to the value of another field.
    Matches(String),
    /// Different from a fixed value.
    NotEqual(String),
    Custom(Predicate),
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "Required"),
            Self::MinLength(n) => write!(f, "MinLength({n})"),
            Self::MaxLength(n) => write!(f, "MaxLength({n})"),
            Self::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
            Self::Email => write!(f, "Email"),
            Self::Number => write!(f, "Number"),
            Self::Min(min) => write!(f, "Min({min})"),
            Self::OneOf(options) => write!(f, "OneOf({options:?})"),
            Self::Matches(other) => write!(f, "Matches({other})"),
            Self::NotEqual(_) => write!(f, "NotEqual(..)"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A check paired with the message shown when it fails.
#[derive(Debug, Clone)]
pub struct Rule {
    pub check: Check,
    pub message: String,
}

impl Rule {
    pub fn new(check: Check, message: impl Into<String>) -> Self {
        Self {
            check,
            message: message.into(),
        }
    }

    /// Whether `value` satisfies this rule within `state`.
    pub fn passes(&self, value: &FieldValue, state: &FormState) -> bool {
        let text = value.text();
        match &self.check {
            Check::Required => !value.is_empty(),
            Check::MinLength(min) => text.chars().count() >= *min,
            Check::MaxLength(max) => text.chars().count() <= *max,
            Check::Pattern(re) => re.is_match(&text),
            Check::Email => EMAIL.is_match(text.trim()),
            Check::Number => parse_number(&text).is_some(),
            Check::Min(min) => parse_number(&text).is_some_and(|n| n >= *min),
            Check::OneOf(options) => options.iter().any(|o| *o == text),
            Check::Matches(other) => text == state.value(other).text(),
            Check::NotEqual(forbidden) => text != forbidden.as_str(),
            Check::Custom(predicate) => predicate(value, state),
        }
    }
}

pub(crate) fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

// ── Schemas ─────────────────────────────────────────────────────────

/// Rules for one field, evaluated in declaration order.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    /// Allowed values for `Enum` fields.
    pub options: Vec<String>,
    pub rules: Vec<Rule>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            options: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn email(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Email)
    }

    pub fn password(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Password)
    }

    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Number)
    }

    pub fn boolean(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Boolean)
    }

    pub fn choice<I, S>(name: impl Into<String>, label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = Self::new(name, label, FieldKind::Enum);
        field.options = options.into_iter().map(Into::into).collect();
        field
    }

    pub fn rule(mut self, check: Check, message: impl Into<String>) -> Self {
        self.rules.push(Rule::new(check, message));
        self
    }

    pub fn required(self, message: impl Into<String>) -> Self {
        self.rule(Check::Required, message)
    }

    pub fn min_length(self, min: usize, message: impl Into<String>) -> Self {
        self.rule(Check::MinLength(min), message)
    }

    pub fn max_length(self, max: usize, message: impl Into<String>) -> Self {
        self.rule(Check::MaxLength(max), message)
    }

    pub fn pattern(self, re: Regex, message: impl Into<String>) -> Self {
        self.rule(Check::Pattern(re), message)
    }

    pub fn email_format(self, message: impl Into<String>) -> Self {
        self.rule(Check::Email, message)
    }

    pub fn numeric(self, message: impl Into<String>) -> Self {
        self.rule(Check::Number, message)
    }

    pub fn min(self, min: f64, message: impl Into<String>) -> Self {
        self.rule(Check::Min(min), message)
    }

    /// Restrict to this field's `options`.
    pub fn one_of(self, message: impl Into<String>) -> Self {
        let options = self.options.clone();
        self.rule(Check::OneOf(options), message)
    }

    pub fn matches(self, other: impl Into<String>, message: impl Into<String>) -> Self {
        self.rule(Check::Matches(other.into()), message)
    }

    pub fn not_equal(self, forbidden: impl Into<String>, message: impl Into<String>) -> Self {
        self.rule(Check::NotEqual(forbidden.into()), message)
    }

    pub fn custom<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&FieldValue, &FormState) -> bool + Send + Sync + 'static,
    {
        self.rule(Check::Custom(Arc::new(predicate)), message)
    }

    pub fn is_required(&self) -> bool {
        self.rules.iter().any(|r| matches!(r.check, Check::Required))
    }

    /// Message of the first violated rule, if any.
    ///
    /// An empty value on an optional field is valid and skips every rule.
    pub fn check(&self, state: &FormState) -> Option<&str> {
        let value = state.value(&self.name);
        if value.is_empty() && !self.is_required() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| !rule.passes(value, state))
            .map(|rule| rule.message.as_str())
    }
}

/// The full rule set of one form. Immutable once built; share it as
/// `Arc<FormSchema>`.
#[derive(Debug, Clone)]
pub struct FormSchema {
    pub name: String,
    fields: Vec<FieldSchema>,
}

impl FormSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// A state holding every declared field, all `Null`.
    pub fn initial_state(&self) -> FormState {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), FieldValue::Null))
            .collect()
    }

    /// Validate every declared field. Fields in `state` that the schema
    /// does not declare are ignored.
    pub fn validate(&self, state: &FormState) -> ValidationResult {
        let mut result = ValidationResult::default();
        for field in &self.fields {
            if let Some(message) = field.check(state) {
                result.fields.insert(field.name.clone(), message.to_owned());
            }
        }
        result
    }

    /// Validate a single field. Unknown names are valid.
    pub fn validate_field(&self, name: &str, state: &FormState) -> Option<String> {
        self.get(name)?.check(state).map(str::to_owned)
    }
}

// ── Results ─────────────────────────────────────────────────────────

/// Field name -> first error message, plus form-level messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub(crate) fields: IndexMap<String, String>,
    pub(crate) form: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Messages that belong to the whole form rather than one field.
    pub fn form_errors(&self) -> &[String] {
        &self.form
    }

    pub fn len(&self) -> usize {
        self.fields.len() + self.form.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_valid()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form.clone();
        parts.extend(self.errors().map(|(field, msg)| format!("{field}: {msg}")));
        write!(f, "{}", parts.join("; "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn password_schema() -> FormSchema {
        FormSchema::new("password")
            .field(
                FieldSchema::password("password", "Password")
                    .required("Password is required")
                    .min_length(8, "Password must be at least 8 characters"),
            )
            .field(
                FieldSchema::password("confirm", "Confirm password")
                    .required("Confirm your password")
                    .matches("password", "Passwords do not match"),
            )
    }

    #[test]
    fn short_password_reports_length_message() {
        let schema = password_schema();
        let state: FormState = [("password", "abc"), ("confirm", "abc")].into_iter().collect();
        assert_eq!(
            schema.validate_field("password", &state).as_deref(),
            Some("Password must be at least 8 characters")
        );
    }

    #[test]
    fn first_violated_rule_wins() {
        let schema = password_schema();
        let state = schema.initial_state();
        let result = schema.validate(&state);
        assert_eq!(result.error("password"), Some("Password is required"));
        assert_eq!(result.error("confirm"), Some("Confirm your password"));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn whitespace_only_fails_required() {
        let schema = password_schema();
        let state: FormState = [("password", "   ")].into_iter().collect();
        assert_eq!(
            schema.validate_field("password", &state).as_deref(),
            Some("Password is required")
        );
    }

    #[test]
    fn confirmation_follows_primary_field() {
        let schema = password_schema();
        let mut state: FormState = [("password", "Secret123!"), ("confirm", "Secret12")]
            .into_iter()
            .collect();
        assert_eq!(
            schema.validate_field("confirm", &state).as_deref(),
            Some("Passwords do not match")
        );

        state.field_mut("confirm").unwrap().value = "Secret123!".into();
        assert!(schema.validate(&state).is_valid());

        state.field_mut("password").unwrap().value = "Other456!".into();
        assert_eq!(
            schema.validate(&state).error("confirm"),
            Some("Passwords do not match")
        );
    }

    #[test]
    fn empty_optional_field_skips_rules() {
        let schema = FormSchema::new("loc").field(
            FieldSchema::text("interior_number", "Interior number")
                .max_length(20, "Too long")
                .pattern(Regex::new(r"^[0-9A-Za-z-]+$").unwrap(), "Invalid"),
        );
        assert!(schema.validate(&schema.initial_state()).is_valid());

        let state: FormState = [("interior_number", "4 B")].into_iter().collect();
        assert_eq!(schema.validate(&state).error("interior_number"), Some("Invalid"));
    }

    #[test]
    fn lengths_count_characters() {
        let schema = FormSchema::new("n").field(
            FieldSchema::text("name", "Name")
                .required("required")
                .max_length(5, "too long"),
        );
        let state: FormState = [("name", "ñandú")].into_iter().collect();
        assert!(schema.validate(&state).is_valid());
    }

    #[test]
    fn unknown_and_absent_fields() {
        let schema = password_schema();
        let state: FormState = [("nickname", "x")].into_iter().collect();
        let result = schema.validate(&state);
        assert!(result.error("nickname").is_none());
        assert_eq!(result.error("password"), Some("Password is required"));
        assert!(schema.validate_field("nickname", &state).is_none());
    }

    #[test]
    fn numeric_and_choice_checks() {
        let schema = FormSchema::new("client")
            .field(
                FieldSchema::number("fk_management", "Management")
                    .required("required")
                    .numeric("must be a number")
                    .min(1.0, "must be at least 1"),
            )
            .field(
                FieldSchema::choice("role", "Role", ["admin", "employee"])
                    .required("required")
                    .one_of("pick admin or employee"),
            );

        let state: FormState = [("fk_management", "abc"), ("role", "root")]
            .into_iter()
            .collect();
        let result = schema.validate(&state);
        assert_eq!(result.error("fk_management"), Some("must be a number"));
        assert_eq!(result.error("role"), Some("pick admin or employee"));

        let state: FormState = [("fk_management", "0"), ("role", "admin")]
            .into_iter()
            .collect();
        let result = schema.validate(&state);
        assert_eq!(result.error("fk_management"), Some("must be at least 1"));
        assert!(result.error("role").is_none());
    }

    #[test]
    fn custom_predicate_sees_whole_form() {
        let schema = FormSchema::new("range").field(
            FieldSchema::number("max", "Max")
                .required("required")
                .custom(
                    |value, state| {
                        let min = parse_number(&state.value("min").text());
                        let max = parse_number(&value.text());
                        matches!((min, max), (Some(lo), Some(hi)) if hi >= lo)
                    },
                    "max must not be below min",
                ),
        );
        let bad: FormState = [("min", "10"), ("max", "3")].into_iter().collect();
        let good: FormState = [("min", "1"), ("max", "3")].into_iter().collect();
        assert!(!schema.validate(&bad).is_valid());
        assert!(schema.validate(&good).is_valid());
    }

    #[test]
    fn error_iff_some_rule_is_violated() {
        let schema = FormSchema::new("f").field(
            FieldSchema::email("email", "Email")
                .required("required")
                .email_format("invalid email")
                .max_length(20, "too long"),
        );
        let cases = [
            ("", Some("required")),
            ("ana", Some("invalid email")),
            ("ana@example.com", None),
            ("a-very-long-name@example.com", Some("too long")),
        ];
        for (input, expected) in cases {
            let state: FormState = [("email", input)].into_iter().collect();
            assert_eq!(
                schema.validate_field("email", &state).as_deref(),
                expected,
                "input {input:?}"
            );
        }
    }

    #[test]
    fn field_value_from_json() {
        assert_eq!(
            FieldValue::from_json(&serde_json::json!(12)),
            FieldValue::from("12")
        );
        assert_eq!(FieldValue::from_json(&Value::Null), FieldValue::Null);
        assert_eq!(
            FieldValue::from_json(&serde_json::json!(true)),
            FieldValue::Bool(true)
        );
    }
}
