//! Interactive form filling.
//!
//! Prompts drive the same field handles a screen would: every answer is
//! a change followed by a blur, so a field's error shows up exactly when
//! the form's trigger policy reveals it.

use std::io::{self, IsTerminal};
use std::time::Duration;

use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};

use ecotrash_core::{
    FailureReason, FieldHandle, FieldKind, FieldSchema, FieldValue, FormHandle, SubmitOutcome,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Which fields `fill` asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Every declared field, current values as defaults.
    All,
    /// Fields showing an error, plus empty required ones.
    Flagged,
}

/// What to do after a submit attempt.
pub enum Next<T> {
    Done(T),
    Retry,
}

/// Whether prompting is allowed at all.
pub fn interactive(global: &GlobalOpts) -> bool {
    !global.no_input && io::stdin().is_terminal()
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt(e.to_string())
}

/// Apply `-f key=value` pairs as typed input.
pub fn apply_fields(form: &FormHandle, fields: &[(String, String)]) -> Result<(), CliError> {
    for (key, value) in fields {
        let handle = form.register(key).ok_or_else(|| unknown_field(form, key))?;
        handle.change(value.as_str());
        handle.blur();
    }
    Ok(())
}

fn unknown_field(form: &FormHandle, key: &str) -> CliError {
    form.with(|f| {
        let schema = f.schema();
        CliError::UnknownField {
            field: key.into(),
            form: schema.name.clone(),
            valid: schema
                .fields()
                .iter()
                .map(|field| field.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    })
}

/// Prompt for fields until each one asked about is free of errors.
pub fn fill(form: &FormHandle, mode: Fill, global: &GlobalOpts) -> Result<(), CliError> {
    let schema = form.with(|f| f.schema().clone());
    for field in schema.fields() {
        let Some(handle) = form.register(&field.name) else {
            continue;
        };
        let flagged = handle.error().is_some() || (field.is_required() && handle.value().is_empty());
        if mode == Fill::Flagged && !flagged {
            continue;
        }
        loop {
            let answer = ask(field, &handle)?;
            handle.change(answer);
            handle.blur();
            match handle.error() {
                Some(message) => output::field_error(global, &field.label, &message),
                None => break,
            }
        }
    }
    Ok(())
}

fn ask(field: &FieldSchema, handle: &FieldHandle) -> Result<FieldValue, CliError> {
    let current = handle.value();
    let label = if field.is_required() {
        field.label.clone()
    } else {
        format!("{} (optional)", field.label)
    };

    let value = match field.kind {
        FieldKind::Password => {
            FieldValue::from(rpassword::prompt_password(format!("{label}: ")).map_err(prompt_err)?)
        }
        FieldKind::Boolean => {
            let default = matches!(current, FieldValue::Bool(true));
            FieldValue::Bool(
                Confirm::new()
                    .with_prompt(label)
                    .default(default)
                    .interact()
                    .map_err(prompt_err)?,
            )
        }
        FieldKind::Enum => {
            let default = field
                .options
                .iter()
                .position(|o| *o == current.text())
                .unwrap_or(0);
            let picked = Select::new()
                .with_prompt(label)
                .items(&field.options)
                .default(default)
                .interact()
                .map_err(prompt_err)?;
            field
                .options
                .get(picked)
                .map_or(FieldValue::Null, |o| FieldValue::from(o.as_str()))
        }
        FieldKind::Text | FieldKind::Email | FieldKind::Number => {
            let mut input = Input::<String>::new().with_prompt(label).allow_empty(true);
            if !current.is_empty() {
                input = input.default(current.text().into_owned());
            }
            FieldValue::from(input.interact_text().map_err(prompt_err)?)
        }
    };
    Ok(value)
}

/// Print every visible error of the form.
pub fn report(form: &FormHandle, global: &GlobalOpts) {
    let result = form.result();
    for message in result.form_errors() {
        output::field_error(global, "form", message);
    }
    form.with(|f| {
        for (name, message) in result.errors() {
            let label = f.schema().get(name).map_or(name, |field| field.label.as_str());
            output::field_error(global, label, message);
        }
    });
}

/// Turn a submit outcome into a value, a retry, or an error.
///
/// Field errors (local or from the server) are shown and, when prompting is
/// allowed, the offending fields are asked again.
pub fn settle<T>(
    outcome: SubmitOutcome<T>,
    form: &FormHandle,
    global: &GlobalOpts,
) -> Result<Next<T>, CliError> {
    let reason = match outcome {
        SubmitOutcome::Submitted(value) => return Ok(Next::Done(value)),
        SubmitOutcome::Busy => {
            return Err(CliError::Api {
                message: "a submission is already in progress".into(),
                status: None,
            });
        }
        SubmitOutcome::Abandoned => {
            return Err(CliError::Api {
                message: "the form was closed before the server answered".into(),
                status: None,
            });
        }
        SubmitOutcome::Rejected(reason) => reason,
    };

    match reason {
        FailureReason::LocalValidation | FailureReason::ServerValidation => {
            report(form, global);
            let result = form.result();
            let has_field_errors = result.errors().next().is_some();
            if has_field_errors && interactive(global) {
                fill(form, Fill::Flagged, global)?;
                Ok(Next::Retry)
            } else {
                Err(CliError::InvalidForm {
                    errors: result.to_string(),
                })
            }
        }
        FailureReason::Transport(message) => {
            if interactive(global)
                && Confirm::new()
                    .with_prompt(format!("{message}. Retry?"))
                    .default(true)
                    .interact()
                    .map_err(prompt_err)?
            {
                return Ok(Next::Retry);
            }
            Err(CliError::ConnectionFailed {
                url: String::new(),
                reason: message,
            })
        }
        FailureReason::ServerFault(message) => Err(CliError::Api {
            message,
            status: None,
        }),
        FailureReason::Unauthorized => Err(CliError::SessionExpired),
    }
}

/// Spinner on stderr while a request runs. Hidden when quiet or piped.
pub fn spinner(global: &GlobalOpts, message: &str) -> Option<ProgressBar> {
    if global.quiet || !io::stderr().is_terminal() {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    Some(bar)
}
