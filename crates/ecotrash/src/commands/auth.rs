//! Session and account command handlers.

use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use ecotrash_core::{
    CoreError, CurrentUser, FailureReason, FieldErrors, FormController, FormHandle,
    SubmissionOrchestrator, SubmitOutcome, schemas,
};

use crate::cli::FormArgs;
use crate::error::CliError;
use crate::output;
use crate::prompt::{self, Fill, Next};

use super::Ctx;

/// What `whoami` prints. The token is never shown.
#[derive(Serialize)]
struct UserView<'a> {
    id: Option<i64>,
    username: &'a str,
    name: Option<&'a str>,
    email: &'a str,
    role: String,
    management_id: Option<i64>,
}

impl<'a> From<&'a CurrentUser> for UserView<'a> {
    fn from(user: &'a CurrentUser) -> Self {
        Self {
            id: user.id,
            username: &user.username,
            name: user.name.as_deref(),
            email: &user.email,
            role: user.role.to_string(),
            management_id: user.management_id,
        }
    }
}

fn user_detail(view: &UserView<'_>) -> String {
    let mut lines = vec![
        format!("User:        {}", view.username),
        format!("Name:        {}", view.name.unwrap_or("-")),
        format!("Email:       {}", view.email),
        format!("Role:        {}", view.role),
    ];
    if let Some(management) = view.management_id {
        lines.push(format!("Management:  {management}"));
    }
    lines.join("\n")
}

fn set_field(form: &FormHandle, field: &str, value: &str) {
    if let Some(handle) = form.register(field) {
        handle.change(value);
        handle.blur();
    }
}

/// Present a credential rejection as an error on the password field.
fn as_password_error(err: CoreError) -> CoreError {
    match err {
        CoreError::AuthenticationFailed { message } => CoreError::ValidationFailed {
            errors: FieldErrors {
                fields: BTreeMap::from([("password".to_owned(), vec![message])]),
                non_field: Vec::new(),
            },
        },
        other => other,
    }
}

// ── Login / logout ──────────────────────────────────────────────────

pub async fn login(ctx: &Ctx<'_>, email: Option<String>) -> Result<(), CliError> {
    let global = ctx.global;
    let form = FormController::new(schemas::login()).into_handle();

    let email = email.or_else(|| ctx.profile.email.clone());
    if let Some(ref email) = email {
        set_field(&form, "email", email);
    }
    // Stored password only applies to the profile's own account.
    if let Some(creds) = ctx
        .credentials
        .as_ref()
        .filter(|c| email.as_deref() == Some(c.email.as_str()))
    {
        set_field(&form, "password", creds.password.expose_secret());
    } else if let Ok(password) = std::env::var(ecotrash_config::PASSWORD_ENV) {
        set_field(&form, "password", &password);
    }
    if prompt::interactive(global) {
        prompt::fill(&form, Fill::Flagged, global)?;
    }

    let orchestrator = SubmissionOrchestrator::new();
    let user = loop {
        let spinner = prompt::spinner(global, "Logging in...");
        let outcome = orchestrator
            .submit(
                &form,
                |submission| async move {
                    let email = submission.state.value("email").text().into_owned();
                    let password =
                        SecretString::from(submission.state.value("password").text().into_owned());
                    ctx.session
                        .login(&email, &password)
                        .await
                        .map_err(as_password_error)
                },
                |user: &CurrentUser| info!(user = %user.username, "login accepted"),
            )
            .await;
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }

        if matches!(
            outcome,
            SubmitOutcome::Rejected(FailureReason::ServerValidation)
        ) && !prompt::interactive(global)
        {
            let message = form
                .result()
                .error("password")
                .unwrap_or("invalid credentials")
                .to_owned();
            return Err(CliError::AuthFailed { message });
        }
        match prompt::settle(outcome, &form, global)? {
            Next::Done(user) => break user,
            Next::Retry => {}
        }
    };

    output::success(
        global,
        &format!("Logged in as {} ({})", user.display_name(), user.role),
    );
    Ok(())
}

pub fn logout(ctx: &Ctx<'_>) -> Result<(), CliError> {
    let was_logged_in = ctx.session.is_authenticated();
    ctx.session.logout()?;
    if was_logged_in {
        output::success(ctx.global, "Logged out");
    } else {
        output::success(ctx.global, "No active session");
    }
    Ok(())
}

pub fn whoami(ctx: &Ctx<'_>) -> Result<(), CliError> {
    let user = ctx.require_user()?;
    let view = UserView::from(&user);
    let out = output::render_single(&ctx.global.output, &view, user_detail, |v| {
        v.username.to_owned()
    });
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

// ── Account forms ───────────────────────────────────────────────────

/// Submit an account form until accepted. `send` runs the request.
async fn submit_account<F, Fut>(
    ctx: &Ctx<'_>,
    form: &FormHandle,
    busy: &str,
    send: F,
) -> Result<(), CliError>
where
    F: Fn(Value) -> Fut,
    Fut: Future<Output = Result<(), CoreError>>,
{
    let orchestrator = SubmissionOrchestrator::new();
    loop {
        let spinner = prompt::spinner(ctx.global, busy);
        let outcome = orchestrator
            .submit(form, |submission| send(submission.payload), |_| {})
            .await;
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
        if outcome.is_unauthorized() {
            return Err(ctx.expired());
        }
        match prompt::settle(outcome, form, ctx.global)? {
            Next::Done(()) => return Ok(()),
            Next::Retry => {}
        }
    }
}

/// Register a user account. Administrators only.
pub async fn register(ctx: &Ctx<'_>, args: FormArgs) -> Result<(), CliError> {
    let user = ctx.require_user()?;
    if !user.is_admin() {
        return Err(CliError::Forbidden {
            message: "only administrators can register users".into(),
        });
    }

    let form = FormController::new(schemas::registration()).into_handle();
    prompt::apply_fields(&form, &args.fields)?;
    if args.fields.is_empty() && prompt::interactive(ctx.global) {
        prompt::fill(&form, Fill::All, ctx.global)?;
    }

    let api = ctx.session.api();
    submit_account(ctx, &form, "Registering user...", |payload| async move {
        api.register(&payload).await.map(drop).map_err(CoreError::from)
    })
    .await?;

    let username = form.with(|f| f.value("username").text().into_owned());
    output::success(ctx.global, &format!("Registered user {username}"));
    Ok(())
}

/// Replace the current account's password.
pub async fn change_password(ctx: &Ctx<'_>) -> Result<(), CliError> {
    ctx.require_user()?;
    if !prompt::interactive(ctx.global) {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "changing the password needs an interactive terminal".into(),
        });
    }

    let form = FormController::new(schemas::change_password()).into_handle();
    prompt::fill(&form, Fill::All, ctx.global)?;

    let api = ctx.session.api();
    submit_account(ctx, &form, "Changing password...", |payload| async move {
        let password = payload
            .get("new_password")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        api.change_password(&SecretString::from(password))
            .await
            .map_err(CoreError::from)
    })
    .await?;

    output::success(ctx.global, "Password changed");
    Ok(())
}
