//! Generic list/get/create/update/delete over one CRUD screen.
//!
//! Each resource module supplies its table row, detail view and form
//! schema through `EntityView`; the flow itself is shared.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tabled::Tabled;

use ecotrash_core::{CrudScreen, Entity, EntityService, FieldValue, FormHandle, FormSchema};

use crate::cli::{EntityCommand, FormArgs};
use crate::error::CliError;
use crate::output;
use crate::prompt::{self, Fill, Next};

use super::{Ctx, util};

/// How one resource is shown and edited.
pub trait EntityView: Entity + Serialize + DeserializeOwned {
    type Row: Tabled;

    /// Plural noun used in messages and `list` hints.
    const PLURAL: &'static str;

    fn row(&self) -> Self::Row;

    fn detail(&self) -> String;

    fn schema() -> Arc<FormSchema>;
}

pub async fn handle<T, S>(
    ctx: &Ctx<'_>,
    service: S,
    command: EntityCommand,
    defaults: Vec<(String, FieldValue)>,
) -> Result<(), CliError>
where
    T: EntityView,
    S: EntityService<T>,
{
    ctx.require_user()?;
    let global = ctx.global;
    let mut screen = CrudScreen::new(service, T::schema());

    match command {
        EntityCommand::List(args) => {
            screen.load().await.map_err(|e| ctx.fail(e))?;
            if let Some(term) = args.search {
                screen.list_mut().set_search(term);
            }
            let rows = screen.list().visible();
            let out = output::render_list(
                &global.output,
                &rows,
                |e| e.row(),
                |e| e.id().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        EntityCommand::Get { id } => {
            let id = util::parse_id(&id)?;
            let entity = screen.detail(&id).await.map_err(|e| ctx.fail(e))?;
            print_single(ctx, &entity);
            Ok(())
        }

        EntityCommand::Create(form_args) => {
            let form = screen.open_create(defaults);
            prepare(ctx, &form, &form_args)?;
            let created = submit(ctx, &mut screen, &form).await?;
            match created {
                Some(entity) => {
                    output::success(global, &format!("Created {} {}", T::KIND, entity.id()));
                    print_single(ctx, &entity);
                }
                None => output::success(global, &format!("Created {}", T::KIND)),
            }
            Ok(())
        }

        EntityCommand::Update { id, form: form_args } => {
            let id = util::parse_id(&id)?;
            let form = screen.open_edit(&id).await.map_err(|e| ctx.fail(e))?;
            prepare(ctx, &form, &form_args)?;
            let updated = submit(ctx, &mut screen, &form).await?;
            output::success(global, &format!("Updated {} {id}", T::KIND));
            if let Some(entity) = updated {
                print_single(ctx, &entity);
            }
            Ok(())
        }

        EntityCommand::Delete { id } => {
            let id = util::parse_id(&id)?;
            let message = format!("Delete {} {id}? This cannot be undone.", T::KIND);
            if !util::confirm(&message, &format!("{} delete", T::PLURAL), global)? {
                return Ok(());
            }
            screen.delete(&id).await.map_err(|e| ctx.fail(e))?;
            output::success(global, &format!("Deleted {} {id}", T::KIND));
            Ok(())
        }
    }
}

fn print_single<T: EntityView>(ctx: &Ctx<'_>, entity: &T) {
    let out = output::render_single(&ctx.global.output, entity, T::detail, |e| {
        e.id().to_string()
    });
    output::print_output(&out, ctx.global.quiet);
}

/// Apply `-f` values; with none given, prompt for the whole form.
fn prepare(ctx: &Ctx<'_>, form: &FormHandle, args: &FormArgs) -> Result<(), CliError> {
    prompt::apply_fields(form, &args.fields)?;
    if args.fields.is_empty() && prompt::interactive(ctx.global) {
        prompt::fill(form, Fill::All, ctx.global)?;
    }
    Ok(())
}

/// Submit until the server accepts the form or an error ends the attempt.
async fn submit<T, S>(
    ctx: &Ctx<'_>,
    screen: &mut CrudScreen<T, S>,
    form: &FormHandle,
) -> Result<Option<T>, CliError>
where
    T: EntityView,
    S: EntityService<T>,
{
    loop {
        let spinner = prompt::spinner(ctx.global, &format!("Saving {}...", T::KIND));
        let outcome = screen.submit().await;
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
        let outcome = outcome.map_err(|e| ctx.fail(e))?;
        if outcome.is_unauthorized() {
            return Err(ctx.expired());
        }
        match prompt::settle(outcome, form, ctx.global)? {
            Next::Done(value) => return Ok(value),
            Next::Retry => {}
        }
    }
}
