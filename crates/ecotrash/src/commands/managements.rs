//! Management company command handlers.

use std::sync::Arc;

use tabled::Tabled;

use ecotrash_core::{FormSchema, Management, RestService, schemas};

use crate::cli::EntityArgs;
use crate::error::CliError;
use crate::output;

use super::Ctx;
use super::entity::{self, EntityView};
use super::util::{local_time, or_dash};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct ManagementRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "RFC")]
    rfc: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl EntityView for Management {
    type Row = ManagementRow;
    const PLURAL: &'static str = "managements";

    fn row(&self) -> ManagementRow {
        ManagementRow {
            id: self.pk_management,
            name: self.name.clone(),
            email: self.email.clone().unwrap_or_default(),
            phone: self.phone_number.clone().unwrap_or_default(),
            rfc: self.rfc.clone().unwrap_or_default(),
            active: output::yes_no(self.is_active),
        }
    }

    fn detail(&self) -> String {
        [
            format!("ID:        {}", self.pk_management),
            format!("Name:      {}", self.name),
            format!("Email:     {}", or_dash(self.email.as_deref())),
            format!("Phone:     {}", or_dash(self.phone_number.as_deref())),
            format!("Phone 2:   {}", or_dash(self.phone_number_2.as_deref())),
            format!("RFC:       {}", or_dash(self.rfc.as_deref())),
            format!("Active:    {}", output::yes_no(self.is_active)),
            format!("Created:   {}", local_time(self.created_at)),
            format!("Updated:   {}", local_time(self.updated_at)),
        ]
        .join("\n")
    }

    fn schema() -> Arc<FormSchema> {
        schemas::management()
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Ctx<'_>, args: EntityArgs) -> Result<(), CliError> {
    let service = RestService::managements(Arc::clone(ctx.session.api()));
    entity::handle::<Management, _>(ctx, service, args.command, Vec::new()).await
}
