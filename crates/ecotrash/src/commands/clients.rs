//! Client command handlers. Clients are listed per management company.

use std::sync::Arc;

use tabled::Tabled;

use ecotrash_core::{Client, EntityId, FieldValue, FormSchema, RestService, schemas};

use crate::cli::ClientsArgs;
use crate::error::CliError;
use crate::output;

use super::Ctx;
use super::entity::{self, EntityView};
use super::util::{local_time, or_dash};

#[derive(Tabled)]
pub struct ClientRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Legal name")]
    legal_name: String,
    #[tabled(rename = "RFC")]
    rfc: String,
    #[tabled(rename = "Email")]
    email: String,
}

impl EntityView for Client {
    type Row = ClientRow;
    const PLURAL: &'static str = "clients";

    fn row(&self) -> ClientRow {
        ClientRow {
            id: self.pk_client,
            name: self.name.clone(),
            legal_name: self.legal_name.clone().unwrap_or_default(),
            rfc: self.rfc.clone().unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
        }
    }

    fn detail(&self) -> String {
        [
            format!("ID:          {}", self.pk_client),
            format!(
                "Management:  {}",
                self.fk_management
                    .map_or_else(|| "-".to_owned(), |m| m.to_string())
            ),
            format!("Name:        {}", self.name),
            format!("Legal name:  {}", or_dash(self.legal_name.as_deref())),
            format!("RFC:         {}", or_dash(self.rfc.as_deref())),
            format!("Email:       {}", or_dash(self.email.as_deref())),
            format!("Phone:       {}", or_dash(self.phone_number.as_deref())),
            format!("Phone 2:     {}", or_dash(self.phone_number_2.as_deref())),
            format!("Active:      {}", output::yes_no(self.is_active)),
            format!("Created:     {}", local_time(self.created_at)),
        ]
        .join("\n")
    }

    fn schema() -> Arc<FormSchema> {
        schemas::client()
    }
}

pub async fn handle(ctx: &Ctx<'_>, args: ClientsArgs) -> Result<(), CliError> {
    let user = ctx.require_user()?;
    let management = args
        .management
        .or(user.management_id)
        .ok_or_else(|| CliError::Validation {
            field: "management".into(),
            reason: "pass --management <id>; your account is not tied to one".into(),
        })?;

    let service = RestService::clients(Arc::clone(ctx.session.api()), &EntityId::Int(management));
    let defaults = vec![(
        "fk_management".to_owned(),
        FieldValue::from(management.to_string()),
    )];
    entity::handle::<Client, _>(ctx, service, args.command, defaults).await
}
