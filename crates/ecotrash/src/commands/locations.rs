//! Pickup location command handlers.

use std::sync::Arc;

use tabled::Tabled;

use ecotrash_core::{FormSchema, Location, RestService, schemas};

use crate::cli::EntityArgs;
use crate::error::CliError;
use crate::output;

use super::Ctx;
use super::entity::{self, EntityView};
use super::util::{local_time, or_dash};

#[derive(Tabled)]
pub struct LocationRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Postcode")]
    postcode: String,
    #[tabled(rename = "Phone")]
    phone: String,
}

impl EntityView for Location {
    type Row = LocationRow;
    const PLURAL: &'static str = "locations";

    fn row(&self) -> LocationRow {
        LocationRow {
            id: self.pk_location,
            name: self.name.clone(),
            address: self.address(),
            postcode: self.postcode.clone().unwrap_or_default(),
            phone: self.phone_number.clone().unwrap_or_default(),
        }
    }

    fn detail(&self) -> String {
        [
            format!("ID:           {}", self.pk_location),
            format!("Name:         {}", self.name),
            format!("Street:       {}", or_dash(self.street_name.as_deref())),
            format!("Exterior no.: {}", or_dash(self.exterior_number.as_deref())),
            format!("Interior no.: {}", or_dash(self.interior_number.as_deref())),
            format!("Neighborhood: {}", or_dash(self.neighborhood.as_deref())),
            format!("City:         {}", or_dash(self.city.as_deref())),
            format!("State:        {}", or_dash(self.state.as_deref())),
            format!("Country:      {}", or_dash(self.country.as_deref())),
            format!("Postcode:     {}", or_dash(self.postcode.as_deref())),
            format!("Phone:        {}", or_dash(self.phone_number.as_deref())),
            format!("Active:       {}", output::yes_no(self.is_active)),
            format!("Created:      {}", local_time(self.created_at)),
        ]
        .join("\n")
    }

    fn schema() -> Arc<FormSchema> {
        schemas::location()
    }
}

pub async fn handle(ctx: &Ctx<'_>, args: EntityArgs) -> Result<(), CliError> {
    let service = RestService::locations(Arc::clone(ctx.session.api()));
    entity::handle::<Location, _>(ctx, service, args.command, Vec::new()).await
}
