// Resource-scoped CRUD endpoints
//
// Every entity screen talks to a router-generated collection such as
// `management/management/` with items at `{collection}{id}/`. The methods
// here are generic over the record type; typed models live in
// `ecotrash-core`.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::ListPayload;

/// Collection paths, relative to the API base URL.
pub mod paths {
    pub const MANAGEMENTS: &str = "management/management/";
    pub const LOCATIONS: &str = "core/locations/";
    pub const CLIENTS: &str = "client/client/";
    pub const CLIENT_LOCATIONS: &str = "client/locations/";

    /// Clients are listed per management company.
    pub fn clients_by_management(management_id: &str) -> String {
        format!("client/by-management/{management_id}/")
    }
}

/// HTTP verb used for updates. Management and location screens send
/// partial PATCH bodies; the client screen replaces with PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMethod {
    #[default]
    Patch,
    Put,
}

impl UpdateMethod {
    fn as_method(self) -> Method {
        match self {
            Self::Patch => Method::PATCH,
            Self::Put => Method::PUT,
        }
    }
}

/// A REST collection rooted at a path under the API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    collection: String,
    list_path: Option<String>,
    update: UpdateMethod,
}

impl Resource {
    pub fn new(collection: impl Into<String>) -> Self {
        let mut collection = collection.into();
        if !collection.ends_with('/') {
            collection.push('/');
        }
        Self {
            collection,
            list_path: None,
            update: UpdateMethod::default(),
        }
    }

    /// List from a different path than the collection root (e.g. clients
    /// listed through `client/by-management/{id}/`).
    pub fn with_list_path(mut self, path: impl Into<String>) -> Self {
        self.list_path = Some(path.into());
        self
    }

    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update = method;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn list_path(&self) -> &str {
        self.list_path.as_deref().unwrap_or(&self.collection)
    }

    /// Item path: `{collection}{id}/`.
    pub fn item(&self, id: &str) -> String {
        format!("{}{id}/", self.collection)
    }
}

impl ApiClient {
    /// List every record in a collection.
    ///
    /// `GET {list_path}`
    pub async fn list<T: DeserializeOwned>(&self, resource: &Resource) -> Result<Vec<T>, Error> {
        debug!(path = resource.list_path(), "listing records");
        let payload: ListPayload<T> = self.get(resource.list_path()).await?;
        Ok(payload.into_vec())
    }

    /// Fetch a single record.
    ///
    /// `GET {collection}{id}/`
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        resource: &Resource,
        id: &str,
    ) -> Result<T, Error> {
        debug!(path = resource.collection(), id, "fetching record");
        self.get(&resource.item(id)).await
    }

    /// Create a record. The server answers with the created row, or with
    /// an empty body on some endpoints (hence `Option`).
    ///
    /// `POST {collection}`
    pub async fn create<T: DeserializeOwned>(
        &self,
        resource: &Resource,
        body: &(impl Serialize + Sync),
    ) -> Result<Option<T>, Error> {
        debug!(path = resource.collection(), "creating record");
        self.send_json(Method::POST, resource.collection(), body)
            .await
    }

    /// Update a record with the resource's configured verb.
    ///
    /// `PATCH|PUT {collection}{id}/`
    pub async fn update<T: DeserializeOwned>(
        &self,
        resource: &Resource,
        id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Option<T>, Error> {
        debug!(path = resource.collection(), id, method = ?resource.update, "updating record");
        self.send_json(resource.update.as_method(), &resource.item(id), body)
            .await
    }

    /// Delete a record.
    ///
    /// `DELETE {collection}{id}/`
    pub async fn destroy(&self, resource: &Resource, id: &str) -> Result<(), Error> {
        debug!(path = resource.collection(), id, "deleting record");
        self.delete(&resource.item(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_paths_append_id() {
        let res = Resource::new(paths::MANAGEMENTS);
        assert_eq!(res.item("12"), "management/management/12/");
        assert_eq!(res.list_path(), "management/management/");
    }

    #[test]
    fn collection_gains_trailing_slash() {
        let res = Resource::new("core/locations");
        assert_eq!(res.collection(), "core/locations/");
    }

    #[test]
    fn list_path_override() {
        let res = Resource::new(paths::CLIENTS)
            .with_list_path(paths::clients_by_management("4"))
            .with_update_method(UpdateMethod::Put);
        assert_eq!(res.list_path(), "client/by-management/4/");
        assert_eq!(res.item("9"), "client/client/9/");
    }
}
