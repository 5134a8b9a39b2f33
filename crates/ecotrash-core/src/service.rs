// ── Entity services ──
//
// Per-resource CRUD adapters. Screens and synchronizers talk to the
// `EntityService` trait so they can run against the REST backend or an
// in-memory fake.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use ecotrash_api::{ApiClient, Resource, UpdateMethod, paths};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Client, Entity, EntityId, Location, Management};

/// CRUD operations for one entity type.
///
/// `create` and `update` return `None` when the server's answer is not a
/// full record; callers then re-fetch.
pub trait EntityService<T>: Send + Sync {
    fn list(&self) -> impl Future<Output = Result<Vec<T>, CoreError>> + Send;

    fn get(&self, id: &EntityId) -> impl Future<Output = Result<T, CoreError>> + Send;

    fn create(
        &self,
        payload: &Value,
    ) -> impl Future<Output = Result<Option<T>, CoreError>> + Send;

    fn update(
        &self,
        id: &EntityId,
        payload: &Value,
    ) -> impl Future<Output = Result<Option<T>, CoreError>> + Send;

    fn delete(&self, id: &EntityId) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// `EntityService` backed by a REST collection.
pub struct RestService<T> {
    api: Arc<ApiClient>,
    resource: Resource,
    _entity: PhantomData<fn() -> T>,
}

impl<T> RestService<T> {
    pub fn new(api: Arc<ApiClient>, resource: Resource) -> Self {
        Self {
            api,
            resource,
            _entity: PhantomData,
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }
}

impl RestService<Management> {
    pub fn managements(api: Arc<ApiClient>) -> Self {
        Self::new(api, Resource::new(paths::MANAGEMENTS))
    }
}

impl RestService<Location> {
    pub fn locations(api: Arc<ApiClient>) -> Self {
        Self::new(api, Resource::new(paths::LOCATIONS))
    }
}

impl RestService<Client> {
    /// Clients are scoped to a management company and replaced with PUT.
    pub fn clients(api: Arc<ApiClient>, management: &EntityId) -> Self {
        let resource = Resource::new(paths::CLIENTS)
            .with_list_path(paths::clients_by_management(&management.to_string()))
            .with_update_method(UpdateMethod::Put);
        Self::new(api, resource)
    }
}

impl<T: Entity + DeserializeOwned> RestService<T> {
    /// Decode a write response; anything that is not a full record is
    /// treated as "no authoritative copy".
    fn decode(body: Option<Value>) -> Option<T> {
        let body = body?;
        match serde_json::from_value(body) {
            Ok(entity) => Some(entity),
            Err(e) => {
                debug!(kind = T::KIND, error = %e, "write response is not a full record");
                None
            }
        }
    }
}

impl<T: Entity + DeserializeOwned> EntityService<T> for RestService<T> {
    async fn list(&self) -> Result<Vec<T>, CoreError> {
        Ok(self.api.list(&self.resource).await?)
    }

    async fn get(&self, id: &EntityId) -> Result<T, CoreError> {
        match self.api.fetch(&self.resource, &id.to_string()).await {
            Ok(entity) => Ok(entity),
            Err(e) if e.is_not_found() => Err(CoreError::NotFound {
                entity_type: T::KIND.into(),
                identifier: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, payload: &Value) -> Result<Option<T>, CoreError> {
        let body: Option<Value> = self.api.create(&self.resource, payload).await?;
        Ok(Self::decode(body))
    }

    async fn update(&self, id: &EntityId, payload: &Value) -> Result<Option<T>, CoreError> {
        let body: Option<Value> = self
            .api
            .update(&self.resource, &id.to_string(), payload)
            .await?;
        Ok(Self::decode(body))
    }

    async fn delete(&self, id: &EntityId) -> Result<(), CoreError> {
        match self.api.destroy(&self.resource, &id.to_string()).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Err(CoreError::NotFound {
                entity_type: T::KIND.into(),
                identifier: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
