// ── CRUD screen controller ──
//
// One finite-state controller per entity screen: list, detail form and
// submission tied together. Each opened form gets its own controller and
// orchestrator; closing the form detaches any in-flight submission.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::form::{FormController, FormHandle, Trigger};
use crate::model::{Entity, EntityId};
use crate::service::EntityService;
use crate::store::{CreatePolicy, ListSynchronizer};
use crate::submit::{SubmissionOrchestrator, SubmitOutcome};
use crate::validate::{FieldValue, FormSchema};

/// What the screen is doing. Exactly one state at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScreenState {
    #[default]
    Idle,
    Loading,
    /// A form is open; `target` is `None` when creating.
    Editing { target: Option<EntityId> },
    Submitting,
}

struct OpenForm {
    form: FormHandle,
    orchestrator: SubmissionOrchestrator,
}

pub struct CrudScreen<T: Entity, S: EntityService<T>> {
    service: S,
    schema: Arc<FormSchema>,
    trigger: Trigger,
    list: ListSynchronizer<T>,
    open: Option<OpenForm>,
    state: ScreenState,
}

impl<T, S> CrudScreen<T, S>
where
    T: Entity + Serialize,
    S: EntityService<T>,
{
    pub fn new(service: S, schema: Arc<FormSchema>) -> Self {
        Self {
            service,
            schema,
            trigger: Trigger::default(),
            list: ListSynchronizer::new(),
            open: None,
            state: ScreenState::Idle,
        }
    }

    pub fn with_policy(mut self, policy: CreatePolicy) -> Self {
        self.list = self.list.with_policy(policy);
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn list(&self) -> &ListSynchronizer<T> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListSynchronizer<T> {
        &mut self.list
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn schema(&self) -> &Arc<FormSchema> {
        &self.schema
    }

    /// The open form, if any.
    pub fn form(&self) -> Option<&FormHandle> {
        self.open.as_ref().map(|o| &o.form)
    }

    pub fn orchestrator(&self) -> Option<&SubmissionOrchestrator> {
        self.open.as_ref().map(|o| &o.orchestrator)
    }

    // ── List ────────────────────────────────────────────────────────

    pub async fn load(&mut self) -> Result<(), CoreError> {
        self.state = ScreenState::Loading;
        let result = self.list.refresh(&self.service).await;
        self.state = ScreenState::Idle;
        result
    }

    /// Fresh copy of one record from the server.
    pub async fn detail(&self, id: &EntityId) -> Result<T, CoreError> {
        self.service.get(id).await
    }

    pub async fn delete(&mut self, id: &EntityId) -> Result<(), CoreError> {
        self.service.delete(id).await?;
        self.list.after_delete(id);
        Ok(())
    }

    // ── Form ────────────────────────────────────────────────────────

    /// Open an empty create form, pre-filled with `defaults`.
    pub fn open_create<I, K, V>(&mut self, defaults: I) -> FormHandle
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        let form = self.mount(defaults);
        self.state = ScreenState::Editing { target: None };
        form
    }

    /// Open an edit form filled from the server's copy of `id`.
    pub async fn open_edit(&mut self, id: &EntityId) -> Result<FormHandle, CoreError> {
        let entity = self.service.get(id).await?;
        let values = form_values(&self.schema, &entity)?;
        let form = self.mount(values);
        self.state = ScreenState::Editing {
            target: Some(id.clone()),
        };
        Ok(form)
    }

    /// Close the form. A submission still in flight is abandoned.
    pub fn close(&mut self) {
        if let Some(open) = self.open.take() {
            open.orchestrator.detach();
        }
        self.state = ScreenState::Idle;
    }

    /// Submit the open form as a create or an update, then bring the list
    /// back in line with the server. On success the form is closed; on
    /// rejection it stays open with its errors. A failed list refresh after
    /// an accepted write is logged and does not change the outcome.
    pub async fn submit(&mut self) -> Result<SubmitOutcome<Option<T>>, CoreError> {
        let ScreenState::Editing { target } = self.state.clone() else {
            return Err(CoreError::NoOpenForm);
        };
        let Some((form, orchestrator)) = self
            .open
            .as_ref()
            .map(|o| (o.form.clone(), o.orchestrator.clone()))
        else {
            return Err(CoreError::NoOpenForm);
        };

        self.state = ScreenState::Submitting;
        let service = &self.service;
        let op_target = target.clone();
        let outcome = orchestrator
            .submit(
                &form,
                |submission| async move {
                    match &op_target {
                        Some(id) => service.update(id, &submission.payload).await,
                        None => service.create(&submission.payload).await,
                    }
                },
                |_| {},
            )
            .await;

        match &outcome {
            SubmitOutcome::Submitted(returned) => {
                debug!(kind = T::KIND, "submission accepted");
                self.close();
                let synced = match target {
                    Some(_) => self.list.after_update(returned.clone(), &self.service).await,
                    None => self.list.after_create(returned.clone(), &self.service).await,
                };
                // The write stands; the next refresh brings the list back.
                if let Err(e) = synced {
                    warn!(kind = T::KIND, error = %e, "saved, but the list could not be refreshed");
                }
            }
            SubmitOutcome::Rejected(_) | SubmitOutcome::Busy => {
                self.state = ScreenState::Editing { target };
            }
            SubmitOutcome::Abandoned => self.state = ScreenState::Idle,
        }
        Ok(outcome)
    }

    fn mount<I, K, V>(&mut self, values: I) -> FormHandle
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        self.close();
        let form = FormController::new(Arc::clone(&self.schema))
            .with_trigger(self.trigger)
            .into_handle();
        form.reset(values);
        self.open = Some(OpenForm {
            form: form.clone(),
            orchestrator: SubmissionOrchestrator::new(),
        });
        form
    }
}

/// Initial form values for editing `entity`: every schema field the record
/// carries, converted to input text.
pub fn form_values<T: Serialize>(
    schema: &FormSchema,
    entity: &T,
) -> Result<Vec<(String, FieldValue)>, CoreError> {
    let Value::Object(record) = serde_json::to_value(entity)
        .map_err(|e| CoreError::Internal(format!("cannot serialize record: {e}")))?
    else {
        return Err(CoreError::Internal("record is not a JSON object".into()));
    };
    Ok(schema
        .fields()
        .iter()
        .filter_map(|f| {
            record
                .get(&f.name)
                .map(|v| (f.name.clone(), FieldValue::from_json(v)))
        })
        .collect())
}
