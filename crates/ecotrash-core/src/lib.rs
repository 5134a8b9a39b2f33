// ecotrash-core: form pipeline and list state between ecotrash-api and the console.

pub mod config;
pub mod error;
pub mod form;
pub mod model;
pub mod schemas;
pub mod screen;
pub mod service;
pub mod session;
pub mod store;
pub mod stream;
pub mod submit;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ApiConfig, Credentials, DEFAULT_API_URL};
pub use error::CoreError;
pub use form::{FieldHandle, FormController, FormHandle, Trigger};
pub use screen::{CrudScreen, ScreenState};
pub use service::{EntityService, RestService};
pub use session::{MemoryStorage, SessionContext, SessionStorage};
pub use store::{CreatePolicy, ListSynchronizer};
pub use stream::ListWatch;
pub use submit::{FailureReason, Submission, SubmissionOrchestrator, SubmissionStatus, SubmitOutcome};
pub use validate::{
    Check, FieldKind, FieldSchema, FieldState, FieldValue, FormSchema, FormState, Rule,
    ValidationResult,
};

// Re-export model types at the crate root for ergonomics.
pub use model::{Client, CurrentUser, Entity, EntityId, Location, Management, Role};

// Transport types consumers need without depending on ecotrash-api directly.
pub use ecotrash_api::{FieldErrors, TlsMode};
