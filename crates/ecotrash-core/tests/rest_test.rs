#![allow(clippy::unwrap_used)]
// REST-backed services, session handling and server error merge, using wiremock.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ecotrash_api::ApiClient;
use ecotrash_core::{
    ApiConfig, Client, CoreError, CrudScreen, EntityId, EntityService, FailureReason, Location,
    MemoryStorage, RestService, Role, SessionContext, SessionStorage, SubmitOutcome, schemas,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Arc<ApiClient>) {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/api/v1/", server.uri())).unwrap();
    let api = Arc::new(ApiConfig::new(base).build_client().unwrap());
    (server, api)
}

fn location_json(id: i64, name: &str) -> serde_json::Value {
    json!({
        "pk_location": id,
        "name": name,
        "postcode": "64000",
        "exterior_number": 120,
        "street_name": "Av. Juarez",
        "neighborhood": "Centro",
        "city": "Monterrey",
        "state": "Nuevo Leon",
        "country": "Mexico",
        "phone_number": "8112345678",
        "is_active": true
    })
}

fn fill_location(form: &ecotrash_core::FormHandle) {
    form.with(|f| {
        for (field, value) in [
            ("name", "Depot Norte"),
            ("postcode", "64000"),
            ("exterior_number", "120"),
            ("street_name", "Av. Juarez"),
            ("neighborhood", "Centro"),
            ("city", "Monterrey"),
            ("state", "Nuevo Leon"),
            ("country", "Mexico"),
            ("phone_number", "8112345678"),
        ] {
            f.set_value(field, value);
        }
    });
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn login_persists_session_and_authorizes_requests() {
    let (server, api) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "user": {
                    "pk": 1,
                    "username": "ana",
                    "full_name": "Ana Ruiz",
                    "email": "ana@example.com",
                    "role": "admin"
                },
                "access_token": "tok-abc"
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/core/locations/"))
        .and(header("authorization", "Bearer tok-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([location_json(1, "Depot")])))
        .mount(&server)
        .await;

    let session = SessionContext::new(Arc::clone(&api), MemoryStorage::default());
    assert!(session.init().is_none());

    let user = session
        .login("ana@example.com", &SecretString::from("secret1".to_owned()))
        .await
        .unwrap();
    assert_eq!(user.role, Role::Admin);
    assert!(session.is_authenticated());

    let rows = RestService::locations(Arc::clone(&api)).list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].exterior_number.as_deref(), Some("120"));

    session.logout().unwrap();
    assert!(!api.has_token());
    assert!(matches!(session.require(), Err(CoreError::NotLoggedIn)));
}

#[tokio::test]
async fn init_restores_stored_user() {
    let (_server, api) = setup().await;
    let storage = MemoryStorage::default();
    let user: ecotrash_core::CurrentUser = serde_json::from_value(json!({
        "id": 5,
        "username": "luis",
        "email": "luis@example.com",
        "role": "employee",
        "token": "tok-restored"
    }))
    .unwrap();
    storage.store(&user).unwrap();

    let session = SessionContext::new(Arc::clone(&api), storage);
    let restored = session.init().unwrap();
    assert_eq!(restored.username, "luis");
    assert!(api.has_token());
}

// ── Screens ─────────────────────────────────────────────────────────

#[tokio::test]
async fn server_field_errors_show_on_the_form() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/core/locations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/core/locations/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "postcode": ["Postcode does not exist."],
            "non_field_errors": ["Duplicated location."]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut screen = CrudScreen::new(RestService::locations(api), schemas::location());
    screen.load().await.unwrap();
    let form = screen.open_create(Vec::<(&str, &str)>::new());
    fill_location(&form);

    let outcome = screen.submit().await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Rejected(FailureReason::ServerValidation));

    let result = form.result();
    assert_eq!(result.error("postcode"), Some("Postcode does not exist."));
    assert_eq!(result.form_errors(), ["Duplicated location.".to_owned()]);

    // Editing the field clears its server message.
    form.with(|f| f.set_value("postcode", "64001"));
    assert_eq!(form.result().error("postcode"), None);
}

#[tokio::test]
async fn create_then_refetch_grows_the_list() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/core/locations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([location_json(1, "Depot")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/core/locations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            location_json(1, "Depot"),
            location_json(2, "Depot Norte")
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/core/locations/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "message": "created" })))
        .mount(&server)
        .await;

    let mut screen = CrudScreen::new(RestService::locations(api), schemas::location());
    screen.load().await.unwrap();
    assert_eq!(screen.list().len(), 1);

    let form = screen.open_create(Vec::<(&str, &str)>::new());
    fill_location(&form);
    let outcome: SubmitOutcome<Option<Location>> = screen.submit().await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Submitted(None));
    assert_eq!(screen.list().len(), 2);
}

#[tokio::test]
async fn clients_use_management_scope_and_put() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/client/by-management/3/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "pk_client": 10,
            "fk_management": 3,
            "name": "Acme",
            "legal_name": "Acme SA de CV",
            "rfc": "ACM010101AB1",
            "email": "acme@example.com"
        }])))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/client/client/10/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pk_client": 10,
            "fk_management": 3,
            "name": "Acme Renamed",
            "legal_name": "Acme SA de CV",
            "rfc": "ACM010101AB1",
            "email": "acme@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = RestService::clients(api, &EntityId::Int(3));
    let rows: Vec<Client> = service.list().await.unwrap();
    assert_eq!(rows[0].legal_name.as_deref(), Some("Acme SA de CV"));

    let updated = service
        .update(&EntityId::Int(10), &json!({ "name": "Acme Renamed" }))
        .await
        .unwrap();
    assert_eq!(updated.unwrap().name, "Acme Renamed");
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/core/locations/77/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .mount(&server)
        .await;

    let err = RestService::locations(api)
        .get(&EntityId::Int(77))
        .await
        .unwrap_err();
    match err {
        CoreError::NotFound {
            entity_type,
            identifier,
        } => {
            assert_eq!(entity_type, "location");
            assert_eq!(identifier, "77");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}
