use std::sync::Arc;

use chrono::Utc;
use ipcwatch_api::app::{build_app, services::AppServices};
use ipcwatch_auth::{NewProfile, Role, UserProfile};
use ipcwatch_core::{Department, ProfileId};
use ipcwatch_infra::identity::InMemoryAuthProvider;
use ipcwatch_infra::store::InMemoryStore;
use reqwest::StatusCode;
use serde_json::{Value, json};

const PASSWORD: &str = "correct horse battery";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    store: Arc<InMemoryStore>,
    auth: Arc<InMemoryAuthProvider>,
    services: Arc<AppServices>,
    client: reqwest::Client,
}

impl TestServer {
    async fn spawn() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let auth = Arc::new(InMemoryAuthProvider::new());
        let services = Arc::new(AppServices::in_memory(store.clone(), auth.clone()));

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            store,
            auth,
            services,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a login identity with an active profile.
    async fn seed_user(&self, email: &str, role: Role, department: Department) -> UserProfile {
        let auth_user_id = self.auth.register(email, PASSWORD);
        let profile = UserProfile::create(
            NewProfile {
                auth_user_id,
                full_name: format!("User {email}"),
                email: email.to_string(),
                phone: None,
                role,
                department,
            },
            ProfileId::new(),
            Utc::now(),
        )
        .unwrap();
        self.services.profiles.insert(&profile).await.unwrap()
    }

    async fn sign_in(&self, email: &str) -> String {
        let res = self
            .client
            .post(self.url("/session/sign-in"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn today() -> String {
    Utc::now().date_naive().to_string()
}

fn cauti(symptoms: Value) -> Value {
    json!({
        "patient_id": "MRN-1001",
        "patient_name": "Grace Okafor",
        "age": "67",
        "gender": "Female",
        "department": "ICU",
        "admission_date": "2024-05-20",
        "catheter_insertion_date": "2024-05-21",
        "event_date": "2024-05-25",
        "symptoms": symptoms,
        "lab_findings": { "positive_urine_culture": true }
    })
}

fn bundle(shift: &str) -> Value {
    json!({
        "patient_id": "MRN-2002",
        "department": "ICU",
        "admission_date": today(),
        "entry_date": today(),
        "shift": shift,
        "hand_hygiene": true,
        "hub_disinfection": true,
        "dressing_intact": true,
        "line_necessity_review": true
    })
}

#[tokio::test]
async fn health_is_public_everything_else_needs_a_session() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/forms")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.get("/forms", "not-a-session").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let srv = TestServer::spawn().await;
    srv.seed_user("nurse@hospital.org", Role::StaffNurse, Department::Icu)
        .await;

    let res = srv
        .client
        .post(srv.url("/session/sign-in"))
        .json(&json!({ "email": "nurse@hospital.org", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn staff_nurse_in_icu_cannot_submit_mdro() {
    let srv = TestServer::spawn().await;
    srv.seed_user("nurse@hospital.org", Role::StaffNurse, Department::Icu)
        .await;
    let token = srv.sign_in("nurse@hospital.org").await;

    let forms: Value = srv.get("/forms", &token).await.json().await.unwrap();
    let codes: Vec<&str> = forms
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["form_type"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["CAUTI", "CLABSI", "VAP"]);

    let res = srv.post("/forms/mdro", &token, json!({})).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
    assert_eq!(srv.store.insert_calls("mdro_reports"), 0);
}

#[tokio::test]
async fn cauti_without_symptoms_is_rejected_with_field_errors() {
    let srv = TestServer::spawn().await;
    srv.seed_user("nurse@hospital.org", Role::StaffNurse, Department::Icu)
        .await;
    let token = srv.sign_in("nurse@hospital.org").await;

    let res = srv.post("/forms/cauti", &token, cauti(json!({}))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert!(body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f["field"] == "symptoms"));
    assert_eq!(srv.store.insert_calls("cauti_reports"), 0);

    let res = srv
        .post("/forms/cauti", &token, cauti(json!({ "fever": true })))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let row: Value = res.json().await.unwrap();
    assert_eq!(row["review_status"], "pending");
    assert_eq!(row["age"], 67);
}

#[tokio::test]
async fn duplicate_bundle_entry_is_a_conflict_and_never_inserted() {
    let srv = TestServer::spawn().await;
    srv.seed_user("head@hospital.org", Role::HeadNurse, Department::Icu)
        .await;
    let token = srv.sign_in("head@hospital.org").await;

    let res = srv.post("/forms/clabsi-bundle", &token, bundle("MORNING")).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let row: Value = res.json().await.unwrap();
    assert_eq!(row["day_number"], 1);
    assert_eq!(row["compliance_percentage"], 80);

    let res = srv.post("/forms/clabsi-bundle", &token, bundle("MORNING")).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_entry");
    assert_eq!(srv.store.insert_calls("clabsi_bundle_entries"), 1);

    let summary: Value = srv
        .get("/bundles/MRN-2002/compliance", &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(summary["entries"], 1);
}

#[tokio::test]
async fn bundle_compliance_is_scoped_to_the_callers_department() {
    let srv = TestServer::spawn().await;
    srv.seed_user("icu-head@hospital.org", Role::HeadNurse, Department::Icu)
        .await;
    srv.seed_user("ccu-head@hospital.org", Role::HeadNurse, Department::Ccu)
        .await;
    srv.seed_user("ipc@hospital.org", Role::IpcOfficer, Department::IpcUnit)
        .await;
    let icu = srv.sign_in("icu-head@hospital.org").await;
    let ccu = srv.sign_in("ccu-head@hospital.org").await;
    let ipc = srv.sign_in("ipc@hospital.org").await;

    let res = srv.post("/forms/clabsi-bundle", &icu, bundle("MORNING")).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let path = "/bundles/MRN-2002/compliance";
    let own: Value = srv.get(path, &icu).await.json().await.unwrap();
    assert_eq!(own["entries"], 1);

    let other: Value = srv.get(path, &ccu).await.json().await.unwrap();
    assert_eq!(other["entries"], 0);
    assert_eq!(other["history"], json!([]));

    let all: Value = srv.get(path, &ipc).await.json().await.unwrap();
    assert_eq!(all["entries"], 1);
}

#[tokio::test]
async fn sign_out_ends_the_session_even_if_remote_sign_out_fails() {
    let srv = TestServer::spawn().await;
    srv.seed_user("nurse@hospital.org", Role::StaffNurse, Department::Icu)
        .await;
    let token = srv.sign_in("nurse@hospital.org").await;
    srv.auth.set_sign_out_failure(true);

    let res = srv.post("/session/sign-out", &token, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["session"]["state"], "unauthenticated");

    assert!(srv.services.sessions.is_empty());
    let res = srv.get("/forms", &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn identity_without_active_profile_gets_profile_unavailable() {
    let srv = TestServer::spawn().await;
    srv.auth.register("orphan@hospital.org", PASSWORD);

    let res = srv
        .client
        .post(srv.url("/session/sign-in"))
        .json(&json!({ "email": "orphan@hospital.org", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "profile_unavailable");
    assert_eq!(body["session"]["state"], "authenticated_no_profile");

    assert!(srv.services.sessions.is_empty());
    assert_eq!(srv.auth.active_tokens(), 0);
}

#[tokio::test]
async fn users_cannot_change_their_own_role_or_department() {
    let srv = TestServer::spawn().await;
    srv.seed_user("admin@hospital.org", Role::Admin, Department::IpcUnit)
        .await;
    let token = srv.sign_in("admin@hospital.org").await;

    let res = srv
        .client
        .patch(srv.url("/session/profile"))
        .bearer_auth(&token)
        .json(&json!({ "role": "STAFF_NURSE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .patch(srv.url("/session/profile"))
        .bearer_auth(&token)
        .json(&json!({ "full_name": "  Dr. Halima Bello " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["full_name"], "Dr. Halima Bello");
    assert_eq!(body["role"], "ADMIN");

    let session: Value = srv.get("/session", &token).await.json().await.unwrap();
    assert_eq!(session["session"]["profile"]["full_name"], "Dr. Halima Bello");
}

#[tokio::test]
async fn admin_deactivation_closes_the_target_sessions() {
    let srv = TestServer::spawn().await;
    srv.seed_user("admin@hospital.org", Role::Admin, Department::IpcUnit)
        .await;
    let nurse = srv
        .seed_user("nurse@hospital.org", Role::StaffNurse, Department::Icu)
        .await;
    let admin_token = srv.sign_in("admin@hospital.org").await;
    let nurse_token = srv.sign_in("nurse@hospital.org").await;

    let res = srv
        .get("/admin/users", &nurse_token)
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .patch(srv.url(&format!("/admin/users/{}", nurse.id)))
        .bearer_auth(&admin_token)
        .json(&json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.get("/forms", &nurse_token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(srv.url("/session/sign-in"))
        .json(&json!({ "email": "nurse@hospital.org", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_creates_a_user_who_can_sign_in() {
    let srv = TestServer::spawn().await;
    srv.seed_user("admin@hospital.org", Role::Admin, Department::IpcUnit)
        .await;
    let token = srv.sign_in("admin@hospital.org").await;

    let res = srv
        .post(
            "/admin/users",
            &token,
            json!({
                "email": "Micro@Hospital.org",
                "password": PASSWORD,
                "full_name": "Samuel Adeyemi",
                "role": "MICROBIOLOGIST",
                "department": "LABORATORY"
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["email"], "micro@hospital.org");

    let micro = srv.sign_in("micro@hospital.org").await;
    let forms: Value = srv.get("/forms", &micro).await.json().await.unwrap();
    assert_eq!(forms.as_array().unwrap().len(), 1);
    assert_eq!(forms[0]["form_type"], "MDRO");
}

#[tokio::test]
async fn deleting_a_user_removes_the_profile_even_if_the_identity_survives() {
    let srv = TestServer::spawn().await;
    srv.seed_user("admin@hospital.org", Role::Admin, Department::IpcUnit)
        .await;
    let doomed = srv
        .seed_user("leaver@hospital.org", Role::StaffNurse, Department::Icu)
        .await;
    let admin = srv.sign_in("admin@hospital.org").await;
    let leaver = srv.sign_in("leaver@hospital.org").await;

    srv.auth.set_offline(true);
    let res = srv
        .client
        .delete(srv.url(&format!("/admin/users/{}", doomed.id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    srv.auth.set_offline(false);

    assert!(srv.services.profiles.get(doomed.id).await.unwrap().is_none());
    let res = srv.get("/forms", &leaver).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // The surviving identity authenticates but gets no session.
    let res = srv
        .client
        .post(srv.url("/session/sign-in"))
        .json(&json!({ "email": "leaver@hospital.org", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["session"]["state"], "authenticated_no_profile");
}

#[tokio::test]
async fn review_flow_pending_to_revision_and_back() {
    let srv = TestServer::spawn().await;
    srv.seed_user("nurse@hospital.org", Role::StaffNurse, Department::Icu)
        .await;
    srv.seed_user("ipc@hospital.org", Role::IpcOfficer, Department::IpcUnit)
        .await;
    let nurse = srv.sign_in("nurse@hospital.org").await;
    let ipc = srv.sign_in("ipc@hospital.org").await;

    let row: Value = srv
        .post("/forms/cauti", &nurse, cauti(json!({ "dysuria": true })))
        .await
        .json()
        .await
        .unwrap();
    let id = row["id"].as_str().unwrap().to_string();
    let review_path = format!("/forms/cauti/records/{id}/review");

    let res = srv
        .post(&review_path, &nurse, json!({ "status": "approved" }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .post(
            &review_path,
            &ipc,
            json!({ "status": "requires_revision", "notes": "attach culture result" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let reviewed: Value = res.json().await.unwrap();
    assert_eq!(reviewed["review_status"], "requires_revision");

    let res = srv
        .post(&review_path, &ipc, json!({ "status": "approved" }))
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let resubmit_path = format!("/forms/cauti/records/{id}/resubmit");
    let res = srv.post(&resubmit_path, &nurse, json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let mut corrected = cauti(json!({ "dysuria": true }));
    corrected["organism"] = json!("Klebsiella pneumoniae");
    corrected["colony_count"] = json!(">100000 CFU/mL");
    let res = srv.post(&resubmit_path, &nurse, corrected).await;
    assert_eq!(res.status(), StatusCode::OK);
    let revised: Value = res.json().await.unwrap();
    assert_eq!(revised["id"], id.as_str());
    assert_eq!(revised["review_status"], "pending");
    assert_eq!(revised["organism"], "Klebsiella pneumoniae");
    assert_eq!(revised["review_notes"], "attach culture result");

    let stored: Value = srv
        .get(&format!("/forms/cauti/records/{id}"), &ipc)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(stored["colony_count"], ">100000 CFU/mL");

    let res = srv
        .post(&review_path, &ipc, json!({ "status": "approved" }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let approved: Value = res.json().await.unwrap();
    assert_eq!(approved["review_status"], "approved");
    assert_eq!(approved["review_notes"], Value::Null);
}

#[tokio::test]
async fn records_are_scoped_to_the_callers_department() {
    let srv = TestServer::spawn().await;
    srv.seed_user("icu@hospital.org", Role::StaffNurse, Department::Icu)
        .await;
    srv.seed_user("ccu@hospital.org", Role::StaffNurse, Department::Ccu)
        .await;
    let icu = srv.sign_in("icu@hospital.org").await;
    let ccu = srv.sign_in("ccu@hospital.org").await;

    let row: Value = srv
        .post("/forms/cauti", &icu, cauti(json!({ "fever": true })))
        .await
        .json()
        .await
        .unwrap();
    let id = row["id"].as_str().unwrap();

    let mine: Value = srv.get("/forms/cauti/records", &icu).await.json().await.unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let theirs: Value = srv.get("/forms/cauti/records", &ccu).await.json().await.unwrap();
    assert!(theirs.as_array().unwrap().is_empty());

    let res = srv.get(&format!("/forms/cauti/records/{id}"), &ccu).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv.get("/forms/cauti/records?department=ICU", &ccu).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unreachable_store_is_a_bad_gateway() {
    let srv = TestServer::spawn().await;
    srv.seed_user("nurse@hospital.org", Role::StaffNurse, Department::Icu)
        .await;
    let token = srv.sign_in("nurse@hospital.org").await;
    srv.store.set_offline(true);

    let res = srv
        .post("/forms/cauti", &token, cauti(json!({ "fever": true })))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "remote_error");
}

#[tokio::test]
async fn analytics_requests_are_checked_then_forwarded() {
    let srv = TestServer::spawn().await;
    srv.seed_user("quality@hospital.org", Role::QualityOfficer, Department::IpcUnit)
        .await;
    let token = srv.sign_in("quality@hospital.org").await;
    srv.store.register_rpc("get_breakdown_data", |params| {
        Ok(json!([{ "label": params["column_name"], "count": 4 }]))
    });

    let res = srv
        .get(
            "/analytics/breakdown?start_date=2024-01-01&end_date=2024-06-30&table=mdro_reports&column=organism",
            &token,
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!([{ "label": "organism", "count": 4 }]));

    let res = srv
        .get(
            "/analytics/trends?start_date=2024-06-30&end_date=2024-01-01&table=mdro_reports&column=submitted_at",
            &token,
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
