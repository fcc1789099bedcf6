//! End-to-end tests driving the router with `oneshot`, carrying the session
//! cookie between requests the way a browser would.

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use chrono::{Days, Local};
use http_body_util::BodyExt;
use meal_tracker::{
    config::Config,
    database::setup_database,
    entities::{meal_record, member, prelude::*},
    router::{AppState, create_router},
    services::{meals, members},
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    sqlx::sqlite::SqlitePoolOptions,
};
use tower::ServiceExt;
use tower_sessions_sqlx_store::SqliteStore;

struct TestApp {
    router: Router,
    db: DatabaseConnection,
    cookie: Option<String>,
}

impl TestApp {
    async fn new() -> Self {
        let config = Config {
            database_url: "sqlite::memory:".into(),
            admin_password: "test-admin".into(),
            secret_key: "test-secret-key".into(),
            template_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/templates").into(),
            static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/static").into(),
            ..Config::default()
        };
        let db = setup_database(&config.database_url).await.unwrap();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let session_store = SqliteStore::new(pool);
        session_store.migrate().await.unwrap();

        let router = create_router(AppState::new(db.clone(), &config), &config, session_store);
        Self {
            router,
            db,
            cookie: None,
        }
    }

    async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn post(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form_body(fields)))
            .unwrap();
        self.send(request).await
    }

    /// Follows a redirect and returns the page body.
    async fn follow(&mut self, response: Response<Body>) -> String {
        assert!(
            response.status().is_redirection(),
            "expected a redirect, got {}",
            response.status()
        );
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        let page = self.get(&location).await;
        assert_eq!(page.status(), StatusCode::OK);
        body_string(page).await
    }

    async fn login(&mut self) {
        let response = self.post("/admin", &[("password", "test-admin")]).await;
        let body = self.follow(response).await;
        assert!(body.contains("Admin Panel"));
    }
}

fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", escape(key), escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn escape(value: &str) -> String {
    value
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b"-_.".contains(&b) {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

async fn member_named(db: &DatabaseConnection, name: &str) -> Vec<member::Model> {
    Member::find()
        .filter(member::Column::Name.eq(name))
        .all(db)
        .await
        .unwrap()
}

// -- Public pages -------------------------------------------------------------

#[tokio::test]
async fn index_redirects_to_add_member() {
    let mut app = TestApp::new().await;

    let response = app.get("/").await;
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/add-member");
}

#[tokio::test]
async fn add_member_page_renders() {
    let mut app = TestApp::new().await;

    let response = app.get("/add-member").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Add New Member"));
    assert!(body.contains("Banasree Boys"));
}

#[tokio::test]
async fn add_member_creates_one_row() {
    let mut app = TestApp::new().await;

    let response = app.post("/add-member", &[("name", "John Doe")]).await;
    let body = app.follow(response).await;
    assert!(body.contains("added successfully"));
    assert!(body.contains("John Doe"));

    assert_eq!(member_named(&app.db, "John Doe").await.len(), 1);
}

#[tokio::test]
async fn duplicate_member_is_reported() {
    let mut app = TestApp::new().await;
    members::add_member(&app.db, "John Doe").await.unwrap();

    let response = app.post("/add-member", &[("name", "John Doe")]).await;
    let body = app.follow(response).await;
    assert!(body.contains("already exists"));

    assert_eq!(Member::find().count(&app.db).await.unwrap(), 1);
}

#[tokio::test]
async fn blank_member_name_is_reported() {
    let mut app = TestApp::new().await;

    let response = app.post("/add-member", &[("name", "")]).await;
    let body = app.follow(response).await;
    assert!(body.contains("valid name"));

    assert_eq!(Member::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn notices_are_shown_once() {
    let mut app = TestApp::new().await;

    let response = app.post("/add-member", &[("name", "")]).await;
    let body = app.follow(response).await;
    assert!(body.contains("valid name"));

    let body = body_string(app.get("/add-member").await).await;
    assert!(!body.contains("valid name"));
}

#[tokio::test]
async fn meals_page_offers_zero_to_four() {
    let mut app = TestApp::new().await;
    members::add_member(&app.db, "Test Member").await.unwrap();

    let response = app.get("/meals").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Today&#x27;s Meal Tracking") || body.contains("Today's Meal Tracking"));
    assert!(body.contains("Test Member"));
    assert!(body.contains(r#"<option value="0""#));
    assert!(body.contains(r#"<option value="4""#));
    assert!(!body.contains(r#"<option value="5""#));
}

#[tokio::test]
async fn meals_page_prefills_todays_counts() {
    let mut app = TestApp::new().await;
    let member = members::add_member(&app.db, "John Doe").await.unwrap();
    let today = Local::now().date_naive();
    meals::upsert_meal_record(&app.db, member.id, today, 3).await.unwrap();

    let body = body_string(app.get("/meals").await).await;
    assert!(body.contains(&meals::daily_field_name(today, member.id)));
    assert!(body.contains(r#"<option value="3" selected>"#));
}

#[tokio::test]
async fn submitting_meals_creates_then_updates() {
    let mut app = TestApp::new().await;
    let member = members::add_member(&app.db, "John Doe").await.unwrap();
    let today = Local::now().date_naive();
    let field = meals::daily_field_name(today, member.id);

    let response = app.post("/meals", &[(field.as_str(), "3")]).await;
    let body = app.follow(response).await;
    assert!(body.contains("successfully"));

    let response = app.post("/meals", &[(field.as_str(), "4")]).await;
    app.follow(response).await;

    let records = MealRecord::find()
        .filter(meal_record::Column::MemberId.eq(member.id))
        .filter(meal_record::Column::MealDate.eq(today))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].meal_count, 4);
}

#[tokio::test]
async fn malformed_count_is_skipped_without_blocking_others() {
    let mut app = TestApp::new().await;
    let alice = members::add_member(&app.db, "Alice").await.unwrap();
    let bob = members::add_member(&app.db, "Bob").await.unwrap();
    let today = Local::now().date_naive();

    let alice_field = meals::daily_field_name(today, alice.id);
    let bob_field = meals::daily_field_name(today, bob.id);
    let response = app
        .post("/meals", &[(alice_field.as_str(), "lots"), (bob_field.as_str(), "2")])
        .await;
    let body = app.follow(response).await;
    assert!(body.contains("successfully"));

    let counts = meals::counts_for_day(&app.db, today).await.unwrap();
    assert_eq!(counts.get(&bob.id), Some(&2));
    assert_eq!(counts.get(&alice.id), None);
}

#[tokio::test]
async fn export_pdf_streams_the_monthly_report() {
    let mut app = TestApp::new().await;
    let member = members::add_member(&app.db, "John Doe").await.unwrap();
    let today = Local::now().date_naive();
    meals::upsert_meal_record(&app.db, member.id, today, 3).await.unwrap();

    let response = app.get("/export-pdf").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    let expected = format!("meal_report_{}.pdf", today.format("%Y_%m"));
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains(&expected));

    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn static_assets_are_served() {
    let mut app = TestApp::new().await;

    let response = app.get("/static/style.css").await;
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Admin --------------------------------------------------------------------

#[tokio::test]
async fn admin_shows_login_form_when_logged_out() {
    let mut app = TestApp::new().await;

    let response = app.get("/admin").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Admin Login"));
}

#[tokio::test]
async fn admin_login_success() {
    let mut app = TestApp::new().await;

    let response = app.post("/admin", &[("password", "test-admin")]).await;
    let body = app.follow(response).await;
    assert!(body.contains("Admin Panel"));
    assert!(body.contains("Admin login successful!"));
}

#[tokio::test]
async fn admin_login_failure() {
    let mut app = TestApp::new().await;

    let response = app.post("/admin", &[("password", "wrong-password")]).await;
    let body = app.follow(response).await;
    assert!(body.contains("Invalid password"));
    assert!(body.contains("Admin Login"));
    assert!(!body.contains("Admin Panel"));
}

#[tokio::test]
async fn admin_logout_returns_to_login() {
    let mut app = TestApp::new().await;
    app.login().await;

    let response = app.post("/admin", &[("logout", "1")]).await;
    let body = app.follow(response).await;
    assert!(body.contains("Admin Login"));
    assert!(!body.contains("Admin Panel"));
}

#[tokio::test]
async fn admin_actions_require_login() {
    let mut app = TestApp::new().await;

    let response = app
        .post("/admin", &[("add_member", "1"), ("member_name", "Sneaky")])
        .await;
    let body = app.follow(response).await;
    assert!(body.contains("Admin Login"));

    assert!(member_named(&app.db, "Sneaky").await.is_empty());
}

#[tokio::test]
async fn admin_adds_member() {
    let mut app = TestApp::new().await;
    app.login().await;

    let response = app
        .post("/admin", &[("add_member", "1"), ("member_name", "Admin Added Member")])
        .await;
    let body = app.follow(response).await;
    assert!(body.contains("added successfully"));

    assert_eq!(member_named(&app.db, "Admin Added Member").await.len(), 1);
}

#[tokio::test]
async fn admin_removes_member_and_records() {
    let mut app = TestApp::new().await;
    let member = members::add_member(&app.db, "To Be Removed").await.unwrap();
    let today = Local::now().date_naive();
    meals::upsert_meal_record(&app.db, member.id, today, 2).await.unwrap();
    app.login().await;

    let member_id = member.id.to_string();
    let response = app
        .post("/admin", &[("remove_member", "1"), ("member_id", member_id.as_str())])
        .await;
    let body = app.follow(response).await;
    assert!(body.contains("removed successfully"));

    assert!(Member::find_by_id(member.id).one(&app.db).await.unwrap().is_none());
    assert_eq!(MealRecord::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn admin_remove_unknown_member_is_reported() {
    let mut app = TestApp::new().await;
    app.login().await;

    let response = app
        .post("/admin", &[("remove_member", "1"), ("member_id", "999")])
        .await;
    let body = app.follow(response).await;
    assert!(body.contains("Member not found!"));
}

#[tokio::test]
async fn admin_edits_existing_record() {
    let mut app = TestApp::new().await;
    let member = members::add_member(&app.db, "John Doe").await.unwrap();
    let today = Local::now().date_naive();
    let record = meals::upsert_meal_record(&app.db, member.id, today, 2).await.unwrap();
    app.login().await;

    let record_id = record.id.to_string();
    let member_id = member.id.to_string();
    let date = today.format("%Y-%m-%d").to_string();
    let response = app
        .post(
            "/admin",
            &[
                ("update_meal", "1"),
                ("record_id", record_id.as_str()),
                ("member_id", member_id.as_str()),
                ("meal_date", date.as_str()),
                ("meal_count", "4"),
            ],
        )
        .await;
    let body = app.follow(response).await;
    assert!(body.contains("Meal record updated successfully!"));

    let record = MealRecord::find_by_id(record.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(record.meal_count, 4);
}

#[tokio::test]
async fn admin_creates_record_for_member_and_date() {
    let mut app = TestApp::new().await;
    let member = members::add_member(&app.db, "John Doe").await.unwrap();
    let yesterday = Local::now().date_naive() - Days::new(1);
    app.login().await;

    let member_id = member.id.to_string();
    let date = yesterday.format("%Y-%m-%d").to_string();
    let fields = [
        ("update_meal", "1"),
        ("record_id", ""),
        ("member_id", member_id.as_str()),
        ("meal_date", date.as_str()),
        ("meal_count", "2"),
    ];

    let response = app.post("/admin", &fields).await;
    let body = app.follow(response).await;
    assert!(body.contains("Meal record saved successfully!"));
    assert!(body.contains(&date));

    // Saving again for the same day updates rather than duplicates.
    let response = app.post("/admin", &fields).await;
    app.follow(response).await;
    assert_eq!(MealRecord::find().count(&app.db).await.unwrap(), 1);
}

#[tokio::test]
async fn admin_edit_with_bad_input_is_reported() {
    let mut app = TestApp::new().await;
    let member = members::add_member(&app.db, "John Doe").await.unwrap();
    app.login().await;

    let member_id = member.id.to_string();
    let response = app
        .post(
            "/admin",
            &[
                ("update_meal", "1"),
                ("member_id", member_id.as_str()),
                ("meal_date", "not-a-date"),
                ("meal_count", "2"),
            ],
        )
        .await;
    let body = app.follow(response).await;
    assert!(body.contains("Error updating record"));

    let response = app
        .post(
            "/admin",
            &[
                ("update_meal", "1"),
                ("member_id", member_id.as_str()),
                ("meal_date", "2024-03-01"),
                ("meal_count", "two"),
            ],
        )
        .await;
    let body = app.follow(response).await;
    assert!(body.contains("Error updating record"));

    assert_eq!(MealRecord::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn admin_history_window_follows_days_param() {
    let mut app = TestApp::new().await;
    let member = members::add_member(&app.db, "John Doe").await.unwrap();
    let today = Local::now().date_naive();
    let old = today - Days::new(10);
    meals::upsert_meal_record(&app.db, member.id, old, 1).await.unwrap();
    app.login().await;

    let old_date = old.format("%Y-%m-%d").to_string();
    let body = body_string(app.get("/admin").await).await;
    assert!(body.contains(&format!("<h4>{old_date}</h4>")));

    let body = body_string(app.get("/admin?days=5").await).await;
    assert!(!body.contains(&format!("<h4>{old_date}</h4>")));
    assert!(body.contains("No meal records in this period."));
}

#[tokio::test]
async fn admin_history_ignores_unparsable_days() {
    let mut app = TestApp::new().await;

    let response = app.get("/admin?days=abc").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Admin Login"));

    let member = members::add_member(&app.db, "John Doe").await.unwrap();
    let old = Local::now().date_naive() - Days::new(10);
    meals::upsert_meal_record(&app.db, member.id, old, 1).await.unwrap();
    app.login().await;

    let response = app.get("/admin?days=abc").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains(&format!("<h4>{}</h4>", old.format("%Y-%m-%d"))));
}

#[tokio::test]
async fn admin_removal_failure_is_rolled_back_and_reported() {
    let mut app = TestApp::new().await;
    let member = members::add_member(&app.db, "Locked").await.unwrap();
    let today = Local::now().date_naive();
    meals::upsert_meal_record(&app.db, member.id, today, 2).await.unwrap();
    app.db
        .execute_unprepared(
            "CREATE TRIGGER block_member_delete BEFORE DELETE ON members \
             BEGIN SELECT RAISE(ABORT, 'member deletes blocked'); END",
        )
        .await
        .unwrap();
    app.login().await;

    let member_id = member.id.to_string();
    let response = app
        .post("/admin", &[("remove_member", "1"), ("member_id", member_id.as_str())])
        .await;
    let body = app.follow(response).await;
    assert!(body.contains("Error removing member"));

    assert!(Member::find_by_id(member.id).one(&app.db).await.unwrap().is_some());
    assert_eq!(MealRecord::find().count(&app.db).await.unwrap(), 1);
}

#[tokio::test]
async fn admin_edit_failure_is_rolled_back_and_reported() {
    let mut app = TestApp::new().await;
    let member = members::add_member(&app.db, "John Doe").await.unwrap();
    let today = Local::now().date_naive();
    let record = meals::upsert_meal_record(&app.db, member.id, today, 2).await.unwrap();
    app.db
        .execute_unprepared(
            "CREATE TRIGGER block_record_update BEFORE UPDATE ON meal_records \
             BEGIN SELECT RAISE(ABORT, 'record updates blocked'); END",
        )
        .await
        .unwrap();
    app.login().await;

    let record_id = record.id.to_string();
    let member_id = member.id.to_string();
    let date = today.format("%Y-%m-%d").to_string();
    let response = app
        .post(
            "/admin",
            &[
                ("update_meal", "1"),
                ("record_id", record_id.as_str()),
                ("member_id", member_id.as_str()),
                ("meal_date", date.as_str()),
                ("meal_count", "4"),
            ],
        )
        .await;
    let body = app.follow(response).await;
    assert!(body.contains("Error updating record"));

    let stored = MealRecord::find_by_id(record.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(stored.meal_count, 2);
}
