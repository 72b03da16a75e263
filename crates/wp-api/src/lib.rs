//! # wp-api
//!
//! The web routing and orchestration layer for Waypoint.

pub mod error;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod session;

use actix_web::web;

pub use handlers::AppState;

/// Mounts every page route plus the `/api` scope. Static uploads are
/// served by the binary, which knows where they live on disk.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/reports", web::get().to(handlers::index))
        .route("/reports/page/{page}", web::get().to(handlers::reports_page))
        .route("/reports/{id}/edit", web::get().to(handlers::edit_report))
        .route("/report/{slug}", web::get().to(handlers::report_by_slug))
        .route("/add", web::post().to(handlers::create_report))
        .route("/add/{id}", web::post().to(handlers::update_report))
        .route("/tags", web::get().to(handlers::tags))
        .route("/tags/{tag}", web::get().to(handlers::tag))
        .route("/top", web::get().to(handlers::top))
        .route("/hearts", web::get().to(handlers::hearts))
        .route("/comments/{id}", web::post().to(handlers::add_comment))
        .route("/register", web::post().to(handlers::register))
        .route("/login", web::post().to(handlers::login))
        .route("/logout", web::get().to(handlers::logout))
        .service(
            web::scope("/api")
                .wrap(middleware::cors_policy())
                .route("/search", web::get().to(handlers::search))
                .route("/reports/near", web::get().to(handlers::near))
                .route("/reports/{id}/heart", web::post().to(handlers::heart)),
        );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::cookie::Cookie;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use serde_json::Value;
    use uuid::Uuid;
    use wp_core::error::AppError;
    use wp_auth_simple::SimpleAuthProvider;
    use wp_core::models::{Registration, Report, ReportDraft, User};
    use wp_core::traits::{AuthProvider, MockMediaStore};
    use wp_db_sqlite::SqliteStore;
    use wp_services::Services;

    use super::*;
    use crate::session::SESSION_COOKIE;

    async fn app_state() -> web::Data<AppState> {
        app_state_with(MockMediaStore::new()).await
    }

    async fn app_state_with(media: MockMediaStore) -> web::Data<AppState> {
        let db = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
        let auth: Arc<dyn AuthProvider> = Arc::new(SimpleAuthProvider::new("test-secret").unwrap());
        web::Data::new(AppState {
            services: Services::new(db.clone(), db.clone(), db, auth.clone()),
            store: Arc::new(media),
            auth,
        })
    }

    async fn register(data: &AppState, name: &str) -> (User, Cookie<'static>) {
        let user = data
            .services
            .accounts
            .register(Registration {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                password: "hunter2".into(),
                confirm: "hunter2".into(),
            })
            .await
            .unwrap();
        let cookie = Cookie::new(SESSION_COOKIE, data.auth.issue_session(user.id));
        (user, cookie)
    }

    async fn report(data: &AppState, author: Uuid, title: &str, lng: f64, lat: f64) -> Report {
        let draft = ReportDraft {
            title: title.into(),
            description: None,
            tags: vec![],
            lng,
            lat,
            address: "Boracay".into(),
            photo: None,
        };
        data.services.reports.create(draft, author).await.unwrap()
    }

    fn multipart(fields: &[(&str, &str)]) -> (String, Vec<u8>) {
        multipart_with_photo(fields, None)
    }

    /// `photo` is `(content type, bytes)`.
    fn multipart_with_photo(fields: &[(&str, &str)], photo: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
        let boundary = "waypoint-test-boundary";
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        if let Some((content_type, data)) = photo {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    const SUNSET_FIELDS: [(&str, &str); 4] = [
        ("title", "Sunset Point"),
        ("location[address]", "Station 1, Boracay"),
        ("location[coordinates][0]", "122.5"),
        ("location[coordinates][1]", "10.7"),
    ];

    fn post_form(uri: &str, cookie: Cookie<'static>, (content_type, body): (String, Vec<u8>)) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_near_returns_pins_within_ten_km() {
        let data = app_state().await;
        let (user, _) = register(&data, "Wes").await;
        report(&data, user.id, "Sunset Point", 122.5, 10.7).await;
        report(&data, user.id, "Far Away", 123.0, 10.7).await;

        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/reports/near?lng=122.5&lat=10.7").to_request();
        let pins: Value = test::call_and_read_body_json(&app, req).await;
        let pins = pins.as_array().unwrap();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0]["slug"], "sunset-point");
        assert_eq!(pins[0]["location"]["coordinates"][0], 122.5);

        let req = test::TestRequest::get().uri("/api/reports/near?lng=122.5").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn test_search_endpoint() {
        let data = app_state().await;
        let (user, _) = register(&data, "Wes").await;
        report(&data, user.id, "Sunset Point", 122.5, 10.7).await;

        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/search?q=sunset").to_request();
        let hits: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["title"], "Sunset Point");

        let req = test::TestRequest::get().uri("/api/search").to_request();
        let hits: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(hits, Value::Array(vec![]));
    }

    #[actix_web::test]
    async fn test_heart_toggles_and_requires_login() {
        let data = app_state().await;
        let (user, cookie) = register(&data, "Wes").await;
        let target = report(&data, user.id, "Sunset Point", 122.5, 10.7).await;
        let uri = format!("/api/reports/{}/heart", target.id);

        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let resp = test::call_service(&app, test::TestRequest::post().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post().uri(&uri).cookie(cookie.clone()).to_request();
        let hearted: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(hearted["hearts"], serde_json::json!([target.id.to_string()]));

        let req = test::TestRequest::post().uri(&uri).cookie(cookie).to_request();
        let unhearted: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(unhearted["hearts"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn test_out_of_range_page_redirects() {
        let data = app_state().await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/reports/page/5").to_request()).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/reports/page/1");

        let page: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(page["page"], 1);
        assert_eq!(page["totalCount"], 0);
    }

    #[actix_web::test]
    async fn test_comment_rating_is_validated() {
        let data = app_state().await;
        let (user, cookie) = register(&data, "Wes").await;
        let target = report(&data, user.id, "Sunset Point", 122.5, 10.7).await;
        let uri = format!("/comments/{}", target.id);

        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri(&uri)
            .cookie(cookie.clone())
            .set_form([("text", "Gorgeous"), ("rating", "6")])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri(&uri)
            .cookie(cookie)
            .set_form([("text", "Gorgeous"), ("rating", "5")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let comment: Value = test::read_body_json(resp).await;
        assert_eq!(comment["author"]["name"], "Wes");
        assert_eq!(comment["rating"], 5);
    }

    #[actix_web::test]
    async fn test_multipart_create_redirects_to_slug() {
        let data = app_state().await;
        let (_, cookie) = register(&data, "Wes").await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let (content_type, body) = multipart(&[
            ("title", "Sunset Point"),
            ("description", "Best view on the island"),
            ("tags", "Family Friendly"),
            ("tags", "Wifi"),
            ("location[address]", "Station 1, Boracay"),
            ("location[coordinates][0]", "122.5"),
            ("location[coordinates][1]", "10.7"),
        ]);
        let req = test::TestRequest::post()
            .uri("/add")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/report/sunset-point");

        let detail: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/report/sunset-point").to_request()).await;
        assert_eq!(detail["report"]["tags"], serde_json::json!(["Family Friendly", "Wifi"]));
        assert_eq!(detail["author"]["name"], "Wes");
    }

    #[actix_web::test]
    async fn test_register_sets_session_and_bad_login_fails() {
        let data = app_state().await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/register")
            .set_form([
                ("name", "Wes"),
                ("email", "wes@example.com"),
                ("password", "hunter2"),
                ("password-confirm", "hunter2"),
            ])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let session = resp.response().cookies().find(|c| c.name() == SESSION_COOKIE).unwrap();
        assert!(data.auth.verify_session(session.value()).is_some());

        let req = test::TestRequest::post()
            .uri("/login")
            .set_form([("email", "wes@example.com"), ("password", "wrong")])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_multipart_create_stores_the_photo() {
        let mut media = MockMediaStore::new();
        media
            .expect_save_upload()
            .withf(|data, content_type| data.as_slice() == b"png bytes" && content_type == "image/png")
            .times(1)
            .returning(|_, _| Ok("0b6c.png".to_string()));
        let data = app_state_with(media).await;
        let (_, cookie) = register(&data, "Wes").await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let form = multipart_with_photo(&SUNSET_FIELDS, Some(("image/png", &b"png bytes"[..])));
        let resp = test::call_service(&app, post_form("/add", cookie, form).to_request()).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let detail: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/report/sunset-point").to_request()).await;
        assert_eq!(detail["report"]["photo"], "0b6c.png");
    }

    #[actix_web::test]
    async fn test_non_image_upload_is_rejected() {
        let mut media = MockMediaStore::new();
        media.expect_save_upload().never();
        let data = app_state_with(media).await;
        let (_, cookie) = register(&data, "Wes").await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let form = multipart_with_photo(&SUNSET_FIELDS, Some(("text/plain", &b"hello"[..])));
        let resp = test::call_service(&app, post_form("/add", cookie, form).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "That filetype isn't allowed!");
    }

    #[actix_web::test]
    async fn test_undecodable_image_is_a_bad_request() {
        let mut media = MockMediaStore::new();
        media
            .expect_save_upload()
            .times(1)
            .returning(|_, _| Err(anyhow::Error::new(AppError::ValidationError("That filetype isn't allowed!".into()))));
        let data = app_state_with(media).await;
        let (_, cookie) = register(&data, "Wes").await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let form = multipart_with_photo(&SUNSET_FIELDS, Some(("image/svg+xml", &b"<svg/>"[..])));
        let resp = test::call_service(&app, post_form("/add", cookie, form).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "That filetype isn't allowed!");
        assert!(data.services.reports.detail_by_slug("sunset-point").await.is_err());
    }

    #[actix_web::test]
    async fn test_invalid_draft_never_stores_the_photo() {
        let mut media = MockMediaStore::new();
        media.expect_save_upload().never();
        let data = app_state_with(media).await;
        let (_, cookie) = register(&data, "Wes").await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let form = multipart_with_photo(
            &[
                ("title", "   "),
                ("location[address]", "Station 1, Boracay"),
                ("location[coordinates][0]", "122.5"),
                ("location[coordinates][1]", "10.7"),
            ],
            Some(("image/png", &b"png bytes"[..])),
        );
        let resp = test::call_service(&app, post_form("/add", cookie, form).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_non_owner_update_is_forbidden_before_upload() {
        let mut media = MockMediaStore::new();
        media.expect_save_upload().never();
        let data = app_state_with(media).await;
        let (owner, _) = register(&data, "Wes").await;
        let (_, intruder) = register(&data, "Ana").await;
        let target = report(&data, owner.id, "Sunset Point", 122.5, 10.7).await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let form = multipart_with_photo(&SUNSET_FIELDS, Some(("image/png", &b"png bytes"[..])));
        let resp = test::call_service(&app, post_form(&format!("/add/{}", target.id), intruder, form).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let stored = data.services.reports.edit(target.id, owner.id).await.unwrap();
        assert_eq!(stored.photo, None);
    }
}
