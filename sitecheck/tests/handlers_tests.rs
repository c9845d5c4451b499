// HTTP-level tests for the sitecheck handlers

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use sitecheck_core::data::Storage;
use sitecheck_probe::Prober;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_storage() -> (TempDir, Storage) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let storage = Storage::open(&db_path).unwrap();
    (temp_dir, storage)
}

macro_rules! test_app {
    ($storage:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($storage.clone()))
                .app_data(web::Data::new(Prober::with_timeout(2)))
                .configure(sitecheck::configure),
        )
        .await
    };
}

fn location(resp: &actix_web::dev::ServiceResponse) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .expect("redirect without Location header")
        .to_str()
        .unwrap()
}

#[actix_web::test]
async fn test_index_describes_service() {
    let (_temp_dir, storage) = create_test_storage();
    let app = test_app!(storage);

    let req = test::TestRequest::get().uri("/").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["service"], "sitecheck");
}

#[actix_web::test]
async fn test_submit_empty_url_is_unprocessable() {
    let (_temp_dir, storage) = create_test_storage();
    let app = test_app!(storage);

    let req = test::TestRequest::post()
        .uri("/urls")
        .set_form(&[("url", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_submit_malformed_url_is_unprocessable() {
    let (_temp_dir, storage) = create_test_storage();
    let app = test_app!(storage);

    let req = test::TestRequest::post()
        .uri("/urls")
        .set_form(&[("url", "not a url")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], false);
}

#[actix_web::test]
async fn test_submit_redirects_and_dedupes() {
    let (_temp_dir, storage) = create_test_storage();
    let app = test_app!(storage);

    let req = test::TestRequest::post()
        .uri("/urls")
        .set_form(&[("url", "https://example.com/path?x=1")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/urls/1?msg=created");

    // An equivalent submission lands on the same url
    let req = test::TestRequest::post()
        .uri("/urls")
        .set_form(&[("url", "https://example.com/other")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/urls/1?msg=exists");
}

#[actix_web::test]
async fn test_show_unknown_url_redirects_home() {
    let (_temp_dir, storage) = create_test_storage();
    let app = test_app!(storage);

    let req = test::TestRequest::get().uri("/urls/9999").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/?msg=unknown-url");
}

#[actix_web::test]
async fn test_listing_reflects_submissions() {
    let (_temp_dir, storage) = create_test_storage();
    let app = test_app!(storage);

    let req = test::TestRequest::post()
        .uri("/urls")
        .set_form(&[("url", "https://example.com")])
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/urls").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let urls = body["urls"].as_array().unwrap();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0]["name"], "https://example.com");
    assert!(urls[0]["last_check_at"].is_null());
    assert!(urls[0]["last_status_code"].is_null());
}

#[actix_web::test]
async fn test_check_roundtrip() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><head><title>T</title></head><body><h1>Hi</h1></body></html>"),
        )
        .mount(&mock_server)
        .await;

    let (_temp_dir, storage) = create_test_storage();
    let app = test_app!(storage);

    let req = test::TestRequest::post()
        .uri("/urls")
        .set_form(&[("url", mock_server.uri())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/urls/1?msg=created");

    let req = test::TestRequest::post().uri("/urls/1/checks").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/urls/1?msg=check-ok");

    let req = test::TestRequest::get().uri("/urls/1").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let checks = body["checks"].as_array().unwrap();
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0]["status_code"], 200);
    assert_eq!(checks[0]["h1"], "Hi");
    assert_eq!(checks[0]["title"], "T");
    assert!(checks[0]["description"].is_null());
}

#[actix_web::test]
async fn test_failed_check_redirects_without_recording() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let (_temp_dir, storage) = create_test_storage();
    let app = test_app!(storage);

    let req = test::TestRequest::post()
        .uri("/urls")
        .set_form(&[("url", mock_server.uri())])
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post().uri("/urls/1/checks").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/urls/1?msg=check-failed");

    assert!(storage.checks_for_url(1).unwrap().is_empty());
}

#[actix_web::test]
async fn test_check_on_unknown_url_redirects_home() {
    let (_temp_dir, storage) = create_test_storage();
    let app = test_app!(storage);

    let req = test::TestRequest::post().uri("/urls/42/checks").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/?msg=unknown-url");
}
