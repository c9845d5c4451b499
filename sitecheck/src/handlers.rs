use actix_web::http::header;
use actix_web::{HttpResponse, Responder, get, post, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sitecheck_core::data::{Storage, StoreError, StoredUrl, UrlCheck};
use sitecheck_core::workflow::{self, CheckOutcome, SubmitError, SubmitOutcome};
use sitecheck_probe::Prober;
use tracing::{error, info};

/// Registers every route; shared between the server and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(submit_url)
        .service(list_urls)
        .service(show_url)
        .service(run_check);
}

fn see_other(location: String) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn storage_failed() -> HttpResponse {
    // Persistence detail stays in the logs, never in the body
    HttpResponse::InternalServerError().json(serde_json::json!({
        "ok": false, "error": "storage_failed"
    }))
}

fn format_ts(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

fn url_json(url: &StoredUrl) -> serde_json::Value {
    serde_json::json!({
        "id": url.id,
        "name": url.name,
        "created_at": format_ts(url.created_at),
    })
}

fn check_json(check: &UrlCheck) -> serde_json::Value {
    serde_json::json!({
        "id": check.id,
        "url_id": check.url_id,
        "status_code": check.status_code,
        "h1": check.h1,
        "title": check.title,
        "description": check.description,
        "created_at": format_ts(check.created_at),
    })
}

#[get("/")]
async fn index() -> impl Responder {
    web::Json(serde_json::json!({
        "service": "sitecheck",
        "endpoints": {
            "submit": "POST /urls",
            "list": "GET /urls",
            "show": "GET /urls/{id}",
            "check": "POST /urls/{id}/checks",
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub url: String,
}

/* ------------------------ POST /urls ------------------------ */

#[post("/urls")]
async fn submit_url(
    form: web::Form<SubmitForm>,
    storage: web::Data<Storage>,
) -> actix_web::Result<impl Responder> {
    let raw = form.into_inner().url;
    let store = storage.get_ref().clone();

    let outcome = web::block(move || workflow::submit(&store, &raw)).await?;

    Ok(match outcome {
        Ok(SubmitOutcome::Created(url)) => {
            info!(id = url.id, name = %url.name, "url registered");
            see_other(format!("/urls/{}?msg=created", url.id))
        }
        Ok(SubmitOutcome::Existing(url)) => see_other(format!("/urls/{}?msg=exists", url.id)),
        Err(SubmitError::Rejected(e)) => HttpResponse::UnprocessableEntity().json(
            serde_json::json!({ "ok": false, "error": e.to_string() }),
        ),
        Err(SubmitError::Store(e)) => {
            error!(error = ?e, "failed to store url");
            storage_failed()
        }
    })
}

/* ------------------------ GET /urls ------------------------ */

#[get("/urls")]
async fn list_urls(storage: web::Data<Storage>) -> actix_web::Result<impl Responder> {
    let store = storage.get_ref().clone();

    let rows = web::block(move || store.urls_with_last_check()).await?;

    Ok(match rows {
        Ok(rows) => {
            let urls: Vec<_> = rows
                .iter()
                .map(|row| {
                    serde_json::json!({
                        "id": row.id,
                        "name": row.name,
                        "created_at": format_ts(row.created_at),
                        "last_check_at": row.last_check_at.map(format_ts),
                        "last_status_code": row.last_status_code,
                    })
                })
                .collect();
            HttpResponse::Ok().json(serde_json::json!({ "urls": urls }))
        }
        Err(e) => {
            error!(error = ?e, "failed to list urls");
            storage_failed()
        }
    })
}

/* ------------------------ GET /urls/{id} ------------------------ */

#[get("/urls/{id}")]
async fn show_url(
    path: web::Path<i64>,
    storage: web::Data<Storage>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let store = storage.get_ref().clone();

    let detail = web::block(
        move || -> Result<Option<(StoredUrl, Vec<UrlCheck>)>, StoreError> {
            let Some(url) = store.find_url_by_id(id)? else {
                return Ok(None);
            };
            let checks = store.checks_for_url(url.id)?;
            Ok(Some((url, checks)))
        },
    )
    .await?;

    Ok(match detail {
        Ok(Some((url, checks))) => HttpResponse::Ok().json(serde_json::json!({
            "url": url_json(&url),
            "checks": checks.iter().map(check_json).collect::<Vec<_>>(),
        })),
        Ok(None) => see_other("/?msg=unknown-url".to_string()),
        Err(e) => {
            error!(error = ?e, id, "failed to load url");
            see_other("/?msg=error".to_string())
        }
    })
}

/* ------------------------ POST /urls/{id}/checks ------------------------ */

#[post("/urls/{id}/checks")]
async fn run_check(
    path: web::Path<i64>,
    storage: web::Data<Storage>,
    prober: web::Data<Prober>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let outcome = workflow::run_check(storage.get_ref(), prober.get_ref(), id).await;

    Ok(match outcome {
        Ok(CheckOutcome::Recorded(check)) => {
            info!(id, status = ?check.status_code, "check recorded");
            see_other(format!("/urls/{id}?msg=check-ok"))
        }
        Ok(CheckOutcome::Failed(_)) => see_other(format!("/urls/{id}?msg=check-failed")),
        Ok(CheckOutcome::UnknownUrl) => see_other("/?msg=unknown-url".to_string()),
        Err(e) => {
            error!(error = ?e, id, "failed to record check");
            see_other(format!("/urls/{id}?msg=check-failed"))
        }
    })
}
