//! HTTP handler functions for the property boundary API.

use actix_web::{HttpRequest, HttpResponse, web};
use parcel_pipeline::{BoundaryQuery, PipelineError};
use parcel_property_models::Property;
use parcel_server_models::{
    ApiError, ApiHealth, ApiProperty, ApiSavedProperty, ApiTiles, BoundaryRequest,
    BoundaryRequestKind, BoundaryResponse, GeocodeRequest, GeocodeResponse, RenameRequest,
    SearchResponse,
};

use crate::{AppState, USER_ID_HEADER};

fn to_query(kind: BoundaryRequestKind) -> BoundaryQuery {
    match kind {
        BoundaryRequestKind::Address(address) => BoundaryQuery::Address(address),
        BoundaryRequestKind::Components(components) => BoundaryQuery::Components(components),
        BoundaryRequestKind::Location(location) => BoundaryQuery::Location(location),
    }
}

fn query_from(body: &BoundaryRequest) -> Result<BoundaryQuery, HttpResponse> {
    body.kind().map(to_query).ok_or_else(|| {
        HttpResponse::BadRequest().json(ApiError::new(
            "Provide an address, address components, or a location",
        ))
    })
}

fn pipeline_error(e: &PipelineError) -> HttpResponse {
    let body = ApiError::new(e.to_string());
    if e.is_validation() {
        HttpResponse::BadRequest().json(body)
    } else if e.is_not_found() {
        HttpResponse::NotFound().json(body)
    } else {
        log::error!("Pipeline failure: {e}");
        HttpResponse::BadGateway().json(body)
    }
}

fn user_id(req: &HttpRequest) -> Result<String, HttpResponse> {
    req.headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            HttpResponse::BadRequest().json(ApiError::new(format!(
                "Missing {USER_ID_HEADER} header"
            )))
        })
}

fn db_error(action: &str, e: &parcel_database::DbError) -> HttpResponse {
    log::error!("Failed to {action}: {e}");
    HttpResponse::InternalServerError().json(ApiError::new(format!("Failed to {action}")))
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        data_source: state.pipeline.source_name().to_string(),
        tiles: ApiTiles {
            url_template: state.tiles.url_template().to_string(),
            attribution: state.tiles.attribution().to_string(),
        },
    })
}

/// `POST /functions/v1/geocode`
///
/// Returns address candidates, best first. No match is an empty list.
pub async fn geocode(
    state: web::Data<AppState>,
    body: web::Json<GeocodeRequest>,
) -> HttpResponse {
    match state.pipeline.geocode(&body.address).await {
        Ok(candidates) => HttpResponse::Ok().json(GeocodeResponse { candidates }),
        Err(e) => pipeline_error(&e),
    }
}

/// `POST /functions/v1/property-boundaries`
///
/// Returns raw parcel features for an address, components, or location.
pub async fn property_boundaries(
    state: web::Data<AppState>,
    body: web::Json<BoundaryRequest>,
) -> HttpResponse {
    let query = match query_from(&body) {
        Ok(query) => query,
        Err(response) => return response,
    };

    match state.pipeline.fetch_boundary(&query).await {
        Ok(lookup) => HttpResponse::Ok().json(BoundaryResponse {
            features: lookup.features,
            candidate: lookup.candidate,
            provenance: lookup.provenance,
        }),
        Err(e) => pipeline_error(&e),
    }
}

/// `POST /api/search`
///
/// Runs the full pipeline and returns validated, measured properties.
pub async fn search(state: web::Data<AppState>, body: web::Json<BoundaryRequest>) -> HttpResponse {
    let query = match query_from(&body) {
        Ok(query) => query,
        Err(response) => return response,
    };

    match state.pipeline.search(&query).await {
        Ok(outcome) => HttpResponse::Ok().json(SearchResponse {
            properties: outcome
                .properties
                .into_iter()
                .map(ApiProperty::from)
                .collect(),
            candidate: outcome.candidate,
            provenance: outcome.provenance,
            dropped_rings: outcome.issues.iter().map(ToString::to_string).collect(),
        }),
        Err(e) => pipeline_error(&e),
    }
}

/// `GET /api/properties`
pub async fn list_properties(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let user = match user_id(&req) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match parcel_database::list_properties(state.db.as_ref(), &user).await {
        Ok(stored) => HttpResponse::Ok().json(
            stored
                .into_iter()
                .map(|s| ApiSavedProperty {
                    property: s.property,
                    created_at: s.created_at,
                })
                .collect::<Vec<_>>(),
        ),
        Err(e) => db_error("list properties", &e),
    }
}

/// `POST /api/properties`
///
/// Saves a property. Its rings are validated and its measurements
/// recomputed first. A temporary id is replaced by a persisted one.
pub async fn save_property(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<Property>,
) -> HttpResponse {
    let user = match user_id(&req) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let property = match parcel_pipeline::revalidate(body.into_inner()) {
        Ok(property) => property,
        Err(e) => return HttpResponse::BadRequest().json(ApiError::new(e.to_string())),
    };

    match parcel_database::save_property(state.db.as_ref(), &user, &property).await {
        Ok(stored) => HttpResponse::Created().json(ApiSavedProperty {
            property: stored.property,
            created_at: stored.created_at,
        }),
        Err(e) => db_error("save property", &e),
    }
}

/// `PATCH /api/properties/{id}`
pub async fn rename_property(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<RenameRequest>,
) -> HttpResponse {
    let user = match user_id(&req) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match parcel_database::rename_property(state.db.as_ref(), &user, &path, &body.name).await {
        Ok(Some(property)) => HttpResponse::Ok().json(property),
        Ok(None) => HttpResponse::NotFound().json(ApiError::new("Property not found")),
        Err(e) => db_error("rename property", &e),
    }
}

/// `DELETE /api/properties/{id}`
pub async fn delete_property(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    let user = match user_id(&req) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match parcel_database::delete_property(state.db.as_ref(), &user, &path).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => HttpResponse::NotFound().json(ApiError::new("Property not found")),
        Err(e) => db_error("delete property", &e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};
    use parcel_pipeline::{Pipeline, PipelineConfig, TileSource};
    use serde_json::{Value, json};

    use crate::{AppState, configure};

    async fn state(name: &str) -> web::Data<AppState> {
        let path = std::env::temp_dir().join(format!(
            "parcel-server-{}-{name}.db",
            std::process::id()
        ));
        std::fs::remove_file(&path).ok();
        let db = parcel_database::open_db(&path).await.unwrap();
        let pipeline = Pipeline::from_config(&PipelineConfig::local()).unwrap();

        web::Data::new(AppState {
            pipeline: Arc::new(pipeline),
            db: Arc::from(db),
            tiles: TileSource::OpenStreetMap,
        })
    }

    #[actix_web::test]
    async fn health_reports_data_source() {
        let app = test::init_service(
            App::new()
                .app_data(state("health").await)
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["healthy"], true);
        assert_eq!(body["dataSource"], "synthetic");
        assert!(
            body["tiles"]["urlTemplate"]
                .as_str()
                .unwrap()
                .contains("openstreetmap")
        );
    }

    #[actix_web::test]
    async fn blank_geocode_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(state("geocode").await)
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/functions/v1/geocode")
            .set_json(json!({"address": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn boundaries_by_location_return_features() {
        let app = test::init_service(
            App::new()
                .app_data(state("bounds").await)
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/functions/v1/property-boundaries")
            .set_json(json!({"location": {"x": 153.02, "y": -27.47}}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["features"].as_array().unwrap().len(), 1);
        assert_eq!(body["provenance"], "synthetic");
    }

    #[actix_web::test]
    async fn empty_boundary_request_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(state("empty").await)
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn search_then_save_rename_and_delete() {
        let app = test::init_service(
            App::new()
                .app_data(state("crud").await)
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(json!({"address": "123 Example Street, Brisbane QLD 4000"}))
            .to_request();
        let found: Value = test::call_and_read_body_json(&app, req).await;
        let property = found["properties"][0].clone();
        assert!(property["latLngBoundaries"][0].as_array().unwrap().len() >= 4);
        assert!(property["id"].as_str().unwrap().starts_with("tmp-"));

        let req = test::TestRequest::post()
            .uri("/api/properties")
            .set_json(&property)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/properties")
            .insert_header(("X-User-Id", "user-1"))
            .set_json(&property)
            .to_request();
        let saved: Value = test::call_and_read_body_json(&app, req).await;
        let id = saved["id"].as_str().unwrap().to_string();
        assert!(!id.starts_with("tmp-"));

        let req = test::TestRequest::patch()
            .uri(&format!("/api/properties/{id}"))
            .insert_header(("X-User-Id", "user-1"))
            .set_json(json!({"name": "Home"}))
            .to_request();
        let renamed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(renamed["name"], "Home");

        let req = test::TestRequest::get()
            .uri("/api/properties")
            .insert_header(("X-User-Id", "user-2"))
            .to_request();
        let others: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(others, json!([]));

        let req = test::TestRequest::delete()
            .uri(&format!("/api/properties/{id}"))
            .insert_header(("X-User-Id", "user-1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/properties/{id}"))
            .insert_header(("X-User-Id", "user-1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn save_rejects_property_without_valid_rings() {
        let app = test::init_service(
            App::new()
                .app_data(state("short-ring").await)
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/properties")
            .insert_header(("X-User-Id", "user-1"))
            .set_json(json!({
                "id": "tmp-short",
                "name": "Sliver",
                "description": null,
                "address": null,
                "location": [0.5, 0.5],
                "boundaries": [[[0.0, 0.0], [1.0, 1.0]]],
                "measurements": null
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/properties")
            .insert_header(("X-User-Id", "user-1"))
            .to_request();
        let saved: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(saved, json!([]));
    }

    #[actix_web::test]
    async fn save_recomputes_measurements() {
        let app = test::init_service(
            App::new()
                .app_data(state("remeasure").await)
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/properties")
            .insert_header(("X-User-Id", "user-1"))
            .set_json(json!({
                "id": "tmp-open",
                "name": "Open ring",
                "location": [0.0005, 0.0005],
                "boundaries": [
                    [[0.0, 0.0], [1.0, 1.0]],
                    [[0.0, 0.0], [0.001, 0.0], [0.001, 0.001]]
                ],
                "measurements": {"totalLengthM": 1.0, "segments": [], "areaM2": 99999.0}
            }))
            .to_request();
        let saved: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(saved["boundaries"].as_array().unwrap().len(), 1);
        assert_eq!(saved["boundaries"][0].as_array().unwrap().len(), 4);
        assert_eq!(saved["measurements"]["segments"].as_array().unwrap().len(), 3);
        assert!(saved["measurements"]["areaM2"].as_f64().unwrap() < 10_000.0);
    }
}
