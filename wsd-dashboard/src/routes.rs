//! HTTP routes. Handlers parse the request's filter, call into [`views`]
//! and serialize the result.

use crate::params::{FilterParams, SearchParams};
use crate::state::AppState;
use crate::views;
use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use wsd_core::filter::FilterState;
use wsd_core::site::SiteId;

static INDEX_HTML: &str = include_str!("../assets/index.html");
static CHARTS_JS: &str = include_str!("../assets/js/charts.js");
static DASHBOARD_JS: &str = include_str!("../assets/js/dashboard.js");

/// Handler error rendered as `{ "error": "..." }`.
pub struct ApiError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ApiError {
    fn bad_request(error: anyhow::Error) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("[WSD] routes: {:#}", self.error);
        } else {
            log::debug!("[WSD] routes: rejected request: {:#}", self.error);
        }
        (self.status, Json(json!({ "error": format!("{:#}", self.error) }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/assets/js/:name", get(script_handler))
        .route("/api/overview", get(overview_handler))
        .route("/api/sites/:id", get(site_handler))
        .route("/api/search", get(search_handler))
        .route("/api/features", get(features_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
}

fn request_filter(state: &AppState, params: &FilterParams) -> Result<FilterState, ApiError> {
    params
        .filter(state.dataset_span)
        .map_err(ApiError::bad_request)
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn script_handler(Path(name): Path<String>) -> Response {
    let body = match name.as_str() {
        "charts.js" => CHARTS_JS,
        "dashboard.js" => DASHBOARD_JS,
        _ => return (StatusCode::NOT_FOUND, "Not found").into_response(),
    };
    ([(header::CONTENT_TYPE, "application/javascript")], body).into_response()
}

pub async fn overview_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Response, ApiError> {
    let filter = request_filter(&state, &params)?;
    let view = views::overview(&state, &filter)?;
    Ok(Json(view).into_response())
}

pub async fn site_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<Response, ApiError> {
    let filter = request_filter(&state, &params)?;
    let site_id = SiteId::new(id);
    match views::site_detail(&state, &site_id, &filter)? {
        Some(view) => Ok(Json(view).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown site {}", site_id) })),
        )
            .into_response()),
    }
}

pub async fn search_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(search): Query<SearchParams>,
    Query(params): Query<FilterParams>,
) -> Result<Response, ApiError> {
    let filter = request_filter(&state, &params)?;
    let Some(query) = search.query() else {
        return Err(ApiError::bad_request(anyhow::anyhow!(
            "search needs an id or name parameter"
        )));
    };
    let view = views::search(&state, &query, &filter)?;
    Ok(Json(view).into_response())
}

pub async fn features_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    Json(views::features(&state)).into_response()
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use wsd_core::geometry::GeometryIndex;
    use wsd_core::model_artifact::{parse_artifact, ModelAdapter};
    use wsd_core::site::{Bounds, Centroid, Site, SourceEncoding};
    use wsd_db::Database;

    fn site(id: &str, name: &str) -> Site {
        Site {
            id: SiteId::from(id),
            name: name.to_string(),
            centroid: Centroid { lat: -18.8, lon: -69.1 },
            bounds: Bounds {
                min_lon: -69.5,
                min_lat: -19.0,
                max_lon: -68.7,
                max_lat: -18.6,
            },
            encoding: SourceEncoding::Utf8,
        }
    }

    fn test_state(model: ModelAdapter) -> Arc<AppState> {
        let db = Database::new().unwrap();
        let import = db
            .load_csv(
                "\
loc,sat_id,time,area_km2,ndwi_area_km2,error
10,S1_GRD,2020-01-01,5.0,,0
10,LANDSAT/LC08,2020-02-01,5.5,5.2,0
1262,LANDSAT/LC08,2020-03-01,12.0,11.5,0
1262,S1_GRD,2020-03-05,13.0,,1
",
            )
            .unwrap();
        let geometries = GeometryIndex::from_sites([
            site("10", "Laguna del Negro Francisco"),
            site("1262", "Salar de Surire"),
            site("1263", "Salar de Huasco"),
        ]);
        Arc::new(AppState::from_parts(db, import, geometries, model).unwrap())
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn overview_lists_every_site() {
        let (status, body) = get_json(test_state(ModelAdapter::Absent), "/api/overview").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["totals"]["locations"], 3);
        assert_eq!(body["totals"]["observations"], 3);
        assert_eq!(body["sites"].as_array().unwrap().len(), 3);
        assert_eq!(body["sites"][2]["observation_count"], 0);
        assert!(body["sites"][2]["mean_area_km2"].is_null());
        assert_eq!(body["table"][0]["id"], "10");
    }

    #[tokio::test]
    async fn radar_only_site_detail() {
        let (status, body) = get_json(
            test_state(ModelAdapter::Absent),
            "/api/sites/10?sensors=radar",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["stats"]["total"], 1);
        assert_eq!(body["site"]["mean_area_km2"], 5.0);
        assert_eq!(body["series"]["radar"].as_array().unwrap().len(), 1);
        assert!(body["series"]["optical"].as_array().unwrap().is_empty());
        assert!(body["comparison"].is_null());
    }

    #[tokio::test]
    async fn empty_sensor_selection_is_no_data() {
        let (status, body) = get_json(test_state(ModelAdapter::Absent), "/api/overview?sensors=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "no_data");
    }

    #[tokio::test]
    async fn flagged_rows_need_opt_in() {
        let state = test_state(ModelAdapter::Absent);
        let (_, body) = get_json(state.clone(), "/api/sites/1262").await;
        assert_eq!(body["stats"]["total"], 1);
        let (_, body) = get_json(state, "/api/sites/1262?include_flagged=true").await;
        assert_eq!(body["stats"]["total"], 2);
    }

    #[tokio::test]
    async fn site_without_rows_is_no_data_and_unknown_site_is_404() {
        let state = test_state(ModelAdapter::Absent);
        let (status, body) = get_json(state.clone(), "/api/sites/1263").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "no_data");
        let (status, body) = get_json(state, "/api/sites/5").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains('5'));
    }

    #[tokio::test]
    async fn search_by_id_and_name_agree() {
        let state = test_state(ModelAdapter::Absent);
        let (_, by_id) = get_json(state.clone(), "/api/search?id=1262").await;
        let (_, by_name) = get_json(state.clone(), "/api/search?name=SALAR%20DE%20SURIRE").await;
        assert_eq!(by_id, by_name);
        assert_eq!(by_id["matches"][0]["id"], "1262");

        let (_, partial) = get_json(state.clone(), "/api/search?name=salar").await;
        assert_eq!(partial["matches"].as_array().unwrap().len(), 2);

        let (status, none) = get_json(state, "/api/search?name=atacama").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(none["status"], "no_data");
    }

    #[tokio::test]
    async fn bad_filter_is_400() {
        let (status, body) = get_json(
            test_state(ModelAdapter::Absent),
            "/api/overview?start=2021-01-01&end=2020-01-01",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn features_follow_model_presence() {
        let (_, absent) = get_json(test_state(ModelAdapter::Absent), "/api/features").await;
        assert_eq!(absent["status"], "no_data");

        let importance =
            parse_artifact(r#"{"feature_names":["VV","NDWI"],"feature_importances":[0.2,0.7]}"#)
                .unwrap();
        let (_, loaded) = get_json(test_state(ModelAdapter::Loaded(importance)), "/api/features").await;
        assert_eq!(loaded["status"], "ok");
        assert_eq!(loaded["scores"][0]["feature"], "NDWI");
    }

    #[tokio::test]
    async fn index_and_assets_are_served() {
        let state = test_state(ModelAdapter::Absent);
        let response = router(state.clone())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/assets/js/missing.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
