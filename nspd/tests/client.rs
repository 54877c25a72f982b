//! Tests d'intégration contre un géoportail NSPD simulé (axum en local)

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use nspd::{ClientConfig, CoordsOrder, FailureKind, NspdClient, Transport};

const SEARCH_PATH: &str = "/api/geoportal/v2/search/geoportal";

/// Démarre le serveur et retourne son adresse
async fn spawn(app: Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: std::net::SocketAddr) -> NspdClient {
    NspdClient::new(
        ClientConfig::default()
            .with_base_url(format!("http://{}{}", addr, SEARCH_PATH))
            .with_timeout_ms(5_000),
    )
    .unwrap()
}

fn polygon_feature(cadastral_number: &str) -> Value {
    json!({
        "data": {
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": "39:03:040036:328",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [2283000.0, 7379000.0],
                        [2283080.0, 7379000.0],
                        [2283080.0, 7379060.0],
                        [2283000.0, 7379060.0]
                    ]],
                    "crs": {"type": "name", "properties": {"name": "EPSG:3857"}}
                },
                "properties": {
                    "cadastral_number": cadastral_number,
                    "address": "обл. Калининградская, р-н Гурьевский",
                    "area_value": 1500,
                    "area_unit": "кв. м",
                    "category_id": "Земли населенных пунктов",
                    "utilization_id": "для индивидуального жилищного строительства"
                }
            }],
            "total": 1
        },
        "success": true
    })
}

/// Répond comme le NSPD, en refusant les requêtes sans en-têtes navigateur
async fn search(Query(params): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
    let browser_like = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ua| ua.starts_with("Mozilla/5.0"))
        && headers.get("origin").is_some_and(|v| v == "https://nspd.gov.ru")
        && headers.contains_key("referer")
        && headers.contains_key("sec-fetch-site");

    if !browser_like {
        return StatusCode::FORBIDDEN.into_response();
    }

    match params.get("query") {
        Some(query) => Json(polygon_feature(query)).into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

#[tokio::test]
async fn test_fetch_polygon_end_to_end() {
    let addr = spawn(Router::new().route(SEARCH_PATH, get(search))).await;
    let client = client_for(addr);

    let record = client
        .fetch_with_order("39:03:040036:328", CoordsOrder::LatLon)
        .await
        .expect("fetch should succeed");

    assert_eq!(record.cadastral_number, "39:03:040036:328");
    assert_eq!(record.geometry_type, "Polygon");
    assert_eq!(record.area, Some(1500.0));

    let [lat, lon] = record.centroid.expect("centroid");
    assert!(lat.is_finite() && lon.is_finite());
    assert!(lat > 50.0 && lat < 60.0, "lat={}", lat);
    assert!(lon > 15.0 && lon < 25.0, "lon={}", lon);

    assert_eq!(
        nspd::detect_land_status(&record),
        Some(nspd::LandStatus::Izhs)
    );

    let swapped = client
        .fetch_with_order("39:03:040036:328", CoordsOrder::LonLat)
        .await
        .unwrap();
    assert_eq!(swapped.centroid, Some([lon, lat]));
}

#[tokio::test]
async fn test_http_404_is_not_found() {
    let app = Router::new().route(SEARCH_PATH, get(|| async { StatusCode::NOT_FOUND }));
    let client = client_for(spawn(app).await);

    let err = client.fetch("39:03:000000:1").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::NotFound);
}

#[tokio::test]
async fn test_http_error_status() {
    let app = Router::new().route(
        SEARCH_PATH,
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let client = client_for(spawn(app).await);

    let err = client.fetch("39:03:040036:328").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::UpstreamStatus);
    assert_eq!(err.to_string(), "API Error: 503 Service Unavailable");
}

#[tokio::test]
async fn test_empty_collection_is_not_found() {
    let app = Router::new().route(
        SEARCH_PATH,
        get(|| async { Json(json!({"data": {"features": [], "total": 0}, "success": true})) }),
    );
    let client = client_for(spawn(app).await);

    let err = client.fetch("39:03:040036:999").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::NotFound);
    assert!(err.to_string().contains("object not found"));
}

#[tokio::test]
async fn test_malformed_json_is_parse_error() {
    let app = Router::new().route(SEARCH_PATH, get(|| async { "<html>captcha</html>" }));
    let client = client_for(spawn(app).await);

    let err = client.fetch("39:03:040036:328").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Parse);
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Port libéré juste après le bind : personne n'écoute
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr);
    let err = client.fetch("39:03:040036:328").await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Network);
    assert!(
        err.to_string().to_lowercase().contains("connect"),
        "cause missing: {}",
        err
    );
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let app = Router::new().route(
        SEARCH_PATH,
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"data": {"features": []}}))
        }),
    );
    let addr = spawn(app).await;
    let client = NspdClient::new(
        ClientConfig::default()
            .with_base_url(format!("http://{}{}", addr, SEARCH_PATH))
            .with_timeout_ms(200),
    )
    .unwrap();

    let started = std::time::Instant::now();
    let err = client.fetch("39:03:040036:328").await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Network);
    assert!(err.to_string().contains("timed out"), "{}", err);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_request_goes_through_authenticated_proxy() {
    // Le serveur joue le rôle du proxy : en HTTP clair, reqwest lui envoie
    // la requête en forme absolue avec Proxy-Authorization
    async fn proxy(
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Response {
        // base64("user:pass")
        let authorized = headers
            .get("proxy-authorization")
            .is_some_and(|v| v == "Basic dXNlcjpwYXNz");
        if !authorized {
            return StatusCode::PROXY_AUTHENTICATION_REQUIRED.into_response();
        }
        Json(polygon_feature(params.get("query").map(String::as_str).unwrap_or("")))
            .into_response()
    }

    let addr = spawn(Router::new().route(SEARCH_PATH, get(proxy))).await;

    for raw in [
        format!("user:pass@{}", addr),
        format!("{}:{}:user:pass", addr.ip(), addr.port()),
    ] {
        let client = NspdClient::new(
            ClientConfig::default()
                .with_base_url(format!("http://nspd.invalid{}", SEARCH_PATH))
                .with_proxy(Some(raw.clone()))
                .with_timeout_ms(5_000),
        )
        .unwrap();

        assert!(matches!(client.transport(), Transport::Proxied { .. }), "{}", raw);
        let record = client.fetch("39:03:040036:328").await.unwrap();
        assert!(record.centroid.is_some());
    }
}

#[tokio::test]
async fn test_unusable_proxy_degrades_to_direct() {
    let addr = spawn(Router::new().route(SEARCH_PATH, get(search))).await;
    let client = NspdClient::new(
        ClientConfig::default()
            .with_base_url(format!("http://{}{}", addr, SEARCH_PATH))
            .with_proxy(Some("http://[not a proxy")),
    )
    .unwrap();

    assert!(matches!(
        client.transport(),
        Transport::DirectFallback { .. }
    ));
    let record = client.fetch("39:03:040036:328").await.unwrap();
    assert_eq!(record.geometry_type, "Polygon");
}

#[tokio::test]
async fn test_concurrent_fetches() {
    let addr = spawn(Router::new().route(SEARCH_PATH, get(search))).await;
    let client = client_for(addr);

    let numbers = ["39:03:040036:1", "39:03:040036:2", "39:03:040036:3"];
    let handles: Vec<_> = numbers
        .iter()
        .map(|n| {
            let client = client.clone();
            let n = n.to_string();
            tokio::spawn(async move { client.fetch(&n).await })
        })
        .collect();

    for (handle, expected) in handles.into_iter().zip(numbers) {
        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.cadastral_number, expected);
    }
}
