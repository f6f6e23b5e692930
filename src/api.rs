use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::adapters::DexInfo;
use crate::config::ApiConfig;
use crate::dex::QuoteService;
use crate::types::{ChainId, ErrorCode, QuoteRequest, SwapQuoteResponse};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexesQuery {
    chain_id: Option<ChainId>,
}

async fn get_health(service: Arc<QuoteService>) -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "chains": service.chains().chain_ids(),
        "dexes": service.registry().len(),
    }))
}

async fn get_dexes(service: Arc<QuoteService>, Query(query): Query<DexesQuery>) -> Json<Vec<DexInfo>> {
    Json(service.registry().describe(query.chain_id))
}

async fn post_quote(
    service: Arc<QuoteService>,
    Json(request): Json<QuoteRequest>,
) -> (StatusCode, Json<SwapQuoteResponse>) {
    let response = service.quote(request).await;
    (status_for(&response), Json(response))
}

/// 경로 없음(정상적인 결과)과 실행 생성 실패(시스템 결함)를 다른 상태 코드로 구분
fn status_for(response: &SwapQuoteResponse) -> StatusCode {
    match response.error_code {
        None => StatusCode::OK,
        Some(ErrorCode::InvalidRequest) => StatusCode::BAD_REQUEST,
        Some(ErrorCode::NoRoute) => StatusCode::NOT_FOUND,
        Some(ErrorCode::ExecutionBuildFailed) | Some(ErrorCode::Configuration) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub struct ApiServer {
    config: ApiConfig,
    service: Arc<QuoteService>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, service: Arc<QuoteService>) -> Self {
        Self { config, service }
    }

    pub fn router(&self) -> Router {
        let service_health = Arc::clone(&self.service);
        let service_dexes = Arc::clone(&self.service);
        let service_quote = Arc::clone(&self.service);

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/health", get(move || get_health(service_health.clone())))
            .route("/api/dexes", get(move |query| get_dexes(service_dexes.clone(), query)))
            .route("/api/quote", post(move |payload| post_quote(service_quote.clone(), payload)))
            .layer(cors)
    }

    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let app = self.router();

        tracing::info!("🛰️ API server listening on http://{}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::Server::bind(&addr).serve(app.into_make_service()).await {
                tracing::error!("API server error: {}", e);
            }
        });

        Ok(())
    }
}
