use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::aggregator::{AggregatorSettings, RouteAggregator};
use super::execution::{ExecutionOptions, SwapExecutionBuilder};
use super::metrics::{confidence_score, sample_price_impact};
use super::AggregatorError;
use crate::adapters::{AdapterError, PluginRegistry};
use crate::blockchain::abi::IERC20;
use crate::blockchain::multicall::{multicall, CallRequest};
use crate::blockchain::rpc::{AlloyChainClient, ChainClient, ChainClients};
use crate::common::chains::ChainDirectory;
use crate::common::normalize::is_native;
use crate::common::units::parse_amount;
use crate::config::{Config, ExecutionConfig};
use crate::types::{
    AmountUnits, ChainConfig, ErrorCode, ExecutionPlan, QuoteRequest, RouteCandidate, RouteView,
    SwapQuoteResponse, TokenInfo,
};
use crate::utils::math::min_amount_out;

/// 견적 요청 처리 서비스
///
/// 요청 검증, 토큰 해석, 집계, 표시 지표, 실행 계획 생성을 하나의 응답으로 묶는다.
pub struct QuoteService {
    chains: ChainDirectory,
    clients: ChainClients,
    aggregator: RouteAggregator,
    executor: SwapExecutionBuilder,
    execution: ExecutionConfig,
    sample_divisor: u64,
}

impl QuoteService {
    pub fn new(
        chains: ChainDirectory,
        clients: ChainClients,
        registry: Arc<PluginRegistry>,
        settings: AggregatorSettings,
        execution: ExecutionConfig,
        sample_divisor: u64,
    ) -> Self {
        Self {
            chains,
            clients,
            aggregator: RouteAggregator::new(registry.clone(), settings),
            executor: SwapExecutionBuilder::new(registry, execution.check_allowance),
            execution,
            sample_divisor,
        }
    }

    /// 설정으로 레지스트리와 RPC 클라이언트 구성
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let registry = Arc::new(PluginRegistry::from_config(config)?);
        let timeout = Duration::from_millis(config.aggregator.quote_timeout_ms);

        let mut clients = ChainClients::new();
        for network in config.enabled_networks() {
            let client = AlloyChainClient::connect(
                network.chain_id,
                &network.rpc_url,
                timeout,
                network.multicall_batch_size,
            )?;
            clients.insert(Arc::new(client));
        }

        Ok(Self::new(
            config.chain_directory(),
            clients,
            registry,
            AggregatorSettings::from(&config.aggregator),
            config.execution.clone(),
            config.aggregator.sample_divisor,
        ))
    }

    pub fn registry(&self) -> &PluginRegistry {
        self.aggregator.registry()
    }

    pub fn chains(&self) -> &ChainDirectory {
        &self.chains
    }

    /// 견적 요청 처리 (실패도 응답으로 표현)
    pub async fn quote(&self, request: QuoteRequest) -> SwapQuoteResponse {
        let quote_id = Uuid::new_v4().to_string();
        let mut response = SwapQuoteResponse {
            quote_id: quote_id.clone(),
            chain_id: request.chain_id,
            timestamp: Utc::now(),
            success: false,
            best_route: None,
            alternatives: Vec::new(),
            execution: None,
            error: None,
            error_code: None,
        };

        match self.try_quote(&request, &mut response).await {
            Ok(()) => {
                response.success = true;
                info!("✅ 견적 {} 완료 (chain {})", quote_id, request.chain_id);
            }
            Err(e) => {
                match e.code() {
                    ErrorCode::NoRoute | ErrorCode::InvalidRequest => {
                        info!("견적 {} 실패: {}", quote_id, e)
                    }
                    _ => warn!("⚠️ 견적 {} 실패: {}", quote_id, e),
                }
                response.error = Some(e.to_string());
                response.error_code = Some(e.code());
            }
        }
        response
    }

    async fn try_quote(
        &self,
        request: &QuoteRequest,
        response: &mut SwapQuoteResponse,
    ) -> Result<(), AggregatorError> {
        let chain = self
            .chains
            .get(request.chain_id)
            .ok_or(AggregatorError::UnknownChain(request.chain_id))?;
        let client = self.clients.get(request.chain_id).ok_or_else(|| {
            AggregatorError::Configuration(format!("no RPC client for chain {}", request.chain_id))
        })?;

        let slippage_bps = request.slippage_bps.unwrap_or(self.execution.default_slippage_bps);
        if slippage_bps > self.execution.max_slippage_bps {
            return Err(AggregatorError::InvalidRequest(format!(
                "slippage {}bps exceeds max {}bps",
                slippage_bps, self.execution.max_slippage_bps
            )));
        }
        let now = Utc::now().timestamp().max(0) as u64;
        let deadline = match request.deadline {
            Some(deadline) if deadline <= now => {
                return Err(AggregatorError::InvalidRequest("deadline is in the past".to_string()))
            }
            Some(deadline) => deadline,
            None => now + self.execution.default_deadline_secs,
        };

        let amount_in = self.parse_request_amount(client.as_ref(), chain, request).await?;

        let result = self
            .aggregator
            .aggregate(client.as_ref(), chain, request.token_in, request.token_out, amount_in)
            .await?;
        let Some(best) = result.best else {
            return Err(AggregatorError::NoRouteFound);
        };

        let impact = sample_price_impact(&self.aggregator, client.as_ref(), chain, &best, self.sample_divisor).await;
        let best_view = route_view(&best, slippage_bps, impact, confidence_score(&best, &result.alternatives, impact));
        response.alternatives = result
            .alternatives
            .iter()
            .map(|alt| route_view(alt, slippage_bps, None, confidence_score(alt, std::slice::from_ref(&best), None)))
            .collect();
        response.best_route = Some(best_view);

        // 수령 주소를 알 때만 실행 계획을 만든다
        let Some(recipient) = request.recipient.or(request.user_address) else {
            return Ok(());
        };
        let options = ExecutionOptions {
            token_in: request.token_in,
            token_out: request.token_out,
            slippage_bps,
            recipient,
            deadline,
            sender: request.user_address,
        };
        let plan = self.build_execution(client.as_ref(), chain, &best, &options).await?;
        response.execution = Some(plan);
        Ok(())
    }

    async fn build_execution(
        &self,
        client: &dyn ChainClient,
        chain: &ChainConfig,
        route: &RouteCandidate,
        options: &ExecutionOptions,
    ) -> Result<ExecutionPlan, AggregatorError> {
        self.executor
            .build(Some(client), chain, route, options)
            .await
            .map_err(|e| match e {
                AdapterError::Configuration(msg) => AggregatorError::Configuration(msg),
                other => AggregatorError::Execution(other),
            })
    }

    async fn parse_request_amount(
        &self,
        client: &dyn ChainClient,
        chain: &ChainConfig,
        request: &QuoteRequest,
    ) -> Result<U256, AggregatorError> {
        let trimmed = request.amount_in.trim();
        let units = match request.amount_units {
            Some(units) => units,
            None if trimmed.contains('.') => AmountUnits::Human,
            None => AmountUnits::Raw,
        };
        let decimals = match units {
            AmountUnits::Raw => 0,
            AmountUnits::Human => self.resolve_token(client, chain, request.token_in).await?.decimals,
        };
        parse_amount(trimmed, units, decimals)
            .map_err(|e| AggregatorError::InvalidRequest(format!("amountIn: {}", e)))
    }

    /// 토큰 정보 조회 (설정에 없으면 체인에서 decimals/symbol 을 읽는다)
    pub async fn resolve_token(
        &self,
        client: &dyn ChainClient,
        chain: &ChainConfig,
        address: Address,
    ) -> Result<TokenInfo, AggregatorError> {
        if let Some(token) = chain.find_token(address) {
            return Ok(token);
        }
        if is_native(address) {
            return Ok(chain.native_token());
        }

        let calls = [
            CallRequest::new(address, IERC20::decimalsCall {}.abi_encode()),
            CallRequest::new(address, IERC20::symbolCall {}.abi_encode()),
        ];
        let results = multicall(client, &calls).await;

        let decimals = results
            .first()
            .and_then(|r| r.as_ref().ok())
            .and_then(|data| IERC20::decimalsCall::abi_decode_returns(data).ok())
            .ok_or_else(|| {
                AggregatorError::InvalidRequest(format!("{} is not a readable ERC-20 token", address))
            })?;
        let symbol = results
            .get(1)
            .and_then(|r| r.as_ref().ok())
            .and_then(|data| IERC20::symbolCall::abi_decode_returns(data).ok())
            .unwrap_or_else(|| "UNKNOWN".to_string());

        info!("🔍 토큰 조회: {} {} ({} decimals)", address, symbol, decimals);
        Ok(TokenInfo::new(chain.chain_id, address, &symbol, decimals))
    }
}

fn route_view(route: &RouteCandidate, slippage_bps: u32, impact: Option<u32>, confidence: f64) -> RouteView {
    RouteView {
        dex_id: route.dex_id.clone(),
        dex_name: route.dex_name.clone(),
        amount_in: route.amount_in,
        amount_out: route.amount_out,
        min_amount_out: min_amount_out(route.amount_out, slippage_bps),
        hops: route.hops.clone(),
        price_impact_bps: impact,
        confidence_score: confidence,
    }
}
