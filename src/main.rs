use std::path::Path;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches, Command};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xcrack_swap_router::api::ApiServer;
use xcrack_swap_router::common::ChainDirectory;
use xcrack_swap_router::types::{ChainId, QuoteRequest};
use xcrack_swap_router::{Config, QuoteService};

fn cli() -> Command {
    Command::new("swap-router")
        .version(env!("CARGO_PKG_VERSION"))
        .author("xCrack Team <team@xcrack.dev>")
        .about("🦀 멀티체인 DEX 경로 집계기 - 병렬 견적, 순위 결정, 스왑 calldata 생성")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("설정 파일 경로")
                .default_value("config/default.toml")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("로그 레벨 (trace, debug, info, warn, error)")
                .global(true),
        )
        .subcommand(Command::new("serve").about("HTTP API 서버 실행"))
        .subcommand(
            Command::new("quote")
                .about("단일 견적 조회")
                .arg(Arg::new("chain").long("chain").value_name("CHAIN_ID").default_value("1"))
                .arg(
                    Arg::new("token-in")
                        .long("token-in")
                        .value_name("ADDRESS|SYMBOL")
                        .required(true),
                )
                .arg(
                    Arg::new("token-out")
                        .long("token-out")
                        .value_name("ADDRESS|SYMBOL")
                        .required(true),
                )
                .arg(
                    Arg::new("amount")
                        .long("amount")
                        .value_name("AMOUNT")
                        .help("소수점이 있으면 토큰 단위, 없으면 raw 단위")
                        .required(true),
                )
                .arg(Arg::new("slippage-bps").long("slippage-bps").value_name("BPS"))
                .arg(
                    Arg::new("user")
                        .long("user")
                        .value_name("ADDRESS")
                        .help("지정하면 실행 계획(승인 + 스왑 트랜잭션)까지 생성"),
                ),
        )
        .subcommand(
            Command::new("dexes")
                .about("등록된 DEX 플러그인 목록")
                .arg(Arg::new("chain").long("chain").value_name("CHAIN_ID")),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    dotenvy::dotenv().ok();

    let config_path = matches
        .get_one::<String>("config")
        .cloned()
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config_exists = Path::new(&config_path).exists();
    let mut config = if config_exists {
        Config::load(&config_path)
            .await
            .with_context(|| format!("설정 파일 로드 실패: {}", config_path))?
    } else {
        Config::default()
    };
    config.apply_env_overrides()?;

    // RUST_LOG > --log-level > config
    let log_filter = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| config.monitoring.log_level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config_exists {
        info!("📋 설정 파일 로드: {}", config_path);
    } else {
        warn!("⚠️ 설정 파일 없음 ({}), 기본 설정 사용", config_path);
    }

    if let Err(e) = config.validate() {
        error!("❌ 설정 검증 실패: {}", e);
        std::process::exit(1);
    }

    match matches.subcommand() {
        Some(("serve", _)) => serve(config).await,
        Some(("quote", args)) => quote(config, args).await,
        Some(("dexes", args)) => dexes(config, args),
        _ => Err(anyhow!("알 수 없는 명령")),
    }
}

async fn serve(config: Config) -> Result<()> {
    print_banner();

    let service = Arc::new(QuoteService::from_config(&config)?);
    info!(
        "✅ 체인 {:?}, DEX 플러그인 {}개 준비 완료",
        service.chains().chain_ids(),
        service.registry().len()
    );

    let server = ApiServer::new(config.api.clone(), service);
    server.start().await?;

    match signal::ctrl_c().await {
        Ok(()) => warn!("🛑 종료 신호 수신됨, 종료합니다"),
        Err(err) => error!("❌ 신호 처리 오류: {}", err),
    }
    Ok(())
}

async fn quote(config: Config, args: &ArgMatches) -> Result<()> {
    let chain_id = parse_chain(args.get_one::<String>("chain"))?.unwrap_or(1);
    let directory = config.chain_directory();

    let request = QuoteRequest {
        chain_id,
        token_in: resolve_token_arg(&directory, chain_id, arg(args, "token-in")?)?,
        token_out: resolve_token_arg(&directory, chain_id, arg(args, "token-out")?)?,
        amount_in: arg(args, "amount")?.to_string(),
        amount_units: None,
        slippage_bps: args
            .get_one::<String>("slippage-bps")
            .map(|s| s.parse())
            .transpose()
            .context("잘못된 --slippage-bps")?,
        user_address: args
            .get_one::<String>("user")
            .map(|s| s.parse())
            .transpose()
            .context("잘못된 --user 주소")?,
        recipient: None,
        deadline: None,
    };

    let service = QuoteService::from_config(&config)?;
    let response = service.quote(request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        std::process::exit(2);
    }
    Ok(())
}

fn dexes(config: Config, args: &ArgMatches) -> Result<()> {
    let chain_id = parse_chain(args.get_one::<String>("chain"))?;
    let registry = xcrack_swap_router::PluginRegistry::from_config(&config)?;
    println!("{}", serde_json::to_string_pretty(&registry.describe(chain_id))?);
    Ok(())
}

fn arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("--{} 이 필요합니다", name))
}

fn parse_chain(value: Option<&String>) -> Result<Option<ChainId>> {
    value
        .map(|s| s.parse::<ChainId>().with_context(|| format!("잘못된 체인 ID: {}", s)))
        .transpose()
}

/// 주소 또는 심볼 (설정된 토큰 목록에서 조회)
fn resolve_token_arg(directory: &ChainDirectory, chain_id: ChainId, value: &str) -> Result<Address> {
    if let Ok(address) = value.parse::<Address>() {
        return Ok(address);
    }
    directory
        .get(chain_id)
        .and_then(|chain| chain.find_by_symbol(value))
        .map(|token| token.address)
        .ok_or_else(|| anyhow!("체인 {} 에서 토큰 {} 을 찾을 수 없습니다", chain_id, value))
}

fn print_banner() {
    println!(r#"
    ╔══════════════════════════════════════════════════════════════╗
    ║                                                              ║
    ║  🦀 xCrack Swap Router                                       ║
    ║                                                              ║
    ║  🔀 V2 / V3 / Algebra / Curve / V4 플러그인 병렬 견적         ║
    ║  📊 출력량 기준 순위 + 멀티홉 경로                            ║
    ║  🧾 승인 + 스왑 calldata 생성                                 ║
    ║                                                              ║
    ╚══════════════════════════════════════════════════════════════╝
    "#);
}
