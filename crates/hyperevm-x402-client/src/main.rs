use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x402::{InjectedEnvironment, LocalWallet, X402Error};
use x402_client::display::{render_outcome, render_pay, short_address};
use x402_client::{handle_response, DemoConfig, DemoFlow, FacilitatorClient};

const USAGE: &str = "usage: x402-demo <health | gas | info | pay | ask <prompt>>";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        tracing::error!("{e}");
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<(), X402Error> {
    let config = DemoConfig::from_env()?;
    let command = args.first().map(String::as_str).unwrap_or("pay");

    match command {
        "health" => {
            let health = FacilitatorClient::new(&config.facilitator_url)?.health().await?;
            println!("Facilitator {} at {}", health.status, health.timestamp);
        }
        "gas" => {
            let gas = FacilitatorClient::new(&config.facilitator_url)?
                .gas_estimate()
                .await?;
            println!(
                "Facilitator balance: {} ETH\nEstimated gas cost: {} ETH\nEnough ETH: {}",
                gas.facilitator_eth_balance, gas.estimated_gas_cost, gas.has_enough_eth
            );
        }
        "info" => {
            let info = FacilitatorClient::new(&config.facilitator_url)?
                .facilitator_info()
                .await?;
            println!(
                "Facilitator {} holds {} ETH",
                short_address(&info.address.to_checksum(None)),
                info.eth_balance
            );
        }
        "pay" => {
            let mut flow = DemoFlow::new(environment(&config)?, &config)?;
            tracing::info!(
                amount = %config.amount,
                receiver = %config.chain.receiver,
                "starting payment"
            );
            let outcome = flow.pay().await?;
            println!("{}", render_pay(&outcome));
        }
        "ask" => {
            let prompt = args[1..].join(" ");
            let mut flow = DemoFlow::new(environment(&config)?, &config)?;
            if flow.builder().detect_wallet() {
                flow.ensure_connected().await?;
            }
            match flow.ask(&prompt).await? {
                Some(response) => println!("{}", render_outcome(&handle_response(&response))),
                None => println!("{USAGE}"),
            }
        }
        other => {
            return Err(X402Error::ConfigError(format!(
                "unknown command '{other}'\n{USAGE}"
            )))
        }
    }
    Ok(())
}

/// Inject the in-process wallet when a key is configured.
fn environment(config: &DemoConfig) -> Result<InjectedEnvironment<LocalWallet>, X402Error> {
    match &config.private_key {
        Some(key) => Ok(InjectedEnvironment::with_provider(LocalWallet::from_key(
            key,
            config.chain.chain_id,
        )?)),
        None => Ok(InjectedEnvironment::empty()),
    }
}
