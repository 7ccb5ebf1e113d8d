//! Command-line operator client for the token exchange.
//!
//! Every subcommand maps onto one client operation. State lives in two
//! files: the TOML config (`--config`) and the token registry it points to.
//!
//! Run with: `cargo run -p dex-cli -- --help`

mod logging;

use clap::{Args, Parser, Subcommand};
use dex_client::{
    parse_decimals, validate_address, Address, Bytes, ClientConfig, CoreBytecode, DexClient,
    OrderId, RpcLedger, TokenParams, TxHash, U256,
};
use eyre::{bail, WrapErr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

type Client = DexClient<RpcLedger>;

#[derive(Parser)]
#[command(name = "dex-cli", version, about = "Operator client for the token exchange")]
struct Cli {
    /// Client config file.
    #[arg(long, short, global = true, default_value = "dex.toml")]
    config: PathBuf,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect or create the config file.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage the token registry.
    #[command(subcommand)]
    Tokens(TokensCommand),
    /// Balance of the signing account in one token.
    Balance { token: String },
    /// Balances of every registered token.
    Balances,
    /// Deploy a new token and register it.
    DeployToken {
        /// File holding the token's hex-encoded creation bytecode.
        #[arg(long)]
        bytecode: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        /// Total supply in human units.
        #[arg(long)]
        supply: String,
        #[arg(long, default_value = "18")]
        decimals: String,
        /// Recipient of the supply; defaults to the signing account.
        #[arg(long)]
        to: Option<String>,
    },
    /// Deploy whichever core contracts the config does not name yet.
    DeployCore {
        #[arg(long)]
        factory_bytecode: PathBuf,
        #[arg(long)]
        router_bytecode: PathBuf,
        #[arg(long)]
        limit_order_bytecode: PathBuf,
    },
    /// Quote a swap.
    Quote {
        token_in: String,
        token_out: String,
        amount: String,
    },
    /// Swap an exact input amount.
    Swap {
        token_in: String,
        token_out: String,
        amount: String,
        /// Minimum accepted output in human units.
        #[arg(long, default_value = "0")]
        min_out: String,
        /// Recipient; defaults to the signing account.
        #[arg(long)]
        to: Option<String>,
        #[command(flatten)]
        wait: Wait,
    },
    /// Provide liquidity to a pair.
    AddLiquidity {
        token_a: String,
        token_b: String,
        amount_a: String,
        amount_b: String,
        #[arg(long, default_value = "0")]
        min_a: String,
        #[arg(long, default_value = "0")]
        min_b: String,
        #[command(flatten)]
        wait: Wait,
    },
    /// Limit orders.
    #[command(subcommand)]
    Order(OrderCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the current config.
    Show,
    /// Write a new config file.
    Init {
        #[arg(long, default_value = "http://127.0.0.1:8545")]
        rpc_url: String,
        #[arg(long, default_value_t = 31337)]
        chain_id: u64,
        #[arg(long)]
        private_key: String,
        #[arg(long)]
        factory: Option<String>,
        #[arg(long)]
        router: Option<String>,
        #[arg(long)]
        limit_order: Option<String>,
        #[arg(long, default_value = "tokens.json")]
        tokens: PathBuf,
        #[arg(long, default_value_t = 3)]
        max_hops: usize,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum TokensCommand {
    /// List registered tokens.
    List,
    /// Read a token's metadata from chain and register it.
    Register { address: String },
}

#[derive(Subcommand)]
enum OrderCommand {
    /// Create an order and print its id.
    Create {
        token_in: String,
        token_out: String,
        amount: String,
        min_out: String,
        /// Unix timestamp in seconds; 0 never expires.
        #[arg(long, default_value_t = 0)]
        expire_at: u64,
    },
    Read { id: String },
    Fill {
        id: String,
        #[command(flatten)]
        wait: Wait,
    },
    Cancel {
        id: String,
        #[command(flatten)]
        wait: Wait,
    },
    /// Ask the book whether an order can be filled now.
    Fillable { id: String },
}

#[derive(Args)]
struct Wait {
    /// Wait for the transaction to be mined.
    #[arg(long)]
    wait: bool,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    match cli.command {
        Command::Config(cmd) => run_config(&cli.config, cmd),
        command => {
            let config = ClientConfig::load(&cli.config).wrap_err_with(|| {
                format!(
                    "loading {} (create one with `dex-cli config init`)",
                    cli.config.display()
                )
            })?;
            let ledger = RpcLedger::connect(&config)
                .await
                .wrap_err("connecting to ledger")?;
            let mut client = DexClient::new(ledger, config);
            run(&mut client, &cli.config, command).await
        }
    }
}

fn run_config(path: &Path, cmd: ConfigCommand) -> eyre::Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let mut config = ClientConfig::load(path)?;
            if !config.private_key.is_empty() {
                config.private_key = "<redacted>".to_string();
            }
            print!("{}", config.to_toml()?);
        }
        ConfigCommand::Init {
            rpc_url,
            chain_id,
            private_key,
            factory,
            router,
            limit_order,
            tokens,
            max_hops,
            force,
        } => {
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            let config = ClientConfig {
                factory: optional_address(factory.as_deref(), "factory")?,
                router: optional_address(router.as_deref(), "router")?,
                limit_order: optional_address(limit_order.as_deref(), "limitOrder")?,
                ..ClientConfig::default()
                    .with_rpc(rpc_url, chain_id)
                    .with_private_key(private_key)
                    .with_tokens_path(tokens)
                    .with_max_hops(max_hops)
            };
            config.save(path)?;
            info!(path = %path.display(), "Config written");
            if config.needs_core_deployment() {
                warn!("Core contracts missing; run `dex-cli deploy-core` before trading");
            }
        }
    }
    Ok(())
}

async fn run(client: &mut Client, config_path: &Path, command: Command) -> eyre::Result<()> {
    match command {
        Command::Config(cmd) => run_config(config_path, cmd)?,
        Command::Tokens(TokensCommand::List) => {
            let tokens = client.registry().list();
            if tokens.is_empty() {
                println!("No tokens registered");
            }
            for token in tokens {
                println!("{token} ({} decimals)", token.decimals);
            }
        }
        Command::Tokens(TokensCommand::Register { address }) => {
            let token = validate_address(&address, "token")?;
            let entry = client
                .register_token(token)
                .await
                .wrap_err("registering token")?;
            println!("Registered {entry}");
        }
        Command::Balance { token } => {
            let token = validate_address(&token, "token")?;
            let balance = client.token_balance(token).await?;
            println!("{} (raw {})", balance.human, balance.raw);
        }
        Command::Balances => {
            for entry in client.registry_balances().await {
                match entry.balance {
                    Ok(balance) => println!("{}: {}", entry.token.symbol, balance.human),
                    Err(_) => println!("{}: ERR", entry.token.symbol),
                }
            }
        }
        Command::DeployToken {
            bytecode,
            name,
            symbol,
            supply,
            decimals,
            to,
        } => {
            let code = read_bytecode(&bytecode)?;
            let to = match to {
                Some(to) => validate_address(&to, "to")?,
                None => client.account(),
            };
            let params = TokenParams {
                name,
                symbol,
                supply,
                decimals: parse_decimals(&decimals)?,
                to,
            };
            let deployed = client
                .deploy_token(&code, params)
                .await
                .wrap_err("deploying token")?;
            println!("{} (tx {})", deployed.address, deployed.tx);
        }
        Command::DeployCore {
            factory_bytecode,
            router_bytecode,
            limit_order_bytecode,
        } => {
            let code = CoreBytecode {
                factory: read_bytecode(&factory_bytecode)?,
                router: read_bytecode(&router_bytecode)?,
                limit_order: read_bytecode(&limit_order_bytecode)?,
            };
            let result = client.deploy_core(&code).await;
            // Whatever was confirmed before a failure is kept
            client
                .config()
                .save(config_path)
                .wrap_err("saving config")?;
            let core = result.wrap_err("deploying core contracts")?;
            println!("factory      {}", core.factory);
            println!("router       {}", core.router);
            println!("limit order  {}", core.limit_order);
        }
        Command::Quote {
            token_in,
            token_out,
            amount,
        } => {
            let (token_in, token_out) = token_pair(&token_in, &token_out)?;
            let quote = client.quote(token_in, token_out, &amount).await?;
            println!("{} via {}", quote.out_human, quote.route);
        }
        Command::Swap {
            token_in,
            token_out,
            amount,
            min_out,
            to,
            wait,
        } => {
            let (token_in, token_out) = token_pair(&token_in, &token_out)?;
            let to = match to {
                Some(to) => validate_address(&to, "to")?,
                None => client.account(),
            };
            let tx = client
                .swap(token_in, token_out, &amount, &min_out, to)
                .await
                .wrap_err("swap")?;
            finish(client, tx, wait).await?;
        }
        Command::AddLiquidity {
            token_a,
            token_b,
            amount_a,
            amount_b,
            min_a,
            min_b,
            wait,
        } => {
            let token_a = validate_address(&token_a, "tokenA")?;
            let token_b = validate_address(&token_b, "tokenB")?;
            let tx = client
                .add_liquidity(token_a, token_b, &amount_a, &amount_b, &min_a, &min_b)
                .await
                .wrap_err("add liquidity")?;
            finish(client, tx, wait).await?;
        }
        Command::Order(cmd) => run_order(client, cmd).await?,
    }
    Ok(())
}

async fn run_order(client: &Client, cmd: OrderCommand) -> eyre::Result<()> {
    match cmd {
        OrderCommand::Create {
            token_in,
            token_out,
            amount,
            min_out,
            expire_at,
        } => {
            let (token_in, token_out) = token_pair(&token_in, &token_out)?;
            let placed = client
                .place_order(token_in, token_out, &amount, &min_out, expire_at)
                .await
                .wrap_err("creating order")?;
            println!("Order {} (tx {})", placed.id, placed.tx);
        }
        OrderCommand::Read { id } => {
            let order = client.read_order(order_id(&id)?).await?;
            println!("id         {}", order.id);
            println!("maker      {}", order.maker);
            println!("token in   {}", order.token_in);
            println!("token out  {}", order.token_out);
            println!("amount in  {}", order.amount_in);
            println!("min out    {}", order.min_out);
            println!("expire at  {}", order.expire_at);
            println!("status     {}", order.status);
        }
        OrderCommand::Fill { id, wait } => {
            let tx = client
                .fill_order(order_id(&id)?)
                .await
                .wrap_err("filling order")?;
            finish(client, tx, wait).await?;
        }
        OrderCommand::Cancel { id, wait } => {
            let tx = client
                .cancel_order(order_id(&id)?)
                .await
                .wrap_err("cancelling order")?;
            finish(client, tx, wait).await?;
        }
        OrderCommand::Fillable { id } => {
            let fill = client.is_fillable(order_id(&id)?).await?;
            println!("fillable {} (amount out {})", fill.fillable, fill.amount_out);
        }
    }
    Ok(())
}

/// Print the hash, and the outcome too when asked to wait.
async fn finish(client: &Client, tx: TxHash, wait: Wait) -> eyre::Result<()> {
    if !wait.wait {
        println!("{tx}");
        return Ok(());
    }
    let receipt = client.confirm(tx).await?;
    println!("{} mined", receipt.tx_hash);
    Ok(())
}

fn token_pair(token_in: &str, token_out: &str) -> eyre::Result<(Address, Address)> {
    Ok((
        validate_address(token_in, "tokenIn")?,
        validate_address(token_out, "tokenOut")?,
    ))
}

fn optional_address(value: Option<&str>, label: &str) -> eyre::Result<Option<Address>> {
    Ok(value.map(|v| validate_address(v, label)).transpose()?)
}

fn order_id(value: &str) -> eyre::Result<OrderId> {
    let id: U256 = value
        .trim()
        .parse()
        .map_err(|e| eyre::eyre!("invalid order id {value:?}: {e}"))?;
    Ok(OrderId(id))
}

fn read_bytecode(path: &Path) -> eyre::Result<Bytes> {
    let contents = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading bytecode from {}", path.display()))?;
    let digits = contents.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    let code = hex::decode(digits)
        .wrap_err_with(|| format!("{} does not hold hex bytecode", path.display()))?;
    Ok(code.into())
}
