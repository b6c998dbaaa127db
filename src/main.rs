//! Order Fulfillment - service entry point
//!
//! One binary, three services. Pick one with `--service`:
//!
//! ```text
//! ┌──────────┐   credit   ┌──────────┐   debit / void   ┌──────────┐
//! │ Payment  │───────────▶│  Users   │◀─────────────────│  Order   │
//! │  :8081   │            │  :8080   │   read balance   │  :8082   │
//! └──────────┘            └──────────┘                  └──────────┘
//! ```
//!
//! `--service all` runs the three in one process; Payment and Order then
//! call the Users service in-process instead of over HTTP.
//!
//! Flags: `--env/-e <name>` (loads `config/<name>.yaml`, default `dev`),
//! `--service users|payment|order|all` (default `all`), `--port <n>`.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::{info, warn};

use order_fulfillment::account::{AccountStore, BalanceService, InMemoryAccountStore, PgAccountStore};
use order_fulfillment::config::{AppConfig, ServiceConfig, StorageKind};
use order_fulfillment::db::Database;
use order_fulfillment::gateway::{
    self,
    state::{OrderState, PaymentState, UsersState},
};
use order_fulfillment::order::{
    InMemoryOrderStore, OrderStore, OrderWorkflow, PgOrderStore, Reconciler,
};
use order_fulfillment::upstream::{BalanceClient, HttpBalanceClient, LocalBalanceClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    Users,
    Payment,
    Order,
    All,
}

impl FromStr for Service {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(Service::Users),
            "payment" => Ok(Service::Payment),
            "order" => Ok(Service::Order),
            "all" => Ok(Service::All),
            other => bail!("unknown service '{}', expected users|payment|order|all", other),
        }
    }
}

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

fn get_service() -> anyhow::Result<Service> {
    get_arg(&["--service"]).as_deref().unwrap_or("all").parse()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> anyhow::Result<Option<u16>> {
    get_arg(&["--port"])
        .map(|p| p.parse().context("--port must be a port number"))
        .transpose()
}

fn listen_addr(service: &ServiceConfig, port_override: Option<u16>) -> anyhow::Result<SocketAddr> {
    let port = port_override.unwrap_or(service.port);
    format!("{}:{}", service.host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", service.host, port))
}

fn account_store(config: &AppConfig, db: Option<&Database>) -> Arc<dyn AccountStore> {
    match (config.storage, db) {
        (StorageKind::Postgres, Some(db)) => Arc::new(PgAccountStore::new(db.pool().clone())),
        _ => Arc::new(InMemoryAccountStore::new()),
    }
}

fn order_store(config: &AppConfig, db: Option<&Database>) -> Arc<dyn OrderStore> {
    match (config.storage, db) {
        (StorageKind::Postgres, Some(db)) => Arc::new(PgOrderStore::new(db.pool().clone())),
        _ => Arc::new(InMemoryOrderStore::new()),
    }
}

async fn connect_database(config: &AppConfig) -> anyhow::Result<Option<Database>> {
    if config.storage != StorageKind::Postgres {
        info!("Using in-memory stores");
        return Ok(None);
    }
    let url = config
        .postgres_url
        .as_deref()
        .context("postgres_url is required when storage is postgres")?;
    let db = Database::connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;
    db.ensure_schema().await.context("failed to create schema")?;
    Ok(Some(db))
}

fn http_users_client(config: &AppConfig) -> anyhow::Result<Arc<dyn BalanceClient>> {
    let client = HttpBalanceClient::new(&config.upstream.users_url, config.upstream.timeout())
        .context("failed to build HTTP client")?;
    info!(users_url = %config.upstream.users_url, "Users service client ready");
    Ok(Arc::new(client))
}

/// Build the Order service state and start its reconciler
fn order_state(
    config: &AppConfig,
    users: Arc<dyn BalanceClient>,
    orders: Arc<dyn OrderStore>,
) -> Arc<OrderState> {
    let workflow = Arc::new(OrderWorkflow::new(
        users,
        orders.clone(),
        config.workflow_config(),
    ));

    if config.reconciler.enabled {
        let reconciler = Reconciler::new(
            workflow.clone(),
            orders.clone(),
            config.reconciler.to_config(),
        );
        tokio::spawn(async move {
            reconciler.run().await;
        });
    } else {
        warn!("Reconciler disabled; stuck PENDING orders will not be settled");
    }

    Arc::new(OrderState { workflow, orders })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let service = get_service()?;
    let port_override = get_port_override()?;

    let config = AppConfig::load(&env)?;
    let _log_guard = order_fulfillment::logging::init_logging(&config);

    info!(
        env = %env,
        service = ?service,
        storage = ?config.storage,
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        "Starting order_fulfillment"
    );

    let db = connect_database(&config).await?;

    match service {
        Service::Users => {
            let balances = Arc::new(BalanceService::new(account_store(&config, db.as_ref())));
            let app = gateway::users_app(Arc::new(UsersState { balances }));
            gateway::serve("users", listen_addr(&config.users, port_override)?, app).await?;
        }
        Service::Payment => {
            let app = gateway::payment_app(Arc::new(PaymentState {
                users: http_users_client(&config)?,
            }));
            gateway::serve("payment", listen_addr(&config.payment, port_override)?, app).await?;
        }
        Service::Order => {
            let state = order_state(
                &config,
                http_users_client(&config)?,
                order_store(&config, db.as_ref()),
            );
            let app = gateway::order_app(state);
            gateway::serve("order", listen_addr(&config.order, port_override)?, app).await?;
        }
        Service::All => {
            if port_override.is_some() {
                warn!("--port is ignored with --service all");
            }
            let balances = Arc::new(BalanceService::new(account_store(&config, db.as_ref())));
            let local: Arc<dyn BalanceClient> = Arc::new(LocalBalanceClient::with_timeout(
                balances.clone(),
                config.upstream.timeout(),
            ));

            let users = gateway::users_app(Arc::new(UsersState { balances }));
            let payment = gateway::payment_app(Arc::new(PaymentState {
                users: local.clone(),
            }));
            let order = gateway::order_app(order_state(
                &config,
                local,
                order_store(&config, db.as_ref()),
            ));

            tokio::try_join!(
                gateway::serve("users", listen_addr(&config.users, None)?, users),
                gateway::serve("payment", listen_addr(&config.payment, None)?, payment),
                gateway::serve("order", listen_addr(&config.order, None)?, order),
            )?;
        }
    }

    Ok(())
}
