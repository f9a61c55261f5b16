use clap::{Parser, Subcommand};
use common::config::Config;
use serde::Serialize;
use std::{error::Error, sync::Arc, time::Duration};

use crate::hooks::DashboardHooks;
use crate::model::{
    AffiliateListParams, CustomerListParams, ModelId, OrderListParams, PageRequest,
    ProductListParams, ProductPatch,
};
use crate::payments::PaymentSettings;
use crate::query::QueryState;
use crate::transport::ReqwestTransport;
use crate::widgets::{POPULAR_PRODUCTS_LIMIT, rank_popular_products};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "dashboard/config/dev.yaml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Orders awaiting payment selection
    Orders {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        search: Option<String>,
    },
    Order { id: ModelId },
    Products {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 8)]
        limit: u32,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    Product { id: ModelId },
    /// Top sellers as shown on the dashboard
    Popular,
    Customers {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        search: Option<String>,
    },
    Affiliates {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    AffiliateOrders {
        code: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    AffiliateStats { code: String },
    UpdateProduct {
        id: ModelId,
        #[arg(long)]
        stock: Option<i64>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        low_stock_threshold: Option<i64>,
    },
}

pub fn initialize_executable() -> Result<(Args, Config), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();
    let config = Config::load(&args.config)?;
    initialize_tracing(&config.log_level);
    tracing::debug!(config_path = %args.config, ?config, "Loaded config");
    Ok((args, config))
}

pub fn initialize_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    // Ignore a second initialisation (tests, embedding).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn build_hooks(config: &Config) -> Result<DashboardHooks, Box<dyn Error + Send + Sync>> {
    let transport = ReqwestTransport::new(
        &config.api.base_url,
        Duration::from_millis(config.api.timeout_ms),
    )?;
    Ok(DashboardHooks::from_config(config, Arc::new(transport)))
}

fn render<T: Serialize>(state: QueryState<T>) -> Result<String, Box<dyn Error + Send + Sync>> {
    if let Some(error) = state.error {
        return Err(error.into());
    }
    match state.data {
        Some(data) => Ok(serde_json::to_string_pretty(&*data)?),
        None => Ok("null".to_string()),
    }
}

/// Runs one command and returns its JSON output.
pub async fn run_command(
    hooks: &DashboardHooks,
    command: Command,
) -> Result<String, Box<dyn Error + Send + Sync>> {
    match command {
        Command::Orders { page, limit, search } => {
            let params = OrderListParams {
                search,
                ..OrderListParams::page(page, limit)
            };
            render(hooks.orders(params).await)
        }
        Command::Order { id } => render(hooks.order(id).await),
        Command::Products { page, limit, category, search } => {
            let params = ProductListParams {
                category,
                search,
                ..ProductListParams::page(page, limit)
            };
            render(hooks.products(params).await)
        }
        Command::Product { id } => render(hooks.product(id).await),
        Command::Popular => {
            let state = hooks.popular_products().await;
            if let Some(error) = state.error {
                return Err(error.into());
            }
            let products = state.data.as_deref().map(Vec::as_slice).unwrap_or(&[]);
            let ranked = rank_popular_products(products, POPULAR_PRODUCTS_LIMIT);
            Ok(serde_json::to_string_pretty(&ranked)?)
        }
        Command::Customers { page, limit, search } => {
            let params = CustomerListParams {
                search,
                ..CustomerListParams::page(page, limit)
            };
            render(hooks.customers(params).await)
        }
        Command::Affiliates { page, limit, search, status } => {
            let params = AffiliateListParams {
                search,
                status,
                ..AffiliateListParams::page(page, limit)
            };
            render(hooks.affiliates(params).await)
        }
        Command::AffiliateOrders { code, page, limit } => {
            render(hooks.affiliate_orders(&code, PageRequest::new(page, limit)).await)
        }
        Command::AffiliateStats { code } => render(hooks.affiliate_stats(&code).await),
        Command::UpdateProduct { id, stock, price, low_stock_threshold } => {
            let patch = ProductPatch {
                stock,
                price,
                low_stock_threshold,
                ..ProductPatch::new(id)
            };
            let product = hooks.update_product(&patch).await?;
            Ok(serde_json::to_string_pretty(&product)?)
        }
    }
}

pub async fn run(args: Args, config: Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    let payments = PaymentSettings::from_env();
    tracing::info!(payments_enabled = payments.is_enabled(), base_url = %config.api.base_url, "Starting dashboard client");

    let hooks = build_hooks(&config)?;
    let output = run_command(&hooks, args.command).await?;
    println!("{}", output);
    Ok(())
}
