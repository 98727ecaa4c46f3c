//! Example: repositories, queries and a unit of work over a JSON store
//!
//! Run with `cargo run -p repokit --example basic_usage [directory]`.
//! Data is written to the given directory (default: a `repokit-demo` folder
//! in the system temp directory).

use repokit::{
    init_logging, AuditInterceptor, Entity, EntitySchema, FetchStrategy, LoggingConfig, ModelResult,
    Navigation, QueryOptions, RepositoryFactory, RepositoryOptions,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Customer {
    id: i64,
    name: String,
    city: String,
    created_by: Option<String>,
    #[serde(default)]
    orders: Vec<Order>,
}

impl Entity for Customer {
    fn schema() -> EntitySchema {
        EntitySchema::for_type::<Self>().navigation(Navigation::collection::<Order>("orders"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Order {
    id: i64,
    customer_id: i64,
    amount: f64,
}

impl Entity for Order {}

#[tokio::main]
async fn main() -> ModelResult<()> {
    init_logging(&LoggingConfig::development())?;

    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("repokit-demo"));

    let factory = RepositoryFactory::new(
        RepositoryOptions::builder()
            .use_json_database(&root)
            .use_interceptor(Arc::new(AuditInterceptor::new("demo")))
            .ignore_transaction_warning(true)
            .build(),
    )?;

    // One commit for customers and their orders
    let uow = factory.create_unit_of_work()?;
    let customers = uow.create::<Customer, i64>()?;
    let orders = uow.create::<Order, i64>()?;

    let ada = customers
        .add(&Customer {
            name: "Ada".into(),
            city: "London".into(),
            ..Default::default()
        })
        .await?;
    let grace = customers
        .add(&Customer {
            name: "Grace".into(),
            city: "Arlington".into(),
            ..Default::default()
        })
        .await?;
    orders
        .add_range(&[
            Order { id: 0, customer_id: ada.id, amount: 120.0 },
            Order { id: 0, customer_id: ada.id, amount: 35.5 },
            Order { id: 0, customer_id: grace.id, amount: 80.0 },
        ])
        .await?;
    let saved = uow.commit().await?;
    println!("committed {} entities to {}", saved, root.display());

    let customers = factory.create_read_only::<Customer, i64>()?;
    let page = customers
        .find_all_where(&QueryOptions::new().fetch("orders").order_by("name").page(1))
        .await?;
    for customer in &page.result {
        let spent: f64 = customer.orders.iter().map(|o| o.amount).sum();
        println!(
            "{} ({}) placed {} order(s) worth {:.2}, created by {:?}",
            customer.name,
            customer.city,
            customer.orders.len(),
            spent,
            customer.created_by
        );
    }

    let big_spenders = factory
        .create_read_only::<Order, i64>()?
        .group_by(
            &QueryOptions::new().where_gte("amount", 50),
            |o| o.customer_id,
            |customer_id, orders| (*customer_id, orders.len()),
        )
        .await?;
    println!("orders of 50 or more per customer: {:?}", big_spenders.result);

    if let Some(ada) = customers
        .find_with_fetch(&ada.id, &FetchStrategy::new().include("orders"))
        .await?
    {
        println!("{} has {} order(s)", ada.name, ada.orders.len());
    }

    Ok(())
}
