//! Resolve sales tax for a few buyers.
//!
//! Reads `SALESTAX_*` variables (optionally from a `.env` file), e.g.
//!
//! ```sh
//! SALESTAX_ORIGIN_COUNTRY=FR RUST_LOG=salestax=debug cargo run --example sales_tax
//! ```

use rust_decimal_macros::dec;
use salestax::{EngineConfig, SalesTax};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();

    let config = EngineConfig::from_env()?;
    let engine = SalesTax::from_config(config)?;
    let settings = engine.settings();

    println!("=== Sales Tax ===\n");
    println!(
        "  origin={}, regional tax={}, validation={}, fraud check={}\n",
        settings.origin_country.as_deref().unwrap_or("—"),
        settings.use_regional_tax,
        settings.validate_tax_numbers,
        settings.fraud_check,
    );

    let buyers = [
        ("FR", None, None),
        ("FR", None, Some("FR87524172699")),
        ("DE", None, Some("DE123456788")),
        ("GB", None, Some("GB980234718")),
        ("CA", Some("QC"), None),
        ("CA", Some("ON"), Some("123456789")),
        ("US", Some("CA"), None),
        ("US", Some("DE"), None),
        ("HK", None, None),
    ];

    for (country, state, tax_number) in buyers {
        let buyer = match state {
            Some(state) => format!("{country}/{state}"),
            None => country.to_string(),
        };
        match engine
            .get_amount_with_sales_tax(country, state, dec!(100), tax_number)
            .await
        {
            Ok(amount) => println!(
                "  {buyer:<6} {:<18} type={:<8} rate={:<8} total={:<10} area={} exchange={} reverse={}",
                tax_number.unwrap_or("-"),
                amount.tax_type,
                amount.rate,
                amount.total,
                amount.area.as_str(),
                amount.exchange.as_str(),
                amount.charge.reverse,
            ),
            Err(e) => println!("  {buyer:<6} ERROR: {e}"),
        }
    }

    println!("\n=== Tax Number Validation ===\n");

    let numbers = [
        ("FR", "FR87524172699"),
        ("FR", "FR88524172699"),
        ("GR", "EL094300033"),
        ("US", "01-1234567"),
        ("JP", "1234567890123"),
    ];

    for (country, number) in numbers {
        match engine.validate_tax_number(country, number).await {
            Ok(valid) => println!("  {country} {number} => {}", if valid { "valid" } else { "INVALID" }),
            Err(e) => println!("  {country} {number} => ERROR: {e}"),
        }
    }

    Ok(())
}
