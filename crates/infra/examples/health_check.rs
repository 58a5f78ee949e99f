//! Example: probing a compute API with the async client
//!
//! Settings come from the environment (`CRUCIBLE_URL`,
//! `CRUCIBLE_ID`, `CRUCIBLE_KEY`).
//!
//! ```bash
//! CRUCIBLE_URL=https://api.example.org \
//! CRUCIBLE_ID=user CRUCIBLE_KEY=secret \
//!     cargo run -p crucible-infra --example health_check
//! ```

use crucible_infra::{init_logging, AsyncClient, ClientSettings, LoggingConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LoggingConfig::default())?;

    let client = AsyncClient::new(ClientSettings::builder().build()?)?;
    println!("{client}");
    println!("{}", serde_json::to_string_pretty(&client.settings().settings())?);

    let info = client.with_session(|session| async move { session.get_info().await }).await?;
    println!("info: {info}");

    client.with_session(|session| async move { session.api_check().await }).await?;
    println!("authenticated check passed");

    Ok(())
}
