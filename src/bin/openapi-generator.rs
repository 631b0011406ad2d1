//! Print the OpenAPI document of the HTTP API to stdout.

use anyhow::Context;
use clash_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi()
        .to_pretty_json()
        .context("serialising OpenAPI document")?;
    println!("{doc}");
    Ok(())
}
