use anyhow::Result;

// Prints the OpenAPI document so clients can be generated without a running server.
fn main() -> Result<()> {
    let doc = storefront::api::openapi();
    let json = serde_json::to_string_pretty(&doc)?;
    println!("{json}");
    Ok(())
}
