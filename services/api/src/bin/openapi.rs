//! services/api/src/bin/openapi.rs
//!
//! Writes the API's OpenAPI 3 document to `openapi.json` so it can be
//! committed or fed to client generators without starting the server.

use api_lib::web::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = "openapi.json";
    std::fs::write(path, ApiDoc::openapi().to_pretty_json()?)?;
    println!("Wrote {path}");
    Ok(())
}
