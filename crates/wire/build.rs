fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The axum HTTP gateway in containarium-api serializes these same
    // generated structs directly to and from JSON, so there is exactly
    // one request/response shape per operation regardless of transport.
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .type_attribute(".", "#[derive(serde::Serialize, serde::Deserialize)]")
        .type_attribute(".", "#[serde(default, rename_all = \"camelCase\")]")
        .compile(&["proto/containarium.proto"], &["proto"])?;
    Ok(())
}
