//! Prunes a small document with the fluent builder and with a wire request.
//!
//! Run with:
//! ```bash
//! cargo run --example shake_builder
//! ```

use jsonshake::{ShakeBuilder, ShakeRequest, query::Limits, shake};

fn main() -> anyhow::Result<()> {
    let input = br#"{
        "user": {"name": "John", "password": "hunter2", "email": "j@x.com"},
        "sessions": [{"token": "a", "ip": "10.0.0.1"}, {"token": "b", "ip": "10.0.0.2"}]
    }"#;

    let public = ShakeBuilder::new(input)
        .limits(Limits { max_depth: Some(16), ..Limits::default() })
        .exclude(["$..password"])
        .exclude(["$.sessions[*].token"])
        .shake()?;
    println!("{}", String::from_utf8_lossy(&public));

    let contact = ShakeBuilder::new(input)
        .prefix("$.user")
        .include([".name", ".email"])
        .shake()?;
    println!("{}", String::from_utf8_lossy(&contact));

    let request: ShakeRequest = serde_json::from_str(
        r#"{"mode": "include", "paths": ["$.sessions[-1].ip"]}"#,
    )?;
    let last_ip = shake(input, &request.into_query())?;
    println!("{}", String::from_utf8_lossy(&last_ip));

    Ok(())
}
