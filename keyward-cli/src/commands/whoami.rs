//! Report which identity mechanism the client would present.

use anyhow::Result;
use keyward_auth::Resolution;

use crate::client::KeyClient;

pub fn whoami(client: &KeyClient, json: bool, show_token: bool) -> Result<()> {
    let resolution = client.resolver().resolve_with_source();
    if json {
        println!("{}", serde_json::to_string(&whoami_json(resolution.as_ref(), show_token))?);
        return Ok(());
    }

    match resolution {
        Some(resolution) => {
            println!("Mechanism: {}", resolution.token.token_type());
            println!("Source: {}", resolution.source);
            println!("Identity: {}", display_payload(&resolution, show_token));
            if show_token {
                println!("Header: {}", client.auth_header());
            }
        }
        None => {
            println!("Mechanism: none");
            eprintln!("No credentials found; requests will be sent unauthenticated");
        }
    }
    Ok(())
}

fn whoami_json(resolution: Option<&Resolution>, show_token: bool) -> serde_json::Value {
    match resolution {
        Some(resolution) => serde_json::json!({
            "authenticated": true,
            "mechanism": resolution.token.token_type().as_str(),
            "type_byte": (resolution.token.token_type().as_byte() as char).to_string(),
            "source": resolution.source.as_str(),
            "from_certificate": resolution.is_enriched(),
            "identity": display_payload(resolution, show_token),
        }),
        None => serde_json::json!({ "authenticated": false }),
    }
}

/// Only names read from the client certificate are shown; raw values may be secrets.
fn display_payload(resolution: &Resolution, show_token: bool) -> String {
    let payload = resolution.token.payload();
    if show_token || resolution.is_enriched() {
        payload.to_string()
    } else {
        redact(payload)
    }
}

fn redact(secret: &str) -> String {
    if secret.chars().count() <= 8 {
        return "********".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}...")
}
