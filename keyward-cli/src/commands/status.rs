//! Show the assembled client configuration.

use anyhow::Result;

use crate::client::KeyClient;

pub fn status(client: &KeyClient, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(&status_json(client))?);
        return Ok(());
    }

    let transport = client.transport();
    println!("Host: {}", client.host());
    println!("Server name: {}", transport.server_name().to_str());
    println!(
        "Client certificate: {}",
        if transport.client_auth() { "attached" } else { "none" }
    );
    if transport.verify_server() {
        println!("Server verification: enabled");
    } else {
        println!("Server verification: DISABLED (insecure)");
    }
    println!("Key folder: {}", client.key_folder().display());
    println!("Token endpoint: {}", client.login().token_endpoint);
    if !client.login().client_id.is_empty() {
        println!("Client ID: {}", client.login().client_id);
    }
    let sources: Vec<&str> = client
        .resolver()
        .source_kinds()
        .into_iter()
        .map(|k| k.as_str())
        .collect();
    println!("Auth sources: {}", sources.join(", "));
    Ok(())
}

fn status_json(client: &KeyClient) -> serde_json::Value {
    let transport = client.transport();
    let sources: Vec<&str> = client
        .resolver()
        .source_kinds()
        .into_iter()
        .map(|k| k.as_str())
        .collect();
    serde_json::json!({
        "host": client.host().to_string(),
        "server_name": transport.server_name().to_str(),
        "client_auth": transport.client_auth(),
        "verify_server": transport.verify_server(),
        "key_folder": client.key_folder().display().to_string(),
        "token_endpoint": client.login().token_endpoint,
        "client_id": client.login().client_id,
        "auth_sources": sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::assemble;
    use crate::config::ClientSettings;
    use keyward_auth::Environment;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_status_json_reports_insecure_mode() {
        let env: Arc<dyn Environment> = Arc::new(HashMap::<String, String>::new());
        let settings = ClientSettings {
            insecure_skip_verify: true,
            ..ClientSettings::default()
        };
        let client = assemble(&settings, env).unwrap();

        let value = status_json(&client);
        assert_eq!(value["host"], "localhost:9000");
        assert_eq!(value["server_name"], "knox");
        assert_eq!(value["verify_server"], false);
        assert_eq!(value["client_auth"], false);
        assert_eq!(value["auth_sources"][0], "user-env");
    }
}
