//! Populate a development Vault with the demo collections.
//!
//! Reads `VAULT_ADDR`, `VPWMGR_USER` and `VPWMGR_PASSWORD` from the
//! environment; the personal demo entries are written under that user.

use vpwmgr_core::{MemoryStore, SecretStore, StoreConfig, VaultClient};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = StoreConfig::default();
    if let Ok(addr) = std::env::var("VAULT_ADDR") {
        config.vault_addr = addr;
    }
    let user = std::env::var("VPWMGR_USER").unwrap_or_else(|_| "psparks".to_string());
    let password = std::env::var("VPWMGR_PASSWORD").unwrap_or_else(|_| "pw".to_string());

    let vault = VaultClient::new(&config)?;
    let token = vault
        .login(&user, &password)?
        .ok_or("Vault rejected the demo credentials")?;

    let demo = MemoryStore::demo();
    let personal = format!("user/{}/", vpwmgr_core::path::encode(&user));
    for key in demo.keys() {
        let Some(record) = demo.get(&key) else {
            continue;
        };
        let target = match key.strip_prefix("user/psparks/") {
            Some(rest) => format!("{personal}{rest}"),
            None => key,
        };
        vault.write(&token, &target, &record)?;
        println!("wrote {target}");
    }

    println!("Seeded {} at {}", user, config.vault_addr);
    Ok(())
}
