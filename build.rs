use std::fs;
use std::path::Path;

// Compile-time defaults read from agent_config.h (not committed to git)
const SETTINGS: &[(&str, &str)] = &[
    ("WIFI_SSID", ""),
    ("WIFI_PASSWORD", ""),
    ("OTA_REPO_URL", ""),
    ("MQTT_BROKER_URL", "mqtt://172.16.0.35:1883"),
];

fn main() -> anyhow::Result<()> {
    // Necessary for ESP-IDF; host builds only compile agent-core logic
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    let config_path = "agent_config.h";
    println!("cargo:rerun-if-changed={}", config_path);

    let contents = if Path::new(config_path).exists() {
        fs::read_to_string(config_path)?
    } else {
        println!("cargo:warning=agent_config.h not found! Copy agent_config.h.example to agent_config.h and add your credentials.");
        String::new()
    };

    for (name, default) in SETTINGS {
        let define = format!("#define {}", name);
        let value = contents
            .lines()
            .find(|l| l.trim_start().starts_with(&define))
            .and_then(|l| l.split('"').nth(1))
            .unwrap_or(default);
        println!("cargo:rustc-env={}={}", name, value);
    }

    Ok(())
}
