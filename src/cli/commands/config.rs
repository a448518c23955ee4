//! `config set-key` and `config show`.

use crate::cli::RuntimeConfig;
use crate::cli::args::ConfigCommand;
use crate::config::{ApiKeyStore, mask_key};
use crate::error::Result;

pub fn execute(command: ConfigCommand, runtime: &RuntimeConfig) -> Result<i32> {
    let store = ApiKeyStore::new(runtime.paths());
    match command {
        ConfigCommand::SetKey { key } => {
            store.save(&key)?;
            runtime
                .output()
                .success(&format!("API key saved to {}", store.path().display()));
        }
        ConfigCommand::Show => {
            let output = runtime.output();
            output.section("DocuPipe configuration");
            output.indent(&format!("Config dir: {}", runtime.paths().config_dir().display()));
            output.indent(&format!("Config file: {}", store.path().display()));
            output.indent(&format!("Logs dir: {}", runtime.paths().logs_dir().display()));
            output.indent(&format!("API URL: {}", runtime.api_url()));

            let explicit = runtime.explicit_api_key();
            let stored = store.load();
            let (key, source) = match explicit {
                Some(key) => (key.to_string(), "flag or DOCUPIPE_API_KEY"),
                None if !stored.is_empty() => (stored, "config file"),
                None => (String::new(), "not set"),
            };
            if key.is_empty() {
                output.indent("API key: (not set)");
            } else {
                output.indent(&format!("API key: {} ({})", mask_key(&key), source));
            }
        }
    }
    Ok(0)
}
