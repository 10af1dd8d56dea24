use clap::{Args, Subcommand};

use qzemoji::Config;

use super::OutputFormat;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        println!("index_url: {}", config.index_url.value);
                        println!("  source: {}", config.index_url.source);
                        println!();

                        println!("fallback_url: {}", config.fallback_url.value);
                        println!("  source: {}", config.fallback_url.source);
                        println!();

                        println!("asset_name: {}", config.asset_name.value);
                        println!("  source: {}", config.asset_name.source);
                        println!();

                        println!(
                            "proxy: {}",
                            config.proxy.value.as_deref().unwrap_or("(none)")
                        );
                        println!("  source: {}", config.proxy.source);
                        println!();

                        println!("timeout_secs: {}", config.timeout_secs.value);
                        println!("  source: {}", config.timeout_secs.source);
                        println!();

                        println!("auto_update: {}", config.auto_update.value);
                        println!("  source: {}", config.auto_update.source);
                        println!();

                        match &config.seed_snapshot.value {
                            Some(path) => println!("seed_snapshot: {}", path.display()),
                            None => println!("seed_snapshot: (none)"),
                        }
                        println!("  source: {}", config.seed_snapshot.source);
                    }
                }
                Ok(())
            }
        }
    }
}
