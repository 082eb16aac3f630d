use clap::Subcommand;
use focusmint_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as JSON
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration file
    Init,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
        ConfigAction::Init => {
            let config = Config::load()?;
            config.save()?;
            println!("wrote {}", Config::config_path()?.display());
        }
    }
    Ok(())
}
