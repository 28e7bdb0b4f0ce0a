use snc_core::config::{default_config_path, Config};

pub fn run(config: &Config, json: bool) -> anyhow::Result<()> {
    let config = config.masked();
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!("# default path: {:?}", default_config_path());
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
