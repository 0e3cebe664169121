use std::io::Read;

use anyhow::{Context, Result};

use salesdesk_sales::FormConfig;

fn main() -> Result<()> {
    salesdesk_observability::init();

    let input = match std::env::args().nth(1) {
        Some(path) if path != "-" => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {path}"))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read snapshot from stdin")?;
            buf
        }
    };

    let config = FormConfig::from_env().context("invalid form configuration")?;
    let script = salesdesk_cli::parse_script(&input)?;
    let report = salesdesk_cli::run(config, script)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
