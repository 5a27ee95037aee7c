use super::Context;
use crate::config::write_config;

pub fn handle_config(ctx: &Context, write: bool) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&ctx.config)?);

    if write {
        write_config(&ctx.cli.config_path, &ctx.config)?;
        println!("Saved to {}", ctx.cli.config_path.display());
    } else {
        println!("Config file: {}", ctx.cli.config_path.display());
        println!("Keypair: {}", ctx.cli.keypair_path.display());
    }
    Ok(())
}
