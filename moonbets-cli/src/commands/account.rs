use super::Context;
use moonbets_core::format_sol;

pub async fn handle_init(ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;

    println!("Creating player account {}...", client.accounts().player);
    let signature = client.initialize_player().await?;
    println!("Player initialized!");
    println!("Signature: {}", signature);
    Ok(())
}

pub async fn handle_withdraw(ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;

    let state = client.player_state().await?;
    if state.pending_withdrawal == 0 {
        println!("Nothing to withdraw.");
        return Ok(());
    }

    println!("Withdrawing {} SOL...", format_sol(state.pending_withdrawal));
    let signature = client.withdraw().await?;
    println!("Withdrawal successful");
    println!("Signature: {}", signature);
    Ok(())
}
