use super::Context;
use comfy_table::{presets::UTF8_FULL, Table};
use moonbets_core::{format_sol, AuthorityError, MoonbetsError};

pub async fn handle_status(ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let accounts = client.accounts();

    let balance = client.balance().await?;

    println!("Wallet: {}", accounts.wallet);
    println!("Balance: {} SOL", format_sol(balance));
    println!("Player account: {}", accounts.player);
    println!();

    let state = match client.player_state().await {
        Ok(state) => state,
        Err(MoonbetsError::Authority(AuthorityError::AccountNotFound(_))) => {
            println!("No player account yet. Use 'moonbets init' to create one.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Stat", "Value"]);

    let last_result = if state.total_games == 0 {
        "-".to_string()
    } else {
        state.last_result.to_string()
    };
    let pending_bet = if state.has_pending_bet() {
        format!(
            "on {} for {} SOL",
            state.current_bet,
            format_sol(state.last_bet_amount)
        )
    } else {
        "none".to_string()
    };

    table.add_row(vec!["Last result".to_string(), last_result]);
    table.add_row(vec!["Pending bet".to_string(), pending_bet]);
    table.add_row(vec![
        "Pending winnings".to_string(),
        format!("{} SOL", format_sol(state.pending_withdrawal)),
    ]);
    table.add_row(vec!["Wins".to_string(), state.wins.to_string()]);
    table.add_row(vec!["Losses".to_string(), state.losses.to_string()]);
    table.add_row(vec!["Games played".to_string(), state.total_games.to_string()]);

    println!("{}", table);
    Ok(())
}
