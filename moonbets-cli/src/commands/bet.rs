use super::Context;
use moonbets_core::{deliver, format_sol, DisplayResult, Outcome, Tone};

pub async fn handle_bet(
    ctx: &Context,
    number: u8,
    amount: &str,
    json: bool,
    force: bool,
) -> anyhow::Result<()> {
    let client = ctx.client()?;

    if !json {
        println!("Rolling the dice on {} with {} SOL...", number, amount.trim());
        println!(
            "Waiting up to {}s for the result",
            client.config().resolver.timeout.as_secs()
        );
    }

    let outcome = if force {
        client.place_bet_over_pending(number, amount).await?
    } else {
        client.place_bet(number, amount).await?
    };

    let mut failed = false;
    deliver(&outcome, &mut |result: DisplayResult| {
        failed = result.tone == Tone::Failure;
        if json {
            match serde_json::to_string_pretty(&result) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("Error: {}", e),
            }
        } else {
            print_result(&result);
        }
    });

    if let (false, Outcome::Won { payout, .. }) = (json, &outcome) {
        println!(
            "{} SOL added to your pending winnings. Use 'moonbets withdraw' to claim.",
            format_sol(*payout)
        );
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn print_result(result: &DisplayResult) {
    println!();
    match result.tone {
        Tone::Win | Tone::Loss => {
            println!("  {}", result.headline);
            println!("  {}", result.detail);
        }
        Tone::Pending => {
            println!("  {}", result.headline);
            println!("  {}", result.detail);
            println!("  Run 'moonbets status' to see the latest result.");
        }
        Tone::Failure => {
            eprintln!("  {}", result.headline);
            eprintln!("  {}", result.detail);
        }
    }
}
