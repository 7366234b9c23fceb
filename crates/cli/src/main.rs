mod cli;
mod logging;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use prenota::{BotConfig, ManualGate, RunOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cli::Cli;

fn load_config(cli: &Cli) -> anyhow::Result<BotConfig> {
	let mut config = read_config(&cli.config)?;
	if cli.headless {
		config.headless = true;
	}
	if let Some(service_id) = &cli.service_id {
		config.service_id = service_id.clone();
	}
	if let Some(session_file) = &cli.session_file {
		config.session_path = session_file.clone();
	}
	Ok(config)
}

fn read_config(path: &Path) -> anyhow::Result<BotConfig> {
	let content = std::fs::read_to_string(path).with_context(|| format!("failed to read config at {}", path.display()))?;
	serde_json::from_str(&content).with_context(|| format!("invalid config at {}", path.display()))
}

/// Forwards every stdin line to the manual gate: "solve the CAPTCHA in the
/// browser, then press Enter".
fn spawn_manual_resume(gate: ManualGate) {
	tokio::task::spawn_blocking(move || {
		let mut line = String::new();
		loop {
			line.clear();
			match std::io::stdin().read_line(&mut line) {
				Ok(0) | Err(_) => break,
				Ok(_) => gate.resume(),
			}
		}
	});
}

fn spawn_ctrl_c(cancel: CancellationToken) {
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!(target = "prenota.cli", "interrupt received; stopping at the next safe point");
			cancel.cancel();
		}
	});
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let config = match load_config(&cli) {
		Ok(config) => config,
		Err(err) => {
			error!(target = "prenota.cli", error = %err, "configuration error");
			std::process::exit(3);
		}
	};

	let gate = ManualGate::new();
	let cancel = CancellationToken::new();
	spawn_manual_resume(gate.clone());
	spawn_ctrl_c(cancel.clone());

	eprintln!("If a CAPTCHA appears, solve it in the browser window, then press Enter here.");

	let outcome = prenota::run(&config, gate, cancel).await;
	match &outcome {
		RunOutcome::Booked { slot, confirmation } => {
			println!("Booked {} {} at {}, confirmation {confirmation}", slot.date, slot.time, slot.office);
		}
		RunOutcome::Exhausted { attempts } => {
			eprintln!("No slot claimed after {attempts} cycles; retry policy exhausted.");
		}
		RunOutcome::Fatal { error } => {
			error!(target = "prenota.cli", error = %error, "run failed");
		}
		RunOutcome::Cancelled => {
			eprintln!("Run cancelled.");
		}
	}
	std::process::exit(outcome.exit_code());
}
