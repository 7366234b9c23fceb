use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "prenota")]
#[command(about = "Books an appointment slot on the Prenotami portal")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Path to the JSON run configuration
	#[arg(short, long, default_value = "config.json", value_name = "FILE")]
	pub config: PathBuf,

	/// Run the browser headless (overrides the config; the manual CAPTCHA
	/// step needs a visible browser, so use with a restored session only)
	#[arg(long)]
	pub headless: bool,

	/// Override the service id from the config
	#[arg(long, value_name = "ID")]
	pub service_id: Option<String>,

	/// Override the session snapshot path from the config
	#[arg(long, value_name = "FILE")]
	pub session_file: Option<PathBuf>,
}
