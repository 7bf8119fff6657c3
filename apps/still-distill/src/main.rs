use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	// A missing `.env` is fine; real environment variables still apply.
	let _ = dotenvy::dotenv();
	let args = still_distill::Args::parse();

	still_distill::run(args).await
}
