use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use still_domain::extraction;
use still_service::{ConversationSelector, RunReport, StillService};
use still_storage::{db::Db, models::Conversation};

#[derive(Debug, Parser)]
#[command(
	version = still_cli::VERSION,
	rename_all = "kebab",
	styles = still_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Distill the most recent days of one conversation.
	Run(RunArgs),
	/// List conversations ranked by message count.
	Chats,
	/// Create missing tables and indexes.
	Migrate,
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
	/// Conversation id to distill.
	#[arg(long, value_name = "ID", conflicts_with = "rank")]
	pub chat: Option<String>,
	/// Position in the `chats` listing, starting at 0.
	#[arg(long, value_name = "N")]
	pub rank: Option<usize>,
	/// Number of whole days to distill, one window per day.
	#[arg(long, value_name = "N")]
	pub days: Option<u32>,
}
impl RunArgs {
	pub fn selector(&self) -> ConversationSelector {
		match &self.chat {
			Some(chat_id) => ConversationSelector::ChatId(chat_id.clone()),
			None => ConversationSelector::Rank(self.rank.unwrap_or(0)),
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = still_config::load(&args.config)?;

	init_tracing(&config)?;
	init_metrics(&config)?;

	let db = Db::connect(&config.storage.postgres).await?;

	match args.command {
		Command::Migrate => {
			db.ensure_schema().await?;

			tracing::info!("Schema is up to date.");
		},
		Command::Chats => {
			let svc = StillService::new(config, db);

			for (rank, conversation) in svc.list_conversations().await?.iter().enumerate() {
				println!("{}", conversation_line(rank, conversation));
			}
		},
		Command::Run(run_args) => {
			db.ensure_schema().await?;

			let day_count = run_args.days.unwrap_or(config.pipeline.default_day_count);
			let svc = StillService::new(config, db);
			let total = svc.count_messages().await?;

			tracing::info!(count = total, "Counted non-empty chat messages.");

			let report = svc.run(&run_args.selector(), day_count).await?;

			print_report(&report);
		},
	}

	Ok(())
}

pub fn conversation_line(rank: usize, conversation: &Conversation) -> String {
	let name = conversation.chat_name.as_deref().unwrap_or("unknown");
	let chat_type = conversation.chat_type.as_deref().unwrap_or("unknown");

	format!(
		"[{rank}] {} ({name}, {chat_type}) - {} msgs",
		conversation.in_chat_id, conversation.message_count
	)
}

fn print_report(report: &RunReport) {
	for distilled in report.succeeded() {
		for item in &distilled.items {
			println!("[{}] {}", distilled.window.offset, extraction::format_record(item));
		}
	}

	for (window, failure) in report.failed() {
		eprintln!("[{}] failed: {failure}", window.offset);
	}
}

fn init_metrics(config: &still_config::Config) -> color_eyre::Result<()> {
	let Some(addr) = config.service.metrics_addr.as_deref() else {
		return Ok(());
	};
	let addr: SocketAddr = addr.parse()?;

	PrometheusBuilder::new().with_http_listener(addr).install()?;

	tracing::info!(%addr, "Serving Prometheus metrics.");

	Ok(())
}

fn init_tracing(config: &still_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}
