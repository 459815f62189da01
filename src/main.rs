use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod extraction;
mod mcp;
mod tools;
mod utils;

use extraction::analyzer::JobNoticeAnalyzer;
use extraction::dates::DeadlineWindow;
use extraction::organization::OrganizationDirectory;
use mcp::server::{McpServer, ServerConfig};
use utils::mistral::{MistralConfig, MistralService};

/// Prints a formatted box with the given lines
/// Empty strings create empty lines, other strings are centered within the box
fn print_box(lines: &[&str]) {
    const BOX_WIDTH: usize = 60;
    const CONTENT_WIDTH: usize = BOX_WIDTH - 4;

    eprintln!("\n\x1b[36m╔{}╗", "═".repeat(BOX_WIDTH - 2));

    for line in lines {
        if line.is_empty() {
            eprintln!("║{}║", " ".repeat(BOX_WIDTH - 2));
            continue;
        }

        let visible_len = strip_ansi_codes(line).chars().count();
        if visible_len < CONTENT_WIDTH {
            let total_padding = CONTENT_WIDTH - visible_len;
            let left_padding = total_padding / 2;
            let right_padding = total_padding - left_padding;

            eprintln!(
                "║  {}{}{}\x1b[36m║",
                " ".repeat(left_padding),
                line,
                " ".repeat(right_padding)
            );
        } else {
            eprintln!("║  {}\x1b[36m  ║", line);
        }
    }

    eprintln!("╚{}╝\x1b[0m\n", "═".repeat(BOX_WIDTH - 2));
}

/// Strips ANSI escape codes to calculate visible text length
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::new();
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.next() == Some('[') {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

fn cli() -> Command {
    Command::new("jobnotice-extract")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A Model Context Protocol server that extracts job postings from recruitment PDFs")
        .long_about(
            "This MCP server provides the following tools:\n\
            - analyze-job-notices: Extract postings from a batch of notice PDFs into an Excel workbook\n\
            - analyze-job-notice: Extract postings from a single notice PDF as JSON\n\
            - detect-last-date: Detect organization and application deadline without AI",
        )
        .arg(
            Arg::new("mistral-api-key")
                .long("mistral-api-key")
                .value_name("KEY")
                .help("Mistral API key (falls back to MISTRAL_API_KEY)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("MODEL")
                .help("Mistral chat model (falls back to MISTRAL_MODEL)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .value_name("DIR")
                .help("Directory for generated workbooks (falls back to JOBNOTICE_OUTPUT_DIR, then the temp dir)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Suppress the banner and log only errors (for MCP clients)")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Flag value, else the environment variable.
fn flag_or_env(matches: &ArgMatches, flag: &str, var: &str) -> Option<String> {
    matches
        .get_one::<String>(flag)
        .cloned()
        .or_else(|| env::var(var).ok())
}

fn init_tracing(quiet: bool) {
    // stdout is reserved for JSON-RPC
    let default_level = if quiet { "error" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_analyzer(
    config: Option<MistralConfig>,
    directory: &Arc<OrganizationDirectory>,
    window: &DeadlineWindow,
) -> anyhow::Result<Option<Arc<JobNoticeAnalyzer>>> {
    let Some(config) = config else {
        warn!("Mistral API key not found - AI extraction tools will be disabled");
        return Ok(None);
    };

    let service = MistralService::new(config).context("Failed to build Mistral client")?;
    info!(model = service.model(), "AI extraction tools enabled");
    Ok(Some(Arc::new(JobNoticeAnalyzer::new(
        Arc::new(service),
        directory.clone(),
        window.clone(),
    ))))
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    let quiet = matches.get_flag("quiet");
    init_tracing(quiet);

    let mistral_config = flag_or_env(&matches, "mistral-api-key", "MISTRAL_API_KEY").and_then(|raw| {
        MistralConfig::from_raw_key(&raw, flag_or_env(&matches, "model", "MISTRAL_MODEL"))
    });
    let output_dir = flag_or_env(&matches, "output-dir", "JOBNOTICE_OUTPUT_DIR")
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir);
    info!(output_dir = %output_dir.display(), "Workbooks will be written here");

    let directory = Arc::new(OrganizationDirectory::default());
    let window = DeadlineWindow::default();

    let analyzer = match build_analyzer(mistral_config, &directory, &window) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    };

    if !quiet {
        print_box(&[
            "",
            "\x1b[1m\x1b[31m Job Notice Extraction Server \x1b[0m",
            "",
            "\x1b[0m Recruitment PDFs to structured postings over MCP \x1b[0m",
            "",
        ]);
    }

    info!("Starting MCP server...");

    let mut server = McpServer::new(ServerConfig {
        analyzer,
        directory,
        window,
        output_dir,
    });
    if let Err(e) = server.start().await {
        error!("Failed to start server: {}", e);
        process::exit(1);
    }
}
