use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};

use nitpick_core::{NitpickConfig, OutputFormat, PullRequest};
use nitpick_review::github::GitHubClient;
use nitpick_review::llm::LlmClient;
use nitpick_review::pipeline::ReviewPipeline;

#[derive(Parser)]
#[command(
    name = "nitpick",
    version,
    about = "AI pull-request review commenter",
    long_about = "Nitpick fetches a pull request's diff, asks a language model for structured\n\
                  review comments, refines and deduplicates them against the existing thread,\n\
                  and posts each one back to the PR.\n\n\
                  Examples:\n  \
                    nitpick review --pr owner/repo#123            Review and post comments\n  \
                    nitpick review --pr owner/repo#123 --dry-run  Show what would be posted\n  \
                    nitpick init                                  Create a default .nitpick.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .nitpick.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose stage progress on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the review pipeline against a GitHub pull request
    #[command(long_about = "Run the review pipeline against a GitHub pull request.\n\n\
        Stages: fetch diff, analyze, refine, fetch existing comments, deduplicate, post.\n\
        Requires GITHUB_TOKEN and (for hosted providers) OPENAI_API_KEY.\n\n\
        Examples:\n  nitpick review --pr owner/repo#123\n  \
        nitpick review --pr owner/repo#123 --dry-run --format markdown")]
    Review {
        /// Pull request to review (format: owner/repo#123)
        #[arg(long)]
        pr: String,

        /// Run every stage except posting; print the final batch instead
        #[arg(long)]
        dry_run: bool,

        /// Skip the review-and-refine model pass
        #[arg(long)]
        no_refine: bool,

        /// Skip deduplication against existing PR comments
        #[arg(long)]
        no_dedupe: bool,

        /// Abort the batch on the first failed post instead of continuing
        #[arg(long)]
        abort_on_publish_error: bool,

        /// Drop comments that reference files absent from the diff
        #[arg(long)]
        restrict_to_diff: bool,

        /// Output format for the run report
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Create a default .nitpick.toml in the current directory
    Init,
}

const DEFAULT_CONFIG: &str = r#"# nitpick configuration

[llm]
# provider = "openai"
# model = "gpt-4o-mini"
# base_url = "http://localhost:11434"   # any OpenAI-compatible endpoint
# api_key is read from OPENAI_API_KEY when unset here
# temperature = 0.0
# max_retries = 2

[github]
# token is read from GITHUB_TOKEN when unset here

[pipeline]
# refine = true
# dedupe = true
# continue_on_publish_error = true
# restrict_to_diff = false
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NitpickConfig::from_file(path)?,
        None => {
            let default_path = std::path::Path::new(".nitpick.toml");
            if default_path.exists() {
                NitpickConfig::from_file(default_path)?
            } else {
                NitpickConfig::default()
            }
        }
    };

    match cli.command {
        Command::Init => {
            let path = std::path::Path::new(".nitpick.toml");
            if path.exists() {
                miette::bail!(".nitpick.toml already exists, refusing to overwrite");
            }
            std::fs::write(path, DEFAULT_CONFIG)
                .into_diagnostic()
                .wrap_err("failed to write .nitpick.toml")?;
            println!("Created .nitpick.toml");
        }
        Command::Review {
            pr,
            dry_run,
            no_refine,
            no_dedupe,
            abort_on_publish_error,
            restrict_to_diff,
            format,
        } => {
            // Identity and credential checks happen before any network call.
            let target: PullRequest = pr.parse()?;

            let mut llm_config = config.llm.clone();
            if llm_config.api_key.is_none() {
                llm_config.api_key = std::env::var("OPENAI_API_KEY").ok();
            }
            if llm_config.api_key.is_none() && llm_config.provider == "openai" {
                miette::bail!(miette::miette!(
                    help = "Set OPENAI_API_KEY, or set [llm].api_key / base_url in .nitpick.toml",
                    "No model API key configured"
                ));
            }

            let mut pipeline_config = config.pipeline.clone();
            if no_refine {
                pipeline_config.refine = false;
            }
            if no_dedupe {
                pipeline_config.dedupe = false;
            }
            if abort_on_publish_error {
                pipeline_config.continue_on_publish_error = false;
            }
            if restrict_to_diff {
                pipeline_config.restrict_to_diff = true;
            }

            let github = GitHubClient::new(config.github.token.as_deref())?;
            let llm = LlmClient::new(&llm_config)?;

            let pipeline = ReviewPipeline::new(github, llm, pipeline_config)
                .dry_run(dry_run)
                .verbose(cli.verbose);

            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_style(
                indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                    .expect("valid template"),
            );
            pb.set_message(format!("reviewing {target}"));
            pb.enable_steady_tick(std::time::Duration::from_millis(100));

            let result = pipeline.run(&target).await;
            pb.finish_and_clear();
            let report = result.wrap_err(format!("review of {target} failed"))?;

            match format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&report).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => print!("{}", report.to_markdown()),
                OutputFormat::Text => print!("{report}"),
            }
        }
    }

    Ok(())
}
