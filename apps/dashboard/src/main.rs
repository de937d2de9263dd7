use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use board::{render::PageOptions, LabelStyle};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use jenkins_client::{build_dashboard, DashboardOptions, Environment, JenkinsClient};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(name = "dashboard", about = "Render the FreeBSD CI status page")]
struct Cli {
    #[arg(long, global = true, default_value = "dashboard.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the job list and write the status page.
    Render(RenderArgs),
}

#[derive(Args, Debug, Default)]
struct RenderArgs {
    /// Destination file, `-` for stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    environment: Option<Environment>,
    /// `--lookup-failing-since` alone turns it on, `=false` turns it off.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    lookup_failing_since: Option<bool>,
    #[arg(long)]
    label_style: Option<LabelStyle>,
    #[arg(long)]
    title: Option<String>,
}

impl RenderArgs {
    fn apply(self, settings: &mut Settings) {
        if let Some(environment) = self.environment {
            settings.environment = environment;
        }
        if let Some(base_url) = self.base_url {
            settings.base_url = Some(base_url);
        }
        if let Some(style) = self.label_style {
            settings.label_style = style;
        }
        if let Some(title) = self.title {
            settings.title = title;
        }
        if let Some(output) = self.output {
            settings.output = output;
        }
        if let Some(lookup) = self.lookup_failing_since {
            settings.lookup_failing_since = lookup;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config)?;
    match cli.command {
        Command::Render(args) => {
            args.apply(&mut settings);
            render(&settings).await
        }
    }
}

fn client_for(settings: &Settings) -> anyhow::Result<JenkinsClient> {
    let client = JenkinsClient::new(settings.base_url())
        .with_context(|| format!("cannot use CI server '{}'", settings.base_url()))?
        .with_jobs_path(settings.jobs_path());
    Ok(match &settings.username {
        Some(username) => client.with_basic_auth(
            username.clone(),
            settings.password.clone().unwrap_or_default(),
        ),
        None => client,
    })
}

fn page_options(settings: &Settings) -> PageOptions {
    PageOptions {
        title: settings.title.clone(),
        preview_of: settings
            .environment
            .is_preview()
            .then(|| settings.environment.to_string()),
        updated_at: Utc::now(),
    }
}

async fn render(settings: &Settings) -> anyhow::Result<()> {
    let client = client_for(settings)?;
    info!(
        environment = %settings.environment,
        base_url = client.base_url(),
        "building dashboard"
    );

    let options = DashboardOptions {
        label_style: settings.label_style,
        lookup_failing_since: settings.lookup_failing_since,
    };
    let dashboard = build_dashboard(&client, &options)
        .await
        .with_context(|| format!("failed to build dashboard from {}", client.base_url()))?;
    if dashboard.board.is_empty() {
        info!("no FreeBSD jobs in the CI view");
    }

    let page = dashboard.render(&page_options(settings));
    write_page(&settings.output, &page)
}

fn write_page(output: &Path, page: &str) -> anyhow::Result<()> {
    if output == Path::new("-") {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(page.as_bytes())
            .context("failed to write page to stdout")?;
        return stdout.flush().context("failed to flush stdout");
    }

    fs::write(output, page)
        .with_context(|| format!("failed to write page to '{}'", output.display()))?;
    info!(path = %output.display(), bytes = page.len(), "wrote dashboard");
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
