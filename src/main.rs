//! Repomate - AI repository tools in your terminal.
//!
//! Ask questions about a GitHub codebase, generate its README, or summarize
//! it file by file.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repomate::app::greeting;
use repomate::workflow::{
    ArtifactSink, BranchPhase, DirectorySink, SystemClipboard, README_FILE, SUMMARY_DOCUMENT,
};
use repomate::{App, Config, Dispatch, SummaryWorkflow, WorkflowState};

/// AI tools for GitHub repositories
#[derive(Parser)]
#[command(name = "repomate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in to the account service
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Password (prompted when omitted)
        #[arg(long, env = "REPOMATE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account
    Signup {
        /// Username
        #[arg(short, long)]
        username: Option<String>,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,

        /// Password (prompted when omitted)
        #[arg(long, env = "REPOMATE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show who is signed in
    Whoami,

    /// Check the services and the local session
    Status,

    /// List a repository's branches
    Branches {
        /// GitHub repository URL
        url: String,
    },

    /// Ask a question about a codebase
    Ask {
        /// GitHub repository URL
        url: String,

        /// The question
        question: String,

        /// Branch to ask about (defaults to main, then master)
        #[arg(short, long)]
        branch: Option<String>,

        /// Copy the answer to the clipboard
        #[arg(short, long)]
        copy: bool,
    },

    /// Generate a README for a repository
    Readme {
        /// GitHub repository URL
        url: String,

        /// Directory to save README.md in
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Copy the README to the clipboard
        #[arg(short, long)]
        copy: bool,

        /// Print the README instead of saving it
        #[arg(short, long)]
        print: bool,
    },

    /// Summarize a repository file by file
    Summary {
        /// GitHub repository URL
        url: String,

        /// Also download the rendered PDF
        #[arg(long)]
        pdf: bool,

        /// Directory to save summary.pdf in
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Copy the summary to the clipboard
        #[arg(short, long)]
        copy: bool,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    match cli.command {
        Commands::Login { username, password } => cmd_login(username, password),
        Commands::Signup { username, email, password } => cmd_signup(username, email, password),
        Commands::Logout => cmd_logout(),
        Commands::Whoami => cmd_whoami(),
        Commands::Status => cmd_status(),
        Commands::Branches { url } => cmd_branches(&url),
        Commands::Ask { url, question, branch, copy } => {
            cmd_ask(&url, &question, branch.as_deref(), copy)
        }
        Commands::Readme { url, output, copy, print } => cmd_readme(&url, output, copy, print),
        Commands::Summary { url, pdf, output, copy } => cmd_summary(&url, pdf, output, copy),
        Commands::Config { path } => cmd_config(path),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Read a line from stdin after printing a prompt.
fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label),
    }
}

/// Open the app, failing early when nobody is signed in.
fn signed_in_app() -> Result<App> {
    let app = App::new()?;
    if !app.session().is_authenticated() {
        bail!("Not signed in. Run `repomate login` first.");
    }
    Ok(app)
}

fn output_sink(app: &App, output: Option<PathBuf>) -> DirectorySink {
    output.map_or_else(|| app.download_sink(), DirectorySink::new)
}

fn cmd_login(username: Option<String>, password: Option<String>) -> Result<()> {
    let username = value_or_prompt(username, "Username")?;
    let password = value_or_prompt(password, "Password")?;

    let app = App::new()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        app.login(&username, &password).await?;
        let name = app.enter_hub().await?;
        println!("{}", greeting(&name));
        Ok(())
    })
}

fn cmd_signup(
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let username = value_or_prompt(username, "Username")?;
    let email = value_or_prompt(email, "Email")?;
    let password = value_or_prompt(password, "Password")?;

    let app = App::new()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app.signup(&username, &email, &password))?;

    println!("Account created. Run `repomate login` to sign in.");
    Ok(())
}

fn cmd_logout() -> Result<()> {
    let app = App::new()?;
    app.logout();
    println!("Signed out.");
    Ok(())
}

fn cmd_whoami() -> Result<()> {
    let app = signed_in_app()?;
    let rt = tokio::runtime::Runtime::new()?;
    let name = rt.block_on(app.enter_hub())?;
    println!("{}", greeting(&name));
    Ok(())
}

fn cmd_status() -> Result<()> {
    let app = App::new()?;
    let rt = tokio::runtime::Runtime::new()?;
    let health = rt.block_on(app.health());

    let endpoints = &app.config().endpoints;
    let describe = |result: &Result<(), String>| match result {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("unreachable ({e})"),
    };
    println!("Account service:  {} {}", endpoints.auth_url, describe(&health.auth));
    println!("Analysis service: {} {}", endpoints.api_url, describe(&health.api));
    println!(
        "Session:          {}",
        if app.session().is_authenticated() { "signed in" } else { "signed out" }
    );

    if !health.is_healthy() {
        bail!("One or more services are unreachable");
    }
    Ok(())
}

fn cmd_branches(url: &str) -> Result<()> {
    let app = signed_in_app()?;
    let rt = tokio::runtime::Runtime::new()?;
    let selection = rt.block_on(app.list_branches(url))?;

    for branch in &selection.branches {
        let marker = if branch.name == selection.default.name { "*" } else { " " };
        println!("{marker} {branch}");
    }
    Ok(())
}

fn cmd_ask(url: &str, question: &str, branch: Option<&str>, copy: bool) -> Result<()> {
    let app = signed_in_app()?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let qa = app.open_qa()?;
        qa.set_repo_url(url);
        qa.refresh_branches().await?;
        if qa.wait_for_branches().await != BranchPhase::Ready {
            bail!("Could not load branches for {url}");
        }

        if let Some(branch) = branch {
            qa.select_branch(branch)?;
        }
        qa.set_question(question);

        let dispatch = qa.generate().await?;
        if dispatch != Dispatch::Completed {
            bail!("The question was not answered ({dispatch:?})");
        }

        let snapshot = qa.snapshot();
        let answer = snapshot.artifact_text().context("No answer returned")?;
        if let Some(selected) = &snapshot.fields.selected_branch {
            tracing::debug!(branch = %selected, "Answered");
        }
        println!("{answer}");

        if copy {
            qa.copy(&SystemClipboard)?;
            eprintln!("Answer copied to clipboard!");
        }
        Ok(())
    })
}

fn cmd_readme(url: &str, output: Option<PathBuf>, copy: bool, print: bool) -> Result<()> {
    let app = signed_in_app()?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let readme = app.open_readme()?;
        readme.set_repo_url(url);
        eprintln!("Generating README for {url}...");
        readme.generate().await?;

        let snapshot = readme.snapshot();
        if snapshot.state != WorkflowState::Complete {
            bail!("README generation did not complete");
        }

        if print {
            println!("{}", snapshot.artifact_text().unwrap_or_default());
        } else {
            let sink = output_sink(&app, output);
            readme.download(&sink)?;
            eprintln!("Saved {}", sink.dir().join(README_FILE).display());
        }

        if copy {
            readme.copy(&SystemClipboard)?;
            eprintln!("README copied to clipboard!");
        }
        Ok(())
    })
}

fn cmd_summary(url: &str, pdf: bool, output: Option<PathBuf>, copy: bool) -> Result<()> {
    let app = signed_in_app()?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let summary = app.open_summary()?;
        summary.set_repo_url(url);
        eprintln!("Summarizing {url}...");
        summary.generate().await?;

        let snapshot = summary.snapshot();
        println!("{}", snapshot.artifact_text().unwrap_or_default());

        if copy {
            summary.copy(&SystemClipboard)?;
            eprintln!("Summary copied to clipboard!");
        }

        if pdf {
            let sink = output_sink(&app, output);
            save_document(&summary, &sink).await?;
            eprintln!("Saved {}", sink.dir().join(SUMMARY_DOCUMENT).display());
        }
        Ok(())
    })
}

async fn save_document(summary: &SummaryWorkflow, sink: &dyn ArtifactSink) -> Result<()> {
    match summary.download_document(sink).await? {
        Dispatch::Completed => Ok(()),
        other => bail!("The PDF summary was not saved ({other:?})"),
    }
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "repomate", &mut io::stdout());
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_path() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = Config::load()?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}
