use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "easel", about = "Inspect and drive the academy session store")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current session
    Status(commands::session::StatusArgs),
    /// Log in as an administrator
    Login(commands::session::LoginArgs),
    /// Log in as a student
    StudentLogin(commands::session::StudentLoginArgs),
    /// Log out of every role
    Logout,
    /// Merge fields into the logged-in profile
    Update(commands::session::UpdateArgs),
    /// Follow session changes made by other processes
    Watch,
    /// Email one-time passwords and password reset
    Otp(commands::otp::OtpArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Status(args) => commands::session::status(args),
        Commands::Login(args) => commands::session::login(args).await,
        Commands::StudentLogin(args) => commands::session::student_login(args),
        Commands::Logout => commands::session::logout(),
        Commands::Update(args) => commands::session::update(args),
        Commands::Watch => commands::session::watch().await,
        Commands::Otp(args) => commands::otp::run(args).await,
        Commands::Config(args) => commands::config::run(args),
    }
}
