//! One-time-password commands
//!
//! These only proxy to the backend; they never change the local session.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use dialoguer::{Password, theme::ColorfulTheme};
use easel_core::OtpReply;

use super::open_store;
use crate::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct OtpArgs {
    #[command(subcommand)]
    pub command: OtpCommands,
}

#[derive(Subcommand, Debug)]
pub enum OtpCommands {
    /// Send a code to an email address
    Request {
        #[arg(long)]
        email: String,
    },
    /// Check a code
    Verify {
        #[arg(long)]
        email: String,

        #[arg(long)]
        otp: String,
    },
    /// Set a new password using a code
    Reset {
        #[arg(long)]
        email: String,

        #[arg(long)]
        otp: String,

        /// Prompted for (with confirmation) when omitted
        #[arg(long)]
        new_password: Option<String>,
    },
}

pub async fn run(args: OtpArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    if !config.session.otp.enabled {
        bail!("OTP is disabled; set session.otp.enabled = true in config.toml");
    }
    let store = open_store(&config)?;

    match args.command {
        OtpCommands::Request { email } => {
            let reply = store.request_otp(&email).await?;
            print_reply(&reply, &format!("Code sent to {email}"));
        }
        OtpCommands::Verify { email, otp } => {
            let reply = store.verify_otp(&email, &otp).await?;
            print_reply(&reply, "Code verified");
        }
        OtpCommands::Reset {
            email,
            otp,
            new_password,
        } => {
            let new_password = match new_password {
                Some(password) => password,
                None => Password::with_theme(&ColorfulTheme::default())
                    .with_prompt("New password")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()?,
            };
            let reply = store.reset_password(&email, &otp, &new_password).await?;
            print_reply(&reply, "Password updated");
        }
    }
    Ok(())
}

fn print_reply(reply: &OtpReply, fallback: &str) {
    println!("{}", reply.message.as_deref().unwrap_or(fallback));
}
