//! Session commands: status, login, student-login, logout, update, watch

use anyhow::{Result, bail};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use dialoguer::{Input, Password, theme::ColorfulTheme};
use easel_core::{Credentials, Session, SessionStore, StudentSignIn};
use serde_json::{Map, Value};

use super::open_store;
use crate::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the session as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Prompted for when omitted
    #[arg(long)]
    pub email: Option<String>,

    /// Prompted for when omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct StudentLoginArgs {
    #[arg(long)]
    pub email: String,

    /// Display name (defaults to the part of the email before '@')
    #[arg(long)]
    pub name: Option<String>,

    /// Extra profile field, `key=value`; values that parse as JSON are kept as JSON
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Fields to merge into the profile, `key=value`
    #[arg(required = true, value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

pub fn status(args: StatusArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = open_store(&config)?;
    let session = store.session();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    println!("{}", session_table(&store, &session));
    println!("Storage: {}", config.storage.resolved_dir().display());
    Ok(())
}

pub async fn login(args: LoginArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = open_store(&config)?;

    let theme = ColorfulTheme::default();
    let email = match args.email {
        Some(email) => email,
        None => Input::<String>::with_theme(&theme)
            .with_prompt("Email")
            .interact_text()?,
    };
    let password = match args.password {
        Some(password) => password,
        None => Password::with_theme(&theme)
            .with_prompt("Password")
            .interact()?,
    };

    let session = store.login(&Credentials::new(email, password)).await?;
    println!("Logged in as {}", describe(&session));
    Ok(())
}

pub fn student_login(args: StudentLoginArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = open_store(&config)?;

    let mut sign_in = StudentSignIn::new(args.email);
    if let Some(name) = args.name {
        sign_in = sign_in.with_name(name);
    }
    for field in &args.fields {
        let (key, value) = parse_field(field)?;
        sign_in = sign_in.with_field(key, value);
    }

    let session = store.student_login(sign_in)?;
    println!("Logged in as {}", describe(&session));
    Ok(())
}

pub fn logout() -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = open_store(&config)?;
    let was = store.session();

    store.logout();
    if was.authenticated() {
        println!("Logged out {}", describe(&was));
    } else {
        println!("No active session; cleared stored keys");
    }
    Ok(())
}

pub fn update(args: UpdateArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = open_store(&config)?;

    let mut fields = Map::new();
    for field in &args.fields {
        let (key, value) = parse_field(field)?;
        fields.insert(key, value);
    }

    let session = store.update_user(fields)?;
    println!("Updated {}", describe(&session));
    Ok(())
}

/// Follow session changes made by other processes until Ctrl-C
pub async fn watch() -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = open_store(&config)?;
    let mut rx = store.subscribe();
    let sync = store.spawn_sync()?;

    println!("{}  {}", timestamp(), describe(&rx.borrow_and_update()));
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = rx.borrow_and_update().clone();
                println!("{}  {}", timestamp(), describe(&session));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    sync.abort();
    Ok(())
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// One-line summary, e.g. `mia@academy.org (student, Mia)`
fn describe(session: &Session) -> String {
    match (session.identity(), session.kind()) {
        (Some(identity), Some(kind)) => match identity.name.as_deref() {
            Some(name) => format!("{} ({}, {})", identity.email, kind, name),
            None => format!("{} ({})", identity.email, kind),
        },
        _ => session.state().to_string(),
    }
}

fn session_table(store: &SessionStore, session: &Session) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
    ]);

    table.add_row(vec![Cell::new("State"), Cell::new(session.state())]);
    if let Some(identity) = session.identity() {
        let or_dash = |value: Option<&str>| value.unwrap_or("-").to_string();
        table.add_row(vec![Cell::new("Email"), Cell::new(&identity.email)]);
        table.add_row(vec![Cell::new("Name"), Cell::new(or_dash(identity.name.as_deref()))]);
        table.add_row(vec![Cell::new("ID"), Cell::new(or_dash(identity.id.as_deref()))]);
        table.add_row(vec![Cell::new("Role"), Cell::new(or_dash(identity.role.as_deref()))]);
        if let Some(login_time) = identity.login_time {
            table.add_row(vec![Cell::new("Logged in"), Cell::new(login_time.to_rfc3339())]);
        }
        for (key, value) in &identity.extra {
            table.add_row(vec![Cell::new(key), Cell::new(value)]);
        }
    }

    // The inactive slot may still hold a record (public site resolves student first)
    for &kind in store.config().profile.kinds() {
        if session.kind() == Some(kind) {
            continue;
        }
        if let Some(other) = store.stored_identity(kind) {
            table.add_row(vec![
                Cell::new(format!("Stored {kind}")).fg(Color::DarkGrey),
                Cell::new(other.email).fg(Color::DarkGrey),
            ]);
        }
    }
    table
}

/// Parse `key=value`; the value is JSON when it parses as JSON, else a string
fn parse_field(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty field name in '{raw}'");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
