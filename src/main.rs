//! newsdeck - a keyboard-friendly terminal client for a sentiment-tagged
//! news service: browse, like, and save articles from your terminal.

mod api;
mod app;
mod auth;
mod config;
mod models;
mod utils;

use std::io;
use std::process::ExitCode;

use anyhow::{bail, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use models::{NewsQuery, ProfileUpdate, SortField};

/// Initialize the tracing subscriber for logging.
/// Use the RUST_LOG env var to control the log level (e.g. RUST_LOG=debug).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn usage() {
    eprintln!(
        "newsdeck - terminal client for the news service

USAGE:
    newsdeck <command> [options]

ACCOUNT:
    login [email]           Log in (prompts for the password)
    register                Create an account
    logout                  Log out and forget stored tokens
    whoami                  Show the logged-in user and preferences
    prefs [--categories a,b] [--notifications on|off]
                            Show or update preferences
    forgot-password [email] Request a password reset email
    reset-password <token>  Set a new password with a reset token

NEWS:
    news [--category C] [--sentiment S] [--search TEXT]
         [--from YYYY-MM-DD] [--to YYYY-MM-DD]
         [--page N] [--page-size N] [--sort published|views|likes]
                            List articles
    article <id>            Show one article
    like <id>               Toggle a like
    save <id>               Toggle a save
    saved [--page N]        List your saved articles
    categories              List available categories

ANALYZER:
    analyze <text>          Run the sentiment analyzer over text
"
    );
}

/// Take an optional leading positional argument, rejecting anything that
/// looks like an unrecognized option
fn take_positional(args: &mut Vec<String>) -> Result<Option<String>> {
    match args.first() {
        Some(first) if first.starts_with("--") => bail!("Unknown option: {}", first),
        Some(_) => Ok(Some(args.remove(0))),
        None => Ok(None),
    }
}

/// Fail on leftover arguments the command did not consume
fn ensure_consumed(args: &[String]) -> Result<()> {
    if let Some(extra) = args.first() {
        bail!("Unexpected argument: {}", extra);
    }
    Ok(())
}

/// Pull the value of a `--flag value` pair out of the argument list
fn take_flag(args: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    if let Some(pos) = args.iter().position(|a| a == flag) {
        if pos + 1 >= args.len() {
            bail!("{} requires a value", flag);
        }
        let value = args.remove(pos + 1);
        args.remove(pos);
        Ok(Some(value))
    } else {
        Ok(None)
    }
}

fn parse_news_query(args: &mut Vec<String>) -> Result<NewsQuery> {
    let mut query = NewsQuery {
        category: take_flag(args, "--category")?,
        sentiment: take_flag(args, "--sentiment")?,
        search: take_flag(args, "--search")?,
        date_from: take_flag(args, "--from")?,
        date_to: take_flag(args, "--to")?,
        ..Default::default()
    };
    if let Some(page) = take_flag(args, "--page")? {
        query.page = Some(page.parse().map_err(|_| anyhow::anyhow!("--page must be a number"))?);
    }
    if let Some(size) = take_flag(args, "--page-size")? {
        query.page_size =
            Some(size.parse().map_err(|_| anyhow::anyhow!("--page-size must be a number"))?);
    }
    if let Some(sort) = take_flag(args, "--sort")? {
        query.sort_by = match SortField::parse(&sort) {
            Some(field) => Some(field),
            None => bail!("Unknown sort field: {} (use published, views, or likes)", sort),
        };
    }
    Ok(query)
}

fn parse_prefs_update(args: &mut Vec<String>) -> Result<ProfileUpdate> {
    let mut update = ProfileUpdate::default();
    if let Some(categories) = take_flag(args, "--categories")? {
        update.favorite_categories = Some(
            categories
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        );
    }
    if let Some(notifications) = take_flag(args, "--notifications")? {
        update.notification_enabled = match notifications.as_str() {
            "on" | "true" => Some(true),
            "off" | "false" => Some(false),
            other => bail!("--notifications must be on or off, got {}", other),
        };
    }
    Ok(update)
}

async fn run(command: &str, mut args: Vec<String>) -> Result<()> {
    let mut app = App::new()?;
    app.bootstrap().await;

    match command {
        "login" => {
            let email = take_positional(&mut args)?;
            ensure_consumed(&args)?;
            app.login(email).await
        }
        "register" => {
            ensure_consumed(&args)?;
            app.register().await
        }
        "logout" => {
            ensure_consumed(&args)?;
            app.logout();
            Ok(())
        }
        "whoami" => {
            ensure_consumed(&args)?;
            app.whoami().await
        }
        "prefs" => {
            let update = parse_prefs_update(&mut args)?;
            ensure_consumed(&args)?;
            app.prefs(update).await
        }
        "forgot-password" => {
            let email = take_positional(&mut args)?;
            ensure_consumed(&args)?;
            app.forgot_password(email).await
        }
        "reset-password" => match take_positional(&mut args)? {
            Some(token) => {
                ensure_consumed(&args)?;
                app.reset_password(&token).await
            }
            None => bail!("reset-password requires the token from the reset email"),
        },
        "news" => {
            let query = parse_news_query(&mut args)?;
            ensure_consumed(&args)?;
            app.news(query).await
        }
        "article" => match take_positional(&mut args)? {
            Some(id) => {
                ensure_consumed(&args)?;
                app.article(&id).await
            }
            None => bail!("article requires an article id"),
        },
        "like" => match take_positional(&mut args)? {
            Some(id) => {
                ensure_consumed(&args)?;
                app.like(&id).await
            }
            None => bail!("like requires an article id"),
        },
        "save" => match take_positional(&mut args)? {
            Some(id) => {
                ensure_consumed(&args)?;
                app.save(&id).await
            }
            None => bail!("save requires an article id"),
        },
        "saved" => {
            let page = match take_flag(&mut args, "--page")? {
                Some(page) => page.parse().map_err(|_| anyhow::anyhow!("--page must be a number"))?,
                None => 1,
            };
            ensure_consumed(&args)?;
            app.saved(page).await
        }
        "categories" => {
            ensure_consumed(&args)?;
            app.categories().await
        }
        "analyze" => {
            if args.is_empty() {
                bail!("analyze requires text to analyze");
            }
            app.analyze(&args.join(" ")).await
        }
        other => bail!("Unknown command: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_take_positional_rejects_stray_options() {
        let mut args = args_of(&["--foo"]);
        let err = take_positional(&mut args).unwrap_err();
        assert!(err.to_string().contains("--foo"));
    }

    #[test]
    fn test_take_positional_consumes_leading_value() {
        let mut args = args_of(&["a@b.com"]);
        assert_eq!(take_positional(&mut args).unwrap().as_deref(), Some("a@b.com"));
        assert!(args.is_empty());
        assert!(take_positional(&mut args).unwrap().is_none());
    }

    #[test]
    fn test_ensure_consumed_flags_leftovers() {
        assert!(ensure_consumed(&[]).is_ok());
        let err = ensure_consumed(&args_of(&["extra"])).unwrap_err();
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn test_take_flag_extracts_pair() {
        let mut args = args_of(&["--category", "sports", "--page", "2"]);
        assert_eq!(
            take_flag(&mut args, "--category").unwrap().as_deref(),
            Some("sports")
        );
        assert_eq!(args, args_of(&["--page", "2"]));
        assert!(take_flag(&mut args, "--missing").unwrap().is_none());
        assert!(take_flag(&mut args_of(&["--page"]), "--page").is_err());
    }

    #[test]
    fn test_parse_news_query_rejects_bad_sort() {
        let mut args = args_of(&["--sort", "bogus"]);
        assert!(parse_news_query(&mut args).is_err());
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        usage();
        return ExitCode::FAILURE;
    }

    let command = args.remove(0);
    match run(&command, args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
