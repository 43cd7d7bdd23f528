//! Command layer for newsdeck.
//!
//! `App` wires the configuration, the token store, and the session manager
//! together and implements each CLI command on top of them. The session
//! manager is owned here and handed to the commands that need it - there
//! is no ambient/global session state.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::api::ApiClient;
use crate::auth::{SessionManager, SessionState, TokenStore};
use crate::config::Config;
use crate::models::{NewsArticle, NewsQuery, ProfileUpdate};
use crate::utils::{format_optional, truncate_string};

/// Width of the title column in listing output
const TITLE_COLUMN_WIDTH: usize = 56;

/// Page size used when the user does not ask for one
const DEFAULT_PAGE_SIZE: u32 = 20;

pub struct App {
    config: Config,
    session: SessionManager,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        let api = ApiClient::new(config.base_url())?;
        let store = TokenStore::new(config.data_dir()?);
        Ok(Self {
            config,
            session: SessionManager::new(api, store),
        })
    }

    /// Restore any stored session before running a command.
    /// A rejected stored credential is reported once, not treated as fatal:
    /// the command then runs anonymously or asks the user to log in.
    pub async fn bootstrap(&mut self) {
        if let Err(err) = self.session.bootstrap().await {
            eprintln!("Stored session was rejected ({}); please log in again.", err);
        }
    }

    fn require_auth(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not logged in. Run `newsdeck login` first.");
        }
        Ok(())
    }

    // ===== Account commands =====

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        if self.session.is_authenticated() {
            let who = self.session.identity().map(|i| i.username.clone());
            println!(
                "Already logged in as {}. Run `newsdeck logout` first to switch accounts.",
                who.unwrap_or_default()
            );
            return Ok(());
        }

        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt_line("Email: ")?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        match self.session.login(&email, &password).await {
            Ok(()) => {
                self.config.last_email = Some(email);
                if let Err(err) = self.config.save() {
                    debug!(error = %err, "Failed to save config");
                }
                let username = self
                    .session
                    .identity()
                    .map(|i| i.username.clone())
                    .unwrap_or_default();
                println!("Logged in as {}.", username);
                Ok(())
            }
            Err(err) => bail!("{}", err),
        }
    }

    pub async fn register(&mut self) -> Result<()> {
        let username = prompt_line("Username: ")?;
        let email = prompt_line("Email: ")?;
        let password = rpassword::prompt_password("Password: ")?;
        let password2 = rpassword::prompt_password("Confirm password: ")?;

        match self
            .session
            .register(&username, &email, &password, &password2)
            .await
        {
            Ok(()) => {
                self.config.last_email = Some(email);
                if let Err(err) = self.config.save() {
                    debug!(error = %err, "Failed to save config");
                }
                println!("Account created. You are now logged in as {}.", username);
                Ok(())
            }
            Err(err) => bail!("{}", err),
        }
    }

    pub fn logout(&mut self) {
        self.session.logout();
        println!("Logged out.");
    }

    pub async fn whoami(&self) -> Result<()> {
        self.require_auth()?;
        let identity = self
            .session
            .identity()
            .context("Authenticated session has no identity")?;
        println!("Username: {}", identity.username);
        println!("Email:    {}", format_optional(&identity.email, "-"));
        if let Some(profile) = self.session.profile() {
            let categories = if profile.favorite_categories.is_empty() {
                "(none)".to_string()
            } else {
                profile.favorite_categories.join(", ")
            };
            println!("Favorite categories: {}", categories);
            println!(
                "Notifications: {}",
                if profile.notification_enabled { "on" } else { "off" }
            );
        }
        Ok(())
    }

    pub async fn prefs(&mut self, update: ProfileUpdate) -> Result<()> {
        self.require_auth()?;
        if update.is_empty() {
            return self.whoami().await;
        }
        let profile = self.session.api().update_profile(&update).await?;
        self.session.set_profile(profile);
        println!("Preferences updated.");
        self.whoami().await
    }

    pub async fn forgot_password(&self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt_line("Email: ")?,
        };
        self.session.api().request_password_reset(&email).await?;
        println!("If an account exists for {}, a reset email is on its way.", email);
        Ok(())
    }

    pub async fn reset_password(&self, token: &str) -> Result<()> {
        let password = rpassword::prompt_password("New password: ")?;
        self.session
            .api()
            .confirm_password_reset(token, &password)
            .await?;
        println!("Password updated. Log in with your new password.");
        Ok(())
    }

    // ===== News commands =====

    pub async fn news(&self, mut query: NewsQuery) -> Result<()> {
        if query.page_size.is_none() {
            query.page_size = Some(DEFAULT_PAGE_SIZE);
        }
        let page = self.session.api().fetch_news(&query).await?;
        if page.results.is_empty() {
            println!("No articles matched.");
            return Ok(());
        }
        print_article_table(&page.results, self.session.state());
        if let Some(p) = page.pagination {
            println!(
                "Page {}/{} ({} articles total)",
                p.page, p.total_pages, p.total_count
            );
        }
        Ok(())
    }

    pub async fn article(&self, article_id: &str) -> Result<()> {
        let article = self.session.api().fetch_article(article_id).await?;
        println!("{}", article.title_display());
        println!("Source:    {}", format_optional(&article.source, "-"));
        println!("Category:  {}", format_optional(&article.category, "-"));
        println!("Sentiment: {}", article.sentiment_display());
        println!("Published: {}", article.published_display());
        println!(
            "Views: {}   Likes: {}   Saves: {}",
            article.view_count, article.like_count, article.save_count
        );
        if self.session.is_authenticated() {
            println!(
                "You {}liked and {}saved this article.",
                if article.is_liked { "" } else { "have not " },
                if article.is_saved { "" } else { "have not " }
            );
        }
        if let Some(ref description) = article.description {
            println!("\n{}", description);
        }
        if let Some(ref url) = article.url {
            println!("\n{}", url);
        }
        Ok(())
    }

    pub async fn like(&self, article_id: &str) -> Result<()> {
        self.require_auth()?;
        let liked = self.session.api().toggle_like(article_id).await?;
        println!("{}", if liked { "Liked." } else { "Like removed." });
        Ok(())
    }

    pub async fn save(&self, article_id: &str) -> Result<()> {
        self.require_auth()?;
        let saved = self.session.api().toggle_save(article_id).await?;
        println!("{}", if saved { "Saved." } else { "Removed from saved." });
        Ok(())
    }

    pub async fn saved(&self, page: u32) -> Result<()> {
        self.require_auth()?;
        let articles = self
            .session
            .api()
            .fetch_saved(page, DEFAULT_PAGE_SIZE)
            .await?;
        if articles.is_empty() {
            println!("No saved articles.");
            return Ok(());
        }
        print_article_table(&articles, self.session.state());
        Ok(())
    }

    pub async fn categories(&self) -> Result<()> {
        let categories = self.session.api().fetch_categories().await?;
        for category in categories {
            println!("{:<16} {}", category.value, category.label);
        }
        Ok(())
    }

    // ===== Analyzer =====

    pub async fn analyze(&self, text: &str) -> Result<()> {
        let verdict = self.session.api().analyze(text).await?;
        println!("{}", verdict);
        Ok(())
    }
}

fn print_article_table(articles: &[NewsArticle], state: SessionState) {
    let show_flags = state == SessionState::Authenticated;
    for article in articles {
        let flags = if show_flags {
            format!(
                " {}{}",
                if article.is_liked { "♥" } else { " " },
                if article.is_saved { "*" } else { " " }
            )
        } else {
            String::new()
        };
        println!(
            "{:<26}{}  {:<width$}  {:<10} {}",
            article.id,
            flags,
            truncate_string(article.title_display(), TITLE_COLUMN_WIDTH),
            format_optional(&article.category, "-"),
            article.sentiment_display(),
            width = TITLE_COLUMN_WIDTH,
        );
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
