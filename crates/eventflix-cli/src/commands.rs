//! Command handlers. Each one is a thin consumer of the core context.

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use futures::StreamExt;
use tracing::{info, warn};

use eventflix_core::auth::CredentialStore;
use eventflix_core::models::{Event, EventForm, RegisterRequest};
use eventflix_core::validation::{self, FieldErrors};
use eventflix_core::{ApiError, AppContext, ApplyMode, Language};

use crate::cli::{Command, USAGE};

pub async fn run(ctx: &mut AppContext, command: Command) -> Result<()> {
    match command {
        Command::Login { email, remember } => login(ctx, email, remember).await,
        Command::Logout => {
            ctx.api.logout().await;
            println!("Logged out.");
            Ok(())
        }
        Command::Register => register(ctx).await,
        Command::Status => {
            status(ctx);
            Ok(())
        }
        Command::Locale { code, reload } => locale(ctx, code, reload).await,
        Command::Events => events(ctx).await,
        Command::Event { id } => {
            let event = ctx.api.fetch_event(id).await?;
            print_event_detail(&event);
            Ok(())
        }
        Command::CreateEvent => create_event(ctx).await,
        Command::Buy { event_id, quantity } => buy(ctx, event_id, quantity).await,
        Command::Tickets => tickets(ctx).await,
        Command::Profile { json } => profile(ctx, json).await,
        Command::DeleteAccount => delete_account(ctx).await,
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

/// Message to print when a command fails
pub fn describe_failure(error: &anyhow::Error) -> String {
    let message = ApiError::describe(error);
    match error.downcast_ref::<ApiError>() {
        Some(api) if api.requires_login() => {
            format!("{}\nRun `eventflix login` to sign in.", message)
        }
        _ => message,
    }
}

// ===== Session =====

async fn login(ctx: &mut AppContext, email: Option<String>, remember: bool) -> Result<()> {
    let email = match (email, ctx.config.last_email.clone()) {
        (Some(email), _) => email,
        (None, Some(last)) => {
            let input = prompt(&format!("Email [{}]: ", last))?;
            if input.is_empty() {
                last
            } else {
                input
            }
        }
        (None, None) => prompt("Email: ")?,
    };

    let password = if CredentialStore::has_credentials(&email)
        && !prompt("Use stored password? [Y/n]: ")?.eq_ignore_ascii_case("n")
    {
        CredentialStore::get_password(&email)?
    } else {
        rpassword::prompt_password("Password: ").context("Failed to read password")?
    };

    validation::validate_login(&email, &password).map_err(report_field_errors)?;

    println!("Logging in...");
    let response = ctx.api.login(&email, &password).await?;

    if remember {
        if let Err(e) = CredentialStore::store(&email, &password) {
            warn!(error = %e, "Failed to store credentials");
        }
    }

    ctx.config.last_email = Some(email.clone());
    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }

    if !ctx.session.is_initialized() {
        warn!("Session store unavailable, login is not persisted");
        eprintln!("Warning: this device could not save your session. You will need to log in again next time.");
    }

    match response.role {
        Some(role) => println!("Logged in as {} ({}).", email, role),
        None => println!("Logged in as {}.", email),
    }
    Ok(())
}

async fn register(ctx: &AppContext) -> Result<()> {
    let name = prompt("Name: ")?;
    let email = prompt("Email: ")?;
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
    let confirm = rpassword::prompt_password("Repeat password: ").context("Failed to read password")?;
    let phone = prompt("Phone (optional): ")?;

    let request = RegisterRequest {
        name,
        email,
        password,
        phone: optional(phone),
    };
    validation::validate_registration(&request, &confirm).map_err(report_field_errors)?;

    ctx.api.register(&request).await?;
    println!("Account created. Run `eventflix login {}` to sign in.", request.email);
    Ok(())
}

fn status(ctx: &AppContext) {
    let language = ctx.locale.get_locale();
    if ctx.session.is_logged_in() {
        let role = ctx.session.get_user_role().unwrap_or_else(|| "unknown".to_string());
        println!("Logged in: yes (role: {})", role);
        if ctx.session.is_organizer() {
            println!("Organizer tools: enabled");
        }
    } else {
        println!("Logged in: no");
    }
    println!("Language:  {} ({})", language.native_name(), language.code());
    match ctx.store_path() {
        Some(path) => println!("Preferences: {}", path.display()),
        None => println!("Preferences: not persisted"),
    }
    println!("API:       {}", ctx.api.base_url());
}

async fn delete_account(ctx: &mut AppContext) -> Result<()> {
    let answer = prompt("This permanently deletes your account. Type DELETE to confirm: ")?;
    if answer != "DELETE" {
        println!("Cancelled.");
        return Ok(());
    }

    ctx.api.delete_account().await?;
    if let Some(email) = ctx.config.last_email.take() {
        if CredentialStore::has_credentials(&email) {
            if let Err(e) = CredentialStore::delete(&email) {
                warn!(error = %e, "Failed to delete stored credentials");
            }
        }
        if let Err(e) = ctx.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
    println!("Your account has been deleted.");
    Ok(())
}

// ===== Language =====

async fn locale(ctx: &AppContext, code: Option<String>, reload: bool) -> Result<()> {
    let Some(code) = code else {
        let current = ctx.locale.get_locale();
        for language in Language::ALL {
            let marker = if language == current { "*" } else { " " };
            println!("{} {}  {}", marker, language.code(), language.native_name());
        }
        return Ok(());
    };

    // This command acts as the screen observing the change
    let mut changes = Box::pin(ctx.locale.changes());
    let mode = if reload { ApplyMode::Reload } else { ApplyMode::InPlace };
    let applied = ctx.locale.set_locale(&code, mode);

    if Language::parse(&code) != Some(applied) {
        println!("'{}' is not supported, using {}.", code, applied.native_name());
    }

    if let Some(change) = changes.next().await {
        info!(version = change.version, "Language change observed");
        match change.apply {
            ApplyMode::InPlace => println!("Language set to {}.", change.language.native_name()),
            ApplyMode::Reload => println!(
                "Language set to {}. Reloading views.",
                change.language.native_name()
            ),
        }
    }
    Ok(())
}

// ===== Events & tickets =====

async fn events(ctx: &AppContext) -> Result<()> {
    let events = ctx.api.fetch_events().await?;
    if events.is_empty() {
        println!("No upcoming events.");
        return Ok(());
    }

    println!("{:>6}  {:<16}  {:<40}  {:>10}  {}", "ID", "DATE", "TITLE", "PRICE", "AVAILABLE");
    for event in &events {
        let available = match event.tickets_available() {
            Some(0) => "sold out".to_string(),
            Some(n) => n.to_string(),
            None => "-".to_string(),
        };
        println!(
            "{:>6}  {:<16}  {:<40}  {:>10}  {}",
            event.id,
            event.formatted_date(),
            truncate(&event.title, 40),
            event.formatted_price(),
            available
        );
    }
    Ok(())
}

fn print_event_detail(event: &Event) {
    println!("{}", event.title);
    println!("  When:     {}", event.formatted_date());
    if let Some(ref location) = event.location {
        println!("  Where:    {}", location);
    }
    if let Some(ref category) = event.category {
        println!("  Category: {}", category);
    }
    println!("  Price:    {}", event.formatted_price());
    match event.tickets_available() {
        Some(0) => println!("  Tickets:  sold out"),
        Some(n) => println!("  Tickets:  {} left", n),
        None => {}
    }
    if let Some(ref description) = event.description {
        println!("\n{}", description);
    }
}

async fn create_event(ctx: &AppContext) -> Result<()> {
    // Fail before prompting
    if !ctx.session.has_valid_token() {
        return Err(ApiError::NotLoggedIn.into());
    }
    if !ctx.session.is_organizer() {
        return Err(ApiError::AccessDenied("organizer role required".to_string()).into());
    }

    let title = prompt("Title: ")?;
    let location = prompt("Location: ")?;
    let start_date = prompt("Starts (e.g. 2026-11-20T21:00:00+01:00): ")?;
    let price = parse_number::<f64>(&prompt("Price in € [0]: ")?.replace(',', "."), "Price")?;
    let capacity = parse_number::<u32>(&prompt("Capacity: ")?, "Capacity")?;
    let category = prompt("Category (optional): ")?;
    let description = prompt("Description (optional): ")?;

    let form = EventForm {
        title,
        description: optional(description),
        location,
        start_date,
        price,
        capacity,
        category: optional(category),
    };
    validation::validate_event(&form).map_err(report_field_errors)?;

    let event = ctx.api.create_event(&form).await?;
    println!("Event #{} published.\n", event.id);
    print_event_detail(&event);
    Ok(())
}

async fn buy(ctx: &AppContext, event_id: i64, quantity: u32) -> Result<()> {
    if !ctx.session.has_valid_token() {
        return Err(ApiError::NotLoggedIn.into());
    }

    let event = ctx.api.fetch_event(event_id).await?;
    if event.is_sold_out() {
        println!("{} is sold out.", event.title);
        return Ok(());
    }
    if let Some(left) = event.tickets_available() {
        if quantity > left {
            println!("Only {} tickets left for {}.", left, event.title);
            return Ok(());
        }
    }

    let ticket = ctx.api.purchase_tickets(event_id, quantity).await?;
    println!(
        "Bought {} ticket(s) for {} - total {:.2} €",
        ticket.quantity,
        ticket.display_title(),
        ticket.total_price
    );
    if let Some(ref url) = ticket.invoice_url {
        println!("Invoice: {}", url);
    }
    Ok(())
}

async fn tickets(ctx: &AppContext) -> Result<()> {
    let tickets = ctx.api.fetch_my_tickets().await?;
    if tickets.is_empty() {
        println!("You have no tickets yet.");
        return Ok(());
    }
    for ticket in &tickets {
        let purchased = ticket
            .purchased_at
            .as_deref()
            .map(format_local_time)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{:<6} {:<40} x{:<3} {:>10.2} €  {}",
            ticket.id,
            truncate(&ticket.display_title(), 40),
            ticket.quantity,
            ticket.total_price,
            purchased
        );
    }
    Ok(())
}

async fn profile(ctx: &AppContext, json: bool) -> Result<()> {
    let profile = ctx.api.fetch_profile().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }
    println!("{}", profile.name);
    println!("  Email: {}", profile.email);
    if let Some(ref phone) = profile.phone {
        println!("  Phone: {}", phone);
    }
    if let Some(ref role) = profile.role {
        println!("  Role:  {}", role);
    }
    Ok(())
}

// ===== Helpers =====

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Print each field problem and turn them into one error
fn report_field_errors(errors: FieldErrors) -> anyhow::Error {
    for error in errors.iter() {
        eprintln!("{}: {}", error.field, error.message);
    }
    anyhow::anyhow!("Please correct the fields above")
}

fn optional(input: String) -> Option<String> {
    if input.is_empty() {
        None
    } else {
        Some(input)
    }
}

/// Parse a prompted number; empty input means zero
fn parse_number<T>(input: &str, field: &str) -> Result<T>
where
    T: std::str::FromStr + Default,
{
    if input.is_empty() {
        return Ok(T::default());
    }
    input
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a number, got '{}'", field, input))
}

/// Truncate a string to a maximum length, adding ellipsis if needed
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

fn format_local_time(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string(),
        Err(_) => timestamp.chars().take(16).collect(),
    }
}
