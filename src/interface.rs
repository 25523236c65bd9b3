use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::chart::TerminalChart;
use crate::config::AppConfig;
use crate::dashboard::Dashboard;
use crate::errors::DashboardError;
use crate::export::{format_account_details, format_date};
use crate::logger::Logger;
use crate::models::{Account, AutomationParams, Session, SessionStatus};
use crate::notify::TerminalNotifier;
use crate::prefs::{JsonFileStore, KeyValueStore};
use crate::utils::{mask, truncate};
use colored::*;
use rustyline::completion::{Completer, Pair};
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::{ColorMode, CompletionType, Config, Context, Editor, Helper, Validator};

/// Available slash commands for tab-completion.
const COMMANDS: &[&str] = &[
    "/help", "/quit", "/exit", "/login", "/logout", "/refresh", "/sessions", "/session",
    "/accounts", "/account", "/proxies", "/proxy", "/user", "/start", "/pollers", "/stats",
    "/chart", "/export", "/export-session", "/dark", "/interval", "/notify",
];

/// Commands usable without a credential.
const PUBLIC_COMMANDS: &[&str] = &[
    "/help", "/quit", "/exit", "/login", "/dark", "/interval", "/notify",
];

/// Rustyline helper providing slash-command tab-completion and inline hints.
/// With `masking` set the line is drawn as asterisks and nothing is hinted.
#[derive(Helper, Validator, Default)]
struct CommandCompleter {
    masking: bool,
}

impl Highlighter for CommandCompleter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if self.masking {
            Cow::Owned("*".repeat(line.chars().count()))
        } else {
            Cow::Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, kind: CmdKind) -> bool {
        match kind {
            CmdKind::MoveCursor => false,
            _ => self.masking,
        }
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if self.masking || pos != line.len() || !line.starts_with('/') || line.contains(' ') {
            return None;
        }

        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && **cmd != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        if self.masking || !prefix.starts_with('/') || prefix.contains(' ') {
            return Ok((0, vec![]));
        }

        let matches: Vec<Pair> = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

pub fn print_banner() {
    println!("{}", "====================================".bright_cyan());
    println!("{}", "      TURBOLEARN DASHBOARD v0.3     ".bright_cyan().bold());
    println!("{}", "====================================".bright_cyan());
    println!("{}", " Account automation control panel".bright_white());
    println!("{}\n", " Type /help for commands or /quit to exit".dimmed());
}

pub fn ask_user(question: &str) -> String {
    print!("{question}");
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return String::new();
    }
    input.trim().to_string()
}

/// Read a secret with the line masked and kept out of history.
fn read_password(rl: &mut Editor<CommandCompleter, DefaultHistory>, prompt: &str) -> String {
    if let Some(helper) = rl.helper_mut() {
        helper.masking = true;
    }
    rl.set_color_mode(ColorMode::Forced);
    rl.set_auto_add_history(false);

    let password = rl.readline(prompt).map(|p| p.trim().to_string()).unwrap_or_default();

    if let Some(helper) = rl.helper_mut() {
        helper.masking = false;
    }
    rl.set_color_mode(ColorMode::Enabled);
    rl.set_auto_add_history(true);
    password
}

/// Start a spinner animation in a background thread.
/// Returns an `Arc<AtomicBool>`; set it to `false` to stop the spinner.
fn start_spinner(message: &str) -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    let msg = message.to_string();

    std::thread::spawn(move || {
        let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
        let mut i = 0;
        while running_clone.load(Ordering::Relaxed) {
            print!("\r{} {} ", frames[i % frames.len()].to_string().cyan(), msg.dimmed());
            let _ = io::stdout().flush();
            std::thread::sleep(std::time::Duration::from_millis(80));
            i += 1;
        }
        print!("\r{}\r", " ".repeat(msg.len() + 4));
        let _ = io::stdout().flush();
    });

    running
}

fn stop_spinner(handle: &Arc<AtomicBool>) {
    handle.store(false, Ordering::Relaxed);
    std::thread::sleep(std::time::Duration::from_millis(100));
}

// ── Rendering helpers ───────────────────────────────────────────────────

fn heading(text: &str, dark: bool) -> ColoredString {
    if dark {
        text.bright_white().bold()
    } else {
        text.bright_cyan().bold()
    }
}

fn status_badge(status: SessionStatus) -> ColoredString {
    let label = format!("[{}]", status);
    match status {
        SessionStatus::Running => label.bright_blue().bold(),
        SessionStatus::Completed => label.green().bold(),
        SessionStatus::Failed => label.red().bold(),
        SessionStatus::Initializing => label.yellow(),
        SessionStatus::Unknown => label.dimmed(),
    }
}

fn print_sessions(sessions: &[Session], dark: bool) {
    if sessions.is_empty() {
        println!("{}", "No sessions yet.".yellow());
        return;
    }
    println!("\n{}", heading("Sessions (newest first):", dark));
    for session in sessions {
        println!(
            "  {}  {:<16} {}  {} accounts",
            session.short_id().bright_white(),
            status_badge(session.status),
            format_date(Some(&session.created_at)).dimmed(),
            session.accounts().len()
        );
    }
    println!();
}

fn print_session_detail(session: &Session, dark: bool) {
    println!("\n{} {}", heading("Session", dark), session.id.bright_white());
    println!("  {}   {}", "Status:".dimmed(), status_badge(session.status));
    println!("  {}  {}", "Created:".dimmed(), format_date(Some(&session.created_at)));
    if let Some(progress) = session.progress {
        println!("  {} {:.0}%", "Progress:".dimmed(), progress);
    }
    if let Some(completed) = &session.completed_at {
        println!("  {} {}", "Finished:".dimmed(), format_date(Some(completed)));
    }
    if let Some(error) = &session.error {
        println!("  {}    {}", "Error:".dimmed(), error.red());
    }
    if !session.logs.is_empty() {
        println!("  {}", "Logs:".dimmed());
        for entry in session.logs.iter().rev().take(10).rev() {
            let message = truncate(&entry.message, 120);
            let line = match entry.level.as_str() {
                "error" => message.red(),
                "success" => message.green(),
                _ => message.normal(),
            };
            println!("    {} {}", entry.timestamp.dimmed(), line);
        }
    }
    if !session.accounts().is_empty() {
        print_accounts(session.accounts(), dark);
    }
    println!();
}

fn print_accounts(accounts: &[Account], dark: bool) {
    if accounts.is_empty() {
        println!("{}", "No accounts yet.".yellow());
        return;
    }
    println!("\n{}", heading("Accounts:", dark));
    for (i, account) in accounts.iter().enumerate() {
        println!(
            "  {}. {} {} <{}> {} {}",
            i + 1,
            account.first_name,
            account.last_name,
            account.email.bright_white(),
            mask(&account.password).dimmed(),
            format_date(account.created_at.as_ref()).dimmed()
        );
    }
}

fn print_help() {
    println!("\n{}", "Available Commands:".bright_cyan().bold());
    println!("  {}           - Exit the program", "/quit, /exit".green());
    println!("  {} [user]           - Log in to the automation server", "/login".green());
    println!("  {}                 - Forget the stored credential", "/logout".green());
    println!("  {}                - Reload sessions, accounts and proxies", "/refresh".green());
    println!("  {}               - List sessions", "/sessions".green());
    println!("  {} <id>             - Show one session (id or prefix)", "/session".green());
    println!("  {}               - List accounts", "/accounts".green());
    println!("  {} <n>              - Show account n for copying", "/account".green());
    println!("  {}                - List proxies", "/proxies".green());
    println!("  {} <proxy>        - Add a proxy", "/proxy add".green());
    println!("  {} <proxy|n>       - Remove a proxy", "/proxy rm".green());
    println!("  {} <name> <pass>   - Create a dashboard user", "/user add".green());
    println!("  {} [key=value ...]  - Launch automation (browser, instances, headless,", "/start".green());
    println!("                              proxy, random_proxy, fingerprinting, recovery)");
    println!("  {}                - Sessions currently being polled", "/pollers".green());
    println!("  {}                  - Show summary statistics", "/stats".green());
    println!("  {}                  - Accounts created over the last 7 days", "/chart".green());
    println!("  {}                 - Export all accounts to CSV", "/export".green());
    println!("  {} [id]     - Export one session's accounts", "/export-session".green());
    println!("  {} [on|off]          - Toggle dark mode", "/dark".green());
    println!("  {} <secs>        - Set the auto-refresh interval", "/interval".green());
    println!("  {} [on|off]        - Toggle notifications", "/notify".green());
    println!();
}

fn parse_toggle(arg: Option<&&str>, current: bool) -> Option<bool> {
    match arg.map(|a| a.to_lowercase()) {
        None => Some(!current),
        Some(a) if a == "on" || a == "true" => Some(true),
        Some(a) if a == "off" || a == "false" => Some(false),
        Some(_) => None,
    }
}

fn report(result: Result<(), DashboardError>, success: &str) {
    match result {
        Ok(()) => println!("{} {}", "✓".green(), success),
        Err(e) => println!("{} {}", "✗".red(), e),
    }
}

// ── REPL ────────────────────────────────────────────────────────────────

/// Interactive shell entry point.
pub async fn start_repl(config: &AppConfig) {
    print_banner();

    let logger = match Logger::new(&config.log_dir) {
        Ok(logger) => Arc::new(logger),
        Err(e) => {
            println!("{} {}", "✗ Failed to create logger:".red().bold(), e);
            return;
        }
    };
    let store: Arc<dyn KeyValueStore> = match JsonFileStore::open(&config.data_path()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            println!("{} {}", "✗ Failed to open preference store:".red().bold(), e);
            return;
        }
    };
    let chart = Arc::new(TerminalChart::new());
    let dashboard = Dashboard::new(
        config.clone(),
        store,
        Arc::new(TerminalNotifier),
        chart.clone(),
        logger.clone(),
    );

    println!("{} {}", "✓ Server:".green(), dashboard.api().base_url().bright_white());
    println!("{} {}", "✓ Logging to:".green(), logger.path().display().to_string().dimmed());

    if dashboard.restore_session().await {
        println!(
            "{} {}",
            "✓ Restored session for".green(),
            dashboard.username().await.bright_white()
        );
    } else {
        println!("{}", "Not logged in. Use /login to connect.".yellow());
    }

    repl_loop(&dashboard, &chart).await;
    dashboard.shutdown();
}

async fn repl_loop(dashboard: &Arc<Dashboard>, chart: &TerminalChart) {
    let rl_config = Config::builder()
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(100)
        .build();
    let mut rl = match Editor::with_config(rl_config) {
        Ok(rl) => rl,
        Err(e) => {
            println!("{} {}", "✗ Failed to create line editor:".red().bold(), e);
            return;
        }
    };
    rl.set_helper(Some(CommandCompleter::default()));

    let mut params = AutomationParams::default();

    loop {
        let readline = rl.readline(&"> ".bright_cyan().bold().to_string());
        let line = match readline {
            Ok(line) => line.trim().to_string(),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                println!("{} {}", "✗ Input error:".red(), e);
                break;
            }
        };
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let command = parts[0];
        let args = &parts[1..];
        let dark = dashboard.root_element().await.is_dark();

        if !PUBLIC_COMMANDS.contains(&command)
            && COMMANDS.contains(&command)
            && !dashboard.is_logged_in().await
        {
            println!("{}", "Please /login first.".yellow());
            continue;
        }

        match command {
            "/quit" | "/exit" => {
                println!("Goodbye!");
                break;
            }
            "/help" => print_help(),
            "/login" => {
                let username = match args.first() {
                    Some(u) => u.to_string(),
                    None => ask_user("Username: "),
                };
                let password = read_password(&mut rl, "Password: ");
                if username.is_empty() || password.is_empty() {
                    println!("{}", "Login cancelled.".yellow());
                    continue;
                }
                let spinner = start_spinner("Logging in...");
                let ok = dashboard.login(&username, &password).await;
                stop_spinner(&spinner);
                if ok {
                    println!("{} {}", "✓ Logged in as".green(), username.bright_white());
                } else {
                    println!("{} {}", "✗".red(), dashboard.login_error().await);
                }
            }
            "/logout" => {
                dashboard.logout().await;
                println!("{}", "✓ Logged out.".green());
            }
            "/refresh" => {
                dashboard.refresh_all().await;
                println!("{}", "✓ Data refreshed.".green());
            }
            "/sessions" => print_sessions(&dashboard.sessions().await, dark),
            "/session" => {
                let Some(id) = args.first() else {
                    println!("{}", "Usage: /session <id>".yellow());
                    continue;
                };
                match dashboard.select_session(id).await {
                    Some(session) => print_session_detail(&session, dark),
                    None => println!("{} {}", "✗ Session not found:".red(), id),
                }
            }
            "/accounts" => {
                print_accounts(&dashboard.accounts().await, dark);
                println!();
            }
            "/account" => {
                let accounts = dashboard.accounts().await;
                let account = args
                    .first()
                    .and_then(|n| n.parse::<usize>().ok())
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| accounts.get(i));
                match account {
                    Some(account) => println!("\n{}\n", format_account_details(account)),
                    None => println!("{}", "Usage: /account <n> (see /accounts)".yellow()),
                }
            }
            "/proxies" => {
                let proxies = dashboard.proxies().await;
                if proxies.is_empty() {
                    println!("{}", "No proxies configured.".yellow());
                } else {
                    println!("\n{}", heading("Proxies:", dark));
                    for (i, proxy) in proxies.iter().enumerate() {
                        println!("  {}. {}", i + 1, proxy.bright_white());
                    }
                    println!();
                }
            }
            "/proxy" => match (args.first().copied(), args.get(1)) {
                (Some("add"), Some(proxy)) => {
                    report(dashboard.add_proxy(proxy).await, "Proxy added.")
                }
                (Some("rm") | Some("remove"), Some(target)) => {
                    report(dashboard.remove_proxy(target).await, "Proxy removed.")
                }
                _ => println!("{}", "Usage: /proxy add <proxy> | /proxy rm <proxy|n>".yellow()),
            },
            "/user" => match args {
                ["add", username, password] => {
                    report(dashboard.add_user(username, password).await, "User created.")
                }
                _ => println!("{}", "Usage: /user add <username> <password>".yellow()),
            },
            "/start" => {
                let mut launch = params.clone();
                let mut valid = true;
                for arg in args {
                    let Some((key, value)) = arg.split_once('=') else {
                        println!("{} {}", "✗ Expected key=value, got".red(), arg);
                        valid = false;
                        break;
                    };
                    if let Err(e) = launch.set(key, value) {
                        println!("{} {}", "✗".red(), e);
                        valid = false;
                        break;
                    }
                }
                if !valid {
                    continue;
                }
                match dashboard.start_automation(&launch).await {
                    Ok(id) => {
                        println!("{} {}", "✓ Session started:".green(), id.bright_white());
                        params = launch;
                    }
                    Err(e) => println!("{} {}", "✗ Failed to start automation:".red(), e),
                }
            }
            "/pollers" => {
                let ids = dashboard.active_pollers();
                if ids.is_empty() {
                    println!("{}", "No sessions are being polled.".yellow());
                } else {
                    for id in ids {
                        println!("  {}", id.bright_white());
                    }
                }
            }
            "/stats" => {
                let stats = dashboard.stats().await;
                println!("\n{}", heading("━━━━━━━━━ Dashboard Statistics ━━━━━━━━━", dark));
                println!("Total sessions:  {}", stats.total_sessions);
                println!("Sessions today:  {}", stats.sessions_today);
                println!("Success rate:    {}%", stats.success_rate);
                println!("Total accounts:  {}", stats.total_accounts.to_string().green());
                println!("Proxies:         {}", stats.proxy_count);
                let running = if stats.automation_running {
                    "running".bright_blue().bold()
                } else {
                    "idle".dimmed()
                };
                println!("Automation:      {}", running);
                if let Some(active) = dashboard.active_session().await {
                    println!("Active session:  {} {}", active.short_id(), status_badge(active.status));
                }
                println!("{}", heading("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━", dark));
            }
            "/chart" => {
                println!("\n{}", heading("Accounts Created", dark));
                println!("{}\n", chart.render(40));
            }
            "/export" => match dashboard.export_accounts().await {
                Ok(path) => println!("{} {}", "✓ Exported to".green(), path.display()),
                Err(DashboardError::NoAccounts) => {}
                Err(e) => println!("{} {}", "✗ Export failed:".red(), e),
            },
            "/export-session" => match dashboard.export_session_accounts(args.first().copied()).await {
                Ok(Some(path)) => println!("{} {}", "✓ Exported to".green(), path.display()),
                Ok(None) => {}
                Err(e) => println!("{} {}", "✗ Export failed:".red(), e),
            },
            "/dark" => {
                let current = dashboard.preferences().await.dark_mode;
                match parse_toggle(args.first(), current) {
                    Some(on) => report(
                        dashboard.set_dark_mode(on).await,
                        if on { "Dark mode on." } else { "Dark mode off." },
                    ),
                    None => println!("{}", "Usage: /dark [on|off]".yellow()),
                }
            }
            "/notify" => {
                let current = dashboard.preferences().await.notifications_enabled;
                match parse_toggle(args.first(), current) {
                    Some(on) => report(
                        dashboard.set_notifications(on).await,
                        if on { "Notifications on." } else { "Notifications off." },
                    ),
                    None => println!("{}", "Usage: /notify [on|off]".yellow()),
                }
            }
            "/interval" => {
                let Some(secs) = args.first().and_then(|s| s.parse::<u64>().ok()) else {
                    println!("{}", "Usage: /interval <seconds>".yellow());
                    continue;
                };
                match dashboard.set_refresh_interval(secs).await {
                    Ok(true) => println!("{} {}s", "✓ Refresh interval set to".green(), secs),
                    Ok(false) => println!("{}", "Interval must be at least 1 second.".yellow()),
                    Err(e) => println!("{} {}", "✗".red(), e),
                }
            }
            other => println!("{} {} (try /help)", "Unknown command:".yellow(), other),
        }
    }
}
