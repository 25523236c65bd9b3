use chrono::{DateTime, Local, NaiveDate};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::DashboardResult;
use crate::models::{Account, Session};

pub const CSV_HEADER: &str = "First Name,Last Name,Email,Password,Created At";

/// `May 1, 2024, 03:04 PM`, or `N/A` when there is no timestamp.
pub fn format_date(value: Option<&DateTime<Local>>) -> String {
    match value {
        Some(dt) => dt.format("%b %-d, %Y, %I:%M %p").to_string(),
        None => "N/A".to_string(),
    }
}

/// Header line plus one fully quoted row per account, `\n`-joined, no trailing newline.
pub fn accounts_to_csv(accounts: &[Account]) -> DashboardResult<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for account in accounts {
        writer.write_record([
            account.first_name.as_str(),
            account.last_name.as_str(),
            account.email.as_str(),
            account.password.as_str(),
            format_date(account.created_at.as_ref()).as_str(),
        ])?;
    }

    let rows = writer.into_inner().map_err(|e| e.into_error())?;
    let rows = String::from_utf8_lossy(&rows);
    let rows = rows.trim_end_matches('\n');

    if rows.is_empty() {
        Ok(CSV_HEADER.to_string())
    } else {
        Ok(format!("{CSV_HEADER}\n{rows}"))
    }
}

pub fn accounts_filename(day: NaiveDate) -> String {
    format!("turbolearn_accounts_{}.csv", day.format("%Y-%m-%d"))
}

pub fn session_filename(session: &Session) -> String {
    format!("turbolearn_session_{}.csv", session.short_id())
}

/// Write `contents` to `dir/filename`, creating `dir` when needed.
pub fn write_export(dir: &Path, filename: &str, contents: &str) -> DashboardResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    fs::write(&path, contents)?;
    Ok(path)
}

/// Plain-text block for copying a single account.
pub fn format_account_details(account: &Account) -> String {
    format!(
        "Email: {}\nPassword: {}\nFirst Name: {}\nLast Name: {}",
        account.email, account.password, account.first_name, account.last_name
    )
}
