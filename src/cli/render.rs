//! Terminal rendering of catalog views, account tables and site settings.

use chrono::{DateTime, Utc};

use gatehouse::catalog::{Access, CatalogView, EntryKind, EntryPoint};
use gatehouse::db::{Account, Membership, SiteConfig};
use gatehouse::session::Viewer;

pub fn print_view(view: &CatalogView, account: Option<&Account>) {
    println!();
    if view.maintenance_mode {
        println!("[!!] The portal is in maintenance mode.");
    }
    if let Some(announcement) = &view.announcement {
        println!(">> {}", announcement);
    }

    match (view.viewer, account) {
        (Viewer::Anonymous, _) => {
            println!("=== Gatehouse ===");
            println!();
            println!(
                "{} manuals and {} DSL files for members.",
                view.summary.manuals, view.summary.config_files
            );
        }
        (
            Viewer::Trial {
                remaining_days,
                allowed,
            },
            Some(account),
        ) => {
            println!("=== {} (trial) ===", account.name);
            println!("{}", trial_banner(allowed, remaining_days));
        }
        (
            Viewer::Trial {
                remaining_days,
                allowed,
            },
            None,
        ) => {
            println!("=== Trial ===");
            println!("{}", trial_banner(allowed, remaining_days));
        }
        (Viewer::Member, Some(account)) => println!("=== {} ===", account.name),
        (Viewer::Member, None) => println!("=== Member ==="),
    }

    print_section(view, EntryKind::Manual, "Manuals");
    print_section(view, EntryKind::ConfigFile, "DSL Files");

    if let Some(features) = &view.community {
        println!();
        println!("Community:");
        for feature in features {
            println!("  {:<30}  {}", feature.title, feature.action);
            println!("  {}", feature.description);
        }
    }

    println!();
    let actions: Vec<_> = view.entry_points.iter().map(|e| entry_point_label(*e)).collect();
    println!("Available: {}", actions.join(", "));
    println!();
}

fn print_section(view: &CatalogView, kind: EntryKind, heading: &str) {
    let items: Vec<_> = view.items.iter().filter(|i| i.entry.kind == kind).collect();
    if items.is_empty() {
        return;
    }

    println!();
    println!("{}:", heading);
    println!("{:<18}  {:<36}  {:<8}", "ID", "TITLE", "ACCESS");
    println!("{}", "-".repeat(66));
    for item in items {
        let access = match item.access {
            Access::Downloadable => "ok",
            Access::Locked => "locked",
        };
        println!(
            "{:<18}  {:<36}  {:<8}",
            item.entry.id,
            truncate(&item.entry.title, 36),
            access
        );
    }
}

pub fn print_accounts(accounts: &[Account], now: DateTime<Utc>) {
    if accounts.is_empty() {
        println!("No accounts found.");
        return;
    }

    println!();
    println!(
        "{:<36}  {:<20}  {:<28}  {:<8}  {:<16}  {}",
        "ID", "NAME", "EMAIL", "KIND", "REGISTERED", "DETAIL"
    );
    println!("{}", "-".repeat(130));

    for account in accounts {
        let detail = match &account.membership {
            Membership::Standard { registration_code } => registration_code.clone(),
            Membership::Trial { trial_window, .. } => {
                let status = trial_window.status_at(now);
                if status.allowed {
                    format!("{} days left", status.remaining_days)
                } else {
                    format!("ended {}", format_time(&trial_window.end))
                }
            }
        };
        println!(
            "{:<36}  {:<20}  {:<28}  {:<8}  {:<16}  {}",
            account.id,
            truncate(&account.name, 20),
            truncate(&account.email, 28),
            account.kind(),
            format_time(&account.registered_at),
            detail
        );
    }

    println!();
    println!("{} account(s)", accounts.len());
}

pub fn print_site(site: &SiteConfig) {
    println!();
    println!("Site:");
    println!("  Community:    {}", on_off(site.community_enabled));
    println!("  Maintenance:  {}", on_off(site.maintenance_mode));
    println!(
        "  Announcement: {}",
        if site.announcement.is_empty() {
            "-"
        } else {
            &site.announcement
        }
    );
    println!();
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

/// Whether the trial has ended follows the window check, not the day count.
fn trial_banner(allowed: bool, remaining_days: i64) -> String {
    if allowed {
        format!("Trial: {} day(s) left. Register with a purchase code to unlock everything.", remaining_days)
    } else {
        "Trial: ended. Register with a purchase code to keep access.".to_string()
    }
}

fn entry_point_label(entry_point: EntryPoint) -> &'static str {
    match entry_point {
        EntryPoint::Login => "login",
        EntryPoint::Register => "register",
        EntryPoint::StartTrial => "trial",
        EntryPoint::Upgrade => "register (upgrade)",
        EntryPoint::Logout => "logout",
        EntryPoint::AdminConsole => "admin",
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Truncate a string for table output
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
