//! Interactive session: one process-lifetime session driven line by line.

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use gatehouse::admin::Preconfirmed;
use gatehouse::catalog::LocalAssetFetcher;
use gatehouse::db::SiteConfigPatch;
use gatehouse::session::{RegistrationForm, TrialForm};
use gatehouse::Portal;

const HELP: &str = "\
Commands:
  catalog                                   show what you can see and download
  login <email> <password>
  register <email> <password> <confirm> <code> <name...>
  trial <email> <experience-level> <name...>
  logout
  status                                    who is signed in
  download <id>
  manual <id>                               open the manual of a DSL file
  admin accounts | delete <id> | export | code
  admin site [community=on|off] [maintenance=on|off] [announcement=<text>]
  help
  exit";

#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    Help,
    Status,
    Catalog,
    Login { email: String, password: String },
    Register(RegistrationForm),
    Trial(TrialForm),
    Logout,
    Download(String),
    Manual(String),
    Admin(AdminAction),
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
enum AdminAction {
    Accounts,
    Delete(String),
    Export,
    Code,
    Site(SiteConfigPatch),
}

impl ShellCommand {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match word {
            "" => return Ok(None),
            "help" | "?" => ShellCommand::Help,
            "status" | "whoami" => ShellCommand::Status,
            "catalog" | "ls" => ShellCommand::Catalog,
            "logout" => ShellCommand::Logout,
            "exit" | "quit" => ShellCommand::Exit,
            "login" => match args.as_slice() {
                [email, password] => ShellCommand::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                _ => return Err("usage: login <email> <password>".to_string()),
            },
            "register" => match args.as_slice() {
                [email, password, confirm, code, name @ ..] if !name.is_empty() => {
                    ShellCommand::Register(RegistrationForm {
                        name: name.join(" "),
                        email: email.to_string(),
                        password: password.to_string(),
                        confirm_password: confirm.to_string(),
                        registration_code: code.to_string(),
                    })
                }
                _ => {
                    return Err(
                        "usage: register <email> <password> <confirm> <code> <name...>".to_string()
                    )
                }
            },
            "trial" => match args.as_slice() {
                [email, level, name @ ..] => ShellCommand::Trial(TrialForm {
                    name: name.join(" "),
                    email: email.to_string(),
                    experience_level: level.to_string(),
                }),
                _ => return Err("usage: trial <email> <experience-level> <name...>".to_string()),
            },
            "download" | "get" => match args.as_slice() {
                [id] => ShellCommand::Download(id.to_string()),
                _ => return Err("usage: download <id>".to_string()),
            },
            "manual" => match args.as_slice() {
                [id] => ShellCommand::Manual(id.to_string()),
                _ => return Err("usage: manual <id>".to_string()),
            },
            "admin" => ShellCommand::Admin(AdminAction::parse(rest)?),
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(Some(command))
    }
}

impl AdminAction {
    fn parse(rest: &str) -> Result<Self, String> {
        let (word, rest) = match rest.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (rest, ""),
        };
        match word {
            "accounts" => Ok(AdminAction::Accounts),
            "export" => Ok(AdminAction::Export),
            "code" => Ok(AdminAction::Code),
            "delete" if !rest.is_empty() && !rest.contains(char::is_whitespace) => {
                Ok(AdminAction::Delete(rest.to_string()))
            }
            "delete" => Err("usage: admin delete <id>".to_string()),
            "site" => parse_site_patch(rest).map(AdminAction::Site),
            _ => Err("usage: admin accounts|delete <id>|export|code|site".to_string()),
        }
    }
}

/// `community=on maintenance=off announcement=free text to end of line`
fn parse_site_patch(rest: &str) -> Result<SiteConfigPatch, String> {
    let (flags, announcement) = match rest.find("announcement=") {
        Some(i) => (
            &rest[..i],
            Some(rest[i + "announcement=".len()..].trim().to_string()),
        ),
        None => (rest, None),
    };

    let mut patch = SiteConfigPatch {
        announcement,
        ..Default::default()
    };
    for flag in flags.split_whitespace() {
        let (key, value) = flag
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{}'", flag))?;
        let value = match value {
            "on" | "true" | "yes" => true,
            "off" | "false" | "no" => false,
            _ => return Err(format!("expected on or off for {}, got '{}'", key, value)),
        };
        match key {
            "community" => patch.community_enabled = Some(value),
            "maintenance" => patch.maintenance_mode = Some(value),
            _ => return Err(format!("unknown site setting '{}'", key)),
        }
    }
    Ok(patch)
}

/// Read commands from stdin until `exit` or end of input.
pub async fn run(portal: &mut Portal, fetcher: &LocalAssetFetcher) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Gatehouse v{}. Type 'help' for commands.", env!("CARGO_PKG_VERSION"));
    super::show_catalog(portal).await?;

    loop {
        prompt("gatehouse> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };

        let result = match command {
            ShellCommand::Exit => break,
            ShellCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            ShellCommand::Status => {
                status(portal);
                Ok(())
            }
            ShellCommand::Catalog => super::show_catalog(portal).await,
            ShellCommand::Login { email, password } => {
                match super::login(portal, &email, &password).await {
                    Ok(()) => super::show_catalog(portal).await,
                    Err(e) => Err(e),
                }
            }
            ShellCommand::Register(form) => match super::register(portal, &form).await {
                Ok(()) => super::show_catalog(portal).await,
                Err(e) => Err(e),
            },
            ShellCommand::Trial(form) => match super::start_trial(portal, &form).await {
                Ok(()) => super::show_catalog(portal).await,
                Err(e) => Err(e),
            },
            ShellCommand::Logout => super::logout(portal).await,
            ShellCommand::Download(id) => super::download(portal, fetcher, &id).await,
            ShellCommand::Manual(id) => super::view_manual(portal, fetcher, &id).await,
            ShellCommand::Admin(AdminAction::Accounts) => super::admin_accounts(portal, false).await,
            ShellCommand::Admin(AdminAction::Delete(id)) => {
                prompt(&format!("Delete account {}? [y/N] ", id));
                let answer = lines.next_line().await?.unwrap_or_default();
                super::admin_delete(portal, &id, &Preconfirmed(super::is_yes(&answer))).await
            }
            ShellCommand::Admin(AdminAction::Export) => super::admin_export(portal, None).await,
            ShellCommand::Admin(AdminAction::Code) => super::admin_code(portal),
            ShellCommand::Admin(AdminAction::Site(patch)) => {
                super::admin_site(portal, &patch).await
            }
        };

        if let Err(e) = result {
            println!("Error: {}", e);
        }
    }

    println!("Bye.");
    Ok(())
}

fn status(portal: &Portal) {
    match portal.session.current_account() {
        Some(account) => {
            println!("Signed in as {} <{}> ({})", account.name, account.email, account.kind());
            if let Some(status) = portal.session.trial_status(account) {
                println!("Trial days left: {}", status.remaining_days);
            }
        }
        None => println!("Not signed in."),
    }
    if portal.session.is_admin() {
        println!("Administrator access: yes");
    }
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}
