//! Interactive dashboard shell.
//!
//! Reads one command per line from stdin. Every action prints the dashboard afterwards, so the
//! shell behaves like the page it replaces: edit fields, press a button, look at the result.

use healthchain_core::{render::render, Dashboard, FormField};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  set <field> <value>   fields: patient-id, name, diagnosis, treatment, provider
  fetch                 fetch records for the patient ID
  add                   add a record from the form fields
  authorize             authorize the provider address (owner only)
  show                  print the dashboard
  reconnect             reconnect the wallet (after switching account)
  help                  show this help
  quit                  leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Set(FormField, String),
    Fetch,
    Add,
    Authorize,
    Show,
    Reconnect,
    Help,
    Quit,
}

/// Parses one input line. Blank lines give `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word {
        "set" => {
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if field.is_empty() {
                return Err("usage: set <field> <value>".into());
            }
            let field = field.parse::<FormField>().map_err(|e| e.to_string())?;
            ShellCommand::Set(field, value.trim().to_string())
        }
        "fetch" => ShellCommand::Fetch,
        "add" => ShellCommand::Add,
        "authorize" => ShellCommand::Authorize,
        "show" => ShellCommand::Show,
        "reconnect" => ShellCommand::Reconnect,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}

/// Applies `command` to the dashboard. Returns `false` when the shell should stop.
///
/// Action failures are already reported as dashboard notices, so they are not returned here.
pub async fn execute(dashboard: &mut Dashboard, command: ShellCommand) -> bool {
    match command {
        ShellCommand::Set(field, value) => dashboard.set_field(field, value),
        ShellCommand::Fetch => {
            let _ = dashboard.fetch_patient_records().await;
        }
        ShellCommand::Add => {
            let _ = dashboard.add_record().await;
        }
        ShellCommand::Authorize => {
            let _ = dashboard.authorize_provider().await;
        }
        ShellCommand::Reconnect => dashboard.connect().await,
        ShellCommand::Show | ShellCommand::Help => {}
        ShellCommand::Quit => return false,
    }
    true
}

pub async fn run(mut dashboard: Dashboard) -> anyhow::Result<()> {
    print!("{}", render(&dashboard));
    println!("\n{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        let show = !matches!(command, ShellCommand::Set(..) | ShellCommand::Help);
        let help = command == ShellCommand::Help;
        if !execute(&mut dashboard, command).await {
            break;
        }
        if help {
            println!("{HELP}");
        } else if show {
            print!("{}", render(&dashboard));
        }
    }

    tracing::info!("shell closed");
    Ok(())
}
