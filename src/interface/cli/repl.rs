use colored::Colorize;
use log::debug;
use rustyline::{error::ReadlineError, DefaultEditor};
use tabled::Table;

use crate::chart::ChartOfAccounts;
use crate::error::{ChartError, ChartResult};
use crate::interface::cli::tabled_rowtype::AccountRow;
use crate::interface::cli::tree_view::{render_tree, ExpandedNodes};
use crate::model::{Account, AccountDraft, AccountNature, AccountPatch, AccountStatus};
use crate::storage::AccountStore;

const HELP: &str = "\
list                              all accounts as a table
tree                              the account tree (expanded groups only)
add-root <name ar> | <name en>    new top-level account
add-child <code> <name ar> | <name en>
                                  new account under <code>
edit <code> <field> <value>       field: code nameAr nameEn status closed costCenter balance nature
delete <code>
expand <code> / collapse <code>
reclassify <code>                 refresh classification under a root
orphans                           accounts not reachable from any root
help / quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Tree,
    AddRoot { name_ar: String, name_en: String },
    AddChild { parent_code: String, name_ar: String, name_en: String },
    Edit { code: String, field: String, value: String },
    Delete { code: String },
    Expand { code: String },
    Collapse { code: String },
    Reclassify { code: String },
    Orphans,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let code_arg = |usage: &str| -> Result<String, String> {
        match rest.split_whitespace().next() {
            Some(code) => Ok(code.to_string()),
            None => Err(format!("usage: {usage} <code>")),
        }
    };

    match verb {
        "list" | "ls" => Ok(Command::List),
        "tree" => Ok(Command::Tree),
        "add-root" => {
            let (name_ar, name_en) = split_names(rest)?;
            Ok(Command::AddRoot { name_ar, name_en })
        }
        "add-child" => {
            let (parent_code, names) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: add-child <code> <name ar> | <name en>")?;
            let (name_ar, name_en) = split_names(names)?;
            Ok(Command::AddChild {
                parent_code: parent_code.to_string(),
                name_ar,
                name_en,
            })
        }
        "edit" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(code), Some(field), Some(value)) if !code.is_empty() => Ok(Command::Edit {
                    code: code.to_string(),
                    field: field.to_string(),
                    value: value.trim().to_string(),
                }),
                _ => Err("usage: edit <code> <field> <value>".to_string()),
            }
        }
        "delete" | "rm" => Ok(Command::Delete { code: code_arg("delete")? }),
        "expand" => Ok(Command::Expand { code: code_arg("expand")? }),
        "collapse" => Ok(Command::Collapse { code: code_arg("collapse")? }),
        "reclassify" => Ok(Command::Reclassify { code: code_arg("reclassify")? }),
        "orphans" => Ok(Command::Orphans),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "" => Err(String::new()),
        other => Err(format!("unknown command `{other}`, try `help`")),
    }
}

fn split_names(input: &str) -> Result<(String, String), String> {
    match input.split_once('|') {
        Some((ar, en)) => Ok((ar.trim().to_string(), en.trim().to_string())),
        None => Err("names are written as <name ar> | <name en>".to_string()),
    }
}

fn patch_for(field: &str, value: &str) -> ChartResult<AccountPatch> {
    let invalid = |what: &str| ChartError::Validation(format!("invalid {what}: {value}"));
    let mut patch = AccountPatch::default();

    match field {
        "code" => patch.code = Some(value.to_string()),
        "nameAr" => patch.name_ar = Some(value.to_string()),
        "nameEn" => patch.name_en = Some(value.to_string()),
        "status" => {
            patch.status = Some(match value {
                "active" => AccountStatus::Active,
                "inactive" => AccountStatus::Inactive,
                _ => return Err(invalid("status")),
            })
        }
        "closed" => patch.is_closed = Some(value.parse().map_err(|_| invalid("flag"))?),
        "costCenter" => {
            patch.cost_center = Some(match value {
                "" | "-" => None,
                label => Some(label.to_string()),
            })
        }
        "balance" => patch.balance = Some(value.parse().map_err(|_| invalid("balance"))?),
        "nature" => {
            patch.nature = Some(match value {
                "debit" => AccountNature::Debit,
                "credit" => AccountNature::Credit,
                _ => return Err(invalid("nature")),
            })
        }
        other => return Err(ChartError::Validation(format!("unknown field `{other}`"))),
    }
    Ok(patch)
}

/// A chart plus the view state of one interactive user.
pub struct Session<S: AccountStore> {
    chart: ChartOfAccounts<S>,
    expanded: ExpandedNodes,
}

impl<S: AccountStore> Session<S> {
    pub fn new(chart: ChartOfAccounts<S>) -> Self {
        Self {
            chart,
            expanded: ExpandedNodes::new(),
        }
    }

    pub fn chart(&self) -> &ChartOfAccounts<S> {
        &self.chart
    }

    fn by_code(&self, code: &str) -> ChartResult<Account> {
        self.chart
            .find_by_code(code)
            .cloned()
            .ok_or_else(|| ChartError::Validation(format!("no account with code {code}")))
    }

    /// Runs one command and returns the lines to print.
    pub fn execute(&mut self, command: Command) -> ChartResult<Vec<String>> {
        debug!("executing {command:?}");
        match command {
            Command::List => {
                let rows: Vec<AccountRow> = self.chart.accounts().iter().map(AccountRow::from).collect();
                Ok(vec![Table::new(rows).to_string()])
            }
            Command::Tree => Ok(render_tree(self.chart.forest(), &self.expanded)),
            Command::AddRoot { name_ar, name_en } => {
                let account = self.chart.add_root(AccountDraft::new(name_ar, name_en))?;
                Ok(vec![format!("created {} {}", account.code, account.name_ar)])
            }
            Command::AddChild { parent_code, name_ar, name_en } => {
                let parent = self.by_code(&parent_code)?;
                let account = self.chart.add_child(parent.id, AccountDraft::new(name_ar, name_en))?;
                self.expanded.expand(parent.id);
                Ok(vec![format!("created {} {}", account.code, account.name_ar)])
            }
            Command::Edit { code, field, value } => {
                let account = self.by_code(&code)?;
                self.chart.edit(account.id, patch_for(&field, &value)?)?;
                Ok(vec![format!("updated {code}")])
            }
            Command::Delete { code } => {
                let account = self.by_code(&code)?;
                self.chart.delete(account.id)?;
                self.expanded.collapse(account.id);
                Ok(vec![format!("deleted {code}")])
            }
            Command::Expand { code } => {
                let account = self.by_code(&code)?;
                self.expanded.expand(account.id);
                Ok(render_tree(self.chart.forest(), &self.expanded))
            }
            Command::Collapse { code } => {
                let account = self.by_code(&code)?;
                self.expanded.collapse(account.id);
                Ok(render_tree(self.chart.forest(), &self.expanded))
            }
            Command::Reclassify { code } => {
                let account = self.by_code(&code)?;
                let changed = self.chart.reclassify_subtree(account.id)?;
                Ok(vec![format!("{changed} accounts reclassified")])
            }
            Command::Orphans => Ok(self
                .chart
                .orphans()
                .iter()
                .map(|orphan| format!("{} ({:?})", orphan.code, orphan.reason))
                .collect()),
            Command::Help => Ok(HELP.lines().map(str::to_string).collect()),
            Command::Quit => Ok(Vec::new()),
        }
    }
}

pub fn run<S: AccountStore>(session: &mut Session<S>) -> Result<(), ReadlineError> {
    let mut editor = DefaultEditor::new()?;
    println!("{}", "chart of accounts, type `help` for commands".bold());

    loop {
        match editor.readline("coa> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(line.as_str())?;

                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{}", message.yellow());
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }

                match session.execute(command) {
                    Ok(lines) => lines.iter().for_each(|line| println!("{line}")),
                    Err(err) => println!("{}", err.to_string().red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        }
    }

    Ok(())
}
