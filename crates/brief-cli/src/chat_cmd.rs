//! Interactive line-based chat session.
//!
//! Plain lines are sent to the assistant. Lines starting with `/` edit the
//! plan, matrix, and concepts, or export and save the workspace.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use brief_core::assistant::{BackendAssistant, BackendClient, Message, Role};
use brief_core::channel::{Mode, Session};
use brief_core::export::{self, ExportFormat};
use brief_core::plan::PlanField;
use brief_core::store::{ConceptField, MatrixField};

use crate::config::BriefConfig;
use crate::export_cmd;
use crate::resolve;

const HELP: &str = "\
Commands:
  <text>                               send a message to the assistant
  /upload <path>                       ingest a file (CSV becomes the audience context)
  /mode [live|simulated]               switch mode (clears the transcript)
  /set <name|smp|narrative> <value>    set a plan field
  /row add                             append an empty matrix row
  /row set <id> <field> <value>        edit a matrix cell
  /row rm <id>                         remove a matrix row
  /concept add                         append a concept
  /concept set <id> <field> <value>    edit a concept field
  /concept rm <id>                     remove a concept
  /show                                print the brief as text
  /export <json|txt|csv|pdf> [path]    export the brief
  /save                                write the workspace file
  /quit                                save and exit";

// ---------------------------------------------------------------------------
// Command parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Say(String),
    Help,
    Upload(PathBuf),
    Mode(Option<Mode>),
    Set {
        field: PlanField,
        value: String,
    },
    RowAdd,
    RowSet {
        row: String,
        field: MatrixField,
        value: String,
    },
    RowRemove(String),
    ConceptAdd,
    ConceptSet {
        concept: String,
        field: ConceptField,
        value: String,
    },
    ConceptRemove(String),
    Show,
    Export {
        format: ExportFormat,
        output: Option<PathBuf>,
    },
    Save,
    Quit,
}

/// Split off the first whitespace-delimited word.
fn next_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

fn required<'a>(word: &'a str, what: &str) -> Result<&'a str, String> {
    if word.is_empty() {
        Err(format!("missing {what} (type /help for usage)"))
    } else {
        Ok(word)
    }
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(ReplCommand::Say(line.to_string()));
    };
    let (name, args) = next_word(rest);

    match name {
        "help" | "?" => Ok(ReplCommand::Help),
        "quit" | "exit" | "q" => Ok(ReplCommand::Quit),
        "show" => Ok(ReplCommand::Show),
        "save" => Ok(ReplCommand::Save),
        "upload" => Ok(ReplCommand::Upload(PathBuf::from(required(args, "path")?))),
        "mode" => match args {
            "" => Ok(ReplCommand::Mode(None)),
            m => m
                .parse::<Mode>()
                .map(|m| ReplCommand::Mode(Some(m)))
                .map_err(|e| format!("{e}")),
        },
        "set" => {
            let (field, value) = next_word(args);
            let field = required(field, "field")?
                .parse::<PlanField>()
                .map_err(|e| format!("{e}"))?;
            Ok(ReplCommand::Set {
                field,
                value: value.to_string(),
            })
        }
        "row" => {
            let (action, args) = next_word(args);
            match action {
                "add" => Ok(ReplCommand::RowAdd),
                "rm" | "remove" => Ok(ReplCommand::RowRemove(required(args, "row id")?.to_string())),
                "set" => {
                    let (row, args) = next_word(args);
                    let (field, value) = next_word(args);
                    Ok(ReplCommand::RowSet {
                        row: required(row, "row id")?.to_string(),
                        field: required(field, "field")?
                            .parse::<MatrixField>()
                            .map_err(|e| format!("{e}"))?,
                        value: value.to_string(),
                    })
                }
                other => Err(format!("unknown /row action {other:?} (add, set, rm)")),
            }
        }
        "concept" => {
            let (action, args) = next_word(args);
            match action {
                "add" => Ok(ReplCommand::ConceptAdd),
                "rm" | "remove" => Ok(ReplCommand::ConceptRemove(
                    required(args, "concept id")?.to_string(),
                )),
                "set" => {
                    let (concept, args) = next_word(args);
                    let (field, value) = next_word(args);
                    Ok(ReplCommand::ConceptSet {
                        concept: required(concept, "concept id")?.to_string(),
                        field: required(field, "field")?
                            .parse::<ConceptField>()
                            .map_err(|e| format!("{e}"))?,
                        value: value.to_string(),
                    })
                }
                other => Err(format!("unknown /concept action {other:?} (add, set, rm)")),
            }
        }
        "export" => {
            let (format, output) = next_word(args);
            Ok(ReplCommand::Export {
                format: required(format, "format")?
                    .parse::<ExportFormat>()
                    .map_err(|e| format!("{e}"))?,
                output: (!output.is_empty()).then(|| PathBuf::from(output)),
            })
        }
        other => Err(format!("unknown command /{other} (type /help)")),
    }
}

// ---------------------------------------------------------------------------
// Session loop
// ---------------------------------------------------------------------------

enum Flow {
    Continue,
    Quit,
}

pub async fn run_chat(config: &BriefConfig, workspace: &Path, simulate: bool) -> Result<()> {
    let (doc, store) = resolve::open_workspace(workspace)?;
    let backend = BackendClient::new(&config.backend_url);
    let mode = if simulate { Mode::Simulated } else { Mode::Live };

    let mut session = Session::new(mode, Box::new(BackendAssistant::new(backend.clone())));
    session.load(doc, store);

    println!("brief chat ({}), workspace {}", session.mode(), workspace.display());
    println!("Type /help for commands.\n");
    print_transcript(session.transcript());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        debug!(?command, "chat command");

        match execute(&mut session, &backend, workspace, command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("error: {e:#}"),
        }
    }

    resolve::write_workspace(workspace, session.plan(), session.store())?;
    println!("Saved {}", workspace.display());
    Ok(())
}

async fn execute(
    session: &mut Session,
    backend: &BackendClient,
    workspace: &Path,
    command: ReplCommand,
) -> Result<Flow> {
    match command {
        ReplCommand::Say(text) => {
            let reply = session.send(&text).await.cloned();
            report_turn(session, reply);
        }
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Upload(path) => upload(session, backend, &path).await?,
        ReplCommand::Mode(mode) => {
            match mode {
                Some(m) => session.set_mode(m),
                None => {
                    session.toggle_mode();
                }
            }
            print_transcript(session.transcript());
        }
        ReplCommand::Set { field, value } => {
            session.set_plan_field(field, value);
            println!("{field} updated.");
        }
        ReplCommand::RowAdd => println!("Added {}", session.add_row()),
        ReplCommand::RowSet { row, field, value } => {
            let (index, id) = resolve::resolve_row(session.store(), &row)?;
            session.update_cell(index, field, value)?;
            println!("{id}.{field} updated.");
        }
        ReplCommand::RowRemove(row) => {
            let (_, id) = resolve::resolve_row(session.store(), &row)?;
            session.remove_row_by_id(&id)?;
            println!("Removed {id}");
        }
        ReplCommand::ConceptAdd => println!("Added {}", session.add_concept()),
        ReplCommand::ConceptSet {
            concept,
            field,
            value,
        } => {
            let (index, id) = resolve::resolve_concept(session.store(), &concept)?;
            session.update_concept_field(index, field, value)?;
            println!("{id}.{field} updated.");
        }
        ReplCommand::ConceptRemove(concept) => {
            let (_, id) = resolve::resolve_concept(session.store(), &concept)?;
            session.remove_concept_by_id(&id)?;
            println!("Removed {id}");
        }
        ReplCommand::Show => {
            print!("{}", export::render_text(&session.canonical()));
            for concept in session.store().concepts() {
                println!("  {} -> {}", concept.id, concept.asset_id);
            }
        }
        ReplCommand::Export { format, output } => {
            let canonical = session.canonical();
            let bytes = if format.is_local() {
                session.export(format)?
            } else {
                backend
                    .export(format, &canonical)
                    .await
                    .with_context(|| format!("{format} export failed"))?
            };
            let path = output.unwrap_or_else(|| {
                export_cmd::default_output_path(&canonical, format, chrono::Local::now().date_naive())
            });
            std::fs::write(&path, &bytes)
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("Exported {format} to {}", path.display());
        }
        ReplCommand::Save => {
            resolve::write_workspace(workspace, session.plan(), session.store())?;
            println!("Saved {}", workspace.display());
        }
        ReplCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// In live mode files go through the backend's `/upload`; in simulated mode
/// they are ingested locally.
async fn upload(session: &mut Session, backend: &BackendClient, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let reply = match session.mode() {
        Mode::Live => {
            let upload = backend
                .upload(&filename, bytes)
                .await
                .context("upload failed")?;
            session.ingest_upload_response(upload).await.cloned()
        }
        Mode::Simulated => {
            let content = String::from_utf8_lossy(&bytes);
            session.ingest_upload(&filename, &content).await.cloned()
        }
    };
    println!("Uploaded {filename}");
    report_turn(session, reply);
    Ok(())
}

fn report_turn(session: &Session, reply: Option<Message>) {
    match (reply, session.last_error()) {
        (Some(message), _) => print_message(&message),
        (None, Some(error)) => eprintln!("! {error}"),
        (None, None) => {}
    }
}

fn print_transcript(messages: &[Message]) {
    for message in messages {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    println!("{who}: {}\n", message.content);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent() {
        assert_eq!(
            parse_command("  Launch in May  ").unwrap(),
            ReplCommand::Say("Launch in May".to_string())
        );
    }

    #[test]
    fn set_keeps_spaces_in_value() {
        assert_eq!(
            parse_command("/set smp Fresh every   morning").unwrap(),
            ReplCommand::Set {
                field: PlanField::SingleMindedProposition,
                value: "Fresh every   morning".to_string(),
            }
        );
    }

    #[test]
    fn row_set_parses_field_name() {
        assert_eq!(
            parse_command("/row set row-2 channel Email newsletter").unwrap(),
            ReplCommand::RowSet {
                row: "row-2".to_string(),
                field: MatrixField::Channel,
                value: "Email newsletter".to_string(),
            }
        );
    }

    #[test]
    fn row_set_with_empty_value_clears() {
        assert_eq!(
            parse_command("/row set 1 message").unwrap(),
            ReplCommand::RowSet {
                row: "1".to_string(),
                field: MatrixField::Message,
                value: String::new(),
            }
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = parse_command("/row set 1 colour red").unwrap_err();
        assert!(err.contains("colour"), "{err}");
    }

    #[test]
    fn concept_commands() {
        assert_eq!(parse_command("/concept add").unwrap(), ReplCommand::ConceptAdd);
        assert_eq!(
            parse_command("/concept rm concept-4").unwrap(),
            ReplCommand::ConceptRemove("concept-4".to_string())
        );
        assert_eq!(
            parse_command("/concept set 4 title Sunrise run").unwrap(),
            ReplCommand::ConceptSet {
                concept: "4".to_string(),
                field: ConceptField::Title,
                value: "Sunrise run".to_string(),
            }
        );
    }

    #[test]
    fn mode_with_and_without_argument() {
        assert_eq!(parse_command("/mode").unwrap(), ReplCommand::Mode(None));
        assert_eq!(
            parse_command("/mode simulated").unwrap(),
            ReplCommand::Mode(Some(Mode::Simulated))
        );
        assert!(parse_command("/mode offline").is_err());
    }

    #[test]
    fn export_with_optional_path() {
        assert_eq!(
            parse_command("/export TXT").unwrap(),
            ReplCommand::Export {
                format: ExportFormat::Txt,
                output: None,
            }
        );
        assert_eq!(
            parse_command("/export pdf out/brief.pdf").unwrap(),
            ReplCommand::Export {
                format: ExportFormat::Pdf,
                output: Some(PathBuf::from("out/brief.pdf")),
            }
        );
    }

    #[test]
    fn missing_arguments_are_reported() {
        assert!(parse_command("/upload").unwrap_err().contains("missing path"));
        assert!(parse_command("/row rm").unwrap_err().contains("missing row id"));
        assert!(parse_command("/frobnicate").is_err());
    }

    #[tokio::test]
    async fn simulated_session_applies_edits() {
        let tmp = tempfile::TempDir::new().unwrap();
        let workspace = tmp.path().join("brief.toml");
        let backend = BackendClient::default();
        let mut session = Session::new(Mode::Simulated, Box::new(BackendAssistant::new(backend.clone())));

        for line in [
            "/row add",
            "/row add",
            "/row set 2 channel Radio",
            "/row rm row-1",
            "/concept add",
            "/set name Autumn",
            "/save",
        ] {
            let command = parse_command(line).unwrap();
            execute(&mut session, &backend, &workspace, command).await.unwrap();
        }

        let (doc, store) = resolve::require_workspace(&workspace).unwrap();
        assert_eq!(doc.campaign_name, "Autumn");
        assert_eq!(store.rows().len(), 1);
        assert_eq!(store.rows()[0].id, "row-2");
        assert_eq!(store.rows()[0].channel, "Radio");
        assert_eq!(store.concepts()[0].asset_id, "row-2");
    }
}
