//! Execution console command line tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console_client::{
    render, AgentSession, ClientConfig, ConsoleClient, ExecutionApi, ExecutionJobTracker,
    HtmlProjector, Language, PollPolicy, Workflow, WorkflowManager,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "consolectl")]
#[command(version, about = "Execution Console Command Line Tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Console server URL (overrides CONSOLE_SERVER_URL)
    #[arg(long, global = true)]
    server_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit code and wait for the execution to finish
    /// Examples:
    ///     consolectl run --language python --code 'print(1)'
    ///     consolectl run -l python -f script.py --set timeout=10 --html
    #[command(verbatim_doc_comment)]
    Run {
        /// Language of the snippet (python, java, javascript, bash)
        #[arg(short, long, value_parser = parse_language)]
        language: Language,

        /// Inline code
        #[arg(short, long, conflicts_with = "file")]
        code: Option<String>,

        /// Read code from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Extra request options (format: key=value), can be repeated
        #[arg(long = "set", value_name = "KEY=VALUE")]
        options: Vec<String>,

        /// Print the rendered HTML view instead of raw output
        #[arg(long, conflicts_with = "json")]
        html: bool,

        /// Emit only the JSON outcome
        #[arg(short, long)]
        json: bool,
    },
    /// Fetch the current status of an execution
    Status {
        /// Execution ID
        execution_id: String,

        /// Emit only the JSON response
        #[arg(short, long)]
        json: bool,
    },
    /// Workflow management
    Workflows {
        #[command(subcommand)]
        command: WorkflowCommand,
    },
    /// Replace the contents of a file on the console server
    UpdateCode {
        /// Target path on the server
        #[arg(long)]
        file_path: String,

        /// Local file holding the new code
        #[arg(long)]
        code_file: PathBuf,
    },
    /// Run code through a synchronous language tool
    Tool {
        /// Tool language (python or java)
        #[arg(value_parser = parse_language)]
        language: Language,

        /// File holding the code
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Generate and run Java code
    Java {
        #[command(subcommand)]
        command: JavaCommand,
    },
    /// Ask the research team to analyze a codebase
    Analyze {
        #[arg(long)]
        path: String,

        /// Print the result as an HTML fragment
        #[arg(long)]
        html: bool,
    },
    /// Ask the debug team to solve a problem
    Solve {
        description: String,

        /// Print the result as an HTML fragment
        #[arg(long)]
        html: bool,
    },
    /// Ask the debug team to improve tests for a feature
    ImproveTests {
        description: String,

        /// Print the result as an HTML fragment
        #[arg(long)]
        html: bool,
    },
    /// Send a message as an agent
    Message {
        #[arg(long, default_value = "user")]
        sender: String,

        #[arg(long, default_value = "user")]
        role: String,

        text: String,
    },
}

#[derive(Subcommand)]
enum WorkflowCommand {
    /// List workflows
    List {
        /// Print the rendered HTML list
        #[arg(long)]
        html: bool,
    },
    /// Execute a workflow
    Run { workflow_id: String },
    /// Register a workflow from a JSON definition
    Create { file: PathBuf },
    /// Fetch workflow status
    Status { workflow_id: String },
}

#[derive(Subcommand)]
enum JavaCommand {
    /// Generate Java code (and its test results) from a prompt
    Generate {
        prompt: String,

        /// Print the test results as an HTML fragment
        #[arg(long)]
        html: bool,
    },
    /// Compile and run a Java file
    Run {
        /// File holding the code
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn parse_language(s: &str) -> Result<Language, String> {
    s.parse::<Language>().map_err(|e| e.to_string())
}

/// Turn `key=value` pairs into request options. Values that parse as JSON
/// keep their type; anything else is sent as a string.
fn build_options(pairs: &[String]) -> Result<serde_json::Map<String, serde_json::Value>> {
    let mut options = serde_json::Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Invalid option '{}', expected KEY=VALUE", pair))?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        options.insert(key.trim().to_string(), value);
    }
    Ok(options)
}

fn read_code(code: Option<String>, file: Option<&PathBuf>) -> Result<String> {
    match (code, file) {
        (Some(code), _) => Ok(code),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read code file: {}", path.display())),
        (None, None) => anyhow::bail!("Provide code with --code or --file"),
    }
}

fn print_optional(result: Option<String>) {
    println!("{}", result.unwrap_or_default());
}

/// Print team output as raw text, or as an HTML fragment when asked.
fn print_result(result: Option<String>, html: bool) {
    if html {
        print_optional(result.map(|r| render::format_output(&r)));
    } else {
        print_optional(result);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,console_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("Failed to load configuration")?;
    if let Some(url) = cli.server_url {
        config.server_url = url;
    }
    tracing::debug!(server_url = %config.server_url, "Configuration loaded");

    let client = ConsoleClient::from_config(&config);

    match cli.command {
        Commands::Run {
            language,
            code,
            file,
            options,
            html,
            json,
        } => {
            let code = read_code(code, file.as_ref())?;
            let options = build_options(&options)?;

            let projector = Arc::new(HtmlProjector::new());
            let tracker = ExecutionJobTracker::new(client)
                .with_observer(projector.clone())
                .with_policy(PollPolicy::from_config(&config));

            let outcome = tracker.submit(&code, language, options).await;

            if html {
                if let Some(view) = projector.latest() {
                    println!("{}", view.to_html());
                }
            }

            let outcome = outcome?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if !html {
                if let Some(result) = &outcome.result {
                    print!("{}", result);
                }
                if let Some(error) = &outcome.error {
                    eprintln!("Error: {}", error);
                }
            }

            if !outcome.success {
                std::process::exit(1);
            }
        }
        Commands::Status { execution_id, json } => {
            let report = client.execution_status(&execution_id).await?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "execution_id": report.execution_id.as_deref().unwrap_or(&execution_id),
                        "status": report.status.to_string(),
                        "result": report.result,
                        "error": report.error,
                    })
                );
            } else {
                println!("Execution: {}", execution_id);
                println!("Status:    {}", report.status);
                if let Some(error) = report.error.filter(|e| !e.is_empty()) {
                    println!("Error:     {}", error);
                }
                if let Some(result) = report.result {
                    println!("{}", result);
                }
            }
        }
        Commands::Workflows { command } => {
            let mut manager = WorkflowManager::new(client);
            match command {
                WorkflowCommand::List { html } => {
                    manager.load_workflows().await?;
                    if html {
                        println!("{}", manager.render_list());
                    } else {
                        for workflow in manager.workflows() {
                            println!(
                                "{}\t{}\t{}",
                                workflow.id,
                                workflow.name,
                                workflow.status.as_deref().unwrap_or("-")
                            );
                        }
                    }
                }
                WorkflowCommand::Run { workflow_id } => {
                    manager.load_workflows().await?;
                    let result = manager.execute_workflow(&workflow_id).await?;
                    println!("Workflow completed successfully");
                    print_optional(result);
                }
                WorkflowCommand::Create { file } => {
                    let content = fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read workflow file: {}", file.display()))?;
                    let workflow: Workflow =
                        serde_json::from_str(&content).context("Failed to parse workflow JSON")?;
                    let id = manager.create_workflow(&workflow).await?;
                    println!("{}", id);
                }
                WorkflowCommand::Status { workflow_id } => {
                    let status = manager.workflow_status(&workflow_id).await?;
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
            }
        }
        Commands::UpdateCode {
            file_path,
            code_file,
        } => {
            let code = fs::read_to_string(&code_file)
                .with_context(|| format!("Failed to read code file: {}", code_file.display()))?;
            client.update_code(&file_path, &code).await?;
            println!("Code updated successfully!");
        }
        Commands::Tool { language, file } => {
            let code = read_code(None, Some(&file))?;
            print_optional(client.run_tool(language, &code).await?);
        }
        Commands::Java { command } => match command {
            JavaCommand::Generate { prompt, html } => {
                let generated = client.generate_java(&prompt).await?;
                println!("{}", generated.code);

                if let Some(tests) = generated.tests.filter(|t| !t.is_empty()) {
                    if html {
                        println!("{}", render::format_tests(&tests));
                    } else {
                        println!();
                        for test in &tests {
                            let mark = if test.passed { "PASS" } else { "FAIL" };
                            match test.message.as_deref().filter(|m| !m.is_empty()) {
                                Some(message) => println!("{} {}: {}", mark, test.name, message),
                                None => println!("{} {}", mark, test.name),
                            }
                        }
                    }
                }
            }
            JavaCommand::Run { file } => {
                let code = read_code(None, Some(&file))?;
                print_optional(client.run_java(&code).await?);
            }
        },
        Commands::Analyze { path, html } => {
            print_result(client.analyze_codebase(&path).await?, html);
        }
        Commands::Solve { description, html } => {
            print_result(client.solve_problem(&description).await?, html);
        }
        Commands::ImproveTests { description, html } => {
            print_result(client.improve_tests(&description).await?, html);
        }
        Commands::Message { sender, role, text } => {
            let mut session = AgentSession::new(client, sender, role);
            let reply = session.send_message(&text).await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_options_keeps_json_types() {
        let options = build_options(&[
            "timeout=10".to_string(),
            "verbose=true".to_string(),
            "name=demo".to_string(),
        ])
        .unwrap();

        assert_eq!(options["timeout"], serde_json::json!(10));
        assert_eq!(options["verbose"], serde_json::json!(true));
        assert_eq!(options["name"], serde_json::json!("demo"));
    }

    #[test]
    fn test_build_options_rejects_missing_separator() {
        assert!(build_options(&["timeout".to_string()]).is_err());
    }

    #[test]
    fn test_read_code_prefers_inline() {
        let code = read_code(Some("print(1)".to_string()), None).unwrap();
        assert_eq!(code, "print(1)");
        assert!(read_code(None, None).is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "consolectl",
            "run",
            "--language",
            "python",
            "--code",
            "print(1)",
            "--set",
            "timeout=5",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { language, code, options, .. } => {
                assert_eq!(language, Language::Python);
                assert_eq!(code.as_deref(), Some("print(1)"));
                assert_eq!(options, vec!["timeout=5".to_string()]);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_cli_parses_java_generate() {
        let cli = Cli::try_parse_from(["consolectl", "java", "generate", "sort a list", "--html"])
            .unwrap();

        match cli.command {
            Commands::Java {
                command: JavaCommand::Generate { prompt, html },
            } => {
                assert_eq!(prompt, "sort a list");
                assert!(html);
            }
            _ => panic!("expected java generate command"),
        }
    }

    #[test]
    fn test_team_commands_default_to_raw_text() {
        let cli = Cli::try_parse_from(["consolectl", "analyze", "--path", "./src"]).unwrap();
        assert!(matches!(cli.command, Commands::Analyze { html: false, .. }));

        let cli = Cli::try_parse_from(["consolectl", "solve", "flaky test", "--html"]).unwrap();
        assert!(matches!(cli.command, Commands::Solve { html: true, .. }));
    }

    #[test]
    fn test_cli_rejects_unknown_language() {
        assert!(Cli::try_parse_from(["consolectl", "run", "-l", "cobol", "-c", "x"]).is_err());
    }
}
