//! prdtask - Markdown-embedded task tracking
//!
//! Command-line front end over the document store: list, inspect and
//! mutate checkbox tasks carrying `PRD-NNNNNN` identifiers inside the
//! workspace's Markdown documents.

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use prdtask::store::CreateAnchor;
use prdtask::{DocumentStore, PrdError, TaskFilter, TaskRecord};

#[derive(Parser)]
#[command(name = "prdtask")]
#[command(version = "0.1.0")]
#[command(about = "Markdown-embedded task tracking with stable identifiers", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Workspace directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks across all tracked documents
    List {
        /// Completion filter: all, completed, or uncompleted
        #[arg(short, long, default_value = "all")]
        filter: TaskFilter,

        /// Restrict to one document
        #[arg(short, long)]
        document: Option<PathBuf>,
    },

    /// Show one task in detail
    Show {
        /// Task identifier, e.g. PRD-100001
        id: String,
    },

    /// Toggle a task's completion state
    Toggle {
        /// Task identifier
        id: String,
    },

    /// Add a new task
    Add {
        /// Task description
        text: String,

        /// Assignee name, with or without the leading @
        #[arg(short, long)]
        assignee: Option<String>,

        /// Target document (defaults to the first tracked one)
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Nest the new task under an existing one
        #[arg(long, value_name = "ID")]
        parent: Option<String>,

        /// Insert at the end of the section opened by this heading line
        #[arg(long, value_name = "LINE", conflicts_with = "parent")]
        section: Option<usize>,
    },

    /// Set a task's assignee
    Assign {
        /// Task identifier
        id: String,

        /// Assignee name, with or without the leading @
        assignee: String,
    },

    /// Remove all assignees from a task
    Unassign {
        /// Task identifier
        id: String,
    },

    /// Convert plain list items into tasks
    Convert {
        /// Document to convert in
        document: PathBuf,

        /// Convert the single item at this line
        #[arg(short, long, value_name = "LINE", conflicts_with = "all")]
        line: Option<usize>,

        /// Convert every plain list item in the document
        #[arg(long)]
        all: bool,

        /// With --all, restrict to the section opened by this heading line
        #[arg(long, value_name = "LINE", requires = "all")]
        section: Option<usize>,
    },

    /// Convert a task back into a plain list item
    Deconvert {
        /// Task identifier
        id: String,
    },

    /// Fix task-line formatting in a document
    Normalize {
        /// Document to normalize
        document: PathBuf,
    },

    /// Report duplicate identifiers in a document
    Duplicates {
        /// Document to inspect
        document: PathBuf,

        /// Rewrite later occurrences with fresh identifiers
        #[arg(long)]
        fix: bool,
    },

    /// Print a Markdown progress report
    Report,

    /// Serve line-delimited JSON requests on stdin/stdout
    Serve,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "prdtask=debug,info"
    } else {
        "prdtask=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let project = cli.project.canonicalize().unwrap_or(cli.project.clone());
    if !project.exists() {
        eprintln!(
            "{} Workspace directory does not exist: {}",
            "Error:".red().bold(),
            project.display()
        );
        std::process::exit(1);
    }

    if let Err(e) = run(&project, cli.command) {
        eprintln!("{} {e}", "Error:".red().bold());
        std::process::exit(e.exit_code());
    }
}

fn run(project: &Path, command: Commands) -> Result<(), PrdError> {
    let mut store = DocumentStore::open(project)?;

    match command {
        Commands::List { filter, document } => {
            let document = document.map(|d| resolve_document(&store, d)).transpose()?;
            let tasks = store.list_tasks(filter, document.as_deref());
            if tasks.is_empty() {
                println!("{}", "No tasks found".dimmed());
                return Ok(());
            }
            for task in &tasks {
                print_task_line(task);
            }
            let done = tasks.iter().filter(|t| t.completed).count();
            println!("\n{done} / {} completed", tasks.len());
        }

        Commands::Show { id } => {
            let task = store.get_task(&id)?;
            print_task_detail(&task);
        }

        Commands::Toggle { id } => {
            let task = store.toggle_task(&id)?;
            let state = if task.completed {
                "completed".green()
            } else {
                "reopened".yellow()
            };
            println!("{} {} {}", state, id.bold(), task.text);
        }

        Commands::Add {
            text,
            assignee,
            document,
            parent,
            section,
        } => {
            let task = if let Some(parent_id) = parent {
                store.create_subtask(&parent_id, &text, assignee.as_deref())?
            } else {
                let document = document.map(|d| resolve_document(&store, d)).transpose()?;
                let anchor = match section {
                    Some(line) => CreateAnchor::UnderHeading(line),
                    None => CreateAnchor::End,
                };
                store.create_task(&text, assignee.as_deref(), document.as_deref(), anchor)?
            };
            println!(
                "{} {} at {}:{}",
                "created".green(),
                task.id.as_deref().unwrap_or("-").bold(),
                task.document.display(),
                task.line + 1
            );
        }

        Commands::Assign { id, assignee } => {
            let task = store.assign_task(&id, &assignee)?;
            println!(
                "{} {} to @{}",
                "assigned".green(),
                id.bold(),
                task.assignees.first().map_or("", String::as_str)
            );
        }

        Commands::Unassign { id } => {
            store.unassign_task(&id)?;
            println!("{} {}", "unassigned".yellow(), id.bold());
        }

        Commands::Convert {
            document,
            line,
            all,
            section,
        } => {
            let document = resolve_document(&store, document)?;
            if all {
                let count = store.convert_all(&document, section)?;
                println!("{} {count} list item(s)", "converted".green());
            } else {
                let line = line.ok_or_else(|| {
                    PrdError::config("convert needs --line <LINE> or --all")
                })?;
                let task = store.convert_line(&document, line)?;
                println!(
                    "{} line {} as {}",
                    "converted".green(),
                    line + 1,
                    task.id.as_deref().unwrap_or("-").bold()
                );
            }
        }

        Commands::Deconvert { id } => {
            store.deconvert_line(&id)?;
            println!("{} {}", "deconverted".yellow(), id.bold());
        }

        Commands::Normalize { document } => {
            let document = resolve_document(&store, document)?;
            let count = store.normalize(&document)?;
            if count == 0 {
                println!("{}", "Already normalized".dimmed());
            } else {
                println!("{} {count} line(s)", "normalized".green());
            }
        }

        Commands::Duplicates { document, fix } => {
            let document = resolve_document(&store, document)?;
            if fix {
                let count = store.fix_duplicates(&document)?;
                println!("{} {count} duplicate line(s)", "rewrote".green());
            } else {
                let groups = store.find_duplicates(&document)?;
                if groups.is_empty() {
                    println!("{}", "No duplicates".dimmed());
                } else {
                    for group in &groups {
                        let lines: Vec<String> =
                            group.lines.iter().map(|l| (l + 1).to_string()).collect();
                        println!(
                            "{} {} on lines {}",
                            "duplicate".red().bold(),
                            group.id,
                            lines.join(", ")
                        );
                    }
                    std::process::exit(2);
                }
            }
        }

        Commands::Report => {
            println!("{}", store.progress_report());
        }

        Commands::Serve => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            prdtask::server::serve(&mut store, BufReader::new(stdin.lock()), stdout.lock())?;
        }
    }

    Ok(())
}

/// Accept document arguments either as tracked absolute paths or
/// workspace-relative ones.
fn resolve_document(store: &DocumentStore, given: PathBuf) -> Result<PathBuf, PrdError> {
    if store.document(&given).is_some() {
        return Ok(given);
    }
    store
        .documents()
        .find(|p| p.ends_with(&given))
        .map(PathBuf::from)
        .ok_or_else(|| {
            PrdError::document(
                given,
                io::Error::new(io::ErrorKind::NotFound, "document is not tracked"),
            )
        })
}

fn print_task_line(task: &TaskRecord) {
    let checkbox = if task.completed {
        "[x]".green()
    } else {
        "[ ]".normal()
    };
    let id = task.id.as_deref().unwrap_or("-");
    let mut line = format!("{checkbox} {} {}", id.cyan(), task.text);
    for assignee in &task.assignees {
        line.push_str(&format!(" {}", format!("@{assignee}").yellow()));
    }
    println!("{line}");
}

fn print_task_detail(task: &TaskRecord) {
    println!(
        "{}  {}",
        task.id.as_deref().unwrap_or("-").cyan().bold(),
        if task.completed {
            "completed".green()
        } else {
            "open".yellow()
        }
    );
    println!("  {}", task.text);
    if !task.assignees.is_empty() {
        let names: Vec<String> = task.assignees.iter().map(|a| format!("@{a}")).collect();
        println!("  assignees: {}", names.join(" "));
    }
    if !task.headers.is_empty() {
        let chain: Vec<&str> = task.headers.iter().map(|h| h.text.as_str()).collect();
        println!("  section: {}", chain.join(" > "));
    }
    println!("  location: {}:{}", task.document.display(), task.line + 1);
    if task.children > 0 {
        println!("  subtasks: {}", task.children);
    }
}
