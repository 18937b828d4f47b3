use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};

use heatmap_core::{Change, HeatmapConfig};
use heatmap_gitpulse::aggregate::Aggregator;
use heatmap_gitpulse::tree::PathTree;
use heatmap_review::gerrit::{GerritClient, QueryOptions};
use heatmap_review::patches::GitPatchSource;

#[derive(Parser)]
#[command(
    name = "heatmap",
    version,
    about = "Churn heat maps of a Gerrit review queue",
    long_about = "Builds a heat map of where a project's review queue spends its time.\n\n\
                   Every open and merged change of a Gerrit project is diffed against the local\n\
                   clone, and its added and removed lines are credited to each directory and file\n\
                   it touches, weighted by how long the change has been waiting for review.\n\n\
                   Examples:\n  \
                     heatmap heatmap > heatmap.json       Query Gerrit and write the heat map\n  \
                     heatmap heatmap --changes rows.json  Use saved query output instead of ssh\n  \
                     heatmap patches nova/virt nova/api   List open changes touching directories\n  \
                     heatmap changes nova/virt            List open changes by dependency\n  \
                     heatmap init                         Create a .heatmap.toml config file"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .heatmap.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate review churn into a JSON heat map
    #[command(long_about = "Aggregate review churn into a JSON heat map.\n\n\
        Counts the lines of every file in the working tree, then applies the current\n\
        patch set of each open or merged change. Open changes age until now; merged\n\
        changes age until their approval. Diffs missing from the clone are fetched\n\
        from the configured remote.\n\n\
        Examples:\n  heatmap heatmap --output heatmap.json\n  heatmap heatmap --limit 200 --compact\n  heatmap heatmap --changes rows.json --path ~/src/nova")]
    Heatmap {
        /// Working tree of the project (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Write the heat map to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Read newline-delimited change rows from a file instead of querying Gerrit
        #[arg(long)]
        changes: Option<PathBuf>,

        /// Maximum number of changes to aggregate; 0 means no limit
        #[arg(long)]
        limit: Option<usize>,

        /// Leading path segments to drop from diff paths
        #[arg(long)]
        prune: Option<usize>,

        /// Emit compact JSON instead of indented JSON
        #[arg(long)]
        compact: bool,
    },
    /// List open changes that touch the given directories
    #[command(long_about = "List open changes that touch the given directories.\n\n\
        Prints one `subject: url` line per open change whose current patch set changes\n\
        a file in, or equal to, any of the directories.\n\n\
        Example:\n  heatmap patches nova/scheduler nova/conductor")]
    Patches {
        /// Directories, relative to the project root
        #[arg(required = true)]
        dirs: Vec<String>,
    },
    /// List open changes grouped under the changes they depend on
    #[command(long_about = "List open changes grouped under the changes they depend on.\n\n\
        Prints owner, subject and url of every open change in aligned columns. A change\n\
        is indented below the change it depends on; siblings are ordered by last update.\n\
        With directories, only changes touching one of them are listed.\n\n\
        Examples:\n  heatmap changes\n  heatmap changes nova/scheduler nova/conductor")]
    Changes {
        /// Only list changes touching these directories
        dirs: Vec<String>,
    },
    /// Create a default .heatmap.toml configuration file
    #[command(long_about = "Create a default .heatmap.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .heatmap.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");

    println!("heatmap v{version} - where does review time go?\n");

    println!("Quick start:");
    println!("  heatmap init                      Create a .heatmap.toml config file");
    println!("  heatmap heatmap > heatmap.json    Build the heat map of the review queue\n");

    println!("All commands:");
    println!("  heatmap   Aggregate review churn into a JSON heat map");
    println!("  patches   List open changes touching directories");
    println!("  changes   List open changes by dependency");
    println!("  init      Create default configuration\n");

    println!("Run 'heatmap <command> --help' for details.");
}

const DEFAULT_CONFIG: &str = r#"# Review heat map configuration

[gerrit]
# host = "review.openstack.org"
# port = 29418
# project = "openstack/nova"
# branch = "master"
# limit = 1000          # 0 = unlimited

[git]
# Remote that review refs (refs/changes/...) are fetched from
# remote = "gerrit"

[tree]
# Leading diff path segments to drop ("a/" of "a/nova/api.py")
# prune_segments = 1
"#;

fn load_config(path: Option<&Path>) -> Result<HeatmapConfig> {
    let config = match path {
        Some(path) => HeatmapConfig::from_file(path)
            .wrap_err_with(|| format!("loading {}", path.display()))?,
        None => {
            let default_path = Path::new(".heatmap.toml");
            if default_path.exists() {
                HeatmapConfig::from_file(default_path).wrap_err("loading .heatmap.toml")?
            } else {
                HeatmapConfig::default()
            }
        }
    };
    Ok(config)
}

/// Changes from a saved query output file; stats rows are skipped.
fn read_changes_file(path: &Path, limit: usize) -> Result<Vec<Change>> {
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    let mut changes = heatmap_review::gerrit::parse_page(&content)
        .wrap_err_with(|| format!("parsing {}", path.display()))?
        .changes;
    if limit > 0 {
        changes.truncate(limit);
    }
    Ok(changes)
}

fn query_changes(config: &HeatmapConfig, limit: usize) -> Result<Vec<Change>> {
    let client = GerritClient::new(&config.gerrit);
    let options = QueryOptions {
        current_patch_set: true,
        ..QueryOptions::default()
    };
    let changes = client
        .query(
            heatmap_review::gerrit::heatmap_terms(&config.gerrit),
            options,
            limit,
        )
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(changes)
}

struct HeatmapArgs {
    path: PathBuf,
    output: Option<PathBuf>,
    changes: Option<PathBuf>,
    limit: Option<usize>,
    prune: Option<usize>,
    compact: bool,
}

fn run_heatmap(config: &HeatmapConfig, args: HeatmapArgs, verbose: bool) -> Result<()> {
    let limit = args.limit.unwrap_or(config.gerrit.limit);
    let prune = args.prune.unwrap_or(config.tree.prune_segments);

    let mut tree = PathTree::new();
    let files = heatmap_gitpulse::baseline::seed_baseline(&mut tree, &args.path, prune)
        .wrap_err_with(|| format!("counting lines under {}", args.path.display()))?;
    if verbose {
        eprintln!(
            "Counted {} files, {} lines under {}",
            files,
            tree.node(tree.root()).lines,
            args.path.display()
        );
    }

    let changes = match &args.changes {
        Some(path) => read_changes_file(path, limit)?,
        None => {
            if verbose {
                eprintln!(
                    "Querying {} for {} ({})",
                    config.gerrit.host, config.gerrit.project, config.gerrit.branch
                );
            }
            query_changes(config, limit)?
        }
    };

    let patches = GitPatchSource::open(&args.path, &config.git.remote)?;
    let now = chrono::Utc::now().timestamp();
    let mut aggregator = Aggregator::new(&mut tree, now).with_prune_segments(prune);

    let total = changes.len();
    let progress = if std::io::stderr().is_terminal() && !verbose {
        let pb = indicatif::ProgressBar::new(total as u64);
        pb.set_style(
            indicatif::ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} changes ({elapsed})",
            )
            .into_diagnostic()?
            .progress_chars("=> "),
        );
        Some(pb)
    } else {
        None
    };

    let (mut open, mut merged) = (0usize, 0usize);
    for (i, change) in changes.iter().enumerate() {
        if verbose {
            eprintln!("*** {}/{}: {}", i + 1, total, change.subject);
        }

        let summary = aggregator.apply_change(change, &patches).inspect_err(|_| {
            if let Some(pb) = &progress {
                pb.abandon_with_message("Failed");
            }
        })?;

        match summary.status {
            heatmap_core::ChangeStatus::Open => open += 1,
            heatmap_core::ChangeStatus::Merged => merged += 1,
        }
        if verbose {
            eprintln!(
                "    {} age {} files {} +{} -{}",
                summary.status, summary.age, summary.files, summary.churn.added, summary.churn.removed
            );
        }
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    if verbose {
        eprintln!("Aggregated {open} open and {merged} merged changes.");
    }

    let pretty = !args.compact;
    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("creating {}", path.display()))?;
            heatmap_gitpulse::export::write_json(&tree, std::io::BufWriter::new(file), pretty)?;
            if verbose {
                eprintln!("Wrote {}", path.display());
            }
        }
        None => {
            heatmap_gitpulse::export::write_json(&tree, std::io::stdout().lock(), pretty)?;
        }
    }

    Ok(())
}

fn run_patches(config: &HeatmapConfig, dirs: &[String], verbose: bool) -> Result<()> {
    let client = GerritClient::new(&config.gerrit);
    let options = QueryOptions {
        current_patch_set: true,
        files: true,
        ..QueryOptions::default()
    };

    let mut scanned = 0usize;
    for change in client.query(heatmap_review::gerrit::open_terms(&config.gerrit), options, 0) {
        let change = change?;
        scanned += 1;
        if heatmap_review::dirs::touches_dirs(&change, dirs) {
            println!("{}", heatmap_review::dirs::format_change(&change));
        }
    }

    if verbose {
        eprintln!("Scanned {scanned} open changes.");
    }
    Ok(())
}

fn run_changes(config: &HeatmapConfig, dirs: &[String], verbose: bool) -> Result<()> {
    let client = GerritClient::new(&config.gerrit);
    let options = QueryOptions {
        current_patch_set: true,
        files: !dirs.is_empty(),
        dependencies: true,
    };

    let mut changes = Vec::new();
    for change in client.query(heatmap_review::gerrit::open_terms(&config.gerrit), options, 0) {
        let change = change?;
        if dirs.is_empty() || heatmap_review::dirs::touches_dirs(&change, dirs) {
            changes.push(change);
        }
    }

    let listing = heatmap_review::changes::ChangeListing::new(changes);
    print!("{listing}");

    if verbose {
        eprintln!("Listed {} open changes.", listing.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    if cli.verbose {
        eprintln!(
            "gerrit: {}:{} project {} branch {}",
            config.gerrit.host, config.gerrit.port, config.gerrit.project, config.gerrit.branch
        );
    }

    match cli.command {
        None => {
            print_welcome();
        }
        Some(Command::Heatmap {
            path,
            output,
            changes,
            limit,
            prune,
            compact,
        }) => {
            let args = HeatmapArgs {
                path,
                output,
                changes,
                limit,
                prune,
                compact,
            };
            run_heatmap(&config, args, cli.verbose)?;
        }
        Some(Command::Patches { dirs }) => {
            run_patches(&config, &dirs, cli.verbose)?;
        }
        Some(Command::Changes { dirs }) => {
            run_changes(&config, &dirs, cli.verbose)?;
        }
        Some(Command::Init) => {
            let path = Path::new(".heatmap.toml");
            if path.exists() {
                miette::bail!(".heatmap.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .heatmap.toml with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "heatmap", &mut std::io::stdout());
        }
    }

    Ok(())
}
