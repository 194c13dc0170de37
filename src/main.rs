use anyhow::{bail, Context};
use clap::{ArgGroup, Parser};
use source_flow::{
    patterns::parse_pattern_lines, render_output, session::SESSION_FILE_NAME, Config, Pipeline,
    Session,
};
use std::{fs, path::PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "source-flow",
    version,
    author,
    about = "Turn a project directory into a prompt for AI assistants",
    long_about = "Turn a project directory into an ordered, size-bounded prompt.\n\n\
    The output starts with a directory tree followed by the contents of every \
    file that survives the ignore patterns. Large projects are split into \
    numbered parts that can be pasted one at a time.\n\n\
    USAGE EXAMPLES:\n  \
      # Process the current directory\n  \
      source-flow\n\n  \
      # Process a project and print the result\n  \
      source-flow --dir ./my-app --stdout\n\n  \
      # Extra ignore patterns\n  \
      source-flow -i '*.snap' -i fixtures/ --ignore-file .promptignore\n\n  \
      # Copy the next part of a previous run\n  \
      source-flow --out ./out --next"
)]
#[command(group(ArgGroup::new("session").args(["next", "previous", "reset"])))]
struct Cli {
    /// Project directory to process
    #[arg(short, long, default_value = ".", value_name = "PATH")]
    dir: PathBuf,

    /// Project name used in the tree and generated text
    #[arg(short = 'n', long, value_name = "NAME")]
    name: Option<String>,

    /// Output directory for rendered parts
    #[arg(short, long, default_value = "out", value_name = "PATH")]
    out: PathBuf,

    /// Output filename pattern
    #[arg(long, default_value = "part_{index:03}.{ext}")]
    pattern: String,

    /// Extra ignore pattern (can be used multiple times)
    #[arg(short = 'i', long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// File of extra ignore patterns, one per line
    #[arg(long, value_name = "FILE")]
    ignore_file: Option<PathBuf>,

    /// Do not apply the built-in ignore patterns
    #[arg(long)]
    no_default_ignores: bool,

    /// Do not apply the project's .gitignore
    #[arg(long)]
    no_gitignore: bool,

    /// Character budget per part
    #[arg(long, value_name = "CHARS")]
    chunk_budget: Option<usize>,

    /// Print the rendered parts to stdout instead of writing files
    #[arg(long, conflicts_with = "json")]
    stdout: bool,

    /// Print the processed output as JSON instead of writing files
    #[arg(long)]
    json: bool,

    /// Dry run (don't write files)
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the next uncopied part of a previous run and mark it copied
    #[arg(long)]
    next: bool,

    /// Print the most recently copied part again
    #[arg(long)]
    previous: bool,

    /// Mark every part of a previous run as not copied
    #[arg(long)]
    reset: bool,
}

impl Cli {
    const fn session_action(&self) -> bool {
        self.next || self.previous || self.reset
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    if cli.session_action() {
        return run_session_action(&cli);
    }

    let mut patterns: Vec<String> = cli
        .ignore
        .iter()
        .flat_map(|p| parse_pattern_lines(p))
        .collect();
    if let Some(path) = &cli.ignore_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read ignore file {}", path.display()))?;
        patterns.extend(parse_pattern_lines(&text));
    }

    let mut builder = Config::builder()
        .root_dir(&cli.dir)
        .output_dir(&cli.out)
        .output_pattern(&cli.pattern)
        .ignore_patterns(patterns)
        .use_default_ignores(!cli.no_default_ignores)
        .use_gitignore(!cli.no_gitignore)
        .dry_run(cli.dry_run);

    if let Some(name) = &cli.name {
        builder = builder.project_name(name);
    }

    if let Some(budget) = cli.chunk_budget {
        builder = builder.chunk_char_budget(budget);
    }

    let config = builder.build().context("Failed to build configuration")?;
    let pipeline = Pipeline::new(config).context("Failed to create pipeline")?;

    if cli.stdout || cli.json {
        let output = pipeline
            .build_output()
            .context("Processing failed")?;

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", render_output(&output));
        }
        return Ok(());
    }

    let stats = pipeline.run().context("Pipeline execution failed")?;
    stats.print_summary();

    Ok(())
}

fn run_session_action(cli: &Cli) -> anyhow::Result<()> {
    let path = cli.out.join(SESSION_FILE_NAME);
    let mut session = Session::load(&path)
        .with_context(|| format!("No previous run found in {}", cli.out.display()))?;
    let total = session.output.chunk_count();

    if cli.reset {
        session.reset();
        session.save(&path)?;
        eprintln!("Session reset: {total} part(s) ready to copy");
        return Ok(());
    }

    let (index, text) = if cli.next {
        session.copy_next()?
    } else if cli.previous {
        session.copy_previous()?
    } else {
        bail!("No session action given");
    };

    session.save(&path)?;
    println!("{text}");
    eprintln!("Part {} of {}", index + 1, total);

    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("source_flow=info"),
        1 => EnvFilter::new("source_flow=debug"),
        _ => EnvFilter::new("source_flow=trace"),
    };

    // stdout carries chunk text in some modes
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}
