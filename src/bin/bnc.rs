use std::path::PathBuf;

use bnc_rs::compiler::{Artifact, Compiler, Config, DiagramType, Strategy};
use bnc_rs::error::Error;
use clap::{ArgAction, Parser};
use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;

#[derive(Parser)]
#[command(author, version, about = "Compile Bayesian networks into WPBDDs and AND/OR multigraphs")]
struct Cli {
    /// Hugin network file
    #[arg(value_name = "NET")]
    network: PathBuf,

    /// Compilation strategy: bottomup, topdown or hybrid
    #[arg(short = 'c', long, default_value = "hybrid")]
    strategy: Strategy,

    /// Diagram type: wpbdd, mg or tdmg
    #[arg(short = 't', long = "type", default_value = "tdmg")]
    diagram: DiagramType,

    /// Write a file: part, map, dot, elim, var, lit, circuit, comp, uai, pseudo or spanning
    #[arg(short = 'w', long = "write", value_name = "TYPE[=FILE]")]
    write: Vec<String>,

    /// Read a file: part, elim, var, lit, pseudo or comp
    #[arg(short = 'r', long = "read", value_name = "TYPE[=FILE]")]
    read: Vec<String>,

    /// Set an option, e.g. `-o collapse=1 -o order=10`
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    options: Vec<String>,

    /// Compile in parallel, one worker per CPU unless `workers` is set
    #[arg(short = 'p', long)]
    parallel: bool,

    /// More logging (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn artifact_spec(spec: &str) -> Result<(Artifact, Option<PathBuf>)> {
    let (name, file) = match spec.split_once('=') {
        Some((name, file)) => (name, Some(PathBuf::from(file))),
        None => (spec, None),
    };
    let artifact: Artifact = name.parse().map_err(|e: String| eyre!(e))?;
    Ok((artifact, file))
}

/// Inputs that others depend on come first.
fn read_rank(artifact: Artifact) -> u8 {
    match artifact {
        Artifact::Partition => 0,
        Artifact::Composition => 1,
        _ => 2,
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => simplelog::LevelFilter::Warn,
        (false, 0) => simplelog::LevelFilter::Info,
        (false, 1) => simplelog::LevelFilter::Debug,
        (false, _) => simplelog::LevelFilter::Trace,
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut config = Config {
        diagram: cli.diagram,
        strategy: cli.strategy,
        ..Config::default()
    };
    if cli.parallel {
        config.workers = 0;
    }
    for assignment in &cli.options {
        config.assign(assignment)?;
    }

    let reads = cli
        .read
        .iter()
        .map(|s| artifact_spec(s))
        .collect::<Result<Vec<_>>>()?;
    let mut writes = cli
        .write
        .iter()
        .map(|s| artifact_spec(s))
        .collect::<Result<Vec<_>>>()?;
    for (artifact, _) in &reads {
        if !artifact.is_readable() {
            bail!("cannot read '{}' files", artifact);
        }
        if writes.iter().any(|(w, _)| w == artifact) {
            bail!("option '{}' given to both -r and -w", artifact);
        }
    }
    if writes.iter().any(|(w, _)| *w == Artifact::Circuit) && !writes.iter().any(|(w, _)| *w == Artifact::Mapping) {
        writes.push((Artifact::Mapping, None));
    }

    log::info!("Loading network from {:?}", cli.network);
    let mut compiler = Compiler::from_file(&cli.network, config)?;
    for (artifact, file) in reads.iter().chain(&writes) {
        if let Some(file) = file {
            compiler.paths_mut().set(*artifact, file);
        }
    }

    if writes.iter().any(|(w, _)| *w == Artifact::Uai) {
        for path in compiler.write(Artifact::Uai)? {
            println!("Wrote UAI network to {}", path.display());
        }
        return Ok(());
    }

    let mut reads: Vec<Artifact> = reads.into_iter().map(|(a, _)| a).collect();
    reads.sort_by_key(|&a| read_rank(a));
    for artifact in reads {
        compiler.read(artifact)?;
    }

    let stats = compiler.compile()?;
    println!("{}", stats);

    for (artifact, _) in &writes {
        match compiler.write(*artifact) {
            Ok(paths) => {
                for path in paths {
                    println!("Wrote {} to {}", artifact, path.display());
                }
            }
            Err(Error::Unsupported(reason)) => log::warn!("skipping '{}': {}", artifact, reason),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
