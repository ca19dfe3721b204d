use anyhow::{Context, Result};
use clap::Parser;
use feature_gen::artifact::{Coordinate, CoordinateQuery, ResolvedArtifact};
use feature_gen::cli::{Cli, Commands};
use feature_gen::generate::{self, BuildContext, GenerateOptions, GenerateSummary};
use feature_gen::graph::ModuleGraph;
use feature_gen::project::{ProjectModel, Workspace};
use feature_gen::repo::{Repository, default_repository};
use feature_gen::resolve::Resolver;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let repo = Repository::new(resolve_repo_path(&cli)?);

    match cli.command.clone() {
        Commands::Generate {
            module,
            workspace,
            optimize,
            class_files,
            scanner,
            log_dir,
            skip,
        } => {
            let summary = if skip {
                info!("skipping feature generation");
                GenerateSummary::skipped("skip requested")
            } else {
                let workspace = match workspace {
                    Some(path) => Workspace::load(&path)?,
                    None => Workspace::single(ProjectModel::load(&module)?),
                };
                let graph = ModuleGraph::new(workspace);
                let current = graph
                    .position(&module)
                    .context("the module descriptor is not part of the workspace")?;
                let scanner = scanner.map(|s| Coordinate::parse(&s)).transpose()?;
                let ctx = BuildContext {
                    repo: &repo,
                    graph: &graph,
                    current,
                };
                generate::generate(
                    &ctx,
                    &GenerateOptions {
                        optimize,
                        class_files,
                        scanner,
                        log_dir,
                    },
                )?
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Resolve {
            module,
            coordinate,
            transitive,
        } => {
            let project = ProjectModel::load(&module)?;
            let resolver = Resolver::new(&repo, &project);
            let artifacts: Vec<ResolvedArtifact> = if transitive {
                let query = CoordinateQuery::parse(&coordinate)?;
                resolver.resolve_with_transitive(&query)?.into_iter().collect()
            } else {
                vec![resolver.resolve(&Coordinate::parse(&coordinate)?)?]
            };
            let result = ResolveResult {
                requested: coordinate,
                count: artifacts.len(),
                artifacts,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn resolve_repo_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.repo.clone() {
        return Ok(p);
    }
    default_repository()
}

#[derive(Debug, Serialize)]
struct ResolveResult {
    requested: String,
    count: usize,
    artifacts: Vec<ResolvedArtifact>,
}
