use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use sage_core::AppBuilder;
use sage_memory::Metadata;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sage", version, about = "Knowledge and FAQ retrieval over MCP")]
struct Cli {
    /// Path to the TOML config (overrides SAGE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Host the knowledge tools
    Serve {
        /// Serve streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,
    },
    /// Chunk a document into the knowledge store and extract FAQs
    Build(BuildArgs),
    /// Answer a question from stored knowledge
    Query {
        #[arg(short, long)]
        question: String,

        #[arg(long)]
        max_results: Option<usize>,
    },
}

#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["file", "text"])))]
struct BuildArgs {
    #[arg(short, long)]
    file: Option<PathBuf>,

    #[arg(short, long)]
    text: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    author: Option<String>,

    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Skip FAQ extraction
    #[arg(long)]
    no_faq: bool,

    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long)]
    chunk_overlap: Option<usize>,
}

impl BuildArgs {
    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        if let Some(title) = &self.title {
            metadata.insert("title".into(), title.clone().into());
        }
        if let Some(author) = &self.author {
            metadata.insert("author".into(), author.clone().into());
        }
        let tags: Vec<serde_json::Value> = self
            .tags
            .iter()
            .map(String::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Into::into)
            .collect();
        if !tags.is_empty() {
            metadata.insert("tags".into(), tags.into());
        }
        metadata
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the stdio transport and command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut app = AppBuilder::from_env(cli.config.as_deref()).await?;
    tracing::debug!(path = %app.config_path().display(), "configuration loaded");

    match cli.command {
        Command::Serve { http } => serve(&app, http).await,
        Command::Build(args) => {
            let rag = &mut app.config_mut().rag;
            if let Some(size) = args.chunk_size {
                rag.chunk_size = size;
            }
            if let Some(overlap) = args.chunk_overlap {
                rag.chunk_overlap = overlap;
            }
            app.config().validate()?;
            build(&app, &args).await
        }
        Command::Query {
            question,
            max_results,
        } => {
            if let Some(n) = max_results {
                app.config_mut().rag.max_search_results = n;
            }
            query(&app, &question).await
        }
    }
}

async fn serve(app: &AppBuilder, http: bool) -> anyhow::Result<()> {
    let server = app.build_server().await?;
    if !http {
        sage_mcp::serve_stdio(server).await?;
        return Ok(());
    }

    let cfg = &app.config().server;
    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    sage_mcp::serve_http(server, listener, &cfg.path, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
    })
    .await?;
    Ok(())
}

async fn build(app: &AppBuilder, args: &BuildArgs) -> anyhow::Result<()> {
    let ctx = app.build_context()?;
    let builder = ctx.builder();
    let metadata = args.metadata();
    let extract_faq = !args.no_faq;

    let result = match (&args.file, &args.text) {
        (Some(path), _) => builder.build_from_file(path, &metadata, extract_faq).await,
        (None, Some(text)) => builder.build_from_text(text, &metadata, extract_faq).await,
        (None, None) => {
            ctx.shutdown().await;
            anyhow::bail!("either --file or --text is required");
        }
    };
    ctx.shutdown().await;

    let report = result?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn query(app: &AppBuilder, question: &str) -> anyhow::Result<()> {
    let ctx = app.build_context()?;
    let result = ctx.retriever().query(question).await;
    ctx.shutdown().await;

    println!("{}", result?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_a_source() {
        assert!(Cli::try_parse_from(["sage", "build"]).is_err());
        assert!(Cli::try_parse_from(["sage", "build", "--file", "a.txt", "--text", "x"]).is_err());
    }

    #[test]
    fn build_metadata_from_flags() {
        let cli = Cli::try_parse_from([
            "sage", "build", "--text", "hello", "--title", "Guide", "--tags", "a, b,,c",
        ])
        .unwrap();
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        let metadata = args.metadata();
        assert_eq!(metadata["title"], "Guide");
        assert_eq!(metadata["tags"], serde_json::json!(["a", "b", "c"]));
        assert!(!metadata.contains_key("author"));
        assert!(!args.no_faq);
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sage", "query", "-q", "why?", "--max-results", "3", "--config", "x.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            cli.command,
            Command::Query { max_results: Some(3), .. }
        ));
    }

    #[test]
    fn serve_defaults_to_stdio() {
        let cli = Cli::try_parse_from(["sage", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { http: false }));
    }
}
