//! CLI entry point for postpress

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postpress::config::SiteConfig;
use postpress::Site;

#[derive(Parser)]
#[command(name = "postpress")]
#[command(version)]
#[command(about = "Serve or compile dated Markdown posts through a template", long_about = None)]
struct Cli {
    /// Configuration file (defaults to postpress.yml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Glob matching post files
    #[arg(long, global = true)]
    post_glob: Option<String>,

    /// Post template file
    #[arg(long, global = true)]
    post_template: Option<PathBuf>,

    /// Catalog CSV with url,title,abstract rows
    #[arg(long, global = true)]
    post_catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve posts over HTTP
    #[command(alias = "s")]
    Serve {
        /// Host and port to listen on
        #[arg(short, long)]
        listen: Option<String>,

        /// Directory static files are served from
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Reload posts on every request and list them at /
        #[arg(long)]
        dev: bool,

        /// Push a reload to open pages when posts change (requires --dev)
        #[arg(long)]
        autoreload: bool,
    },

    /// Write every post to <out>/<url>.html
    #[command(alias = "c")]
    Compile {
        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List loaded posts
    List,

    /// Display version information
    Version,
}

impl Cli {
    /// Read the config file, then apply flags on top of it
    fn site_config(&self) -> Result<SiteConfig> {
        let mut config = match &self.config {
            Some(path) => SiteConfig::load(path)?,
            None => SiteConfig::load_or_default("postpress.yml")?,
        };

        if let Some(glob) = &self.post_glob {
            config.post_glob = glob.clone();
        }
        if let Some(template) = &self.post_template {
            config.post_template = template.clone();
        }
        if let Some(catalog) = &self.post_catalog {
            config.post_catalog = Some(catalog.clone());
        }

        match &self.command {
            Commands::Serve {
                listen,
                static_dir,
                dev,
                autoreload,
            } => {
                if let Some(listen) = listen {
                    config.listen = listen.clone();
                }
                if let Some(static_dir) = static_dir {
                    config.static_dir = static_dir.clone();
                }
                config.dev |= *dev;
                config.autoreload |= *autoreload;
            }
            Commands::Compile { out: Some(out) } => {
                config.out_dir = out.clone();
            }
            _ => {}
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "postpress=debug,info"
    } else {
        "postpress=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Commands::Version = cli.command {
        println!("postpress version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = cli.site_config()?;
    if config.autoreload && !config.dev {
        tracing::warn!("--autoreload has no effect without --dev");
    }

    let site = Site::open(config).context("loading posts")?;

    match cli.command {
        Commands::Serve { .. } => {
            postpress::server::start(&site).await?;
        }

        Commands::Compile { .. } => {
            tracing::info!("Compiling posts");
            let count = site.compile()?;
            println!("Compiled {} posts into {:?}", count, site.config.out_dir);
        }

        Commands::List => {
            site.list()?;
        }

        Commands::Version => {}
    }

    Ok(())
}
