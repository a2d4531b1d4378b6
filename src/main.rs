use clap::{Parser, Subcommand};
use scaletree::input::TreeSpec;
use scaletree::Pipeline;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scaletree")]
#[command(about = "Compact and serialize configuration trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compact a raw tree dump and emit the address-qualified output tree.
    Compact {
        /// Raw tree dump (JSON).
        #[arg(long)]
        tree: String,

        /// Absolute base path prepended to every address.
        #[arg(long)]
        base: Option<String>,

        #[arg(short = 'o', long)]
        out: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Compact { tree, base, out } => {
            use anyhow::Context;

            // 1) Parse + validate the raw tree dump.
            let spec: TreeSpec = serde_json::from_str(
                &std::fs::read_to_string(&tree)
                    .with_context(|| format!("read tree dump {}", tree))?,
            )
            .with_context(|| format!("parse tree dump {}", tree))?;
            let root = spec.validate_and_build()?;

            // 2) compact -> serialize -> resolve.
            let mut pipeline = Pipeline::new();
            if let Some(base) = base {
                pipeline = pipeline.with_base(base);
            }
            let result = pipeline.run(root)?;

            // 3) Write the output tree.
            let json = serde_json::to_string_pretty(&result.tree)?;
            std::fs::write(&out, json).with_context(|| format!("write {}", out))?;
            println!("Wrote {}", out);
        }
    }

    Ok(())
}
