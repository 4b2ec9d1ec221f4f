use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use ilmsync_common::IlmError;
use ilmsync_lifecycle::{
    BucketLifecycle, BucketLifecycleSpec, FsLifecycleClient, LifecycleSys, StateStore,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ilmsync",
    about = "Reconcile declarative bucket lifecycle rules against an S3-compatible store"
)]
struct Cli {
    /// Store root holding one directory per bucket [env: ILMSYNC_DATA_DIR]
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for mirrored lifecycle state [env: ILMSYNC_STATE_DIR]
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Log output format [env: ILMSYNC_LOG_FORMAT]
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a spec file without touching the store
    Validate { spec: PathBuf },
    /// Create or update the bucket lifecycle described by a spec file
    Apply { spec: PathBuf },
    /// Read the bucket lifecycle back from the store
    Show {
        bucket: String,
        /// Report read failures instead of treating them as an absent configuration
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Adopt an existing bucket lifecycle into local state
    Import { bucket: String },
    /// Remove the bucket lifecycle from the store
    Destroy { bucket: String },
    /// Create a bucket directory in the store root
    MakeBucket { bucket: String },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let data_dir = dir_setting(cli.data_dir, "ILMSYNC_DATA_DIR", "./data");
    let state_dir = dir_setting(cli.state_dir, "ILMSYNC_STATE_DIR", "./.ilmsync");
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

    let client = Arc::new(FsLifecycleClient::new(data_dir));
    let sys = LifecycleSys::new(client.clone());
    let states = StateStore::new(&state_dir)
        .await
        .with_context(|| format!("failed to open state dir {}", state_dir.display()))?;

    let result = match cli.command {
        Command::Validate { spec } => {
            let spec = load_spec(&spec).await?;
            spec.validate().map_err(report)?;
            info!(bucket = %spec.bucket, rules = spec.rules.len(), "spec is valid");
            return Ok(());
        }
        Command::Apply { spec } => {
            let spec = load_spec(&spec).await?;
            match states.load(&spec.bucket).await? {
                Some(mut state) => {
                    sys.update(&mut state, &spec).await.map_err(report)?;
                    state
                }
                None => sys.create(&spec).await.map_err(report)?,
            }
        }
        Command::Show { bucket, strict } => {
            let mut state = states
                .load(&bucket)
                .await?
                .unwrap_or_else(|| BucketLifecycle::imported(bucket.clone()));
            if strict {
                sys.read_strict(&mut state).await.map_err(report)?;
            } else {
                sys.read(&mut state).await.map_err(report)?;
            }
            state
        }
        Command::Import { bucket } => sys.import(&bucket).await.map_err(report)?,
        Command::Destroy { bucket } => {
            let Some(mut state) = states.load(&bucket).await? else {
                warn!(bucket = %bucket, "no lifecycle state recorded, nothing to destroy");
                return Ok(());
            };
            sys.delete(&mut state).await.map_err(report)?;
            state
        }
        Command::MakeBucket { bucket } => {
            client.make_bucket(&bucket).await?;
            info!(bucket = %bucket, "bucket created");
            return Ok(());
        }
    };

    states.save(&result).await?;
    if !result.is_present() {
        warn!(bucket = %result.bucket, "bucket lifecycle is absent");
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn init_tracing(format: Option<LogFormat>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("ilmsync_cli=info".parse()?)
        .add_directive("ilmsync_lifecycle=info".parse()?);
    let format = format.or_else(|| match std::env::var("ILMSYNC_LOG_FORMAT").as_deref() {
        Ok("json") => Some(LogFormat::Json),
        Ok("text") => Some(LogFormat::Text),
        _ => None,
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    if format == Some(LogFormat::Json) {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn dir_setting(flag: Option<PathBuf>, env_key: &str, default: &str) -> PathBuf {
    flag.or_else(|| std::env::var_os(env_key).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

async fn load_spec(path: &Path) -> anyhow::Result<BucketLifecycleSpec> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read spec {}", path.display()))?;
    Ok(BucketLifecycleSpec::from_json(&bytes)?)
}

fn report(err: IlmError) -> anyhow::Error {
    let code = err.s3_error_code();
    let bucket = err.bucket().map(str::to_string);
    let err = anyhow::Error::new(err);
    match bucket {
        Some(bucket) => err.context(format!("{code} (bucket {bucket})")),
        None => err.context(code),
    }
}
