use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use futures::StreamExt;
use iocraft::prelude::*;
use std::{
    io::{self, Write},
    path::PathBuf,
};
use tokio::sync::watch;
use url::Url;

use crate::client::{BuildstashClient, UploadEvent, UploadJob};
use crate::ui::{ConfigHeader, ErrorMessage, InputPrompt, ProgressBar, SuccessMessage};

mod client;
mod config;
mod error;
mod plan;
mod rest_types;
mod ui;

#[derive(Parser)]
#[command(name = "bstash")]
#[command(version)]
#[command(about = "A tool for uploading build artifacts to Buildstash")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct UploadArgs {
    /// Path to the build artifact, relative to the workspace root
    #[arg(value_hint = ValueHint::FilePath)]
    file: PathBuf,
    /// Expansion file uploaded alongside the build (e.g. an OBB)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    expansion_file: Option<PathBuf>,
    /// Version label recorded on the build
    #[arg(short, long)]
    version: String,
    /// Target platform of the artifact
    #[arg(short, long)]
    platform: Option<String>,
    /// Stream to file the build under
    #[arg(short, long)]
    stream: Option<String>,
    /// Label attached to the build; may be given multiple times
    #[arg(short, long)]
    label: Vec<String>,
    /// Free-form release notes
    #[arg(short, long)]
    notes: Option<String>,
    /// Workspace root that file paths are resolved against
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a build artifact
    Upload {
        #[command(flatten)]
        args: UploadArgs,
    },
    /// Configure bstash interactively
    Config,
    /// Store your API key in the OS keyring
    SetApiKey { api_key: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bstash=info")),
        )
        .with_target(false)
        .init();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let _rt_guard = rt.enter();
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();
    let cli = Cli::parse();

    rt.block_on(async {
        match cli.command {
            Commands::Config => interactive_config(),
            Commands::SetApiKey { api_key } => config::set_api_key_keyring(api_key),
            Commands::Upload { args } => {
                let config = config::read_config()?;
                let client =
                    BuildstashClient::new(config.buildstash_base_url, config.buildstash_api_key);
                upload_build(&client, args, config.default_stream).await
            }
        }
    })
}

async fn upload_build(
    client: &BuildstashClient,
    args: UploadArgs,
    default_stream: Option<String>,
) -> Result<()> {
    let workspace = match args.workspace {
        Some(workspace) => workspace,
        None => std::env::current_dir()?,
    };

    let job = UploadJob {
        workspace,
        primary_file: args.file,
        expansion_file: args.expansion_file,
        version_label: args.version,
        platform: args.platform,
        stream: args.stream.or(default_stream),
        labels: args.label,
        notes: args.notes,
    };

    let mut stream = client.upload_build(&job)?;

    let (tx, rx) = watch::channel(0.0f32);

    let process_stream = async {
        let mut result = None;
        while let Some(event) = stream.next().await {
            match event? {
                UploadEvent::Progress(p) => {
                    let percent = if p.total_bytes == 0 {
                        100.0
                    } else {
                        (p.bytes_uploaded as f32 / p.total_bytes as f32) * 100.0
                    };
                    let _ = tx.send(percent);
                }
                UploadEvent::Complete(record) => {
                    result = Some(record);
                    break;
                }
            }
        }
        Ok::<_, anyhow::Error>(result.context("Upload ended without a verified build")?)
    };

    let mut progress_bar =
        element!(ProgressBar(title: "Uploading Build".to_string(), progress: Some(rx)));

    let result = tokio::select! {
        result = process_stream => result?,
        _ = progress_bar.render_loop() => {
            unreachable!("render_loop should not terminate")
        }
    };

    element!(SuccessMessage(message: format!("Build {} uploaded", result.build_id))).print();
    if result.pending_processing {
        println!("The artifact is still being processed by Buildstash");
    }
    println!("Build info: {}", result.build_info_url);
    println!("Download:   {}", result.download_url);

    Ok(())
}

fn read_input(prompt: &str, default: Option<&str>, description: Option<&str>) -> Result<String> {
    element! {
        InputPrompt(
            prompt: prompt.to_string(),
            default: default.map(|s| s.to_string()),
            description: description.map(|s| s.to_string())
        )
    }
    .print();

    print!("> ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_string();

    if input.is_empty() {
        if let Some(def) = default {
            Ok(def.to_string())
        } else {
            Ok(input)
        }
    } else {
        Ok(input)
    }
}

fn interactive_config() -> Result<()> {
    element!(ConfigHeader()).print();

    let buildstash_base_url = loop {
        let base_url_str = read_input(
            "Buildstash Base URL",
            Some(config::DEFAULT_BUILDSTASH_BASE_URL),
            Some("The base URL of the Buildstash API"),
        )?;

        match Url::parse(&base_url_str) {
            Ok(url) => break url,
            Err(e) => {
                element!(ErrorMessage(message: format!("Invalid URL: {}", e))).print();
                println!();
            }
        }
    };

    let api_key = loop {
        let api_key = read_input(
            "API Key",
            None,
            Some("Your Buildstash API key (stored securely in OS keyring)"),
        )?;

        if api_key.is_empty() {
            element!(ErrorMessage(message: "API key cannot be empty".to_string())).print();
            println!();
        } else {
            break api_key;
        }
    };

    let default_stream_str = read_input(
        "Default Stream",
        None,
        Some("Optional: stream used when --stream is not given"),
    )?;
    let default_stream = if default_stream_str.is_empty() {
        None
    } else {
        Some(default_stream_str)
    };

    config::set_api_key_keyring(api_key)?;

    config::write_config(config::ConfigFile {
        buildstash_base_url: Some(buildstash_base_url),
        default_stream,
    })?;

    element!(SuccessMessage(message: "Configuration complete!".to_string())).print();

    Ok(())
}
