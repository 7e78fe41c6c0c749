//! genopilot: ゲノム処理パイプラインのコマンドラインシェル。
//! ライフサイクルのロジックは持たず、gp-core の AppService を呼ぶだけ。

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;

use gp_core::domain::error::AppError;
use gp_core::domain::job::JobRecord;
use gp_core::domain::settings::ClientSettings;
use gp_core::infra::backend::HttpBackend;
use gp_core::usecase::app_service::AppService;
use gp_core::usecase::monitor::MonitorEvent;

#[derive(Parser)]
#[command(name = "genopilot", version, about = "Genome imputation pipeline client")]
struct Cli {
    /// Backend API base URL (or GENOPILOT_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Directory for downloaded artifacts (default: OS download dir)
    #[arg(long)]
    download_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a genome file (.txt, up to 1GB) and follow it through processing
    Upload {
        file: PathBuf,
        /// Exit right after the upload instead of polling for status
        #[arg(long)]
        no_follow: bool,
    },
    /// List all jobs known to the backend
    List,
    /// Print one job's authoritative status as JSON
    Status { id: String },
    /// Re-attach to a job and poll until it reaches a terminal state
    Watch { id: String },
    /// Download the processed artifact of a completed job
    Download { id: String },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e.message);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut settings = ClientSettings::default();
    if let Some(url) = cli
        .api_url
        .or_else(|| std::env::var("GENOPILOT_API_URL").ok())
    {
        settings.api_base_url = url;
    }
    if let Some(dir) = cli.download_dir {
        settings.download_dir = Some(dir);
    }

    let backend = Arc::new(HttpBackend::new(
        settings.api_base_url.clone(),
        settings.request_timeout(),
    ));
    let service = AppService::new(backend, settings);

    match cli.command {
        Command::Upload { file, no_follow } => {
            service.select_file(file)?;
            let (job, events) = service.upload_selected().await?;
            println!("uploaded {} (id: {})", job.original_filename, job.id);
            if no_follow {
                return Ok(());
            }
            follow(&service, events).await
        }
        Command::List => {
            let jobs = service.refresh_jobs().await?;
            if jobs.is_empty() {
                println!("no jobs");
            }
            for job in &jobs {
                print_job(job);
            }
            Ok(())
        }
        Command::Status { id } => {
            let job = service.fetch_job(&id).await?;
            let json = serde_json::to_string_pretty(&job)
                .map_err(|e| AppError::internal(e.to_string()))?;
            println!("{json}");
            Ok(())
        }
        Command::Watch { id } => {
            let (job, events) = service.watch(&id).await?;
            print_job(&job);
            if job.is_terminal() {
                if let Some(detail) = &job.error {
                    return Err(AppError::job_reported(format!(
                        "Processing failed: {detail}"
                    )));
                }
                return Ok(());
            }
            follow(&service, events).await
        }
        Command::Download { id } => {
            // ボードが空のプロセスなので、まず権威ステータスを取り込む
            service.fetch_job(&id).await?;
            let path = service.download(&id).await?;
            println!("saved {}", path.display());
            Ok(())
        }
    }
}

/// 監視イベントを終端まで消費する。処理失敗は終了コードに反映する。
async fn follow(
    service: &AppService,
    mut events: UnboundedReceiver<MonitorEvent>,
) -> Result<(), AppError> {
    while let Some(event) = events.recv().await {
        service.handle_event(&event);
        match &event {
            MonitorEvent::StatusFetched { job } => {
                log::info!("job {} is {}", job.id, job.status.as_str());
            }
            MonitorEvent::Completed { job } => {
                if let Some(notice) = event.user_notice() {
                    println!("{notice}");
                }
                println!("run `genopilot download {}` to fetch the artifact", job.id);
            }
            MonitorEvent::Failed { detail, .. } => {
                return Err(AppError::job_reported(format!(
                    "Processing failed: {detail}"
                )));
            }
        }
    }
    Ok(())
}

fn print_job(job: &JobRecord) {
    println!(
        "{:<10}  {}  {}  ({})",
        job.status.as_str(),
        job.id,
        job.original_filename,
        job.uploaded_at
    );
}
