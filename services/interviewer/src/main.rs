mod config;
mod media;
mod render;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use interview_realtime::types::session::{DEFAULT_QUESTIONS, MAX_QUESTIONS, MIN_QUESTIONS};
use interview_realtime::types::{InterviewSetup, InterviewType};
use interview_realtime::{
    InterviewSession, OrchestratorConfig, OrchestratorHandle, ResumeUpload, SessionOrchestrator,
};
use tracing_subscriber::fmt::time::ChronoLocal;

use crate::config::Config;
use crate::media::{CpalMicrophone, RodioOutput};
use crate::render::Renderer;

#[derive(Parser)]
#[command(version, about = "Spoken mock interview in the terminal")]
struct Cli {
    /// The role being interviewed for
    #[arg(long)]
    role: String,

    /// Years of experience, e.g. "3-5 years"
    #[arg(long)]
    experience: String,

    /// technical, behavioral or mixed
    #[arg(long, default_value = "technical")]
    interview_type: InterviewType,

    /// Number of questions
    #[arg(long, default_value_t = DEFAULT_QUESTIONS,
          value_parser = clap::value_parser!(u32).range(MIN_QUESTIONS as i64..=MAX_QUESTIONS as i64))]
    questions: u32,

    #[arg(long, default_value = "")]
    job_description: String,

    /// PDF, DOCX or TXT resume to tailor the questions
    #[arg(long)]
    resume: Option<PathBuf>,
}

enum Action {
    Toggle,
    EndNow,
    Quit,
}

fn parse_action(line: &str) -> Option<Action> {
    match line.trim().to_lowercase().as_str() {
        "" => Some(Action::Toggle),
        "end" => Some(Action::EndNow),
        "quit" | "q" => Some(Action::Quit),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting interview service...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    let setup = InterviewSetup::builder()
        .with_role(&args.role)
        .with_experience(&args.experience)
        .with_interview_type(args.interview_type)
        .with_job_description(&args.job_description)
        .with_num_questions(args.questions)
        .build()
        .context("Role and experience must not be empty")?;
    let resume = args
        .resume
        .as_deref()
        .map(ResumeUpload::from_path)
        .transpose()?;

    // --- 4. Start the Interview ---
    let client = interview_realtime::connect_with_config(
        interview_realtime::Config::builder()
            .with_base_url(&config.api_url)
            .build(),
    )?;
    let started = client
        .start_interview(&setup, resume)
        .await
        .context("Failed to start interview")?;

    // --- 5. Audio Devices ---
    match interview_realtime_utils::device::get_available_inputs() {
        Ok(inputs) => tracing::debug!("Available inputs:\n{}", inputs),
        Err(e) => tracing::debug!("Failed to list inputs: {}", e),
    }
    let microphone = Arc::new(CpalMicrophone::new(config.input_device.clone()));
    let output = Arc::new(
        RodioOutput::open()
            .await
            .context("Failed to open audio output")?,
    );

    // --- 6. Run the Session ---
    // No face detector is bundled, so the look-away count stays at zero.
    let session = InterviewSession::from_start(&setup, &started).with_final_audio(config.final_audio);
    let mut handle = SessionOrchestrator::spawn(
        session,
        Arc::new(client.clone()),
        output,
        microphone,
        None,
        OrchestratorConfig::default(),
    );

    let report = run(&mut handle).await?;

    match report {
        Some(report) => println!("\n{}", render::report_summary(&report)),
        None => {
            if let Err(e) = client.delete_session(started.session_id()).await {
                tracing::warn!("Failed to delete session: {:#}", e);
            }
        }
    }
    handle.join().await?;
    Ok(())
}

/// Reads stdin on a plain thread so a pending read never holds up shutdown.
fn stdin_lines() -> tokio::sync::mpsc::Receiver<String> {
    let (tx, rx) = tokio::sync::mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Drives the terminal loop until a report arrives or the user quits.
async fn run(handle: &mut OrchestratorHandle) -> Result<Option<interview_realtime::types::Report>> {
    let mut report_rx = handle
        .take_report()
        .context("report receiver already taken")?;
    let mut view_rx = handle.subscribe();
    let mut renderer = Renderer::new();
    let mut lines = stdin_lines();

    loop {
        tokio::select! {
            changed = view_rx.changed() => {
                if changed.is_err() {
                    return Ok(None);
                }
                let view = view_rx.borrow_and_update().clone();
                for line in renderer.render(&view) {
                    println!("\r{}", line);
                }
                if let Some(meter) = render::meter(&view) {
                    print!("\r{}", meter);
                    std::io::stdout().flush()?;
                }
            }
            line = lines.recv() => {
                let Some(line) = line else {
                    handle.teardown().await;
                    return Ok(None);
                };
                let view = handle.view();
                match parse_action(&line) {
                    Some(Action::Toggle) if view.can_stop => handle.stop_recording().await?,
                    Some(Action::Toggle) if view.can_record => handle.start_recording().await?,
                    Some(Action::Toggle) => println!("[{}]", view.status),
                    Some(Action::EndNow) if view.can_end_now => handle.end_now().await?,
                    Some(Action::EndNow) => println!("End now is available after your first answer."),
                    Some(Action::Quit) => {
                        handle.teardown().await;
                        return Ok(None);
                    }
                    None => println!("Enter: record/stop, 'end': finish now, 'quit': leave"),
                }
            }
            report = &mut report_rx => {
                return Ok(report.ok());
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, tearing down");
                handle.teardown().await;
                return Ok(None);
            }
        }
    }
}
