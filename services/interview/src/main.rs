use anyhow::{Context, Result};
use clap::Parser;
use interview_core::{
    DialogueService, DifficultyLevel, InterviewController, SessionConfig, SessionHandle,
    TopicCatalog,
};
use interview_service::config::{Config, DialogueProvider};
use interview_service::console::{
    ConsoleCommand, ConsoleRecognizer, ConsoleSynthesizer, describe, render_summary,
};
use interview_service::openai_dialogue::OpenAiDialogue;
use interview_service::prompt_loader::PromptSet;
use interview_service::question_bank::QuestionBankDialogue;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Practice technical interviews out loud")]
struct Cli {
    /// The topic to be interviewed on, by id or name
    topic: Option<String>,
    /// beginner, intermediate, advanced or expert
    #[arg(long, default_value = "intermediate")]
    difficulty: DifficultyLevel,
    /// Maximum number of questions, 0 for no limit
    #[arg(long, default_value_t = 5)]
    questions: u32,
    #[arg(long, default_value_t = 30)]
    minutes: u32,
    /// Adjust the difficulty after each answer
    #[arg(long)]
    adaptive: bool,
    /// Print the available topics and exit
    #[arg(long)]
    list_topics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    // Logs go to stderr so they do not interleave with the interview on stdout.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Configuration loaded successfully. Starting interview service...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Load Topics ---
    let catalog = TopicCatalog::load(&config.topics_path).context("Failed to load topics")?;
    if args.list_topics {
        for topic in catalog.list_topics() {
            println!("{:<16} {} ({})", topic.id, topic.name, topic.difficulty);
        }
        return Ok(());
    }
    let query = args
        .topic
        .context("A topic is required; run with --list-topics to see them")?;
    let topic = catalog
        .find(&query)
        .with_context(|| format!("No topic matches '{query}'"))?;
    let (topic_id, topic_name) = (topic.id.clone(), topic.name.clone());

    // --- 5. Initialize the Dialogue Service ---
    let dialogue: Arc<dyn DialogueService> = match config.provider {
        DialogueProvider::OpenAI => {
            let prompts =
                PromptSet::load(&config.prompts_dir).context("Failed to load LLM prompts")?;
            let api_key = config
                .openai_api_key
                .take()
                .context("OPENAI_API_KEY must be set for openai provider")?;
            Arc::new(OpenAiDialogue::new(
                api_key,
                config.chat_model.clone(),
                prompts,
            ))
        }
        DialogueProvider::Offline => Arc::new(QuestionBankDialogue::new(catalog)),
    };

    // --- 6. Start the Interview ---
    let recognizer = Arc::new(ConsoleRecognizer::new());
    let controller = InterviewController::new(
        dialogue,
        Arc::new(ConsoleSynthesizer::new(config.speech_pacing)),
        recognizer.clone(),
    )
    .with_timings(config.timings);

    let session_config = SessionConfig::new(topic_id, args.difficulty)
        .with_question_count(args.questions)
        .with_duration_minutes(args.minutes)
        .with_adaptive_feedback(args.adaptive);
    println!(
        "Starting a {} interview on {}. Commands: /pause /resume /skip /listen /next /end",
        args.difficulty, topic_name
    );
    let session = controller.start_interview(session_config).await?;

    let narrator = tokio::spawn(narrate(session.clone()));

    tokio::select! {
        state = session.wait_until(|s| s.status.is_terminal()) => {
            if let Some(summary) = state.and_then(|s| s.summary.clone()) {
                println!("\n{}", render_summary(&summary));
            }
        }
        result = read_commands(&session, &recognizer) => {
            if let Err(e) = result {
                tracing::error!("Failed to read from stdin: {:?}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }

    narrator.abort();
    controller.shutdown().await;
    tracing::info!("Shutting down...");
    Ok(())
}

/// Prints a line whenever the session does something worth mentioning.
async fn narrate(session: SessionHandle) {
    let mut updates = session.subscribe();
    let mut last = None;
    while updates.changed().await.is_ok() {
        let state = updates.borrow_and_update().clone();
        let line = describe(&state);
        if line.is_some() && line != last {
            if let Some(line) = &line {
                println!("{line}");
            }
        }
        last = line;
    }
}

/// Routes stdin lines to the session until `/end` or end of input.
async fn read_commands(session: &SessionHandle, recognizer: &ConsoleRecognizer) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let accepted = match ConsoleCommand::parse(&line) {
            ConsoleCommand::Pause => session.pause().await,
            ConsoleCommand::Resume => session.resume().await,
            ConsoleCommand::Skip => session.stop_listening().await,
            ConsoleCommand::Listen => session.start_listening().await,
            ConsoleCommand::Next => session.next_question().await,
            ConsoleCommand::End => {
                if let Some(summary) = session.end(true).await {
                    println!("\n{}", render_summary(&summary));
                }
                return Ok(());
            }
            ConsoleCommand::Unknown(command) => {
                println!("Unknown command {command}");
                continue;
            }
            ConsoleCommand::Answer(_) => match recognizer.offer(&line) {
                // Nobody was listening, so treat it as a typed answer.
                Some(answer) if !answer.is_empty() => session.submit_text_answer(answer).await,
                Some(_) => continue,
                None => true,
            },
        };
        if !accepted {
            println!("(not possible right now)");
        }
    }
    Ok(())
}
