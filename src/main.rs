use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueHint};
use tracing_subscriber::EnvFilter;

use syntax_tutor::config::TutorConfig;
use syntax_tutor::evaluation::{AnswerSheet, Evaluation};
use syntax_tutor::llm::{self, OpenAiBackend};
use syntax_tutor::palette::Palette;
use syntax_tutor::{Tutor, quiz};

#[derive(Parser, Debug)]
#[command(
    name = "syntax-tutor",
    version,
    about = "Daily programming-syntax lessons and quizzes from an LLM.",
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the lesson material for one day
    Material {
        /// Programming language to study, e.g. Python
        #[arg(long, short)]
        language: String,
        /// Day of the course
        #[arg(long, short, value_name = "DAY")]
        day: u32,
    },
    /// Generate a 15-question quiz
    Quiz {
        #[arg(long, short)]
        language: String,
        #[arg(long, short, value_name = "DAY")]
        day: u32,
        /// Lesson material to base the quiz on. Generated first when omitted.
        #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
        material: Option<PathBuf>,
        /// Print the model output without cleaning it up
        #[arg(long, default_value_t = false)]
        raw: bool,
    },
    /// Check quiz answers stored as JSON: {"1": {"question": "...", "answer": "..."}}
    Evaluate {
        #[arg(long, short)]
        language: String,
        #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
        answers: PathBuf,
    },
    /// Congratulate on a finished course and suggest what to revisit
    #[command(name = "result")]
    Summary {
        #[arg(long, short)]
        language: String,
        /// Share of correct answers in percent
        #[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u8).range(0..=100))]
        correct: u8,
    },
    /// Manage the stored API key
    Llm {
        /// Store an API key for the configured endpoint
        #[arg(long, value_name = "KEY", conflicts_with = "clear")]
        set: Option<String>,
        /// Remove the stored API key for the configured endpoint
        #[arg(long, conflicts_with = "test")]
        clear: bool,
        /// Verify the configured API key against the LLM endpoint
        #[arg(long, conflicts_with = "clear")]
        test: bool,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run_cli().await {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("syntax_tutor=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let config = TutorConfig::from_env()?;

    match cli.command {
        Command::Material { language, day } => {
            let tutor = build_tutor(&config)?;
            let material = tutor.generate_material(&language, &day.to_string()).await;
            print_section("Lesson material", &material);
        }
        Command::Quiz {
            language,
            day,
            material,
            raw,
        } => {
            let tutor = build_tutor(&config)?;
            let day = day.to_string();
            let material = match material {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read material from {}", path.display()))?,
                None => {
                    let material = tutor.generate_material(&language, &day).await;
                    print_section("Lesson material", &material);
                    material
                }
            };
            let questions = if raw {
                tutor.generate_questions(&language, &material, &day).await
            } else {
                tutor.generate_quiz(&language, &material, &day).await
            };
            print_section("Quiz", &questions);
            if !raw {
                let count = quiz::parse_quiz(&questions).len();
                println!(
                    "{} {}",
                    Palette::dim("Questions parsed:"),
                    Palette::paint(Palette::INFO, count)
                );
            }
        }
        Command::Evaluate { language, answers } => {
            let contents = fs::read_to_string(&answers)
                .with_context(|| format!("Failed to read answers from {}", answers.display()))?;
            let sheet = AnswerSheet::from_json(&contents)?;
            if sheet.is_empty() {
                bail!("No answers found in {}", answers.display());
            }
            let tutor = build_tutor(&config)?;
            let reply = tutor.evaluate_sheet(&language, &sheet).await?;
            print_section("Results", &reply);
            if let Some(evaluation) = Evaluation::parse(&reply) {
                print_score(&evaluation);
            }
        }
        Command::Summary { language, correct } => {
            let tutor = build_tutor(&config)?;
            let correct = f64::from(correct);
            let reply = tutor.evaluate_result(&language, correct, 100.0 - correct).await;
            print_section("Course summary", &reply);
        }
        Command::Llm { set, clear, test } => handle_llm_command(&config, set, clear, test).await?,
    }

    Ok(())
}

fn build_tutor(config: &TutorConfig) -> Result<Tutor<OpenAiBackend>> {
    let backend = llm::ensure_backend(config)?;
    tracing::info!(model = backend.model(), "using completion model");
    Ok(Tutor::new(backend))
}

fn print_section(title: &str, body: &str) {
    println!("\n{}", Palette::paint(Palette::ACCENT, format!("=== {title} ===")));
    println!("{body}");
}

fn print_score(evaluation: &Evaluation) {
    let (correct, _) = evaluation.percentages();
    let color = if correct >= 80.0 {
        Palette::SUCCESS
    } else if correct >= 50.0 {
        Palette::WARNING
    } else {
        Palette::DANGER
    };
    println!(
        "\n{} {}",
        Palette::dim("Score:"),
        Palette::paint(
            color,
            format!("{}/{} ({correct}%)", evaluation.correct, evaluation.total)
        )
    );
}

async fn handle_llm_command(
    config: &TutorConfig,
    set: Option<String>,
    clear: bool,
    test: bool,
) -> Result<()> {
    let mut action_taken = false;

    if let Some(key) = set {
        llm::store_api_key(config, &key)?;
        println!("Stored API key for {}.", config.endpoint());
        action_taken = true;
    }

    if clear {
        let removed = llm::clear_api_key(config)?;
        if removed {
            println!("Removed the stored API key for {}.", config.endpoint());
        } else {
            println!("No stored API key for {}.", config.endpoint());
        }
        action_taken = true;
    }

    if test {
        let source = llm::test_configured_api_key(config).await?;
        println!("API key from the {} is valid.", source.description());
        action_taken = true;
    }

    if !action_taken {
        bail!("No action provided. Use --set, --clear, or --test.");
    }
    Ok(())
}
