use std::io::{self, Read};
use std::path::PathBuf;

use chart_roast_lib::{
    analyze, analyze_with_config, recover_feedback, AppConfig, AppError, ChartFile, FeedbackRecord,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "chart-roast", version, about = "Roast a chart and get Observable Plot code for a better one")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a chart image to the model and print its critique
    Analyze(AnalyzeArgs),
    /// Run only the response recovery on a saved model reply
    Parse(ParseArgs),
    /// Update the saved configuration file
    Config(ConfigArgs),
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    image: PathBuf,
    /// Declared content type; guessed from the extension when omitted
    #[arg(long)]
    content_type: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct ParseArgs {
    /// File holding the raw reply; stdin when omitted
    file: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct ConfigArgs {
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    max_tokens: Option<u32>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("chart-roast error: {err}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32, AppError> {
    match cli.command {
        Command::Analyze(args) => run_analyze(args).await,
        Command::Parse(args) => run_parse(args),
        Command::Config(args) => run_config(args),
    }
}

async fn run_analyze(args: AnalyzeArgs) -> Result<i32, AppError> {
    let mut file = ChartFile::from_path(&args.image);
    if let Some(content_type) = args.content_type {
        file = file.with_content_type(content_type);
    }

    let record = match args.model {
        None => analyze(&file).await,
        Some(model) => match AppConfig::load_with_env() {
            Ok(mut config) => {
                config.model = model;
                analyze_with_config(&file, &config).await
            }
            Err(e) => {
                log::error!("Could not load configuration: {}", e);
                FeedbackRecord::placeholder_for(&e, None)
            }
        },
    };

    print_record(&record, args.json)?;
    Ok(0)
}

fn run_parse(args: ParseArgs) -> Result<i32, AppError> {
    let raw = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    match recover_feedback(&raw) {
        Ok(recovered) => {
            eprintln!("recovered with {:?} parse", recovered.tier);
            print_record(&recovered.record, args.json)?;
            Ok(0)
        }
        Err(e) => {
            print_record(&FeedbackRecord::placeholder_for(&e, Some(&raw)), args.json)?;
            Ok(1)
        }
    }
}

fn run_config(args: ConfigArgs) -> Result<i32, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(api_key) = args.api_key {
        config.api_key = Some(api_key);
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(max_tokens) = args.max_tokens {
        config.max_tokens = max_tokens;
    }
    config.save()?;
    println!("Saved {}", AppConfig::config_path()?.display());
    Ok(0)
}

fn print_record(record: &FeedbackRecord, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }
    println!("Strengths\n{}\n", record.strengths);
    println!("Weaknesses\n{}\n", record.weaknesses);
    println!("Suggestions\n{}\n", record.suggestions);
    println!("Roast\n{}\n", record.roast);
    println!("Plot code\n{}", record.plot_code);
    Ok(())
}
