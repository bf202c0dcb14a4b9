//! CLI for NovaArt - AI image generation and editing.

use clap::{Args, Parser, Subcommand};
use novaart::encoder;
use novaart::image::{decode_data_url, ImageProvider};
use novaart::{Event, GeminiModel, GeminiProvider, Outcome, Reaction, Studio, ViewState};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "novaart")]
#[command(about = "Generate and edit images from text prompts with Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true, env = "NOVAART_DEBUG")]
    debug: bool,

    /// Gemini model to use
    #[arg(
        long,
        global = true,
        env = "NOVAART_MODEL",
        default_value = "gemini-2.5-flash-image"
    )]
    model: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate (or edit) one image and save it
    Generate(GenerateArgs),

    /// Interactive session: set a prompt, attach images, generate repeatedly
    Studio,

    /// Check that the API key and model are usable
    Check,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Reference image to edit
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file path
    #[arg(short, long, default_value = "novaart.png")]
    output: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    novaart::config::setup_logging(cli.debug)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let model: GeminiModel = cli.model.parse()?;
    let provider = GeminiProvider::builder().model(model).build()?;

    match cli.command {
        Commands::Generate(args) => generate(provider, args).await?,
        Commands::Studio => run_studio(provider).await?,
        Commands::Check => {
            provider.health_check().await?;
            println!("{} ({}) is reachable", provider.name(), model.as_str());
        }
    }

    Ok(())
}

async fn generate(provider: GeminiProvider, args: GenerateArgs) -> anyhow::Result<()> {
    let studio = Studio::new(provider);

    if let Some(ref input) = args.input {
        let file = encoder::read_file(input)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))?;
        if let Reaction::Notify(msg) = studio.handle(Event::SelectFile(file)) {
            anyhow::bail!(msg);
        }
    }

    studio.handle(Event::SetPrompt(args.prompt.clone()));
    if let Reaction::Started(request) = studio.handle(Event::Submit) {
        request.await?;
    }

    match studio.outcome() {
        Outcome::Success(uri) => {
            let size = save_result(&uri, &args.output)?;
            if args.json {
                let result = serde_json::json!({
                    "success": true,
                    "output": args.output.display().to_string(),
                    "size_bytes": size,
                    "edit": args.input.is_some(),
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Generated image: {} ({} bytes)", args.output.display(), size);
            }
            Ok(())
        }
        Outcome::Failure(msg) => {
            if args.json {
                let result = serde_json::json!({ "success": false, "error": msg });
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            anyhow::bail!(msg)
        }
        other => anyhow::bail!("generation did not finish (state: {other:?})"),
    }
}

/// Writes a data URL result to disk, returning the number of bytes written.
fn save_result(uri: &str, path: &Path) -> anyhow::Result<usize> {
    let (media_type, data) = decode_data_url(uri)?;
    tracing::debug!(media_type = %media_type, path = %path.display(), "saving result");
    std::fs::write(path, &data)?;
    Ok(data.len())
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Prompt(String),
    Image(PathBuf),
    Remove,
    Generate,
    Status,
    Save(PathBuf),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Command::Generate);
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Command::Prompt(line.trim_end_matches(['\r', '\n']).to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match (name, arg) {
        ("image", "") | ("save", "") => Err(format!("/{name} needs a path")),
        ("image", path) => Ok(Command::Image(PathBuf::from(path))),
        ("save", path) => Ok(Command::Save(PathBuf::from(path))),
        ("remove", _) => Ok(Command::Remove),
        ("generate", _) => Ok(Command::Generate),
        ("status", _) => Ok(Command::Status),
        ("help", _) => Ok(Command::Help),
        ("quit", _) | ("exit", _) => Ok(Command::Quit),
        _ => Err(format!("unknown command /{name} (try /help)")),
    }
}

const HELP: &str = "\
Type a prompt and press Enter to set it; an empty line generates.
  /image <path>   attach a reference image to edit
  /remove         remove the reference image
  /generate       generate with the current prompt
  /status         show prompt, image and result
  /save <path>    save the last generated image
  /quit           leave";

async fn run_studio(provider: GeminiProvider) -> anyhow::Result<()> {
    let studio = Studio::new(provider);
    session(&studio, BufReader::new(tokio::io::stdin())).await
}

/// Reads studio commands from `input` until `/quit` or end of input.
async fn session<P, R>(studio: &Studio<P>, input: R) -> anyhow::Result<()>
where
    P: ImageProvider + 'static,
    R: AsyncBufRead + Unpin,
{
    let mut outcomes = studio.generator().subscribe();
    let mut lines = input.lines();

    println!("{HELP}\n");
    println!("{}", studio.view().render());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(msg) => {
                        eprintln!("{msg}");
                        continue;
                    }
                };
                if !apply(studio, command).await? {
                    break;
                }
            }
            changed = outcomes.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = ViewState::from(&*outcomes.borrow_and_update());
                println!("{}", view.render());
            }
        }
    }

    // Input may end (piped stdin) while a request is still in flight.
    if studio.generator().is_pending() {
        let outcome = studio.generator().settled().await;
        println!("{}", ViewState::from(&outcome).render());
    }

    Ok(())
}

/// Runs one studio command. Returns false when the session should end.
async fn apply<P: ImageProvider + 'static>(
    studio: &Studio<P>,
    command: Command,
) -> anyhow::Result<bool> {
    match command {
        Command::Prompt(text) => {
            studio.handle(Event::SetPrompt(text));
        }
        Command::Image(path) => match encoder::read_file(&path).await {
            Ok(file) => match studio.handle(Event::SelectFile(file)) {
                Reaction::Notify(msg) => eprintln!("{msg}"),
                _ => {
                    if let Some(name) = studio.upload().file_name() {
                        println!("Attached {name}");
                    }
                }
            },
            Err(e) => eprintln!("{}", e.user_message()),
        },
        Command::Remove => {
            studio.handle(Event::RemoveImage);
            println!("Reference image removed");
        }
        Command::Generate => match studio.handle(Event::Submit) {
            // Progress and results arrive through the outcome subscription.
            Reaction::Started(_) | Reaction::Rejected => {}
            Reaction::Ignored => println!("A generation is already in progress."),
            Reaction::Notify(msg) => eprintln!("{msg}"),
            Reaction::Updated => {}
        },
        Command::Status => {
            println!("Prompt: {}", studio.prompt().get());
            match studio.upload().current() {
                Some(upload) => println!(
                    "Image: {} ({}, {})",
                    upload.file_name,
                    upload.image.media_type(),
                    upload.preview_url()
                ),
                None => println!("Image: none"),
            }
            println!("{}", studio.view().render());
        }
        Command::Save(path) => match studio.outcome() {
            Outcome::Success(uri) => {
                let size = save_result(&uri, &path)?;
                println!("Saved {} ({} bytes)", path.display(), size);
            }
            _ => eprintln!("Nothing to save yet."),
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}
