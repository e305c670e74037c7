use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use storybook_generator::ai::{self, ImageGenerationService};
use storybook_generator::client::ApiClient;
use storybook_generator::models::{Config, StoryForm, StoryKey};
use storybook_generator::pipeline::{Orchestrator, OrchestratorServices, Outcome};
use storybook_generator::server::{self, AppState};
use storybook_generator::store::FileStoryStore;
use storybook_generator::story::{Illustration, StoryGenerator, StoryReader, StorySource};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "storybook-generator")]
#[command(about = "Generate illustrated children's stories")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the story HTTP API.
    Serve,
    /// Generate, illustrate and save one story.
    Generate {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: u32,
        #[arg(long, default_value = "")]
        interests: String,
        #[arg(long, default_value = "")]
        theme: String,
        #[arg(long, default_value = "en")]
        locale: String,
        /// Base URL of a running story API; services run in-process when omitted.
        #[arg(long, value_name = "URL")]
        api: Option<String>,
        /// Key to save the story under; a new one is generated when omitted.
        #[arg(long, value_parser = parse_key_arg)]
        key: Option<StoryKey>,
    },
}

fn parse_key_arg(input: &str) -> std::result::Result<StoryKey, String> {
    let valid = !input.is_empty()
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(StoryKey::new(input))
    } else {
        Err(format!(
            "Invalid key '{}'. Use letters, digits, '-' or '_'",
            input
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storybook_generator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match args.command {
        Command::Serve => serve(config).await,
        Command::Generate {
            name,
            age,
            interests,
            theme,
            locale,
            api,
            key,
        } => {
            let form = StoryForm {
                name: Some(name),
                age: Some(age.to_string()),
                interests: Some(interests),
                theme: Some(theme),
                locale: Some(locale),
            };
            generate(config, form, api, key.unwrap_or_else(StoryKey::generate)).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting storybook-generator API");
    let addr = format!("{}:{}", config.http_host, config.http_port);
    let state = Arc::new(AppState::from_config(&config));

    server::start_http_server(&addr, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await?;
    Ok(())
}

async fn generate(
    config: Config,
    form: StoryForm,
    api: Option<String>,
    key: StoryKey,
) -> Result<()> {
    let client = reqwest::Client::new();
    let stories: Box<dyn StorySource>;
    let images: Box<dyn ImageGenerationService>;
    match api {
        Some(base_url) => {
            info!("Using story API at {}", base_url);
            stories = Box::new(ApiClient::new_with_client(base_url.clone(), client.clone()));
            images = Box::new(ApiClient::new_with_client(base_url, client));
        }
        None => {
            let text = ai::build_text_service(&config, client.clone())?;
            stories = Box::new(StoryGenerator::new(text));
            images = ai::build_image_service(&config, client)?;
        }
    }

    let store = FileStoryStore::new(&config.story_dir)?;
    let orchestrator = Orchestrator::with_services(
        OrchestratorServices {
            stories,
            images,
            store: Box::new(store),
        },
        config.image_concurrency,
    );

    match orchestrator.run(form, key).await {
        Outcome::Completed { key, story, .. } => {
            info!("Story saved as {} in {}", key, config.story_dir);
            let mut reader = StoryReader::new(story);
            println!("{}\n", reader.story().title);
            loop {
                if let Some(page) = reader.view() {
                    println!("[{}/{}] {}", page.number, page.total, page.text);
                    match page.illustration {
                        Illustration::Image(url) if url.starts_with("data:") => {
                            println!("  image: (inline data)")
                        }
                        Illustration::Image(url) => println!("  image: {}", url),
                        Illustration::Placeholder(prompt) => {
                            println!("  no image ({})", prompt)
                        }
                    }
                }
                if !reader.next() {
                    break;
                }
            }
            Ok(())
        }
        Outcome::Incomplete { .. } => {
            error!("A name and an age are required");
            std::process::exit(2);
        }
        Outcome::Failed { message, error, .. } => {
            error!("{} ({})", message, error);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_arg_valid() {
        let key = parse_key_arg("current_story").unwrap();
        assert_eq!(key, StoryKey::current());
    }

    #[test]
    fn test_parse_key_arg_invalid() {
        let err = parse_key_arg("../etc").unwrap_err();
        assert!(err.contains("Invalid key"));
    }

    #[test]
    fn test_generate_args() {
        let args = CliArgs::try_parse_from([
            "storybook-generator",
            "generate",
            "--name",
            "Ali",
            "--age",
            "5",
            "--theme",
            "space",
        ])
        .unwrap();

        match args.command {
            Command::Generate {
                name, age, theme, locale, api, ..
            } => {
                assert_eq!(name, "Ali");
                assert_eq!(age, 5);
                assert_eq!(theme, "space");
                assert_eq!(locale, "en");
                assert!(api.is_none());
            }
            Command::Serve => panic!("expected generate"),
        }
    }
}
