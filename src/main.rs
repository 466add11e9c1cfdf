//! `voxa`: command-line front end for the Voxa client.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use voxa_client::config::{default_config_path, load_config, save_config};
use voxa_client::{
    ApiError, ClientConfig, ContentCategory, ProfileUpdate, RecordingUpload, Role, SessionClient,
};

/// Voxa - record, upload and manage your audio history
#[derive(Parser)]
#[command(name = "voxa")]
#[command(about = "Client for the Voxa recording backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file path (default: ~/.config/voxa/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend origin, e.g. http://10.0.0.5:3000
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register { email: String, password: String },
    /// Log in and store the session token
    Login { email: String, password: String },
    /// Forget the session token
    Logout,
    /// Show whether a session token is stored
    Status,
    /// Show the logged-in user's profile
    Whoami {
        /// One line instead of the full JSON record
        #[arg(long)]
        brief: bool,
    },
    /// List saved recordings
    Recordings {
        /// One line per recording instead of the full JSON records
        #[arg(long)]
        brief: bool,
    },
    /// Upload an audio file to the recording history
    Upload {
        /// Audio file, or `-` to read a captured clip from stdin
        file: PathBuf,
        /// Title (defaults to the file name, or Recording_<unix millis>.m4a for stdin)
        #[arg(long)]
        title: Option<String>,
        /// Duration in seconds
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Complete or update the profile
    Profile {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        /// creator, podcaster, gamer or other
        #[arg(long)]
        role: Option<Role>,
        /// Marketing, YouTube, Education, "Social Media", Podcasts, "Personal Only" or Other
        #[arg(long)]
        content_type: Option<ContentCategory>,
        /// Profile picture to upload
        #[arg(long)]
        picture: Option<PathBuf>,
    },
    /// Check that the backend is reachable
    Health,
    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => log::error!("Failed to render output: {}", e),
    }
}

fn read_stdin() -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    std::io::stdin().read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn report(err: &ApiError) -> ExitCode {
    eprintln!("{}", err.message());
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; production uses real environment variables
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config_path = match cli.config.clone().map(Ok).unwrap_or_else(default_config_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut config = load_config(&config_path);
    if let Some(base_url) = cli.base_url {
        config.base_url = Some(base_url);
    }

    if let Commands::Config { save } = cli.command {
        return show_config(&config_path, &config, save);
    }

    let client = SessionClient::from_config(&config);
    run(&client, cli.command).await
}

fn show_config(path: &std::path::Path, config: &ClientConfig, save: bool) -> ExitCode {
    if save {
        if let Err(e) = save_config(path, config) {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
        log::info!("Config written to {:?}", path);
    }
    print_json(&json!({
        "path": path.display().to_string(),
        "apiUrl": format!("{}/api", config.resolve_base_url()),
        "config": config,
    }));
    ExitCode::SUCCESS
}

async fn run(client: &SessionClient, command: Commands) -> ExitCode {
    match command {
        Commands::Register { email, password } => match client.register(&email, &password).await {
            Ok(auth) => {
                print_json(&auth);
                ExitCode::SUCCESS
            }
            Err(e) => report(&e),
        },
        Commands::Login { email, password } => match client.login(&email, &password).await {
            Ok(auth) => {
                if !client.is_logged_in().await {
                    log::warn!("Login succeeded but no session token could be stored");
                }
                print_json(&auth);
                ExitCode::SUCCESS
            }
            Err(e) => report(&e),
        },
        Commands::Logout => {
            client.logout().await;
            ExitCode::SUCCESS
        }
        Commands::Status => {
            print_json(&json!({
                "loggedIn": client.is_logged_in().await,
                "apiUrl": client.api_url(),
            }));
            ExitCode::SUCCESS
        }
        Commands::Whoami { brief } => match client.get_current_user().await {
            Ok(user) => {
                if brief {
                    println!(
                        "{} {} {} {}",
                        user.id().unwrap_or_default(),
                        user.email().unwrap_or("-"),
                        user.name().unwrap_or("-"),
                        user.phone_number().unwrap_or_else(|| "-".to_string()),
                    );
                } else {
                    print_json(&user);
                }
                if user.needs_onboarding() {
                    eprintln!("Profile incomplete: run `voxa profile` to pick a role");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                if e.is_unauthorized() {
                    // Session is dead server-side; drop the stale token.
                    client.logout().await;
                    eprintln!("Session expired, please log in again");
                }
                report(&e)
            }
        },
        Commands::Recordings { brief } => match client.get_recordings().await {
            Ok(recordings) if brief => {
                for recording in &recordings {
                    let created = recording
                        .created_at()
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{}  {:>6}  {}  {}",
                        created,
                        recording.display_duration(),
                        recording.display_title(),
                        recording.original_audio_url().unwrap_or("-"),
                    );
                }
                ExitCode::SUCCESS
            }
            Ok(recordings) => {
                print_json(&recordings);
                ExitCode::SUCCESS
            }
            Err(e) => report(&e),
        },
        Commands::Upload {
            file,
            title,
            duration,
        } => {
            let upload = if file.as_os_str() == "-" {
                read_stdin().map(|bytes| RecordingUpload::captured(bytes, duration, Utc::now()))
            } else {
                RecordingUpload::from_path(&file, duration).await
            };
            let mut upload = match upload {
                Ok(upload) => upload,
                Err(e) => {
                    eprintln!("Failed to read {:?}: {}", file, e);
                    return ExitCode::FAILURE;
                }
            };
            if let Some(title) = title {
                upload.title = title;
            }
            match client.save_recording(upload).await {
                Ok(recording) => {
                    print_json(&recording);
                    ExitCode::SUCCESS
                }
                Err(e) => report(&e),
            }
        }
        Commands::Profile {
            name,
            phone,
            role,
            content_type,
            picture,
        } => {
            let mut update = ProfileUpdate::new(&name, &phone);
            update.role = role;
            update.content_type = content_type;
            if !update.is_complete() {
                eprintln!("Name and phone number are required");
                return ExitCode::FAILURE;
            }
            if let Some(path) = picture {
                update = match update.picture_from_path(&path).await {
                    Ok(update) => update,
                    Err(e) => {
                        eprintln!("Failed to read {:?}: {}", path, e);
                        return ExitCode::FAILURE;
                    }
                };
            }
            match client.update_profile(update).await {
                Ok(user) => {
                    print_json(&user);
                    ExitCode::SUCCESS
                }
                Err(e) => report(&e),
            }
        }
        Commands::Health => match client.check_health().await {
            Ok(body) => {
                print_json(&body);
                ExitCode::SUCCESS
            }
            Err(e) => report(&e),
        },
        Commands::Config { .. } => ExitCode::SUCCESS,
    }
}
