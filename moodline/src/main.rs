#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use browser::BrowserNavigator;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use moodconfig::{ConfigError, FileTokenStore, MoodConfig};
use moodlift::types::{Mood, MoodUpdate, NewMood, Transition};
use moodlift::{
    ApiClient, ConnectionOutcome, Error as MoodError, MoodClient, PlaylistFlow, PlaylistOutcome,
    Resume, Session, SessionState,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use url::Url;

mod browser;
mod logging;
mod render;

#[derive(Parser)]
#[command(name = "moodline", about = "Track moods and mood transitions")]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Use this config file instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print URLs instead of opening a browser
    #[arg(long, global = true)]
    no_browser: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Register {
        username: String,
        email: String,
    },
    /// Log in and store the session token
    Login {
        /// Overrides the configured username
        username: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Show session state and the configured server
    Status,
    /// List all moods
    Moods,
    /// Show one mood
    MoodShow {
        /// Mood id or name
        mood: String,
    },
    /// Create a mood (admin)
    MoodCreate {
        name: String,
        /// Hex color, e.g. #FFD700
        color: String,
    },
    /// Update a mood (admin)
    MoodUpdate {
        /// Mood id or name
        mood: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a mood (admin)
    MoodDelete {
        /// Mood id or name
        mood: String,
    },
    /// Record a move from how you feel now to how you'd like to feel
    Record {
        /// Current mood (id or name)
        from: String,
        /// Desired mood (id or name)
        to: String,
        /// Also request a playlist for the new transition
        #[arg(long)]
        playlist: bool,
    },
    /// Show your transitions, newest first
    History {
        /// Number of transitions to show (default from config)
        #[arg(short = 'n', long)]
        limit: Option<u64>,
        /// Number of newest transitions to skip
        #[arg(long)]
        skip: Option<u64>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one of your transitions
    TransitionShow {
        id: i64,
    },
    /// Delete one of your transitions
    TransitionDelete {
        id: i64,
    },
    /// Your most frequent transitions
    Stats {
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: u64,
    },
    /// Transitions of all users
    AllTransitions {
        #[arg(short = 'n', long)]
        limit: Option<u64>,
        #[arg(long)]
        skip: Option<u64>,
    },
    /// Check whether a Spotify account is linked
    SpotifyStatus,
    /// Link a Spotify account (opens the consent screen)
    SpotifyConnect,
    /// Continue after the consent screen sent the browser back
    SpotifyResume {
        /// The URL the browser landed on (with ?auth_status=...)
        returned_url: String,
        /// Transition to build a playlist for (default: your newest)
        #[arg(long)]
        transition: Option<i64>,
    },
    /// Create a playlist for a transition and open it
    Playlist {
        transition_id: i64,
    },
    /// List generated playlists
    Playlists,
    /// Check that the API is reachable
    Doctor,
    /// Generate shell completions
    #[command(hide = true)]
    Completions {
        /// The shell to generate completions for
        shell: Shell,
    },
}

/// Everything a command needs, built from the config.
struct App {
    config: MoodConfig,
    api: ApiClient,
    open_browser: bool,
}

impl App {
    fn load(config_path: Option<&PathBuf>, open_browser: bool) -> Result<Self> {
        let config = match config_path {
            Some(path) => MoodConfig::load_from(path),
            None => MoodConfig::load(),
        }
        .with_context(|| "Failed to load moodlift config")?;
        let tokens = FileTokenStore::new().with_context(|| "Failed to locate session file")?;
        let api = config
            .api_client(Arc::new(tokens))
            .with_context(|| "Failed to build API client")?;
        if !config.display.show_colors {
            colored::control::set_override(false);
        }
        Ok(Self {
            config,
            api,
            open_browser,
        })
    }

    fn session(&self) -> Session {
        Session::new(self.api.clone())
    }

    fn moods(&self) -> MoodClient {
        MoodClient::new(self.api.clone())
    }

    fn playlists(&self) -> PlaylistFlow {
        PlaylistFlow::new(self.api.clone())
    }

    const fn colors(&self) -> bool {
        self.config.display.show_colors
    }

    fn navigator(&self, location: Option<&str>) -> Result<BrowserNavigator> {
        let location = location.unwrap_or(&self.config.server.return_url);
        let url = Url::parse(location).with_context(|| format!("Invalid URL: {location}"))?;
        Ok(BrowserNavigator::new(url, self.open_browser))
    }

    /// Resolves a mood given as an id or a (case-insensitive) name.
    async fn find_mood(&self, key: &str) -> Result<Mood> {
        let client = self.moods();
        if let Ok(id) = key.parse::<i64>() {
            return Ok(client.get_mood(id).await?);
        }
        let moods = client.list_moods().await?;
        moods
            .into_iter()
            .find(|mood| mood.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| {
                anyhow::anyhow!("No mood named '{key}'. Run `moodline moods` to list them.")
            })
    }

    async fn create_playlist(&self, transition: &Transition) -> Result<()> {
        let flow = self.playlists();
        if !flow.probe().await {
            println!("No Spotify account linked yet.");
            flow.connect(&mut self.navigator(None)?)?;
            println!(
                "After granting access, run: moodline spotify-resume <url-you-land-on> --transition {}",
                transition.id
            );
            return Ok(());
        }
        let outcome = flow
            .create_playlist(transition, &mut self.navigator(None)?, |playlist| {
                println!("Created {}", render::format_playlist(playlist));
            })
            .await?;
        report_outcome(&outcome);
        Ok(())
    }
}

fn report_outcome(outcome: &PlaylistOutcome) {
    match outcome {
        PlaylistOutcome::Created(_) => {}
        PlaylistOutcome::Redirected(_) => {
            println!("Spotify needs to be linked again; rerun after granting access.");
        }
    }
}

fn handle_error(err: &anyhow::Error) -> ! {
    let api_error = err.downcast_ref::<MoodError>().or_else(|| {
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::Client(inner)) => Some(inner),
            _ => None,
        }
    });
    if let Some(api_error) = api_error {
        eprintln!("{}", render::format_api_error(api_error));
        process::exit(1);
    }

    eprintln!("{err:#}");
    process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        handle_error(&err);
    }

    Ok(())
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "moodline", &mut std::io::stdout());
        return Ok(());
    }

    let app = App::load(cli.config.as_ref(), !cli.no_browser)?;
    let colors = app.colors();

    match cli.command {
        Command::Completions { .. } => {}
        Command::Register { username, email } => {
            let password = moodconfig::prompt_password("password")?;
            let user = app.session().register(&username, &email, &password).await?;
            println!("Registered {}", render::format_user(&user));
            println!("Run `moodline login {}` to start a session.", user.username);
        }
        Command::Login { username } => {
            let credentials = app.config.credentials(username.as_deref())?;
            let session = app.session();
            session
                .login(&credentials.username, &credentials.password)
                .await?;
            println!("Logged in as {}", credentials.username.bold());
        }
        Command::Logout => {
            app.session().logout();
            println!("Logged out.");
        }
        Command::Whoami => {
            let user = app.session().current_user().await?;
            println!("{}", render::format_user(&user));
            if let Some(created_at) = user.created_at {
                println!("member since {}", moodconfig::format_timestamp(created_at));
            }
        }
        Command::Status => {
            let state = match app.session().state() {
                SessionState::Authenticated => "logged in".green().to_string(),
                SessionState::Anonymous => "logged out".yellow().to_string(),
                other => format!("{other:?}"),
            };
            println!("server:  {}", app.api.base_url());
            println!("session: {state}");
        }
        Command::Moods => {
            for mood in app.moods().list_moods().await? {
                println!("{}", render::format_mood(&mood, colors));
            }
        }
        Command::MoodShow { mood } => {
            let mood = app.find_mood(&mood).await?;
            println!("{}", render::format_mood(&mood, colors));
        }
        Command::MoodCreate { name, color } => {
            let mood = app.moods().create_mood(&NewMood::new(name, color)).await?;
            println!("{}", render::format_mood(&mood, colors));
        }
        Command::MoodUpdate { mood, name, color } => {
            let mut update = MoodUpdate::new();
            if let Some(name) = name {
                update = update.with_name(name);
            }
            if let Some(color) = color {
                update = update.with_color(color);
            }
            if update.is_empty() {
                anyhow::bail!("Nothing to update: pass --name and/or --color");
            }
            let target = app.find_mood(&mood).await?;
            let updated = app.moods().update_mood(target.id, &update).await?;
            println!("{}", render::format_mood(&updated, colors));
        }
        Command::MoodDelete { mood } => {
            let target = app.find_mood(&mood).await?;
            app.moods().delete_mood(target.id).await?;
            println!("Deleted {}", target.name);
        }
        Command::Record { from, to, playlist } => {
            let initial = app.find_mood(&from).await?;
            let target = app.find_mood(&to).await?;
            let transition = app.moods().create_transition(initial.id, target.id).await?;
            println!("{}", render::format_transition(&transition, colors));
            if playlist {
                app.create_playlist(&transition).await?;
            }
        }
        Command::History { limit, skip, json } => {
            let limit = limit.or(Some(app.config.display.history_limit as u64));
            let transitions = app.moods().list_transitions_paged(skip, limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&transitions)?);
            } else if transitions.is_empty() {
                println!("No transitions recorded yet.");
            } else {
                for transition in &transitions {
                    println!("{}", render::format_transition(transition, colors));
                }
            }
        }
        Command::TransitionShow { id } => {
            let transition = app.moods().get_transition(id).await?;
            println!("{}", render::format_transition(&transition, colors));
        }
        Command::TransitionDelete { id } => {
            app.moods().delete_transition(id).await?;
            println!("Deleted transition #{id}");
        }
        Command::Stats { limit } => {
            let stats = app.moods().common_transitions(Some(limit)).await?;
            if stats.is_empty() {
                println!("No transitions recorded yet.");
            }
            for stat in &stats {
                println!("{}", render::format_stat(stat, colors));
            }
        }
        Command::AllTransitions { limit, skip } => {
            let transitions = app.moods().list_all_transitions(skip, limit).await?;
            for transition in &transitions {
                println!("{}", render::format_transition(transition, colors));
            }
        }
        Command::SpotifyStatus => match app.playlists().profile().await {
            Ok(profile) => {
                let name = profile.display_name.as_deref().unwrap_or(&profile.id);
                println!("Linked to Spotify as {}", name.green());
                if let Some(url) = profile.profile_url {
                    println!("{url}");
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "profile lookup failed");
                println!("{}", "No Spotify account linked.".yellow());
                println!("Run `moodline spotify-connect` to link one.");
            }
        },
        Command::SpotifyConnect => {
            app.playlists().connect(&mut app.navigator(None)?)?;
            println!("After granting access, run: moodline spotify-resume <url-you-land-on>");
        }
        Command::SpotifyResume {
            returned_url,
            transition,
        } => {
            let mut navigator = app.navigator(Some(&returned_url))?;
            let transition = match transition {
                Some(id) => Some(app.moods().get_transition(id).await?),
                None => app.moods().list_transitions().await?.into_iter().next(),
            };
            let flow = app.playlists();
            let resume = flow
                .resume(&mut navigator, transition.as_ref(), |playlist| {
                    println!("Created {}", render::format_playlist(playlist));
                })
                .await?;
            match resume {
                Resume::NotReturning => {
                    println!("That URL carries no auth_status; nothing to resume.");
                }
                Resume::Linked => {
                    println!("Spotify linked. Record a transition to get a playlist.");
                }
                Resume::Denied(status) => {
                    return Err(anyhow::anyhow!("Spotify link was not completed: {status}"));
                }
                Resume::Playlist(outcome) => report_outcome(&outcome),
            }
        }
        Command::Playlist { transition_id } => {
            let transition = app.moods().get_transition(transition_id).await?;
            app.create_playlist(&transition).await?;
        }
        Command::Playlists => {
            let playlists = app.playlists().list_playlists().await?;
            if playlists.is_empty() {
                println!("No playlists yet.");
            }
            for playlist in &playlists {
                println!("{}", render::format_playlist(playlist));
            }
        }
        Command::Doctor => {
            let report = app.api.check_connection().await;
            println!("GET {} ({} ms)", report.url, report.elapsed.as_millis());
            match report.outcome {
                ConnectionOutcome::Reachable {
                    status,
                    reason,
                    items,
                } => {
                    let items = items.map_or_else(String::new, |n| format!(", {n} moods"));
                    println!("{} {status} {reason}{items}", "ok".green());
                }
                ConnectionOutcome::Rejected { status, reason } => {
                    println!("{} {status} {reason}", "rejected".red());
                    process::exit(1);
                }
                ConnectionOutcome::Unreachable { error } => {
                    println!("{} {error}", "unreachable".red());
                    process::exit(1);
                }
            }
        }
    }

    Ok(())
}
