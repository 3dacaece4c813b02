//! Eye Break CLI - periodic focus/break reminder
//!
//! Alternates a long focus interval with a short eye break:
//! - 20 minutes of focus
//! - 20 seconds looking ~6 m (20 ft) away, with a countdown and beeps

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tokio::net::UnixStream;
use tokio::time::{sleep, Duration};

use eyebreak::cli::{Cli, Commands, DaemonArgs, Display, IpcClient, SettingsAction};
use eyebreak::daemon::{DaemonService, IpcServer, RequestHandler, Services};
use eyebreak::notification::DesktopNotifier;
use eyebreak::settings::JsonSettingsStore;
use eyebreak::sound::{try_create_player, SilentTonePlayer, TonePlayer};
use eyebreak::status::STATUS_POLL_INTERVAL_MS;
use eyebreak::window::TerminalBreakWindow;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Daemon(args)) => {
            run_daemon(args).await?;
        }
        Some(Commands::Start) => {
            let response = IpcClient::new()?.start().await?;
            Display::show_start_success(&response);
        }
        Some(Commands::Pause) => {
            let response = IpcClient::new()?.pause().await?;
            Display::show_pause_success(&response);
        }
        Some(Commands::Silence) => {
            let response = IpcClient::new()?.silence().await?;
            Display::show_silence_success(&response);
        }
        Some(Commands::Status { watch }) => {
            let client = IpcClient::new()?;
            loop {
                let response = client.status().await?;
                Display::show_status(&response);
                if !watch {
                    break;
                }
                sleep(Duration::from_millis(STATUS_POLL_INTERVAL_MS)).await;
            }
        }
        Some(Commands::Settings { action }) => {
            let client = IpcClient::new()?;
            match action {
                None => {
                    let response = client.settings().await?;
                    let settings = response
                        .data
                        .and_then(|data| data.settings)
                        .context("デーモンが設定を返しませんでした")?;
                    Display::show_settings(&settings);
                }
                Some(SettingsAction::Set(args)) => {
                    let patch = args.to_patch();
                    if patch.is_empty() {
                        anyhow::bail!("変更する設定を1つ以上指定してください");
                    }
                    let response = client.save_settings(patch).await?;
                    let settings = response
                        .data
                        .and_then(|data| data.settings)
                        .context("デーモンが設定を返しませんでした")?;
                    Display::show_settings_saved(&settings);
                }
            }
        }
        Some(Commands::Quit) => {
            IpcClient::new()?.quit().await?;
            Display::show_quit_success();
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Runs the scheduler daemon until quit or Ctrl-C.
async fn run_daemon(args: DaemonArgs) -> Result<()> {
    let socket_path = IpcClient::default_socket_path()?;
    if UnixStream::connect(&socket_path).await.is_ok() {
        anyhow::bail!(
            "デーモンは既に起動しています: {}",
            socket_path.display()
        );
    }

    let settings_store =
        JsonSettingsStore::with_default_path().context("設定ファイルの場所を決定できません")?;
    tracing::debug!(path = %settings_store.path().display(), "設定ファイル");

    let tones: Arc<dyn TonePlayer> = if args.mute {
        Arc::new(SilentTonePlayer)
    } else {
        match try_create_player() {
            Some(player) => Arc::new(player),
            None => Arc::new(SilentTonePlayer),
        }
    };

    let services = Services {
        settings: Arc::new(settings_store),
        notifier: Arc::new(DesktopNotifier::new()),
        window: Arc::new(TerminalBreakWindow::new()),
        tones,
    };

    let (mut service, commands) = DaemonService::new(services);
    let server = IpcServer::new(&socket_path)?;
    tracing::info!(socket = %server.socket_path().display(), "デーモンを起動しました");
    let server_task = tokio::spawn(server.serve(RequestHandler::new(commands)));

    if args.start {
        service.start();
    }
    let result = service.run().await;

    // Dropping the server removes the socket file.
    server_task.abort();
    let _ = server_task.await;
    tracing::info!("デーモンを終了しました");

    result
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
