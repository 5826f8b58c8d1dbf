use std::time::Duration;

use clap::Parser;

use remorch_connect::cli::Cli;
use remorch_connect::config::{self, Config};
use remorch_connect::descriptor::{self, ConnectionDescriptor};
use remorch_connect::error::ConnectError;
use remorch_connect::net::{self, AddressSource, SystemAddressProvider};
use remorch_connect::present::{self, ConnectionSummary, Palette};
use remorch_connect::session::{self, SessionBackend, SessionResult, TmuxBackend};
use remorch_connect::{logging, paths, qr, setup, util};

/// Pause before handing the terminal to tmux so the info stays readable.
const ATTACH_DELAY: Duration = Duration::from_millis(500);

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let log_file = logging::init(cli.verbose);
    let palette = Palette::for_stdout();

    // Setup needs neither config nor network
    if cli.setup {
        let env = setup::ShellEnv::from_process();
        print!("{}", setup::run(&env, &util::utc_date(), &palette));
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => config::load_config(path, true)?,
        None => config::load_config(&paths::default_config_path(), false)?,
    };
    let backend = TmuxBackend::new(config.tmux.binary.clone());

    println!("{}", present::banner(&palette));

    let Some(command) = cli.command_line() else {
        show_connection_info(&config, &backend, &palette, None).await?;
        return Ok(());
    };

    let session_name =
        session::session_name_for(&command).ok_or_else(|| ConnectError::Validation {
            message: format!("cannot derive a tmux session name from '{command}'"),
        })?;

    if let Err(e) = log_file.activate(&paths::logs_dir().join("connect.log")) {
        tracing::debug!("file logging unavailable: {e}");
    }
    tracing::info!(session = %session_name, command = %command, "launching");

    println!("{}", present::launch_header(&palette, &command, &session_name));

    let result = session::ensure_session(&backend, &session_name, &command);
    println!(
        "{}",
        present::session_outcome(&palette, &result, &session_name, &command)
    );
    if let SessionResult::Failed(message) = result {
        return Err(ConnectError::SessionCreation {
            name: session_name,
            message,
        }
        .into());
    }

    show_connection_info(&config, &backend, &palette, Some(&session_name)).await?;

    if cli.no_attach {
        print!("{}", present::background_notice(&palette, &session_name));
        return Ok(());
    }

    println!("{}", present::attach_notice(&palette));
    tokio::time::sleep(ATTACH_DELAY).await;
    backend.attach(&session_name)?;
    print!("{}", present::detached_notice(&palette, &session_name));

    Ok(())
}

/// Pick an address, build the descriptor and print everything the phone needs.
async fn show_connection_info(
    config: &Config,
    backend: &impl SessionBackend,
    palette: &Palette,
    session: Option<&str>,
) -> Result<(), ConnectError> {
    let provider = SystemAddressProvider::new(config.network.overlay_cli.clone());
    let selected = net::select_primary_address(&provider)?;
    tracing::info!(address = %selected.address, source = ?selected.source, "selected address");

    let sessions = backend.list_sessions();
    let descriptor = ConnectionDescriptor::new(
        selected.address,
        descriptor::current_user()?,
        session.map(String::from),
    );
    let encoded = descriptor::encode(&descriptor)?;
    let app_uri = encoded.app_uri(&config.links.scheme);
    let web_url = encoded.web_url(&config.links.web_base);

    let summary = ConnectionSummary {
        descriptor: &descriptor,
        short_code: &encoded.short_code,
        web_url: &web_url,
        overlay_address: (selected.source == AddressSource::OverlayCli)
            .then_some(selected.address),
        sessions: &sessions,
    };
    println!("{}", present::connection_summary(palette, &summary));

    let image = paths::qr_image_path(session);
    let interactive = console::Term::stdout().is_term();
    let display = qr::show(&app_uri, &image, &config.qr, interactive).await;

    print!("{}", present::qr_section(palette, &display, &image, &app_uri));
    println!("{}", present::access_details(palette, &summary));
    Ok(())
}
