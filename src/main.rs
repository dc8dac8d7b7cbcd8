use anyhow::Context;
use log::{info, LevelFilter};
use muezzin::{
    config::Config,
    console::Console,
    display::{CountdownDisplay, Event, Services},
    geocode::GeocodeXyz,
    indicator::TerminalIndicator,
    settings::SettingsStore,
    store::FileStore,
};
use std::sync::Arc;

// Everything runs on one thread. The only other threads are the stdin reader
// and blocking geocoder calls.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = Config::load()?;
    let store = FileStore::load(&config.settings_file);
    info!("Using settings file {}", store.path().display());

    let (console, console_input) = Console::new();
    let services = Services {
        settings: SettingsStore::new(Arc::new(store)),
        geocoder: Arc::new(GeocodeXyz::new(&config.geocode_url)),
        calculator: Arc::new(config.calculator()),
        ui: Arc::new(console),
    };
    let display = CountdownDisplay::new(
        services,
        Arc::new(TerminalIndicator::new(config.output())),
        config.scheduler(),
    );

    let events = display.sender();
    ctrlc::set_handler(move || {
        let _ = events.send(Event::Shutdown);
    })
    .context("Error setting signal handler")?;

    let _router = Console::spawn_router(
        console_input,
        Console::read_stdin(),
        display.sender(),
    );
    display.run().await;
    Ok(())
}
