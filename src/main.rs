use anyhow::Result;

use tenki_ui::{terminal, ForecastModel, ForecastServices};

fn main() -> Result<()> {
    // Initialize core
    tenki_core::init()?;

    // Load and validate configuration
    let mut app = match tenki_core::App::new() {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };
    let notices: Vec<String> = app
        .config_warnings()
        .iter()
        .map(|w| format!("Config warning: {}", w))
        .collect();

    let services = ForecastServices::init(app.config())?;
    let mut model = ForecastModel::new(services);

    tracing::info!("Tenki started");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    terminal::run(&mut model, &notices, stdin.lock(), &mut stdout)?;

    // Graceful shutdown
    app.shutdown()?;

    Ok(())
}
