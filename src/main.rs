use clap::{Arg, Command};
use crescere_web::consent::{
    Category, ConsentController, ConsentGate, ConsentSelection, ConsentState, ConsentStore,
    FileStorage, TrackingFacade,
};
use crescere_web::Config;
use log::LevelFilter;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("crescere-web")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Contact form backend and cookie consent tooling for the Crescere website")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/crescere-web.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity, including SMTP settings")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("consent-status")
                .long("consent-status")
                .help("Show the stored cookie consent")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("consent-accept-all")
                .long("consent-accept-all")
                .help("Record consent for every cookie category")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("consent-reject-all")
                .long("consent-reject-all")
                .help("Record consent for necessary cookies only")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("consent-save")
                .long("consent-save")
                .value_name("CATEGORIES")
                .help(
                    "Record consent for a comma separated list of categories \
                     (functional,analytical,marketing)",
                )
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("consent-clear")
                .long("consent-clear")
                .help("Remove the stored cookie consent")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/crescere-web.yaml");

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        test_config(&config);
        return;
    }

    let store = Arc::new(ConsentStore::new(Arc::new(FileStorage::new(
        &config.consent.storage_path,
    ))));

    if matches.get_flag("consent-clear") {
        match store.clear() {
            Ok(()) => println!("✅ Cookie consent cleared"),
            Err(e) => {
                eprintln!("❌ Failed to clear cookie consent: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let consent_action = matches.get_flag("consent-status")
        || matches.get_flag("consent-accept-all")
        || matches.get_flag("consent-reject-all")
        || matches.contains_id("consent-save");

    if consent_action {
        let mut controller = consent_controller(store.clone());
        controller.mount();

        let state = if matches.get_flag("consent-accept-all") {
            Some(controller.accept_all())
        } else if matches.get_flag("consent-reject-all") {
            Some(controller.reject_all())
        } else if let Some(list) = matches.get_one::<String>("consent-save") {
            match parse_categories(list) {
                Ok(categories) => {
                    Some(controller.save_selected(ConsentSelection::only(&categories)))
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    process::exit(1);
                }
            }
        } else {
            None
        };

        if state == Some(ConsentState::BannerVisible) {
            eprintln!("❌ Failed to store cookie consent");
            process::exit(1);
        }

        print_consent(&controller, &store);
        return;
    }

    log::info!("Starting crescere-web...");
    if let Err(e) = crescere_web::start_server(config).await {
        log::error!("Server error: {e}");
        process::exit(1);
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    let mut config = if std::path::Path::new(path).exists() {
        Config::from_file(path)?
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Config::default()
    };
    config.apply_env();
    Ok(config)
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn test_config(config: &Config) {
    println!("🔍 Testing configuration...");
    println!();
    println!("Listen address: {}", config.bind_address());
    println!("Max upload size: {} bytes", config.server.max_upload_bytes);
    println!("Consent storage: {}", config.consent.storage_path);

    match config.smtp_settings() {
        Ok(settings) => {
            println!(
                "SMTP: {}:{} as {} ({})",
                settings.host,
                settings.port,
                settings.username,
                if settings.implicit_tls() {
                    "implicit TLS"
                } else {
                    "STARTTLS"
                }
            );
            println!("Notifications go to: {}", settings.contact_address);
            println!("✅ Configuration validated");
        }
        Err(e) => {
            println!("❌ Configuration validation failed:");
            println!("Error: {e}");
            process::exit(1);
        }
    }
}

fn consent_controller(store: Arc<ConsentStore>) -> ConsentController {
    let gate = ConsentGate::new(store.clone());
    let tracking = TrackingFacade::disabled(gate.clone());
    ConsentController::new(store, gate, tracking)
}

fn parse_categories(list: &str) -> anyhow::Result<Vec<Category>> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<Category>().map_err(anyhow::Error::from))
        .collect()
}

fn print_consent(controller: &ConsentController, store: &ConsentStore) {
    let status = store.status();

    println!("🍪 Cookie consent");
    println!("═══════════════════════════════════════");
    println!("Consent given: {}", if status.has_consented { "yes" } else { "no" });
    if let Some(timestamp) = status.timestamp {
        let saved = chrono::DateTime::from_timestamp_millis(timestamp)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| timestamp.to_string());
        println!("Saved at: {saved}");
    }
    println!("  necessary: always");
    for category in Category::ALL {
        let allowed = controller.is_allowed(category);
        println!("  {category}: {}", if allowed { "allowed" } else { "denied" });
    }
    if controller.is_banner_visible() {
        println!();
        println!("💡 The consent banner would be shown to this visitor");
    }
}
