use pingora_core::server::{configuration::Opt, Server};

use avalance_site::{config::Config, logging::Logger, service::http::SiteHttpApp};

fn main() {
    // Load configuration and command-line arguments
    let cli_options = Opt::parse_args();
    let config = match Config::load_with_opt_and_env(&cli_options) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    let logger = if let Some(log_cfg) = &config.site.log {
        let logger = Logger::new(log_cfg.clone());
        logger.init_env_logger();
        Some(logger)
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        None
    };

    log::info!(
        "Starting {} deployment in {} mode",
        config.site.deployment,
        config.site.environment
    );

    log::info!("Adding listeners...");
    let site_service = match SiteHttpApp::site_http_service(&config.site) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to add listeners: {e}");
            std::process::exit(1);
        }
    };

    let mut site_server = Server::new_with_opt_and_conf(Some(cli_options), config.pingora);

    if let Some(log_service) = logger {
        log::info!("Adding log sync service...");
        site_server.add_service(log_service);
    }

    log::info!("Bootstrapping...");
    site_server.bootstrap();

    log::info!("Bootstrapped. Adding Services...");
    site_server.add_service(site_service);

    log::info!("Starting Server...");
    site_server.run_forever();
}
