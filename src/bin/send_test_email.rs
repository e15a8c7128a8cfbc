//! Sends one test message to the configured admin address.
//!
//! Exits non-zero when mail is not configured or the API rejects the send.

use std::process::ExitCode;

use pingora_core::server::configuration::Opt;
use validator::Validate;

use avalance_site::{config::Config, notify::Notifier};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::parse_args();
    let config = match Config::resolve_with_opt_and_env(&opt) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let Some(sendgrid) = config.site.sendgrid else {
        eprintln!("Email is not configured: set SENDGRID_API_KEY, EMAIL_FROM and ADMIN_EMAIL");
        return ExitCode::FAILURE;
    };
    if let Err(e) = sendgrid.validate() {
        eprintln!("Invalid email settings: {e}");
        return ExitCode::FAILURE;
    }

    let notifier = Notifier::from_config(&sendgrid);
    log::info!("Sending test email to {}", notifier.admin_email());

    match notifier.send_test_email().await {
        Ok(receipt) => {
            println!(
                "Test email sent, message id {}",
                receipt.message_id.as_deref().unwrap_or("unknown")
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to send test email: {e}");
            ExitCode::FAILURE
        }
    }
}
