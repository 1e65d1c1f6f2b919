//! SMPP receiver daemon
//!
//! Binds to every SMSC listed in the configuration file and passes each
//! received SMS to the configured hook program as JSON.
//!
//! ```bash
//! smpp-receiver -c /etc/smpp-receiver/configure.json
//! ```

use argh::FromArgs;
use smpp_receiver::receiver::{self, Configuration};
use std::error::Error;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Receive SMS from SMSCs over SMPP and hand them to a hook program
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// path of the configuration file (default: configure.json)
    #[argh(option, short = 'c', default = "String::from(\"configure.json\")")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        // stdout belongs to the hook program
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match Configuration::load(&cli_args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %cli_args.config, error = %e, "cannot load configuration");
            return Err(e.into());
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("interrupted, unbinding"),
                Err(e) => error!(error = %e, "cannot listen for Ctrl-C"),
            }
            shutdown.cancel();
        }
    });

    receiver::run(config, shutdown).await;
    Ok(())
}
