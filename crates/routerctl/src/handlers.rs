use routerctl_core::{Error, Router, RouterConfig, connect};
use tracing::{debug, warn};

use crate::cli::{Command, ConnectionArgs};
use crate::output::{self, OutputFormat};
use crate::utils::{get_credentials, resolve_host};

/// Handle the version command.
pub fn handle_version() {
    println!("routerctl {}", env!("CARGO_PKG_VERSION"));
    println!("routerctl-core {}", routerctl_core::VERSION);
}

/// Handle a command that needs a logged-in router.
///
/// Exits the process with status 1 on any error.
pub async fn handle_router(command: Command, args: ConnectionArgs, format: OutputFormat) {
    if let Err(e) = run_router(command, args, format).await {
        report_error(&e, format);
        std::process::exit(1);
    }
}

/// Prints a failure once; the log record only shows with `-v`.
fn report_error(e: &Error, format: OutputFormat) {
    debug!(kind = e.kind(), error = %e, "command failed");
    output::print_error(e, format);
}

async fn run_router(
    command: Command,
    args: ConnectionArgs,
    format: OutputFormat,
) -> Result<(), Error> {
    let host = resolve_host(args.host)?;
    let credentials = get_credentials(args.username, args.password_stdin).map_err(Error::Config)?;

    let config = RouterConfig::new(host.as_str())
        .with_credentials(credentials)
        .with_timeout(args.timeout)
        .with_max_attempts(args.attempts);

    debug!(host = %host, "connecting");
    let mut router = connect(config).await?;
    debug!(router = router.name(), base_url = router.base_url(), "logged in");

    run_command(router.as_mut(), command, format).await
}

/// Runs one command on a logged-in router.
///
/// Every command ends with a logout, whether or not it succeeded, except a
/// restart the router accepted.
async fn run_command(
    router: &mut dyn Router,
    command: Command,
    format: OutputFormat,
) -> Result<(), Error> {
    let result = match command {
        Command::Info => router
            .information()
            .await
            .map(|info| output::print_information(&info, format)),
        Command::Devices { all } => router
            .connected_devices()
            .await
            .map(|devices| output::print_devices(&devices, all, format)),
        Command::Macfilter => router
            .mac_filters()
            .await
            .map(|tables| output::print_mac_filters(&tables, format)),
        Command::Restart => match router.restart().await {
            Ok(()) => {
                output::print_info("RESTARTING", "Router is restarting", format);
                // the reboot drops the login, there is nothing to log out of
                return Ok(());
            }
            Err(e) => Err(e),
        },
        Command::Version => {
            handle_version();
            Ok(())
        }
    };

    logout(router).await;
    result
}

/// Logs out, reporting failures as warnings only.
async fn logout(router: &mut dyn Router) {
    match router.logout().await {
        Ok(()) => debug!("logged out"),
        Err(e @ Error::LogoutUnconfirmed(_)) => {
            warn!(error = %e, "router did not confirm the logout");
        }
        Err(e) => warn!(error = %e, "logout failed"),
    }
}
