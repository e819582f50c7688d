use std::io::IsTerminal;

use routerctl_core::{Credentials, Error, default_gateway};
use tracing::debug;

/// Environment variable holding the router password.
pub const PASSWORD_ENV: &str = "ROUTERCTL_PASSWORD";

/// Read password securely based on the provided options.
///
/// # Priority
///
/// 1. If `password_stdin` is true, read from stdin
/// 2. Otherwise, prompt interactively (if terminal is available)
pub fn read_password(password_stdin: bool, prompt: &str) -> Result<String, String> {
    if password_stdin {
        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| format!("Failed to read password from stdin: {}", e))?;
        return Ok(input.trim_end_matches(['\r', '\n']).to_string());
    }

    if std::io::stdin().is_terminal() {
        eprint!("{}: ", prompt);
        rpassword::read_password().map_err(|e| format!("Failed to read password: {}", e))
    } else {
        Err("No password provided. Use --password-stdin when piping input.".to_string())
    }
}

/// Get credentials from CLI options and environment.
///
/// Password is read from ROUTERCTL_PASSWORD env var, stdin (if --password-stdin),
/// or interactively prompted.
pub fn get_credentials(username: String, password_stdin: bool) -> Result<Credentials, String> {
    if let Ok(pass) = std::env::var(PASSWORD_ENV) {
        debug!(username = %username, "using password from environment");
        return Ok(Credentials::new(username, pass));
    }

    let prompt = format!("Password for {}", username);
    let pass = read_password(password_stdin, &prompt)?;
    Ok(Credentials::new(username, pass))
}

/// Returns the router address to use, falling back to the default gateway.
pub fn resolve_host(host: Option<String>) -> Result<String, Error> {
    match host {
        Some(host) if !host.trim().is_empty() => Ok(host),
        _ => {
            let gateway = default_gateway()?;
            debug!(%gateway, "using default gateway as router address");
            Ok(gateway.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_host_prefers_explicit_value() {
        assert_eq!(
            resolve_host(Some("192.168.8.1".into())).unwrap(),
            "192.168.8.1"
        );
    }
}
