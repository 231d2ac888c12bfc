// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `palaver login`, `logout`, and `me` command implementations.

use std::io::{IsTerminal, Write};

use palaver_api::ApiClient;
use palaver_core::PalaverError;
use tracing::info;

/// Run the `palaver login` command.
///
/// Prompts for the password (without echo on a TTY), exchanges the
/// credentials for a token pair, and persists it for later commands.
pub async fn run_login(client: &ApiClient, email: &str) -> Result<(), PalaverError> {
    let password = read_password()?;
    client.login(email, &password).await?;
    info!(email, "signed in");
    println!("Signed in as {email}.");
    Ok(())
}

/// Run the `palaver logout` command.
pub fn run_logout(client: &ApiClient) -> Result<(), PalaverError> {
    client.logout();
    println!("Signed out.");
    Ok(())
}

/// Run the `palaver me` command.
pub async fn run_me(client: &ApiClient) -> Result<(), PalaverError> {
    let profile = client.me().await?;
    println!("id:    {}", profile.id);
    println!("email: {}", profile.email);
    if let Some(name) = &profile.full_name {
        println!("name:  {name}");
    }
    if let Some(role) = &profile.role {
        println!("role:  {role}");
    }
    Ok(())
}

/// Read the password from stdin, hiding input when attached to a TTY.
///
/// `PALAVER_PASSWORD` overrides the prompt for scripted use.
fn read_password() -> Result<String, PalaverError> {
    if let Ok(password) = std::env::var("PALAVER_PASSWORD") {
        return Ok(password);
    }

    if std::io::stdin().is_terminal() {
        print!("Password: ");
        std::io::stdout()
            .flush()
            .map_err(|e| PalaverError::Internal(format!("failed to flush stdout: {e}")))?;
        rpassword::read_password()
            .map_err(|e| PalaverError::Internal(format!("failed to read password: {e}")))
    } else {
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| PalaverError::Internal(format!("failed to read password: {e}")))?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
