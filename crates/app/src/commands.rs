//! Command dispatch.

use std::sync::Arc;

use anyhow::{Context, bail};
use roster_application::{
    ApiError, ApiResult, AuthenticatedClient, HttpTransport, Login, LoginInput, Logout,
};
use roster_domain::ApiResponse;
use tracing::debug;

use crate::cli::Command;

/// Runs one command against the pipeline.
pub async fn run<T: HttpTransport + 'static>(
    command: Command,
    client: &Arc<AuthenticatedClient<T>>,
) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");
    match command {
        Command::Login { email, password } => {
            let identity = Login::new(Arc::clone(client))
                .execute(LoginInput { email, password })
                .await?;
            println!("Signed in as {} <{}> ({:?})", identity.name, identity.email, identity.role);
        }
        Command::Logout => {
            Logout::new(Arc::clone(client)).execute().await;
            println!("Signed out");
        }
        Command::Whoami => match client.store().identity() {
            Some(identity) => {
                println!("{} <{}> ({:?})", identity.name, identity.email, identity.role);
            }
            None => println!("Not signed in"),
        },
        Command::Get { path } => print_outcome(client.get(&path).await)?,
        Command::Post { path, json } => {
            let body: serde_json::Value =
                serde_json::from_str(&json).context("--json is not valid JSON")?;
            print_outcome(client.post(&path, body).await)?;
        }
        Command::Delete { path } => print_outcome(client.delete(&path).await)?,
    }
    Ok(())
}

fn print_outcome(outcome: ApiResult<ApiResponse>) -> anyhow::Result<()> {
    match outcome {
        Ok(response) => {
            println!("{}", response.text());
            Ok(())
        }
        Err(ApiError::Transport(e)) => Err(e.into()),
        Err(e) => {
            if let Some(response) = e.response() {
                eprintln!("{}", response.text());
            }
            bail!(e)
        }
    }
}
