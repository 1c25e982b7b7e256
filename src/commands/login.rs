use super::local_tracker;
use crate::{
    libs::{auth::decode_expiry, messages::Message},
    msg_bail_anyhow, msg_error_anyhow, msg_success,
};
use anyhow::Result;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Password};

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Access token (JWT); prompted for when omitted
    token: Option<String>,
    /// Refresh token used to renew the access token
    #[arg(short, long)]
    refresh_token: Option<String>,
}

pub async fn cmd(args: LoginArgs) -> Result<()> {
    let token = match args.token {
        Some(token) => token,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptAccessToken.to_string())
            .interact()?,
    };

    if decode_expiry(&token).is_err() {
        msg_bail_anyhow!(Message::TokenUndecodable);
    }

    let mut tracker = local_tracker().await?;
    if !tracker.auth_updated(Some(token), args.refresh_token) {
        return Err(msg_error_anyhow!(Message::SessionExpired));
    }

    msg_success!(Message::LoggedIn);
    tracker.push().await;
    Ok(())
}
