//! Interactive configuration setup.
//!
//! Walks through the server and tracker settings and writes `config.json`
//! into the data directory.

use crate::{
    libs::{config::{Config, CONFIG_FILE_NAME}, data_storage::DataStorage, messages::Message},
    msg_info, msg_success,
};
use anyhow::Result;
use clap::Args;
use std::fs;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Remove the existing configuration instead of creating a new one
    #[arg(short, long)]
    delete: bool,
}

pub fn cmd(init_args: InitArgs) -> Result<()> {
    if init_args.delete {
        let path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        msg_info!(Message::ConfigDeleted);
        return Ok(());
    }

    Config::init()?.save()?;

    msg_success!(Message::ConfigSaved);
    Ok(())
}
