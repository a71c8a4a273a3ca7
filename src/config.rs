//! Command line and environment configuration.
//!
//! Every option can also be given through the environment (or a `.env` file
//! loaded by the binary before parsing).

use crate::application::PlatformSettings;
use crate::application::accounts::DEFAULT_SIGNUP_BONUS;
use crate::application::contact::DEFAULT_OPERATOR_EMAIL;
use crate::error::{Result, WorkflowError};
use crate::infrastructure::token::TokenIssuer;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "ecoledger", author, version, about = "Eco-tourism workflow core: EcoCoin ledger, moderation, bookings and taxi dispatch")]
pub struct Cli {
    /// Log level for this crate when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Validate a catalog directory and print what it contains
    CheckCatalog {
        /// Directory holding regions.csv, attractions.csv, hotels.csv, tasks.csv and stations.csv
        dir: PathBuf,
    },
    /// Recompute every ledger from its entries and freeze the inconsistent ones
    #[cfg(feature = "storage-rocksdb")]
    Audit {
        #[arg(long, env = "DB_PATH")]
        db_path: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8001")]
    pub listen: SocketAddr,

    /// Path to persistent database. Without it everything lives in memory.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long, env = "DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Catalog directory; the built-in seed catalog is used when absent
    #[arg(long, env = "CATALOG_DIR")]
    pub catalog_dir: Option<PathBuf>,

    /// Development mode: allows running without a JWT secret
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Secret for signing access tokens (at least 32 characters)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "JWT_EXPIRATION_HOURS", default_value = "720")]
    pub jwt_expiry_hours: i64,

    /// EcoCoins credited to every self-registered account
    #[arg(long, env = "SIGNUP_BONUS", default_value_t = DEFAULT_SIGNUP_BONUS)]
    pub signup_bonus: u64,

    /// Address contact-form messages are forwarded to
    #[arg(long, env = "OPERATOR_EMAIL", default_value = DEFAULT_OPERATOR_EMAIL)]
    pub operator_email: String,

    /// Bootstrap admin account, created on startup when missing
    #[arg(long, env = "ADMIN_EMAIL", requires = "admin_password")]
    pub admin_email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    #[arg(long, env = "ADMIN_NAME", default_value = "Administrator")]
    pub admin_name: String,
}

/// Credentials of the bootstrap admin.
pub struct AdminBootstrap<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl ServeArgs {
    pub fn validate(&self) -> Result<()> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err(WorkflowError::ValidationError(
                "JWT_SECRET is required outside development mode".to_string(),
            ));
        }
        if self.admin_password.is_some() && self.admin_email.is_none() {
            return Err(WorkflowError::ValidationError(
                "ADMIN_PASSWORD given without ADMIN_EMAIL".to_string(),
            ));
        }
        Ok(())
    }

    pub fn settings(&self) -> Result<PlatformSettings> {
        self.validate()?;
        let tokens = match &self.jwt_secret {
            Some(secret) => TokenIssuer::new(secret.clone(), self.jwt_expiry_hours)?,
            None => TokenIssuer::new_dev(),
        };
        Ok(PlatformSettings {
            tokens,
            signup_bonus: self.signup_bonus,
            operator_email: self.operator_email.clone(),
        })
    }

    pub fn admin(&self) -> Option<AdminBootstrap<'_>> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                name: &self.admin_name,
                email,
                password,
            }),
            _ => None,
        }
    }
}
