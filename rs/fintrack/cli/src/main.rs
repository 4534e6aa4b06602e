use anyhow::{Context, Error};
use clap::Parser;
use fintrack_config::config_sample::SAMPLE_CONFIG;
use fintrack_config::{init_logging, Config};
use tracing::debug;

mod args;
mod commands;

use args::{Cli, Command};
use commands::Env;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    if let Command::SampleConfig = cli.command {
        print!("{SAMPLE_CONFIG}");
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    init_logging(&config.logger).context("failed to initialize logging")?;
    debug!(config = ?cli.config, url = %config.ic.url, "loaded configuration");

    let env = Env::connect(config, cli.identity).await?;
    match cli.command {
        Command::Balance { token, account } => commands::balance(&env, token, account).await,
        Command::Metadata { token } => commands::metadata(&env, token).await,
        Command::Transfer {
            token,
            to,
            amount,
            memo,
        } => commands::transfer(&env, token, to, &amount, memo).await,
        Command::WithdrawBtc { address, amount } => {
            commands::withdraw_btc(&env, &address, &amount).await
        }
        Command::WithdrawEth { address, amount } => {
            commands::withdraw_eth(&env, &address, &amount).await
        }
        Command::WithdrawalFee { token, amount } => {
            commands::withdrawal_fee(&env, token, amount.as_deref()).await
        }
        Command::BtcDepositAddress { account } => commands::btc_deposit_address(&env, account).await,
        Command::RefreshBtcBalance { account } => commands::refresh_btc_balance(&env, account).await,
        Command::DepositAddress => commands::deposit_address(&env).await,
        Command::DepositEth {
            amount,
            beneficiary,
        } => commands::deposit_eth(&env, &amount, beneficiary).await,
        Command::IdentityTag { principal } => commands::identity_tag(&env, principal).await,
        Command::SampleConfig => Ok(()),
    }
}
