use clap::{Parser, Subcommand};
use fintrack_agent::ledger::Token;
use fintrack_ledger_types::icrc1::account::Account;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(name = "fintrack")]
#[clap(about = "Move ckBTC and ckETH between the Internet Computer and their native chains")]
pub struct Cli {
    /// JSON5 configuration file. Built-in defaults are used without one.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// PEM identity to act as, overriding `ic.identity_pem` from the config.
    #[clap(long, global = true)]
    pub identity: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the balance of an account, the caller's by default.
    Balance {
        token: Token,
        #[clap(long)]
        account: Option<Account>,
    },
    /// Print name, symbol, decimals and fee of a token.
    Metadata { token: Token },
    /// Transfer tokens on the ledger.
    Transfer {
        token: Token,
        to: Account,
        /// Decimal amount, e.g. `0.015`.
        amount: String,
        #[clap(long)]
        memo: Option<u64>,
    },
    /// Burn ckBTC and receive BTC at `address`.
    WithdrawBtc {
        address: String,
        /// Decimal amount of ckBTC.
        amount: String,
    },
    /// Burn ckETH and receive ETH at `address`.
    WithdrawEth {
        address: String,
        /// Decimal amount of ckETH.
        amount: String,
    },
    /// Print the fees the minter deducts from a withdrawal.
    WithdrawalFee {
        token: Token,
        /// Decimal amount to price, ckBTC only. The minter assumes a typical amount without it.
        #[clap(long)]
        amount: Option<String>,
    },
    /// Print the Bitcoin address whose deposits are minted as ckBTC, the caller's by default.
    BtcDepositAddress {
        #[clap(long)]
        account: Option<Account>,
    },
    /// Mint ckBTC for confirmed deposits to the caller's Bitcoin deposit address.
    RefreshBtcBalance {
        #[clap(long)]
        account: Option<Account>,
    },
    /// Print the helper contract address that ETH deposits are sent to.
    DepositAddress,
    /// Send ETH from the configured wallet to be minted as ckETH for the caller.
    DepositEth {
        /// Decimal amount of ETH.
        amount: String,
        /// Principal to credit instead of the caller.
        #[clap(long)]
        beneficiary: Option<String>,
    },
    /// Print the 32-byte tag that identifies a principal in deposit transactions.
    IdentityTag { principal: Option<String> },
    /// Print a commented configuration file with all defaults.
    SampleConfig,
}
