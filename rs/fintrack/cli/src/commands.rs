use anyhow::{anyhow, bail, Context, Error};
use candid::{Nat, Principal};
use ethnum::u256;
use fintrack_agent::backend::BackendCanister;
use fintrack_agent::identity::{resolve_identity, AgentFactory, NoSession, PemSession, SessionProvider};
use fintrack_agent::ledger::{LedgerCanister, Token, TokenLedgers};
use fintrack_agent::minter::{CkBtcMinterCanister, CkEthMinterCanister};
use fintrack_agent::CallCanisters;
use fintrack_config::Config;
use fintrack_deposit::identity_tag::resolve_identity_tag;
use fintrack_deposit::{
    DepositBridge, DepositSettings, EthereumWallet, IdentityTag, IdentityTagSource, JsonRpcWallet,
    ResolvedIdentityTag,
};
use fintrack_ledger_types::icrc1::account::Account;
use fintrack_ledger_types::icrc1::transfer::TransferRequest;
use fintrack_ledger_types::minter::{UpdateBalanceError, UtxoStatus};
use fintrack_ledger_types::tokens::{format_decimal, parse_decimal};
use fintrack_withdrawal::progress::steps_for_session;
use fintrack_withdrawal::{
    CkBtcWithdrawalFlow, CkEthWithdrawalFlow, WithdrawalFlow, WithdrawalOrchestrator,
    WithdrawalRequest,
};
use ic_agent::Agent;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Decimal places of ETH, the unit deposit amounts are entered in.
const ETH_DECIMALS: u8 = 18;

/// Everything a command needs to reach the IC.
pub struct Env {
    pub config: Config,
    pub agent: Agent,
}

impl Env {
    pub async fn connect(config: Config, identity_pem: Option<PathBuf>) -> Result<Self, Error> {
        let session: Box<dyn SessionProvider> =
            match identity_pem.or_else(|| config.ic.identity_pem.clone()) {
                Some(path) => Box::new(PemSession::from_pem_file(path)?),
                None => Box::new(NoSession),
            };
        let identity = resolve_identity(None, session.as_ref());
        let agent = AgentFactory::new(config.ic.url.clone(), config.ic.fetch_root_key)
            .build(&identity)
            .await
            .with_context(|| format!("failed to create agent for {}", config.ic.url))?;
        Ok(Self { config, agent })
    }

    fn ledgers(&self) -> TokenLedgers {
        TokenLedgers {
            ckbtc: LedgerCanister::new(self.config.canisters.ckbtc_ledger),
            cketh: LedgerCanister::new(self.config.canisters.cketh_ledger),
        }
    }

    fn backend(&self) -> Option<BackendCanister> {
        self.config.canisters.backend.map(BackendCanister::new)
    }

    fn caller(&self) -> Result<Principal, Error> {
        Ok(self.agent.caller()?)
    }

    async fn decimals(&self, ledger: &LedgerCanister) -> Result<u8, Error> {
        let metadata = ledger
            .metadata(&self.agent)
            .await
            .with_context(|| format!("failed to fetch metadata of ledger {}", ledger.canister_id))?;
        Ok(metadata.decimals)
    }
}

pub async fn balance(env: &Env, token: Token, account: Option<Account>) -> Result<(), Error> {
    let ledger = env.ledgers().get(token);
    let account = match account {
        Some(account) => account,
        None => Account::from(env.caller()?),
    };
    let metadata = ledger.metadata(&env.agent).await?;
    let balance = ledger.balance_of(&env.agent, account).await?;
    println!(
        "{} {}",
        format_decimal(&balance, metadata.decimals),
        metadata.symbol
    );
    Ok(())
}

pub async fn metadata(env: &Env, token: Token) -> Result<(), Error> {
    let metadata = env.ledgers().get(token).metadata(&env.agent).await?;
    let rendered = serde_json::json!({
        "name": metadata.name,
        "symbol": metadata.symbol,
        "decimals": metadata.decimals,
        "fee": metadata.fee.0.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

pub async fn transfer(
    env: &Env,
    token: Token,
    to: Account,
    amount: &str,
    memo: Option<u64>,
) -> Result<(), Error> {
    let ledger = env.ledgers().get(token);
    let amount = parse_decimal(amount, env.decimals(&ledger).await?)?;
    let mut request = TransferRequest::new(to, amount);
    if let Some(memo) = memo {
        request = request.with_memo(memo);
    }
    match ledger.transfer(&env.agent, request).await? {
        Ok(block_index) => {
            info!(%token, %to, block_index = %block_index.0, "transfer succeeded");
            println!("{}", block_index.0);
            Ok(())
        }
        Err(rejection) => Err(anyhow!("ledger rejected the transfer: {rejection}")),
    }
}

pub async fn withdraw_btc(env: &Env, address: &str, amount: &str) -> Result<(), Error> {
    let ledger = env.ledgers().ckbtc;
    let amount = parse_decimal(amount, env.decimals(&ledger).await?)?;
    let flow = CkBtcWithdrawalFlow {
        agent: Arc::new(env.agent.clone()),
        ledger,
        minter: ckbtc_minter(env),
        from_subaccount: None,
    };
    withdraw(flow, address, amount).await
}

pub async fn withdraw_eth(env: &Env, address: &str, amount: &str) -> Result<(), Error> {
    let ledger = env.ledgers().cketh;
    let amount = parse_decimal(amount, env.decimals(&ledger).await?)?;
    let flow = CkEthWithdrawalFlow {
        agent: Arc::new(env.agent.clone()),
        ledger,
        minter: cketh_minter(env),
        from_subaccount: None,
    };
    withdraw(flow, address, amount).await
}

async fn withdraw<F: WithdrawalFlow>(flow: F, address: &str, amount: Nat) -> Result<(), Error> {
    let request = WithdrawalRequest::new(address, amount)?;
    let orchestrator = WithdrawalOrchestrator::new(flow);
    let result = orchestrator.execute(request).await;
    for step in steps_for_session(&orchestrator.session()) {
        match step.error {
            Some(error) => eprintln!("[{}] {}: {error}", step.status, step.title),
            None => eprintln!("[{}] {}", step.status, step.title),
        }
    }
    let id = result?;
    println!("{id}");
    Ok(())
}

pub async fn withdrawal_fee(env: &Env, token: Token, amount: Option<&str>) -> Result<(), Error> {
    let ledger = env.ledgers().get(token);
    let decimals = env.decimals(&ledger).await?;
    let rendered = match token {
        Token::CkBtc => {
            let amount = amount
                .map(|text| to_satoshi(&parse_decimal(text, decimals)?))
                .transpose()?;
            let fee = ckbtc_minter(env)
                .estimate_withdrawal_fee(&env.agent, amount)
                .await?;
            serde_json::json!({
                "minter_fee": format_decimal(&Nat::from(fee.minter_fee), decimals),
                "bitcoin_fee": format_decimal(&Nat::from(fee.bitcoin_fee), decimals),
                "total": format_decimal(&Nat::from(fee.total()), decimals),
            })
        }
        Token::CkEth => {
            if amount.is_some() {
                bail!("the ckETH withdrawal fee does not depend on the amount");
            }
            let price = cketh_minter(env)
                .eip_1559_transaction_price(&env.agent)
                .await?;
            serde_json::json!({
                "gas_limit": price.gas_limit.0.to_string(),
                "max_fee_per_gas": price.max_fee_per_gas.0.to_string(),
                "max_priority_fee_per_gas": price.max_priority_fee_per_gas.0.to_string(),
                "total": format_decimal(&price.max_transaction_fee, decimals),
            })
        }
    };
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

pub async fn btc_deposit_address(env: &Env, account: Option<Account>) -> Result<(), Error> {
    let account = match account {
        Some(account) => account,
        None => Account::from(env.caller()?),
    };
    let address = ckbtc_minter(env)
        .get_btc_address(&env.agent, account)
        .await
        .context("failed to fetch the BTC deposit address")?;
    println!("{address}");
    Ok(())
}

pub async fn refresh_btc_balance(env: &Env, account: Option<Account>) -> Result<(), Error> {
    let account = match account {
        Some(account) => account,
        None => Account::from(env.caller()?),
    };
    let statuses = match ckbtc_minter(env).update_balance(&env.agent, account).await? {
        Ok(statuses) => statuses,
        Err(err @ UpdateBalanceError::NoNewUtxos { .. }) => {
            println!("{err}");
            return Ok(());
        }
        Err(err) => return Err(anyhow!("minter failed to update the balance: {err}")),
    };
    for status in &statuses {
        println!("{}", describe_utxo_status(status));
    }
    let minted: u64 = statuses.iter().map(UtxoStatus::minted_amount).sum();
    info!(%account, minted, utxos = statuses.len(), "BTC balance updated");
    Ok(())
}

fn describe_utxo_status(status: &UtxoStatus) -> String {
    let utxo = status.utxo();
    let outpoint = format!("{}:{}", hex::encode(&utxo.outpoint.txid), utxo.outpoint.vout);
    match status {
        UtxoStatus::Minted {
            block_index,
            minted_amount,
            ..
        } => format!("{outpoint} minted {minted_amount} satoshi in block {block_index}"),
        UtxoStatus::Checked(_) => format!("{outpoint} checked but not minted yet, refresh again"),
        UtxoStatus::Tainted(_) => format!("{outpoint} rejected by the Bitcoin check"),
        UtxoStatus::ValueTooSmall(_) => {
            format!("{outpoint} worth {} satoshi is too small to mint", utxo.value)
        }
    }
}

pub async fn deposit_address(env: &Env) -> Result<(), Error> {
    let bridge = deposit_bridge(env, None)?;
    println!("{}", bridge.resolve_deposit_address().await?);
    Ok(())
}

pub async fn deposit_eth(env: &Env, amount: &str, beneficiary: Option<String>) -> Result<(), Error> {
    let amount = to_wei(&parse_decimal(amount, ETH_DECIMALS)?)?;
    let wallet: Option<Arc<dyn EthereumWallet>> = env
        .config
        .ethereum
        .wallet_url
        .clone()
        .map(|url| Arc::new(JsonRpcWallet::new(url)) as Arc<dyn EthereumWallet>);
    let bridge = deposit_bridge(env, wallet)?;
    let beneficiary = match beneficiary {
        Some(text) => text,
        None => env.caller()?.to_text(),
    };
    let outcome = bridge.deposit(&beneficiary, amount).await?;
    if outcome.tag_source == IdentityTagSource::LocalFallback {
        warn!(tx_hash = %outcome.tx_hash, "deposit was tagged with a locally derived identity tag");
    }
    let rendered = serde_json::json!({
        "tx_hash": outcome.tx_hash,
        "block_number": outcome.receipt.block_number.to_string(),
        "identity_tag": outcome.identity_tag.to_string(),
        "tag_source": outcome.tag_source.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

pub async fn identity_tag(env: &Env, principal: Option<String>) -> Result<(), Error> {
    let principal = match principal {
        Some(text) => text,
        None => env.caller()?.to_text(),
    };
    let resolved = match env.backend() {
        Some(backend) => resolve_identity_tag(&backend, &env.agent, &principal).await,
        None => {
            warn!("no backend canister configured, deriving the identity tag locally");
            if let Some(canonical) = canonical_tag(&principal) {
                println!("{canonical} (canonical)");
            }
            ResolvedIdentityTag {
                tag: IdentityTag::local_fallback(&principal),
                source: IdentityTagSource::LocalFallback,
            }
        }
    };
    println!("{} ({})", resolved.tag, resolved.source);
    Ok(())
}

/// The tag the minter recognizes for `text`, when it is a principal.
fn canonical_tag(text: &str) -> Option<IdentityTag> {
    let principal = Principal::from_text(text).ok()?;
    IdentityTag::from_principal(&principal).ok()
}

fn deposit_bridge(
    env: &Env,
    wallet: Option<Arc<dyn EthereumWallet>>,
) -> Result<DepositBridge<Agent>, Error> {
    let Some(backend) = env.backend() else {
        bail!("`canisters.backend` must be configured for deposits");
    };
    let ethereum = &env.config.ethereum;
    let settings = DepositSettings {
        gas_limit: ethereum.gas_limit,
        receipt_timeout: ethereum.receipt_timeout(),
        receipt_poll_interval: ethereum.receipt_poll_interval(),
    };
    Ok(DepositBridge::new(env.agent.clone(), backend, wallet, settings))
}

fn ckbtc_minter(env: &Env) -> CkBtcMinterCanister {
    CkBtcMinterCanister::new(env.config.canisters.ckbtc_minter)
}

fn cketh_minter(env: &Env) -> CkEthMinterCanister {
    CkEthMinterCanister::new(env.config.canisters.cketh_minter)
}

fn to_satoshi(amount: &Nat) -> Result<u64, Error> {
    u64::try_from(&amount.0).map_err(|_| anyhow!("{} satoshi does not fit in 64 bits", amount.0))
}

fn to_wei(amount: &Nat) -> Result<u256, Error> {
    amount
        .0
        .to_string()
        .parse::<u256>()
        .map_err(|_| anyhow!("{} wei does not fit in 256 bits", amount.0))
}
