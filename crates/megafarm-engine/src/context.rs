//! Per-account execution context.

use async_trait::async_trait;

use megafarm_core::config::Config;
use megafarm_core::error::{MegafarmError, Result};

use crate::client::{create_session, ChainClient};
use crate::wallet::Wallet;

/// Everything a task handler may need for one account: identity,
/// outbound proxy, HTTP session, chain client. Owned by exactly one
/// account runner and never shared across accounts.
pub struct AccountContext {
    /// 1-based account ordinal, used in every log line.
    pub index: usize,
    pub wallet: Wallet,
    pub proxy: Option<String>,
    session: Option<reqwest::Client>,
    chain: Option<ChainClient>,
}

impl AccountContext {
    pub fn new(index: usize, private_key: &str, proxy: Option<String>) -> Result<Self> {
        Ok(Self {
            index,
            wallet: Wallet::from_private_key(private_key)?,
            proxy,
            session: None,
            chain: None,
        })
    }

    /// The HTTP session; an error before `initialize` has run.
    pub fn session(&self) -> Result<&reqwest::Client> {
        self.session
            .as_ref()
            .ok_or_else(|| MegafarmError::Init("Session not initialized".into()))
    }

    /// The chain client; an error before `initialize` has run.
    pub fn chain(&self) -> Result<&ChainClient> {
        self.chain
            .as_ref()
            .ok_or_else(|| MegafarmError::Init("Chain client not initialized".into()))
    }
}

/// Initialization/teardown seam between the runner and the transport
/// layer. Production uses [`RpcInitializer`]; tests plug in a no-op.
#[async_trait]
pub trait AccountInitializer: Send + Sync {
    async fn initialize(&self, ctx: &mut AccountContext, config: &Config) -> Result<()>;

    /// Invoked on every exit path of the account flow, including
    /// failures. Must be safe to call on a never-initialized context.
    async fn cleanup(&self, ctx: &mut AccountContext);
}

/// Real collaborator: browser-like session + first healthy RPC.
pub struct RpcInitializer;

#[async_trait]
impl AccountInitializer for RpcInitializer {
    async fn initialize(&self, ctx: &mut AccountContext, config: &Config) -> Result<()> {
        let session =
            create_session(ctx.proxy.as_deref(), config.others.skip_ssl_verification).await?;
        let chain = ChainClient::connect(
            &config.rpcs.megaeth,
            config.others.use_proxy_for_rpc,
            ctx.proxy.as_deref(),
            config.others.skip_ssl_verification,
            config.settings.wait_for_transaction_confirmation_in_seconds,
        )
        .await?;
        ctx.session = Some(session);
        ctx.chain = Some(chain);
        Ok(())
    }

    async fn cleanup(&self, ctx: &mut AccountContext) {
        ctx.session = None;
        if let Some(chain) = ctx.chain.take() {
            chain.cleanup().await;
        }
        tracing::info!("[{}] All sessions closed", ctx.index);
    }
}
