//! Closed set of atomic task identifiers.
//!
//! The dispatch registry is keyed by this enum instead of raw strings:
//! a typo in a plan cannot silently bind to nothing, it parses to
//! `None` and is reported as a task failure with the offending name.

use crate::name::TaskName;

/// Every atomic operation the dispatcher knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    Faucet,
    TekoFaucet,
    GteFaucet,
    CrustyRefuel,
    CrustyRefuelFromOneToAll,
    CexWithdrawal,
    CapApp,
    Bebop,
    GteSwaps,
    TekoFinance,
    OnchainGm,
    XlMeme,
    Omnihub,
    Mintair,
    Easynode,
    Hopnetwork,
    Owlto,
    Rainmakr,
    Rarible,
    Superboard,
    ConftApp,
    Zkcodex,
    NerzoMegaeth,
    NerzoFluffle,
    MorkieMega,
}

impl TaskId {
    pub const ALL: [TaskId; 25] = [
        TaskId::Faucet,
        TaskId::TekoFaucet,
        TaskId::GteFaucet,
        TaskId::CrustyRefuel,
        TaskId::CrustyRefuelFromOneToAll,
        TaskId::CexWithdrawal,
        TaskId::CapApp,
        TaskId::Bebop,
        TaskId::GteSwaps,
        TaskId::TekoFinance,
        TaskId::OnchainGm,
        TaskId::XlMeme,
        TaskId::Omnihub,
        TaskId::Mintair,
        TaskId::Easynode,
        TaskId::Hopnetwork,
        TaskId::Owlto,
        TaskId::Rainmakr,
        TaskId::Rarible,
        TaskId::Superboard,
        TaskId::ConftApp,
        TaskId::Zkcodex,
        TaskId::NerzoMegaeth,
        TaskId::NerzoFluffle,
        TaskId::MorkieMega,
    ];

    /// The canonical (lowercase) name used in plans and the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::Faucet => "faucet",
            TaskId::TekoFaucet => "teko_faucet",
            TaskId::GteFaucet => "gte_faucet",
            TaskId::CrustyRefuel => "crusty_refuel",
            TaskId::CrustyRefuelFromOneToAll => "crusty_refuel_from_one_to_all",
            TaskId::CexWithdrawal => "cex_withdrawal",
            TaskId::CapApp => "cap_app",
            TaskId::Bebop => "bebop",
            TaskId::GteSwaps => "gte_swaps",
            TaskId::TekoFinance => "teko_finance",
            TaskId::OnchainGm => "onchain_gm",
            TaskId::XlMeme => "xl_meme",
            TaskId::Omnihub => "omnihub",
            TaskId::Mintair => "mintair",
            TaskId::Easynode => "easynode",
            TaskId::Hopnetwork => "hopnetwork",
            TaskId::Owlto => "owlto",
            TaskId::Rainmakr => "rainmakr",
            TaskId::Rarible => "rarible",
            TaskId::Superboard => "superboard",
            TaskId::ConftApp => "conft_app",
            TaskId::Zkcodex => "zkcodex",
            TaskId::NerzoMegaeth => "nerzo_megaeth",
            TaskId::NerzoFluffle => "nerzo_fluffle",
            TaskId::MorkieMega => "morkie_mega",
        }
    }

    /// Case-folded lookup; `None` for names outside the closed set.
    pub fn parse(name: &TaskName) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.as_str() == name.as_str())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
