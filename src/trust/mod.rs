//! Trust Ledger
//!
//! Maintains reputation scores for casinos and degens (users), driven by
//! behavioural events from the bus.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ TrustEvent      │────►│ TrustLedger      │────►│ TrustUpdateSink  │
//! │ (inbound topic) │     │ (orchestrator)   │     │ (outbound topic) │
//! └─────────────────┘     └──────────────────┘     └──────────────────┘
//!                            ▲            │
//!                            │            ▼
//!              ┌──────────────────┐  ┌──────────────────┐
//!              │ RecoveryScheduler│  │ LedgerSnapshot   │
//!              │ (tilt decay)     │  │ (persistence)    │
//!              └──────────────────┘  └──────────────────┘
//! ```
//!
//! ## Score Model
//!
//! - Casinos: seven sub-scores (baseline 75) with fixed weights; the score is
//!   their rounded weighted sum
//! - Degens: behaviour (baseline 70) plus accountability and community
//!   signals, minus tilt (5 per indicator, max 30) and scam (15 per flag)
//!   penalties, clamped to 0..=100
//! - Tilt decays at a configurable rate per hour since the last update
//! - Each record keeps the last 100 adjustments, oldest first

mod events;
mod ledger;
mod record;
mod recovery;
mod severity;

pub use events::{
    AccountabilitySuccess, BonusNerfDetected, CasinoRollup, CasinoTrustUpdate, DegenTrustUpdate,
    DomainRollup, DomainRollupAggregate, LinkFlagged, RollupAggregate, ScamReported, TipCompleted,
    TrustEvent, TrustUpdate, UserSeverity, CASINO_UPDATE_SOURCE,
};
pub use ledger::{LedgerSnapshot, TrustLedger, TrustUpdateSink};
pub use record::{
    CasinoCategory, CasinoTrustRecord, DegenCategory, DegenTrustRecord, HistoryEntry, TrustLevel,
    CASINO_SUBSCORE_BASELINE, DEGEN_BEHAVIOR_BASELINE,
};
pub use recovery::RecoveryScheduler;
pub use severity::{accountability_bonus, compute_severity, penalty_for_severity, DEFAULT_SEVERITY_SCALE};
