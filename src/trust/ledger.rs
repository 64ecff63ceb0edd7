//! Trust Ledger - Main Orchestrator
//!
//! Owns every casino and degen record for the lifetime of the service.
//! Records are created lazily at their baseline and are only ever nudged or
//! decayed, never deleted.
//!
//! Each map is sharded: a mutation holds the entry lock for its key while it
//! reads, adjusts and recomputes the record, so updates to one entity are
//! serialised while unrelated entities proceed in parallel. Updates are
//! published to the registered sinks after the lock is released.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::events::{
    AccountabilitySuccess, BonusNerfDetected, CasinoRollup, CasinoTrustUpdate, DegenTrustUpdate,
    DomainRollup, LinkFlagged, ScamReported, TipCompleted, TrustEvent, TrustUpdate, UserSeverity,
    CASINO_UPDATE_SOURCE,
};
use super::record::{
    push_capped, CasinoCategory, CasinoTrustRecord, DegenCategory, DegenTrustRecord, HistoryEntry,
    TrustLevel,
};
use super::severity::{accountability_bonus, compute_severity, penalty_for_severity};
use crate::config::TrustConfig;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Sub-scores below this raise a warning in casino explanations
const CASINO_WARNING_THRESHOLD: f64 = 60.0;

/// Receives every applied adjustment. Implementations must not block.
pub trait TrustUpdateSink: Send + Sync {
    fn publish(&self, update: &TrustUpdate);
}

/// Full copy of both record maps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub casinos: BTreeMap<String, CasinoTrustRecord>,
    pub degens: BTreeMap<String, DegenTrustRecord>,
}

impl LedgerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.casinos.is_empty() && self.degens.is_empty()
    }
}

pub struct TrustLedger {
    casinos: DashMap<String, CasinoTrustRecord>,
    degens: DashMap<String, DegenTrustRecord>,
    config: TrustConfig,
    sinks: Vec<Arc<dyn TrustUpdateSink>>,
}

impl TrustLedger {
    pub fn new(config: TrustConfig) -> Self {
        Self {
            casinos: DashMap::new(),
            degens: DashMap::new(),
            config,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TrustUpdateSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    fn publish(&self, update: TrustUpdate) {
        for sink in &self.sinks {
            sink.publish(&update);
        }
    }

    // =========================================================================
    // Casino records
    // =========================================================================

    /// Current record, created at baseline on first reference
    pub fn casino_breakdown(&self, casino_name: &str) -> CasinoTrustRecord {
        self.casinos
            .entry(casino_name.to_string())
            .or_insert_with(|| CasinoTrustRecord::new(self.config.starting_casino_score, Utc::now()))
            .clone()
    }

    pub fn casino_score(&self, casino_name: &str) -> f64 {
        self.casino_breakdown(casino_name).score
    }

    pub fn casino_ids(&self) -> Vec<String> {
        self.casinos.iter().map(|e| e.key().clone()).collect()
    }

    pub fn apply_casino_delta(
        &self,
        casino_name: &str,
        category: CasinoCategory,
        delta: f64,
        reason: impl Into<String>,
        severity: Option<u8>,
    ) -> CasinoTrustUpdate {
        self.apply_casino_delta_at(casino_name, category, delta, reason, severity, Utc::now())
    }

    /// Adjust one casino sub-score, recompute the aggregate, record history
    /// and publish. Panics on a non-finite delta.
    pub fn apply_casino_delta_at(
        &self,
        casino_name: &str,
        category: CasinoCategory,
        delta: f64,
        reason: impl Into<String>,
        severity: Option<u8>,
        now: DateTime<Utc>,
    ) -> CasinoTrustUpdate {
        assert!(
            delta.is_finite(),
            "non-finite trust delta {} for casino {}",
            delta,
            casino_name
        );
        let reason = reason.into();

        let update = {
            let mut record = self
                .casinos
                .entry(casino_name.to_string())
                .or_insert_with(|| CasinoTrustRecord::new(self.config.starting_casino_score, now));

            let previous_score = record.score;
            record.adjust(category, delta);
            let change = record.score - previous_score;
            push_capped(
                &mut record.history,
                HistoryEntry {
                    timestamp: now,
                    delta: change,
                    reason: reason.clone(),
                    severity,
                    category,
                },
                self.config.history_limit,
            );
            record.last_updated = now;

            CasinoTrustUpdate {
                casino_name: casino_name.to_string(),
                previous_score,
                new_score: record.score,
                delta: change,
                severity,
                reason,
                source: CASINO_UPDATE_SOURCE.to_string(),
            }
        };

        info!(
            casino = %casino_name,
            category = %category,
            previous = update.previous_score,
            new = update.new_score,
            reason = %update.reason,
            "Casino trust score adjusted"
        );
        self.publish(TrustUpdate::Casino(update.clone()));
        update
    }

    // =========================================================================
    // Degen records
    // =========================================================================

    pub fn degen_breakdown(&self, user_id: &str) -> DegenTrustRecord {
        self.degens
            .entry(user_id.to_string())
            .or_insert_with(|| DegenTrustRecord::new(self.config.starting_user_score, Utc::now()))
            .clone()
    }

    pub fn degen_score(&self, user_id: &str) -> f64 {
        self.degen_breakdown(user_id).score
    }

    pub fn degen_ids(&self) -> Vec<String> {
        self.degens.iter().map(|e| e.key().clone()).collect()
    }

    pub fn trust_level(score: f64) -> TrustLevel {
        TrustLevel::from_score(score)
    }

    pub fn apply_degen_delta(
        &self,
        user_id: &str,
        category: DegenCategory,
        delta: f64,
        reason: impl Into<String>,
        severity: Option<u8>,
    ) -> DegenTrustUpdate {
        self.apply_degen_delta_at(user_id, category, delta, reason, severity, Utc::now())
    }

    /// Adjust one degen signal, recompute the aggregate, record history and
    /// publish. Panics on a non-finite delta.
    pub fn apply_degen_delta_at(
        &self,
        user_id: &str,
        category: DegenCategory,
        delta: f64,
        reason: impl Into<String>,
        severity: Option<u8>,
        now: DateTime<Utc>,
    ) -> DegenTrustUpdate {
        let update = {
            let mut record = self
                .degens
                .entry(user_id.to_string())
                .or_insert_with(|| DegenTrustRecord::new(self.config.starting_user_score, now));
            self.adjust_degen(user_id, &mut record, category, delta, reason.into(), severity, now)
        };
        self.announce_degen(update, category)
    }

    /// Mutation core shared by handlers and recovery. The caller holds the entry lock.
    #[allow(clippy::too_many_arguments)]
    fn adjust_degen(
        &self,
        user_id: &str,
        record: &mut DegenTrustRecord,
        category: DegenCategory,
        delta: f64,
        reason: String,
        severity: Option<u8>,
        now: DateTime<Utc>,
    ) -> DegenTrustUpdate {
        assert!(
            delta.is_finite(),
            "non-finite trust delta {} for user {}",
            delta,
            user_id
        );

        let previous_score = record.score;
        record.adjust(category, delta);
        let change = record.score - previous_score;
        push_capped(
            &mut record.history,
            HistoryEntry {
                timestamp: now,
                delta: change,
                reason: reason.clone(),
                severity,
                category,
            },
            self.config.history_limit,
        );
        record.last_updated = now;

        DegenTrustUpdate {
            user_id: user_id.to_string(),
            previous_score,
            new_score: record.score,
            delta: change,
            level: TrustLevel::from_score(record.score),
            reason,
        }
    }

    fn announce_degen(&self, update: DegenTrustUpdate, category: DegenCategory) -> DegenTrustUpdate {
        info!(
            user_id = %update.user_id,
            category = %category,
            previous = update.previous_score,
            new = update.new_score,
            reason = %update.reason,
            "Degen trust score adjusted"
        );
        self.publish(TrustUpdate::Degen(update.clone()));
        update
    }

    // =========================================================================
    // Event handlers
    // =========================================================================

    pub fn handle_event(&self, event: &TrustEvent) {
        self.handle_event_at(event, Utc::now());
    }

    pub fn handle_event_at(&self, event: &TrustEvent, now: DateTime<Utc>) {
        debug!(topic = event.topic(), "Handling trust event");
        match event {
            TrustEvent::LinkFlagged(e) => self.on_link_flagged(e, now),
            TrustEvent::BonusNerfDetected(e) => self.on_bonus_nerf(e, now),
            TrustEvent::CasinoRollup(e) => self.on_casino_rollup(e, now),
            TrustEvent::DomainRollup(e) => self.on_domain_rollup(e, now),
            TrustEvent::TipCompleted(e) => self.on_tip_completed(e, now),
            TrustEvent::TiltDetected(e) => self.on_tilt_detected(e, now),
            TrustEvent::CooldownViolated(e) => self.on_cooldown_violated(e, now),
            TrustEvent::ScamReported(e) => self.on_scam_reported(e, now),
            TrustEvent::AccountabilitySuccess(e) => self.on_accountability_success(e, now),
        }
    }

    fn on_link_flagged(&self, event: &LinkFlagged, now: DateTime<Utc>) {
        let Some(host) = casino_host(&event.url) else {
            warn!(url = %event.url, "Invalid URL in link.flagged event");
            return;
        };
        let (delta, severity) = if event.risk_level == "critical" {
            (-10.0, 4)
        } else {
            (-5.0, 2)
        };
        self.apply_casino_delta_at(
            &host,
            CasinoCategory::Freespin,
            delta,
            format!("Suspicious link flagged ({})", event.risk_level),
            Some(severity),
            now,
        );
    }

    fn on_bonus_nerf(&self, event: &BonusNerfDetected, now: DateTime<Utc>) {
        if event.casino_name.is_empty() || !event.percent_drop.is_finite() {
            warn!(casino = %event.casino_name, "Ignoring incomplete bonus.nerf.detected event");
            return;
        }
        let drop = event.percent_drop.abs();
        let severity = compute_severity(drop);
        let delta = penalty_for_severity(severity, &self.config.severity_scale);
        self.apply_casino_delta_at(
            &event.casino_name,
            CasinoCategory::Bonus,
            delta,
            format!("Bonus nerf detected (-{:.1}%)", drop * 100.0),
            Some(severity),
            now,
        );
    }

    fn on_casino_rollup(&self, event: &CasinoRollup, now: DateTime<Utc>) {
        for (casino, agg) in &event.casinos {
            if agg.events == 0 {
                continue;
            }
            let avg = agg.total_delta / agg.events as f64;
            self.apply_casino_delta_at(
                casino,
                CasinoCategory::Bonus,
                (avg / 2.0).clamp(-5.0, 5.0),
                format!("Hourly rollup: {} events, avg Δ{:.1}", agg.events, avg),
                None,
                now,
            );
        }
    }

    fn on_domain_rollup(&self, event: &DomainRollup, now: DateTime<Utc>) {
        for (domain, agg) in &event.domains {
            if agg.events == 0 {
                continue;
            }
            let avg = agg.total_delta / agg.events as f64;
            self.apply_casino_delta_at(
                domain,
                CasinoCategory::Compliance,
                (avg / 3.0).clamp(-8.0, 3.0),
                format!("Domain rollup: {} events, avg Δ{:.1}", agg.events, avg),
                agg.last_severity,
                now,
            );
        }
    }

    fn on_tip_completed(&self, event: &TipCompleted, now: DateTime<Utc>) {
        let (Some(from), Some(to)) = (present(&event.from_user_id), present(&event.to_user_id)) else {
            return;
        };
        self.apply_degen_delta_at(from, DegenCategory::Behavior, 1.0, "Completed tip transaction", None, now);
        self.apply_degen_delta_at(to, DegenCategory::Behavior, 0.5, "Received tip", None, now);

        if let Some(amount) = event.amount.filter(|a| *a > 100.0) {
            self.apply_degen_delta_at(
                from,
                DegenCategory::Accountability,
                2.0,
                format!("Large tip: ${}", amount),
                None,
                now,
            );
        }
    }

    fn on_tilt_detected(&self, event: &UserSeverity, now: DateTime<Utc>) {
        let Some(user_id) = present(&event.user_id) else {
            return;
        };
        let delta = event.severity.filter(|s| *s > 0).unwrap_or(1);
        let update = {
            let mut record = self
                .degens
                .entry(user_id.to_string())
                .or_insert_with(|| DegenTrustRecord::new(self.config.starting_user_score, now));
            let update = self.adjust_degen(
                user_id,
                &mut record,
                DegenCategory::Tilt,
                f64::from(delta),
                "Tilt behavior detected".to_string(),
                event.severity,
                now,
            );
            record.recovery_scheduled_at = Duration::try_hours(self.config.tilt_recovery_delay_hours)
                .and_then(|delay| now.checked_add_signed(delay));
            if record.recovery_scheduled_at.is_none() {
                warn!(
                    user_id = %user_id,
                    delay_hours = self.config.tilt_recovery_delay_hours,
                    "Tilt recovery delay out of range, not scheduling"
                );
            }
            update
        };
        self.announce_degen(update, DegenCategory::Tilt);
    }

    fn on_cooldown_violated(&self, event: &UserSeverity, now: DateTime<Utc>) {
        let Some(user_id) = present(&event.user_id) else {
            return;
        };
        let severity = event.severity.filter(|s| *s > 0).unwrap_or(2);
        self.apply_degen_delta_at(
            user_id,
            DegenCategory::Behavior,
            -f64::from(severity) * 2.0,
            "Violated cooldown",
            event.severity,
            now,
        );
    }

    fn on_scam_reported(&self, event: &ScamReported, now: DateTime<Utc>) {
        let accused = present(&event.accused_id);
        let reporter = present(&event.reporter_id);

        if let (true, Some(accused)) = (event.verified, accused) {
            self.apply_degen_delta_at(accused, DegenCategory::Scam, 0.0, "Confirmed scam report", Some(5), now);
        } else if let (true, Some(reporter)) = (event.false_report, reporter) {
            self.apply_degen_delta_at(
                reporter,
                DegenCategory::Behavior,
                -10.0,
                "False scam accusation",
                Some(3),
                now,
            );
            if let Some(accused) = accused {
                self.apply_degen_delta_at(
                    accused,
                    DegenCategory::Community,
                    -3.0,
                    "Involved in false scam accusation",
                    None,
                    now,
                );
            }
        }
    }

    fn on_accountability_success(&self, event: &AccountabilitySuccess, now: DateTime<Utc>) {
        let Some(user_id) = present(&event.user_id) else {
            return;
        };
        self.apply_degen_delta_at(
            user_id,
            DegenCategory::Accountability,
            accountability_bonus(&event.action),
            format!("Accountability: {}", event.action),
            None,
            now,
        );
    }

    // =========================================================================
    // Explanations
    // =========================================================================

    pub fn explain_casino(&self, casino_name: &str) -> Vec<String> {
        let record = self.casino_breakdown(casino_name);
        let warnings = [
            (CasinoCategory::Bonus, "⚠️ Frequent bonus nerfs detected"),
            (CasinoCategory::Fairness, "⚠️ Fairness concerns reported"),
            (CasinoCategory::Payout, "⚠️ Payout delays or issues"),
            (CasinoCategory::UserReport, "⚠️ Negative user reports"),
            (CasinoCategory::Freespin, "⚠️ Suspicious promotional links"),
            (CasinoCategory::Compliance, "⚠️ Regulatory compliance concerns"),
            (CasinoCategory::Support, "⚠️ Poor support quality"),
        ];

        let mut lines: Vec<String> = warnings
            .iter()
            .filter(|(category, _)| record.sub_score(*category) < CASINO_WARNING_THRESHOLD)
            .map(|(_, text)| text.to_string())
            .collect();
        if lines.is_empty() {
            lines.push("✅ No major trust issues detected".to_string());
        }

        lines.extend(recent_notable(
            record.history.iter().map(|e| (e.delta, e.reason.as_str())),
            record.history.len(),
            5,
            3.0,
        ));
        lines
    }

    pub fn explain_degen(&self, user_id: &str) -> Vec<String> {
        let record = self.degen_breakdown(user_id);
        let mut lines = vec![format!(
            "Trust Level: {}",
            TrustLevel::from_score(record.score).label()
        )];

        if record.tilt_indicators > 3.0 {
            lines.push("⚠️ Recent tilt behavior detected".to_string());
        }
        if record.scam_flags > 0 {
            lines.push(format!("🚨 {} confirmed scam report(s)", record.scam_flags));
        }
        if record.accountability_bonus > 10.0 {
            lines.push("✅ Strong accountability tool usage".to_string());
        }
        if record.behavior_score > 85.0 {
            lines.push("✅ Excellent community behavior".to_string());
        }
        if record.community_reports < -10.0 {
            lines.push("⚠️ Multiple negative community reports".to_string());
        }

        lines.extend(recent_notable(
            record.history.iter().map(|e| (e.delta, e.reason.as_str())),
            record.history.len(),
            3,
            5.0,
        ));
        lines
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Users with tilt still to recover
    pub fn recovery_candidates(&self) -> Vec<String> {
        self.degens
            .iter()
            .filter(|e| e.tilt_indicators > 0.0)
            .map(|e| e.key().clone())
            .collect()
    }

    /// Recover tilt for one user in proportion to the hours since their last
    /// update. Returns `None` when there was nothing to recover.
    pub fn recover_entity_at(&self, user_id: &str, now: DateTime<Utc>) -> Option<DegenTrustUpdate> {
        let update = {
            let mut record = self.degens.get_mut(user_id)?;
            let hours = (now - record.last_updated).num_milliseconds() as f64 / MS_PER_HOUR;
            let recovery = record
                .tilt_indicators
                .min(self.config.recovery_rate_per_hour * hours);
            if recovery <= 0.0 {
                return None;
            }
            self.adjust_degen(
                user_id,
                &mut record,
                DegenCategory::Tilt,
                -recovery,
                "Natural tilt recovery".to_string(),
                None,
                now,
            )
        };
        Some(self.announce_degen(update, DegenCategory::Tilt))
    }

    /// One synchronous recovery pass. Returns the number of users recovered.
    pub fn run_recovery_at(&self, now: DateTime<Utc>) -> usize {
        let recovered = self
            .recovery_candidates()
            .iter()
            .filter(|user_id| self.recover_entity_at(user_id, now).is_some())
            .count();
        debug!(recovered, "Trust recovery cycle complete");
        recovered
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            casinos: self
                .casinos
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            degens: self
                .degens
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        }
    }

    /// Replace all records with a loaded snapshot
    pub fn restore(&self, snapshot: LedgerSnapshot) {
        self.casinos.clear();
        self.degens.clear();
        let (casinos, degens) = (snapshot.casinos.len(), snapshot.degens.len());
        for (name, record) in snapshot.casinos {
            self.casinos.insert(name, record);
        }
        for (user_id, record) in snapshot.degens {
            self.degens.insert(user_id, record);
        }
        info!(casinos, degens, "Trust records restored");
    }
}

/// Casino identity for a flagged link: the host without a leading "www."
fn casino_host(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

fn present(id: &Option<String>) -> Option<&str> {
    id.as_deref().filter(|s| !s.is_empty())
}

/// Direction-marked reasons among the last `window` history entries whose
/// aggregate delta reached `min_delta`
fn recent_notable<'a>(
    entries: impl Iterator<Item = (f64, &'a str)>,
    len: usize,
    window: usize,
    min_delta: f64,
) -> Vec<String> {
    entries
        .skip(len.saturating_sub(window))
        .filter(|(delta, _)| delta.abs() >= min_delta)
        .map(|(delta, reason)| {
            let marker = if delta > 0.0 { "📈" } else { "📉" };
            format!("{} {}", marker, reason)
        })
        .collect()
}
