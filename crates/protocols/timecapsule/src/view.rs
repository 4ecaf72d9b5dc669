//! Capsule card rendering (display model only, no markup)

use alloy_primitives::Address;
use capsule_core::time::format_timestamp;
use capsule_core::{explorer_tx_url, truncate_address, UnitScale, UnixSeconds};
use chrono::{FixedOffset, Offset, Utc};

use crate::constants::{LOCKED_UNTIL_PREFIX, SUBMITTED_LABEL, UNLOCKING_LABEL, UNLOCK_LABEL};
use crate::state::{ActionButton, Capsule, CapsuleCard, CapsuleStatus};
use crate::tracker::UnlockTracker;

/// Formatting inputs for a render pass
#[derive(Debug, Clone)]
pub struct ViewContext {
    pub scale: UnitScale,
    pub symbol: String,
    pub offset: FixedOffset,
    pub explorer_url: Option<String>,
    pub now: UnixSeconds,
}

impl ViewContext {
    /// UTC display, default 18-decimal BTC scale, no explorer
    pub fn utc(now: UnixSeconds) -> Self {
        Self {
            scale: UnitScale::default(),
            symbol: "BTC".to_string(),
            offset: Utc.fix(),
            explorer_url: None,
            now,
        }
    }
}

pub fn build_card(capsule: &Capsule, tracker: &UnlockTracker, ctx: &ViewContext) -> CapsuleCard {
    let status = tracker.status(capsule.token_id, capsule.unlock_timestamp, ctx.now);
    let unlock_date = format_timestamp(capsule.unlock_timestamp, &ctx.offset);

    let button = match status {
        CapsuleStatus::Locked => ActionButton {
            label: format!("{} {}", LOCKED_UNTIL_PREFIX, unlock_date),
            enabled: false,
        },
        CapsuleStatus::Ready => ActionButton {
            label: UNLOCK_LABEL.to_string(),
            enabled: true,
        },
        CapsuleStatus::Unlocking => ActionButton {
            label: UNLOCKING_LABEL.to_string(),
            enabled: false,
        },
        CapsuleStatus::UnlockSubmitted => ActionButton {
            label: SUBMITTED_LABEL.to_string(),
            enabled: false,
        },
    };

    let badge = if capsule.is_unlockable(ctx.now) {
        "Ready"
    } else {
        "Locked"
    };

    let tx_hash = tracker
        .entry(capsule.token_id)
        .and_then(|e| e.last_tx_hash.clone());
    let explorer_url = match (&tx_hash, &ctx.explorer_url) {
        (Some(hash), Some(base)) => Some(explorer_tx_url(base, hash.as_str())),
        _ => None,
    };

    CapsuleCard {
        token_id: capsule.token_id,
        title: format!("Capsule #{}", capsule.token_id),
        amount: format!("{} {}", ctx.scale.format_amount(capsule.btc_amount), ctx.symbol),
        amount_raw: capsule.btc_amount.to_string(),
        unlock_timestamp: capsule.unlock_timestamp,
        unlock_date,
        beneficiary: truncate_address(&lower_hex(&capsule.beneficiary)),
        depositor: truncate_address(&lower_hex(&capsule.depositor)),
        status,
        badge: badge.to_string(),
        button,
        tx_hash,
        explorer_url,
    }
}

fn lower_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}
