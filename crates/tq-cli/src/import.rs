use std::collections::HashMap;

use anyhow::{bail, Context};
use serde_json::Value;
use tq_types::{Activity, Campaign, CampaignTier};

/// Parse generated campaigns from either `{"campaigns": [...]}` or a bare
/// JSON list. Every entry is validated before any is returned.
pub fn parse_campaigns(text: &str) -> anyhow::Result<Vec<Campaign>> {
    let value: Value = serde_json::from_str(text).context("campaign file is not valid JSON")?;
    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("campaigns") {
            Some(Value::Array(items)) => items,
            _ => bail!("expected a \"campaigns\" list"),
        },
        _ => bail!("expected a list of campaigns"),
    };

    list.into_iter()
        .enumerate()
        .map(|(i, item)| {
            let campaign: Campaign =
                serde_json::from_value(item).with_context(|| format!("campaign #{}", i + 1))?;
            campaign
                .validate()
                .with_context(|| format!("campaign #{}", i + 1))?;
            Ok(campaign)
        })
        .collect()
}

/// Difficulty band of every known activity, keyed by id.
pub fn tiers_by_id<'a>(
    activities: impl IntoIterator<Item = &'a Activity>,
) -> HashMap<String, CampaignTier> {
    activities
        .into_iter()
        .map(|a| (a.id.clone(), a.tier()))
        .collect()
}

/// Ids in `campaign` whose activity falls in a different band than the
/// campaign's tier. Ids not in `tiers` are skipped.
pub fn tier_mismatches<'c>(
    campaign: &'c Campaign,
    tiers: &HashMap<String, CampaignTier>,
) -> Vec<&'c str> {
    campaign
        .activities
        .iter()
        .filter(|id| tiers.get(id.as_str()).is_some_and(|tier| *tier != campaign.tier))
        .map(String::as_str)
        .collect()
}
