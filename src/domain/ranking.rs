//! Leaderboard of saved games, best total assets first.

use serde::Serialize;

use super::document::GameDocument;

pub const MAX_RANKING_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub rank: usize,
    pub player: String,
    pub total_assets: f64,
    pub cumulative_profit_rate: f64,
    pub day_index: usize,
    pub transactions: usize,
}

/// Clamp a requested table size to `1..=MAX_RANKING_LIMIT`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_RANKING_LIMIT)
}

/// Order players by saved total assets, descending. Ties keep key order.
pub fn rank_players(documents: Vec<(String, GameDocument)>, limit: usize) -> Vec<RankingEntry> {
    let mut documents = documents;
    documents.sort_by(|(a_key, a), (b_key, b)| {
        b.total_assets
            .total_cmp(&a.total_assets)
            .then_with(|| a_key.cmp(b_key))
    });

    documents
        .into_iter()
        .take(clamp_limit(limit))
        .enumerate()
        .map(|(i, (player, doc))| RankingEntry {
            rank: i + 1,
            player,
            total_assets: doc.total_assets,
            cumulative_profit_rate: doc.cumulative_profit_rate,
            day_index: doc.current_index,
            transactions: doc.ledger.len(),
        })
        .collect()
}
