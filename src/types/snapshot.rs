//! Aggregate snapshot published to downstream consumers.

use serde::{Deserialize, Serialize};

/// Read-only aggregate of derived values, republished once per tick.
///
/// Volumes are liters, flow rates L/min, costs in the configured
/// tariff currency. Rolling-window statistics are `None` until enough
/// samples exist — "no data" is distinct from `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterSnapshot {
    /// Instantaneous flow rate from the latest reading (L/min).
    pub flow_rate: f64,

    // === Per-period volumes (liters) ===
    pub lifetime_volume: f64,
    pub hourly_volume: f64,
    pub daily_volume: f64,
    pub weekly_volume: f64,
    pub monthly_volume: f64,
    pub yearly_volume: f64,

    // === Costs (volume / 1000 m³ × tariff) ===
    pub daily_cost: f64,
    pub weekly_cost: f64,
    pub monthly_cost: f64,

    // === Rolling-window flow statistics ===
    pub avg_flow_1h: Option<f64>,
    pub max_flow_24h: Option<f64>,
    pub min_flow_24h: Option<f64>,

    /// Current leak detector state.
    pub water_leak_detected: bool,

    // === Buffer occupancy (diagnostic only) ===
    pub flow_sample_count: usize,
    pub hourly_consumption_count: usize,
    pub daily_consumption_count: usize,
    pub hourly_flow_stats_count: usize,
}
