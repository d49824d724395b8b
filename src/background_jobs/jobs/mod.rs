mod batch_recommendations;
mod colisten_refresh;
mod consumption_watchdog;

pub use batch_recommendations::BatchRecommendationsJob;
pub use colisten_refresh::ColistenRefreshJob;
pub use consumption_watchdog::ConsumptionWatchdogJob;
