pub mod home;
pub mod stats;

pub use home::{home_page, HomeVm};
pub use stats::{stats_page, StatsVm};
