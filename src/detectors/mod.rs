//! Structure detectors
//!
//! Everything here is a pure function of an ordered candle slice and an
//! [`AnalysisConfig`](crate::config::AnalysisConfig).
//!
//! # Detectors
//!
//! - **swing**: local extrema with a fixed 3-bar look-left/look-right
//! - **trendline**: horizontal, diagonal and EMA support/resistance lines
//! - **channel**: regression-based channel classification and channel breakouts
//! - **structure**: double top/bottom and flag geometry checks

pub mod helpers;

pub mod channel;
pub mod structure;
pub mod swing;
pub mod trendline;

pub use channel::{classify_channel, detect_channel_breakout, Channel, ChannelBreakout, ChannelKind};
pub use helpers::*;
pub use structure::{check_structure, PatternKind, StructureCheck};
pub use swing::{find_swing_points, SwingKind, SwingPoint};
pub use trendline::{detect_trendlines, LineKind, PriceModel, Side, Trendline};
