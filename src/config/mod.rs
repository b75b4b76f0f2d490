//! # 配置模块
//!
//! 系统默认配置与分组级配置覆盖的合并

pub mod settings;

pub use settings::{EffectiveConfig, GroupConfigOverride, SystemSettings, SystemSettingsManager};
