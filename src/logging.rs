//! # 日志配置模块
//!
//! 提供结构化日志宏与日志系统初始化，所有业务日志都带上
//! 请求ID、阶段与组件三个维度

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as sub_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 日志阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    /// 启动阶段
    Startup,
    /// 配置解析
    Config,
    /// 密钥解析
    KeyParse,
    /// 密钥验证
    Validation,
    /// 请求头改写
    RequestModify,
    /// 数据库操作
    Db,
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Startup => "startup",
            Self::Config => "config",
            Self::KeyParse => "key_parse",
            Self::Validation => "validation",
            Self::RequestModify => "request_modify",
            Self::Db => "db",
        };
        write!(f, "{s}")
    }
}

/// 日志组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    /// 密钥解析器
    KeyParser,
    /// 密钥验证器
    KeyValidator,
    /// 密钥存储
    KeyStore,
    /// 验证渠道
    Channel,
    /// 配置管理器
    SettingsManager,
    /// 请求头解析器
    HeaderResolver,
    /// 数据库
    Database,
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::KeyParser => "key_parser",
            Self::KeyValidator => "key_validator",
            Self::KeyStore => "key_store",
            Self::Channel => "channel",
            Self::SettingsManager => "settings_manager",
            Self::HeaderResolver => "header_resolver",
            Self::Database => "database",
        };
        write!(f, "{s}")
    }
}

/// 结构化 info 日志
#[macro_export]
macro_rules! linfo {
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr $(,)?) => {
        tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            event = $event,
            "{}",
            $msg
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr, $($fields:tt)+) => {
        tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            event = $event,
            $($fields)+,
            "{}",
            $msg
        )
    };
}

/// 结构化 warn 日志
#[macro_export]
macro_rules! lwarn {
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr $(,)?) => {
        tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            event = $event,
            "{}",
            $msg
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr, $($fields:tt)+) => {
        tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            event = $event,
            $($fields)+,
            "{}",
            $msg
        )
    };
}

/// 结构化 debug 日志
#[macro_export]
macro_rules! ldebug {
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr $(,)?) => {
        tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            event = $event,
            "{}",
            $msg
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr, $($fields:tt)+) => {
        tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            event = $event,
            $($fields)+,
            "{}",
            $msg
        )
    };
}

/// 结构化 error 日志
#[macro_export]
macro_rules! lerror {
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr $(,)?) => {
        tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            event = $event,
            "{}",
            $msg
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr, $($fields:tt)+) => {
        tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            event = $event,
            $($fields)+,
            "{}",
            $msg
        )
    };
}

/// 初始化日志系统
///
/// 默认配置下屏蔽数据库查询的详细日志，`RUST_LOG` 可覆盖全部过滤规则
pub fn init_logging(log_level: Option<&String>) {
    let level = log_level.map_or("info", std::string::String::as_str);

    let default_filter = format!("{level},api_keypool=debug,sqlx::query=off,sea_orm::query=warn,sqlx=warn");

    let log_filter = env::var("RUST_LOG").unwrap_or(default_filter);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(
            sub_fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
