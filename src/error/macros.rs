//! # 错误处理宏

/// 快速创建配置错误的宏
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::ProxyError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::config(format!($fmt, $($arg)*))
    };
}

/// 快速创建数据库错误的宏
#[macro_export]
macro_rules! database_error {
    ($msg:expr) => {
        $crate::error::ProxyError::database($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::database(format!($fmt, $($arg)*))
    };
}

/// 快速创建密钥解析错误的宏
#[macro_export]
macro_rules! key_parse_error {
    ($msg:expr) => {
        $crate::error::ProxyError::key_parse($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::key_parse(format!($fmt, $($arg)*))
    };
}

/// 快速创建密钥验证错误的宏
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::error::ProxyError::validation($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::validation(format!($fmt, $($arg)*))
    };
}

/// 快速创建内部错误的宏
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::ProxyError::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::internal(format!($fmt, $($arg)*))
    };
}

/// 确保条件成立，否则返回配置错误
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::config_error!($msg));
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::config_error!($fmt, $($arg)*));
        }
    };
}
