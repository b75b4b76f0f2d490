//! # 工具模块

pub mod headers;

pub use headers::{
    HeaderRule, HeaderRuleAction, HeaderVariableContext, apply_header_rules, group_header_rules,
    resolve_header_variables,
};
