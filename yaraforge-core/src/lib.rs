// 核心公共结构体（规则请求/渲染输入/匹配记录）
pub mod core;
// 内核错误定义
pub mod error;
// 规则标识符清洗
pub mod sanitizer;
// 条件引用过滤
pub mod reference;
// 规则源码渲染
pub mod renderer;
// 日志辅助
pub mod utils;

// 顶层导出常用类型
pub use crate::core::{ArtifactEntry, MatchRecord, OrderedMap, PatternSet, RuleRequest, RuleSource};
pub use error::{CoreError, CoreResult};
pub use reference::{referenced_patterns, scan_references};
pub use renderer::{escape_literal, render_source};
pub use sanitizer::{exceeds_identifier_limit, sanitize_identifier, MAX_IDENTIFIER_LEN};
