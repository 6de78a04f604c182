//! 编排模块：请求 → 源码 → 编译产物 → 还原源码
pub mod rule_forge;

pub use self::rule_forge::{CompiledRef, RenderedRule, RuleForge};
