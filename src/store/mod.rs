//! 存储模块：规则源码与编译产物的本地持久化
pub mod rule_store;

pub use self::rule_store::RuleStore;
