//! yaraforge - YARA规则生成、编译、存储与还原工具

// 导出全局错误类型
pub use self::error::{YaraForgeError, YfResult};

// 导出配置模块
pub use self::config::{
    CompileOptions, ConfigManager, CustomConfigBuilder, ExternalValue, ForgeConfig, StoreConfig,
};

// 导出存储模块核心接口
pub use self::store::RuleStore;

// 导出引擎模块核心接口
pub use self::engine::{CallbackMsg, CompiledRules, RuleEngine, YaraXEngine};

// 导出编排模块核心接口
pub use self::forge::{CompiledRef, RenderedRule, RuleForge};

// 导出内核数据模型与纯文本处理
pub use yaraforge_core::{
    escape_literal, referenced_patterns, render_source, sanitize_identifier, ArtifactEntry,
    MatchRecord, OrderedMap, PatternSet, RuleRequest, RuleSource,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod store;
pub mod engine;
pub mod forge;
