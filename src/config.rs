//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;

/// 默认规则目录
pub const RULES_DIR: &str = "rules";
/// 源码文件扩展名
pub const SOURCE_FILE_EXTENSION: &str = ".yar";
/// 编译产物扩展名
pub const COMPILED_FILE_EXTENSION: &str = ".bin";

/// 规则存储配置
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    // 规则目录（不存在时自动创建）
    pub rules_dir: PathBuf,
    // 源码扩展名
    pub source_ext: String,
    // 编译产物扩展名
    pub compiled_ext: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from(RULES_DIR),
            source_ext: SOURCE_FILE_EXTENSION.to_string(),
            compiled_ext: COMPILED_FILE_EXTENSION.to_string(),
        }
    }
}

/// 外部变量取值（编译前注入编译器）
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
}

/// 编译选项（透传给编译器）
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// 警告视为错误
    pub error_on_warning: bool,
    /// 宽松正则语法
    pub relaxed_re_syntax: bool,
    /// 慢模式视为错误
    pub error_on_slow_pattern: bool,
    /// 命名空间（None 使用编译器默认命名空间）
    pub namespace: Option<String>,
    /// 外部变量
    pub externals: Vec<(String, ExternalValue)>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            error_on_warning: true,
            relaxed_re_syntax: false,
            error_on_slow_pattern: false,
            namespace: None,
            externals: Vec::new(),
        }
    }
}

/// 全局配置
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForgeConfig {
    pub store: StoreConfig,
    pub compile: CompileOptions,
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> ForgeConfig {
        ForgeConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: ForgeConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ForgeConfig::default(),
        }
    }

    pub fn rules_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store.rules_dir = path.into();
        self
    }

    pub fn source_ext(mut self, ext: impl Into<String>) -> Self {
        self.config.store.source_ext = ext.into();
        self
    }

    pub fn compiled_ext(mut self, ext: impl Into<String>) -> Self {
        self.config.store.compiled_ext = ext.into();
        self
    }

    pub fn error_on_warning(mut self, enabled: bool) -> Self {
        self.config.compile.error_on_warning = enabled;
        self
    }

    pub fn relaxed_re_syntax(mut self, enabled: bool) -> Self {
        self.config.compile.relaxed_re_syntax = enabled;
        self
    }

    pub fn error_on_slow_pattern(mut self, enabled: bool) -> Self {
        self.config.compile.error_on_slow_pattern = enabled;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.compile.namespace = Some(namespace.into());
        self
    }

    pub fn external(mut self, ident: impl Into<String>, value: ExternalValue) -> Self {
        self.config.compile.externals.push((ident.into(), value));
        self
    }

    pub fn build(self) -> ForgeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigManager::get_default();
        assert_eq!(config.store.rules_dir, PathBuf::from("rules"));
        assert_eq!(config.store.source_ext, ".yar");
        assert_eq!(config.store.compiled_ext, ".bin");
        assert!(config.compile.error_on_warning);
        assert!(config.compile.externals.is_empty());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConfigManager::custom()
            .rules_dir("/tmp/yara")
            .compiled_ext(".yarc")
            .error_on_warning(false)
            .namespace("cases")
            .external("case_id", ExternalValue::Integer(7))
            .build();

        assert_eq!(config.store.rules_dir, PathBuf::from("/tmp/yara"));
        assert_eq!(config.store.source_ext, ".yar");
        assert_eq!(config.store.compiled_ext, ".yarc");
        assert!(!config.compile.error_on_warning);
        assert_eq!(config.compile.namespace.as_deref(), Some("cases"));
        assert_eq!(
            config.compile.externals,
            vec![("case_id".to_string(), ExternalValue::Integer(7))]
        );
    }
}
