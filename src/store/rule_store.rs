//! 规则存储管理
//! 按规则名保存源码（.yar）与编译产物（.bin），目录不存在时自动创建

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::StoreConfig;
use crate::engine::CompiledRules;
use crate::error::{YaraForgeError, YfResult};

/// 规则存储管理器
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    config: StoreConfig,
}

impl RuleStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn rules_dir(&self) -> &Path {
        &self.config.rules_dir
    }

    /// 源码文件路径（规则目录/规则名.yar）
    pub fn source_path(&self, name: &str) -> PathBuf {
        self.file_path(name, &self.config.source_ext)
    }

    /// 编译产物路径（规则目录/规则名.bin）
    pub fn compiled_path(&self, name: &str) -> PathBuf {
        self.file_path(name, &self.config.compiled_ext)
    }

    /// 保存源码
    /// 非文本内容（非UTF-8或含NUL字节）拒绝写入
    pub fn save_source(&self, name: &str, source: impl AsRef<[u8]>) -> YfResult<PathBuf> {
        Self::check_name(name)?;
        self.ensure_rules_dir()?;

        let bytes = source.as_ref();
        let text = std::str::from_utf8(bytes).map_err(|_| {
            YaraForgeError::Validation("save_source: rule source must be UTF-8 text".to_string())
        })?;
        if text.contains('\0') {
            return Err(YaraForgeError::Validation(
                "save_source: rule source must not contain NUL bytes".to_string(),
            ));
        }

        let path = self.source_path(name);
        fs::write(&path, text).map_err(|e| YaraForgeError::persistence(&path, e))?;
        debug!("Rule source saved: {} ({} bytes)", path.display(), text.len());
        Ok(path)
    }

    /// 保存编译产物
    pub fn save_compiled(&self, name: &str, rules: &CompiledRules) -> YfResult<PathBuf> {
        Self::check_name(name)?;
        self.ensure_rules_dir()?;
        self.write_compiled(name, &rules.to_bytes()?)
    }

    /// 保存编译产物（二进制形式）
    /// 无法反序列化为编译规则的内容拒绝写入
    pub fn save_compiled_bytes(&self, name: &str, bytes: &[u8]) -> YfResult<PathBuf> {
        Self::check_name(name)?;
        self.ensure_rules_dir()?;

        if let Err(e) = CompiledRules::from_bytes(bytes) {
            return Err(YaraForgeError::Validation(format!(
                "save_compiled: content is not a compiled rule set ({})",
                e
            )));
        }
        self.write_compiled(name, bytes)
    }

    /// 读取源码
    pub fn load_source(&self, name: &str) -> YfResult<String> {
        let path = self.source_path(name);
        fs::read_to_string(&path).map_err(|e| YaraForgeError::persistence(&path, e))
    }

    /// 读取编译产物
    pub fn load_compiled(&self, name: &str) -> YfResult<CompiledRules> {
        let path = self.compiled_path(name);
        let bytes = fs::read(&path).map_err(|e| YaraForgeError::persistence(&path, e))?;
        debug!("Compiled rules loaded: {} ({} bytes)", path.display(), bytes.len());
        CompiledRules::from_bytes(&bytes).map_err(|e| match e {
            YaraForgeError::CompiledFormat(message) => {
                YaraForgeError::CompiledFormat(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    pub fn has_source(&self, name: &str) -> bool {
        self.source_path(name).is_file()
    }

    pub fn has_compiled(&self, name: &str) -> bool {
        self.compiled_path(name).is_file()
    }

    fn write_compiled(&self, name: &str, bytes: &[u8]) -> YfResult<PathBuf> {
        let path = self.compiled_path(name);
        fs::write(&path, bytes).map_err(|e| YaraForgeError::persistence(&path, e))?;
        debug!("Compiled rules saved: {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    fn file_path(&self, name: &str, ext: &str) -> PathBuf {
        self.config.rules_dir.join(format!("{}{}", name, ext))
    }

    /// 统一确保规则目录存在
    fn ensure_rules_dir(&self) -> YfResult<()> {
        let dir = &self.config.rules_dir;
        if !dir.is_dir() {
            fs::create_dir_all(dir).map_err(|e| YaraForgeError::persistence(dir, e))?;
            debug!("Rules directory created: {}", dir.display());
        }
        Ok(())
    }

    /// 规则名即文件名，不允许为空或包含路径分隔符
    fn check_name(name: &str) -> YfResult<()> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(YaraForgeError::Validation(format!(
                "invalid rule file name: {:?}",
                name
            )));
        }
        Ok(())
    }
}
