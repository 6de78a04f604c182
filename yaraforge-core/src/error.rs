//! yaraforge-core 内核错误定义
//! 封装内核层所有核心错误，与业务层错误解耦，基于thiserror实现类型安全处理
use thiserror::Error;

use serde_json::Error as SerdeJsonError;

/// 内核核心错误枚举
/// 内核层只做纯文本处理，错误仅来自输入解析
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================== 请求相关错误 =====================
    /// 规则请求解析失败（JSON格式错误/字段类型不匹配）
    #[error("Rule request parse failed: {0}")]
    RequestParseError(#[from] SerdeJsonError),
}

/// 内核层全局Result类型别名
/// 统一使用CoreError作为内核层错误类型
pub type CoreResult<T> = Result<T, CoreError>;
