//! Token 生成与格式校验
//!
//! 字母表去掉了容易混淆的 `0 O 1 l I`，便于口头或手抄传递

/// 生成 token 使用的字母表
pub const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

/// 默认 token 长度
pub const DEFAULT_TOKEN_LENGTH: usize = 10;

/// 可接受的 token 最大长度（与 links.token 列宽一致）
pub const MAX_TOKEN_LENGTH: usize = 64;

/// Token 来源，测试中可替换为确定性实现
pub trait TokenGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// 基于线程随机数的默认实现
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self, length: usize) -> String {
        std::iter::repeat_with(|| {
            TOKEN_ALPHABET[rand::random_range(0..TOKEN_ALPHABET.len())] as char
        })
        .take(length)
        .collect()
    }
}

/// 检查请求路径中的 token 是否可能是合法 token
///
/// 只做形状检查：非空、长度受限、仅 ASCII 字母数字与 `-` `_`。
/// 不符合的请求直接按不存在处理，不触达存储。
pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LENGTH
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
