//! 链接访问密码
//!
//! 使用 Argon2id 哈希存储，明文从不落库

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::{LinkgateError, Result};

/// 对密码进行 Argon2id 哈希
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LinkgateError::password_hash(e.to_string()))
}

/// 验证密码是否匹配哈希
///
/// 存储中的哈希无法解析时视为不匹配，解析路径不会因此报错
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// 处理创建时提交的密码
///
/// - 如果输入为空或 None，返回 None（链接不设密码）
/// - 否则对密码进行哈希
pub fn process_new_password(password: Option<&str>) -> Result<Option<String>> {
    match password {
        Some(pwd) if !pwd.is_empty() => hash_password(pwd).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("open sesame").expect("hash should succeed");

        assert!(hash.starts_with("$argon2id"));
        assert!(verify_password("open sesame", &hash));
        assert!(!verify_password("open sesame!", &hash));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "plaintext"));
    }

    #[test]
    fn test_process_new_password() {
        assert!(process_new_password(None).unwrap().is_none());
        assert!(process_new_password(Some("")).unwrap().is_none());
        let hashed = process_new_password(Some("pw")).unwrap().unwrap();
        assert!(verify_password("pw", &hashed));
    }
}
