//! 网易云 weapi 请求加密
//!
//! 加密流程: params = base64(AES-CBC(base64(AES-CBC(json, PRESET_KEY)), secret))，
//! encSecKey = RSA(reverse(secret))，不做填充，输出 256 位十六进制。

use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine};
use domain::ProviderError;
use num_bigint::BigUint;
use rand::{distributions::Alphanumeric, Rng};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

const PRESET_KEY: &str = "0CoJUm6Qyw8W8jud";
const IV: &str = "0102030405060708";
const PUBLIC_EXPONENT: &str = "010001";
const MODULUS: &str = "00e0b509f6259df8642dbc35662901477df22677ec152b5ff68ace615bb7b725152b3ab17a876aea8a5aa76d2e417629ec4ee341f56135fccf695280104e0312ecbda92557c93870114af6c9d05c4f7f0c3685b7a46bee255932575cce10b424d813cfe4875d3e82047b97ddef52741d546b8e289dc6935b3ece0462db0a22b8e7";
const SECRET_LEN: usize = 16;

/// 加密后的表单字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeapiForm {
    pub params: String,
    pub enc_sec_key: String,
}

impl WeapiForm {
    /// 转换为 `application/x-www-form-urlencoded` 表单
    pub fn as_form(&self) -> [(&'static str, &str); 2] {
        [("params", &self.params), ("encSecKey", &self.enc_sec_key)]
    }
}

/// weapi 加密器
#[derive(Debug, Clone, Default)]
pub struct WeapiEncryptor;

impl WeapiEncryptor {
    pub fn new() -> Self {
        Self
    }

    /// 使用随机 secret 加密请求体
    pub fn encrypt(&self, payload: &serde_json::Value) -> Result<WeapiForm, ProviderError> {
        let text = serde_json::to_string(payload)
            .map_err(|e| ProviderError::Crypto(format!("Serialize payload failed: {}", e)))?;
        encrypt_with_secret(&text, &random_secret())
    }
}

/// 生成 16 位 `[a-zA-Z0-9]` 随机串
pub fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}

pub fn encrypt_with_secret(text: &str, secret: &str) -> Result<WeapiForm, ProviderError> {
    let first = aes_cbc_encrypt(text, PRESET_KEY)?;
    let params = aes_cbc_encrypt(&first, secret)?;
    let enc_sec_key = rsa_encrypt(secret)?;
    Ok(WeapiForm {
        params,
        enc_sec_key,
    })
}

/// AES-128-CBC + PKCS#7，输出标准 base64
pub fn aes_cbc_encrypt(text: &str, key: &str) -> Result<String, ProviderError> {
    let cipher = Aes128CbcEnc::new_from_slices(key.as_bytes(), IV.as_bytes())
        .map_err(|e| ProviderError::Crypto(format!("Invalid AES key: {}", e)))?;
    let encrypted = cipher.encrypt_padded_vec_mut::<Pkcs7>(text.as_bytes());
    Ok(STANDARD.encode(encrypted))
}

/// 无填充 RSA：把反转后的 secret 视为大端整数做模幂
pub fn rsa_encrypt(secret: &str) -> Result<String, ProviderError> {
    let modulus = parse_hex(MODULUS)?;
    let exponent = parse_hex(PUBLIC_EXPONENT)?;

    let reversed: Vec<u8> = secret.bytes().rev().collect();
    let value = BigUint::from_bytes_be(&reversed);
    let encrypted = value.modpow(&exponent, &modulus);
    Ok(format!("{:0>256}", encrypted.to_str_radix(16)))
}

fn parse_hex(hex: &str) -> Result<BigUint, ProviderError> {
    BigUint::parse_bytes(hex.as_bytes(), 16)
        .ok_or_else(|| ProviderError::Crypto(format!("Invalid hex number: {}", hex)))
}
