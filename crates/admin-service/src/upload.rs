//! 异常图片存储
//!
//! 校验扩展名与大小，清洗文件名并追加时间戳后落盘到 `{dir}/novedades`，
//! 数据库中记录 `{public_prefix}/novedades/<name>` 相对路径。

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use suministros_shared::config::UploadConfig;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{ApiError, Result};

const SUBDIR: &str = "novedades";
/// 同名同秒上传时追加序号的最大尝试次数
const MAX_NAME_ATTEMPTS: u32 = 100;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("valid filename regex"));

/// 图片存储
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    public_prefix: String,
    max_bytes: usize,
    allowed_extensions: Vec<String>,
}

impl ImageStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
            max_bytes: config.max_bytes,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// 扩展名（不区分大小写）是否在白名单内
    pub fn allowed_file(&self, filename: &str) -> bool {
        extension(filename)
            .map(|ext| self.allowed_extensions.iter().any(|a| *a == ext))
            .unwrap_or(false)
    }

    /// 保存图片，返回写入数据库的相对路径
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let Some(ext) = extension(original_name).filter(|_| self.allowed_file(original_name))
        else {
            return Err(ApiError::FileProcessingError(format!(
                "Tipo de archivo no permitido. Extensiones válidas: {}",
                self.allowed_extensions.join(", ")
            )));
        };
        if bytes.is_empty() {
            return Err(ApiError::FileProcessingError(
                "El archivo está vacío".to_string(),
            ));
        }
        if bytes.len() > self.max_bytes {
            return Err(ApiError::FileProcessingError(format!(
                "El archivo supera el tamaño máximo de {} bytes",
                self.max_bytes
            )));
        }

        // 扩展名取自校验过的原始名，清洗只作用于主干部分
        let stem = secure_filename(stem_of(original_name));
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let target_dir = self.dir.join(SUBDIR);
        tokio::fs::create_dir_all(&target_dir).await.map_err(|e| {
            ApiError::Internal(format!("No se pudo crear el directorio de imágenes: {e}"))
        })?;

        for intento in 0..MAX_NAME_ATTEMPTS {
            let name = stored_name(&stem, &stamp, intento, &ext);
            let path = target_dir.join(&name);
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(ApiError::Internal(format!(
                        "No se pudo guardar la imagen: {e}"
                    )));
                }
            };

            if let Err(e) = file.write_all(bytes).await {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(ApiError::Internal(format!("No se pudo guardar la imagen: {e}")));
            }

            info!(file = %name, size = bytes.len(), "Novedad image stored");
            return Ok(format!("{}/{}/{}", self.public_prefix, SUBDIR, name));
        }

        warn!(stem = %stem, "No free file name for novedad image");
        Err(ApiError::Conflict(
            "Demasiadas imágenes con el mismo nombre, intente de nuevo".to_string(),
        ))
    }

    /// 删除已保存的图片（登记失败时回收）
    pub async fn remove(&self, ruta: &str) {
        let Some(name) = ruta.rsplit('/').next() else {
            return;
        };
        let path = self.dir.join(SUBDIR).join(name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove novedad image");
        }
    }
}

fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// 去掉路径部分，非法字符替换为下划线
pub fn secure_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        "imagen".to_string()
    } else {
        cleaned.to_string()
    }
}

fn stem_of(filename: &str) -> &str {
    filename.rsplit_once('.').map_or(filename, |(stem, _)| stem)
}

/// `foto` + `png` -> `foto_20250101_093000.png`，冲突时 `foto_20250101_093000_1.png`
fn stored_name(stem: &str, stamp: &str, intento: u32, ext: &str) -> String {
    if intento == 0 {
        format!("{stem}_{stamp}.{ext}")
    } else {
        format!("{stem}_{stamp}_{intento}.{ext}")
    }
}
