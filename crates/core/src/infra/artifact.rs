use std::path::{Path, PathBuf};

/// バックエンドは入力形式によらず圧縮済み成果物を返すため、保存名は常にこの接尾辞を持つ
pub const ARTIFACT_SUFFIX: &str = ".processed.gz";

/// 処理済み成果物をローカルファイルとして実体化する
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<original_filename>.processed.gz` の保存先パス
    pub fn artifact_path(&self, original_filename: &str) -> PathBuf {
        self.dir.join(format!("{original_filename}{ARTIFACT_SUFFIX}"))
    }

    /// 一時ファイルに書いてから rename する。書き込み失敗で保存名に欠損ファイルを残さない。
    pub async fn save(
        &self,
        original_filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, std::io::Error> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let dest = self.artifact_path(original_filename);
        let tmp = self
            .dir
            .join(format!("{original_filename}{ARTIFACT_SUFFIX}.part"));

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &dest).await?;

        log::info!("saved artifact: {} ({} bytes)", dest.display(), bytes.len());
        Ok(dest)
    }
}
