use super::job::JobRecord;

/// ジョブボード: 既知ジョブの順序付きコレクション + 単一の「現在ジョブ」指定。
/// 一覧表示の唯一の情報源。ネットワークもタイマーも持たない純粋なデータ構造。
#[derive(Debug, Default)]
pub struct JobBoard {
    /// 新しい順（先頭が最新）
    jobs: Vec<JobRecord>,
    current_id: Option<String>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 先頭に追加する。同じ id が既にあれば何もしない。
    pub fn insert(&mut self, record: JobRecord) -> bool {
        if self.jobs.iter().any(|j| j.id == record.id) {
            return false;
        }
        self.jobs.insert(0, record);
        true
    }

    /// id が一致する既存レコードを丸ごと置き換える（位置は保持）。
    /// id が無ければ何もしない。終端状態から非終端への巻き戻しは拒否する。
    pub fn update(&mut self, record: JobRecord) -> bool {
        let Some(stored) = self.jobs.iter_mut().find(|j| j.id == record.id) else {
            return false;
        };
        if stored.is_terminal() && !record.is_terminal() {
            log::warn!(
                "ignoring stale {} status for terminal job {}",
                record.status.as_str(),
                record.id
            );
            return false;
        }
        *stored = record;
        true
    }

    /// 表示用の順序付き一覧
    pub fn list(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn get(&self, id: &str) -> Option<&JobRecord> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// ブートストラップ: バックエンドの一覧で全置換する。
    /// 現在ジョブの id が消えていたら指定も解除する。
    pub fn load(&mut self, records: Vec<JobRecord>) {
        self.jobs = records;
        if let Some(current) = &self.current_id {
            if !self.jobs.iter().any(|j| &j.id == current) {
                self.current_id = None;
            }
        }
    }

    /// 現在ジョブを指定する。未知の id なら何もしない。
    pub fn set_current(&mut self, id: &str) -> bool {
        if self.jobs.iter().any(|j| j.id == id) {
            self.current_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn clear_current(&mut self) {
        self.current_id = None;
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn current(&self) -> Option<&JobRecord> {
        let id = self.current_id.as_deref()?;
        self.get(id)
    }
}
