//! Encrypted append-only audit trail.
//!
//! One JSON record per file under the audit dir, named `event_<ms>.log`
//! with a `-<seq>` suffix when a millisecond key repeats. Records are
//! AES-256-GCM encrypted before they touch disk; the process never reads
//! them back. Review happens offline with the key file.

use crate::security::AesEncryptor;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::info;

/// Append-only writer for encrypted audit records.
pub struct AuditLog {
    dir: PathBuf,
    encryptor: AesEncryptor,
    /// (last millisecond key, collision counter) for filename uniqueness.
    counter: Mutex<(i64, u32)>,
}

impl AuditLog {
    /// Open the audit trail, creating the directory and key on first use.
    pub fn open(dir: &Path, key_file: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let encryptor = AesEncryptor::load_or_generate(key_file)?;
        info!(
            dir = %dir.display(),
            key_fingerprint = %encryptor.fingerprint(),
            "audit trail ready"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            encryptor,
            counter: Mutex::new((0, 0)),
        })
    }

    /// Encrypt and persist one record as its own file.
    ///
    /// Concurrent writers never clobber each other: the filename counter
    /// serializes key assignment, and each record gets a distinct file.
    pub fn write(&self, record: &serde_json::Value) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(record)?;
        let encrypted = self.encryptor.encrypt(&serialized)?;
        let filename = {
            let mut state = self.counter.lock();
            filename_for(Utc::now().timestamp_millis(), &mut state)
        };
        std::fs::write(self.dir.join(filename), encrypted)?;
        Ok(())
    }
}

/// Pick a unique filename for the given millisecond timestamp.
///
/// Repeated or backwards timestamps reuse the last key with an increasing
/// `-<seq>` suffix, so names stay unique even under clock skew.
fn filename_for(now_ms: i64, state: &mut (i64, u32)) -> String {
    let (last_ms, seq) = state;
    if now_ms > *last_ms {
        *last_ms = now_ms;
        *seq = 0;
        format!("event_{now_ms}.log")
    } else {
        *seq += 1;
        format!("event_{}-{}.log", *last_ms, *seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_log(tmp: &TempDir) -> AuditLog {
        let dir = tmp.path().join("audit");
        AuditLog::open(&dir, &dir.join("key.bin")).unwrap()
    }

    #[test]
    fn open_creates_dir_and_key() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("audit");
        let key = dir.join("key.bin");
        let _log = AuditLog::open(&dir, &key).unwrap();
        assert!(dir.is_dir());
        assert!(key.is_file());
        assert_eq!(std::fs::read(&key).unwrap().len(), 32);
    }

    #[test]
    fn written_record_is_encrypted_and_recoverable() {
        let tmp = TempDir::new().unwrap();
        let log = make_log(&tmp);
        let record = serde_json::json!({
            "event": "route",
            "model": "local",
            "reason": "default local policy",
        });
        log.write(&record).unwrap();

        let dir = tmp.path().join("audit");
        let entries: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("event_"))
            .collect();
        assert_eq!(entries.len(), 1);

        let on_disk = std::fs::read_to_string(entries[0].path()).unwrap();
        assert!(AesEncryptor::is_encrypted(&on_disk));
        assert!(!on_disk.contains("route"));

        // Offline review path: decrypt with the key file.
        let reviewer = AesEncryptor::from_key_file(&dir.join("key.bin")).unwrap();
        let plaintext = reviewer.decrypt(&on_disk).unwrap();
        let recovered: serde_json::Value = serde_json::from_str(&plaintext).unwrap();
        assert_eq!(recovered, record);
    }

    #[test]
    fn rapid_writes_get_distinct_files() {
        let tmp = TempDir::new().unwrap();
        let log = make_log(&tmp);
        for i in 0..20 {
            log.write(&serde_json::json!({"event": "execute_request", "n": i}))
                .unwrap();
        }
        let count = std::fs::read_dir(tmp.path().join("audit"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("event_"))
            .count();
        assert_eq!(count, 20);
    }

    #[test]
    fn filename_advances_with_clock() {
        let mut state = (0, 0);
        assert_eq!(filename_for(100, &mut state), "event_100.log");
        assert_eq!(filename_for(101, &mut state), "event_101.log");
    }

    #[test]
    fn filename_suffixes_same_millisecond() {
        let mut state = (0, 0);
        assert_eq!(filename_for(100, &mut state), "event_100.log");
        assert_eq!(filename_for(100, &mut state), "event_100-1.log");
        assert_eq!(filename_for(100, &mut state), "event_100-2.log");
    }

    #[test]
    fn filename_survives_backwards_clock() {
        let mut state = (0, 0);
        assert_eq!(filename_for(100, &mut state), "event_100.log");
        assert_eq!(filename_for(90, &mut state), "event_100-1.log");
        assert_eq!(filename_for(101, &mut state), "event_101.log");
    }
}
