//! Shared helpers: a scripted stand-in for the extraction tool, a store in a
//! temp dir, and polling.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mediafetch_core::config::ToolConfig;
use mediafetch_core::job_db::{JobDb, JobId, JobRecord, MediaKind, NewJob, QualitySelector};
use mediafetch_core::orchestrator::Orchestrator;
use mediafetch_core::retry::RetryPolicy;
use tempfile::TempDir;

/// Metadata record printed in `--dump-json` mode.
pub const META_OK: &str =
    r#"echo '{"id":"x1","title":"Clip Title","thumbnail":"https://img/x1.jpg","duration":125.0,"uploader":"Uploader"}'"#;

/// Metadata mode fails.
pub const META_FAIL: &str = "echo 'ERROR: metadata unavailable' >&2; exit 1";

/// Write a `/bin/sh` script that behaves like the tool: `meta` runs in
/// `--dump-json` mode, `download` otherwise with `$dir` set to the output
/// directory taken from `-o`. Every invocation's arguments are appended to
/// `args.log` next to the script.
pub fn fake_tool(root: &Path, meta: &str, download: &str) -> ToolConfig {
    let script = root.join("fake-tool.sh");
    let args_log = root.join("args.log");
    let body = format!(
        r#"#!/bin/sh
printf '%s\n' "$@" '----' >> '{args_log}'
mode=download
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --dump-json) mode=meta ;;
    -o) shift; out="$1" ;;
    --) shift; break ;;
  esac
  shift
done
if [ "$mode" = meta ]; then
{meta}
exit 0
fi
dir=$(dirname "$out")
{download}
exit 0
"#,
        args_log = args_log.display(),
    );
    std::fs::write(&script, body).unwrap();
    ToolConfig {
        program: "/bin/sh".to_string(),
        prefix_args: vec![script.display().to_string()],
        user_agent: None,
        extra_args: Vec::new(),
    }
}

/// Arguments of every invocation so far, one `Vec` per call.
pub fn recorded_args(root: &Path) -> Vec<Vec<String>> {
    let text = std::fs::read_to_string(root.join("args.log")).unwrap_or_default();
    text.split("----\n")
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| chunk.lines().map(String::from).collect())
        .collect()
}

pub struct Harness {
    pub root: TempDir,
    pub out_dir: PathBuf,
    pub db: JobDb,
    pub orchestrator: Arc<Orchestrator>,
}

impl Harness {
    pub async fn new(meta: &str, download: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let tool = fake_tool(root.path(), meta, download);
        Self::with_tool(root, tool).await
    }

    pub async fn with_tool(root: TempDir, tool: ToolConfig) -> Self {
        let out_dir = root.path().join("out");
        let db = JobDb::open_at(root.path().join("jobs.db"), RetryPolicy::default())
            .await
            .unwrap();
        let orchestrator = Arc::new(Orchestrator::from_parts(
            db.clone(),
            tool,
            out_dir.clone(),
            Duration::from_secs(5),
        ));
        Self {
            root,
            out_dir,
            db,
            orchestrator,
        }
    }

    pub async fn add_video(&self, owner: &str) -> JobId {
        self.db
            .add_job(&NewJob::new(
                "https://www.youtube.com/watch?v=x1",
                MediaKind::Video,
                QualitySelector::Max720,
                owner,
            ))
            .await
            .unwrap()
    }

    pub async fn add_audio(&self, owner: &str, quality: QualitySelector) -> JobId {
        self.db
            .add_job(&NewJob::new(
                "https://youtu.be/x1",
                MediaKind::Audio,
                quality,
                owner,
            ))
            .await
            .unwrap()
    }

    pub async fn job(&self, id: JobId) -> JobRecord {
        self.db.get_job(id).await.unwrap().expect("job exists")
    }

    /// Poll until `pred` holds for the job row (or the row is gone and
    /// `pred(None)` holds). Panics after a few seconds.
    pub async fn wait_for(&self, id: JobId, pred: impl Fn(Option<&JobRecord>) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let job = self.db.get_job(id).await.unwrap();
            if pred(job.as_ref()) {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached for job {id}: {job:?}"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Download body: announces fragments, reports progress, merges into `Clip.mp4`.
pub const DOWNLOAD_MERGED: &str = r#"
echo "[download] Destination: $dir/Clip.f137.mp4"
echo "[download]  10.0% of 1.00MiB at 1.00MiB/s ETA 00:01"
echo "[download]  55.5% of 1.00MiB at 1.00MiB/s ETA 00:01"
echo "[download] 100% of 1.00MiB in 00:00:01"
printf 'video' > "$dir/Clip.mp4"
echo "[Merger] Merging formats into \"$dir/Clip.mp4\""
"#;

/// Download body: slow progress loop, then a file. Runs for about `n / 10` seconds.
pub fn download_slow(n: u32) -> String {
    format!(
        r#"
echo "[download] Destination: $dir/Slow.mp4"
i=0
while [ $i -lt {n} ]; do
  echo "[download]  $i.0% of 1.00MiB"
  sleep 0.1
  i=$((i+1))
done
printf 'slow' > "$dir/Slow.mp4"
"#
    )
}
