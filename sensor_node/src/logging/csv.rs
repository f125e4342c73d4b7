// Append-only CSV audit trail: commands received and sampling-cycle timing.
// Values are never written here.
use chrono::Utc;
use sensor_protocol::Mode;
use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tokio::{
    fs::{self, File, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
};
use tracing::warn;

type SharedFile = Mutex<BufWriter<File>>;

const COMMANDS_CSV: &str = "commands.csv";
const COMMANDS_HEADER: &str = "ts,line,outcome\n";
const CYCLES_CSV: &str = "cycles.csv";
const CYCLES_HEADER: &str = "ts,channel,seq,mode,status,actual_ms,ideal_ms,jitter_ms\n";

/// One sampling cycle as seen by the task.
#[derive(Debug, Clone, Copy)]
pub struct CycleRecord<'a> {
    pub channel: &'a str,
    pub seq: u64,
    pub mode: Mode,
    pub ok: bool,
    pub actual_ms: f64,
    pub ideal_ms: f64,
    pub jitter_ms: f64,
}

#[derive(Clone, Debug)]
pub struct AuditLog {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    dir: PathBuf,
    commands: OnceCell<SharedFile>,
    cycles: OnceCell<SharedFile>,
}

impl AuditLog {
    /// Files are created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                dir: dir.into(),
                commands: OnceCell::new(),
                cycles: OnceCell::new(),
            }),
        }
    }

    /// commands.csv: ts,line,outcome
    pub async fn log_command(&self, line: &str, outcome: &str) {
        let ts = Utc::now().to_rfc3339();
        let row = format!("{ts},{},{}\n", csv_field(line), csv_field(outcome));
        self.append(&self.inner.commands, COMMANDS_CSV, COMMANDS_HEADER, row).await;
    }

    /// cycles.csv: ts,channel,seq,mode,status,actual_ms,ideal_ms,jitter_ms
    pub async fn log_cycle(&self, r: CycleRecord<'_>) {
        let ts = Utc::now().to_rfc3339();
        let status = if r.ok { "ok" } else { "fault" };
        let row = format!(
            "{ts},{},{},{},{status},{:.3},{:.3},{:.3}\n",
            csv_field(r.channel),
            r.seq,
            r.mode,
            r.actual_ms,
            r.ideal_ms,
            r.jitter_ms,
        );
        self.append(&self.inner.cycles, CYCLES_CSV, CYCLES_HEADER, row).await;
    }

    async fn append(&self, cell: &OnceCell<SharedFile>, name: &str, header: &str, row: String) {
        let res: io::Result<()> = async {
            let file = cell
                .get_or_try_init(|| open_csv(&self.inner.dir, name, header))
                .await?;
            let mut f = file.lock().await;
            f.write_all(row.as_bytes()).await?;
            f.flush().await
        }
        .await;

        if let Err(e) = res {
            warn!(?e, file = name, "audit log write failed");
        }
    }
}

async fn open_csv(dir: &Path, name: &str, header: &str) -> io::Result<SharedFile> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    let fresh = !fs::try_exists(&path).await.unwrap_or(false);
    let f = OpenOptions::new().create(true).append(true).open(&path).await?;
    let mut w = BufWriter::new(f);
    if fresh {
        w.write_all(header.as_bytes()).await?;
        w.flush().await?;
    }
    Ok(Mutex::new(w))
}

fn csv_field(s: &str) -> Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}
