// sink.rs: the one place text leaves the node
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Serializes every line any task emits. Each call is one locked
/// `write_all` + `flush`, so lines are never torn; order across callers is
/// lock-acquisition order and nothing more.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Writer>>,
}

impl OutputSink {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self { inner: Arc::new(Mutex::new(Box::new(writer))) }
    }

    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }

    pub async fn emit(&self, line: &str) -> io::Result<()> {
        self.emit_lines([line]).await
    }

    /// Write several lines as a single block; no other emission lands inside it.
    pub async fn emit_lines<I, S>(&self, lines: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut block = String::new();
        for l in lines {
            block.push_str(l.as_ref());
            block.push('\n');
        }

        let mut w = self.inner.lock().await;
        w.write_all(block.as_bytes()).await?;
        w.flush().await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll, Waker};
    use tokio::io::AsyncWrite;

    /// In-memory writer. `choppy` accepts three bytes per call and yields
    /// between calls, so a writer holding the lock really does get suspended
    /// mid-line.
    #[derive(Clone, Default)]
    pub struct Capture {
        buf: Arc<Mutex<Vec<u8>>>,
        choppy: bool,
        yield_next: bool,
    }

    impl Capture {
        pub fn choppy() -> Self {
            Self { choppy: true, ..Self::default() }
        }

        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.buf.lock()).into_owned()
        }

        pub fn lines(&self) -> Vec<String> {
            self.text().lines().map(str::to_owned).collect()
        }

        pub fn lines_starting_with(&self, prefix: &str) -> usize {
            self.lines().iter().filter(|l| l.starts_with(prefix)).count()
        }
    }

    impl AsyncWrite for Capture {
        fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, data: &[u8]) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            if !this.choppy {
                this.buf.lock().extend_from_slice(data);
                return Poll::Ready(Ok(data.len()));
            }
            this.yield_next = !this.yield_next;
            if this.yield_next {
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            let n = data.len().min(3);
            this.buf.lock().extend_from_slice(&data[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Holds every write `Pending` until opened, so a task can be caught
    /// mid-emit. What gets through lands in `capture()`.
    #[derive(Clone, Default)]
    pub struct Gated {
        out: Capture,
        gate: Arc<Mutex<Gate>>,
    }

    #[derive(Default)]
    struct Gate {
        open: bool,
        holding: bool,
        waiter: Option<Waker>,
    }

    impl Gated {
        pub fn capture(&self) -> &Capture {
            &self.out
        }

        /// A write is parked at the gate.
        pub fn is_holding(&self) -> bool {
            self.gate.lock().holding
        }

        pub fn open(&self) {
            let mut g = self.gate.lock();
            g.open = true;
            if let Some(w) = g.waiter.take() {
                w.wake();
            }
        }
    }

    impl AsyncWrite for Gated {
        fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, data: &[u8]) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            {
                let mut g = this.gate.lock();
                if !g.open {
                    g.holding = true;
                    g.waiter = Some(cx.waker().clone());
                    return Poll::Pending;
                }
                g.holding = false;
            }
            Pin::new(&mut this.out).poll_write(cx, data)
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Every write fails, as a dropped serial link would.
    pub struct Broken;

    impl AsyncWrite for Broken {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _data: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "link down")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Broken, Capture};
    use super::*;

    #[tokio::test]
    async fn block_is_written_in_order() {
        let cap = Capture::default();
        let sink = OutputSink::new(cap.clone());
        sink.emit_lines(["a: 1", "b: 2"]).await.unwrap();
        sink.emit("c: 3").await.unwrap();
        assert_eq!(cap.text(), "a: 1\nb: 2\nc: 3\n");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_emitters_never_tear_lines() {
        let cap = Capture::choppy();
        let sink = OutputSink::new(cap.clone());

        let mut handles = Vec::new();
        for w in 0..8 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..20 {
                    let line = format!("writer-{w}: {i:04} {}", "x".repeat(w + 5));
                    sink.emit(&line).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let lines = cap.lines();
        assert_eq!(lines.len(), 8 * 20);
        for l in &lines {
            let (head, rest) = l.split_once(": ").expect("torn line");
            let w: usize = head.strip_prefix("writer-").expect("torn line").parse().unwrap();
            let (seq, pad) = rest.split_once(' ').expect("torn line");
            assert_eq!(seq.len(), 4, "torn line: {l}");
            assert_eq!(pad, "x".repeat(w + 5), "torn line: {l}");
        }
    }

    #[tokio::test]
    async fn write_failure_surfaces_to_caller() {
        let sink = OutputSink::new(Broken);
        let err = sink.emit("temperature: 21.00").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
