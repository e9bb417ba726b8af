use fsbridge::{Context, RequestSlot};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Context whose handler forwards every `(id, result)` into a channel
#[allow(dead_code)]
pub struct Harness {
    pub ctx: Context,
    responses: UnboundedReceiver<(u32, i32)>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        let (tx, responses) = unbounded();
        let ctx = Context::init(tx, |tx: &UnboundedSender<(u32, i32)>, id, result| {
            tx.unbounded_send((id, result))?;
            Ok(())
        });
        Self { ctx, responses }
    }

    /// A slot bound to this harness with correlation id `id`
    pub fn slot(&self, id: u32) -> RequestSlot {
        let slot = RequestSlot::new();
        slot.bind(&self.ctx).unwrap();
        slot.set_id(id);
        slot
    }

    /// Next completion, in delivery order
    pub async fn next(&mut self) -> (u32, i32) {
        self.responses
            .next()
            .await
            .expect("completion channel closed")
    }

    /// Await the completion for `slot` and return its result code
    pub async fn result_for(&mut self, slot: &RequestSlot) -> i32 {
        let (id, result) = self.next().await;
        assert_eq!(id, slot.id(), "completion carried another slot's id");
        result
    }

    /// Collect `n` completions
    pub async fn collect(&mut self, n: usize) -> Vec<(u32, i32)> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.next().await);
        }
        out
    }
}

#[allow(dead_code)]
pub struct TestTimeoutGuard {
    cancelled: Arc<AtomicBool>,
}

impl Drop for TestTimeoutGuard {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Abort the test process if a completion never arrives
#[allow(dead_code)]
pub fn test_timeout_guard(duration: Duration) -> TestTimeoutGuard {
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = Arc::clone(&cancelled);
    std::thread::spawn(move || {
        std::thread::sleep(duration);
        if !cancelled_clone.load(Ordering::SeqCst) {
            eprintln!("Test timeout exceeded ({}s). Aborting.", duration.as_secs());
            std::process::abort();
        }
    });
    TestTimeoutGuard { cancelled }
}
