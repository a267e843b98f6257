//! Clipboard change monitor
//!
//! Polls the clipboard and fires whenever the observed content differs
//! from the last observation. The first read only seeds the baseline so
//! startup never triggers a push. Reads go through `spawn_blocking`
//! because platform clipboard access blocks.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ClipboardContent, ClipboardPort};

/// Poll period
const MONITOR_INTERVAL: Duration = Duration::from_millis(500);

/// Fingerprint of a clipboard observation, cheap to compare
#[derive(Debug, Clone, PartialEq, Eq)]
enum Fingerprint {
    Empty,
    Text(u64),
    Image(u64),
    Files(u64),
}

fn fingerprint(content: &ClipboardContent) -> Fingerprint {
    fn hash_bytes(bytes: &[u8]) -> u64 {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        hasher.finish()
    }

    match content {
        ClipboardContent::None => Fingerprint::Empty,
        ClipboardContent::Text(text) => Fingerprint::Text(hash_bytes(text.as_bytes())),
        ClipboardContent::Image(png) => Fingerprint::Image(hash_bytes(png)),
        ClipboardContent::Files(paths) => {
            let mut hasher = DefaultHasher::new();
            for path in paths {
                path.hash(&mut hasher);
            }
            Fingerprint::Files(hasher.finish())
        }
    }
}

/// Watch the clipboard until cancelled, sending each change into `tx`
pub async fn run_monitor(
    clipboard: Arc<dyn ClipboardPort>,
    tx: mpsc::Sender<ClipboardContent>,
    cancel: CancellationToken,
) {
    let mut last: Option<Fingerprint> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(MONITOR_INTERVAL) => {}
        }

        let port = Arc::clone(&clipboard);
        let content = match tokio::task::spawn_blocking(move || port.get()).await {
            Ok(content) => content,
            Err(e) => {
                debug!("clipboard read task failed: {}", e);
                continue;
            }
        };

        let print = fingerprint(&content);
        let changed = match &last {
            None => false, // baseline only
            Some(previous) => *previous != print && print != Fingerprint::Empty,
        };
        last = Some(print);

        if changed && tx.send(content).await.is_err() {
            break;
        }
    }
    debug!("clipboard monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_fingerprint_distinguishes_content() {
        let a = fingerprint(&ClipboardContent::Text("one".to_string()));
        let b = fingerprint(&ClipboardContent::Text("two".to_string()));
        let c = fingerprint(&ClipboardContent::Text("one".to_string()));
        assert_ne!(a, b);
        assert_eq!(a, c);

        let img = fingerprint(&ClipboardContent::Image(vec![1, 2, 3]));
        assert_ne!(a, img);
        assert_ne!(fingerprint(&ClipboardContent::None), a);
    }

    #[test]
    fn test_fingerprint_files_order_sensitive() {
        let ab = fingerprint(&ClipboardContent::Files(vec![
            PathBuf::from("/a"),
            PathBuf::from("/b"),
        ]));
        let ba = fingerprint(&ClipboardContent::Files(vec![
            PathBuf::from("/b"),
            PathBuf::from("/a"),
        ]));
        assert_ne!(ab, ba);
    }

    struct ScriptedClipboard {
        reads: std::sync::Mutex<Vec<ClipboardContent>>,
    }

    impl ClipboardPort for ScriptedClipboard {
        fn get(&self) -> ClipboardContent {
            let mut reads = self.reads.lock().unwrap();
            if reads.len() > 1 {
                reads.remove(0)
            } else {
                reads[0].clone()
            }
        }
        fn set_text(&self, _: &str) -> anyhow::Result<()> {
            Ok(())
        }
        fn set_image_png(&self, _: &[u8]) -> anyhow::Result<()> {
            Ok(())
        }
        fn set_files(&self, _: &[std::path::PathBuf]) -> anyhow::Result<()> {
            Ok(())
        }
        fn set_image_from_file(&self, _: &std::path::Path) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_fires_on_change_not_on_baseline() {
        let clipboard = Arc::new(ScriptedClipboard {
            reads: std::sync::Mutex::new(vec![
                ClipboardContent::Text("baseline".to_string()),
                ClipboardContent::Text("baseline".to_string()),
                ClipboardContent::Text("changed".to_string()),
            ]),
        });
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_monitor(clipboard, tx, cancel.clone()));

        // Three poll ticks: baseline seed, unchanged, changed
        let changed = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("monitor never fired")
            .expect("monitor channel closed");
        assert_eq!(changed, ClipboardContent::Text("changed".to_string()));

        cancel.cancel();
        let _ = handle.await;
    }
}
